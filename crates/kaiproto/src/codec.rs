//! Inbound frame decoding.
//!
//! [`decode_frame`] turns one text frame into an [`Inbound`] message.
//! Frame-level problems come back as [`CodecError`] for the caller to log and
//! drop; item-level problems inside an `IncomingData` batch are logged here
//! and the offending item is skipped, so one bad item never costs the rest
//! of the batch.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::capability::Capability;
use crate::event::{HubError, KaiEvent, Pyr, Quaternion, Vector3};
use crate::identity::{Alias, Hand, KaiId, KaiIdError};
use crate::wire;

/// Errors that make a whole frame undecodable.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("Frame is not a JSON object")]
    NotAnObject,
    #[error("Missing field: {0}")]
    MissingField(&'static str),
    #[error("Invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error(transparent)]
    KaiId(#[from] KaiIdError),
}

/// The three default-alias flags carried by `IncomingData` and
/// `KaiConnected` messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct DefaultFlags {
    #[serde(default, rename = "defaultKai")]
    pub default: bool,
    #[serde(default, rename = "defaultLeftKai")]
    pub default_left: bool,
    #[serde(default, rename = "defaultRightKai")]
    pub default_right: bool,
}

impl DefaultFlags {
    pub fn is_set(&self, alias: Alias) -> bool {
        match alias {
            Alias::Default => self.default,
            Alias::DefaultLeft => self.default_left,
            Alias::DefaultRight => self.default_right,
        }
    }

    /// Aliases flagged true, in Default, DefaultLeft, DefaultRight order.
    pub fn aliases(&self) -> impl Iterator<Item = Alias> + '_ {
        Alias::ALL.into_iter().filter(move |a| self.is_set(*a))
    }

    pub fn any(&self) -> bool {
        self.default || self.default_left || self.default_right
    }
}

/// A batch of sensor/gesture data from one device.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingData {
    pub foreground_process: Option<String>,
    pub kai_id: KaiId,
    pub defaults: DefaultFlags,
    /// Decoded items in wire order; undecodable items are already dropped.
    pub events: Vec<KaiEvent>,
}

/// A device announcement (single `KaiConnected` or one roster entry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KaiAnnouncement {
    pub kai_id: KaiId,
    pub hand: Hand,
    pub defaults: DefaultFlags,
    pub serial_number: Option<String>,
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// `success: false`
    Error(HubError),
    /// Authentication accepted.
    Authentication,
    IncomingData(IncomingData),
    /// Full roster, in array order.
    ConnectedKais(Vec<KaiAnnouncement>),
    KaiConnected(KaiAnnouncement),
    /// Successful envelope with a `type` we don't know; carries the envelope.
    Unknown(Value),
}

/// Decode one text frame.
pub fn decode_frame(text: &str) -> Result<Inbound, CodecError> {
    let value: Value = serde_json::from_str(text)?;
    decode_value(value)
}

/// Decode an already-parsed frame.
pub fn decode_value(value: Value) -> Result<Inbound, CodecError> {
    let object = value.as_object().ok_or(CodecError::NotAnObject)?;

    let success = object
        .get(wire::SUCCESS)
        .ok_or(CodecError::MissingField(wire::SUCCESS))?
        .as_bool()
        .ok_or_else(|| invalid(wire::SUCCESS, "expected boolean"))?;

    if !success {
        return decode_error(object).map(Inbound::Error);
    }

    let kind = object
        .get(wire::TYPE)
        .ok_or(CodecError::MissingField(wire::TYPE))?
        .as_str()
        .ok_or_else(|| invalid(wire::TYPE, "expected string"))?;

    match kind {
        wire::AUTHENTICATION => Ok(Inbound::Authentication),
        wire::INCOMING_DATA => decode_incoming_data(object).map(Inbound::IncomingData),
        wire::LIST_CONNECTED_KAIS => decode_roster(object).map(Inbound::ConnectedKais),
        wire::KAI_CONNECTED => decode_announcement(object).map(Inbound::KaiConnected),
        _ => Ok(Inbound::Unknown(value)),
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> CodecError {
    CodecError::InvalidField {
        field,
        reason: reason.into(),
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    #[serde(rename = "errorCode")]
    error_code: i64,
    #[serde(default)]
    error: String,
    #[serde(default)]
    message: String,
}

fn decode_error(object: &Map<String, Value>) -> Result<HubError, CodecError> {
    if !object.contains_key(wire::ERROR_CODE) {
        return Err(CodecError::MissingField(wire::ERROR_CODE));
    }
    let envelope: ErrorEnvelope = serde_json::from_value(Value::Object(object.clone()))?;
    Ok(HubError {
        code: envelope.error_code,
        error: envelope.error,
        message: envelope.message,
    })
}

fn decode_kai_id(object: &Map<String, Value>) -> Result<KaiId, CodecError> {
    let raw = object
        .get(wire::KAI_ID)
        .ok_or(CodecError::MissingField(wire::KAI_ID))?
        .as_i64()
        .ok_or_else(|| invalid(wire::KAI_ID, "expected integer"))?;
    Ok(KaiId::new(raw)?)
}

fn decode_defaults(object: &Map<String, Value>) -> DefaultFlags {
    let flag = |key: &str| object.get(key).and_then(Value::as_bool).unwrap_or(false);
    DefaultFlags {
        default: flag(wire::DEFAULT_KAI),
        default_left: flag(wire::DEFAULT_LEFT_KAI),
        default_right: flag(wire::DEFAULT_RIGHT_KAI),
    }
}

fn decode_incoming_data(object: &Map<String, Value>) -> Result<IncomingData, CodecError> {
    let kai_id = decode_kai_id(object)?;
    let defaults = decode_defaults(object);
    let foreground_process = object
        .get(wire::FOREGROUND_PROCESS)
        .and_then(Value::as_str)
        .map(str::to_string);

    let items = object
        .get(wire::DATA)
        .and_then(Value::as_array)
        .ok_or_else(|| invalid(wire::DATA, "missing or not an array"))?;

    let events = items
        .iter()
        .filter_map(|item| match decode_item(item) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!("kai {}: skipping data item: {} ({})", kai_id, e, item);
                None
            }
        })
        .collect();

    Ok(IncomingData {
        foreground_process,
        kai_id,
        defaults,
        events,
    })
}

/// Decode one element of an `IncomingData` batch.
///
/// Unrecognised item types become [`KaiEvent::UnknownData`] carrying the item.
pub fn decode_item(item: &Value) -> Result<KaiEvent, CodecError> {
    let object = item.as_object().ok_or(CodecError::NotAnObject)?;
    let kind = object
        .get(wire::TYPE)
        .and_then(Value::as_str)
        .ok_or(CodecError::MissingField(wire::TYPE))?;

    let Some(capability) = Capability::from_wire_name(kind) else {
        debug!("unrecognised data item type {:?}", kind);
        return Ok(KaiEvent::UnknownData(item.clone()));
    };

    let event = match capability {
        Capability::GestureData => {
            let GestureItem { gesture } = parse_item(item, "gesture")?;
            KaiEvent::from_gesture_name(&gesture)
        }
        Capability::LinearFlickData => {
            let FlickItem { flick } = parse_item(item, "flick")?;
            KaiEvent::LinearFlick(flick)
        }
        Capability::FingerShortcutData => {
            let FingersItem::<bool> { fingers } = parse_item(item, "fingers")?;
            KaiEvent::FingerShortcut(first_four(&fingers))
        }
        Capability::FingerPositionalData => {
            let FingersItem::<i32> { fingers } = parse_item(item, "fingers")?;
            KaiEvent::FingerPositional(first_four(&fingers))
        }
        Capability::PyrData => KaiEvent::Pyr(parse_item::<Pyr>(item, "pyr")?),
        Capability::QuaternionData => {
            let QuaternionItem { quaternion } = parse_item(item, "quaternion")?;
            KaiEvent::Quaternion(quaternion)
        }
        Capability::AccelerometerData => {
            let AccelerometerItem { accelerometer } = parse_item(item, "accelerometer")?;
            KaiEvent::Accelerometer(accelerometer)
        }
        Capability::GyroscopeData => {
            let GyroscopeItem { gyroscope } = parse_item(item, "gyroscope")?;
            KaiEvent::Gyroscope(gyroscope)
        }
        Capability::MagnetometerData => {
            let MagnetometerItem { magnetometer } = parse_item(item, "magnetometer")?;
            KaiEvent::Magnetometer(magnetometer)
        }
    };

    Ok(event)
}

fn parse_item<T: DeserializeOwned>(item: &Value, field: &'static str) -> Result<T, CodecError> {
    T::deserialize(item).map_err(|e| invalid(field, e.to_string()))
}

/// Copy up to four fingers; missing trailing fingers stay at their default.
fn first_four<T: Copy + Default>(values: &[T]) -> [T; 4] {
    let mut out = [T::default(); 4];
    for (slot, value) in out.iter_mut().zip(values) {
        *slot = *value;
    }
    out
}

#[derive(Deserialize)]
struct GestureItem {
    gesture: String,
}

#[derive(Deserialize)]
struct FlickItem {
    flick: String,
}

#[derive(Deserialize)]
struct FingersItem<T> {
    fingers: Vec<T>,
}

#[derive(Deserialize)]
struct QuaternionItem {
    quaternion: Quaternion,
}

#[derive(Deserialize)]
struct AccelerometerItem {
    accelerometer: Vector3,
}

#[derive(Deserialize)]
struct GyroscopeItem {
    gyroscope: Vector3,
}

#[derive(Deserialize)]
struct MagnetometerItem {
    magnetometer: Vector3,
}

fn decode_announcement(object: &Map<String, Value>) -> Result<KaiAnnouncement, CodecError> {
    let kai_id = decode_kai_id(object)?;
    let hand = Hand::parse_or_left(object.get(wire::HAND).and_then(Value::as_str));
    let serial_number = match object.get(wire::KAI_SERIAL_NUMBER) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    };

    Ok(KaiAnnouncement {
        kai_id,
        hand,
        defaults: decode_defaults(object),
        serial_number,
    })
}

fn decode_roster(object: &Map<String, Value>) -> Result<Vec<KaiAnnouncement>, CodecError> {
    let entries = object
        .get(wire::KAIS)
        .and_then(Value::as_array)
        .ok_or_else(|| invalid(wire::KAIS, "missing or not an array"))?;

    let roster = entries
        .iter()
        .filter_map(|entry| {
            let decoded = entry
                .as_object()
                .ok_or(CodecError::NotAnObject)
                .and_then(decode_announcement);
            match decoded {
                Ok(announcement) => Some(announcement),
                Err(e) => {
                    warn!("skipping roster entry: {} ({})", e, entry);
                    None
                }
            }
        })
        .collect();

    Ok(roster)
}
