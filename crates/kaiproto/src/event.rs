//! Decoded event payloads.
//!
//! Every inbound data item, hub error and unrecognised message becomes one
//! [`KaiEvent`]. Listeners are keyed by [`EventKind`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Gestures the hub recognises by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gesture {
    SwipeUp,
    SwipeDown,
    SwipeLeft,
    SwipeRight,
    SideSwipeUp,
    SideSwipeDown,
    SideSwipeLeft,
    SideSwipeRight,
    Pinch2Begin,
    Pinch2End,
    GrabBegin,
    GrabEnd,
    Pinch3Begin,
    Pinch3End,
    DialBegin,
    DialEnd,
}

impl Gesture {
    pub const ALL: [Gesture; 16] = [
        Gesture::SwipeUp,
        Gesture::SwipeDown,
        Gesture::SwipeLeft,
        Gesture::SwipeRight,
        Gesture::SideSwipeUp,
        Gesture::SideSwipeDown,
        Gesture::SideSwipeLeft,
        Gesture::SideSwipeRight,
        Gesture::Pinch2Begin,
        Gesture::Pinch2End,
        Gesture::GrabBegin,
        Gesture::GrabEnd,
        Gesture::Pinch3Begin,
        Gesture::Pinch3End,
        Gesture::DialBegin,
        Gesture::DialEnd,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Gesture::SwipeUp => "SwipeUp",
            Gesture::SwipeDown => "SwipeDown",
            Gesture::SwipeLeft => "SwipeLeft",
            Gesture::SwipeRight => "SwipeRight",
            Gesture::SideSwipeUp => "SideSwipeUp",
            Gesture::SideSwipeDown => "SideSwipeDown",
            Gesture::SideSwipeLeft => "SideSwipeLeft",
            Gesture::SideSwipeRight => "SideSwipeRight",
            Gesture::Pinch2Begin => "Pinch2Begin",
            Gesture::Pinch2End => "Pinch2End",
            Gesture::GrabBegin => "GrabBegin",
            Gesture::GrabEnd => "GrabEnd",
            Gesture::Pinch3Begin => "Pinch3Begin",
            Gesture::Pinch3End => "Pinch3End",
            Gesture::DialBegin => "DialBegin",
            Gesture::DialEnd => "DialEnd",
        }
    }
}

/// Name that isn't one of the sixteen known gestures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown gesture: {0}")]
pub struct UnknownGestureName(pub String);

impl FromStr for Gesture {
    type Err = UnknownGestureName;

    /// Case-insensitive match against the known gesture names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Gesture::ALL
            .into_iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownGestureName(s.to_string()))
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Orientation as pitch/yaw/roll angles.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pyr {
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

/// A `success: false` envelope from the hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubError {
    pub code: i64,
    pub error: String,
    pub message: String,
}

impl fmt::Display for HubError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hub error {} ({}): {}", self.code, self.error, self.message)
    }
}

/// Listener key. Ten data kinds plus `UnknownData` are delivered per
/// device/alias; `Error` and envelope-level `UnknownData` go to SDK-level
/// listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Gesture,
    UnknownGesture,
    LinearFlick,
    FingerShortcut,
    FingerPositional,
    Pyr,
    Quaternion,
    Accelerometer,
    Gyroscope,
    Magnetometer,
    UnknownData,
    Error,
}

impl EventKind {
    pub const ALL: [EventKind; 12] = [
        EventKind::Gesture,
        EventKind::UnknownGesture,
        EventKind::LinearFlick,
        EventKind::FingerShortcut,
        EventKind::FingerPositional,
        EventKind::Pyr,
        EventKind::Quaternion,
        EventKind::Accelerometer,
        EventKind::Gyroscope,
        EventKind::Magnetometer,
        EventKind::UnknownData,
        EventKind::Error,
    ];
}

/// One decoded payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum KaiEvent {
    Gesture(Gesture),
    UnknownGesture(String),
    LinearFlick(String),
    /// Index, middle, ring, little.
    FingerShortcut([bool; 4]),
    /// Index, middle, ring, little.
    FingerPositional([i32; 4]),
    Pyr(Pyr),
    Quaternion(Quaternion),
    Accelerometer(Vector3),
    Gyroscope(Vector3),
    Magnetometer(Vector3),
    /// Forward-compatibility escape hatch: the raw payload we couldn't classify.
    UnknownData(serde_json::Value),
    Error(HubError),
}

impl KaiEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            KaiEvent::Gesture(_) => EventKind::Gesture,
            KaiEvent::UnknownGesture(_) => EventKind::UnknownGesture,
            KaiEvent::LinearFlick(_) => EventKind::LinearFlick,
            KaiEvent::FingerShortcut(_) => EventKind::FingerShortcut,
            KaiEvent::FingerPositional(_) => EventKind::FingerPositional,
            KaiEvent::Pyr(_) => EventKind::Pyr,
            KaiEvent::Quaternion(_) => EventKind::Quaternion,
            KaiEvent::Accelerometer(_) => EventKind::Accelerometer,
            KaiEvent::Gyroscope(_) => EventKind::Gyroscope,
            KaiEvent::Magnetometer(_) => EventKind::Magnetometer,
            KaiEvent::UnknownData(_) => EventKind::UnknownData,
            KaiEvent::Error(_) => EventKind::Error,
        }
    }

    /// Gesture name for a known gesture, resolving unknown names to
    /// `UnknownGesture`.
    pub fn from_gesture_name(name: &str) -> Self {
        match name.parse::<Gesture>() {
            Ok(gesture) => KaiEvent::Gesture(gesture),
            Err(UnknownGestureName(raw)) => KaiEvent::UnknownGesture(raw),
        }
    }
}
