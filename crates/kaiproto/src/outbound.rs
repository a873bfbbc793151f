//! Requests the SDK sends to the hub.

use std::fmt;

use serde_json::{json, Map, Value};

use crate::capability::CapabilityDelta;
use crate::identity::WireKaiId;
use crate::wire;

/// Outbound request. Serialized to a single JSON text frame.
#[derive(Clone, PartialEq)]
pub enum Outbound {
    /// `{type:"Authentication", moduleId, secret}`
    Authentication { module_id: String, secret: String },
    /// `{type:"ListConnectedKais"}`
    ListConnectedKais,
    /// `{type:"SetCapabilities", kaiId, <capability>: bool, ...}`
    SetCapabilities { kai_id: WireKaiId, delta: CapabilityDelta },
}

impl Outbound {
    pub fn authentication(module_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self::Authentication {
            module_id: module_id.into(),
            secret: secret.into(),
        }
    }

    pub fn set_capabilities(kai_id: WireKaiId, delta: CapabilityDelta) -> Self {
        Self::SetCapabilities { kai_id, delta }
    }

    /// Message type discriminator, for logging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Outbound::Authentication { .. } => wire::AUTHENTICATION,
            Outbound::ListConnectedKais => wire::LIST_CONNECTED_KAIS,
            Outbound::SetCapabilities { .. } => wire::SET_CAPABILITIES,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Outbound::Authentication { module_id, secret } => json!({
                "type": wire::AUTHENTICATION,
                "moduleId": module_id,
                "secret": secret,
            }),
            Outbound::ListConnectedKais => json!({ "type": wire::LIST_CONNECTED_KAIS }),
            Outbound::SetCapabilities { kai_id, delta } => {
                let mut map = Map::new();
                map.insert(wire::TYPE.to_string(), Value::from(wire::SET_CAPABILITIES));
                let id = match kai_id {
                    WireKaiId::Alias(alias) => Value::from(alias.wire_name()),
                    WireKaiId::Id(id) => Value::from(id.get()),
                };
                map.insert(wire::KAI_ID.to_string(), id);
                for (name, on) in delta.fields() {
                    map.insert(name.to_string(), Value::Bool(on));
                }
                Value::Object(map)
            }
        }
    }

    /// Compact text frame.
    pub fn to_text(&self) -> String {
        self.to_json().to_string()
    }
}

// Keeps the module secret out of logs
impl fmt::Debug for Outbound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outbound::Authentication { module_id, .. } => f
                .debug_struct("Authentication")
                .field("module_id", module_id)
                .field("secret", &"<redacted>")
                .finish(),
            Outbound::ListConnectedKais => f.write_str("ListConnectedKais"),
            Outbound::SetCapabilities { kai_id, delta } => f
                .debug_struct("SetCapabilities")
                .field("kai_id", kai_id)
                .field("enabled", &delta.enabled)
                .field("disabled", &delta.disabled)
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{Capabilities, Capability};
    use crate::identity::{Alias, KaiId};
    use pretty_assertions::assert_eq;

    #[test]
    fn authentication_shape() {
        let msg = Outbound::authentication("mod", "pw");
        assert_eq!(
            msg.to_json(),
            json!({"type": "Authentication", "moduleId": "mod", "secret": "pw"})
        );
        assert!(!format!("{:?}", msg).contains("pw"));
    }

    #[test]
    fn roster_request_shape() {
        assert_eq!(
            Outbound::ListConnectedKais.to_text(),
            r#"{"type":"ListConnectedKais"}"#
        );
    }

    #[test]
    fn set_capabilities_carries_only_delta_fields() {
        let old: Capabilities = Capability::GestureData.into();
        let new = Capability::PyrData | Capability::QuaternionData;
        let msg = Outbound::set_capabilities(
            WireKaiId::Alias(Alias::DefaultRight),
            CapabilityDelta::between(old, new),
        );
        assert_eq!(
            msg.to_json(),
            json!({
                "type": "SetCapabilities",
                "kaiId": "defaultRight",
                "gestureData": false,
                "pyrData": true,
                "quaternionData": true,
            })
        );
    }

    #[test]
    fn set_capabilities_numeric_id() {
        let msg = Outbound::set_capabilities(
            WireKaiId::Id(KaiId::new(2).unwrap()),
            CapabilityDelta::full(Capability::MagnetometerData.into()),
        );
        assert_eq!(
            msg.to_json(),
            json!({"type": "SetCapabilities", "kaiId": 2, "magnetometerData": true})
        );
        assert_eq!(msg.type_name(), "SetCapabilities");
    }
}
