//! Device identities: fixed slot IDs, handedness, and the logical aliases
//! the hub re-points at runtime.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of device slots the hub can address.
pub const MAX_KAIS: usize = 8;

/// Device slot outside `0..MAX_KAIS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Kai ID {0} out of range (0..{max})", max = MAX_KAIS)]
pub struct KaiIdError(pub i64);

/// A validated device slot ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct KaiId(u8);

impl KaiId {
    pub fn new(id: i64) -> Result<Self, KaiIdError> {
        if (0..MAX_KAIS as i64).contains(&id) {
            Ok(Self(id as u8))
        } else {
            Err(KaiIdError(id))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Slot index into fixed-size device tables.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Every valid slot, in order.
    pub fn all() -> impl Iterator<Item = KaiId> {
        (0..MAX_KAIS as u8).map(KaiId)
    }
}

impl TryFrom<i64> for KaiId {
    type Error = KaiIdError;

    fn try_from(id: i64) -> Result<Self, Self::Error> {
        Self::new(id)
    }
}

impl TryFrom<u8> for KaiId {
    type Error = KaiIdError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Self::new(id as i64)
    }
}

impl From<KaiId> for u8 {
    fn from(id: KaiId) -> u8 {
        id.0
    }
}

impl fmt::Display for KaiId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which hand a device is worn on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Hand {
    #[default]
    Left,
    Right,
}

impl Hand {
    /// Case-insensitive parse; absent or unrecognised values mean `Left`.
    pub fn parse_or_left(raw: Option<&str>) -> Self {
        match raw {
            Some(s) if s.eq_ignore_ascii_case("right") => Hand::Right,
            _ => Hand::Left,
        }
    }
}

/// Aliases the hub re-points at a concrete device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Alias {
    Default,
    DefaultLeft,
    DefaultRight,
}

impl Alias {
    pub const ALL: [Alias; 3] = [Alias::Default, Alias::DefaultLeft, Alias::DefaultRight];

    /// Identifier used in place of a numeric `kaiId` on the wire.
    pub fn wire_name(self) -> &'static str {
        match self {
            Alias::Default => "default",
            Alias::DefaultLeft => "defaultLeft",
            Alias::DefaultRight => "defaultRight",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Alias::Default => 0,
            Alias::DefaultLeft => 1,
            Alias::DefaultRight => 2,
        }
    }

    /// Hand forced onto the alias when it is re-pointed, if any.
    pub fn forced_hand(self) -> Option<Hand> {
        match self {
            Alias::Default => None,
            Alias::DefaultLeft => Some(Hand::Left),
            Alias::DefaultRight => Some(Hand::Right),
        }
    }
}

impl fmt::Display for Alias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Anything events can be delivered to and capabilities set on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum KaiTarget {
    /// A re-pointable alias.
    Alias(Alias),
    /// Broadcast target: sees every device's events, never resolves to an ID.
    Any,
    /// A fixed device slot.
    Kai(KaiId),
}

impl KaiTarget {
    pub const DEFAULT: KaiTarget = KaiTarget::Alias(Alias::Default);
    pub const DEFAULT_LEFT: KaiTarget = KaiTarget::Alias(Alias::DefaultLeft);
    pub const DEFAULT_RIGHT: KaiTarget = KaiTarget::Alias(Alias::DefaultRight);

    /// The identifier a `SetCapabilities` request names for this target.
    /// `Any` has no hub-side identity.
    pub fn wire_id(self) -> Option<WireKaiId> {
        match self {
            KaiTarget::Alias(alias) => Some(WireKaiId::Alias(alias)),
            KaiTarget::Kai(id) => Some(WireKaiId::Id(id)),
            KaiTarget::Any => None,
        }
    }
}

impl From<Alias> for KaiTarget {
    fn from(alias: Alias) -> Self {
        KaiTarget::Alias(alias)
    }
}

impl From<KaiId> for KaiTarget {
    fn from(id: KaiId) -> Self {
        KaiTarget::Kai(id)
    }
}

impl fmt::Display for KaiTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KaiTarget::Alias(alias) => write!(f, "{}", alias),
            KaiTarget::Any => f.write_str("any"),
            KaiTarget::Kai(id) => write!(f, "kai#{}", id),
        }
    }
}

/// `kaiId` as it appears in outbound requests: alias name or raw number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum WireKaiId {
    Alias(Alias),
    Id(KaiId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kai_id_range() {
        assert_eq!(KaiId::new(0).unwrap().get(), 0);
        assert_eq!(KaiId::new(7).unwrap().index(), 7);
        assert_eq!(KaiId::new(8), Err(KaiIdError(8)));
        assert_eq!(KaiId::new(-1), Err(KaiIdError(-1)));
        assert_eq!(KaiId::all().count(), MAX_KAIS);
        assert!(KaiId::try_from(200u8).is_err());
    }

    #[test]
    fn kai_id_deserialize_checks_range() {
        let ok: KaiId = serde_json::from_str("3").unwrap();
        assert_eq!(ok.get(), 3);
        assert!(serde_json::from_str::<KaiId>("9").is_err());
    }

    #[test]
    fn hand_parsing_defaults_left() {
        assert_eq!(Hand::parse_or_left(Some("Right")), Hand::Right);
        assert_eq!(Hand::parse_or_left(Some("RIGHT")), Hand::Right);
        assert_eq!(Hand::parse_or_left(Some("left")), Hand::Left);
        assert_eq!(Hand::parse_or_left(Some("both")), Hand::Left);
        assert_eq!(Hand::parse_or_left(None), Hand::Left);
    }

    #[test]
    fn wire_ids_serialize_as_name_or_number() {
        let alias = KaiTarget::DEFAULT_LEFT.wire_id().unwrap();
        assert_eq!(serde_json::to_string(&alias).unwrap(), "\"defaultLeft\"");

        let id = KaiTarget::Kai(KaiId::new(5).unwrap()).wire_id().unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "5");

        assert_eq!(KaiTarget::Any.wire_id(), None);
    }
}
