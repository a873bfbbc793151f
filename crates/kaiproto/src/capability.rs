//! Capability flags - the opt-in data categories a device streams once
//! subscribed.
//!
//! [`Capabilities`] is a small set type over [`Capability`]. Requests to the
//! hub carry a [`CapabilityDelta`]: the fields to switch on and the fields to
//! switch off.

use std::fmt;
use std::ops::{BitOr, BitOrAssign, Sub};

use serde::{Deserialize, Serialize};

/// One subscribable data category.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    GestureData = 1,
    LinearFlickData = 2,
    FingerShortcutData = 4,
    FingerPositionalData = 8,
    PyrData = 16,
    QuaternionData = 32,
    AccelerometerData = 64,
    GyroscopeData = 128,
    MagnetometerData = 256,
}

impl Capability {
    /// Every capability, in bit order.
    pub const ALL: [Capability; 9] = [
        Capability::GestureData,
        Capability::LinearFlickData,
        Capability::FingerShortcutData,
        Capability::FingerPositionalData,
        Capability::PyrData,
        Capability::QuaternionData,
        Capability::AccelerometerData,
        Capability::GyroscopeData,
        Capability::MagnetometerData,
    ];

    pub fn bit(self) -> u16 {
        self as u16
    }

    /// Field name used both in `SetCapabilities` requests and as the `type`
    /// of incoming data items.
    pub fn wire_name(self) -> &'static str {
        match self {
            Capability::GestureData => "gestureData",
            Capability::LinearFlickData => "linearFlickData",
            Capability::FingerShortcutData => "fingerShortcutData",
            Capability::FingerPositionalData => "fingerPositionalData",
            Capability::PyrData => "pyrData",
            Capability::QuaternionData => "quaternionData",
            Capability::AccelerometerData => "accelerometerData",
            Capability::GyroscopeData => "gyroscopeData",
            Capability::MagnetometerData => "magnetometerData",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.wire_name() == name)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// A set of [`Capability`] flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Capabilities(u16);

impl Capabilities {
    const MASK: u16 = 0x01FF;

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn all() -> Self {
        Self(Self::MASK)
    }

    /// Build from raw bits, discarding bits with no capability behind them.
    pub const fn from_bits_truncate(bits: u16) -> Self {
        Self(bits & Self::MASK)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    pub fn insert(&mut self, capability: Capability) {
        self.0 |= capability.bit();
    }

    pub fn remove(&mut self, capability: Capability) {
        self.0 &= !capability.bit();
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Flags in `self` that are not in `other`.
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterate the contained capabilities in bit order.
    pub fn iter(self) -> impl Iterator<Item = Capability> {
        Capability::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

impl From<Capability> for Capabilities {
    fn from(capability: Capability) -> Self {
        Self(capability.bit())
    }
}

impl FromIterator<Capability> for Capabilities {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        let mut caps = Capabilities::empty();
        for c in iter {
            caps.insert(c);
        }
        caps
    }
}

impl BitOr for Capabilities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOr<Capability> for Capabilities {
    type Output = Self;

    fn bitor(self, rhs: Capability) -> Self {
        self.union(rhs.into())
    }
}

impl BitOr for Capability {
    type Output = Capabilities;

    fn bitor(self, rhs: Self) -> Capabilities {
        Capabilities::from(self).union(rhs.into())
    }
}

impl BitOrAssign for Capabilities {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl Sub for Capabilities {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.difference(rhs)
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let names: Vec<&str> = self.iter().map(Capability::wire_name).collect();
        f.write_str(&names.join("|"))
    }
}

/// Field-wise change between two masks: what to switch on and what to
/// switch off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CapabilityDelta {
    pub enabled: Capabilities,
    pub disabled: Capabilities,
}

impl CapabilityDelta {
    pub fn between(old: Capabilities, new: Capabilities) -> Self {
        Self {
            enabled: new - old,
            disabled: old - new,
        }
    }

    /// A delta that turns on everything in `mask`.
    pub fn full(mask: Capabilities) -> Self {
        Self {
            enabled: mask,
            disabled: Capabilities::empty(),
        }
    }

    /// A delta that turns off everything in `flags`.
    pub fn disable(flags: Capabilities) -> Self {
        Self {
            enabled: Capabilities::empty(),
            disabled: flags,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.enabled.is_empty() && self.disabled.is_empty()
    }

    /// `(wire name, on/off)` pairs in bit order.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, bool)> + '_ {
        Capability::ALL.into_iter().filter_map(move |c| {
            if self.enabled.contains(c) {
                Some((c.wire_name(), true))
            } else if self.disabled.contains(c) {
                Some((c.wire_name(), false))
            } else {
                None
            }
        })
    }

    /// Replay this delta onto a mask.
    pub fn apply(&self, mask: Capabilities) -> Capabilities {
        (mask | self.enabled) - self.disabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_match_wire_protocol() {
        assert_eq!(Capability::GestureData.bit(), 1);
        assert_eq!(Capability::PyrData.bit(), 16);
        assert_eq!(Capability::MagnetometerData.bit(), 256);
        assert_eq!(Capabilities::all().len(), 9);
    }

    #[test]
    fn wire_names_are_unique_and_reversible() {
        for c in Capability::ALL {
            assert_eq!(Capability::from_wire_name(c.wire_name()), Some(c));
        }
        assert_eq!(Capability::from_wire_name("heartRateData"), None);
    }

    #[test]
    fn set_operations() {
        let mut caps = Capability::GestureData | Capability::QuaternionData;
        assert!(caps.contains(Capability::GestureData));
        assert!(!caps.contains(Capability::PyrData));

        caps.insert(Capability::PyrData);
        caps.remove(Capability::GestureData);
        assert_eq!(
            caps.iter().collect::<Vec<_>>(),
            vec![Capability::PyrData, Capability::QuaternionData]
        );
        assert_eq!(caps.to_string(), "pyrData|quaternionData");
        assert_eq!(Capabilities::empty().to_string(), "none");
    }

    #[test]
    fn truncate_drops_unknown_bits() {
        assert_eq!(Capabilities::from_bits_truncate(0xFFFF), Capabilities::all());
    }

    #[test]
    fn delta_is_symmetric_difference() {
        let old = Capability::GestureData | Capability::PyrData;
        let new = Capability::PyrData | Capability::GyroscopeData;
        let delta = CapabilityDelta::between(old, new);

        assert_eq!(delta.enabled, Capabilities::from(Capability::GyroscopeData));
        assert_eq!(delta.disabled, Capabilities::from(Capability::GestureData));
        assert_eq!(
            delta.fields().collect::<Vec<_>>(),
            vec![("gestureData", false), ("gyroscopeData", true)]
        );
        assert_eq!(delta.apply(old), new);
        assert!(CapabilityDelta::between(new, new).is_empty());
    }

    #[test]
    fn full_delta_enables_whole_mask() {
        let mask = Capability::AccelerometerData | Capability::MagnetometerData;
        let delta = CapabilityDelta::full(mask);
        assert_eq!(delta.apply(Capabilities::empty()), mask);
        assert_eq!(delta.fields().count(), 2);
    }

    #[test]
    fn disable_delta_clears_flags() {
        let delta = CapabilityDelta::disable(Capability::GestureData | Capability::PyrData);
        assert_eq!(
            delta.fields().collect::<Vec<_>>(),
            vec![("gestureData", false), ("pyrData", false)]
        );
        assert_eq!(delta.apply(Capabilities::all()).len(), 7);
    }
}
