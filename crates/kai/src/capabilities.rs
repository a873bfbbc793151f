//! Per-target subscription masks and the `SetCapabilities` requests they
//! turn into.
//!
//! Masks are kept independently for each alias, each device slot and `Any`.
//! The hub only hears about a mask once the session is authenticated, and
//! then each request names exactly the flags the caller passed, whatever the
//! mask already held. Full masks are replayed when the hub's view has to be
//! rebuilt: after authentication, and after an alias is re-pointed at a
//! different device.

use kaiproto::{Alias, Capabilities, CapabilityDelta, KaiId, KaiTarget, Outbound, MAX_KAIS};
use tracing::debug;

#[derive(Debug, Default)]
pub struct CapabilityManager {
    aliases: [Capabilities; 3],
    devices: [Capabilities; MAX_KAIS],
    any: Capabilities,
}

impl CapabilityManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mask(&self, target: KaiTarget) -> Capabilities {
        match target {
            KaiTarget::Alias(alias) => self.aliases[alias.index()],
            KaiTarget::Kai(id) => self.devices[id.index()],
            KaiTarget::Any => self.any,
        }
    }

    fn mask_mut(&mut self, target: KaiTarget) -> &mut Capabilities {
        match target {
            KaiTarget::Alias(alias) => &mut self.aliases[alias.index()],
            KaiTarget::Kai(id) => &mut self.devices[id.index()],
            KaiTarget::Any => &mut self.any,
        }
    }

    /// OR `flags` into the target's mask.
    ///
    /// Returns the request to send, if any. Every flag in `flags` goes out as
    /// `true`, including ones that were already set. Nothing is sent while
    /// unauthenticated or when the mask stays empty.
    pub fn set(
        &mut self,
        target: KaiTarget,
        flags: Capabilities,
        authenticated: bool,
    ) -> Option<Outbound> {
        let mask = self.mask_mut(target);
        *mask |= flags;

        if mask.is_empty() || !authenticated {
            return None;
        }
        request(target, CapabilityDelta::full(flags))
    }

    /// Clear `flags` from the target's mask.
    ///
    /// When authenticated, every flag in `flags` goes out as `false`, whether
    /// or not it was set and even if the mask ends up empty.
    pub fn unset(
        &mut self,
        target: KaiTarget,
        flags: Capabilities,
        authenticated: bool,
    ) -> Option<Outbound> {
        let mask = self.mask_mut(target);
        *mask = *mask - flags;

        if !authenticated {
            return None;
        }
        request(target, CapabilityDelta::disable(flags))
    }

    /// Full masks for every alias with something subscribed.
    pub fn resend_aliases(&self) -> Vec<Outbound> {
        Alias::ALL
            .into_iter()
            .filter_map(|alias| full_request(alias.into(), self.aliases[alias.index()]))
            .collect()
    }

    /// Full masks for every alias and device slot with something subscribed.
    pub fn resend_all(&self) -> Vec<Outbound> {
        let mut out = self.resend_aliases();
        out.extend(
            KaiId::all().filter_map(|id| full_request(id.into(), self.devices[id.index()])),
        );
        out
    }
}

fn full_request(target: KaiTarget, mask: Capabilities) -> Option<Outbound> {
    if mask.is_empty() {
        return None;
    }
    request(target, CapabilityDelta::full(mask))
}

fn request(target: KaiTarget, delta: CapabilityDelta) -> Option<Outbound> {
    if delta.is_empty() {
        return None;
    }
    let Some(kai_id) = target.wire_id() else {
        debug!("{} has no hub identity, keeping {:?} local", target, delta);
        return None;
    };
    Some(Outbound::set_capabilities(kai_id, delta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kaiproto::{Capability, WireKaiId};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn wire(msg: Option<Outbound>) -> Option<Value> {
        msg.map(|m| m.to_json())
    }

    #[test]
    fn unauthenticated_changes_stay_local() {
        let mut caps = CapabilityManager::new();
        assert_eq!(
            caps.set(KaiTarget::DEFAULT, Capability::GestureData.into(), false),
            None
        );
        assert_eq!(caps.mask(KaiTarget::DEFAULT), Capabilities::from(Capability::GestureData));
        assert_eq!(
            caps.unset(KaiTarget::DEFAULT, Capability::GestureData.into(), false),
            None
        );
        assert!(caps.mask(KaiTarget::DEFAULT).is_empty());
    }

    #[test]
    fn set_sends_every_requested_flag() {
        let mut caps = CapabilityManager::new();
        caps.set(KaiTarget::DEFAULT, Capability::GestureData.into(), true);

        let msg = caps.set(
            KaiTarget::DEFAULT,
            Capability::GestureData | Capability::PyrData,
            true,
        );
        assert_eq!(
            wire(msg),
            Some(json!({
                "type": "SetCapabilities",
                "kaiId": "default",
                "gestureData": true,
                "pyrData": true,
            }))
        );

        // Already set, still re-sent
        assert_eq!(
            wire(caps.set(KaiTarget::DEFAULT, Capability::PyrData.into(), true)),
            Some(json!({"type": "SetCapabilities", "kaiId": "default", "pyrData": true}))
        );
    }

    #[test]
    fn empty_set_sends_nothing() {
        let mut caps = CapabilityManager::new();
        assert_eq!(caps.set(KaiTarget::DEFAULT, Capabilities::empty(), true), None);
    }

    #[test]
    fn unset_to_zero_still_sends() {
        let mut caps = CapabilityManager::new();
        let id = KaiId::new(6).unwrap();
        caps.set(id.into(), Capability::GyroscopeData.into(), true);

        let msg = caps.unset(id.into(), Capability::GyroscopeData.into(), true);
        assert!(caps.mask(id.into()).is_empty());
        assert_eq!(
            wire(msg),
            Some(json!({"type": "SetCapabilities", "kaiId": 6, "gyroscopeData": false}))
        );
    }

    #[test]
    fn unset_of_flag_never_set_still_sends() {
        let mut caps = CapabilityManager::new();
        let msg = caps.unset(KaiTarget::DEFAULT, Capability::GestureData.into(), true);
        assert!(caps.mask(KaiTarget::DEFAULT).is_empty());
        assert_eq!(
            wire(msg),
            Some(json!({"type": "SetCapabilities", "kaiId": "default", "gestureData": false}))
        );
    }

    #[test]
    fn unset_all_names_every_flag() {
        let mut caps = CapabilityManager::new();
        caps.set(KaiTarget::DEFAULT, Capability::PyrData.into(), true);

        let msg = caps.unset(KaiTarget::DEFAULT, Capabilities::all(), true);
        let Some(Value::Object(fields)) = wire(msg) else {
            panic!("expected a request");
        };
        for c in Capability::ALL {
            assert_eq!(fields.get(c.wire_name()), Some(&Value::Bool(false)), "{}", c.wire_name());
        }
        assert_eq!(fields.len(), 11);
    }

    #[test]
    fn requests_replay_to_the_local_mask() {
        let mut caps = CapabilityManager::new();
        let target = KaiTarget::DEFAULT_LEFT;
        let steps: [(bool, Capabilities); 4] = [
            (true, Capability::GestureData | Capability::QuaternionData),
            (false, Capability::GestureData | Capability::MagnetometerData),
            (true, Capability::AccelerometerData | Capability::QuaternionData),
            (false, Capabilities::all()),
        ];

        let mut hub_view = Capabilities::empty();
        for (enable, flags) in steps {
            let msg = if enable {
                caps.set(target, flags, true)
            } else {
                caps.unset(target, flags, true)
            };

            match msg {
                Some(Outbound::SetCapabilities { delta, .. }) => {
                    let expected = if enable {
                        CapabilityDelta::full(flags)
                    } else {
                        CapabilityDelta::disable(flags)
                    };
                    assert_eq!(delta, expected);
                    hub_view = delta.apply(hub_view);
                }
                other => panic!("unexpected {:?}", other),
            }
            assert_eq!(hub_view, caps.mask(target));
        }
    }

    #[test]
    fn any_never_reaches_the_hub() {
        let mut caps = CapabilityManager::new();
        assert_eq!(caps.set(KaiTarget::Any, Capabilities::all(), true), None);
        assert_eq!(caps.mask(KaiTarget::Any), Capabilities::all());
        assert!(caps.resend_all().is_empty());
    }

    #[test]
    fn resend_replays_full_nonzero_masks() {
        let mut caps = CapabilityManager::new();
        caps.set(KaiTarget::DEFAULT, Capability::GestureData | Capability::PyrData, false);
        caps.set(KaiTarget::DEFAULT_RIGHT, Capability::LinearFlickData.into(), false);
        caps.set(KaiId::new(0).unwrap().into(), Capability::AccelerometerData.into(), false);

        let aliases: Vec<Value> = caps.resend_aliases().iter().map(Outbound::to_json).collect();
        assert_eq!(
            aliases,
            vec![
                json!({"type": "SetCapabilities", "kaiId": "default", "gestureData": true, "pyrData": true}),
                json!({"type": "SetCapabilities", "kaiId": "defaultRight", "linearFlickData": true}),
            ]
        );

        let all = caps.resend_all();
        assert_eq!(all.len(), 3);
        assert!(matches!(
            all[2],
            Outbound::SetCapabilities { kai_id: WireKaiId::Id(id), .. } if id.get() == 0
        ));
    }
}
