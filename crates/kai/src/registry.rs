//! Device slots and alias bindings.

use kaiproto::{Alias, Hand, KaiAnnouncement, KaiId, MAX_KAIS};
use tracing::debug;

/// A device the hub has announced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub id: KaiId,
    pub hand: Hand,
    pub serial_number: Option<String>,
}

/// The concrete device an alias currently points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AliasBinding {
    pub kai_id: KaiId,
    pub hand: Hand,
}

/// Fixed slot table plus the three re-pointable aliases.
///
/// Slots are overwritten on re-announcement and never cleared.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: [Option<Device>; MAX_KAIS],
    aliases: [Option<AliasBinding>; 3],
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an announcement. Returns `true` if any alias was re-pointed.
    pub fn apply(&mut self, announcement: &KaiAnnouncement) -> bool {
        let id = announcement.kai_id;
        self.devices[id.index()] = Some(Device {
            id,
            hand: announcement.hand,
            serial_number: announcement.serial_number.clone(),
        });

        let mut repointed = false;
        for alias in announcement.defaults.aliases() {
            let hand = alias.forced_hand().unwrap_or(announcement.hand);
            self.aliases[alias.index()] = Some(AliasBinding { kai_id: id, hand });
            debug!("{} -> kai {} ({:?})", alias, id, hand);
            repointed = true;
        }
        repointed
    }

    pub fn device(&self, id: KaiId) -> Option<&Device> {
        self.devices[id.index()].as_ref()
    }

    /// Every announced device, in slot order.
    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.iter().flatten()
    }

    pub fn alias(&self, alias: Alias) -> Option<AliasBinding> {
        self.aliases[alias.index()]
    }
}
