//! Session state machine: everything that reacts to an inbound frame.
//!
//! The session owns the device registry and capability masks. It never
//! touches the socket; each handler returns the requests the transport
//! should send in response, and pushes deliveries onto the event queue.

use std::fmt;

use kaiproto::{
    decode_frame, Alias, Capabilities, Inbound, IncomingData, KaiAnnouncement, KaiEvent, KaiId,
    KaiTarget, Outbound,
};
use tracing::{debug, info, trace, warn};

use crate::capabilities::CapabilityManager;
use crate::dispatch::{Delivery, EventQueue};
use crate::registry::{AliasBinding, Device, DeviceRegistry};

/// Where the session is in connect → authenticate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    /// Worker is trying to open the socket.
    Connecting,
    /// Socket open, authentication reply not seen yet.
    Connected,
    Authenticated,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Authenticated => "authenticated",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Module credentials sent in the authentication request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub module_id: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(module_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            module_id: module_id.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("module_id", &self.module_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct Session {
    state: ConnectionState,
    registry: DeviceRegistry,
    capabilities: CapabilityManager,
    foreground_process: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == ConnectionState::Authenticated
    }

    pub fn set_state(&mut self, state: ConnectionState) {
        if self.state != state {
            debug!("session {} -> {}", self.state, state);
            self.state = state;
        }
    }

    /// Socket opened: returns the authentication request.
    pub fn on_connected(&mut self, credentials: &Credentials) -> Outbound {
        self.set_state(ConnectionState::Connected);
        Outbound::authentication(&credentials.module_id, &credentials.secret)
    }

    /// Decode one text frame and react to it.
    ///
    /// Malformed frames are logged and dropped; they never end the session.
    pub fn handle_frame(&mut self, text: &str, queue: &EventQueue) -> Vec<Outbound> {
        match decode_frame(text) {
            Ok(inbound) => self.handle(inbound, queue),
            Err(e) => {
                warn!("dropping malformed frame: {} ({} bytes)", e, text.len());
                trace!("malformed frame: {}", text);
                Vec::new()
            }
        }
    }

    pub fn handle(&mut self, inbound: Inbound, queue: &EventQueue) -> Vec<Outbound> {
        match inbound {
            Inbound::Error(error) => {
                warn!("{}", error);
                queue.push(Delivery::sdk(KaiEvent::Error(error)));
                Vec::new()
            }
            Inbound::Authentication => self.on_authenticated(),
            Inbound::IncomingData(data) => {
                self.on_incoming_data(data, queue);
                Vec::new()
            }
            Inbound::ConnectedKais(roster) => {
                debug!("roster: {} kai(s)", roster.len());
                roster
                    .iter()
                    .flat_map(|announcement| self.on_kai_connected(announcement))
                    .collect()
            }
            Inbound::KaiConnected(announcement) => self.on_kai_connected(&announcement),
            Inbound::Unknown(envelope) => {
                debug!("unrecognised message: {}", envelope);
                queue.push(Delivery::sdk(KaiEvent::UnknownData(envelope)));
                Vec::new()
            }
        }
    }

    fn on_authenticated(&mut self) -> Vec<Outbound> {
        info!("authenticated with hub");
        self.set_state(ConnectionState::Authenticated);
        let mut out = self.capabilities.resend_all();
        out.push(Outbound::ListConnectedKais);
        out
    }

    fn on_incoming_data(&mut self, data: IncomingData, queue: &EventQueue) {
        if data.foreground_process.is_some() {
            self.foreground_process = data.foreground_process;
        }
        trace!("kai {}: {} event(s)", data.kai_id, data.events.len());
        for event in &data.events {
            queue.push_fanned(data.kai_id, data.defaults, event);
        }
    }

    fn on_kai_connected(&mut self, announcement: &KaiAnnouncement) -> Vec<Outbound> {
        info!(
            "kai {} connected ({:?} hand)",
            announcement.kai_id, announcement.hand
        );
        let repointed = self.registry.apply(announcement);
        if repointed && self.is_authenticated() {
            self.capabilities.resend_aliases()
        } else {
            Vec::new()
        }
    }

    pub fn set_capabilities(&mut self, target: KaiTarget, flags: Capabilities) -> Option<Outbound> {
        let authenticated = self.is_authenticated();
        self.capabilities.set(target, flags, authenticated)
    }

    pub fn unset_capabilities(
        &mut self,
        target: KaiTarget,
        flags: Capabilities,
    ) -> Option<Outbound> {
        let authenticated = self.is_authenticated();
        self.capabilities.unset(target, flags, authenticated)
    }

    pub fn capabilities(&self, target: KaiTarget) -> Capabilities {
        self.capabilities.mask(target)
    }

    pub fn device(&self, id: KaiId) -> Option<&Device> {
        self.registry.device(id)
    }

    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.registry.devices()
    }

    pub fn alias_binding(&self, alias: Alias) -> Option<AliasBinding> {
        self.registry.alias(alias)
    }

    pub fn foreground_process(&self) -> Option<&str> {
        self.foreground_process.as_deref()
    }
}
