//! kai - Client SDK for the Kai wearable hub
//!
//! Connects to the local hub over a WebSocket, authenticates, subscribes to
//! gesture and motion data from up to eight devices, and hands decoded events
//! from a background worker thread to the host's own tick loop.
//!
//! ```no_run
//! use kai::{KaiSdk, KaiTarget, Capability, EventKind};
//! use kaiconf::HubConfig;
//!
//! let mut sdk = KaiSdk::new(HubConfig::default());
//! sdk.initialise("my-module", "my-secret");
//! sdk.set_capabilities(KaiTarget::DEFAULT, Capability::GestureData);
//! sdk.subscribe(KaiTarget::DEFAULT, EventKind::Gesture, |d| println!("{:?}", d.event));
//! sdk.connect()?;
//!
//! loop {
//!     // once per host tick
//!     sdk.process_pending_events();
//!     # break;
//! }
//! # Ok::<(), kai::SdkError>(())
//! ```
//!
//! Threading: the worker owns the socket and is the only writer. The session
//! (device registry, capability masks, connection state) sits behind one
//! mutex shared by the worker and this facade; deliveries travel through a
//! separate mutex-guarded queue that [`KaiSdk::process_pending_events`]
//! drains in one step.

pub mod capabilities;
pub mod dispatch;
pub mod registry;
pub mod session;
mod transport;
mod ws;

use std::sync::{Arc, Mutex};

use kaiconf::HubConfig;
use tracing::{debug, info};

pub use dispatch::{Delivery, EventQueue, Listeners, Recipient};
pub use kaiproto::{
    Alias, Capabilities, Capability, EventKind, Gesture, Hand, HubError, KaiEvent, KaiId,
    KaiIdError, KaiTarget, Pyr, Quaternion, Vector3,
};
pub use registry::{AliasBinding, Device};
pub use session::{ConnectionState, Credentials, Session};

use transport::{lock_session, Worker};

#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    #[error("SDK is not initialised; call initialise() before connect()")]
    NotInitialised,
    #[error(transparent)]
    InvalidKaiId(#[from] KaiIdError),
    #[error("Failed to spawn the kai worker thread: {0}")]
    WorkerSpawn(#[source] std::io::Error),
}

/// One SDK instance: credentials, session, event queue, listeners and the
/// worker thread.
///
/// Capability masks and device records outlive [`disconnect`](Self::disconnect)
/// so a later connect can restore the subscriptions.
pub struct KaiSdk {
    config: HubConfig,
    credentials: Option<Credentials>,
    session: Arc<Mutex<Session>>,
    queue: Arc<EventQueue>,
    listeners: Listeners,
    worker: Option<Worker>,
}

impl KaiSdk {
    pub fn new(config: HubConfig) -> Self {
        Self {
            config,
            credentials: None,
            session: Arc::new(Mutex::new(Session::new())),
            queue: Arc::new(EventQueue::new()),
            listeners: Listeners::new(),
            worker: None,
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Store the module credentials. A second call while initialised is a
    /// no-op; returns whether this call did anything.
    pub fn initialise(&mut self, module_id: impl Into<String>, secret: impl Into<String>) -> bool {
        if self.credentials.is_some() {
            debug!("already initialised");
            return false;
        }
        let credentials = Credentials::new(module_id, secret);
        info!("initialised as module {}", credentials.module_id);
        self.credentials = Some(credentials);
        true
    }

    pub fn is_initialised(&self) -> bool {
        self.credentials.is_some()
    }

    /// Start the background worker. Does nothing if a worker is already
    /// running.
    pub fn connect(&mut self) -> Result<(), SdkError> {
        let credentials = self.credentials.clone().ok_or(SdkError::NotInitialised)?;
        if self.worker.as_ref().is_some_and(Worker::is_running) {
            debug!("worker already running");
            return Ok(());
        }
        // A worker that gave up is joined before starting over
        if let Some(mut stale) = self.worker.take() {
            stale.shutdown();
        }

        self.worker = Some(Worker::spawn(
            &self.config,
            credentials,
            Arc::clone(&self.session),
            Arc::clone(&self.queue),
        )?);
        Ok(())
    }

    /// Close the socket, wait for the worker to exit and forget the
    /// credentials. Safe to call at any time.
    pub fn disconnect(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.shutdown();
        }
        lock_session(&self.session).set_state(ConnectionState::Disconnected);
        if self.credentials.take().is_some() {
            info!("disconnected");
        }
    }

    /// Ask the hub for its device roster. The reply updates the registry.
    pub fn get_connected_kais(&self) {
        self.send(kaiproto::Outbound::ListConnectedKais);
    }

    /// Devices announced so far, in slot order.
    pub fn connected_kais(&self) -> Vec<Device> {
        lock_session(&self.session).devices().cloned().collect()
    }

    pub fn set_capabilities(&self, target: impl Into<KaiTarget>, flags: impl Into<Capabilities>) {
        let msg = lock_session(&self.session).set_capabilities(target.into(), flags.into());
        if let Some(msg) = msg {
            self.send(msg);
        }
    }

    pub fn unset_capabilities(&self, target: impl Into<KaiTarget>, flags: impl Into<Capabilities>) {
        let msg = lock_session(&self.session).unset_capabilities(target.into(), flags.into());
        if let Some(msg) = msg {
            self.send(msg);
        }
    }

    /// Current local mask for a target.
    pub fn capabilities(&self, target: impl Into<KaiTarget>) -> Capabilities {
        lock_session(&self.session).capabilities(target.into())
    }

    /// The device in slot `id`, if one has been announced. Fails for IDs
    /// outside `0..8`.
    pub fn get_kai_by_id(&self, id: u8) -> Result<Option<Device>, SdkError> {
        let id = KaiId::try_from(id)?;
        Ok(lock_session(&self.session).device(id).cloned())
    }

    pub fn alias_binding(&self, alias: Alias) -> Option<AliasBinding> {
        lock_session(&self.session).alias_binding(alias)
    }

    /// Last foreground process the hub reported.
    pub fn foreground_process(&self) -> Option<String> {
        lock_session(&self.session)
            .foreground_process()
            .map(str::to_string)
    }

    pub fn connection_state(&self) -> ConnectionState {
        lock_session(&self.session).state()
    }

    pub fn is_authenticated(&self) -> bool {
        self.connection_state() == ConnectionState::Authenticated
    }

    /// Register a callback for one event kind on a device, alias or `Any`.
    pub fn subscribe<F>(&mut self, target: impl Into<KaiTarget>, kind: EventKind, callback: F)
    where
        F: FnMut(&Delivery) + Send + 'static,
    {
        self.listeners
            .subscribe(Recipient::Target(target.into()), kind, Box::new(callback));
    }

    /// Hub error envelopes.
    pub fn on_error<F>(&mut self, callback: F)
    where
        F: FnMut(&Delivery) + Send + 'static,
    {
        self.listeners
            .subscribe(Recipient::Sdk, EventKind::Error, Box::new(callback));
    }

    /// Successful envelopes of a type this SDK doesn't know.
    pub fn on_unknown_data<F>(&mut self, callback: F)
    where
        F: FnMut(&Delivery) + Send + 'static,
    {
        self.listeners
            .subscribe(Recipient::Sdk, EventKind::UnknownData, Box::new(callback));
    }

    /// Deliver everything queued since the last call. Call once per host
    /// tick. Returns the number of callbacks invoked.
    pub fn process_pending_events(&mut self) -> usize {
        self.queue
            .drain()
            .iter()
            .map(|delivery| self.listeners.deliver(delivery))
            .sum()
    }

    fn send(&self, msg: kaiproto::Outbound) {
        match &self.worker {
            Some(worker) => worker.send(msg),
            None => debug!("not connected, dropping {}", msg.type_name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_requires_initialise() {
        let mut sdk = KaiSdk::new(HubConfig::default());
        assert!(matches!(sdk.connect(), Err(SdkError::NotInitialised)));
        assert_eq!(sdk.connection_state(), ConnectionState::Disconnected);
    }

    #[test]
    fn initialise_is_idempotent() {
        let mut sdk = KaiSdk::new(HubConfig::default());
        assert!(sdk.initialise("mod", "pw"));
        assert!(!sdk.initialise("other", "pw2"));
        assert!(sdk.is_initialised());

        sdk.disconnect();
        assert!(!sdk.is_initialised());
        assert!(sdk.initialise("other", "pw2"));
    }

    #[test]
    fn kai_lookup_checks_range() {
        let sdk = KaiSdk::new(HubConfig::default());
        assert!(matches!(sdk.get_kai_by_id(7), Ok(None)));
        assert!(matches!(
            sdk.get_kai_by_id(8),
            Err(SdkError::InvalidKaiId(KaiIdError(8)))
        ));
    }

    #[test]
    fn capabilities_stay_local_while_disconnected() {
        let sdk = KaiSdk::new(HubConfig::default());
        sdk.set_capabilities(KaiTarget::DEFAULT, Capability::GestureData | Capability::PyrData);
        sdk.unset_capabilities(KaiTarget::DEFAULT, Capability::PyrData);
        assert_eq!(
            sdk.capabilities(KaiTarget::DEFAULT),
            Capabilities::from(Capability::GestureData)
        );
    }

    #[test]
    fn pump_delivers_in_order_and_defers_later_pushes() {
        let mut sdk = KaiSdk::new(HubConfig::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let id = KaiId::new(0).unwrap();
        let flags = kaiproto::DefaultFlags::default();

        // A push made while a pass is running belongs to the next pass
        let sink = Arc::clone(&seen);
        let queue = Arc::clone(&sdk.queue);
        sdk.subscribe(KaiTarget::Any, EventKind::Gesture, move |d| {
            if d.event == KaiEvent::Gesture(Gesture::SwipeUp) {
                queue.push_fanned(id, flags, &KaiEvent::Gesture(Gesture::GrabBegin));
            }
            sink.lock().unwrap().push(d.event.clone());
        });

        sdk.queue.push_fanned(id, flags, &KaiEvent::Gesture(Gesture::SwipeUp));
        sdk.queue.push_fanned(id, flags, &KaiEvent::Gesture(Gesture::SwipeDown));

        assert_eq!(sdk.process_pending_events(), 2);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                KaiEvent::Gesture(Gesture::SwipeUp),
                KaiEvent::Gesture(Gesture::SwipeDown),
            ]
        );

        assert_eq!(sdk.process_pending_events(), 1);
        assert_eq!(
            seen.lock().unwrap().last(),
            Some(&KaiEvent::Gesture(Gesture::GrabBegin))
        );
        assert_eq!(sdk.process_pending_events(), 0);
    }
}
