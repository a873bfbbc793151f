//! Worker-to-pump event handoff.
//!
//! The worker pushes [`Delivery`] records onto an [`EventQueue`]; the host's
//! tick drains the whole queue in one step and hands each record to the
//! [`Listeners`] registered for its recipient and event kind. Anything pushed
//! while a drain is being delivered waits for the next drain.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use kaiproto::{DefaultFlags, EventKind, KaiEvent, KaiId, KaiTarget};

/// Who a delivery is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Recipient {
    /// SDK-level listeners: hub errors and unrecognised envelopes.
    Sdk,
    /// A device, an alias, or `Any`.
    Target(KaiTarget),
}

impl From<KaiTarget> for Recipient {
    fn from(target: KaiTarget) -> Self {
        Recipient::Target(target)
    }
}

/// One event bound to one recipient.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub recipient: Recipient,
    /// Device that produced the event; `None` for SDK-level deliveries.
    pub source: Option<KaiId>,
    pub event: KaiEvent,
}

impl Delivery {
    pub fn sdk(event: KaiEvent) -> Self {
        Self {
            recipient: Recipient::Sdk,
            source: None,
            event,
        }
    }
}

/// Recipients for one device event: flagged aliases first (Default,
/// DefaultLeft, DefaultRight), then the device itself, then `Any`.
pub fn fan_out(source: KaiId, defaults: DefaultFlags) -> impl Iterator<Item = KaiTarget> {
    let aliases: Vec<KaiTarget> = defaults.aliases().map(KaiTarget::Alias).collect();
    aliases
        .into_iter()
        .chain([KaiTarget::Kai(source), KaiTarget::Any])
}

/// Mutex-guarded FIFO shared by the worker (producer) and the pump.
#[derive(Debug, Default)]
pub struct EventQueue {
    pending: Mutex<Vec<Delivery>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Delivery>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, delivery: Delivery) {
        self.lock().push(delivery);
    }

    /// Push one event for each recipient, in order.
    pub fn push_fanned(&self, source: KaiId, defaults: DefaultFlags, event: &KaiEvent) {
        let mut pending = self.lock();
        for target in fan_out(source, defaults) {
            pending.push(Delivery {
                recipient: Recipient::Target(target),
                source: Some(source),
                event: event.clone(),
            });
        }
    }

    /// Take everything queued so far, leaving the queue empty.
    pub fn drain(&self) -> Vec<Delivery> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Listener callback. Receives the full delivery so `Any` listeners can see
/// which device an event came from.
pub type Callback = Box<dyn FnMut(&Delivery) + Send>;

/// Callbacks keyed by recipient and event kind.
#[derive(Default)]
pub struct Listeners {
    table: HashMap<(Recipient, EventKind), Vec<Callback>>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, recipient: Recipient, kind: EventKind, callback: Callback) {
        self.table.entry((recipient, kind)).or_default().push(callback);
    }

    /// Remove every callback for one recipient/kind pair.
    pub fn clear(&mut self, recipient: Recipient, kind: EventKind) {
        self.table.remove(&(recipient, kind));
    }

    /// Invoke every matching callback in registration order. Returns how many
    /// ran; zero when nobody is listening.
    pub fn deliver(&mut self, delivery: &Delivery) -> usize {
        match self.table.get_mut(&(delivery.recipient, delivery.event.kind())) {
            Some(callbacks) => {
                for callback in callbacks.iter_mut() {
                    callback(delivery);
                }
                callbacks.len()
            }
            None => 0,
        }
    }
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("keys", &self.table.len())
            .finish()
    }
}
