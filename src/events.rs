//! Engine events and the pub/sub bus carrying them.
//!
//! Events represent things that have happened (past tense) on the
//! control path. They are broadcast to all subscribers without blocking;
//! the engine never waits on a slow listener.

use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;

/// Events published by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// The engine finished construction and is ready for playback.
    /// One-shot replacement for a process-wide "did initialize"
    /// broadcast: only subscribers of this engine instance see it.
    Initialized,

    /// A non-looping effect ran to the end of its buffer and its bus was
    /// reclaimed
    EffectFinished { bus: usize },

    /// The BGM stream ran to the end of its buffer (non-looping BGM)
    BgmFinished,

    /// A fade-out on the BGM bus reached silence and playback stopped
    BgmFadedOut,

    /// A reclamation pass evicted this many idle sounds
    SoundsPurged { evicted: usize },
}

/// Subscriber ID for tracking subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(usize);

struct Subscriber {
    id: SubscriberId,
    sender: Sender<EngineEvent>,
}

/// Broadcast bus for engine events.
///
/// Cloning yields a handle to the same subscriber list, so the host can
/// keep a handle after handing the engine to whatever drives the tick.
pub struct EventBus {
    subscribers: Arc<RwLock<Vec<Subscriber>>>,
    next_id: Arc<RwLock<usize>>,
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(Vec::new())),
            next_id: Arc::new(RwLock::new(0)),
        }
    }

    /// Subscribe to events, returns a receiver and subscription ID
    pub fn subscribe(&self) -> (Receiver<EngineEvent>, SubscriberId) {
        let (tx, rx) = unbounded();

        let mut next_id = self.next_id.write();
        let id = SubscriberId(*next_id);
        *next_id += 1;
        drop(next_id);

        self.subscribers.write().push(Subscriber { id, sender: tx });

        (rx, id)
    }

    /// Unsubscribe from events
    pub fn unsubscribe(&self, id: SubscriberId) {
        self.subscribers.write().retain(|s| s.id != id);
    }

    /// Publish an event to all subscribers (non-blocking).
    ///
    /// Subscribers whose receiver has been dropped are pruned from the
    /// list here, so abandoned subscriptions do not accumulate.
    pub fn publish(&self, event: EngineEvent) {
        self.subscribers
            .write()
            .retain(|subscriber| subscriber.sender.try_send(event.clone()).is_ok());
    }

    /// Get number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            subscribers: Arc::clone(&self.subscribers),
            next_id: Arc::clone(&self.next_id),
        }
    }
}
