//! Inbound message subscribers.
//!
//! Any number of listeners can subscribe. Each gets a [`ListenerHandle`]
//! that removes exactly that subscription. Notification walks a snapshot of
//! the list, so a listener may add or remove listeners while being called,
//! and a listener that panics is logged and skipped without affecting the
//! others.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use switchboard_types::Message;
use tracing::error;

type Listener = Arc<dyn Fn(&Message) + Send + Sync>;

/// The set of subscribed listeners.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    entries: Mutex<Vec<(u64, Listener)>>,
}

impl ListenerRegistry {
    /// An empty registry.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Subscribe `listener` to every inbound message.
    pub fn add(
        self: &Arc<Self>,
        listener: impl Fn(&Message) + Send + Sync + 'static,
    ) -> ListenerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().push((id, Arc::new(listener)));
        ListenerHandle {
            id,
            registry: Arc::downgrade(self),
        }
    }

    /// Deliver `message` to every listener subscribed right now.
    pub fn notify(&self, message: &Message) {
        let snapshot: Vec<Listener> = self
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener(message))).is_err() {
                error!(kind = message.kind(), "message listener panicked");
            }
        }
    }

    /// Number of subscribed listeners.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nobody is subscribed.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn remove(&self, id: u64) -> bool {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|(entry, _)| *entry != id);
        entries.len() != before
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(u64, Listener)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish_non_exhaustive()
    }
}

/// Removes one listener subscription.
///
/// Dropping the handle leaves the listener subscribed.
#[derive(Debug, Clone)]
pub struct ListenerHandle {
    id: u64,
    registry: Weak<ListenerRegistry>,
}

impl ListenerHandle {
    /// Unsubscribe. Returns `false` if already removed.
    pub fn remove(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.remove(self.id))
    }
}
