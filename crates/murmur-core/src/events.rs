//! Typed in-process event bus.
//!
//! Services publish [`CoreEvent`]s; front ends subscribe with an explicit
//! lifetime and deregister through the returned handle. This replaces ad hoc
//! callback wiring between components.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::queue::PendingRequest;

/// App-level events published by the core.
#[derive(Debug, Clone)]
pub enum CoreEvent {
    /// Network reachability changed.
    ConnectivityChanged { online: bool },
    /// The outbound queue mutated; current snapshot attached.
    QueueChanged(Vec<PendingRequest>),
}

type Handler = Arc<dyn Fn(&CoreEvent) + Send + Sync>;

#[derive(Default)]
struct BusInner {
    handlers: Mutex<Vec<(u64, Handler)>>,
    next_id: AtomicU64,
}

/// Handle for deregistering a bus handler. Unsubscribing twice is a no-op.
pub struct BusSubscription {
    inner: Arc<BusInner>,
    id: u64,
}

impl BusSubscription {
    pub fn unsubscribe(&self) {
        self.inner.handlers.lock().retain(|(id, _)| *id != self.id);
    }
}

#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, handler: impl Fn(&CoreEvent) + Send + Sync + 'static) -> BusSubscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.handlers.lock().push((id, Arc::new(handler)));
        BusSubscription {
            inner: Arc::clone(&self.inner),
            id,
        }
    }

    pub fn emit(&self, event: CoreEvent) {
        // Handlers run outside the registry lock so they may subscribe or
        // unsubscribe in response to an event.
        let handlers: Vec<Handler> = self
            .inner
            .handlers
            .lock()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();
        for handler in handlers {
            handler(&event);
        }
    }
}
