//! Outbound request queue.
//!
//! Serializes side-effecting remote calls so they run strictly in submission
//! order. At most one drain loop runs at a time, guarded by an atomic
//! compare-and-swap. A failing head entry stays queued and blocks everything
//! behind it until a later drain succeeds or the queue is cleared; a delayed
//! re-drain fires after each failure, and [`RequestQueue::retry_queue`] is
//! the external trigger for connectivity-restored situations.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::constants::DRAIN_RETRY_DELAY_MS;
use crate::error::Result;

/// A queued operation. Re-invoked on every drain attempt, so it must be a
/// factory producing a fresh future each time.
pub type QueueOp = Arc<dyn Fn() -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Snapshot of one pending entry, safe to hand out.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest {
    pub id: String,
    pub enqueued_at: DateTime<Utc>,
}

struct QueuedRequest {
    id: String,
    enqueued_at: DateTime<Utc>,
    op: QueueOp,
}

type Listener = Arc<dyn Fn(&[PendingRequest]) + Send + Sync>;

struct QueueInner {
    entries: Mutex<VecDeque<QueuedRequest>>,
    listeners: Mutex<Vec<(u64, Listener)>>,
    draining: AtomicBool,
    next_listener_id: AtomicU64,
    drain_retry_delay: Duration,
}

/// Handle for deregistering a queue listener.
///
/// Dropping the handle does NOT unsubscribe; call
/// [`QueueSubscription::unsubscribe`], which is safe to call more than once.
pub struct QueueSubscription {
    inner: Arc<QueueInner>,
    id: u64,
}

impl QueueSubscription {
    pub fn unsubscribe(&self) {
        self.inner.listeners.lock().retain(|(id, _)| *id != self.id);
    }
}

#[derive(Clone)]
pub struct RequestQueue {
    inner: Arc<QueueInner>,
}

impl Default for RequestQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::with_drain_retry_delay(Duration::from_millis(DRAIN_RETRY_DELAY_MS))
    }

    /// Queue with a custom re-drain delay after a head failure.
    pub fn with_drain_retry_delay(delay: Duration) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                entries: Mutex::new(VecDeque::new()),
                listeners: Mutex::new(Vec::new()),
                draining: AtomicBool::new(false),
                next_listener_id: AtomicU64::new(0),
                drain_retry_delay: delay,
            }),
        }
    }

    /// Append an operation and return its id without waiting for completion.
    /// Starts the drain loop if it is idle.
    pub fn add(&self, op: QueueOp) -> String {
        let id = self.next_id();
        {
            let mut entries = self.inner.entries.lock();
            entries.push_back(QueuedRequest {
                id: id.clone(),
                enqueued_at: Utc::now(),
                op,
            });
        }
        self.notify();
        self.start_drain();
        id
    }

    /// Ids are UUIDv7: timestamp-derived, so they order by enqueue time.
    fn next_id(&self) -> String {
        Uuid::now_v7().to_string()
    }

    /// External re-trigger, e.g. when connectivity returns. Idempotent: a
    /// no-op when the queue is empty or a drain loop is already running.
    pub fn retry_queue(&self) {
        let pending = self.inner.entries.lock().len();
        if pending == 0 {
            return;
        }
        tracing::info!(pending, "retrying queued requests");
        self.start_drain();
    }

    /// Defensive snapshot of the pending entries, head first.
    pub fn pending(&self) -> Vec<PendingRequest> {
        self.inner
            .entries
            .lock()
            .iter()
            .map(|entry| PendingRequest {
                id: entry.id.clone(),
                enqueued_at: entry.enqueued_at,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.lock().is_empty()
    }

    /// Register a listener invoked with a snapshot on every mutation: add,
    /// successful removal, clear. Listener order is unspecified.
    pub fn subscribe(
        &self,
        listener: impl Fn(&[PendingRequest]) + Send + Sync + 'static,
    ) -> QueueSubscription {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners.lock().push((id, Arc::new(listener)));
        QueueSubscription {
            inner: Arc::clone(&self.inner),
            id,
        }
    }

    /// Drop every pending entry and notify listeners. An operation already
    /// mid-flight is not interrupted; the drain loop notices the empty queue
    /// on its next pass.
    pub fn clear(&self) {
        self.inner.entries.lock().clear();
        self.notify();
    }

    fn notify(&self) {
        let snapshot = self.pending();
        // Invoke outside the registry lock so a listener may subscribe or
        // unsubscribe without deadlocking.
        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(&snapshot);
        }
    }

    fn start_drain(&self) {
        if self
            .inner
            .draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        let queue = self.clone();
        tokio::spawn(async move { queue.drain().await });
    }

    /// Runs with the draining flag held. Strict FIFO; stops on the first
    /// failure, leaving the failed entry at the head.
    async fn drain(self) {
        loop {
            let head = {
                let entries = self.inner.entries.lock();
                entries.front().map(|entry| (entry.id.clone(), Arc::clone(&entry.op)))
            };
            let Some((id, op)) = head else { break };

            match op().await {
                Ok(()) => {
                    // clear() may have raced with the await; only remove the
                    // entry that actually ran.
                    let removed = {
                        let mut entries = self.inner.entries.lock();
                        if entries.front().map(|entry| entry.id.as_str()) == Some(id.as_str()) {
                            entries.pop_front();
                            true
                        } else {
                            false
                        }
                    };
                    if removed {
                        self.notify();
                    }
                }
                Err(err) => {
                    tracing::warn!(id = %id, error = %err, "queued request failed, leaving at head");
                    self.inner.draining.store(false, Ordering::Release);
                    self.schedule_redrain();
                    return;
                }
            }
        }
        self.inner.draining.store(false, Ordering::Release);
        // An add() racing with loop exit may have seen the flag still set;
        // re-check so its entry is not stranded.
        if !self.is_empty() {
            self.start_drain();
        }
    }

    fn schedule_redrain(&self) {
        if self.is_empty() {
            return;
        }
        let queue = self.clone();
        let delay = self.inner.drain_retry_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.retry_queue();
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    use super::*;
    use crate::error::Error;

    fn test_queue() -> RequestQueue {
        RequestQueue::with_drain_retry_delay(Duration::from_millis(10))
    }

    fn succeeding_op(log: Arc<Mutex<Vec<&'static str>>>, label: &'static str) -> QueueOp {
        Arc::new(move || {
            let log = Arc::clone(&log);
            Box::pin(async move {
                log.lock().push(label);
                Ok(())
            })
        })
    }

    fn failing_op(attempts: Arc<AtomicU32>) -> QueueOp {
        Arc::new(move || {
            let attempts = Arc::clone(&attempts);
            Box::pin(async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(Error::Network("offline".to_string()))
            })
        })
    }

    async fn wait_until_empty(queue: &RequestQueue) {
        for _ in 0..500 {
            if queue.is_empty() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("queue never drained: {} entries left", queue.len());
    }

    #[tokio::test]
    async fn test_fifo_order_and_empty_afterwards() {
        let queue = test_queue();
        let log = Arc::new(Mutex::new(Vec::new()));
        let notifications = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&notifications);
        let _subscription = queue.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        queue.add(succeeding_op(Arc::clone(&log), "a"));
        queue.add(succeeding_op(Arc::clone(&log), "b"));
        queue.add(succeeding_op(Arc::clone(&log), "c"));
        wait_until_empty(&queue).await;

        assert_eq!(*log.lock(), vec!["a", "b", "c"]);
        // One notification per add plus one per successful removal.
        assert_eq!(notifications.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_ids_are_ordered() {
        let queue = test_queue();
        let log = Arc::new(Mutex::new(Vec::new()));
        let first = queue.add(succeeding_op(Arc::clone(&log), "a"));
        let second = queue.add(succeeding_op(Arc::clone(&log), "b"));
        assert_ne!(first, second);
        wait_until_empty(&queue).await;
    }

    #[tokio::test]
    async fn test_failing_head_blocks_the_rest() {
        let queue = test_queue();
        let attempts = Arc::new(AtomicU32::new(0));
        let ran_b = Arc::new(AtomicBool::new(false));

        queue.add(failing_op(Arc::clone(&attempts)));
        let flag = Arc::clone(&ran_b);
        queue.add(Arc::new(move || {
            let flag = Arc::clone(&flag);
            Box::pin(async move {
                flag.store(true, Ordering::SeqCst);
                Ok(())
            })
        }));

        // Give the drain loop several failure/re-drain cycles.
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(attempts.load(Ordering::SeqCst) >= 2, "head should be re-attempted");
        assert!(!ran_b.load(Ordering::SeqCst), "entry behind a failing head must not run");
        assert_eq!(queue.pending().len(), 2);

        queue.clear();
        assert!(queue.is_empty());
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(!ran_b.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_queue_resumes_once_head_succeeds() {
        let queue = test_queue();
        let attempts = Arc::new(AtomicU32::new(0));
        let log = Arc::new(Mutex::new(Vec::new()));

        // Fails twice, then succeeds.
        let counter = Arc::clone(&attempts);
        let head_log = Arc::clone(&log);
        queue.add(Arc::new(move || {
            let counter = Arc::clone(&counter);
            let log = Arc::clone(&head_log);
            Box::pin(async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(Error::Timeout("still offline".to_string()))
                } else {
                    log.lock().push("a");
                    Ok(())
                }
            })
        }));
        queue.add(succeeding_op(Arc::clone(&log), "b"));

        wait_until_empty(&queue).await;
        assert_eq!(*log.lock(), vec!["a", "b"]);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_queue_is_idempotent_when_empty() {
        let queue = test_queue();
        queue.retry_queue();
        queue.retry_queue();
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_is_a_copy() {
        let queue = test_queue();
        let attempts = Arc::new(AtomicU32::new(0));
        queue.add(failing_op(Arc::clone(&attempts)));

        let mut snapshot = queue.pending();
        snapshot.clear();
        assert_eq!(queue.pending().len(), 1, "mutating a snapshot must not touch the queue");
        queue.clear();
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent() {
        let queue = test_queue();
        let first_count = Arc::new(AtomicU32::new(0));
        let second_count = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&first_count);
        let first = queue.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let counter = Arc::clone(&second_count);
        let _second = queue.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        first.unsubscribe();
        first.unsubscribe();

        let log = Arc::new(Mutex::new(Vec::new()));
        queue.add(succeeding_op(log, "a"));
        wait_until_empty(&queue).await;

        assert_eq!(first_count.load(Ordering::SeqCst), 0);
        assert!(second_count.load(Ordering::SeqCst) >= 2, "surviving listener still notified");
    }

    #[tokio::test]
    async fn test_clear_notifies_listeners() {
        let queue = test_queue();
        let attempts = Arc::new(AtomicU32::new(0));
        queue.add(failing_op(Arc::clone(&attempts)));

        let notified = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&notified);
        let _subscription = queue.subscribe(move |snapshot| {
            if snapshot.is_empty() {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        queue.clear();
        assert!(notified.load(Ordering::SeqCst) >= 1);
    }
}
