//! Dispatch queue between the event listener and the reassigner.
//!
//! An unbounded FIFO channel with one producer and one consumer, plus
//! join semantics: the consumer acknowledges each item once it has been
//! handled, and the producer can wait until everything pushed so far has
//! been acknowledged.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tokio::sync::mpsc;

/// The consumer side of a dispatch queue has been dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("dispatch queue closed")]
pub struct QueueClosed;

/// Count of pushed but not yet acknowledged items.
struct Pending {
    count: Mutex<usize>,
    drained: Condvar,
}

impl Pending {
    fn new() -> Self {
        Self {
            count: Mutex::new(0),
            drained: Condvar::new(),
        }
    }

    fn increment(&self) {
        *self.count.lock() += 1;
    }

    fn decrement(&self) {
        let mut count = self.count.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.drained.notify_all();
        }
    }

    fn clear(&self) {
        *self.count.lock() = 0;
        self.drained.notify_all();
    }
}

/// Creates a dispatch queue, returning its producer and consumer halves.
///
/// # Example
///
/// ```
/// use sink_redirect::pipeline::dispatch_queue;
///
/// let (producer, mut consumer) = dispatch_queue();
/// producer.push(1).unwrap();
/// producer.push(2).unwrap();
/// drop(producer);
///
/// assert_eq!(consumer.pop(), Some(1));
/// consumer.ack();
/// assert_eq!(consumer.pop(), Some(2));
/// consumer.ack();
/// assert_eq!(consumer.pop(), None);
/// ```
pub fn dispatch_queue<T>() -> (DispatchProducer<T>, DispatchConsumer<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let pending = Arc::new(Pending::new());

    (
        DispatchProducer {
            tx,
            pending: Arc::clone(&pending),
        },
        DispatchConsumer {
            rx,
            pending,
            unacked: 0,
        },
    )
}

/// Producer half of a dispatch queue.
///
/// Pushing never blocks, so it is safe to call from a notification
/// callback.
pub struct DispatchProducer<T> {
    tx: mpsc::UnboundedSender<T>,
    pending: Arc<Pending>,
}

impl<T> DispatchProducer<T> {
    /// Appends an item to the tail of the queue.
    ///
    /// # Errors
    ///
    /// Returns `QueueClosed` if the consumer has been dropped; the item is
    /// discarded.
    pub fn push(&self, item: T) -> Result<(), QueueClosed> {
        self.pending.increment();
        self.tx.send(item).map_err(|_| {
            self.pending.decrement();
            QueueClosed
        })
    }

    /// Returns the number of pushed items not yet acknowledged.
    pub fn pending(&self) -> usize {
        *self.pending.count.lock()
    }

    /// Returns `true` if the consumer has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Blocks until every pushed item has been acknowledged, or the consumer
    /// is dropped.
    pub fn wait_drained(&self) {
        let mut count = self.pending.count.lock();
        while *count > 0 {
            self.pending.drained.wait(&mut count);
        }
    }

    /// Like [`wait_drained`](Self::wait_drained), giving up after `timeout`.
    ///
    /// Returns `true` if the queue drained in time.
    pub fn wait_drained_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut count = self.pending.count.lock();
        while *count > 0 {
            if self
                .pending
                .drained
                .wait_until(&mut count, deadline)
                .timed_out()
            {
                return *count == 0;
            }
        }
        true
    }
}

/// Consumer half of a dispatch queue.
pub struct DispatchConsumer<T> {
    rx: mpsc::UnboundedReceiver<T>,
    pending: Arc<Pending>,
    unacked: usize,
}

impl<T> DispatchConsumer<T> {
    /// Removes and returns the head of the queue, blocking until an item is
    /// available.
    ///
    /// Returns `None` once the producer has been dropped and every item has
    /// been popped.
    ///
    /// # Panics
    ///
    /// Panics if called from within an asynchronous execution context.
    pub fn pop(&mut self) -> Option<T> {
        let item = self.rx.blocking_recv();
        if item.is_some() {
            self.unacked += 1;
        }
        item
    }

    /// Acknowledges one popped item.
    ///
    /// Several pops may be acknowledged later, one `ack` each. Acks beyond
    /// the number of popped items have no effect.
    pub fn ack(&mut self) {
        if self.unacked > 0 {
            self.unacked -= 1;
            self.pending.decrement();
        }
    }
}

impl<T> Drop for DispatchConsumer<T> {
    fn drop(&mut self) {
        // Nothing will acknowledge the remaining items
        self.pending.clear();
    }
}
