use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, VecDeque};

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

use crate::data::PendingItem;
use crate::error::TrackerError;

/// Creates the producer and consumer halves of the work queue.
pub fn work_queue() -> (QueueSender, WorkQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        QueueSender { tx },
        WorkQueue {
            rx,
            ready: VecDeque::new(),
            parked: BinaryHeap::new(),
            seq: 0,
        },
    )
}

/// Cloneable handle used by intake to append items to the queue tail.
#[derive(Debug, Clone)]
pub struct QueueSender {
    tx: mpsc::UnboundedSender<PendingItem>,
}

impl QueueSender {
    pub fn push(&self, item: PendingItem) -> Result<(), TrackerError> {
        self.tx.send(item).map_err(|_| TrackerError::QueueClosed)
    }
}

#[derive(Debug)]
struct Parked {
    ready_at: Instant,
    seq: u64,
    item: PendingItem,
}

impl PartialEq for Parked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Parked {}

impl PartialOrd for Parked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Parked {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.ready_at, self.seq).cmp(&(other.ready_at, other.seq))
    }
}

/// Consumer side of the queue, owned by the poll worker.
///
/// Fresh submissions arrive over an unbounded channel. Items that cannot be
/// attempted yet are parked until a given instant; once due they join the tail
/// of the ready line, behind whatever was already waiting.
#[derive(Debug)]
pub struct WorkQueue {
    rx: mpsc::UnboundedReceiver<PendingItem>,
    ready: VecDeque<PendingItem>,
    parked: BinaryHeap<Reverse<Parked>>,
    seq: u64,
}

impl WorkQueue {
    /// Puts `item` back, to be handed out again no earlier than `ready_at`.
    pub fn requeue_at(&mut self, item: PendingItem, ready_at: Instant) {
        self.seq += 1;
        self.parked.push(Reverse(Parked {
            ready_at,
            seq: self.seq,
            item,
        }));
    }

    /// Returns the next item that is ready right now, without waiting.
    pub fn try_next(&mut self) -> Option<PendingItem> {
        self.fill(Instant::now());
        self.ready.pop_front()
    }

    /// Waits for the next ready item.
    ///
    /// Returns `None` once every sender is gone and nothing is parked.
    pub async fn next(&mut self) -> Option<PendingItem> {
        loop {
            self.fill(Instant::now());
            if let Some(item) = self.ready.pop_front() {
                return Some(item);
            }
            match self.parked.peek().map(|Reverse(p)| p.ready_at) {
                Some(wake_at) => tokio::select! {
                    biased;
                    Some(item) = self.rx.recv() => self.ready.push_back(item),
                    _ = sleep_until(wake_at) => {}
                },
                None => return self.rx.recv().await,
            }
        }
    }

    /// Items already pulled off the channel plus parked ones.
    pub fn len(&self) -> usize {
        self.ready.len() + self.parked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn fill(&mut self, now: Instant) {
        while let Ok(item) = self.rx.try_recv() {
            self.ready.push_back(item);
        }
        while self
            .parked
            .peek()
            .is_some_and(|Reverse(p)| p.ready_at <= now)
        {
            if let Some(Reverse(parked)) = self.parked.pop() {
                self.ready.push_back(parked.item);
            }
        }
    }
}
