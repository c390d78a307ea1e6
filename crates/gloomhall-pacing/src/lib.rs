//! Delayed-event scheduling for room actors.
//!
//! A [`Pacer`] is a single-consumer queue of events that become due after
//! a delay: NPC turn pacing, DM post-combat sequencing, event-reveal
//! pauses. It is designed to sit inside a room actor's `tokio::select!`
//! loop next to the command channel:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         event = pacer.next_due() => { /* handle pacing event */ }
//!     }
//! }
//! ```
//!
//! Every entry is stamped with the pacer's generation token at schedule
//! time. Bumping the generation (game over, room reset) invalidates all
//! earlier entries: they are silently dropped when they come due instead
//! of mutating state that no longer exists. Room teardown needs no
//! cancellation at all — the pacer is owned by the actor and dies with it.

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::trace;

struct Entry<T> {
    due: Instant,
    generation: u64,
    /// Insertion order, used to break deadline ties FIFO.
    seq: u64,
    event: T,
}

/// A queue of delayed events for one room.
pub struct Pacer<T> {
    entries: Vec<Entry<T>>,
    generation: u64,
    next_seq: u64,
}

impl<T> Pacer<T> {
    /// Creates an empty pacer at generation 0.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            generation: 0,
            next_seq: 0,
        }
    }

    /// The current generation token.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Invalidates every event scheduled so far and returns the new
    /// generation. Pending entries are dropped lazily as they come due.
    pub fn bump_generation(&mut self) -> u64 {
        self.generation += 1;
        trace!(generation = self.generation, "pacer generation bumped");
        self.generation
    }

    /// Schedules `event` to become due after `delay`, stamped with the
    /// current generation.
    pub fn schedule(&mut self, delay: Duration, event: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(Entry {
            due: Instant::now() + delay,
            generation: self.generation,
            seq,
            event,
        });
    }

    /// Number of scheduled entries, stale ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops all pending entries without touching the generation.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Waits for the next live event to come due and returns it.
    ///
    /// Stale entries (scheduled before the last generation bump) are
    /// discarded as they surface. When the queue is empty this future
    /// pends forever, which is exactly what a `select!` loop wants: the
    /// command branch stays responsive and the pacer branch never fires.
    pub async fn next_due(&mut self) -> T {
        loop {
            // Drop stale entries eagerly so they don't hold the earliest
            // deadline hostage.
            let generation = self.generation;
            self.entries.retain(|e| {
                if e.generation != generation {
                    trace!(
                        entry_generation = e.generation,
                        generation,
                        "dropping stale pacing entry"
                    );
                    false
                } else {
                    true
                }
            });

            let Some(idx) = self.earliest() else {
                std::future::pending::<()>().await;
                unreachable!()
            };

            time::sleep_until(self.entries[idx].due).await;

            // Indices are only valid until the next retain; find the
            // entry again after the sleep.
            if let Some(idx) = self.earliest() {
                let entry = self.entries.swap_remove(idx);
                if entry.generation == self.generation {
                    return entry.event;
                }
            }
        }
    }

    fn earliest(&self) -> Option<usize> {
        self.entries
            .iter()
            .enumerate()
            .min_by_key(|(_, e)| (e.due, e.seq))
            .map(|(i, _)| i)
    }
}

impl<T> Default for Pacer<T> {
    fn default() -> Self {
        Self::new()
    }
}
