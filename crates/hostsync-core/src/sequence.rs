//! Thread-safe ticket counter for ordering overlapping reloads.
//!
//! Every store reload takes a ticket before calling the backend.  Because
//! reloads are asynchronous and nothing stops a user from triggering the
//! same reload twice, two reloads can be in flight at once and complete in
//! either order.  Whichever reload holds the *newest* ticket owns the cache;
//! an older reload that resolves late checks its ticket, finds it stale, and
//! discards its result instead of clobbering fresher data.
//!
//! The counter uses `AtomicU64`, so tickets can be taken from any task
//! without locking.  `Ordering::Relaxed` is sufficient: tickets only order
//! reloads relative to each other, they are not a memory-synchronisation
//! point — the cache itself is protected by its own lock.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonically increasing reload ticket dispenser.
///
/// # Examples
///
/// ```rust
/// use hostsync_core::ReloadSequence;
///
/// let seq = ReloadSequence::new();
/// let first = seq.begin();
/// let second = seq.begin();
/// assert!(!seq.is_current(first), "an older ticket goes stale");
/// assert!(seq.is_current(second));
/// ```
#[derive(Debug, Default)]
pub struct ReloadSequence {
    issued: AtomicU64,
}

impl ReloadSequence {
    /// Creates a dispenser with no tickets issued.
    pub fn new() -> Self {
        Self {
            issued: AtomicU64::new(0),
        }
    }

    /// Issues the next ticket.  The first call returns 1.
    ///
    /// Wraps around at `u64::MAX` without panicking; at one reload per
    /// nanosecond that takes several centuries to reach.
    pub fn begin(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    /// Whether `ticket` is still the newest issued ticket.
    ///
    /// A reload checks this after its backend call resolves; `false` means a
    /// newer reload was issued in the meantime and this result must be
    /// discarded.
    pub fn is_current(&self, ticket: u64) -> bool {
        self.issued.load(Ordering::Relaxed) == ticket
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_first_ticket_is_one_and_current() {
        let seq = ReloadSequence::new();
        let ticket = seq.begin();
        assert_eq!(ticket, 1);
        assert!(seq.is_current(ticket));
    }

    #[test]
    fn test_newer_ticket_invalidates_older_one() {
        let seq = ReloadSequence::new();

        let first = seq.begin();
        let second = seq.begin();

        assert!(!seq.is_current(first));
        assert!(seq.is_current(second));
    }

    #[test]
    fn test_sequential_reloads_are_each_current_in_turn() {
        let seq = ReloadSequence::new();
        for _ in 0..100 {
            let ticket = seq.begin();
            assert!(seq.is_current(ticket));
        }
    }

    #[test]
    fn test_tickets_are_unique_across_threads() {
        let seq = Arc::new(ReloadSequence::new());
        let thread_count = 8;
        let tickets_per_thread = 1000;

        let handles: Vec<_> = (0..thread_count)
            .map(|_| {
                let s = Arc::clone(&seq);
                thread::spawn(move || {
                    (0..tickets_per_thread)
                        .map(|_| s.begin())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().expect("thread panicked"))
            .collect();

        all.sort_unstable();
        all.dedup();
        assert_eq!(
            all.len(),
            thread_count * tickets_per_thread,
            "every ticket must be unique across threads"
        );
    }
}
