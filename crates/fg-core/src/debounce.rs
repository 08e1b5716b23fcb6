//! Per-tab event debouncing
//!
//! Several browser signals fire for one logical navigation. Each tab owns a
//! single delayed-invocation slot; a new event for the tab replaces the
//! pending work and restarts the window, so only the last event survives.
//!
//! Arming a fresh slot is additionally rate-limited per tab by [`Cooldown`].
//! An arm that lands inside the cooldown is deferred, never dropped.
//!
//! Fired work for a tab runs under that tab's run lock, so evaluations for
//! the same tab never overlap. Different tabs are fully independent.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

use crate::types::TabId;

/// Quiet period before a tab's pending evaluation runs.
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(750);

/// Minimum spacing between two armed slots for the same tab.
pub const DEFAULT_REARM_COOLDOWN: Duration = Duration::from_secs(1);

// =============================================================================
// Cooldown
// =============================================================================

/// Per-tab re-arm guard. Time is passed in explicitly.
#[derive(Debug)]
pub struct Cooldown {
    period: Duration,
    last_armed: HashMap<TabId, Instant>,
}

impl Cooldown {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last_armed: HashMap::new(),
        }
    }

    /// Register an arm for `tab_id` at `now` and return the earliest instant
    /// the armed work may run.
    pub fn arm(&mut self, tab_id: TabId, now: Instant) -> Instant {
        let earliest = match self.last_armed.get(&tab_id) {
            Some(&last) => (last + self.period).max(now),
            None => now,
        };
        self.last_armed.insert(tab_id, earliest);
        earliest
    }

    /// Time left before `tab_id` may arm without being deferred.
    pub fn remaining(&self, tab_id: TabId, now: Instant) -> Duration {
        self.last_armed
            .get(&tab_id)
            .map_or(Duration::ZERO, |&last| (last + self.period).saturating_duration_since(now))
    }

    pub fn forget(&mut self, tab_id: TabId) {
        self.last_armed.remove(&tab_id);
    }

    pub fn tracked(&self) -> usize {
        self.last_armed.len()
    }
}

// =============================================================================
// Debouncer
// =============================================================================

/// What happened to a schedule request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmOutcome {
    /// A new slot was armed with the normal window.
    Armed,
    /// A pending slot was replaced and its window restarted.
    Reset,
    /// A new slot was armed but held back by the cooldown.
    Deferred(Duration),
}

struct Slot {
    generation: u64,
    not_before: Instant,
    handle: JoinHandle<()>,
}

struct DebounceState {
    slots: HashMap<TabId, Slot>,
    runners: HashMap<TabId, Arc<tokio::sync::Mutex<()>>>,
    cooldown: Cooldown,
    next_generation: u64,
}

/// Per-tab single-flight delay queue.
pub struct Debouncer {
    window: Duration,
    state: Arc<Mutex<DebounceState>>,
}

impl Debouncer {
    pub fn new(window: Duration, cooldown: Duration) -> Self {
        Self {
            window,
            state: Arc::new(Mutex::new(DebounceState {
                slots: HashMap::new(),
                runners: HashMap::new(),
                cooldown: Cooldown::new(cooldown),
                next_generation: 0,
            })),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Schedule `job` for `tab_id`, replacing any pending job for that tab.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&self, tab_id: TabId, job: F) -> ArmOutcome
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let now = Instant::now();
        let mut state = lock(&self.state);

        let (not_before, outcome) = match state.slots.remove(&tab_id) {
            Some(previous) => {
                previous.handle.abort();
                (previous.not_before, ArmOutcome::Reset)
            }
            None => {
                let earliest = state.cooldown.arm(tab_id, now);
                if earliest > now {
                    (earliest, ArmOutcome::Deferred(earliest - now))
                } else {
                    (now, ArmOutcome::Armed)
                }
            }
        };
        let deadline = (now + self.window).max(not_before);

        state.next_generation += 1;
        let generation = state.next_generation;
        let runner = Arc::clone(state.runners.entry(tab_id).or_default());
        let shared = Arc::clone(&self.state);

        // The state lock is held until the slot is inserted, so the task can
        // never observe the map before its own slot is in it.
        let handle = tokio::spawn(async move {
            sleep_until(deadline).await;

            let still_current = {
                let mut state = lock(&shared);
                let current = state
                    .slots
                    .get(&tab_id)
                    .is_some_and(|slot| slot.generation == generation);
                if current {
                    state.slots.remove(&tab_id);
                }
                current
            };
            if !still_current {
                return;
            }

            let _running = runner.lock().await;
            job.await;
        });

        state.slots.insert(
            tab_id,
            Slot {
                generation,
                not_before,
                handle,
            },
        );

        log::trace!("tab {}: debounce {:?} (generation {})", tab_id, outcome, generation);
        outcome
    }

    /// Abort the tab's pending job, keeping its cooldown state.
    /// Returns true if a job was pending.
    pub fn cancel_pending(&self, tab_id: TabId) -> bool {
        match lock(&self.state).slots.remove(&tab_id) {
            Some(slot) => {
                slot.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Forget the tab entirely: abort its pending job and discard its
    /// cooldown and run-lock state. Jobs already running are left to finish.
    pub fn cancel(&self, tab_id: TabId) -> bool {
        let mut state = lock(&self.state);
        state.cooldown.forget(tab_id);
        state.runners.remove(&tab_id);
        match state.slots.remove(&tab_id) {
            Some(slot) => {
                slot.handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, tab_id: TabId) -> bool {
        lock(&self.state).slots.contains_key(&tab_id)
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.state).slots.len()
    }

    /// Number of tabs with any retained state.
    pub fn tracked_tabs(&self) -> usize {
        let state = lock(&self.state);
        state.cooldown.tracked().max(state.runners.len())
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_WINDOW, DEFAULT_REARM_COOLDOWN)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        for (_, slot) in lock(&self.state).slots.drain() {
            slot.handle.abort();
        }
    }
}

fn lock(state: &Mutex<DebounceState>) -> MutexGuard<'_, DebounceState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    #[test]
    fn test_cooldown_spacing() {
        let mut cooldown = Cooldown::new(Duration::from_secs(1));
        let t0 = Instant::now();

        assert_eq!(cooldown.arm(1, t0), t0);
        assert_eq!(cooldown.remaining(1, t0 + Duration::from_millis(400)), Duration::from_millis(600));

        // Second arm inside the period is pushed to the end of it
        let second = cooldown.arm(1, t0 + Duration::from_millis(400));
        assert_eq!(second, t0 + Duration::from_secs(1));

        // A third arm chains off the deferred one
        let third = cooldown.arm(1, t0 + Duration::from_millis(500));
        assert_eq!(third, t0 + Duration::from_secs(2));

        // Other tabs are unaffected
        assert_eq!(cooldown.arm(2, t0), t0);

        cooldown.forget(1);
        assert_eq!(cooldown.remaining(1, t0), Duration::ZERO);
        assert_eq!(cooldown.tracked(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_coalesces_to_last_event() {
        let debouncer = Debouncer::default();
        let runs = Arc::new(AtomicUsize::new(0));
        let last = Arc::new(AtomicUsize::new(0));

        for i in 1..=5 {
            let runs = Arc::clone(&runs);
            let last = Arc::clone(&last);
            let outcome = debouncer.schedule(1, async move {
                runs.fetch_add(1, Ordering::SeqCst);
                last.store(i, Ordering::SeqCst);
            });
            assert_eq!(outcome, if i == 1 { ArmOutcome::Armed } else { ArmOutcome::Reset });
            sleep(Duration::from_millis(100)).await;
        }

        assert!(debouncer.is_pending(1));
        sleep(Duration::from_secs(2)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(last.load(Ordering::SeqCst), 5);
        assert!(!debouncer.is_pending(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_restarts_on_each_event() {
        let debouncer = Debouncer::default();
        let runs = Arc::new(AtomicUsize::new(0));

        let r = Arc::clone(&runs);
        debouncer.schedule(1, async move {
            r.fetch_add(1, Ordering::SeqCst);
        });
        sleep(Duration::from_millis(700)).await;
        let r = Arc::clone(&runs);
        debouncer.schedule(1, async move {
            r.fetch_add(1, Ordering::SeqCst);
        });
        sleep(Duration::from_millis(700)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        sleep(Duration::from_millis(100)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_is_deferred_by_cooldown() {
        let debouncer = Debouncer::new(Duration::from_millis(50), Duration::from_secs(1));
        let runs = Arc::new(AtomicUsize::new(0));

        let r = Arc::clone(&runs);
        debouncer.schedule(1, async move {
            r.fetch_add(1, Ordering::SeqCst);
        });
        sleep(Duration::from_millis(100)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        let r = Arc::clone(&runs);
        let outcome = debouncer.schedule(1, async move {
            r.fetch_add(1, Ordering::SeqCst);
        });
        assert!(matches!(outcome, ArmOutcome::Deferred(wait) if wait > Duration::from_millis(850)));

        sleep(Duration::from_millis(800)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        sleep(Duration::from_millis(200)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_discards_pending() {
        let debouncer = Debouncer::default();
        let runs = Arc::new(AtomicUsize::new(0));

        let r = Arc::clone(&runs);
        debouncer.schedule(9, async move {
            r.fetch_add(1, Ordering::SeqCst);
        });
        assert!(debouncer.cancel(9));
        assert!(!debouncer.cancel(9));
        assert_eq!(debouncer.tracked_tabs(), 0);

        sleep(Duration::from_secs(2)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert_eq!(debouncer.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_pending_keeps_cooldown() {
        let debouncer = Debouncer::new(Duration::from_millis(50), Duration::from_secs(1));
        debouncer.schedule(4, async {});
        assert!(debouncer.cancel_pending(4));
        let outcome = debouncer.schedule(4, async {});
        assert!(matches!(outcome, ArmOutcome::Deferred(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tabs_are_independent() {
        let debouncer = Debouncer::default();
        let runs = Arc::new(AtomicUsize::new(0));

        for tab in [1, 2, 3] {
            let r = Arc::clone(&runs);
            assert_eq!(
                debouncer.schedule(tab, async move {
                    r.fetch_add(1, Ordering::SeqCst);
                }),
                ArmOutcome::Armed
            );
        }
        debouncer.cancel(2);
        sleep(Duration::from_secs(1)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_tab_runs_do_not_overlap() {
        let debouncer = Debouncer::new(Duration::from_millis(10), Duration::from_millis(10));
        let log = Arc::new(Mutex::new(Vec::new()));

        let l = Arc::clone(&log);
        debouncer.schedule(1, async move {
            l.lock().unwrap().push("first:start");
            sleep(Duration::from_secs(5)).await;
            l.lock().unwrap().push("first:end");
        });
        sleep(Duration::from_millis(100)).await;

        let l = Arc::clone(&log);
        debouncer.schedule(1, async move {
            l.lock().unwrap().push("second:start");
        });
        sleep(Duration::from_secs(10)).await;

        assert_eq!(
            *log.lock().unwrap(),
            vec!["first:start", "first:end", "second:start"]
        );
    }
}
