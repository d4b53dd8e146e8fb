//! Frame clocks and timing utilities for preview playback.
//!
//! Playback never reads wall time directly. It goes through a [`FrameClock`],
//! which provides:
//! - `now()`: a monotonic timestamp relative to the clock's epoch
//! - `schedule()`/`cancel()`: one-shot timers identified by [`TimerId`]
//!
//! Timers never invoke callbacks themselves. The host asks the clock which
//! timers are due and forwards each id to whoever scheduled it, which keeps
//! every tick on the host's single-threaded event loop.
//!
//! [`ManualClock`] is driven explicitly (tests, offline stepping);
//! [`MonotonicClock`] follows `Instant::now()`.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Handle for a scheduled one-shot timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    /// Raw numeric id (for logging).
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Injectable time source used by the playback controller.
pub trait FrameClock {
    /// Time elapsed since the clock's epoch.
    fn now(&self) -> Duration;

    /// Arm a one-shot timer that becomes due `delay` from now.
    fn schedule(&self, delay: Duration) -> TimerId;

    /// Disarm a timer. Cancelling a timer that already fired is a no-op.
    fn cancel(&self, id: TimerId);
}

/// Pending timers ordered by deadline.
#[derive(Debug, Default)]
pub struct TimerQueue {
    next_id: u64,
    // (deadline, id) keeps same-deadline timers in scheduling order.
    pending: BTreeSet<(Duration, u64)>,
    deadlines: BTreeMap<u64, Duration>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a timer firing at `deadline`.
    pub fn insert(&mut self, deadline: Duration) -> TimerId {
        self.next_id += 1;
        let id = self.next_id;
        self.pending.insert((deadline, id));
        self.deadlines.insert(id, deadline);
        TimerId(id)
    }

    /// Remove a pending timer. Returns `false` if it was not pending.
    pub fn remove(&mut self, id: TimerId) -> bool {
        match self.deadlines.remove(&id.0) {
            Some(deadline) => {
                self.pending.remove(&(deadline, id.0));
                true
            }
            None => false,
        }
    }

    /// Pop every timer whose deadline is `<= now`, earliest first.
    pub fn take_due(&mut self, now: Duration) -> Vec<TimerId> {
        let mut due = Vec::new();
        while let Some((deadline, id)) = self.pending.first().copied() {
            if deadline > now {
                break;
            }
            self.pending.remove(&(deadline, id));
            self.deadlines.remove(&id);
            due.push(TimerId(id));
        }
        due
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.pending.first().map(|(deadline, _)| *deadline)
    }

    /// Number of armed timers.
    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Duration>,
    timers: RefCell<TimerQueue>,
}

impl ManualClock {
    /// Create a manual clock at t = 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a manual clock wrapped for sharing with a controller.
    pub fn shared() -> Rc<Self> {
        Rc::new(Self::new())
    }

    /// Move time forward and return the timers that became due.
    pub fn advance(&self, by: Duration) -> Vec<TimerId> {
        self.now.set(self.now.get() + by);
        self.timers.borrow_mut().take_due(self.now.get())
    }

    /// Move time forward to the next pending deadline, if any.
    pub fn advance_to_next(&self) -> Vec<TimerId> {
        let next = self.timers.borrow().next_deadline();
        match next {
            Some(deadline) => {
                if deadline > self.now.get() {
                    self.now.set(deadline);
                }
                self.timers.borrow_mut().take_due(self.now.get())
            }
            None => Vec::new(),
        }
    }

    /// Number of armed timers.
    pub fn pending_timers(&self) -> usize {
        self.timers.borrow().len()
    }
}

impl FrameClock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn schedule(&self, delay: Duration) -> TimerId {
        let deadline = self.now.get() + delay;
        self.timers.borrow_mut().insert(deadline)
    }

    fn cancel(&self, id: TimerId) {
        self.timers.borrow_mut().remove(id);
    }
}

/// A clock anchored to a real monotonic instant.
#[derive(Debug)]
pub struct MonotonicClock {
    /// The instant the clock started.
    epoch: Instant,

    /// Wall-clock time at epoch (ISO 8601 string).
    epoch_wall: String,

    timers: RefCell<TimerQueue>,
}

impl MonotonicClock {
    /// Create a clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
            timers: RefCell::new(TimerQueue::new()),
        }
    }

    /// Wall-clock time at clock start.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }

    /// Timers that are due right now.
    pub fn due_timers(&self) -> Vec<TimerId> {
        let now = self.now();
        self.timers.borrow_mut().take_due(now)
    }

    /// Real instant at which the next timer becomes due.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers
            .borrow()
            .next_deadline()
            .map(|deadline| self.epoch + deadline)
    }
}

impl FrameClock for MonotonicClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }

    fn schedule(&self, delay: Duration) -> TimerId {
        let deadline = self.now() + delay;
        self.timers.borrow_mut().insert(deadline)
    }

    fn cancel(&self, id: TimerId) {
        self.timers.borrow_mut().remove(id);
    }
}

/// A scheduled timer that is cancelled when dropped.
///
/// Holding the timer in an owner's field means every exit path (explicit
/// release, early return, unwinding, dropping the owner) disarms it.
pub struct ScheduledTimer {
    clock: Rc<dyn FrameClock>,
    id: TimerId,
}

impl ScheduledTimer {
    /// Arm a timer on `clock`.
    pub fn schedule(clock: &Rc<dyn FrameClock>, delay: Duration) -> Self {
        let id = clock.schedule(delay);
        Self {
            clock: Rc::clone(clock),
            id,
        }
    }

    pub fn id(&self) -> TimerId {
        self.id
    }
}

impl Drop for ScheduledTimer {
    fn drop(&mut self) {
        self.clock.cancel(self.id);
    }
}

impl std::fmt::Debug for ScheduledTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledTimer").field("id", &self.id).finish()
    }
}

/// Convert a frame count to seconds.
pub fn frames_to_secs(frames: u64, fps: u32) -> f64 {
    frames as f64 / fps.max(1) as f64
}

/// Convert seconds to the nearest whole frame (negative inputs allowed).
pub fn secs_to_frames(secs: f64, fps: u32) -> i64 {
    (secs * fps.max(1) as f64).round() as i64
}

/// Duration of a single frame at `fps × rate`.
pub fn frame_interval(fps: u32, rate: f64) -> Duration {
    let hz = fps.max(1) as f64 * rate;
    Duration::from_secs_f64(1.0 / hz)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_fires_in_deadline_order() {
        let clock = ManualClock::new();
        let late = clock.schedule(Duration::from_millis(40));
        let early = clock.schedule(Duration::from_millis(10));

        assert!(clock.advance(Duration::from_millis(5)).is_empty());
        assert_eq!(clock.advance(Duration::from_millis(40)), vec![early, late]);
        assert_eq!(clock.pending_timers(), 0);
    }

    #[test]
    fn test_cancelled_timer_never_fires() {
        let clock = ManualClock::new();
        let id = clock.schedule(Duration::from_millis(10));
        clock.cancel(id);
        assert!(clock.advance(Duration::from_secs(1)).is_empty());
    }

    #[test]
    fn test_scheduled_timer_cancels_on_drop() {
        let manual = ManualClock::shared();
        let clock: Rc<dyn FrameClock> = manual.clone();
        {
            let _timer = ScheduledTimer::schedule(&clock, Duration::from_millis(33));
            assert_eq!(manual.pending_timers(), 1);
        }
        assert_eq!(manual.pending_timers(), 0);
    }

    #[test]
    fn test_advance_to_next_jumps_to_deadline() {
        let clock = ManualClock::new();
        let id = clock.schedule(Duration::from_millis(25));
        assert_eq!(clock.advance_to_next(), vec![id]);
        assert_eq!(clock.now(), Duration::from_millis(25));
    }

    #[test]
    fn test_frame_conversions() {
        assert!((frames_to_secs(90, 30) - 3.0).abs() < 1e-9);
        assert_eq!(secs_to_frames(1.5, 30), 45);
        assert_eq!(secs_to_frames(-0.5, 30), -15);
        assert_eq!(frame_interval(30, 2.0), Duration::from_secs_f64(1.0 / 60.0));
    }

    #[test]
    fn test_monotonic_clock_elapsed() {
        let clock = MonotonicClock::start();
        assert!(clock.now() < Duration::from_secs(1));
        assert!(clock.next_deadline().is_none());
    }
}
