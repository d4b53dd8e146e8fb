//! Playback state machine.
//!
//! The controller never sleeps or spawns. It arms one-shot timers on its
//! [`FrameClock`] and the host hands due timer ids back through
//! [`PlaybackController::on_timer`]. Each tick recomputes the frame from the
//! time elapsed since the last anchor (play, seek, or rate change), so late
//! ticks skip ahead rather than accumulate drift.

use std::rc::Rc;
use std::time::Duration;

use reelkit_common::clock::{FrameClock, ScheduledTimer, TimerId};
use reelkit_common::error::{ReelError, ReelResult};
use reelkit_project_model::Project;
use reelkit_render_engine::composition_duration;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// State of a preview player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Never started.
    #[default]
    Idle,
    /// Ticking.
    Playing,
    /// Stopped on a frame.
    Paused,
}

/// One of the supported playback speeds.
///
/// Stored in half steps so frame timing stays in integer arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackRate {
    halves: u32,
}

impl PlaybackRate {
    pub const SUPPORTED: [f64; 4] = [0.5, 1.0, 1.5, 2.0];

    pub const NORMAL: PlaybackRate = PlaybackRate { halves: 2 };

    /// Validate a rate. Anything outside [`Self::SUPPORTED`] is rejected.
    pub fn new(rate: f64) -> ReelResult<Self> {
        let halves = (rate * 2.0).round();
        if rate.is_finite() && (rate * 2.0 - halves).abs() < 1e-9 && (1.0..=4.0).contains(&halves)
        {
            Ok(Self {
                halves: halves as u32,
            })
        } else {
            Err(ReelError::playback(format!(
                "Unsupported playback rate {rate} (expected 0.5, 1, 1.5 or 2)"
            )))
        }
    }

    pub fn value(self) -> f64 {
        f64::from(self.halves) / 2.0
    }
}

impl Default for PlaybackRate {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl std::fmt::Display for PlaybackRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x", self.value())
    }
}

/// What a timer callback did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The timer was stale or playback is not running.
    Ignored,
    /// Playback is on this frame and continues.
    Advanced(u64),
    /// Playback passed the last frame and looped to this one.
    Wrapped(u64),
    /// Playback reached the last frame and paused there.
    Ended(u64),
    /// The frame listener failed; playback paused on this frame.
    Stopped { frame: u64, error: String },
}

/// Host redraw hook, called with each frame playback lands on.
pub type FrameListener = Box<dyn FnMut(u64) -> ReelResult<()>>;

#[derive(Debug, Clone, Copy)]
struct Anchor {
    frame: u64,
    at: Duration,
}

/// Play/pause/step/seek control for one preview.
pub struct PlaybackController {
    clock: Rc<dyn FrameClock>,
    fps: u32,
    total_frames: u64,
    frame: u64,
    state: PlaybackState,
    rate: PlaybackRate,
    looping: bool,
    anchor: Option<Anchor>,
    timer: Option<ScheduledTimer>,
    listener: Option<FrameListener>,
}

impl PlaybackController {
    /// Create a controller positioned at frame 0.
    pub fn new(clock: Rc<dyn FrameClock>, fps: u32, total_frames: u64) -> Self {
        Self {
            clock,
            fps: fps.max(1),
            total_frames: total_frames.max(1),
            frame: 0,
            state: PlaybackState::Idle,
            rate: PlaybackRate::NORMAL,
            looping: false,
            anchor: None,
            timer: None,
            listener: None,
        }
    }

    /// Create a controller bounded by the project's composition duration.
    pub fn for_project(clock: Rc<dyn FrameClock>, project: &Project) -> Self {
        Self::new(clock, project.fps(), composition_duration(project))
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Current frame.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    pub fn last_frame(&self) -> u64 {
        self.total_frames - 1
    }

    pub fn rate(&self) -> PlaybackRate {
        self.rate
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Id of the armed timer, if any.
    pub fn pending_timer(&self) -> Option<TimerId> {
        self.timer.as_ref().map(ScheduledTimer::id)
    }

    /// Start playing from the current frame.
    ///
    /// Playing from the last frame of a non-looping preview restarts at 0.
    pub fn play(&mut self) {
        if self.state == PlaybackState::Playing {
            return;
        }
        if !self.looping && self.frame >= self.last_frame() {
            self.frame = 0;
        }
        self.state = PlaybackState::Playing;
        self.arm();
        tracing::info!(frame = self.frame, rate = %self.rate, "Playback started");
    }

    /// Stop on the current frame.
    pub fn pause(&mut self) {
        if self.state != PlaybackState::Playing {
            return;
        }
        self.state = PlaybackState::Paused;
        self.disarm();
        tracing::info!(frame = self.frame, "Playback paused");
    }

    /// Move by exactly `delta` frames, pausing first if playing.
    pub fn step_frame(&mut self, delta: i64) -> u64 {
        self.pause();
        let target = (self.frame as i64).saturating_add(delta);
        self.frame = target.clamp(0, self.last_frame() as i64) as u64;
        tracing::debug!(frame = self.frame, delta, "Stepped");
        self.frame
    }

    /// Jump to `frame` (clamped), keeping the current state.
    pub fn seek(&mut self, frame: u64) -> u64 {
        self.frame = frame.min(self.last_frame());
        if self.state == PlaybackState::Playing {
            self.arm();
        }
        tracing::debug!(frame = self.frame, "Seeked");
        self.frame
    }

    pub fn set_loop(&mut self, looping: bool) {
        self.looping = looping;
    }

    /// Change speed, keeping the current frame.
    pub fn set_rate(&mut self, rate: f64) -> ReelResult<()> {
        self.rate = PlaybackRate::new(rate)?;
        if self.state == PlaybackState::Playing {
            self.arm();
        }
        tracing::debug!(rate = %self.rate, "Playback rate changed");
        Ok(())
    }

    /// Re-bound playback after the composition length changed.
    pub fn set_total_frames(&mut self, total_frames: u64) {
        self.total_frames = total_frames.max(1);
        if self.frame > self.last_frame() {
            self.frame = self.last_frame();
        }
        if self.state == PlaybackState::Playing {
            self.arm();
        }
    }

    /// Follow edits to `project`.
    pub fn sync_project(&mut self, project: &Project) {
        if project.fps() != self.fps {
            tracing::debug!(from = self.fps, to = project.fps(), "Adopting project fps");
            self.fps = project.fps().max(1);
        }
        self.set_total_frames(composition_duration(project));
    }

    pub fn set_frame_listener(&mut self, listener: FrameListener) {
        self.listener = Some(listener);
    }

    pub fn clear_frame_listener(&mut self) {
        self.listener = None;
    }

    /// Cancel the timer and drop the listener. The frame is kept.
    pub fn release(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
        }
        self.disarm();
        self.listener = None;
        tracing::debug!(frame = self.frame, "Playback released");
    }

    /// Handle a due timer.
    pub fn on_timer(&mut self, id: TimerId) -> TickOutcome {
        let current = self.timer.as_ref().map(ScheduledTimer::id);
        let anchor = match self.anchor {
            Some(anchor) if self.state == PlaybackState::Playing && current == Some(id) => anchor,
            _ => {
                tracing::trace!(timer = id.raw(), "Ignoring stale timer");
                return TickOutcome::Ignored;
            }
        };

        let elapsed = self.clock.now().saturating_sub(anchor.at);
        let advanced = self.frames_in(elapsed);
        let target = anchor.frame.saturating_add(advanced);
        let previous = self.frame;

        let outcome = if target <= self.last_frame() {
            self.frame = target;
            TickOutcome::Advanced(target)
        } else if self.looping {
            self.frame = target % self.total_frames;
            if self.frame < previous {
                TickOutcome::Wrapped(self.frame)
            } else {
                TickOutcome::Advanced(self.frame)
            }
        } else {
            self.frame = self.last_frame();
            self.state = PlaybackState::Paused;
            self.disarm();
            tracing::info!(frame = self.frame, "Playback reached the end");
            TickOutcome::Ended(self.frame)
        };

        if self.frame != previous {
            if let Err(e) = self.notify() {
                self.state = PlaybackState::Paused;
                self.disarm();
                tracing::warn!(
                    frame = self.frame,
                    error = %e,
                    "Frame listener failed, playback stopped"
                );
                return TickOutcome::Stopped {
                    frame: self.frame,
                    error: e.to_string(),
                };
            }
        }

        if self.state == PlaybackState::Playing {
            self.schedule_after(anchor, advanced);
        }
        outcome
    }

    fn notify(&mut self) -> ReelResult<()> {
        match self.listener.as_mut() {
            Some(listener) => listener(self.frame),
            None => Ok(()),
        }
    }

    /// Anchor at the current frame and arm the first tick.
    fn arm(&mut self) {
        let anchor = Anchor {
            frame: self.frame,
            at: self.clock.now(),
        };
        self.anchor = Some(anchor);
        self.schedule_after(anchor, 0);
    }

    fn disarm(&mut self) {
        self.timer = None;
        self.anchor = None;
    }

    /// Arm the tick for frame `advanced + 1` past the anchor.
    fn schedule_after(&mut self, anchor: Anchor, advanced: u64) {
        let due = anchor.at + self.time_for(advanced + 1);
        let delay = due.saturating_sub(self.clock.now());
        // Replacing the guard cancels the previous timer.
        self.timer = Some(ScheduledTimer::schedule(&self.clock, delay));
    }

    /// Playback frames per second as a fraction with denominator 2.
    fn half_frames_per_sec(&self) -> u128 {
        u128::from(self.fps) * u128::from(self.rate.halves)
    }

    /// Whole frames played in `elapsed`.
    fn frames_in(&self, elapsed: Duration) -> u64 {
        let frames = elapsed.as_nanos() * self.half_frames_per_sec() / (2 * NANOS_PER_SEC);
        u64::try_from(frames).unwrap_or(u64::MAX)
    }

    /// Earliest time at which `frames` whole frames have played.
    fn time_for(&self, frames: u64) -> Duration {
        let numerator = u128::from(frames) * 2 * NANOS_PER_SEC;
        let nanos = numerator.div_ceil(self.half_frames_per_sec());
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

impl std::fmt::Debug for PlaybackController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackController")
            .field("state", &self.state)
            .field("frame", &self.frame)
            .field("total_frames", &self.total_frames)
            .field("fps", &self.fps)
            .field("rate", &self.rate)
            .field("looping", &self.looping)
            .field("timer", &self.timer)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelkit_common::clock::ManualClock;

    fn controller(total_frames: u64) -> (PlaybackController, Rc<ManualClock>) {
        let clock = ManualClock::shared();
        let ctrl = PlaybackController::new(clock.clone(), 30, total_frames);
        (ctrl, clock)
    }

    fn tick(ctrl: &mut PlaybackController, clock: &ManualClock) -> Vec<TickOutcome> {
        clock
            .advance_to_next()
            .into_iter()
            .map(|id| ctrl.on_timer(id))
            .collect()
    }

    #[test]
    fn test_rate_validation() {
        for rate in PlaybackRate::SUPPORTED {
            assert_eq!(PlaybackRate::new(rate).unwrap().value(), rate);
        }
        for rate in [0.0, 0.25, 0.75, 3.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(PlaybackRate::new(rate).is_err(), "{rate} accepted");
        }
    }

    #[test]
    fn test_play_ticks_one_frame_at_a_time() {
        let (mut ctrl, clock) = controller(90);
        ctrl.play();
        assert_eq!(ctrl.state(), PlaybackState::Playing);

        assert_eq!(tick(&mut ctrl, &clock), vec![TickOutcome::Advanced(1)]);
        assert_eq!(tick(&mut ctrl, &clock), vec![TickOutcome::Advanced(2)]);
        assert_eq!(clock.pending_timers(), 1);
    }

    #[test]
    fn test_play_then_step_advances_once() {
        let (mut ctrl, clock) = controller(90);
        ctrl.play();
        let stale = ctrl.pending_timer().unwrap();
        assert_eq!(ctrl.step_frame(1), 1);
        assert_eq!(ctrl.state(), PlaybackState::Paused);

        assert!(clock.advance(Duration::from_secs(1)).is_empty());
        assert_eq!(ctrl.on_timer(stale), TickOutcome::Ignored);
        assert_eq!(ctrl.frame(), 1);
    }

    #[test]
    fn test_pause_keeps_frame_and_releases_clock() {
        let (mut ctrl, clock) = controller(90);
        ctrl.play();
        tick(&mut ctrl, &clock);
        tick(&mut ctrl, &clock);
        ctrl.pause();
        assert_eq!(ctrl.frame(), 2);
        assert_eq!(clock.pending_timers(), 0);
    }

    #[test]
    fn test_late_tick_skips_instead_of_drifting() {
        let (mut ctrl, clock) = controller(90);
        ctrl.play();
        let id = ctrl.pending_timer().unwrap();
        clock.advance(Duration::from_millis(250));
        assert_eq!(ctrl.on_timer(id), TickOutcome::Advanced(7));
    }

    #[test]
    fn test_step_clamps_to_bounds() {
        let (mut ctrl, _clock) = controller(10);
        assert_eq!(ctrl.step_frame(-5), 0);
        assert_eq!(ctrl.step_frame(25), 9);
        assert_eq!(ctrl.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_seek_clamps_and_reanchors() {
        let (mut ctrl, clock) = controller(90);
        assert_eq!(ctrl.seek(500), 89);
        ctrl.play();
        assert_eq!(ctrl.frame(), 0, "non-looping play from the end restarts");

        ctrl.seek(40);
        assert_eq!(ctrl.state(), PlaybackState::Playing);
        assert_eq!(tick(&mut ctrl, &clock), vec![TickOutcome::Advanced(41)]);
    }

    #[test]
    fn test_loop_wraps_to_start() {
        let (mut ctrl, clock) = controller(10);
        ctrl.set_loop(true);
        ctrl.seek(8);
        ctrl.play();
        assert_eq!(tick(&mut ctrl, &clock), vec![TickOutcome::Advanced(9)]);
        assert_eq!(tick(&mut ctrl, &clock), vec![TickOutcome::Wrapped(0)]);
        assert_eq!(tick(&mut ctrl, &clock), vec![TickOutcome::Advanced(1)]);
        assert!(ctrl.is_playing());
    }

    #[test]
    fn test_end_stops_on_last_frame() {
        let (mut ctrl, clock) = controller(10);
        ctrl.seek(8);
        ctrl.play();
        assert_eq!(tick(&mut ctrl, &clock), vec![TickOutcome::Advanced(9)]);
        assert_eq!(tick(&mut ctrl, &clock), vec![TickOutcome::Ended(9)]);
        assert_eq!(ctrl.state(), PlaybackState::Paused);
        assert_eq!(ctrl.frame(), 9);
        assert_eq!(clock.pending_timers(), 0);
    }

    #[test]
    fn test_rate_change_keeps_frame() {
        let (mut ctrl, clock) = controller(300);
        ctrl.play();
        tick(&mut ctrl, &clock);
        tick(&mut ctrl, &clock);
        ctrl.set_rate(2.0).unwrap();
        assert_eq!(ctrl.frame(), 2);

        let id = ctrl.pending_timer().unwrap();
        clock.advance(Duration::from_millis(500));
        assert_eq!(ctrl.on_timer(id), TickOutcome::Advanced(32));

        assert!(ctrl.set_rate(3.0).is_err());
        assert_eq!(ctrl.rate().value(), 2.0);
    }

    #[test]
    fn test_half_speed_ticks_every_other_frame_interval() {
        let (mut ctrl, clock) = controller(300);
        ctrl.set_rate(0.5).unwrap();
        ctrl.play();
        let id = ctrl.pending_timer().unwrap();
        clock.advance(Duration::from_secs(1));
        assert_eq!(ctrl.on_timer(id), TickOutcome::Advanced(15));
    }

    #[test]
    fn test_listener_error_stops_and_releases() {
        let (mut ctrl, clock) = controller(90);
        ctrl.set_frame_listener(Box::new(|frame| {
            if frame == 3 {
                Err(ReelError::render("canvas lost"))
            } else {
                Ok(())
            }
        }));
        ctrl.play();
        tick(&mut ctrl, &clock);
        tick(&mut ctrl, &clock);
        let outcome = tick(&mut ctrl, &clock);
        assert!(matches!(
            outcome.as_slice(),
            [TickOutcome::Stopped { frame: 3, .. }]
        ));
        assert_eq!(ctrl.state(), PlaybackState::Paused);
        assert_eq!(clock.pending_timers(), 0);
    }

    #[test]
    fn test_listener_sees_every_frame() {
        let (mut ctrl, clock) = controller(90);
        let seen = Rc::new(std::cell::RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        ctrl.set_frame_listener(Box::new(move |frame| {
            sink.borrow_mut().push(frame);
            Ok(())
        }));
        ctrl.play();
        for _ in 0..3 {
            tick(&mut ctrl, &clock);
        }
        assert_eq!(*seen.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn test_drop_cancels_timer() {
        let (mut ctrl, clock) = controller(90);
        ctrl.play();
        assert_eq!(clock.pending_timers(), 1);
        drop(ctrl);
        assert_eq!(clock.pending_timers(), 0);
    }

    #[test]
    fn test_release_cancels_timer() {
        let (mut ctrl, clock) = controller(90);
        ctrl.play();
        ctrl.release();
        assert_eq!(clock.pending_timers(), 0);
        assert_eq!(ctrl.state(), PlaybackState::Paused);
    }

    #[test]
    fn test_shrinking_composition_clamps_frame() {
        let (mut ctrl, _clock) = controller(90);
        ctrl.seek(80);
        ctrl.set_total_frames(30);
        assert_eq!(ctrl.frame(), 29);
    }

    #[test]
    fn test_bounds_follow_project() {
        let clock = ManualClock::shared();
        let mut project = Project::new("m", "t", 30);
        let mut ctrl = PlaybackController::for_project(clock.clone(), &project);
        assert_eq!(ctrl.total_frames(), 90);

        project.add_scene(None);
        ctrl.sync_project(&project);
        assert_eq!(ctrl.total_frames(), 180);
    }
}
