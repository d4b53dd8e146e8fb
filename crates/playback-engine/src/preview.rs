//! Embeddable preview player.

use std::rc::Rc;
use std::sync::Arc;

use reelkit_captions::CaptionCue;
use reelkit_common::clock::{FrameClock, TimerId};
use reelkit_common::error::ReelResult;
use reelkit_project_model::Project;
use reelkit_render_engine::{compose_frame_with_captions, composition_duration, FrameComposition};
use serde::{Deserialize, Serialize};

use crate::controller::{FrameListener, PlaybackController, PlaybackState, TickOutcome};

/// Width of the design space that animation offsets are expressed in.
pub const DESIGN_WIDTH_PX: f64 = 1080.0;

/// Sizing and timing a player is created with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSettings {
    pub width_px: u32,
    pub height_px: u32,
    pub fps: u32,
    pub total_frames: u64,
}

impl PlayerSettings {
    /// Settings derived from the project: default pixel size for its aspect
    /// ratio, its fps, and its composition length.
    pub fn from_project(project: &Project) -> Self {
        let (width_px, height_px) = project.meta().aspect_ratio.default_dimensions();
        Self {
            width_px,
            height_px,
            fps: project.fps(),
            total_frames: composition_duration(project),
        }
    }

    /// Override the output size.
    pub fn with_size(mut self, width_px: u32, height_px: u32) -> Self {
        self.width_px = width_px.max(1);
        self.height_px = height_px.max(1);
        self
    }
}

/// A sized preview that composes its current frame on demand.
pub struct PreviewPlayer {
    controller: PlaybackController,
    width_px: u32,
    height_px: u32,
    captions: Arc<Vec<CaptionCue>>,
}

impl PreviewPlayer {
    pub fn new(clock: Rc<dyn FrameClock>, settings: PlayerSettings) -> Self {
        Self {
            controller: PlaybackController::new(clock, settings.fps, settings.total_frames),
            width_px: settings.width_px.max(1),
            height_px: settings.height_px.max(1),
            captions: Arc::new(Vec::new()),
        }
    }

    /// Player at the project's default size.
    pub fn for_project(clock: Rc<dyn FrameClock>, project: &Project) -> Self {
        Self::new(clock, PlayerSettings::from_project(project))
    }

    pub fn get_frame(&self) -> u64 {
        self.controller.frame()
    }

    pub fn seek(&mut self, frame: u64) -> u64 {
        self.controller.seek(frame)
    }

    pub fn play(&mut self) {
        self.controller.play();
    }

    pub fn pause(&mut self) {
        self.controller.pause();
    }

    pub fn step_frame(&mut self, delta: i64) -> u64 {
        self.controller.step_frame(delta)
    }

    pub fn set_rate(&mut self, rate: f64) -> ReelResult<()> {
        self.controller.set_rate(rate)
    }

    pub fn set_loop(&mut self, looping: bool) {
        self.controller.set_loop(looping);
    }

    pub fn state(&self) -> PlaybackState {
        self.controller.state()
    }

    pub fn set_frame_listener(&mut self, listener: FrameListener) {
        self.controller.set_frame_listener(listener);
    }

    /// Forward a due timer from the host loop.
    pub fn on_timer(&mut self, id: TimerId) -> TickOutcome {
        self.controller.on_timer(id)
    }

    /// Cancel playback and drop the listener.
    pub fn release(&mut self) {
        self.controller.release();
    }

    pub fn controller(&self) -> &PlaybackController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut PlaybackController {
        &mut self.controller
    }

    /// Follow edits to `project`.
    pub fn sync(&mut self, project: &Project) {
        self.controller.sync_project(project);
    }

    pub fn set_captions(&mut self, captions: Arc<Vec<CaptionCue>>) {
        self.captions = captions;
    }

    pub fn captions(&self) -> &[CaptionCue] {
        &self.captions
    }

    /// Compose the current frame.
    pub fn render(&self, project: &Project) -> FrameComposition {
        compose_frame_with_captions(project, &self.captions, self.controller.frame())
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width_px, self.height_px)
    }

    pub fn resize(&mut self, width_px: u32, height_px: u32) {
        self.width_px = width_px.max(1);
        self.height_px = height_px.max(1);
    }

    /// Map a design-space length (1080 px wide) to output pixels.
    pub fn scale_to_viewport(&self, design_px: f64) -> f64 {
        design_px * f64::from(self.width_px) / DESIGN_WIDTH_PX
    }
}

impl std::fmt::Debug for PreviewPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewPlayer")
            .field("controller", &self.controller)
            .field("width_px", &self.width_px)
            .field("height_px", &self.height_px)
            .field("captions", &self.captions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelkit_common::clock::ManualClock;
    use reelkit_project_model::{AnimationKind, AspectRatio, MetaPatch, ScenePatch};

    fn slide_project() -> Project {
        let mut project = Project::new("m", "Preview", 30);
        project
            .update_scene(
                "scene-1",
                ScenePatch {
                    animation: Some(AnimationKind::Slide),
                    ..Default::default()
                },
            )
            .unwrap();
        project
    }

    #[test]
    fn test_default_size_follows_aspect_ratio() {
        let mut project = slide_project();
        assert_eq!(PlayerSettings::from_project(&project).width_px, 1920);

        project
            .update_meta(MetaPatch {
                aspect_ratio: Some(AspectRatio::Portrait),
                ..Default::default()
            })
            .unwrap();
        let settings = PlayerSettings::from_project(&project);
        assert_eq!((settings.width_px, settings.height_px), (1080, 1920));
        assert_eq!(settings.total_frames, 90);
    }

    #[test]
    fn test_render_composes_current_frame() {
        let project = slide_project();
        let clock = ManualClock::shared();
        let mut player = PreviewPlayer::for_project(clock.clone(), &project);

        let first = player.render(&project);
        assert_eq!(first.frame, 0);
        assert_eq!(first.visual().unwrap().transform.translate_x, 50.0);

        player.seek(90);
        assert_eq!(player.get_frame(), 89);
        assert_eq!(player.render(&project).frame, 89);
    }

    #[test]
    fn test_scale_to_viewport() {
        let project = slide_project();
        let settings = PlayerSettings::from_project(&project).with_size(540, 960);
        let player = PreviewPlayer::new(ManualClock::shared(), settings);
        assert_eq!(player.scale_to_viewport(50.0), 25.0);
        assert_eq!(player.size(), (540, 960));
    }

    #[test]
    fn test_play_pause_through_player() {
        let project = slide_project();
        let clock = ManualClock::shared();
        let mut player = PreviewPlayer::for_project(clock.clone(), &project);

        player.play();
        for id in clock.advance_to_next() {
            player.on_timer(id);
        }
        player.pause();
        assert_eq!(player.get_frame(), 1);
        assert_eq!(player.state(), PlaybackState::Paused);
        assert_eq!(clock.pending_timers(), 0);
    }

    #[test]
    fn test_captions_overlay_current_frame() {
        let project = slide_project();
        let mut player = PreviewPlayer::for_project(ManualClock::shared(), &project);
        player.set_captions(Arc::new(reelkit_captions::parse_srt(
            "1\n00:00:01,000 --> 00:00:02,000\nHi there\n",
        )));
        player.seek(30);
        assert_eq!(player.render(&project).caption().unwrap().text, "Hi there");
    }
}
