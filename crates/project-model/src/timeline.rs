//! Timeline editing operations.
//!
//! Every mutation of a [`Project`] goes through these methods. Scenes are
//! kept in start-frame order and never overlap: inserting, removing or
//! resizing a scene ripples the start frames of every later scene by the
//! same amount, so a contiguous timeline stays contiguous.

use serde::{Deserialize, Serialize};

use crate::project::{
    clamp_volume, AnimationKind, AspectRatio, AudioTrack, Project, ProjectError, Scene,
};

/// Partial update for a scene. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScenePatch {
    /// `Some(None)` clears the image.
    pub image_url: Option<Option<String>>,
    pub animation: Option<AnimationKind>,
    pub duration_in_frames: Option<u64>,
}

/// Partial update for project metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetaPatch {
    pub title: Option<String>,
    pub aspect_ratio: Option<AspectRatio>,
    /// Ignored unless equal to the current fps; fps is fixed per session.
    pub fps: Option<u32>,
}

/// Partial update for the soundtrack.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AudioPatch {
    pub url: Option<String>,
    pub volume: Option<f64>,
    pub offset_seconds: Option<f64>,
}

/// A scene resolved for a global frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneHit<'a> {
    /// Position in the project's scene list.
    pub index: usize,
    pub scene: &'a Scene,
    /// Frame offset inside the scene.
    pub local_frame: u64,
}

impl Project {
    /// Total composition length in frames.
    ///
    /// `max(start + duration)` over all scenes, or the project's fallback
    /// duration when there are none. The renderer and the playback controller both bound
    /// themselves with this value.
    pub fn total_frames(&self) -> u64 {
        self.scenes
            .iter()
            .map(Scene::end_frame)
            .max()
            .unwrap_or_else(|| {
                u64::from(self.defaults.fallback_secs.max(1)) * u64::from(self.meta.fps)
            })
    }

    /// Frames in a freshly inserted scene.
    pub fn default_scene_frames(&self) -> u64 {
        u64::from(self.defaults.scene_secs.max(1)) * u64::from(self.meta.fps)
    }

    /// Find the scene covering `frame` (linear scan).
    pub fn scene_at(&self, frame: u64) -> Option<SceneHit<'_>> {
        self.scenes
            .iter()
            .enumerate()
            .find(|(_, scene)| scene.contains(frame))
            .map(|(index, scene)| SceneHit {
                index,
                scene,
                local_frame: frame - scene.start_frame,
            })
    }

    /// Whether a scene may be removed right now.
    pub fn can_remove(&self) -> bool {
        self.scenes.len() >= 2
    }

    /// Insert a default-length scene after `after_index` (or at the end).
    ///
    /// Returns the new scene's id.
    pub fn add_scene(&mut self, after_index: Option<usize>) -> String {
        let frames = self.default_scene_frames();
        self.add_scene_with_duration(after_index, frames)
    }

    /// Insert a scene of `duration_in_frames` (minimum 1) after `after_index`.
    pub fn add_scene_with_duration(
        &mut self,
        after_index: Option<usize>,
        duration_in_frames: u64,
    ) -> String {
        let duration = duration_in_frames.max(1);
        let insert_at = match after_index {
            Some(i) if i < self.scenes.len() => i + 1,
            _ => self.scenes.len(),
        };
        let start_frame = if insert_at == 0 {
            0
        } else {
            self.scenes[insert_at - 1].end_frame()
        };

        for later in &mut self.scenes[insert_at..] {
            later.start_frame = later.start_frame.saturating_add(duration);
        }

        let id = self.next_scene_id();
        self.scenes
            .insert(insert_at, Scene::new(id.clone(), start_frame, duration));
        self.refresh_duration();
        id
    }

    /// Remove a scene. No-op (returns `false`) when it is the last scene or
    /// the id is unknown.
    pub fn remove_scene(&mut self, id: &str) -> bool {
        if !self.can_remove() {
            return false;
        }
        let Some(index) = self.scene_index(id) else {
            return false;
        };

        let removed = self.scenes.remove(index);
        for later in &mut self.scenes[index..] {
            later.start_frame = later.start_frame.saturating_sub(removed.duration_in_frames);
        }
        self.refresh_duration();
        true
    }

    /// Merge `patch` into a scene, rippling later scenes on duration change.
    pub fn update_scene(&mut self, id: &str, patch: ScenePatch) -> Result<(), ProjectError> {
        let index = self
            .scene_index(id)
            .ok_or_else(|| ProjectError::SceneNotFound { id: id.to_string() })?;

        if patch.duration_in_frames == Some(0) {
            return Err(ProjectError::ValidationError {
                message: format!("scene {id}: durationInFrames must be > 0"),
            });
        }

        let scene = &mut self.scenes[index];
        if let Some(image_url) = patch.image_url {
            scene.image_url = image_url;
        }
        if let Some(animation) = patch.animation {
            scene.animation = animation;
        }

        if let Some(duration) = patch.duration_in_frames {
            let old = scene.duration_in_frames;
            scene.duration_in_frames = duration;
            if duration != old {
                for later in &mut self.scenes[index + 1..] {
                    later.start_frame = if duration > old {
                        later.start_frame.saturating_add(duration - old)
                    } else {
                        later.start_frame.saturating_sub(old - duration)
                    };
                }
                self.refresh_duration();
            }
        }
        Ok(())
    }

    /// Shallow-merge metadata. fps is fixed for the session, so a differing
    /// fps in the patch is ignored with a warning.
    pub fn update_meta(&mut self, patch: MetaPatch) -> Result<(), ProjectError> {
        if let Some(fps) = patch.fps {
            if fps != self.meta.fps {
                tracing::warn!(
                    media_id = %self.id,
                    fps = self.meta.fps,
                    requested = fps,
                    "Ignoring fps change; fps is fixed for the editing session"
                );
            }
        }
        if let Some(title) = patch.title {
            self.meta.title = title;
        }
        if let Some(aspect_ratio) = patch.aspect_ratio {
            self.meta.aspect_ratio = aspect_ratio;
        }
        Ok(())
    }

    /// Shallow-merge the soundtrack. Creating a track requires a URL.
    pub fn update_audio(&mut self, patch: AudioPatch) -> Result<(), ProjectError> {
        let mut audio = match (self.audio.take(), &patch.url) {
            (Some(existing), _) => existing,
            (None, Some(url)) => AudioTrack::new(url.clone()),
            (None, None) => {
                return Err(ProjectError::ValidationError {
                    message: "cannot update audio: project has no track and patch has no url"
                        .to_string(),
                })
            }
        };

        if let Some(url) = patch.url {
            audio.url = url;
        }
        if let Some(volume) = patch.volume {
            audio.volume = clamp_volume(volume);
        }
        if let Some(offset) = patch.offset_seconds {
            if offset.is_finite() {
                audio.offset_seconds = offset;
            }
        }
        self.audio = Some(audio);
        Ok(())
    }

    /// Drop the soundtrack.
    pub fn clear_audio(&mut self) {
        self.audio = None;
    }

    /// Replace the caption source. Returns `true` if it changed.
    pub fn set_caption_url(&mut self, url: Option<String>) -> bool {
        let url = url.filter(|u| !u.trim().is_empty());
        if self.caption_url == url {
            return false;
        }
        self.caption_url = url;
        true
    }

    /// Repack scenes back to back from frame 0, keeping their order.
    pub fn normalize_contiguous(&mut self) {
        let mut cursor = 0;
        for scene in &mut self.scenes {
            scene.start_frame = cursor;
            cursor = scene.end_frame();
        }
        self.refresh_duration();
    }

    /// Structural problems with the scene list. Empty means valid.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = vec![];

        for scene in &self.scenes {
            if scene.duration_in_frames == 0 {
                issues.push(format!("scene {}: durationInFrames must be > 0", scene.id));
            }
        }

        for pair in self.scenes.windows(2) {
            if pair[1].start_frame < pair[0].end_frame() {
                issues.push(format!(
                    "scene {} (starts {}) overlaps scene {} (ends {})",
                    pair[1].id,
                    pair[1].start_frame,
                    pair[0].id,
                    pair[0].end_frame()
                ));
            }
        }

        for (i, scene) in self.scenes.iter().enumerate() {
            if self.scenes[..i].iter().any(|s| s.id == scene.id) {
                issues.push(format!("duplicate scene id {}", scene.id));
            }
        }

        issues
    }

    pub(crate) fn refresh_duration(&mut self) {
        self.meta.duration_seconds = self.total_frames() as f64 / f64::from(self.meta.fps.max(1));
    }

    fn next_scene_id(&self) -> String {
        let mut n = self.scenes.len() + 1;
        loop {
            let candidate = format!("scene-{n}");
            if self.scene(&candidate).is_none() {
                return candidate;
            }
            n += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::ProjectMeta;

    fn two_scene_project() -> Project {
        let meta = ProjectMeta {
            title: "Demo".into(),
            duration_seconds: 0.0,
            fps: 30,
            aspect_ratio: AspectRatio::Landscape,
        };
        Project::from_parts(
            "media-1",
            meta,
            vec![Scene::new("a", 0, 90), Scene::new("b", 90, 120)],
            None,
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_total_frames_and_scene_lookup() {
        let project = two_scene_project();
        assert_eq!(project.total_frames(), 210);

        let hit = project.scene_at(150).unwrap();
        assert_eq!(hit.index, 1);
        assert_eq!(hit.local_frame, 60);
        assert!(project.scene_at(210).is_none());
        assert_eq!(project.scene_at(89).unwrap().index, 0);
        assert_eq!(project.scene_at(90).unwrap().index, 1);
    }

    #[test]
    fn test_add_scene_at_end_is_contiguous() {
        let mut project = two_scene_project();
        let id = project.add_scene(None);
        let scene = project.scene(&id).unwrap();
        assert_eq!(scene.start_frame, 210);
        assert_eq!(scene.duration_in_frames, 90);
        assert_eq!(project.total_frames(), 300);
        assert!((project.meta().duration_seconds - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_add_scene_in_middle_ripples_later_scenes() {
        let mut project = two_scene_project();
        let id = project.add_scene(Some(0));
        assert_eq!(project.scenes()[1].id, id);
        assert_eq!(project.scenes()[1].start_frame, 90);
        assert_eq!(project.scene("b").unwrap().start_frame, 180);
        assert!(project.validate().is_empty());
    }

    #[test]
    fn test_add_scene_generates_unique_ids() {
        let mut project = Project::new("m", "t", 30);
        let a = project.add_scene(None);
        let b = project.add_scene(None);
        assert_ne!(a, b);
        assert_ne!(a, "scene-1");
    }

    #[test]
    fn test_remove_last_scene_is_noop() {
        let mut project = Project::new("m", "t", 30);
        assert!(!project.can_remove());
        assert!(!project.remove_scene("scene-1"));
        assert_eq!(project.scenes().len(), 1);
    }

    #[test]
    fn test_remove_scene_closes_gap() {
        let mut project = two_scene_project();
        assert!(project.remove_scene("a"));
        assert_eq!(project.scenes().len(), 1);
        assert_eq!(project.scene("b").unwrap().start_frame, 0);
        assert_eq!(project.total_frames(), 120);
        assert!(!project.remove_scene("b"));
    }

    #[test]
    fn test_remove_unknown_scene_is_noop() {
        let mut project = two_scene_project();
        assert!(!project.remove_scene("zzz"));
        assert_eq!(project.scenes().len(), 2);
    }

    #[test]
    fn test_duration_edit_cascades() {
        let mut project = two_scene_project();
        project
            .update_scene(
                "a",
                ScenePatch {
                    duration_in_frames: Some(60),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(project.scene("b").unwrap().start_frame, 60);
        assert_eq!(project.total_frames(), 180);

        project
            .update_scene(
                "a",
                ScenePatch {
                    duration_in_frames: Some(150),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(project.scene("b").unwrap().start_frame, 150);
        assert!(project.validate().is_empty());
    }

    #[test]
    fn test_zero_duration_patch_rejected() {
        let mut project = two_scene_project();
        let err = project
            .update_scene(
                "a",
                ScenePatch {
                    duration_in_frames: Some(0),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, ProjectError::ValidationError { .. }));
        assert_eq!(project.scene("a").unwrap().duration_in_frames, 90);
    }

    #[test]
    fn test_update_scene_merges_fields() {
        let mut project = two_scene_project();
        project
            .update_scene(
                "b",
                ScenePatch {
                    image_url: Some(Some("https://cdn/b.png".into())),
                    animation: Some(AnimationKind::Fade),
                    ..Default::default()
                },
            )
            .unwrap();
        let b = project.scene("b").unwrap();
        assert_eq!(b.image_url.as_deref(), Some("https://cdn/b.png"));
        assert_eq!(b.animation, AnimationKind::Fade);
        assert_eq!(b.duration_in_frames, 120);

        let err = project.update_scene("nope", ScenePatch::default());
        assert!(matches!(err, Err(ProjectError::SceneNotFound { .. })));
    }

    #[test]
    fn test_meta_ignores_fps_change() {
        let mut project = two_scene_project();
        project
            .update_meta(MetaPatch {
                fps: Some(60),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(project.fps(), 30);
        assert_eq!(project.total_frames(), 210);
        project
            .update_meta(MetaPatch {
                title: Some("Renamed".into()),
                fps: Some(30),
                aspect_ratio: Some(AspectRatio::Portrait),
            })
            .unwrap();
        assert_eq!(project.meta().title, "Renamed");
        assert_eq!(project.meta().aspect_ratio, AspectRatio::Portrait);
    }

    #[test]
    fn test_update_audio_creates_and_merges() {
        let mut project = two_scene_project();
        assert!(project
            .update_audio(AudioPatch {
                volume: Some(0.5),
                ..Default::default()
            })
            .is_err());

        project
            .update_audio(AudioPatch {
                url: Some("https://cdn/song.mp3".into()),
                ..Default::default()
            })
            .unwrap();
        project
            .update_audio(AudioPatch {
                volume: Some(1.7),
                offset_seconds: Some(2.5),
                ..Default::default()
            })
            .unwrap();

        let audio = project.audio().unwrap();
        assert_eq!(audio.url, "https://cdn/song.mp3");
        assert_eq!(audio.volume, 1.0);
        assert_eq!(audio.offset_seconds, 2.5);

        project.clear_audio();
        assert!(project.audio().is_none());
    }

    #[test]
    fn test_set_caption_url_reports_change() {
        let mut project = two_scene_project();
        assert!(project.set_caption_url(Some("https://cdn/c.srt".into())));
        assert!(!project.set_caption_url(Some("https://cdn/c.srt".into())));
        assert!(project.set_caption_url(Some("  ".into())));
        assert!(project.caption_url().is_none());
    }

    #[test]
    fn test_empty_project_uses_fallback_duration() {
        let meta = ProjectMeta {
            title: "Empty".into(),
            duration_seconds: 0.0,
            fps: 24,
            aspect_ratio: AspectRatio::Square,
        };
        let project = Project::from_parts("m", meta, vec![], None, None).unwrap();
        assert_eq!(project.total_frames(), 30 * 24);
        assert!(project.scene_at(0).is_none());
    }

    #[test]
    fn test_normalize_contiguous_removes_gaps() {
        let meta = ProjectMeta {
            title: "Gaps".into(),
            duration_seconds: 0.0,
            fps: 30,
            aspect_ratio: AspectRatio::Landscape,
        };
        let mut project = Project::from_parts(
            "m",
            meta,
            vec![Scene::new("a", 10, 30), Scene::new("b", 100, 30)],
            None,
            None,
        )
        .unwrap();
        project.normalize_contiguous();
        assert_eq!(project.scene("a").unwrap().start_frame, 0);
        assert_eq!(project.scene("b").unwrap().start_frame, 30);
        assert_eq!(project.total_frames(), 60);
    }
}
