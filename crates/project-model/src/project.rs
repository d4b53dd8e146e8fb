//! Project, scene, and audio types.
//!
//! A project is the top-level container the editor session owns: metadata,
//! an ordered list of timed scenes, an optional soundtrack and an optional
//! caption source. Mutations live in [`crate::timeline`]; this module only
//! defines the shapes and their read-only helpers.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// FPS assumed when a project does not declare one.
pub const DEFAULT_FPS: u32 = 30;

/// Length of a freshly inserted scene, in seconds.
pub const DEFAULT_SCENE_SECS: u32 = 3;

/// Composition length used when a project has no scenes, in seconds.
pub const FALLBACK_DURATION_SECS: u32 = 30;

/// Longest timeline accepted from a backend payload, in seconds.
pub const MAX_TIMELINE_SECS: u64 = 24 * 60 * 60;

/// Fallbacks a project was loaded with: fps for payloads without one,
/// the length of inserted scenes, and the length of an empty composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadDefaults {
    pub fps: u32,
    pub scene_secs: u32,
    pub fallback_secs: u32,
}

impl Default for LoadDefaults {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            scene_secs: DEFAULT_SCENE_SECS,
            fallback_secs: FALLBACK_DURATION_SECS,
        }
    }
}

/// The single live project of an editor session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub(crate) id: String,
    pub(crate) meta: ProjectMeta,
    pub(crate) scenes: Vec<Scene>,
    pub(crate) audio: Option<AudioTrack>,
    pub(crate) caption_url: Option<String>,
    #[serde(skip)]
    pub(crate) defaults: LoadDefaults,
}

/// Project-level metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMeta {
    /// Human-readable title.
    pub title: String,

    /// Composition length in seconds. Derived from the scene list.
    pub duration_seconds: f64,

    /// Frames per second; fixed for the editing session.
    pub fps: u32,

    /// Output framing.
    pub aspect_ratio: AspectRatio,
}

/// Output aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AspectRatio {
    /// 16:9 widescreen.
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    /// 9:16 vertical (social media).
    #[serde(rename = "9:16")]
    Portrait,
    /// 1:1 square.
    #[serde(rename = "1:1")]
    Square,
}

impl AspectRatio {
    /// Parse the backend's ratio string; unknown values fall back to landscape.
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "9:16" | "portrait" => AspectRatio::Portrait,
            "1:1" | "square" => AspectRatio::Square,
            _ => AspectRatio::Landscape,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
            AspectRatio::Square => "1:1",
        }
    }

    /// Default pixel dimensions for a full-size render.
    pub fn default_dimensions(&self) -> (u32, u32) {
        match self {
            AspectRatio::Landscape => (1920, 1080),
            AspectRatio::Portrait => (1080, 1920),
            AspectRatio::Square => (1080, 1080),
        }
    }
}

/// A timed visual segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    /// Stable scene identifier.
    pub id: String,

    /// Still image shown for the scene. `None` renders a placeholder.
    #[serde(default)]
    pub image_url: Option<String>,

    /// First global frame of the scene.
    pub start_frame: u64,

    /// Scene length in frames (always > 0).
    pub duration_in_frames: u64,

    /// Canned motion applied while the scene is visible.
    #[serde(default)]
    pub animation: AnimationKind,
}

impl Scene {
    /// Create a scene with no image and no animation.
    pub fn new(id: impl Into<String>, start_frame: u64, duration_in_frames: u64) -> Self {
        Self {
            id: id.into(),
            image_url: None,
            start_frame,
            duration_in_frames,
            animation: AnimationKind::None,
        }
    }

    /// Builder-style image setter.
    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    /// Builder-style animation setter.
    pub fn with_animation(mut self, animation: AnimationKind) -> Self {
        self.animation = animation;
        self
    }

    /// First frame after the scene (exclusive end).
    pub fn end_frame(&self) -> u64 {
        self.start_frame.saturating_add(self.duration_in_frames)
    }

    /// Whether `frame` falls inside `[start, end)`.
    pub fn contains(&self, frame: u64) -> bool {
        frame >= self.start_frame && frame < self.end_frame()
    }
}

/// Animation applied to a scene.
///
/// Serialized as a lowercase string. Unrecognized strings read back as
/// [`AnimationKind::None`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum AnimationKind {
    #[default]
    None,
    /// Slow push-in.
    Zoom,
    /// Fade in from black and back out.
    Fade,
    /// Horizontal slide into place.
    Slide,
}

impl AnimationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnimationKind::None => "none",
            AnimationKind::Zoom => "zoom",
            AnimationKind::Fade => "fade",
            AnimationKind::Slide => "slide",
        }
    }
}

impl From<String> for AnimationKind {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "zoom" => AnimationKind::Zoom,
            "fade" => AnimationKind::Fade,
            "slide" => AnimationKind::Slide,
            _ => AnimationKind::None,
        }
    }
}

impl From<AnimationKind> for String {
    fn from(value: AnimationKind) -> Self {
        value.as_str().to_string()
    }
}

/// Background soundtrack on its own timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioTrack {
    /// Audio source URL.
    pub url: String,

    /// Playback volume in `[0.0, 1.0]`.
    pub volume: f64,

    /// Delay before the audio starts, in seconds. Negative values start
    /// the audio part-way through.
    pub offset_seconds: f64,
}

impl AudioTrack {
    /// Full-volume track starting at zero.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            volume: 1.0,
            offset_seconds: 0.0,
        }
    }
}

/// Clamp a volume into `[0, 1]`, mapping NaN to silence.
pub fn clamp_volume(volume: f64) -> f64 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

impl Project {
    /// Create a project with a single default-length scene.
    pub fn new(id: impl Into<String>, title: impl Into<String>, fps: u32) -> Self {
        let fps = if fps == 0 { DEFAULT_FPS } else { fps };
        let mut project = Self {
            id: id.into(),
            meta: ProjectMeta {
                title: title.into(),
                duration_seconds: 0.0,
                fps,
                aspect_ratio: AspectRatio::default(),
            },
            scenes: vec![Scene::new(
                "scene-1",
                0,
                u64::from(DEFAULT_SCENE_SECS) * u64::from(fps),
            )],
            audio: None,
            caption_url: None,
            defaults: LoadDefaults {
                fps,
                ..LoadDefaults::default()
            },
        };
        project.refresh_duration();
        project
    }

    /// Assemble a project from already-timed parts.
    ///
    /// Rejects zero-length and overlapping scenes. Scenes are sorted by
    /// start frame.
    pub fn from_parts(
        id: impl Into<String>,
        meta: ProjectMeta,
        mut scenes: Vec<Scene>,
        audio: Option<AudioTrack>,
        caption_url: Option<String>,
    ) -> Result<Self, ProjectError> {
        scenes.sort_by_key(|s| s.start_frame);
        let mut meta = meta;
        if meta.fps == 0 {
            meta.fps = DEFAULT_FPS;
        }
        let defaults = LoadDefaults {
            fps: meta.fps,
            ..LoadDefaults::default()
        };
        let mut project = Self {
            id: id.into(),
            meta,
            scenes,
            audio: audio.map(|mut a| {
                a.volume = clamp_volume(a.volume);
                a
            }),
            caption_url,
            defaults,
        };

        let issues = project.validate();
        if !issues.is_empty() {
            return Err(ProjectError::ValidationError {
                message: issues.join("; "),
            });
        }

        project.refresh_duration();
        Ok(project)
    }

    /// Backend media id this project belongs to.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn meta(&self) -> &ProjectMeta {
        &self.meta
    }

    pub fn fps(&self) -> u32 {
        self.meta.fps
    }

    /// Fallbacks governing inserted scenes and empty compositions.
    pub fn load_defaults(&self) -> LoadDefaults {
        self.defaults
    }

    /// Scenes in start-frame order.
    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn audio(&self) -> Option<&AudioTrack> {
        self.audio.as_ref()
    }

    pub fn caption_url(&self) -> Option<&str> {
        self.caption_url.as_deref()
    }

    pub fn scene(&self, id: &str) -> Option<&Scene> {
        self.scenes.iter().find(|s| s.id == id)
    }

    pub fn scene_index(&self, id: &str) -> Option<usize> {
        self.scenes.iter().position(|s| s.id == id)
    }
}

/// Errors that can occur when working with projects.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {context}: {source}")]
    ParseError {
        context: String,
        source: serde_json::Error,
    },

    #[error("Invalid project: {message}")]
    ValidationError { message: String },

    #[error("Scene not found: {id}")]
    SceneNotFound { id: String },
}
