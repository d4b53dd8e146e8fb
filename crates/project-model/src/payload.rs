//! Mapping between the backend's project representation and [`Project`].
//!
//! Load direction: [`init_from_payload`] turns whatever the backend returns
//! (timing in frames, in seconds, or missing) into a well-formed project.
//!
//! Save direction: [`to_patch`] produces a full snapshot of meta, scenes,
//! audio and captions. Snapshots are deterministic, so saving an unchanged
//! project twice sends byte-identical bodies and the backend PATCH stays
//! idempotent.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::project::{
    clamp_volume, AnimationKind, AspectRatio, AudioTrack, LoadDefaults, Project, ProjectError,
    ProjectMeta, Scene, MAX_TIMELINE_SECS,
};
use crate::status::MediaStatus;

/// Project as returned by the fetch-project endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendProject {
    pub id: String,

    #[serde(default)]
    pub status: MediaStatus,

    #[serde(default)]
    pub meta: BackendMeta,

    #[serde(default)]
    pub scenes: Vec<BackendScene>,

    #[serde(default)]
    pub audio: Option<BackendAudio>,

    #[serde(default)]
    pub caption_url: Option<String>,
}

/// Backend metadata; every field may be absent on older records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendMeta {
    pub title: Option<String>,
    pub duration_seconds: Option<f64>,
    pub fps: Option<u32>,
    pub aspect_ratio: Option<String>,
}

/// Backend scene. Timing may be given in frames, in seconds, or not at all.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendScene {
    pub id: Option<String>,
    pub image_url: Option<String>,
    pub start_frame: Option<u64>,
    pub duration_in_frames: Option<u64>,
    pub start_seconds: Option<f64>,
    pub duration_seconds: Option<f64>,
    pub animation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendAudio {
    pub url: Option<String>,
    pub volume: Option<f64>,
    pub offset_seconds: Option<f64>,
}

/// Response of the export-new-version endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportResponse {
    /// Id of the newly created media record.
    pub id: String,
}

impl BackendProject {
    /// Parse a fetch-project response body.
    pub fn from_json(json: &str) -> Result<Self, ProjectError> {
        serde_json::from_str(json).map_err(|e| ProjectError::ParseError {
            context: "backend project".to_string(),
            source: e,
        })
    }

    /// Read a saved fetch-project response from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ProjectError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&json).map_err(|e| ProjectError::ParseError {
            context: path.display().to_string(),
            source: e,
        })
    }
}

/// Build the editor's project from a backend payload using built-in defaults.
pub fn init_from_payload(payload: &BackendProject) -> Project {
    init_from_payload_with(payload, &LoadDefaults::default())
}

/// Build the editor's project from a backend payload.
///
/// Per-scene timing precedence: frames, then seconds × fps, then a
/// contiguous default-length slot after the previous scene. Overlapping
/// backend timing is repacked back to back in backend order.
pub fn init_from_payload_with(payload: &BackendProject, defaults: &LoadDefaults) -> Project {
    let fps = payload
        .meta
        .fps
        .filter(|fps| *fps > 0)
        .unwrap_or(defaults.fps.max(1));
    let default_frames = u64::from(defaults.scene_secs.max(1)) * u64::from(fps);
    let max_frames = MAX_TIMELINE_SECS * u64::from(fps);

    let mut scenes: Vec<Scene> = Vec::with_capacity(payload.scenes.len());
    let mut cursor = 0u64;
    let mut overlapping = false;

    for (i, raw) in payload.scenes.iter().enumerate() {
        let duration = raw
            .duration_in_frames
            .filter(|d| *d > 0)
            .or_else(|| {
                raw.duration_seconds
                    .filter(|s| s.is_finite() && *s > 0.0)
                    .map(|s| ((s * f64::from(fps)).round() as u64).max(1))
            })
            .unwrap_or(default_frames);

        let start = raw
            .start_frame
            .or_else(|| {
                raw.start_seconds
                    .filter(|s| s.is_finite())
                    .map(|s| (s * f64::from(fps)).round().max(0.0) as u64)
            })
            .unwrap_or(cursor);

        if start > max_frames || duration > max_frames {
            tracing::warn!(
                media_id = %payload.id,
                scene = i,
                start,
                duration,
                max_frames,
                "Clamping scene timing beyond the timeline limit"
            );
        }
        let start = start.min(max_frames);
        let duration = duration.min(max_frames);

        if start < cursor {
            overlapping = true;
        }

        let id = raw
            .id
            .clone()
            .filter(|id| !id.is_empty() && !scenes.iter().any(|s| &s.id == id))
            .unwrap_or_else(|| unique_scene_id(&scenes, i + 1));

        scenes.push(Scene {
            id,
            image_url: raw.image_url.clone().filter(|u| !u.trim().is_empty()),
            start_frame: start,
            duration_in_frames: duration,
            animation: raw
                .animation
                .clone()
                .map(AnimationKind::from)
                .unwrap_or_default(),
        });
        cursor = start.saturating_add(duration);
    }

    let audio = payload.audio.as_ref().and_then(|raw| match &raw.url {
        Some(url) if !url.trim().is_empty() => Some(AudioTrack {
            url: url.clone(),
            volume: clamp_volume(raw.volume.unwrap_or(1.0)),
            offset_seconds: raw.offset_seconds.filter(|o| o.is_finite()).unwrap_or(0.0),
        }),
        _ => {
            tracing::warn!(media_id = %payload.id, "Dropping audio track without url");
            None
        }
    });

    let mut project = Project {
        id: payload.id.clone(),
        meta: ProjectMeta {
            title: payload.meta.title.clone().unwrap_or_default(),
            duration_seconds: 0.0,
            fps,
            aspect_ratio: payload
                .meta
                .aspect_ratio
                .as_deref()
                .map(AspectRatio::from_label)
                .unwrap_or_default(),
        },
        scenes,
        audio,
        caption_url: payload
            .caption_url
            .clone()
            .filter(|u| !u.trim().is_empty()),
        defaults: LoadDefaults { fps, ..*defaults },
    };

    if overlapping {
        tracing::warn!(
            media_id = %payload.id,
            "Backend scene timing overlaps; repacking scenes contiguously"
        );
        project.normalize_contiguous();
    } else {
        project.refresh_duration();
    }

    tracing::debug!(
        media_id = %project.id,
        scenes = project.scenes.len(),
        total_frames = project.total_frames(),
        fps,
        "Project initialized from payload"
    );
    project
}

fn unique_scene_id(scenes: &[Scene], mut n: usize) -> String {
    loop {
        let candidate = format!("scene-{n}");
        if !scenes.iter().any(|s| s.id == candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Full-snapshot body for the patch-project endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPatch {
    pub meta: ProjectMeta,
    pub scenes: Vec<SceneSnapshot>,
    /// `null` clears the soundtrack on the backend.
    pub audio: Option<AudioTrack>,
    pub caption_url: Option<String>,
}

/// One scene inside a [`ProjectPatch`]. Carries both frame and second
/// timing so render workers need not know the fps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneSnapshot {
    pub id: String,
    pub image_url: Option<String>,
    pub start_frame: u64,
    pub duration_in_frames: u64,
    pub start_seconds: f64,
    pub duration_seconds: f64,
    pub animation: AnimationKind,
}

/// Snapshot the whole project for saving.
pub fn to_patch(project: &Project) -> ProjectPatch {
    let fps = f64::from(project.fps().max(1));
    ProjectPatch {
        meta: project.meta().clone(),
        scenes: project
            .scenes()
            .iter()
            .map(|scene| SceneSnapshot {
                id: scene.id.clone(),
                image_url: scene.image_url.clone(),
                start_frame: scene.start_frame,
                duration_in_frames: scene.duration_in_frames,
                start_seconds: scene.start_frame as f64 / fps,
                duration_seconds: scene.duration_in_frames as f64 / fps,
                animation: scene.animation,
            })
            .collect(),
        audio: project.audio().cloned(),
        caption_url: project.caption_url().map(str::to_string),
    }
}

impl ProjectPatch {
    /// Serialized request body.
    pub fn to_json(&self) -> Result<String, ProjectError> {
        serde_json::to_string(self).map_err(|e| ProjectError::ParseError {
            context: "project patch".to_string(),
            source: e,
        })
    }
}
