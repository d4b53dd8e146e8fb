//! Frame compositor: the layers visible at one frame.
//!
//! Composition is a pure function of `(project, frame)`. The same inputs
//! always produce the same layers, regardless of which frames were composed
//! before, so seeking and scrubbing need no warm-up.

use reelkit_captions::{cue_at, CaptionCue};
use reelkit_common::clock::{frames_to_secs, secs_to_frames};
use reelkit_processing_core::{interpolate, VisualTransform};
use reelkit_project_model::Project;
use serde::Serialize;

/// A single frame's composition instructions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameComposition {
    /// Frame number.
    pub frame: u64,

    /// Time in seconds.
    pub time_secs: f64,

    /// Layers bottom to top. Empty means a black frame.
    pub layers: Vec<Layer>,
}

/// One renderable layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Layer {
    Visual(VisualLayer),
    Audio(AudioLayer),
    Caption(CaptionLayer),
}

/// The active scene's image (or its placeholder) with its animation applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualLayer {
    pub scene_id: String,
    pub scene_index: usize,
    /// Frames since the scene started.
    pub local_frame: u64,
    pub source: VisualSource,
    pub transform: VisualTransform,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VisualSource {
    Image { url: String },
    /// Opaque fill for scenes without an image yet.
    Placeholder,
}

/// The soundtrack, positioned on its own timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioLayer {
    pub url: String,
    pub volume: f64,
    /// Composition frame at which the track starts (may be negative).
    pub start_frame: i64,
    /// Frame position inside the track, or `None` before it starts.
    pub source_frame: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionLayer {
    pub cue_index: usize,
    pub text: String,
}

impl FrameComposition {
    pub fn visual(&self) -> Option<&VisualLayer> {
        self.layers.iter().find_map(|layer| match layer {
            Layer::Visual(v) => Some(v),
            _ => None,
        })
    }

    pub fn audio(&self) -> Option<&AudioLayer> {
        self.layers.iter().find_map(|layer| match layer {
            Layer::Audio(a) => Some(a),
            _ => None,
        })
    }

    pub fn caption(&self) -> Option<&CaptionLayer> {
        self.layers.iter().find_map(|layer| match layer {
            Layer::Caption(c) => Some(c),
            _ => None,
        })
    }

    /// No scene covers this frame.
    pub fn is_blank(&self) -> bool {
        self.visual().is_none()
    }
}

/// Total composition length in frames.
///
/// Both the compositor and the playback controller bound themselves by this.
pub fn composition_duration(project: &Project) -> u64 {
    project.total_frames()
}

/// Compose the scene and audio layers for `frame`.
pub fn compose_frame(project: &Project, frame: u64) -> FrameComposition {
    let fps = project.fps();
    let mut layers = Vec::with_capacity(2);

    if let Some(hit) = project.scene_at(frame) {
        let source = match &hit.scene.image_url {
            Some(url) => VisualSource::Image { url: url.clone() },
            None => VisualSource::Placeholder,
        };
        layers.push(Layer::Visual(VisualLayer {
            scene_id: hit.scene.id.clone(),
            scene_index: hit.index,
            local_frame: hit.local_frame,
            source,
            transform: interpolate(hit.scene, hit.local_frame as i64),
        }));
    }

    if let Some(audio) = project.audio() {
        let start_frame = secs_to_frames(audio.offset_seconds, fps);
        let position = frame as i64 - start_frame;
        layers.push(Layer::Audio(AudioLayer {
            url: audio.url.clone(),
            volume: audio.volume,
            start_frame,
            source_frame: u64::try_from(position).ok(),
        }));
    }

    FrameComposition {
        frame,
        time_secs: frames_to_secs(frame, fps),
        layers,
    }
}

/// Compose `frame` and overlay the caption cue active at that time.
pub fn compose_frame_with_captions(
    project: &Project,
    cues: &[CaptionCue],
    frame: u64,
) -> FrameComposition {
    let mut composition = compose_frame(project, frame);
    if let Some(cue) = cue_at(cues, composition.time_secs) {
        composition.layers.push(Layer::Caption(CaptionLayer {
            cue_index: cue.index,
            text: cue.text.clone(),
        }));
    }
    composition
}
