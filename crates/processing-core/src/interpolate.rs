//! Per-frame scene animation.
//!
//! [`interpolate`] is a pure function of `(scene, local_frame)`. Out-of-range
//! frames clamp to the nearest endpoint so seeking anywhere, including past
//! either end of a scene, always yields a valid transform.

use reelkit_project_model::{AnimationKind, Scene};
use serde::{Deserialize, Serialize};

use crate::ease::{mix, Easing};

/// Scale reached at the end of a zoom.
pub const ZOOM_END_SCALE: f64 = 1.12;

/// Length of each fade ramp, in frames.
pub const FADE_RAMP_FRAMES: f64 = 8.0;

/// Horizontal offset a slide starts from, in design pixels.
pub const SLIDE_START_OFFSET_PX: f64 = 50.0;

/// Visual state of a scene's image at one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualTransform {
    /// Uniform scale around the image center.
    pub scale: f64,
    /// Opacity in `[0, 1]`.
    pub opacity: f64,
    /// Horizontal offset in design pixels (positive = right).
    pub translate_x: f64,
}

impl VisualTransform {
    /// Full-size, fully opaque, unshifted.
    pub const IDENTITY: VisualTransform = VisualTransform {
        scale: 1.0,
        opacity: 1.0,
        translate_x: 0.0,
    };
}

impl Default for VisualTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Evaluate a scene's animation at `local_frame` frames into the scene.
pub fn interpolate(scene: &Scene, local_frame: i64) -> VisualTransform {
    let duration = scene.duration_in_frames.max(1) as f64;
    let frame = local_frame as f64;

    match scene.animation {
        AnimationKind::Zoom => {
            let e = Easing::OutCubic.apply(frame / duration);
            VisualTransform {
                scale: mix(1.0, ZOOM_END_SCALE, e),
                ..VisualTransform::IDENTITY
            }
        }
        AnimationKind::Fade => VisualTransform {
            opacity: fade_opacity(frame, duration),
            ..VisualTransform::IDENTITY
        },
        AnimationKind::Slide => {
            let e = Easing::OutCubic.apply(frame / duration);
            VisualTransform {
                translate_x: mix(SLIDE_START_OFFSET_PX, 0.0, e),
                ..VisualTransform::IDENTITY
            }
        }
        AnimationKind::None => VisualTransform::IDENTITY,
    }
}

/// Piecewise-linear in/out ramp. Short scenes get overlapping ramps, and
/// taking the smaller of the two keeps the result in `[0, 1]`.
fn fade_opacity(frame: f64, duration: f64) -> f64 {
    let ramp_in = (frame / FADE_RAMP_FRAMES).clamp(0.0, 1.0);
    let ramp_out = ((duration - frame) / FADE_RAMP_FRAMES).clamp(0.0, 1.0);
    ramp_in.min(ramp_out)
}
