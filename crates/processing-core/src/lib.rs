//! ReelKit Processing Core — scene animation
//!
//! Turns a scene and a frame offset into a visual transform:
//! - **Easing:** Curves shared by every animation kind
//! - **Interpolation:** Zoom, fade, and slide evaluated for any frame
//!
//! This crate is pure computation with no I/O and no clock access.
//! Evaluating frame `f` never depends on having evaluated frame `f - 1`.

pub mod ease;
pub mod interpolate;

pub use ease::Easing;
pub use interpolate::{interpolate, VisualTransform};
