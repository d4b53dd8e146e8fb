//! ReelKit Playback Engine
//!
//! Drives the live preview:
//! - **Controller:** The play/pause/step/seek state machine, ticked by an
//!   injectable [`FrameClock`](reelkit_common::clock::FrameClock)
//! - **Preview:** A sized player that composes the current frame on demand
//!
//! Playback position is always derived from elapsed clock time, so a late
//! tick skips frames instead of drifting.

pub mod controller;
pub mod preview;

pub use controller::*;
pub use preview::*;
