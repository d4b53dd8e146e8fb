//! ReelKit Render Engine
//!
//! Turns a project into per-frame layer descriptions and drives the backend
//! render pipeline. Nothing here encodes video; the backend does.
//!
//! # Pipeline Architecture
//!
//! ```text
//! Project ──┐
//!           ├── scene lookup ── interpolate ── visual layer
//! frame ────┘        │
//!                    ├── audio offset ───────── audio layer
//! captions.srt ──────┘
//!                    └── active cue ─────────── caption layer
//!                                                   │
//!                                                   ▼
//!                                           FrameComposition
//!
//! Project ── to_patch ── PATCH /projects/{id} ── POST /projects/{id}/export
//!                                                   │
//!                                                   ▼
//!                                           new media id ── poll status
//! ```

pub mod backend;
pub mod compositor;
pub mod export;

pub use backend::{HttpBackend, ProjectBackend};
pub use compositor::*;
pub use export::*;
