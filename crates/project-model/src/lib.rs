//! ReelKit Project Model
//!
//! Defines the core data contracts for ReelKit projects:
//! - **Project:** Metadata, timed scenes, soundtrack, and caption source
//! - **Timeline:** The exclusive mutation operations (insert, remove, resize)
//! - **Status:** Backend media status buckets and the guards derived from them
//! - **Payload:** Mapping to and from the backend's project representation
//!
//! All scene timing is expressed in whole frames at the project's fixed fps.

pub mod payload;
pub mod project;
pub mod status;
pub mod timeline;

pub use payload::*;
pub use project::*;
pub use status::*;
pub use timeline::*;
