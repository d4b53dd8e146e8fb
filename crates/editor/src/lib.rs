//! ReelKit Editor
//!
//! [`EditorSession`] owns the single live project, its preview player, and
//! the render orchestrator. Every mutation goes through the session, and
//! every network response is applied through a [`RequestTicket`] so that a
//! response for a project the user already left is dropped.

pub mod session;

pub use session::{
    EditorSession, ExportReply, PendingExport, PendingSave, RequestTicket, SaveReply,
};
