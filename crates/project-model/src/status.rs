//! Backend media status and the guards derived from it.
//!
//! The backend reports a fine-grained status string; the editor only cares
//! which display bucket it falls into and what that bucket allows.

use serde::{Deserialize, Serialize};

/// Status of a media record as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum MediaStatus {
    /// Draft, never rendered.
    #[default]
    Pending,
    ScriptGenerating,
    ScriptComplete,
    Processing,
    Rendering,
    Completed,
    Failed,
    /// Any status string this build does not know.
    Unknown,
}

/// Coarse status shown in the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusBucket {
    Draft,
    Rendering,
    Completed,
    Failed,
    Unknown,
}

impl MediaStatus {
    /// Parse a backend status string.
    pub fn parse(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "pending" => MediaStatus::Pending,
            "script_generating" => MediaStatus::ScriptGenerating,
            "script_complete" => MediaStatus::ScriptComplete,
            "processing" => MediaStatus::Processing,
            "rendering" => MediaStatus::Rendering,
            "completed" => MediaStatus::Completed,
            "failed" => MediaStatus::Failed,
            _ => MediaStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaStatus::Pending => "pending",
            MediaStatus::ScriptGenerating => "script_generating",
            MediaStatus::ScriptComplete => "script_complete",
            MediaStatus::Processing => "processing",
            MediaStatus::Rendering => "rendering",
            MediaStatus::Completed => "completed",
            MediaStatus::Failed => "failed",
            MediaStatus::Unknown => "unknown",
        }
    }

    pub fn bucket(&self) -> StatusBucket {
        match self {
            MediaStatus::Pending => StatusBucket::Draft,
            MediaStatus::ScriptGenerating
            | MediaStatus::ScriptComplete
            | MediaStatus::Processing
            | MediaStatus::Rendering => StatusBucket::Rendering,
            MediaStatus::Completed => StatusBucket::Completed,
            MediaStatus::Failed => StatusBucket::Failed,
            MediaStatus::Unknown => StatusBucket::Unknown,
        }
    }

    /// A render job is running for this media.
    pub fn is_busy(&self) -> bool {
        self.bucket() == StatusBucket::Rendering
    }

    pub fn can_edit(&self) -> bool {
        !self.is_busy()
    }

    /// Allowed to trigger a (re-)render.
    pub fn can_export(&self) -> bool {
        !self.is_busy()
            && matches!(
                self,
                MediaStatus::Completed | MediaStatus::Failed | MediaStatus::Pending
            )
    }

    pub fn can_retry(&self) -> bool {
        *self == MediaStatus::Failed
    }
}

impl From<String> for MediaStatus {
    fn from(value: String) -> Self {
        MediaStatus::parse(&value)
    }
}

impl From<MediaStatus> for String {
    fn from(value: MediaStatus) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for MediaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a render is in progress for this status string.
pub fn is_busy(status: &str) -> bool {
    MediaStatus::parse(status).is_busy()
}

pub fn can_edit(status: &str) -> bool {
    MediaStatus::parse(status).can_edit()
}

pub fn can_export(status: &str) -> bool {
    MediaStatus::parse(status).can_export()
}

pub fn can_retry(status: &str) -> bool {
    MediaStatus::parse(status).can_retry()
}
