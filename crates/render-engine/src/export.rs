//! Draft saving and export-as-new-version orchestration.
//!
//! The orchestrator sits between the editor and a [`ProjectBackend`]. It
//! enforces the status guards client-side, keeps at most one save and one
//! export in flight, and tracks whether the project has unsaved changes.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use reelkit_common::error::{ReelError, ReelResult};
use reelkit_project_model::{
    to_patch, ExportResponse, MediaStatus, Project, ProjectPatch, StatusBucket,
};

use crate::backend::ProjectBackend;

/// Persistence state of the open project.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SaveState {
    /// Backend matches the editor.
    #[default]
    Clean,
    /// Local edits not yet saved.
    Dirty,
    /// A save is in flight.
    Saving,
    /// The last save failed; local edits are still unsaved.
    Failed(String),
}

impl SaveState {
    pub fn has_unsaved_changes(&self) -> bool {
        !matches!(self, SaveState::Clean)
    }
}

/// Which operation an in-flight flag protects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Save,
    Export,
}

impl Operation {
    fn label(self) -> &'static str {
        match self {
            Operation::Save => "save",
            Operation::Export => "export",
        }
    }
}

/// Holds an in-flight flag until the request's outcome is dropped.
struct InFlightGuard {
    flag: Rc<Cell<bool>>,
}

impl InFlightGuard {
    fn acquire(flag: &Rc<Cell<bool>>, op: Operation) -> ReelResult<Self> {
        if flag.replace(true) {
            return Err(ReelError::export(format!(
                "A {} is already in progress",
                op.label()
            )));
        }
        Ok(Self {
            flag: Rc::clone(flag),
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

/// A patch-project request detached from the orchestrator.
///
/// Owns the snapshot and a handle to the backend, so the caller stays free
/// to tick the preview or tear down the project while it is in flight.
pub struct SaveRequest<B> {
    backend: Arc<B>,
    media_id: String,
    patch: ProjectPatch,
    guard: InFlightGuard,
}

impl<B: ProjectBackend> SaveRequest<B> {
    pub fn media_id(&self) -> &str {
        &self.media_id
    }

    pub fn patch(&self) -> &ProjectPatch {
        &self.patch
    }

    /// Send the patch. Apply the outcome with [`RenderOrchestrator::finish_save`].
    pub async fn send(self) -> SaveOutcome {
        let result = self
            .backend
            .patch_project(&self.media_id, &self.patch)
            .await;
        SaveOutcome {
            media_id: self.media_id,
            scenes: self.patch.scenes.len(),
            result,
            _guard: self.guard,
        }
    }
}

/// Backend answer to a [`SaveRequest`].
pub struct SaveOutcome {
    media_id: String,
    scenes: usize,
    result: ReelResult<()>,
    _guard: InFlightGuard,
}

impl SaveOutcome {
    pub fn media_id(&self) -> &str {
        &self.media_id
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// A save-then-export request detached from the orchestrator.
pub struct ExportRequest<B> {
    backend: Arc<B>,
    media_id: String,
    patch: ProjectPatch,
    previous: MediaStatus,
    guard: InFlightGuard,
}

impl<B: ProjectBackend> ExportRequest<B> {
    pub fn media_id(&self) -> &str {
        &self.media_id
    }

    /// Persist the snapshot, then ask for a new version. Apply the outcome
    /// with [`RenderOrchestrator::finish_export`].
    pub async fn send(self) -> ExportOutcome {
        let stage = match self
            .backend
            .patch_project(&self.media_id, &self.patch)
            .await
        {
            Ok(()) => match self.backend.export_new_version(&self.media_id).await {
                Ok(response) => ExportStage::Started(response),
                Err(e) => ExportStage::ExportFailed(e),
            },
            Err(e) => ExportStage::SaveFailed(e),
        };
        ExportOutcome {
            media_id: self.media_id,
            scenes: self.patch.scenes.len(),
            previous: self.previous,
            stage,
            _guard: self.guard,
        }
    }
}

enum ExportStage {
    SaveFailed(ReelError),
    ExportFailed(ReelError),
    Started(ExportResponse),
}

/// Backend answer to an [`ExportRequest`].
pub struct ExportOutcome {
    media_id: String,
    scenes: usize,
    previous: MediaStatus,
    stage: ExportStage,
    _guard: InFlightGuard,
}

impl ExportOutcome {
    pub fn media_id(&self) -> &str {
        &self.media_id
    }

    /// Status the project had before the export was requested.
    pub fn previous_status(&self) -> MediaStatus {
        self.previous
    }
}

/// Saves drafts and triggers new-version renders.
pub struct RenderOrchestrator<B> {
    backend: Arc<B>,
    status: Cell<MediaStatus>,
    save_state: RefCell<SaveState>,
    saving: Rc<Cell<bool>>,
    exporting: Rc<Cell<bool>>,
}

impl<B: ProjectBackend> RenderOrchestrator<B> {
    pub fn new(backend: B, status: MediaStatus) -> Self {
        Self {
            backend: Arc::new(backend),
            status: Cell::new(status),
            save_state: RefCell::new(SaveState::Clean),
            saving: Rc::new(Cell::new(false)),
            exporting: Rc::new(Cell::new(false)),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn status(&self) -> MediaStatus {
        self.status.get()
    }

    /// Display bucket for the current status.
    pub fn bucket(&self) -> StatusBucket {
        self.status.get().bucket()
    }

    /// Replace the tracked status (after a fetch or poll).
    pub fn set_status(&self, status: MediaStatus) {
        self.status.set(status);
    }

    pub fn save_state(&self) -> SaveState {
        self.save_state.borrow().clone()
    }

    /// Record a local edit.
    pub fn mark_dirty(&self) {
        *self.save_state.borrow_mut() = SaveState::Dirty;
    }

    /// Record that the editor matches the backend (after a fresh load).
    pub fn mark_clean(&self) {
        *self.save_state.borrow_mut() = SaveState::Clean;
    }

    pub fn is_saving(&self) -> bool {
        self.saving.get()
    }

    pub fn is_exporting(&self) -> bool {
        self.exporting.get()
    }

    /// Forget the open project. Requests still in flight keep their own
    /// flags and no longer block new ones.
    pub fn reset(&mut self) {
        self.saving = Rc::new(Cell::new(false));
        self.exporting = Rc::new(Cell::new(false));
        self.status.set(MediaStatus::default());
        self.mark_clean();
    }

    /// Start persisting the project without rendering.
    pub fn begin_save(&self, project: &Project) -> ReelResult<SaveRequest<B>> {
        if self.status.get().is_busy() {
            return Err(ReelError::export(format!(
                "Cannot save while the project is {}",
                self.status.get()
            )));
        }
        let guard = InFlightGuard::acquire(&self.saving, Operation::Save)?;
        *self.save_state.borrow_mut() = SaveState::Saving;
        Ok(SaveRequest {
            backend: Arc::clone(&self.backend),
            media_id: project.id().to_string(),
            patch: to_patch(project),
            guard,
        })
    }

    /// Apply the answer to a [`SaveRequest`].
    pub fn finish_save(&self, outcome: SaveOutcome) -> ReelResult<()> {
        let SaveOutcome {
            media_id,
            scenes,
            result,
            _guard,
        } = outcome;
        match result {
            Ok(()) => {
                self.saved(&media_id, scenes);
                Ok(())
            }
            Err(e) => {
                self.save_failed(&media_id, &e);
                Err(e)
            }
        }
    }

    /// Start a save-then-export. The status reads `rendering` until the
    /// outcome is applied and reverts if it failed.
    pub fn begin_export(&self, project: &Project) -> ReelResult<ExportRequest<B>> {
        let previous = self.status.get();
        if !previous.can_export() {
            return Err(ReelError::export(format!(
                "Cannot export while the project is {previous}"
            )));
        }
        let guard = InFlightGuard::acquire(&self.exporting, Operation::Export)?;

        tracing::info!(
            media_id = project.id(),
            backend = self.backend.name(),
            "Starting export"
        );
        self.status.set(MediaStatus::Rendering);
        *self.save_state.borrow_mut() = SaveState::Saving;
        Ok(ExportRequest {
            backend: Arc::clone(&self.backend),
            media_id: project.id().to_string(),
            patch: to_patch(project),
            previous,
            guard,
        })
    }

    /// Apply the answer to an [`ExportRequest`]; returns the new version's
    /// media id.
    pub fn finish_export(&self, outcome: ExportOutcome) -> ReelResult<String> {
        let ExportOutcome {
            media_id,
            scenes,
            previous,
            stage,
            _guard,
        } = outcome;
        let err = match stage {
            ExportStage::Started(response) => {
                self.saved(&media_id, scenes);
                tracing::info!(
                    media_id = %media_id,
                    version_id = %response.id,
                    "Export started"
                );
                return Ok(response.id);
            }
            ExportStage::ExportFailed(e) => {
                self.saved(&media_id, scenes);
                e
            }
            ExportStage::SaveFailed(e) => {
                self.save_failed(&media_id, &e);
                e
            }
        };
        self.status.set(previous);
        tracing::warn!(media_id = %media_id, error = %err, "Export failed");
        Err(err)
    }

    /// Persist the project without rendering.
    pub async fn save_draft(&self, project: &Project) -> ReelResult<()> {
        let request = self.begin_save(project)?;
        let outcome = request.send().await;
        self.finish_save(outcome)
    }

    /// Save, then ask the backend to render a new version.
    ///
    /// Returns the new version's media id.
    pub async fn export_as_version(&self, project: &Project) -> ReelResult<String> {
        let request = self.begin_export(project)?;
        let outcome = request.send().await;
        self.finish_export(outcome)
    }

    /// Fetch the current status of any media record.
    pub async fn poll_status(&self, media_id: &str) -> ReelResult<MediaStatus> {
        let remote = self.backend.fetch_project(media_id).await?;
        tracing::debug!(media_id, status = %remote.status, "Polled status");
        Ok(remote.status)
    }

    /// Poll `media_id` until it leaves the busy bucket or `max_polls` runs out.
    pub async fn wait_until_settled(
        &self,
        media_id: &str,
        interval: Duration,
        max_polls: u32,
    ) -> ReelResult<MediaStatus> {
        for attempt in 1..=max_polls.max(1) {
            let status = self.poll_status(media_id).await?;
            if !status.is_busy() {
                return Ok(status);
            }
            tracing::info!(media_id, attempt, status = %status, "Render still running");
            if attempt < max_polls {
                tokio::time::sleep(interval).await;
            }
        }
        Err(ReelError::export(format!(
            "Render of {media_id} did not finish after {max_polls} polls"
        )))
    }

    fn saved(&self, media_id: &str, scenes: usize) {
        // An edit made during the request leaves the state dirty.
        let mut state = self.save_state.borrow_mut();
        if *state == SaveState::Saving {
            *state = SaveState::Clean;
        }
        tracing::info!(media_id, scenes, "Saved draft");
    }

    fn save_failed(&self, media_id: &str, error: &ReelError) {
        *self.save_state.borrow_mut() = SaveState::Failed(error.to_string());
        tracing::warn!(media_id, error = %error, "Save failed, changes are unsaved");
    }
}
