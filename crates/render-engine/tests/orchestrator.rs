use std::sync::Mutex;
use std::time::Duration;

use reelkit_common::error::{ReelError, ReelResult};
use reelkit_project_model::{
    BackendProject, ExportResponse, MediaStatus, Project, ProjectPatch, StatusBucket,
};
use reelkit_render_engine::{ProjectBackend, RenderOrchestrator, SaveState};

#[derive(Default)]
struct MockBackend {
    patches: Mutex<Vec<String>>,
    exports: Mutex<u32>,
    fail_patch: Mutex<bool>,
    fail_export: Mutex<bool>,
    statuses: Mutex<Vec<MediaStatus>>,
}

#[async_trait::async_trait]
impl ProjectBackend for MockBackend {
    async fn fetch_project(&self, media_id: &str) -> ReelResult<BackendProject> {
        let mut statuses = self.statuses.lock().unwrap();
        let status = if statuses.len() > 1 {
            statuses.remove(0)
        } else {
            statuses.first().copied().unwrap_or_default()
        };
        Ok(BackendProject {
            id: media_id.to_string(),
            status,
            ..Default::default()
        })
    }

    async fn patch_project(&self, _media_id: &str, patch: &ProjectPatch) -> ReelResult<()> {
        // Suspend once so concurrent callers interleave.
        tokio::task::yield_now().await;
        if *self.fail_patch.lock().unwrap() {
            return Err(ReelError::backend("patch-project returned HTTP 500"));
        }
        self.patches.lock().unwrap().push(patch.to_json().unwrap());
        Ok(())
    }

    async fn export_new_version(&self, media_id: &str) -> ReelResult<ExportResponse> {
        tokio::task::yield_now().await;
        if *self.fail_export.lock().unwrap() {
            return Err(ReelError::backend("export-new-version returned HTTP 502"));
        }
        *self.exports.lock().unwrap() += 1;
        Ok(ExportResponse {
            id: format!("{media_id}-v2"),
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

fn project() -> Project {
    Project::new("media-1", "Orchestrated", 30)
}

#[tokio::test]
async fn save_draft_is_idempotent() {
    let orchestrator = RenderOrchestrator::new(MockBackend::default(), MediaStatus::Pending);
    let project = project();
    orchestrator.mark_dirty();

    orchestrator.save_draft(&project).await.unwrap();
    orchestrator.save_draft(&project).await.unwrap();

    let patches = orchestrator.backend().patches.lock().unwrap().clone();
    assert_eq!(patches.len(), 2);
    assert_eq!(patches[0], patches[1]);
    assert_eq!(orchestrator.save_state(), SaveState::Clean);
}

#[tokio::test]
async fn concurrent_duplicate_save_is_rejected() {
    let orchestrator = RenderOrchestrator::new(MockBackend::default(), MediaStatus::Pending);
    let project = project();

    let (first, second) = tokio::join!(
        orchestrator.save_draft(&project),
        orchestrator.save_draft(&project)
    );
    assert!(first.is_ok());
    assert!(matches!(second, Err(ReelError::Export { .. })));
    assert_eq!(orchestrator.backend().patches.lock().unwrap().len(), 1);
    assert!(!orchestrator.is_saving());
}

#[tokio::test]
async fn save_rejected_while_busy() {
    let orchestrator = RenderOrchestrator::new(MockBackend::default(), MediaStatus::Processing);
    assert!(orchestrator.save_draft(&project()).await.is_err());
    assert!(orchestrator.backend().patches.lock().unwrap().is_empty());
}

#[tokio::test]
async fn failed_save_is_surfaced() {
    let backend = MockBackend::default();
    *backend.fail_patch.lock().unwrap() = true;
    let orchestrator = RenderOrchestrator::new(backend, MediaStatus::Pending);
    orchestrator.mark_dirty();

    let err = orchestrator.save_draft(&project()).await.unwrap_err();
    assert!(err.to_string().contains("500"));
    assert!(matches!(orchestrator.save_state(), SaveState::Failed(msg) if msg.contains("500")));
    assert!(orchestrator.save_state().has_unsaved_changes());
}

#[tokio::test]
async fn edit_during_save_stays_dirty() {
    let orchestrator = RenderOrchestrator::new(MockBackend::default(), MediaStatus::Pending);
    let project = project();

    let (saved, ()) = tokio::join!(orchestrator.save_draft(&project), async {
        orchestrator.mark_dirty();
    });
    saved.unwrap();
    assert_eq!(orchestrator.save_state(), SaveState::Dirty);
}

#[tokio::test]
async fn export_returns_new_version_and_reads_rendering() {
    let orchestrator = RenderOrchestrator::new(MockBackend::default(), MediaStatus::Completed);

    let version = orchestrator.export_as_version(&project()).await.unwrap();
    assert_eq!(version, "media-1-v2");
    assert_eq!(orchestrator.bucket(), StatusBucket::Rendering);
    assert_eq!(orchestrator.backend().patches.lock().unwrap().len(), 1);
    assert_eq!(*orchestrator.backend().exports.lock().unwrap(), 1);
}

#[tokio::test]
async fn export_rejected_before_any_request_while_busy() {
    let orchestrator = RenderOrchestrator::new(MockBackend::default(), MediaStatus::Rendering);
    let err = orchestrator.export_as_version(&project()).await.unwrap_err();
    assert!(matches!(err, ReelError::Export { .. }));
    assert!(orchestrator.backend().patches.lock().unwrap().is_empty());
    assert_eq!(*orchestrator.backend().exports.lock().unwrap(), 0);
}

#[tokio::test]
async fn failed_export_reverts_status() {
    let backend = MockBackend::default();
    *backend.fail_export.lock().unwrap() = true;
    let orchestrator = RenderOrchestrator::new(backend, MediaStatus::Failed);

    assert!(orchestrator.export_as_version(&project()).await.is_err());
    assert_eq!(orchestrator.status(), MediaStatus::Failed);
    assert_eq!(orchestrator.bucket(), StatusBucket::Failed);
    assert!(!orchestrator.is_exporting());
}

#[tokio::test]
async fn optimistic_rendering_while_in_flight() {
    let orchestrator = RenderOrchestrator::new(MockBackend::default(), MediaStatus::Pending);
    let project = project();

    let (result, observed) = tokio::join!(orchestrator.export_as_version(&project), async {
        orchestrator.bucket()
    });
    result.unwrap();
    assert_eq!(observed, StatusBucket::Rendering);
}

#[tokio::test]
async fn concurrent_duplicate_export_is_rejected() {
    let orchestrator = RenderOrchestrator::new(MockBackend::default(), MediaStatus::Completed);
    let project = project();

    let (first, second) = tokio::join!(
        orchestrator.export_as_version(&project),
        orchestrator.export_as_version(&project)
    );
    assert!(first.is_ok());
    assert!(second.is_err());
    assert_eq!(*orchestrator.backend().exports.lock().unwrap(), 1);
}

#[tokio::test]
async fn wait_until_settled_polls_past_busy_statuses() {
    let backend = MockBackend::default();
    *backend.statuses.lock().unwrap() = vec![
        MediaStatus::Processing,
        MediaStatus::Rendering,
        MediaStatus::Completed,
    ];
    let orchestrator = RenderOrchestrator::new(backend, MediaStatus::Completed);

    let status = orchestrator
        .wait_until_settled("media-1-v2", Duration::from_millis(1), 10)
        .await
        .unwrap();
    assert_eq!(status, MediaStatus::Completed);
}

#[tokio::test]
async fn wait_until_settled_gives_up() {
    let backend = MockBackend::default();
    *backend.statuses.lock().unwrap() = vec![MediaStatus::Rendering];
    let orchestrator = RenderOrchestrator::new(backend, MediaStatus::Completed);

    let result = orchestrator
        .wait_until_settled("media-1-v2", Duration::from_millis(1), 3)
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn detached_save_applies_after_reset_releases_flags() {
    let mut orchestrator = RenderOrchestrator::new(MockBackend::default(), MediaStatus::Pending);
    let project = project();

    let stale = orchestrator.begin_save(&project).unwrap();
    assert!(orchestrator.is_saving());
    assert_eq!(stale.media_id(), "media-1");
    assert!(orchestrator.begin_save(&project).is_err());

    orchestrator.reset();
    assert!(!orchestrator.is_saving());
    assert_eq!(orchestrator.save_state(), SaveState::Clean);

    let fresh = orchestrator.begin_save(&project).unwrap();
    orchestrator.finish_save(fresh.send().await).unwrap();
    drop(stale);
    assert_eq!(orchestrator.backend().patches.lock().unwrap().len(), 1);
    assert_eq!(orchestrator.save_state(), SaveState::Clean);
}
