//! Fetch a project from the backend.

use reelkit_common::config::AppConfig;
use reelkit_project_model::init_from_payload;
use reelkit_render_engine::{HttpBackend, ProjectBackend};

use super::inspect::print_summary;

pub async fn run(config: &AppConfig, media_id: String) -> anyhow::Result<()> {
    let backend = HttpBackend::new(&config.backend)?;
    tracing::info!(base_url = backend.base_url(), media_id = %media_id, "Fetching project");

    let payload = backend
        .fetch_project(&media_id)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to fetch {media_id}: {e}"))?;
    let project = init_from_payload(&payload);

    print_summary(&project, payload.status);
    Ok(())
}
