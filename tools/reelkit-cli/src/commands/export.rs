//! Save a project and render it as a new version.

use std::rc::Rc;
use std::time::Duration;

use reelkit_captions::{CaptionLoader, HttpCaptionSource};
use reelkit_common::clock::{FrameClock, MonotonicClock};
use reelkit_common::config::AppConfig;
use reelkit_editor::EditorSession;
use reelkit_render_engine::HttpBackend;

pub async fn run(
    config: &AppConfig,
    media_id: String,
    wait: bool,
    poll_secs: Option<u64>,
    max_polls: u32,
) -> anyhow::Result<()> {
    let backend = HttpBackend::new(&config.backend)?;
    let captions = CaptionLoader::from_config(
        HttpCaptionSource::new(Duration::from_secs(config.backend.request_timeout_secs))?,
        &config.preview,
    );
    let clock: Rc<dyn FrameClock> = Rc::new(MonotonicClock::start());
    let mut session = EditorSession::new(backend, captions, clock, config.preview.clone());

    println!("Opening {media_id}...");
    session.open(&media_id).await?;
    let status = session.status();
    println!("  Status: {status} ({:?})", status.bucket());

    if !status.can_export() {
        anyhow::bail!("Project {media_id} cannot be exported while {status}");
    }

    let version = session.export().await?;
    println!("Export started: new version {version}");

    if wait {
        let poll_secs = poll_secs.unwrap_or(config.backend.poll_interval_secs);
        let interval = Duration::from_secs(poll_secs.max(1));
        println!("Waiting for {version} to finish rendering...");
        let final_status = session
            .orchestrator()
            .wait_until_settled(&version, interval, max_polls)
            .await?;
        println!("  {version}: {final_status} ({:?})", final_status.bucket());
        if final_status.can_retry() {
            anyhow::bail!("Render of {version} failed");
        }
    }

    Ok(())
}
