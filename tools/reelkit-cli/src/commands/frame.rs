//! Print the composition of a single frame.

use std::path::PathBuf;

use reelkit_captions::parse_srt;
use reelkit_project_model::{init_from_payload, BackendProject};
use reelkit_render_engine::{compose_frame_with_captions, composition_duration};

pub fn run(path: PathBuf, frame: u64, captions: Option<PathBuf>) -> anyhow::Result<()> {
    let payload = BackendProject::load(&path)
        .map_err(|e| anyhow::anyhow!("Failed to load payload: {e}"))?;
    let project = init_from_payload(&payload);

    let cues = match captions {
        Some(srt) => {
            let text = std::fs::read_to_string(&srt)
                .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", srt.display()))?;
            parse_srt(&text)
        }
        None => Vec::new(),
    };

    let total = composition_duration(&project);
    if frame >= total {
        tracing::warn!(frame, total, "Frame is past the end of the composition");
    }

    let composition = compose_frame_with_captions(&project, &cues, frame);
    println!("{}", serde_json::to_string_pretty(&composition)?);
    Ok(())
}
