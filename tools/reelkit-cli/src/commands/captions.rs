//! Parse, list, and normalise SRT caption files.

use std::path::PathBuf;

use reelkit_captions::{format_srt, parse_srt};

pub fn run(path: PathBuf, normalize: bool) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
    let cues = parse_srt(&text);

    if normalize {
        print!("{}", format_srt(&cues));
        return Ok(());
    }

    println!("Captions: {} ({} cues)", path.display(), cues.len());
    for cue in &cues {
        println!(
            "  #{} {:>8.3}s -> {:>8.3}s  {}",
            cue.index,
            cue.start_seconds,
            cue.end_seconds,
            cue.text.replace('\n', " / ")
        );
    }
    Ok(())
}
