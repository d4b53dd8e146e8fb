//! Summarise a backend project payload.

use std::path::PathBuf;

use reelkit_common::clock::frames_to_secs;
use reelkit_project_model::{init_from_payload, BackendProject, MediaStatus, Project};

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    let payload = BackendProject::load(&path)
        .map_err(|e| anyhow::anyhow!("Failed to load payload: {e}"))?;
    let project = init_from_payload(&payload);

    print_summary(&project, payload.status);
    Ok(())
}

/// Print meta, scenes, soundtrack, guards and validation issues.
pub fn print_summary(project: &Project, status: MediaStatus) {
    let meta = project.meta();
    let fps = project.fps();

    println!("Project: {}", meta.title);
    println!("  ID: {}", project.id());
    println!("  Aspect ratio: {}", meta.aspect_ratio.label());
    println!(
        "  Duration: {} frames ({:.2}s @ {}fps)",
        project.total_frames(),
        meta.duration_seconds,
        fps
    );
    println!();

    println!("Scenes:");
    for (i, scene) in project.scenes().iter().enumerate() {
        println!(
            "  [{i}] {}: frames {}..{} ({:.2}s), {}, {}",
            scene.id,
            scene.start_frame,
            scene.end_frame(),
            frames_to_secs(scene.duration_in_frames, fps),
            scene.animation.as_str(),
            scene.image_url.as_deref().unwrap_or("<placeholder>")
        );
    }
    println!();

    match project.audio() {
        Some(audio) => println!(
            "Audio: {} (volume {:.2}, offset {:.2}s)",
            audio.url, audio.volume, audio.offset_seconds
        ),
        None => println!("Audio: none"),
    }
    println!("Captions: {}", project.caption_url().unwrap_or("none"));
    println!();

    println!("Status: {status} ({:?})", status.bucket());
    println!("  Editable: {}", status.can_edit());
    println!("  Exportable: {}", status.can_export());
    println!("  Retryable: {}", status.can_retry());

    let issues = project.validate();
    if !issues.is_empty() {
        println!("\nValidation issues:");
        for issue in &issues {
            println!("  - {issue}");
        }
    }
}
