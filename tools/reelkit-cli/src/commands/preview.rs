//! Real-time preview playback on the monotonic clock.

use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use reelkit_common::clock::{FrameClock, MonotonicClock};
use reelkit_playback_engine::{PreviewPlayer, TickOutcome};
use reelkit_project_model::{init_from_payload, BackendProject};

pub async fn run(path: PathBuf, rate: f64, looping: bool, seconds: f64) -> anyhow::Result<()> {
    let payload = BackendProject::load(&path)
        .map_err(|e| anyhow::anyhow!("Failed to load payload: {e}"))?;
    let project = init_from_payload(&payload);

    let clock = Rc::new(MonotonicClock::start());
    let shared: Rc<dyn FrameClock> = clock.clone();
    let mut player = PreviewPlayer::for_project(shared, &project);
    player.set_rate(rate).map_err(|e| anyhow::anyhow!("{e}"))?;
    player.set_loop(looping);

    let budget = Duration::from_secs_f64(seconds.max(0.0));
    println!(
        "Previewing {} ({} frames @ {}fps, {}x{}) for up to {:.1}s",
        project.meta().title,
        project.total_frames(),
        project.fps(),
        player.size().0,
        player.size().1,
        budget.as_secs_f64()
    );
    tracing::info!(started_at = clock.epoch_wall(), "Preview clock started");

    let mut current_scene = project.scene_at(0).map(|hit| hit.index);
    player.play();

    while let Some(next) = clock.next_deadline() {
        if clock.now() >= budget {
            break;
        }
        tokio::time::sleep_until(tokio::time::Instant::from_std(next)).await;

        for id in clock.due_timers() {
            let outcome = player.on_timer(id);
            let frame = player.get_frame();
            let scene = project.scene_at(frame).map(|hit| hit.index);
            if scene != current_scene {
                if let Some(hit) = project.scene_at(frame) {
                    tracing::info!(frame, scene = %hit.scene.id, index = hit.index, "Scene change");
                }
                current_scene = scene;
            }

            match outcome {
                TickOutcome::Wrapped(frame) => tracing::info!(frame, "Looped"),
                TickOutcome::Ended(frame) => println!("Reached the end at frame {frame}"),
                TickOutcome::Stopped { frame, error } => {
                    anyhow::bail!("Playback stopped at frame {frame}: {error}")
                }
                TickOutcome::Advanced(_) | TickOutcome::Ignored => {}
            }
        }
    }

    player.release();
    let composition = player.render(&project);
    println!(
        "Stopped at frame {} ({:.2}s), {} layer(s)",
        composition.frame,
        composition.time_secs,
        composition.layers.len()
    );
    Ok(())
}
