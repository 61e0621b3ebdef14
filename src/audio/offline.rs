use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Instant;

use super::player::LoopPlayer;
use crate::controller::{RateController, RunStats};
use crate::error::Result;
use crate::trajectory::Trajectory;

/// Output frames rendered per controller tick at `sample_rate`.
pub fn frames_per_tick(controller: &RateController, sample_rate: u32) -> usize {
    let frames = controller.tick_period().as_secs_f64() * sample_rate as f64;
    (frames.round() as usize).max(1)
}

/// Runs the trajectory as fast as possible, writing what the live render
/// path would have played to a mono 32-bit float WAV file.
pub fn render_to_wav(
    controller: &RateController,
    trajectory: &mut Trajectory,
    player: &mut LoopPlayer,
    sample_rate: u32,
    path: &Path,
) -> Result<RunStats> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {spinner} {pos} ticks {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );

    let start = Instant::now();
    let mut stats = RunStats::default();
    let mut buffer = vec![0.0f32; frames_per_tick(controller, sample_rate)];

    while let Some((rpm, rate)) = controller.tick(trajectory) {
        player.render(&mut buffer);
        for &sample in &buffer {
            writer.write_sample(sample)?;
        }

        stats.ticks += 1;
        stats.last_rpm = rpm;
        stats.last_rate = Some(rate);
        if stats.ticks % 64 == 0 {
            pb.set_position(stats.ticks);
            pb.set_message(format!("{} RPM", rpm));
        }
    }

    writer.finalize()?;
    stats.elapsed = start.elapsed();
    pb.finish_with_message("render complete");

    log::info!(
        "Rendered {} ticks ({:.1}s of audio) to {}",
        stats.ticks,
        stats.ticks as f64 * controller.tick_period().as_secs_f64(),
        path.display()
    );

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::SharedRate;
    use std::time::Duration;

    #[test]
    fn renders_one_buffer_per_tick() {
        let path = std::env::temp_dir().join(format!("revsim-offline-{}.wav", std::process::id()));
        let shared = SharedRate::default();
        let controller =
            RateController::new(1000, Duration::from_millis(10), shared.clone()).unwrap();
        let mut player = LoopPlayer::new(vec![0.5; 64], 1000, 1000, shared);
        let mut trajectory = Trajectory::interpolate(1000, 1000, 4);

        let stats = render_to_wav(&controller, &mut trajectory, &mut player, 1000, &path).unwrap();
        assert_eq!(stats.ticks, 4);

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 1000);
        let samples: Vec<f32> = reader.into_samples::<f32>().map(|s| s.unwrap()).collect();
        assert_eq!(samples.len(), 40);
        assert!(samples.iter().all(|&s| s == 0.5));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn tick_is_at_least_one_frame() {
        let controller = RateController::new(1000, Duration::ZERO, SharedRate::default()).unwrap();
        assert_eq!(frames_per_tick(&controller, 44100), 1);

        let controller =
            RateController::new(1000, Duration::from_millis(5), SharedRate::default()).unwrap();
        assert_eq!(frames_per_tick(&controller, 48000), 240);
    }
}
