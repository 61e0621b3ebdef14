mod cli;

use anyhow::{Context, Result};
use clap::Parser;

use cli::Cli;
use revsim::audio::{decode, offline, player::LoopPlayer, spectrum};
use revsim::chart;
use revsim::config::{self, Config};
use revsim::controller::{RateController, SharedRate};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(config::find_config);
    let mut cfg = match config_path {
        Some(ref path) => {
            let cfg = config::load_config(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            log::info!("Loaded config from {}", path.display());
            cfg
        }
        None => Config::default(),
    };

    // Command-line values win over the config file
    if let Some(max_rpm) = cli.max_rpm { cfg.analysis_max_rpm = max_rpm; }
    if let Some(baseline) = cli.baseline { cfg.baseline_rpm = Some(baseline); }
    if let Some(tick_ms) = cli.tick_ms { cfg.tick_ms = tick_ms; }
    if let Some(jitter) = cli.jitter { cfg.jitter_std_dev = jitter; }
    if cli.seed.is_some() { cfg.seed = cli.seed; }
    if let Some(ref chart) = cli.chart { cfg.chart_path = chart.clone(); }
    cfg.validate().context("Invalid settings")?;

    let input = cli
        .input
        .clone()
        .or_else(|| cfg.source_file.clone())
        .context("Input recording is required (argument or sourceFile in config)")?;

    log::info!("revsim - engine sound simulator");
    log::info!("Input: {}", input.display());

    // 1. Decode and analyze the idle recording
    let clip = decode::decode_clip(&input)
        .with_context(|| format!("Failed to decode {}", input.display()))?;
    let analysis = spectrum::analyze(&clip.samples, clip.sample_rate, cfg.analysis_max_rpm);
    log::info!(
        "{}: max RPM {} ({} windows of {} samples)",
        input.display(),
        analysis.peak_rpm,
        analysis.windows,
        analysis.window_size
    );

    // 2. Spectrum chart
    chart::render_png(&analysis.points, analysis.peak_rpm, &cfg.chart_path, 1152, 384)
        .context("Failed to render spectrum chart")?;
    if let Some(ref path) = cli.points_json {
        chart::write_json(&analysis.points, analysis.peak_rpm, path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    if cli.analyze_only {
        return Ok(());
    }

    // 3. Controller
    let baseline = cfg.baseline_rpm.unwrap_or(analysis.peak_rpm);
    log::info!(
        "Baseline: {} RPM ({})",
        baseline,
        if cfg.baseline_rpm.is_some() { "configured" } else { "estimated" }
    );

    let shared = SharedRate::default();
    let controller = RateController::new(baseline, cfg.tick_period(), shared.clone())
        .context("No usable baseline RPM; set baselineRPM or use a longer recording")?;
    let mut trajectory = cfg.build_trajectory().context("Failed to build trajectory")?;

    // 4a. Offline render
    if let Some(ref out) = cli.render {
        let mut player =
            LoopPlayer::new(clip.samples, clip.sample_rate, clip.sample_rate, shared);
        offline::render_to_wav(&controller, &mut trajectory, &mut player, clip.sample_rate, out)
            .with_context(|| format!("Failed to render {}", out.display()))?;
        log::info!("Done! Output: {}", out.display());
        return Ok(());
    }

    // 4b. Live playback
    play_live(controller, trajectory, clip)
}

#[cfg(feature = "playback")]
fn play_live(
    controller: RateController,
    mut trajectory: revsim::trajectory::Trajectory,
    clip: decode::Clip,
) -> Result<()> {
    use revsim::audio::output;

    // The device opens before the first tick, so a device failure aborts the run
    let stats = controller
        .run_with_output(&mut trajectory, |shared| {
            output::start(clip.samples, clip.sample_rate, shared.clone())
        })
        .context("Failed to start audio output")?;
    log::info!("Played {} ticks, final RPM {}", stats.ticks, stats.last_rpm);
    Ok(())
}

#[cfg(not(feature = "playback"))]
fn play_live(
    _controller: RateController,
    _trajectory: revsim::trajectory::Trajectory,
    _clip: decode::Clip,
) -> Result<()> {
    anyhow::bail!(
        "Live playback requires the 'playback' feature. \
         Rebuild with: cargo build --features playback, or pass --render out.wav"
    );
}
