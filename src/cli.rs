use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "revsim", about = "Engine sound simulator: revs a looped idle recording along an RPM plan")]
pub struct Cli {
    /// Idle engine recording (WAV, MP3, FLAC, OGG)
    pub input: Option<PathBuf>,

    /// Config file (defaults to revsim.toml or ~/.config/revsim/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Highest RPM considered when estimating the recording's idle speed
    #[arg(long)]
    pub max_rpm: Option<i64>,

    /// Idle RPM of the recording; estimated from its spectrum when omitted
    #[arg(short, long)]
    pub baseline: Option<i64>,

    /// Controller tick period in milliseconds
    #[arg(long)]
    pub tick_ms: Option<u64>,

    /// Standard deviation of the RPM jitter
    #[arg(long)]
    pub jitter: Option<f64>,

    /// Seed for the jitter noise
    #[arg(long)]
    pub seed: Option<u64>,

    /// Spectrum chart output (PNG)
    #[arg(long)]
    pub chart: Option<PathBuf>,

    /// Also dump the spectrum points as JSON
    #[arg(long)]
    pub points_json: Option<PathBuf>,

    /// Only estimate the idle RPM and write the chart
    #[arg(long)]
    pub analyze_only: bool,

    /// Render the simulation to a WAV file instead of playing it
    #[arg(short, long)]
    pub render: Option<PathBuf>,
}
