use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::trajectory::{GaussianNoise, Leg, Trajectory};
use crate::Rpm;

/// Longest accepted controller tick.
pub const MAX_TICK_MS: u64 = 60_000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub source_file: Option<PathBuf>,
    #[serde(default = "default_analysis_max_rpm", rename = "analysisMaxRPM")]
    pub analysis_max_rpm: Rpm,
    /// Skips estimation when set
    #[serde(default, rename = "baselineRPM")]
    pub baseline_rpm: Option<Rpm>,
    #[serde(default = "default_trajectory")]
    pub trajectory: Vec<Leg>,
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    #[serde(default = "default_ema_alpha")]
    pub ema_alpha: f64,
    #[serde(default, rename = "jitterStdDev")]
    pub jitter_std_dev: f64,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_chart_path")]
    pub chart_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_file: None,
            analysis_max_rpm: default_analysis_max_rpm(),
            baseline_rpm: None,
            trajectory: default_trajectory(),
            tick_ms: default_tick_ms(),
            ema_alpha: default_ema_alpha(),
            jitter_std_dev: 0.0,
            seed: None,
            chart_path: default_chart_path(),
        }
    }
}

fn default_analysis_max_rpm() -> Rpm { 8000 }
fn default_tick_ms() -> u64 { 5 }
fn default_ema_alpha() -> f64 { 0.01 }
fn default_chart_path() -> PathBuf { "points.png".into() }

/// Idle, rev up, hold, rev down, idle.
fn default_trajectory() -> Vec<Leg> {
    vec![
        Leg::new(1300, 6500, 1000),
        Leg::new(6500, 6500, 500),
        Leg::new(6500, 1300, 1000),
        Leg::new(1300, 1300, 500),
    ]
}

impl Config {
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.analysis_max_rpm <= 0 {
            return Err(Error::Config(format!(
                "analysisMaxRPM must be positive, got {}",
                self.analysis_max_rpm
            )));
        }
        if let Some(baseline) = self.baseline_rpm {
            if baseline <= 0 {
                return Err(Error::InvalidBaseline(baseline));
            }
        }
        if self.trajectory.is_empty() {
            return Err(Error::Config("trajectory has no legs".into()));
        }
        if let Some(leg) = self
            .trajectory
            .iter()
            .find(|leg| leg.start_rpm < 0 || leg.end_rpm < 0)
        {
            return Err(Error::Config(format!("negative RPM in leg {:?}", leg)));
        }
        if !(self.ema_alpha > 0.0 && self.ema_alpha <= 1.0) {
            return Err(Error::Config(format!(
                "emaAlpha must be in (0, 1], got {}",
                self.ema_alpha
            )));
        }
        if self.tick_ms > MAX_TICK_MS {
            return Err(Error::Config(format!(
                "tickMs must be at most {}, got {}",
                MAX_TICK_MS, self.tick_ms
            )));
        }
        if !(self.jitter_std_dev >= 0.0 && self.jitter_std_dev.is_finite()) {
            return Err(Error::Config(format!(
                "jitterStdDev must be a finite non-negative number, got {}",
                self.jitter_std_dev
            )));
        }
        Ok(())
    }

    /// `Ema(Jitter(Sequence(legs)))`, with seeded noise when a seed is configured.
    pub fn build_trajectory(&self) -> Result<Trajectory> {
        let noise = match self.seed {
            Some(seed) => GaussianNoise::seeded(seed),
            None => GaussianNoise::from_entropy(),
        };
        Trajectory::from_legs(&self.trajectory)
            .jittered(self.jitter_std_dev, noise)
            .smoothed(self.ema_alpha)
    }
}

fn from_toml(content: &str) -> Result<Config> {
    toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
}

/// Parses and validates a complete config.
pub fn parse_config(content: &str) -> Result<Config> {
    let config = from_toml(content)?;
    config.validate()?;
    Ok(config)
}

/// Reads a config file without validating it.
///
/// Command-line overrides are merged afterwards, so the caller validates the result.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    from_toml(&content)
}

/// `revsim.toml` in the working directory, then the user config directories.
pub fn find_config() -> Option<PathBuf> {
    let local = PathBuf::from("revsim.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("revsim").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    dirs::config_dir()
        .map(|dir| dir.join("revsim").join("config.toml"))
        .filter(|path| path.exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.analysis_max_rpm, 8000);
        assert_eq!(config.baseline_rpm, None);
        assert_eq!(config.trajectory.len(), 4);
        assert_eq!(config.tick_period(), Duration::from_millis(5));
        assert_eq!(config.chart_path, PathBuf::from("points.png"));
    }

    #[test]
    fn reads_camel_case_fields() {
        let config = parse_config(
            r#"
            sourceFile = "data/cheetah/ENGINE_IDLE.wav"
            analysisMaxRPM = 9000
            baselineRPM = 8000
            tickMs = 10
            emaAlpha = 0.5
            jitterStdDev = 20.0
            seed = 3

            [[trajectory]]
            startRPM = 1300
            endRPM = 6500
            steps = 2

            [[trajectory]]
            startRPM = 6500
            endRPM = 6500
            steps = 1
            "#,
        )
        .unwrap();

        assert_eq!(
            config.source_file,
            Some(PathBuf::from("data/cheetah/ENGINE_IDLE.wav"))
        );
        assert_eq!(config.analysis_max_rpm, 9000);
        assert_eq!(config.baseline_rpm, Some(8000));
        assert_eq!(
            config.trajectory,
            vec![Leg::new(1300, 6500, 2), Leg::new(6500, 6500, 1)]
        );
        assert_eq!(config.tick_ms, 10);
        assert_eq!(config.seed, Some(3));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            parse_config("baselineRPM = 0"),
            Err(Error::InvalidBaseline(0))
        ));
        assert!(matches!(parse_config("emaAlpha = 0.0"), Err(Error::Config(_))));
        assert!(matches!(parse_config("analysisMaxRPM = -5"), Err(Error::Config(_))));
        assert!(matches!(parse_config("jitterStdDev = -1.0"), Err(Error::Config(_))));
        assert!(matches!(parse_config("trajectory = []"), Err(Error::Config(_))));
        assert!(matches!(parse_config("tickMs = \"fast\""), Err(Error::Config(_))));
        assert!(matches!(parse_config("tickMs = 3600000"), Err(Error::Config(_))));
        assert!(parse_config("tickMs = 60000").is_ok());
    }

    #[test]
    fn unity_alpha_without_jitter_replays_the_legs() {
        let mut config = Config::default();
        config.ema_alpha = 1.0;
        config.trajectory = vec![Leg::new(1300, 6500, 2), Leg::new(6500, 6500, 1)];

        let mut trajectory = config.build_trajectory().unwrap();
        let mut values = Vec::new();
        while !trajectory.is_done() {
            values.push(trajectory.step());
        }
        assert_eq!(values, vec![1300, 3900, 6500]);
    }

    #[test]
    fn accepted_huge_jitter_keeps_stepping() {
        let config = parse_config("jitterStdDev = 1e30\nseed = 1\nemaAlpha = 1.0").unwrap();
        let mut trajectory = config.build_trajectory().unwrap();
        for _ in 0..20 {
            assert!(trajectory.step() >= 0);
        }
    }

    #[test]
    fn file_values_can_be_fixed_by_overrides() {
        let path = std::env::temp_dir().join(format!("revsim-config-{}.toml", std::process::id()));
        std::fs::write(&path, "baselineRPM = 0\ntickMs = 10").unwrap();

        let mut config = load_config(&path).unwrap();
        assert_eq!(config.tick_ms, 10);
        assert!(matches!(config.validate(), Err(Error::InvalidBaseline(0))));

        config.baseline_rpm = Some(8000);
        assert!(config.validate().is_ok());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_config(Path::new("/nonexistent/revsim.toml")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
