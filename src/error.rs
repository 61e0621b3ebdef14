use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode audio: {0}")]
    Decode(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The ratio denominator; zero or negative baselines make every ratio meaningless.
    #[error("Baseline RPM must be positive, got {0}")]
    InvalidBaseline(i64),

    #[error("Failed to spawn controller thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Failed to write WAV: {0}")]
    Wav(#[from] hound::Error),

    #[error("Audio output device error: {0}")]
    AudioDevice(String),

    #[error("Failed to write chart: {0}")]
    Chart(String),
}

impl From<symphonia::core::errors::Error> for Error {
    fn from(err: symphonia::core::errors::Error) -> Self {
        Error::Decode(err.to_string())
    }
}
