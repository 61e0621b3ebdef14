//! Engine sound simulation.
//!
//! A looped idle-engine recording is resampled on the fly so that it sounds
//! like the engine following a programmable RPM [`trajectory`]. The
//! recording's own idle speed is estimated once from its spectrum
//! ([`audio::spectrum`]) and used as the baseline for the playback ratio that
//! the [`controller`] publishes every tick.

pub mod audio;
pub mod chart;
pub mod config;
pub mod controller;
pub mod error;
pub mod trajectory;

pub use error::{Error, Result};

/// Engine speed in revolutions per minute.
pub type Rpm = i64;
