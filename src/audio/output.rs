//! Live playback through the default output device.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use super::player::LoopPlayer;
use crate::controller::SharedRate;
use crate::error::{Error, Result};

/// An open output stream. Dropping it stops playback.
pub struct LiveOutput {
    _stream: cpal::Stream,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Opens the default output device and starts looping `samples` at the shared rate.
pub fn start(samples: Vec<f32>, source_rate: u32, shared: SharedRate) -> Result<LiveOutput> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| Error::AudioDevice("no output device found".into()))?;

    let config = device
        .default_output_config()
        .map_err(|e| Error::AudioDevice(format!("failed to get output config: {}", e)))?;

    if config.sample_format() != cpal::SampleFormat::F32 {
        return Err(Error::AudioDevice(format!(
            "unsupported sample format {:?}",
            config.sample_format()
        )));
    }

    let sample_rate = config.sample_rate().0;
    let channels = config.channels();
    log::info!(
        "Audio: {} @ {}Hz, {} channels",
        device.name().unwrap_or_else(|_| "Unknown".to_string()),
        sample_rate,
        channels
    );

    let mut player = LoopPlayer::new(samples, source_rate, sample_rate, shared);
    let stream = device
        .build_output_stream(
            &config.into(),
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                player.render_channels(data, channels as usize);
            },
            |err| log::error!("Audio stream error: {}", err),
            None,
        )
        .map_err(|e| Error::AudioDevice(format!("failed to build output stream: {}", e)))?;

    stream
        .play()
        .map_err(|e| Error::AudioDevice(format!("failed to start output stream: {}", e)))?;

    Ok(LiveOutput {
        _stream: stream,
        sample_rate,
        channels,
    })
}
