//! Peak RPM estimation from a coherently averaged spectrum.
//!
//! The recording is cut into consecutive one-second windows (or a single
//! shorter window when the clip is under a second). Each window is
//! transformed and the complex bins are summed across windows before any
//! magnitude is taken, so a stationary engine tone reinforces itself while
//! uncorrelated noise partially cancels. With one-second windows every bin
//! is exactly 1 Hz wide, i.e. 60 RPM.

use rayon::prelude::*;
use rustfft::{num_complex::Complex, FftPlanner};
use serde::Serialize;
use std::path::Path;

use super::decode::decode_clip;
use crate::error::Result;
use crate::Rpm;

/// Magnitudes below this are treated as zero and get a zero phase.
pub const ZERO_MAGNITUDE_EPSILON: f64 = 1e-9;

/// One scanned bin of the accumulated spectrum.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SpectrumPoint {
    pub rpm: f64,
    pub magnitude: f64,
    /// Degrees in (-180, 180]
    pub phase_deg: f64,
}

#[derive(Clone, Debug, Default)]
pub struct SpectrumAnalysis {
    pub peak_rpm: Rpm,
    pub window_size: usize,
    /// Whole windows folded into the accumulator
    pub windows: usize,
    /// Bins 1.. up to the RPM ceiling, in bin order
    pub points: Vec<SpectrumPoint>,
}

pub fn window_size(total_samples: usize, sample_rate: u32) -> usize {
    total_samples.min(sample_rate as usize)
}

/// Sums the FFT of every whole `window`-sized chunk bin-wise.
///
/// Returns an empty spectrum for a zero window. A trailing partial chunk is ignored.
pub fn accumulate_spectrum(samples: &[f32], window: usize) -> Vec<Complex<f64>> {
    if window == 0 {
        return Vec::new();
    }

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(window);

    samples
        .par_chunks_exact(window)
        .map(|chunk| {
            let mut buffer: Vec<Complex<f64>> = chunk
                .iter()
                .map(|&s| Complex::new(s as f64, 0.0))
                .collect();
            fft.process(&mut buffer);
            buffer
        })
        .reduce(
            || vec![Complex::new(0.0, 0.0); window],
            |mut acc, buffer| {
                for (a, b) in acc.iter_mut().zip(buffer) {
                    *a += b;
                }
                acc
            },
        )
}

pub fn analyze(samples: &[f32], sample_rate: u32, max_rpm: Rpm) -> SpectrumAnalysis {
    let window = window_size(samples.len(), sample_rate);
    if window == 0 {
        log::debug!("No samples to analyze, peak RPM is 0");
        return SpectrumAnalysis::default();
    }

    let spectrum = accumulate_spectrum(samples, window);
    let windows = samples.len() / window;
    let bin_hz = sample_rate as f64 / window as f64;

    // Real input: the upper half mirrors the lower half.
    let half = &spectrum[..spectrum.len() / 2];

    let mut points = Vec::new();
    let mut peak_rpm = 0.0f64;
    let mut peak_magnitude = 0.0f64;

    // Bin 0 is the DC offset.
    for (i, bin) in half.iter().enumerate().skip(1) {
        let rpm = i as f64 * bin_hz * 60.0;
        if rpm > max_rpm as f64 {
            break;
        }

        let (magnitude, phase) = bin.to_polar();
        let phase_deg = if magnitude < ZERO_MAGNITUDE_EPSILON {
            0.0
        } else {
            phase.to_degrees()
        };

        if magnitude > peak_magnitude {
            peak_magnitude = magnitude;
            peak_rpm = rpm;
        }

        points.push(SpectrumPoint {
            rpm,
            magnitude,
            phase_deg,
        });
    }

    log::debug!(
        "Spectrum: window={} windows={} bins scanned={} peak={:.1} RPM (|X|={:.3})",
        window,
        windows,
        points.len(),
        peak_rpm,
        peak_magnitude
    );

    SpectrumAnalysis {
        peak_rpm: peak_rpm as Rpm,
        window_size: window,
        windows,
        points,
    }
}

pub fn estimate_rpm(samples: &[f32], sample_rate: u32, max_rpm: Rpm) -> Rpm {
    analyze(samples, sample_rate, max_rpm).peak_rpm
}

pub fn analyze_file(path: &Path, max_rpm: Rpm) -> Result<SpectrumAnalysis> {
    let clip = decode_clip(path)?;
    let analysis = analyze(&clip.samples, clip.sample_rate, max_rpm);
    log::info!(
        "{}: peak RPM {} ({} windows of {} samples)",
        path.display(),
        analysis.peak_rpm,
        analysis.windows,
        analysis.window_size
    );
    Ok(analysis)
}
