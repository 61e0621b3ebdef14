use crate::controller::{RateState, SharedRate};

/// Plays a clip in an endless loop at the shared playback rate.
///
/// The rate is read once per rendered buffer; within a buffer the player
/// steps through the clip by `ratio * source_rate / output_rate` samples per
/// output frame, interpolating linearly between neighbours.
pub struct LoopPlayer {
    samples: Vec<f32>,
    /// Converts clip samples to output frames when the device rate differs
    rate_scale: f64,
    position: f64,
    shared: SharedRate,
}

impl LoopPlayer {
    pub fn new(samples: Vec<f32>, source_rate: u32, output_rate: u32, shared: SharedRate) -> Self {
        let rate_scale = if source_rate == 0 || output_rate == 0 {
            1.0
        } else {
            source_rate as f64 / output_rate as f64
        };
        Self {
            samples,
            rate_scale,
            position: 0.0,
            shared,
        }
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    /// Fills `out` with mono frames at the current shared rate.
    pub fn render(&mut self, out: &mut [f32]) {
        let rate = self.shared.snapshot();
        self.render_interleaved(rate, out, 1);
    }

    /// Fills interleaved `out`, writing each frame to every channel.
    pub fn render_channels(&mut self, out: &mut [f32], channels: usize) {
        let rate = self.shared.snapshot();
        self.render_interleaved(rate, out, channels);
    }

    fn render_interleaved(&mut self, rate: RateState, out: &mut [f32], channels: usize) {
        if self.samples.is_empty() {
            out.fill(0.0);
            return;
        }

        let step = rate.ratio * self.rate_scale;
        let amplitude = rate.amplitude();
        for frame in out.chunks_mut(channels.max(1)) {
            let sample = self.next_sample(step) * amplitude;
            frame.fill(sample);
        }
    }

    fn next_sample(&mut self, step: f64) -> f32 {
        let len = self.samples.len();
        let index = self.position as usize;
        let frac = (self.position - index as f64) as f32;
        let a = self.samples[index];
        let b = self.samples[(index + 1) % len];

        self.position += step;
        if self.position >= len as f64 {
            self.position %= len as f64;
        }

        a + (b - a) * frac
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(samples: Vec<f32>, rate: RateState) -> LoopPlayer {
        LoopPlayer::new(samples, 100, 100, SharedRate::new(rate))
    }

    #[test]
    fn unity_rate_loops_the_clip() {
        let mut p = player(vec![0.1, 0.2, 0.3], RateState::UNITY);
        let mut out = [0.0; 7];
        p.render(&mut out);
        assert_eq!(out, [0.1, 0.2, 0.3, 0.1, 0.2, 0.3, 0.1]);
    }

    #[test]
    fn double_rate_skips_samples() {
        let rate = RateState {
            ratio: 2.0,
            gain: 0.0,
        };
        let mut p = player(vec![0.0, 0.1, 0.2, 0.3, 0.4], rate);
        let mut out = [0.0; 5];
        p.render(&mut out);
        assert_eq!(out, [0.0, 0.2, 0.4, 0.1, 0.3]);
    }

    #[test]
    fn half_rate_interpolates() {
        let rate = RateState {
            ratio: 0.5,
            gain: 0.0,
        };
        let mut p = player(vec![0.0, 1.0], rate);
        let mut out = [0.0; 5];
        p.render(&mut out);
        assert_eq!(out, [0.0, 0.5, 1.0, 0.5, 0.0]);
    }

    #[test]
    fn gain_scales_amplitude() {
        let mut p = player(vec![0.8], RateState::for_rpm(4000, 8000));
        let mut out = [0.0; 2];
        p.render(&mut out);
        assert_eq!(out, [0.4, 0.4]);
    }

    #[test]
    fn picks_up_rate_changes_between_buffers() {
        let shared = SharedRate::default();
        let mut p = LoopPlayer::new(vec![0.0, 0.1, 0.2, 0.3], 100, 100, shared.clone());
        let mut out = [0.0; 2];
        p.render(&mut out);
        assert_eq!(p.position(), 2.0);

        shared.set(RateState {
            ratio: 0.25,
            gain: 0.0,
        });
        p.render(&mut out);
        assert_eq!(p.position(), 2.5);
    }

    #[test]
    fn device_rate_is_compensated() {
        // A 100 Hz clip on a 200 Hz device advances half a sample per frame
        let mut p = LoopPlayer::new(vec![0.0, 1.0], 100, 200, SharedRate::default());
        let mut out = [0.0; 4];
        p.render_channels(&mut out, 2);
        assert_eq!(out, [0.0, 0.0, 0.5, 0.5]);
    }

    #[test]
    fn empty_clip_renders_silence() {
        let mut p = player(Vec::new(), RateState::UNITY);
        let mut out = [1.0; 4];
        p.render(&mut out);
        assert_eq!(out, [0.0; 4]);
    }
}
