//! Drives a trajectory at a fixed tick rate and publishes the playback rate.
//!
//! The controller is the only writer of the shared `(ratio, gain)` pair; the
//! render path is the only reader. Both sides go through [`SharedRate`], which
//! copies the whole pair under one lock so a reader never sees a new ratio with
//! an old gain.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::trajectory::Trajectory;
use crate::Rpm;

/// Floor applied to the playback ratio; a resampler cannot play at rate zero.
pub const MIN_RATIO: f64 = 1e-3;

pub const DEFAULT_TICK: Duration = Duration::from_millis(5);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RateState {
    /// Playback speed relative to the recording
    pub ratio: f64,
    /// Added to unity amplitude by the render path: output = sample * (1 + gain)
    pub gain: f64,
}

impl RateState {
    pub const UNITY: RateState = RateState {
        ratio: 1.0,
        gain: 0.0,
    };

    /// Rate for playing a recording of `baseline` RPM at `rpm`.
    ///
    /// Gain is `ratio - 1`, a rough linear loudness compensation: faster
    /// playback is louder, slower playback quieter. It is not an acoustic model.
    pub fn for_rpm(rpm: Rpm, baseline: Rpm) -> Self {
        let ratio = (rpm as f64 / baseline as f64).max(MIN_RATIO);
        RateState {
            ratio,
            gain: ratio - 1.0,
        }
    }

    pub fn amplitude(&self) -> f32 {
        (1.0 + self.gain) as f32
    }
}

impl Default for RateState {
    fn default() -> Self {
        Self::UNITY
    }
}

/// The `(ratio, gain)` pair shared between the controller and the render path.
#[derive(Clone, Debug, Default)]
pub struct SharedRate(Arc<Mutex<RateState>>);

impl SharedRate {
    pub fn new(initial: RateState) -> Self {
        Self(Arc::new(Mutex::new(initial)))
    }

    pub fn set(&self, state: RateState) {
        *self.lock() = state;
    }

    pub fn snapshot(&self) -> RateState {
        *self.lock()
    }

    // The guarded value is plain Copy data written in one assignment, so a
    // poisoned lock still holds a consistent pair.
    fn lock(&self) -> MutexGuard<'_, RateState> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Ends a running controller loop before its trajectory is exhausted.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunStats {
    pub ticks: u64,
    pub last_rpm: Rpm,
    pub last_rate: Option<RateState>,
    pub elapsed: Duration,
}

pub struct RateController {
    baseline: Rpm,
    tick_period: Duration,
    shared: SharedRate,
    stop: StopHandle,
}

impl RateController {
    pub fn new(baseline: Rpm, tick_period: Duration, shared: SharedRate) -> Result<Self> {
        if baseline <= 0 {
            return Err(Error::InvalidBaseline(baseline));
        }
        Ok(Self {
            baseline,
            tick_period,
            shared,
            stop: StopHandle::default(),
        })
    }

    pub fn baseline(&self) -> Rpm {
        self.baseline
    }

    pub fn tick_period(&self) -> Duration {
        self.tick_period
    }

    pub fn shared(&self) -> &SharedRate {
        &self.shared
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Computes the rate for `rpm` and publishes it.
    pub fn apply(&self, rpm: Rpm) -> RateState {
        let rate = RateState::for_rpm(rpm, self.baseline);
        self.shared.set(rate);
        rate
    }

    /// Advances the trajectory by one tick without waiting.
    ///
    /// Returns `None` once the trajectory is done or a stop was requested.
    pub fn tick(&self, trajectory: &mut Trajectory) -> Option<(Rpm, RateState)> {
        if trajectory.is_done() || self.stop.is_stopped() {
            return None;
        }
        let rpm = trajectory.step();
        let rate = self.apply(rpm);
        log::debug!(
            "rpm={} ratio={:.4} gain={:.4}",
            rpm,
            rate.ratio,
            rate.gain
        );
        Some((rpm, rate))
    }

    /// Ticks until the trajectory is done, sleeping to each tick boundary.
    ///
    /// Boundaries are measured from the start of the run, so a late wake-up
    /// shortens the next sleep instead of shifting every later tick.
    pub fn run(&self, trajectory: &mut Trajectory) -> RunStats {
        let start = Instant::now();
        let mut deadline = start;
        let mut stats = RunStats::default();

        while let Some((rpm, rate)) = self.tick(trajectory) {
            stats.ticks += 1;
            stats.last_rpm = rpm;
            stats.last_rate = Some(rate);

            deadline += self.tick_period;
            let now = Instant::now();
            if deadline > now {
                thread::sleep(deadline - now);
            }
        }

        stats.elapsed = start.elapsed();
        if self.stop.is_stopped() {
            log::info!("Controller stopped after {} ticks", stats.ticks);
        } else {
            log::info!(
                "Trajectory complete: {} ticks in {:.2}s",
                stats.ticks,
                stats.elapsed.as_secs_f64()
            );
        }
        stats
    }

    /// Starts the render path, then ticks on the calling thread until done.
    ///
    /// No tick is taken if `start_output` fails. The output handle is held
    /// until the run ends.
    pub fn run_with_output<O>(
        &self,
        trajectory: &mut Trajectory,
        start_output: impl FnOnce(&SharedRate) -> Result<O>,
    ) -> Result<RunStats> {
        let _output = start_output(&self.shared)?;
        Ok(self.run(trajectory))
    }

    /// Runs the controller on its own thread.
    pub fn spawn(self, mut trajectory: Trajectory) -> Result<thread::JoinHandle<RunStats>> {
        thread::Builder::new()
            .name("rate-controller".into())
            .spawn(move || self.run(&mut trajectory))
            .map_err(Error::Spawn)
    }
}
