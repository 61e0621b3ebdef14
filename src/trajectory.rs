//! RPM trajectories: small step generators that compose by wrapping.
//!
//! Every node owns its cursor. Stepping advances the cursor and returns the
//! target RPM for one controller tick; once a node reports done it stays done.
//! The usual shape is `Ema(Jitter(Sequence([Interpolate, ...])))`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::Deserialize;
use std::fmt;

use crate::error::{Error, Result};
use crate::Rpm;

/// Source of zero-mean, unit-variance noise for [`Jitter`].
pub trait NoiseSource: Send {
    fn sample(&mut self) -> f64;
}

/// Standard normal noise drawn from any `rand` generator.
pub struct GaussianNoise<R = StdRng> {
    rng: R,
}

impl GaussianNoise<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl<R: Rng + Send> GaussianNoise<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng + Send> NoiseSource for GaussianNoise<R> {
    fn sample(&mut self) -> f64 {
        self.rng.sample(StandardNormal)
    }
}

/// One linear leg of a plan, as written in the config file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct Leg {
    #[serde(rename = "startRPM")]
    pub start_rpm: Rpm,
    #[serde(rename = "endRPM")]
    pub end_rpm: Rpm,
    pub steps: u32,
}

impl Leg {
    pub const fn new(start_rpm: Rpm, end_rpm: Rpm, steps: u32) -> Self {
        Self {
            start_rpm,
            end_rpm,
            steps,
        }
    }
}

/// Linear ramp from `start` towards `end` over `steps` ticks.
///
/// The per-tick increment is computed in integer arithmetic, so a ramp whose
/// span does not divide evenly stops short of `end`. The coarse ramp is kept
/// deliberately.
#[derive(Clone, Debug)]
pub struct Interpolate {
    start: Rpm,
    step_size: Rpm,
    steps: u32,
    current: u32,
}

impl Interpolate {
    pub fn new(start: Rpm, end: Rpm, steps: u32) -> Self {
        let step_size = (end - start).checked_div(steps as Rpm).unwrap_or(0);
        Self {
            start,
            step_size,
            steps,
            current: 0,
        }
    }

    fn step(&mut self) -> Rpm {
        let rpm = self.start + self.step_size * self.current as Rpm;
        self.current = self.current.saturating_add(1);
        rpm
    }

    fn is_done(&self) -> bool {
        self.current >= self.steps
    }
}

/// Runs children one after another.
#[derive(Debug)]
pub struct Sequence {
    children: Vec<Trajectory>,
    current: usize,
    last: Rpm,
}

impl Sequence {
    pub fn new(children: Vec<Trajectory>) -> Self {
        Self {
            children,
            current: 0,
            last: 0,
        }
    }

    fn step(&mut self) -> Rpm {
        while self
            .children
            .get(self.current)
            .is_some_and(Trajectory::is_done)
        {
            self.current += 1;
        }

        // Exhausted: hold the last value.
        let Some(child) = self.children.get_mut(self.current) else {
            return self.last;
        };

        // The tick that finishes a child still reports that child's value.
        self.last = child.step();
        if child.is_done() {
            self.current += 1;
        }
        self.last
    }

    fn is_done(&self) -> bool {
        self.children[self.current.min(self.children.len())..]
            .iter()
            .all(Trajectory::is_done)
    }
}

/// Exponential moving average over the inner trajectory, starting cold at 0.
#[derive(Debug)]
pub struct Ema {
    inner: Box<Trajectory>,
    alpha: f64,
    previous: f64,
}

impl Ema {
    pub fn new(inner: Trajectory, alpha: f64) -> Result<Self> {
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(Error::Config(format!(
                "EMA alpha must be in (0, 1], got {}",
                alpha
            )));
        }
        Ok(Self {
            inner: Box::new(inner),
            alpha,
            previous: 0.0,
        })
    }

    fn step(&mut self) -> Rpm {
        let rpm = self.inner.step() as f64;
        self.previous = self.alpha * rpm + (1.0 - self.alpha) * self.previous;
        self.previous as Rpm
    }
}

/// Adds Gaussian noise with the given standard deviation to the inner trajectory.
pub struct Jitter {
    inner: Box<Trajectory>,
    std_dev: f64,
    noise: Box<dyn NoiseSource>,
}

impl Jitter {
    pub fn new(inner: Trajectory, std_dev: f64, noise: impl NoiseSource + 'static) -> Self {
        Self {
            inner: Box::new(inner),
            std_dev,
            noise: Box::new(noise),
        }
    }

    fn step(&mut self) -> Rpm {
        let rpm = self.inner.step();
        // Float-to-int casts saturate, so a huge draw pins the offset at the i64 range.
        let offset = (self.noise.sample() * self.std_dev) as Rpm;
        rpm.saturating_add(offset).max(0)
    }
}

impl fmt::Debug for Jitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Jitter")
            .field("inner", &self.inner)
            .field("std_dev", &self.std_dev)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub enum Trajectory {
    Interpolate(Interpolate),
    Sequence(Sequence),
    Ema(Ema),
    Jitter(Jitter),
}

impl Trajectory {
    pub fn interpolate(start: Rpm, end: Rpm, steps: u32) -> Self {
        Trajectory::Interpolate(Interpolate::new(start, end, steps))
    }

    pub fn sequence(children: Vec<Trajectory>) -> Self {
        Trajectory::Sequence(Sequence::new(children))
    }

    /// A sequence of linear legs.
    pub fn from_legs(legs: &[Leg]) -> Self {
        Trajectory::sequence(
            legs.iter()
                .map(|leg| Trajectory::interpolate(leg.start_rpm, leg.end_rpm, leg.steps))
                .collect(),
        )
    }

    pub fn smoothed(self, alpha: f64) -> Result<Self> {
        Ok(Trajectory::Ema(Ema::new(self, alpha)?))
    }

    pub fn jittered(self, std_dev: f64, noise: impl NoiseSource + 'static) -> Self {
        Trajectory::Jitter(Jitter::new(self, std_dev, noise))
    }

    /// Target RPM for the next tick.
    pub fn step(&mut self) -> Rpm {
        match self {
            Trajectory::Interpolate(node) => node.step(),
            Trajectory::Sequence(node) => node.step(),
            Trajectory::Ema(node) => node.step(),
            Trajectory::Jitter(node) => node.step(),
        }
    }

    pub fn is_done(&self) -> bool {
        match self {
            Trajectory::Interpolate(node) => node.is_done(),
            Trajectory::Sequence(node) => node.is_done(),
            Trajectory::Ema(node) => node.inner.is_done(),
            Trajectory::Jitter(node) => node.inner.is_done(),
        }
    }
}
