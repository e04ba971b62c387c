//! Outcome and delay sampling for simulated cores.
//!
//! The [`OutcomeSampler`] trait decouples workers from the random source.
//! Production workers use [`SeededSampler`], which is reproducible for a given
//! seed; tests may script exact outcome sequences instead.

use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::core::types::{CoreId, MAX_MAGNITUDE, MIN_MAGNITUDE, TaskOutcome};
use crate::error::ConfigError;

/// Validated fault probability and inter-task delay bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaultModel {
    fault_probability: f64,
    delay_min: Duration,
    delay_max: Duration,
}

impl FaultModel {
    /// Build a model from a probability in `[0, 1]` and `[min, max]` seconds
    /// with `0 < min <= max`.
    pub fn new(fault_probability: f64, delay_range_secs: [f64; 2]) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&fault_probability) {
            return Err(ConfigError::FaultProbability(fault_probability));
        }
        let [min, max] = delay_range_secs;
        let invalid = || ConfigError::DelayRange { min, max };
        if min.is_nan() || min <= 0.0 || min > max {
            return Err(invalid());
        }
        Ok(Self {
            fault_probability,
            delay_min: Duration::try_from_secs_f64(min).map_err(|_| invalid())?,
            delay_max: Duration::try_from_secs_f64(max).map_err(|_| invalid())?,
        })
    }

    pub fn fault_probability(&self) -> f64 {
        self.fault_probability
    }

    pub fn delay_range(&self) -> (Duration, Duration) {
        (self.delay_min, self.delay_max)
    }
}

/// Source of task outcomes and inter-task delays for one core.
pub trait OutcomeSampler: Send {
    /// Draw the outcome of the next task.
    fn sample_outcome(&mut self) -> TaskOutcome;
    /// Draw the pause before the next task.
    fn sample_delay(&mut self) -> Duration;
}

/// Reproducible sampler backed by a ChaCha8 stream.
#[derive(Debug, Clone)]
pub struct SeededSampler {
    model: FaultModel,
    rng: ChaCha8Rng,
}

impl SeededSampler {
    pub fn new(model: FaultModel, seed: u64) -> Self {
        Self {
            model,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Sampler for `core` derived from the run seed, so every core draws an
    /// independent but reproducible stream.
    pub fn for_core(model: FaultModel, run_seed: u64, core: CoreId) -> Self {
        Self::new(model, run_seed.wrapping_add(u64::from(core.0)))
    }
}

impl OutcomeSampler for SeededSampler {
    fn sample_outcome(&mut self) -> TaskOutcome {
        if self.rng.gen_bool(self.model.fault_probability) {
            TaskOutcome::Fault
        } else {
            TaskOutcome::Success(self.rng.gen_range(MIN_MAGNITUDE..=MAX_MAGNITUDE))
        }
    }

    fn sample_delay(&mut self) -> Duration {
        let (min, max) = self.model.delay_range();
        if min == max {
            return min;
        }
        Duration::from_secs_f64(self.rng.gen_range(min.as_secs_f64()..=max.as_secs_f64()))
    }
}
