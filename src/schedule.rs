//! Per-step learning-rate schedule shapes and the driver that applies them.
//!
//! Schedules run at a finer granularity than the plateau controller: the
//! training loop applies them once per optimizer step rather than once per
//! evaluation round. Shapes are pure functions of the step index, so a run
//! can be restarted from a checkpoint by recomputing from a stored step.
//!
//! # Example
//!
//! ```
//! use anneal_tools::{ExpAnneal, OptimizerHandle, ParamGroups, ScheduleDriver};
//!
//! let mut optimizer = ParamGroups::single(1.0);
//! let shape = ExpAnneal::new(0.01, 100).unwrap();
//! let mut driver = ScheduleDriver::attach(shape, &optimizer);
//!
//! for _ in 0..100 {
//!     driver.step(&mut optimizer);
//!     // ... optimizer step ...
//! }
//! assert!(optimizer.param_groups()[0].learning_rate < 0.011);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::optim::OptimizerHandle;

/// A learning-rate shape: a pure function of the step index and the group's
/// base rate.
pub trait Schedule {
    /// Learning rate at `step` for a group whose rate was `base_lr` when the
    /// schedule was attached.
    fn lr_at(&self, step: u64, base_lr: f64) -> f64;

    /// Number of steps the schedule is configured for.
    fn total_steps(&self) -> u64;
}

/// Exponential anneal from each group's base rate down to `end_lr`.
///
/// `lr(s) = base_lr * (end_lr / base_lr)^(s / total_steps)`, so the rate
/// moves along a geometric path reaching `end_lr` exactly at `total_steps`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExpAnneal {
    end_lr: f64,
    total_steps: u64,
}

impl ExpAnneal {
    /// Create an exponential anneal towards `end_lr` over `total_steps`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `end_lr` is not positive and finite or
    /// `total_steps` is zero.
    pub fn new(end_lr: f64, total_steps: u64) -> Result<Self, ConfigError> {
        if !(end_lr > 0.0 && end_lr.is_finite()) {
            return Err(ConfigError::InvalidRate {
                name: "end_lr",
                value: end_lr,
            });
        }
        if total_steps == 0 {
            return Err(ConfigError::ZeroSteps {
                name: "total_steps",
            });
        }
        Ok(Self {
            end_lr,
            total_steps,
        })
    }
}

impl Schedule for ExpAnneal {
    fn lr_at(&self, step: u64, base_lr: f64) -> f64 {
        let pct = step as f64 / self.total_steps as f64;
        base_lr * (self.end_lr / base_lr).powf(pct)
    }

    fn total_steps(&self) -> u64 {
        self.total_steps
    }
}

/// Linear warmup from 0 to each group's base rate, then linear decay to 0.
///
/// Multiplier: `s / max(1, warmup)` during warmup, then
/// `max(0, (total - s) / max(1, total - warmup))`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LinearWarmupDecay {
    total_steps: u64,
    warmup_steps: u64,
}

impl LinearWarmupDecay {
    /// Create a warmup-then-decay shape.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `total_steps` is zero or the warmup is
    /// longer than the whole schedule.
    pub fn new(total_steps: u64, warmup_steps: u64) -> Result<Self, ConfigError> {
        if total_steps == 0 {
            return Err(ConfigError::ZeroSteps {
                name: "total_steps",
            });
        }
        if warmup_steps > total_steps {
            return Err(ConfigError::WarmupExceedsTotal {
                warmup: warmup_steps,
                total: total_steps,
            });
        }
        Ok(Self {
            total_steps,
            warmup_steps,
        })
    }

    /// The base-rate multiplier at `step`.
    pub fn multiplier(&self, step: u64) -> f64 {
        if step < self.warmup_steps {
            step as f64 / self.warmup_steps.max(1) as f64
        } else {
            let remaining = self.total_steps.saturating_sub(step) as f64;
            let decay_span = self.total_steps.saturating_sub(self.warmup_steps).max(1) as f64;
            (remaining / decay_span).max(0.0)
        }
    }
}

impl Schedule for LinearWarmupDecay {
    fn lr_at(&self, step: u64, base_lr: f64) -> f64 {
        base_lr * self.multiplier(step)
    }

    fn total_steps(&self) -> u64 {
        self.total_steps
    }
}

/// Applies a [`Schedule`] to an optimizer once per step.
///
/// Captures each group's learning rate at attach time as its base rate and
/// holds only a step counter beyond that, so the driver state is small enough
/// to embed in a checkpoint; restart with [`set_step`](Self::set_step).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleDriver<S> {
    schedule: S,
    base_lrs: Vec<f64>,
    step: u64,
}

impl<S: Schedule> ScheduleDriver<S> {
    /// Attach a schedule to an optimizer, snapshotting per-group base rates.
    pub fn attach<O: OptimizerHandle>(schedule: S, optimizer: &O) -> Self {
        let base_lrs = optimizer
            .param_groups()
            .iter()
            .map(|g| g.learning_rate)
            .collect();
        Self {
            schedule,
            base_lrs,
            step: 0,
        }
    }

    /// Write this step's rate into every group, then advance the counter.
    pub fn step<O: OptimizerHandle>(&mut self, optimizer: &mut O) {
        let step = self.step;
        for (group, &base_lr) in optimizer.param_groups_mut().iter_mut().zip(&self.base_lrs) {
            group.learning_rate = self.schedule.lr_at(step, base_lr);
        }
        self.step += 1;
    }

    /// Current step index (the next `step` call applies this index).
    pub fn current_step(&self) -> u64 {
        self.step
    }

    /// Jump to a step index, e.g. when resuming from a checkpoint.
    pub fn set_step(&mut self, step: u64) {
        self.step = step;
    }

    /// The wrapped schedule.
    pub fn schedule(&self) -> &S {
        &self.schedule
    }
}
