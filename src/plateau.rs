//! Plateau-triggered annealing controller.
//!
//! Watches a scalar validation metric once per evaluation round and shrinks
//! the learning rate (and optionally the weight-decay coefficient) of every
//! parameter group when the metric stops improving for longer than the
//! configured patience. An auxiliary metric breaks exact ties on the primary
//! metric, and a cooldown window suppresses bad-round counting right after a
//! reduction.
//!
//! # Example
//!
//! ```
//! use anneal_tools::{Mode, ParamGroups, PlateauController};
//!
//! let mut optimizer = ParamGroups::single(0.1);
//! let mut controller = PlateauController::builder()
//!     .mode(Mode::Min)
//!     .factor(0.5)
//!     .patience(3)
//!     .build(&optimizer)
//!     .unwrap();
//!
//! // Once per evaluation round, after computing the validation score:
//! let reduced = controller.step(0.42, None, &mut optimizer).unwrap();
//! assert!(!reduced);
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ConfigError, MetricError};
use crate::optim::OptimizerHandle;

/// Comparison direction for a monitored metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// Lower values are better (loss-like metrics).
    Min,
    /// Higher values are better (accuracy-like metrics).
    Max,
}

impl Mode {
    /// The sentinel every real value improves on.
    fn worst(self) -> f64 {
        match self {
            Mode::Min => f64::INFINITY,
            Mode::Max => f64::NEG_INFINITY,
        }
    }

    /// Strict comparison: does `candidate` beat `incumbent`?
    fn is_better(self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Mode::Min => candidate < incumbent,
            Mode::Max => candidate > incumbent,
        }
    }
}

/// Parameter-group field the controller reduces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReduceField {
    /// The group's learning rate.
    LearningRate,
    /// The group's weight-decay coefficient.
    WeightDecay,
}

impl std::fmt::Display for ReduceField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LearningRate => write!(f, "learning_rate"),
            Self::WeightDecay => write!(f, "weight_decay"),
        }
    }
}

/// One reduced field together with its per-group floors.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ReduceTarget {
    field: ReduceField,
    /// Lower bound per parameter group, aligned with group index.
    floors: Vec<f64>,
}

/// Serializable comparison state of a [`PlateauController`].
///
/// The bound optimizer handle is not part of the state; the caller re-attaches
/// it by passing the handle to every [`PlateauController::step`] call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerState {
    /// Comparison direction for the primary metric.
    pub mode: Mode,
    /// Comparison direction for the tie-break metric.
    pub aux_mode: Mode,
    /// Best primary metric observed so far.
    pub best: f64,
    /// Tie-break value recorded alongside `best`.
    pub best_aux: Option<f64>,
    /// Consecutive rounds without improvement.
    pub bad_epochs: u32,
    /// Rounds left before bad-round counting resumes.
    pub cooldown_remaining: u32,
    /// Current patience threshold.
    pub effective_patience: u32,
    /// Monotone round counter.
    pub epoch: u64,
    /// Multiplicative shrink factor.
    pub factor: f64,
    /// Minimum absolute change required to apply a reduction.
    pub eps: f64,
}

/// Builder for [`PlateauController`].
///
/// # Defaults
///
/// - `mode` / `aux_mode`: [`Mode::Min`]
/// - `factor`: 0.1
/// - `patience`: 10
/// - `initial_extra_patience`: 0
/// - `cooldown`: 0
/// - `min_lr` / `min_weight_decay`: 0.0 (broadcast to all groups)
/// - `eps`: 1e-8
/// - weight-decay reduction: off
#[derive(Debug, Clone)]
pub struct PlateauControllerBuilder {
    mode: Mode,
    aux_mode: Mode,
    factor: f64,
    patience: u32,
    initial_extra_patience: u32,
    cooldown: u32,
    min_lr: FloorSpec,
    min_weight_decay: FloorSpec,
    reduce_weight_decay: bool,
    eps: f64,
}

/// Scalar-broadcast or per-group floor configuration.
#[derive(Debug, Clone)]
enum FloorSpec {
    Scalar(f64),
    PerGroup(Vec<f64>),
}

impl FloorSpec {
    fn resolve(&self, num_groups: usize) -> Result<Vec<f64>, ConfigError> {
        match self {
            Self::Scalar(v) => Ok(vec![*v; num_groups]),
            Self::PerGroup(vs) => {
                if vs.len() != num_groups {
                    Err(ConfigError::FloorCountMismatch {
                        expected: num_groups,
                        actual: vs.len(),
                    })
                } else {
                    Ok(vs.clone())
                }
            }
        }
    }
}

impl Default for PlateauControllerBuilder {
    fn default() -> Self {
        Self {
            mode: Mode::Min,
            aux_mode: Mode::Min,
            factor: 0.1,
            patience: 10,
            initial_extra_patience: 0,
            cooldown: 0,
            min_lr: FloorSpec::Scalar(0.0),
            min_weight_decay: FloorSpec::Scalar(0.0),
            reduce_weight_decay: false,
            eps: 1e-8,
        }
    }
}

impl PlateauControllerBuilder {
    /// Set the comparison direction for the primary metric.
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the comparison direction for the tie-break metric.
    pub fn aux_mode(mut self, aux_mode: Mode) -> Self {
        self.aux_mode = aux_mode;
        self
    }

    /// Set the multiplicative shrink factor. Must be in (0, 1).
    pub fn factor(mut self, factor: f64) -> Self {
        self.factor = factor;
        self
    }

    /// Number of bad rounds tolerated before a reduction fires.
    pub fn patience(mut self, patience: u32) -> Self {
        self.patience = patience;
        self
    }

    /// Extra patience granted until the first reduction, then consumed.
    pub fn initial_extra_patience(mut self, extra: u32) -> Self {
        self.initial_extra_patience = extra;
        self
    }

    /// Rounds after a reduction during which bad rounds are not counted.
    pub fn cooldown(mut self, cooldown: u32) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Learning-rate floor broadcast to every group.
    pub fn min_lr(mut self, min_lr: f64) -> Self {
        self.min_lr = FloorSpec::Scalar(min_lr);
        self
    }

    /// One learning-rate floor per group, in group order.
    pub fn min_lrs(mut self, min_lrs: Vec<f64>) -> Self {
        self.min_lr = FloorSpec::PerGroup(min_lrs);
        self
    }

    /// Also reduce each group's weight-decay coefficient, floored at 0.
    pub fn reduce_weight_decay(mut self) -> Self {
        self.reduce_weight_decay = true;
        self
    }

    /// Weight-decay floor broadcast to every group (implies weight-decay
    /// reduction).
    pub fn min_weight_decay(mut self, min_wd: f64) -> Self {
        self.min_weight_decay = FloorSpec::Scalar(min_wd);
        self.reduce_weight_decay = true;
        self
    }

    /// One weight-decay floor per group (implies weight-decay reduction).
    pub fn min_weight_decays(mut self, min_wds: Vec<f64>) -> Self {
        self.min_weight_decay = FloorSpec::PerGroup(min_wds);
        self.reduce_weight_decay = true;
        self
    }

    /// Minimum absolute change required to actually write a reduction.
    pub fn eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }

    /// Validate the configuration against the bound optimizer and build.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the factor is outside (0, 1), the optimizer
    /// has no parameter groups, or a per-group floor list does not match the
    /// group count.
    pub fn build<O: OptimizerHandle>(self, optimizer: &O) -> Result<PlateauController, ConfigError> {
        if !(self.factor > 0.0 && self.factor < 1.0) {
            return Err(ConfigError::InvalidFactor { value: self.factor });
        }

        let num_groups = optimizer.param_groups().len();
        if num_groups == 0 {
            return Err(ConfigError::NoParamGroups);
        }

        let mut targets = vec![ReduceTarget {
            field: ReduceField::LearningRate,
            floors: self.min_lr.resolve(num_groups)?,
        }];
        if self.reduce_weight_decay {
            targets.push(ReduceTarget {
                field: ReduceField::WeightDecay,
                floors: self.min_weight_decay.resolve(num_groups)?,
            });
        }

        Ok(PlateauController {
            mode: self.mode,
            aux_mode: self.aux_mode,
            factor: self.factor,
            eps: self.eps,
            base_patience: self.patience,
            effective_patience: self.patience + self.initial_extra_patience,
            cooldown: self.cooldown,
            cooldown_remaining: 0,
            targets,
            best: self.mode.worst(),
            best_aux: None,
            bad_epochs: 0,
            epoch: 0,
        })
    }
}

/// Stateful plateau-annealing controller.
///
/// Call [`step`](Self::step) exactly once per evaluation round with the
/// freshly computed validation metric. The controller mutates the optimizer's
/// parameter groups in place and reports whether this round reduced them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlateauController {
    mode: Mode,
    aux_mode: Mode,
    factor: f64,
    eps: f64,
    base_patience: u32,
    effective_patience: u32,
    cooldown: u32,
    cooldown_remaining: u32,
    targets: Vec<ReduceTarget>,
    best: f64,
    best_aux: Option<f64>,
    bad_epochs: u32,
    epoch: u64,
}

impl PlateauController {
    /// Create a builder with default settings.
    pub fn builder() -> PlateauControllerBuilder {
        PlateauControllerBuilder::default()
    }

    /// Feed one round's metrics and apply a reduction if the plateau has
    /// outlasted the patience.
    ///
    /// Returns `Ok(true)` when this call reduced the bound fields.
    ///
    /// # Errors
    ///
    /// Returns [`MetricError`] when the primary or a supplied auxiliary
    /// metric is NaN or infinite; the controller state is left untouched.
    pub fn step<O: OptimizerHandle>(
        &mut self,
        primary: f64,
        auxiliary: Option<f64>,
        optimizer: &mut O,
    ) -> Result<bool, MetricError> {
        if !primary.is_finite() {
            return Err(MetricError::NonFinitePrimary { value: primary });
        }
        if let Some(aux) = auxiliary {
            if !aux.is_finite() {
                return Err(MetricError::NonFiniteAuxiliary { value: aux });
            }
        }

        self.epoch += 1;

        let mut is_better = self.mode.is_better(primary, self.best);

        // Exact tie on the primary metric: let the auxiliary metric decide.
        if primary == self.best {
            if let Some(aux) = auxiliary {
                is_better = match self.best_aux {
                    Some(best_aux) => self.aux_mode.is_better(aux, best_aux),
                    // First auxiliary observation on a tie wins.
                    None => true,
                };
            }
        }

        if is_better {
            self.best = primary;
            if auxiliary.is_some() {
                self.best_aux = auxiliary;
            }
            self.bad_epochs = 0;
        } else {
            self.bad_epochs += 1;
        }

        // Rounds spent in cooldown never count as bad, even the one above.
        if self.cooldown_remaining > 0 {
            self.cooldown_remaining -= 1;
            self.bad_epochs = 0;
        }

        let reduced = self.bad_epochs > self.effective_patience;
        if reduced {
            self.reduce(optimizer);
            self.cooldown_remaining = self.cooldown;
            self.bad_epochs = 0;
            // The initial extra grant is consumed by the first reduction.
            self.effective_patience = self.base_patience;
        }

        Ok(reduced)
    }

    /// Shrink every target field of every group, honoring floor and eps.
    fn reduce<O: OptimizerHandle>(&self, optimizer: &mut O) {
        for target in &self.targets {
            let groups = optimizer.param_groups_mut();
            for (i, (group, &floor)) in groups.iter_mut().zip(&target.floors).enumerate() {
                let old = match target.field {
                    ReduceField::LearningRate => group.learning_rate,
                    // Zero decay means the group opted out of weight decay.
                    ReduceField::WeightDecay if group.weight_decay == 0.0 => continue,
                    ReduceField::WeightDecay => group.weight_decay,
                };

                let new = (old * self.factor).max(floor);
                if old - new > self.eps {
                    match target.field {
                        ReduceField::LearningRate => group.learning_rate = new,
                        ReduceField::WeightDecay => group.weight_decay = new,
                    }
                    info!(
                        "epoch {}: reducing {} of group {} ({}) to {:.4e}",
                        self.epoch, target.field, i, group.name, new
                    );
                } else {
                    debug!(
                        "epoch {}: {} change for group {} below eps, leaving at {:.4e}",
                        self.epoch, target.field, i, old
                    );
                }
            }
        }
    }

    /// Snapshot the comparison state for embedding in a checkpoint.
    pub fn export_state(&self) -> ControllerState {
        ControllerState {
            mode: self.mode,
            aux_mode: self.aux_mode,
            best: self.best,
            best_aux: self.best_aux,
            bad_epochs: self.bad_epochs,
            cooldown_remaining: self.cooldown_remaining,
            effective_patience: self.effective_patience,
            epoch: self.epoch,
            factor: self.factor,
            eps: self.eps,
        }
    }

    /// Restore a previously exported state.
    ///
    /// The optimizer handle is not part of the state; keep passing it to
    /// [`step`](Self::step) after restoring.
    pub fn restore_state(&mut self, state: ControllerState) {
        self.mode = state.mode;
        self.aux_mode = state.aux_mode;
        self.best = state.best;
        self.best_aux = state.best_aux;
        self.bad_epochs = state.bad_epochs;
        self.cooldown_remaining = state.cooldown_remaining;
        self.effective_patience = state.effective_patience;
        self.epoch = state.epoch;
        self.factor = state.factor;
        self.eps = state.eps;
    }

    /// Reset the comparison state while keeping the configuration.
    pub fn reset(&mut self) {
        self.best = self.mode.worst();
        self.best_aux = None;
        self.bad_epochs = 0;
        self.cooldown_remaining = 0;
    }

    /// Best primary metric observed so far.
    pub fn best(&self) -> f64 {
        self.best
    }

    /// Tie-break value recorded alongside the best primary metric.
    pub fn best_aux(&self) -> Option<f64> {
        self.best_aux
    }

    /// Consecutive rounds without improvement.
    pub fn bad_epochs(&self) -> u32 {
        self.bad_epochs
    }

    /// Whether bad-round counting is currently suspended.
    pub fn in_cooldown(&self) -> bool {
        self.cooldown_remaining > 0
    }

    /// Current patience threshold.
    pub fn effective_patience(&self) -> u32 {
        self.effective_patience
    }

    /// Number of rounds seen so far.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}
