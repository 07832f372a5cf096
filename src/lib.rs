//! Adaptive learning-rate control for iterative numerical optimization.
//!
//! This crate provides:
//! - Plateau-triggered annealing of learning rate and weight decay, with
//!   auxiliary-metric tie-breaking, patience, and cooldown
//! - Per-step schedule shapes (exponential anneal, linear warmup + decay)
//!   and a driver that applies them to an optimizer's parameter groups
//! - Training bookkeeping: random weight sampling to a TSV log and an
//!   evaluation-score aggregate
//!
//! The gradient update rule itself stays external: everything here works
//! through the [`OptimizerHandle`] seam, reading and mutating the numeric
//! control fields of parameter groups the caller owns.
//!
//! # Example
//!
//! ```
//! use anneal_tools::{Mode, OptimizerHandle, ParamGroups, PlateauController};
//!
//! let mut optimizer = ParamGroups::single(0.1);
//! let mut controller = PlateauController::builder()
//!     .mode(Mode::Max) // monitoring a score, not a loss
//!     .factor(0.5)
//!     .patience(2)
//!     .build(&optimizer)
//!     .unwrap();
//!
//! for round in 0..5 {
//!     let score = 0.8; // validation score for this round
//!     let loss = 0.4; // auxiliary tie-breaker
//!     if controller.step(score, Some(loss), &mut optimizer).unwrap() {
//!         println!("round {}: reduced to {}", round, optimizer.param_groups()[0].learning_rate);
//!     }
//! }
//! ```

pub mod error;
pub mod metric;
pub mod optim;
pub mod plateau;
pub mod schedule;
pub mod weights;

pub use error::{ConfigError, MetricError};
pub use metric::EvalScore;
pub use optim::{OptimizerHandle, ParamGroup, ParamGroups};
pub use plateau::{ControllerState, Mode, PlateauController, PlateauControllerBuilder, ReduceField};
pub use schedule::{ExpAnneal, LinearWarmupDecay, Schedule, ScheduleDriver};
pub use weights::WeightSampler;
