//! Parameter groups and the optimizer seam.
//!
//! The controller and schedule driver never own the parameters being
//! optimized; they read and write the numeric control fields of externally
//! owned groups through [`OptimizerHandle`]. Groups are addressed by their
//! position in the ordered list, which must stay stable for the lifetime of
//! an attached controller.

use serde::{Deserialize, Serialize};

/// A named set of numeric optimizer controls updated together.
///
/// `weight_decay == 0.0` means weight decay is disabled for the group and
/// the controller will leave the field untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamGroup {
    /// Group name, used for logging only.
    pub name: String,
    /// Current learning rate.
    pub learning_rate: f64,
    /// Current weight-decay coefficient (0.0 = disabled).
    pub weight_decay: f64,
}

impl ParamGroup {
    /// Create a group with the given learning rate and no weight decay.
    pub fn new(name: impl Into<String>, learning_rate: f64) -> Self {
        Self {
            name: name.into(),
            learning_rate,
            weight_decay: 0.0,
        }
    }

    /// Set the weight-decay coefficient (builder pattern).
    pub fn with_weight_decay(mut self, weight_decay: f64) -> Self {
        self.weight_decay = weight_decay;
        self
    }
}

/// Ordered access to an optimizer's parameter groups.
///
/// Implemented by the external gradient-descent optimizer. The group order
/// must not change between calls: floors and schedule base rates are keyed
/// by group index.
pub trait OptimizerHandle {
    /// The parameter groups, in stable order.
    fn param_groups(&self) -> &[ParamGroup];

    /// Mutable view of the parameter groups, same order.
    fn param_groups_mut(&mut self) -> &mut [ParamGroup];
}

/// Vec-backed [`OptimizerHandle`] for tests and standalone use.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParamGroups {
    groups: Vec<ParamGroup>,
}

impl ParamGroups {
    /// Create a handle over the given groups.
    pub fn new(groups: Vec<ParamGroup>) -> Self {
        Self { groups }
    }

    /// Convenience: a single unnamed group with the given learning rate.
    pub fn single(learning_rate: f64) -> Self {
        Self {
            groups: vec![ParamGroup::new("default", learning_rate)],
        }
    }
}

impl OptimizerHandle for ParamGroups {
    fn param_groups(&self) -> &[ParamGroup] {
        &self.groups
    }

    fn param_groups_mut(&mut self) -> &mut [ParamGroup] {
        &mut self.groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_group() {
        let opt = ParamGroups::single(0.1);
        assert_eq!(opt.param_groups().len(), 1);
        assert_eq!(opt.param_groups()[0].learning_rate, 0.1);
        assert_eq!(opt.param_groups()[0].weight_decay, 0.0);
    }

    #[test]
    fn test_mutation_through_handle() {
        let mut opt = ParamGroups::new(vec![
            ParamGroup::new("embeddings", 0.1),
            ParamGroup::new("head", 0.01).with_weight_decay(1e-4),
        ]);

        opt.param_groups_mut()[1].learning_rate = 0.005;

        assert_eq!(opt.param_groups()[1].learning_rate, 0.005);
        assert_eq!(opt.param_groups()[1].weight_decay, 1e-4);
        assert_eq!(opt.param_groups()[0].learning_rate, 0.1);
    }
}
