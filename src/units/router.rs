// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Router units: pick which children a request visits.
//!
//! Routing is a pure function of the payload, the request seed and the unit id,
//! so replaying a request with the same seed always walks the same branches.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use crate::errors::{ConfigError, PredictError};
use crate::units::payload::{lookup_path, numbers_equal};

/// Comparison applied by a [`Predicate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    Ne,
}

/// A test over one field of the payload.
///
/// ```yaml
/// when: { field: features.age, op: gt, value: 40 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    /// Dotted path into the payload
    pub field: String,
    pub op: CompareOp,
    pub value: Value,
}

impl Predicate {
    pub fn new(field: impl Into<String>, op: CompareOp, value: Value) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }

    /// Missing fields and non-numeric operands of ordering ops never match.
    pub fn matches(&self, payload: &Value) -> bool {
        let Some(actual) = lookup_path(payload, &self.field) else {
            return false;
        };
        match self.op {
            CompareOp::Eq => numbers_equal(actual, &self.value),
            CompareOp::Ne => !numbers_equal(actual, &self.value),
            op => match (actual.as_f64(), self.value.as_f64()) {
                (Some(lhs), Some(rhs)) => match op {
                    CompareOp::Gt => lhs > rhs,
                    CompareOp::Ge => lhs >= rhs,
                    CompareOp::Lt => lhs < rhs,
                    CompareOp::Le => lhs <= rhs,
                    CompareOp::Eq | CompareOp::Ne => unreachable!(),
                },
                _ => false,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRule {
    pub when: Predicate,
    pub child: usize,
}

/// How a router chooses among its children.
#[derive(Debug, Clone, PartialEq)]
pub enum RoutingPolicy {
    /// First matching rule wins, then `default`, otherwise the request fails.
    Predicate {
        rules: Vec<RouteRule>,
        default: Option<usize>,
    },
    /// One child drawn with probability proportional to its weight.
    Weighted { weights: Vec<f64> },
    /// A fixed subset of children, visited together.
    FanOut { children: Vec<usize> },
}

impl RoutingPolicy {
    /// Child indices to invoke, in declared order.
    pub fn route(
        &self,
        unit_id: &str,
        child_count: usize,
        payload: &Value,
        seed: u64,
    ) -> Result<Vec<usize>, PredictError> {
        let selected = match self {
            RoutingPolicy::Predicate { rules, default } => {
                let matched = rules
                    .iter()
                    .find(|rule| rule.when.matches(payload))
                    .map(|rule| rule.child)
                    .or(*default);
                match matched {
                    Some(index) => vec![index],
                    None => {
                        return Err(PredictError::Routing {
                            unit_id: unit_id.to_string(),
                            reason: "no rule matched the payload and no default branch is configured"
                                .to_string(),
                        })
                    }
                }
            }
            RoutingPolicy::Weighted { weights } => {
                vec![weighted_pick(weights, branch_seed(seed, unit_id))]
            }
            RoutingPolicy::FanOut { children } => {
                let mut children = children.clone();
                children.sort_unstable();
                children
            }
        };

        if let Some(out_of_range) = selected.iter().find(|&&index| index >= child_count) {
            return Err(PredictError::Routing {
                unit_id: unit_id.to_string(),
                reason: format!(
                    "selected branch {} but the router has {} children",
                    out_of_range, child_count
                ),
            });
        }
        Ok(selected)
    }

    /// Load-time checks against the router's declared children.
    pub fn validate(&self, unit_id: &str, child_count: usize) -> Result<(), ConfigError> {
        let check_index = |index: usize, what: &str| {
            if index >= child_count {
                Err(ConfigError::invalid_unit(
                    unit_id,
                    format!(
                        "{} refers to child {} but the router has {} children",
                        what, index, child_count
                    ),
                ))
            } else {
                Ok(())
            }
        };

        match self {
            RoutingPolicy::Predicate { rules, default } => {
                for (position, rule) in rules.iter().enumerate() {
                    check_index(rule.child, &format!("rule {}", position))?;
                }
                if let Some(default) = default {
                    check_index(*default, "default branch")?;
                }
            }
            RoutingPolicy::Weighted { weights } => {
                if weights.len() != child_count {
                    return Err(ConfigError::invalid_unit(
                        unit_id,
                        format!(
                            "{} weights declared for {} children",
                            weights.len(),
                            child_count
                        ),
                    ));
                }
                if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
                    return Err(ConfigError::invalid_unit(
                        unit_id,
                        "weights must be finite and non-negative",
                    ));
                }
                let total: f64 = weights.iter().sum();
                if !total.is_finite() {
                    return Err(ConfigError::invalid_unit(
                        unit_id,
                        "weights overflow when summed",
                    ));
                }
                if total <= 0.0 {
                    return Err(ConfigError::invalid_unit(
                        unit_id,
                        "at least one weight must be positive",
                    ));
                }
            }
            RoutingPolicy::FanOut { children } => {
                if children.is_empty() {
                    return Err(ConfigError::invalid_unit(
                        unit_id,
                        "fan_out must list at least one child",
                    ));
                }
                let mut seen = HashSet::new();
                for &index in children {
                    check_index(index, "fan_out")?;
                    if !seen.insert(index) {
                        return Err(ConfigError::invalid_unit(
                            unit_id,
                            format!("fan_out lists child {} twice", index),
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Mix the request seed with the unit id so sibling routers draw independently.
fn branch_seed(seed: u64, unit_id: &str) -> u64 {
    // FNV-1a
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in unit_id.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    seed ^ hash
}

fn weighted_pick(weights: &[f64], seed: u64) -> usize {
    let total: f64 = weights.iter().sum();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut draw = rng.random::<f64>() * total;
    let mut last_positive = 0;
    for (index, weight) in weights.iter().enumerate() {
        if *weight <= 0.0 {
            continue;
        }
        if draw < *weight {
            return index;
        }
        draw -= weight;
        last_positive = index;
    }
    // Rounding can leave a sliver past the last bucket.
    last_positive
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sign_router() -> RoutingPolicy {
        RoutingPolicy::Predicate {
            rules: vec![RouteRule {
                when: Predicate::new("x", CompareOp::Gt, json!(0)),
                child: 0,
            }],
            default: Some(1),
        }
    }

    #[test]
    fn test_predicate_routes_by_sign() {
        let router = sign_router();
        assert_eq!(router.route("r", 2, &json!({"x": 5}), 0).unwrap(), vec![0]);
        assert_eq!(router.route("r", 2, &json!({"x": -3}), 0).unwrap(), vec![1]);
    }

    #[test]
    fn test_predicate_without_default_fails() {
        let router = RoutingPolicy::Predicate {
            rules: vec![],
            default: None,
        };
        let error = router.route("r", 0, &json!({"x": 1}), 0).unwrap_err();
        assert!(matches!(error, PredictError::Routing { ref unit_id, .. } if unit_id == "r"));
    }

    #[test]
    fn test_selected_branch_must_exist() {
        let error = sign_router().route("r", 1, &json!({"x": -1}), 0).unwrap_err();
        assert!(error.to_string().contains("selected branch 1"));
    }

    #[test]
    fn test_predicate_field_paths_and_types() {
        let nested = Predicate::new("features.age", CompareOp::Ge, json!(40));
        assert!(nested.matches(&json!({"features": {"age": 40}})));
        assert!(!nested.matches(&json!({"features": {}})));
        assert!(!nested.matches(&json!({"features": {"age": "old"}})));

        let equals = Predicate::new("segment", CompareOp::Eq, json!("gold"));
        assert!(equals.matches(&json!({"segment": "gold"})));
        assert!(!equals.matches(&json!({"segment": "silver"})));

        let int_vs_float = Predicate::new("n", CompareOp::Eq, json!(1.0));
        assert!(int_vs_float.matches(&json!({"n": 1})));
    }

    #[test]
    fn test_weighted_is_reproducible_per_seed() {
        let router = RoutingPolicy::Weighted {
            weights: vec![0.5, 0.5],
        };
        for seed in 0..64 {
            let first = router.route("ab", 2, &json!({}), seed).unwrap();
            let second = router.route("ab", 2, &json!({}), seed).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_weighted_visits_every_positive_branch() {
        let router = RoutingPolicy::Weighted {
            weights: vec![1.0, 0.0, 1.0],
        };
        let mut seen = [0usize; 3];
        for seed in 0..200 {
            let chosen = router.route("ab", 3, &json!({}), seed).unwrap();
            seen[chosen[0]] += 1;
        }
        assert!(seen[0] > 0);
        assert_eq!(seen[1], 0);
        assert!(seen[2] > 0);
    }

    #[test]
    fn test_fan_out_is_returned_in_declared_order() {
        let router = RoutingPolicy::FanOut {
            children: vec![2, 0],
        };
        assert_eq!(router.route("f", 3, &json!({}), 0).unwrap(), vec![0, 2]);
    }

    #[test]
    fn test_validate_rejects_bad_indices_and_weights() {
        assert!(sign_router().validate("r", 2).is_ok());
        assert!(sign_router().validate("r", 1).is_err());

        let weighted = RoutingPolicy::Weighted {
            weights: vec![1.0, -1.0],
        };
        assert!(weighted.validate("w", 2).is_err());
        let zero = RoutingPolicy::Weighted {
            weights: vec![0.0, 0.0],
        };
        assert!(zero.validate("w", 2).is_err());
        let overflowing = RoutingPolicy::Weighted {
            weights: vec![f64::MAX, f64::MAX],
        };
        assert!(overflowing.validate("w", 2).is_err());

        let duplicate = RoutingPolicy::FanOut {
            children: vec![0, 0],
        };
        assert!(duplicate.validate("f", 2).is_err());
    }

    #[test]
    fn test_empty_predicate_router_is_loadable() {
        let router = RoutingPolicy::Predicate {
            rules: vec![],
            default: None,
        };
        assert!(router.validate("r", 0).is_ok());
    }
}
