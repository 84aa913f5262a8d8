// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Structural validation of predictor definitions.
//!
//! A predictor is executed as a tree: every unit is invoked at most once per
//! request, so every unit other than the root needs exactly one parent. The checks
//! run in a fixed order and accumulate errors, so a broken config reports every
//! problem at once:
//!
//! 1. **Uniqueness**: unit ids are unique
//! 2. **Root**: the declared root is one of the units
//! 3. **References**: every child id resolves
//! 4. **Single parent**: no unit is listed as a child more than once
//! 5. **Acyclicity**: DFS with a recursion stack, reporting the cycle path
//! 6. **Reachability**: every unit hangs off the root
//!
//! Steps 5 and 6 need a well-formed graph and only run when 1-4 passed.
//! Kind-specific checks (weights, rule indices, child counts) run when the graph
//! is built.
//!
//! # Example
//! ```rust
//! use predictor_dag::config::{validate_predictor_graph, PredictorConfig};
//!
//! let cfg: PredictorConfig = serde_yaml::from_str(r#"
//! name: broken
//! root: root
//! units:
//!   - id: root
//!     type: combiner
//!     strategy: all_required
//!     children: [missing]
//! "#).unwrap();
//!
//! let errors = validate_predictor_graph(&cfg).unwrap_err();
//! assert_eq!(errors.len(), 1);
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::config::PredictorConfig;
use crate::errors::ValidationError;

/// Run every structural check against `config`.
pub fn validate_predictor_graph(config: &PredictorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(duplicate_errors) = validate_unique_unit_ids(config) {
        errors.extend(duplicate_errors);
    }

    if !config.units.iter().any(|unit| unit.id == config.root) {
        errors.push(ValidationError::MissingRoot {
            root: config.root.clone(),
        });
    }

    if let Err(unresolved_errors) = validate_child_references(config) {
        errors.extend(unresolved_errors);
    }

    if let Err(shared_errors) = validate_single_parent(config) {
        errors.extend(shared_errors);
    }

    if errors.is_empty() {
        if let Err(cycle_errors) = validate_acyclic_graph(config) {
            errors.extend(cycle_errors);
        } else if let Err(unreachable_errors) = validate_reachability(config) {
            errors.extend(unreachable_errors);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_unique_unit_ids(config: &PredictorConfig) -> Result<(), Vec<ValidationError>> {
    let mut seen_ids = HashSet::new();
    let mut errors = Vec::new();

    for unit in &config.units {
        if !seen_ids.insert(&unit.id) {
            errors.push(ValidationError::DuplicateUnitId {
                unit_id: unit.id.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_child_references(config: &PredictorConfig) -> Result<(), Vec<ValidationError>> {
    let unit_ids: HashSet<&String> = config.units.iter().map(|u| &u.id).collect();
    let mut errors = Vec::new();

    for unit in &config.units {
        for child in &unit.children {
            if !unit_ids.contains(child) {
                errors.push(ValidationError::UnresolvedChild {
                    unit_id: unit.id.clone(),
                    missing_child: child.clone(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// A unit listed under two parents (or twice under one) would run twice per request.
fn validate_single_parent(config: &PredictorConfig) -> Result<(), Vec<ValidationError>> {
    // BTreeMap keeps the error order stable across runs.
    let mut parents: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for unit in &config.units {
        for child in &unit.children {
            parents
                .entry(child.as_str())
                .or_default()
                .push(unit.id.clone());
        }
    }

    let errors: Vec<ValidationError> = parents
        .into_iter()
        .filter(|(_, parents)| parents.len() > 1)
        .map(|(child_id, parents)| ValidationError::SharedChild {
            child_id: child_id.to_string(),
            parents,
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// DFS over parent -> child edges, tracking the recursion stack (gray nodes).
///
/// Reaching a node that is still on the stack means a back edge; the path from
/// that node to the current one, plus the back edge, is the cycle.
fn validate_acyclic_graph(config: &PredictorConfig) -> Result<(), Vec<ValidationError>> {
    let graph: HashMap<&str, Vec<&str>> = config
        .units
        .iter()
        .map(|unit| {
            (
                unit.id.as_str(),
                unit.children.iter().map(String::as_str).collect(),
            )
        })
        .collect();

    let mut visited = HashSet::new();
    let mut rec_stack = HashSet::new();
    let mut path = Vec::new();

    // Declared order, so the reported cycle does not depend on hash order.
    for unit in &config.units {
        if !visited.contains(unit.id.as_str()) {
            if let Some(cycle) = dfs_cycle_detection(
                &unit.id,
                &graph,
                &mut visited,
                &mut rec_stack,
                &mut path,
            ) {
                return Err(vec![ValidationError::CyclicDependency { cycle }]);
            }
        }
    }

    Ok(())
}

fn dfs_cycle_detection<'a>(
    node: &'a str,
    graph: &HashMap<&'a str, Vec<&'a str>>,
    visited: &mut HashSet<&'a str>,
    rec_stack: &mut HashSet<&'a str>,
    path: &mut Vec<&'a str>,
) -> Option<Vec<String>> {
    visited.insert(node);
    rec_stack.insert(node);
    path.push(node);

    if let Some(children) = graph.get(node) {
        for &child in children {
            if !visited.contains(child) {
                if let Some(cycle) = dfs_cycle_detection(child, graph, visited, rec_stack, path) {
                    return Some(cycle);
                }
            } else if rec_stack.contains(child) {
                let cycle_start = path.iter().position(|id| *id == child).unwrap_or(0);
                let mut cycle: Vec<String> =
                    path[cycle_start..].iter().map(|id| id.to_string()).collect();
                cycle.push(child.to_string());
                return Some(cycle);
            }
        }
    }

    rec_stack.remove(node);
    path.pop();
    None
}

fn validate_reachability(config: &PredictorConfig) -> Result<(), Vec<ValidationError>> {
    let children: HashMap<&str, &[String]> = config
        .units
        .iter()
        .map(|unit| (unit.id.as_str(), unit.children.as_slice()))
        .collect();

    let mut reached = HashSet::new();
    let mut stack = vec![config.root.as_str()];
    while let Some(id) = stack.pop() {
        if reached.insert(id) {
            if let Some(kids) = children.get(id) {
                stack.extend(kids.iter().map(String::as_str));
            }
        }
    }

    let errors: Vec<ValidationError> = config
        .units
        .iter()
        .filter(|unit| !reached.contains(unit.id.as_str()))
        .map(|unit| ValidationError::UnreachableUnit {
            unit_id: unit.id.clone(),
            root: config.root.clone(),
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExecutorOptions, UnitConfig, UnitKindConfig};
    use crate::units::{ModelSpec, Transform, TransformPhase};

    fn model(id: &str) -> UnitConfig {
        UnitConfig {
            id: id.to_string(),
            children: vec![],
            kind: UnitKindConfig::Model {
                model: ModelSpec::new(id, "echo"),
            },
        }
    }

    fn passthrough(id: &str, children: Vec<&str>) -> UnitConfig {
        UnitConfig {
            id: id.to_string(),
            children: children.iter().map(|s| s.to_string()).collect(),
            kind: UnitKindConfig::Transformer {
                phase: TransformPhase::Input,
                transform: Transform::Identity,
            },
        }
    }

    fn config(root: &str, units: Vec<UnitConfig>) -> PredictorConfig {
        PredictorConfig {
            name: "test".to_string(),
            root: root.to_string(),
            executor_options: ExecutorOptions::default(),
            units,
        }
    }

    #[test]
    fn test_valid_single_model() {
        assert!(validate_predictor_graph(&config("m", vec![model("m")])).is_ok());
    }

    #[test]
    fn test_valid_chain() {
        let cfg = config(
            "outer",
            vec![
                passthrough("outer", vec!["inner"]),
                passthrough("inner", vec!["m"]),
                model("m"),
            ],
        );
        assert!(validate_predictor_graph(&cfg).is_ok());
    }

    #[test]
    fn test_duplicate_ids_and_missing_root_accumulate() {
        let cfg = config("root", vec![model("m"), model("m")]);
        let errors = validate_predictor_graph(&cfg).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::DuplicateUnitId {
                    unit_id: "m".into()
                },
                ValidationError::MissingRoot {
                    root: "root".into()
                },
            ]
        );
    }

    #[test]
    fn test_unresolved_child() {
        let cfg = config("root", vec![passthrough("root", vec!["ghost"])]);
        let errors = validate_predictor_graph(&cfg).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::UnresolvedChild {
                unit_id: "root".into(),
                missing_child: "ghost".into()
            }]
        );
    }

    #[test]
    fn test_shared_child_is_rejected() {
        let cfg = config(
            "root",
            vec![
                UnitConfig {
                    id: "root".into(),
                    children: vec!["left".into(), "right".into()],
                    kind: UnitKindConfig::Combiner {
                        strategy: crate::units::CombineStrategyName::AllRequired,
                        weights: None,
                    },
                },
                passthrough("left", vec!["m"]),
                passthrough("right", vec!["m"]),
                model("m"),
            ],
        );
        let errors = validate_predictor_graph(&cfg).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::SharedChild {
                child_id: "m".into(),
                parents: vec!["left".into(), "right".into()]
            }]
        );
    }

    #[test]
    fn test_self_reference_cycle() {
        let cfg = config("a", vec![passthrough("a", vec!["a"])]);
        let errors = validate_predictor_graph(&cfg).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::CyclicDependency {
                cycle: vec!["a".into(), "a".into()]
            }]
        );
    }

    #[test]
    fn test_detached_cycle_reports_path() {
        let cfg = config(
            "root",
            vec![
                passthrough("root", vec!["m"]),
                model("m"),
                passthrough("a", vec!["b"]),
                passthrough("b", vec!["c"]),
                passthrough("c", vec!["a"]),
            ],
        );
        let errors = validate_predictor_graph(&cfg).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::CyclicDependency {
                cycle: vec!["a".into(), "b".into(), "c".into(), "a".into()]
            }]
        );
    }

    #[test]
    fn test_unreachable_units() {
        let cfg = config(
            "root",
            vec![passthrough("root", vec!["m"]), model("m"), model("orphan")],
        );
        let errors = validate_predictor_graph(&cfg).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::UnreachableUnit {
                unit_id: "orphan".into(),
                root: "root".into()
            }]
        );
    }
}
