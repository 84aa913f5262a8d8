// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Turns a validated [`PredictorConfig`] into an immutable [`PredictorGraph`].

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{validate_predictor_graph, PredictorConfig, RouterPolicyName, UnitConfig, UnitKindConfig};
use crate::errors::ConfigError;
use crate::graph::{PredictorGraph, UnitKind, UnitNode};
use crate::units::{CombineStrategy, RoutingPolicy, TransformerSpec};

impl UnitKindConfig {
    /// Resolve the declared kind into its runtime form.
    pub fn to_kind(&self, unit_id: &str) -> Result<UnitKind, ConfigError> {
        match self {
            UnitKindConfig::Model { model } => Ok(UnitKind::Model(model.clone())),
            UnitKindConfig::Combiner { strategy, weights } => Ok(UnitKind::Combiner(
                CombineStrategy::from_config(unit_id, *strategy, weights.clone())?,
            )),
            UnitKindConfig::Router {
                policy,
                rules,
                default,
                weights,
                fan_out,
            } => {
                let policy = match (policy, weights, fan_out) {
                    (RouterPolicyName::Predicate, None, None) => RoutingPolicy::Predicate {
                        rules: rules.clone(),
                        default: *default,
                    },
                    (RouterPolicyName::Weighted, Some(weights), None)
                        if rules.is_empty() && default.is_none() =>
                    {
                        RoutingPolicy::Weighted {
                            weights: weights.clone(),
                        }
                    }
                    (RouterPolicyName::FanOut, None, Some(children))
                        if rules.is_empty() && default.is_none() =>
                    {
                        RoutingPolicy::FanOut {
                            children: children.clone(),
                        }
                    }
                    (RouterPolicyName::Predicate, _, _) => {
                        return Err(ConfigError::invalid_unit(
                            unit_id,
                            "predicate routers take 'rules' and 'default' only",
                        ))
                    }
                    (RouterPolicyName::Weighted, _, _) => {
                        return Err(ConfigError::invalid_unit(
                            unit_id,
                            "weighted routers take a 'weights' list only",
                        ))
                    }
                    (RouterPolicyName::FanOut, _, _) => {
                        return Err(ConfigError::invalid_unit(
                            unit_id,
                            "fan_out routers take a 'fan_out' list of child indices only",
                        ))
                    }
                };
                Ok(UnitKind::Router(policy))
            }
            UnitKindConfig::Transformer { phase, transform } => Ok(UnitKind::Transformer(
                TransformerSpec::new(*phase, transform.clone()),
            )),
        }
    }
}

impl PredictorGraph {
    /// Validate `cfg` and build its unit tree.
    ///
    /// Structural errors are reported together as [`ConfigError::Validation`];
    /// the first kind-specific problem is reported as [`ConfigError::InvalidUnit`].
    pub fn from_config(cfg: &PredictorConfig) -> Result<Self, ConfigError> {
        validate_predictor_graph(cfg).map_err(ConfigError::Validation)?;

        let units: HashMap<&str, &UnitConfig> =
            cfg.units.iter().map(|unit| (unit.id.as_str(), unit)).collect();
        let root = build_node(&cfg.root, &units)?;
        PredictorGraph::new(cfg.name.clone(), root)
    }
}

/// Validation guarantees a tree, so the recursion terminates and every id resolves.
fn build_node(id: &str, units: &HashMap<&str, &UnitConfig>) -> Result<Arc<UnitNode>, ConfigError> {
    let unit = units
        .get(id)
        .ok_or_else(|| ConfigError::invalid_unit(id, "unit is not declared"))?;
    let children = unit
        .children
        .iter()
        .map(|child| build_node(child, units))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(UnitNode::new(unit.id.clone(), unit.kind.to_kind(&unit.id)?, children))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::UnitKindName;

    fn parse(yaml: &str) -> PredictorConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_builds_tree_in_declared_order() {
        let cfg = parse(
            r#"
name: sign
root: root
units:
  - id: model_neg
    type: model
    model: { name: neg, implementation: echo }
  - id: root
    type: router
    policy: predicate
    rules:
      - when: { field: x, op: gt, value: 0 }
        child: 0
    default: 1
    children: [model_pos, model_neg]
  - id: model_pos
    type: model
    model: { name: pos, implementation: echo }
"#,
        );

        let graph = PredictorGraph::from_config(&cfg).unwrap();
        let root = graph.root();
        assert_eq!(root.id(), "root");
        assert_eq!(root.kind().name(), UnitKindName::Router);
        let children: Vec<&str> = root.children().iter().map(|c| c.id()).collect();
        assert_eq!(children, vec!["model_pos", "model_neg"]);
        assert_eq!(graph.unit_count(), 3);
    }

    #[test]
    fn test_kind_checks_surface_as_invalid_unit() {
        let cfg = parse(
            r#"
name: bad-weights
root: root
units:
  - id: root
    type: combiner
    strategy: weighted_merge
    weights: [1.0]
    children: [a, b]
  - id: a
    type: model
    model: { name: a, implementation: echo }
  - id: b
    type: model
    model: { name: b, implementation: echo }
"#,
        );

        match PredictorGraph::from_config(&cfg) {
            Err(ConfigError::InvalidUnit { unit_id, reason }) => {
                assert_eq!(unit_id, "root");
                assert!(reason.contains("1 weights declared for 2 children"));
            }
            other => panic!("expected invalid unit, got {:?}", other),
        }
    }

    #[test]
    fn test_router_fields_must_match_policy() {
        let cfg = parse(
            r#"
name: mixed
root: root
units:
  - id: root
    type: router
    policy: weighted
    weights: [1.0]
    default: 0
    children: [a]
  - id: a
    type: model
    model: { name: a, implementation: echo }
"#,
        );

        assert!(matches!(
            PredictorGraph::from_config(&cfg),
            Err(ConfigError::InvalidUnit { .. })
        ));
    }

    #[test]
    fn test_structural_errors_block_the_build() {
        let cfg = parse(
            r#"
name: orphaned
root: root
units:
  - id: root
    type: model
    model: { name: r, implementation: echo }
  - id: orphan
    type: model
    model: { name: o, implementation: echo }
"#,
        );

        assert!(matches!(
            PredictorGraph::from_config(&cfg),
            Err(ConfigError::Validation(_))
        ));
    }
}
