// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Combiner strategies.
//!
//! A combiner receives its children's payloads already sorted by declared index,
//! so every strategy here is a pure function of that ordered slice.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::errors::{ConfigError, PredictError};

/// Strategy names as they appear in predictor configs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombineStrategyName {
    FirstSuccess,
    AllRequired,
    WeightedMerge,
    Average,
}

/// How a combiner merges the ordered results of its children.
#[derive(Debug, Clone, PartialEq)]
pub enum CombineStrategy {
    /// Lowest-index child that succeeds wins; failures are tolerated.
    FirstSuccess,
    /// Every child must succeed; the payloads are returned as an array.
    AllRequired,
    /// Σ wᵢ·xᵢ / Σ wᵢ over numerically compatible payloads.
    WeightedMerge { weights: Vec<f64> },
    /// Weighted merge with equal weights.
    Average,
}

impl CombineStrategy {
    pub fn from_config(
        unit_id: &str,
        name: CombineStrategyName,
        weights: Option<Vec<f64>>,
    ) -> Result<Self, ConfigError> {
        match (name, weights) {
            (CombineStrategyName::WeightedMerge, Some(weights)) => {
                Ok(CombineStrategy::WeightedMerge { weights })
            }
            (CombineStrategyName::WeightedMerge, None) => Err(ConfigError::invalid_unit(
                unit_id,
                "weighted_merge requires a 'weights' list",
            )),
            (_, Some(_)) => Err(ConfigError::invalid_unit(
                unit_id,
                "'weights' is only valid for the weighted_merge strategy",
            )),
            (CombineStrategyName::FirstSuccess, None) => Ok(CombineStrategy::FirstSuccess),
            (CombineStrategyName::AllRequired, None) => Ok(CombineStrategy::AllRequired),
            (CombineStrategyName::Average, None) => Ok(CombineStrategy::Average),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CombineStrategy::FirstSuccess => "first_success",
            CombineStrategy::AllRequired => "all_required",
            CombineStrategy::WeightedMerge { .. } => "weighted_merge",
            CombineStrategy::Average => "average",
        }
    }

    /// Whether a failed child may be skipped instead of failing the combiner.
    pub fn tolerates_child_failure(&self) -> bool {
        matches!(self, CombineStrategy::FirstSuccess)
    }

    pub fn validate(&self, unit_id: &str, child_count: usize) -> Result<(), ConfigError> {
        if child_count == 0 {
            return Err(ConfigError::invalid_unit(
                unit_id,
                "a combiner needs at least one child",
            ));
        }
        if let CombineStrategy::WeightedMerge { weights } = self {
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
                    "weights must not sum to zero",
                ));
            }
        }
        Ok(())
    }

    /// Merge `payloads`, which are in declared child order.
    ///
    /// `FirstSuccess` is resolved during dispatch, so by the time it gets here it
    /// holds exactly the winning payload.
    pub fn combine(&self, unit_id: &str, payloads: Vec<Value>) -> Result<Value, PredictError> {
        match self {
            CombineStrategy::FirstSuccess => {
                payloads
                    .into_iter()
                    .next()
                    .ok_or_else(|| PredictError::Merge {
                        unit_id: unit_id.to_string(),
                        reason: "no child produced a result".to_string(),
                    })
            }
            CombineStrategy::AllRequired => Ok(Value::Array(payloads)),
            CombineStrategy::WeightedMerge { weights } => weighted_merge(unit_id, &payloads, weights),
            CombineStrategy::Average => {
                let weights = vec![1.0; payloads.len()];
                weighted_merge(unit_id, &payloads, &weights)
            }
        }
    }
}

fn weighted_merge(unit_id: &str, payloads: &[Value], weights: &[f64]) -> Result<Value, PredictError> {
    let merge_error = |reason: String| PredictError::Merge {
        unit_id: unit_id.to_string(),
        reason,
    };

    if payloads.is_empty() {
        return Err(merge_error("nothing to merge".to_string()));
    }
    if payloads.len() != weights.len() {
        return Err(merge_error(format!(
            "{} payloads but {} weights",
            payloads.len(),
            weights.len()
        )));
    }
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return Err(merge_error("weights sum to zero".to_string()));
    }

    let inputs: Vec<&Value> = payloads.iter().collect();
    blend(&inputs, weights, total, "$").map_err(merge_error)
}

/// Recursively blend values that share one numeric shape.
fn blend(values: &[&Value], weights: &[f64], total: f64, at: &str) -> Result<Value, String> {
    match values[0] {
        Value::Number(_) => {
            let mut sum = 0.0;
            for (value, weight) in values.iter().zip(weights) {
                let number = value
                    .as_f64()
                    .ok_or_else(|| format!("{}: expected a number in every input", at))?;
                sum += number * weight;
            }
            Number::from_f64(sum / total)
                .map(Value::Number)
                .ok_or_else(|| format!("{}: blended value is not finite", at))
        }
        Value::Array(first) => {
            let mut columns: Vec<Vec<&Value>> = vec![Vec::with_capacity(values.len()); first.len()];
            for value in values {
                let items = value
                    .as_array()
                    .ok_or_else(|| format!("{}: expected an array in every input", at))?;
                if items.len() != first.len() {
                    return Err(format!(
                        "{}: array lengths differ ({} vs {})",
                        at,
                        first.len(),
                        items.len()
                    ));
                }
                for (column, item) in columns.iter_mut().zip(items) {
                    column.push(item);
                }
            }
            columns
                .iter()
                .enumerate()
                .map(|(i, column)| blend(column, weights, total, &format!("{}[{}]", at, i)))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        Value::Object(first) => {
            let mut merged = Map::new();
            for key in first.keys() {
                let mut column = Vec::with_capacity(values.len());
                for value in values {
                    let field = value
                        .as_object()
                        .ok_or_else(|| format!("{}: expected an object in every input", at))?
                        .get(key)
                        .ok_or_else(|| format!("{}: field '{}' missing from an input", at, key))?;
                    column.push(field);
                }
                merged.insert(
                    key.clone(),
                    blend(&column, weights, total, &format!("{}.{}", at, key))?,
                );
            }
            for value in values {
                if value.as_object().map(Map::len) != Some(first.len()) {
                    return Err(format!("{}: inputs have different fields", at));
                }
            }
            Ok(Value::Object(merged))
        }
        other => Err(format!(
            "{}: cannot blend non-numeric value {}",
            at, other
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn close(value: &Value, expected: f64) -> bool {
        (value.as_f64().unwrap() - expected).abs() < 1e-9
    }

    #[test]
    fn test_all_required_keeps_declared_order() {
        let merged = CombineStrategy::AllRequired
            .combine("c", vec![json!({"score": 0.8}), json!({"score": 0.4})])
            .unwrap();
        assert_eq!(merged, json!([{"score": 0.8}, {"score": 0.4}]));
    }

    #[test]
    fn test_weighted_merge_objects() {
        let strategy = CombineStrategy::WeightedMerge {
            weights: vec![3.0, 1.0],
        };
        let merged = strategy
            .combine("c", vec![json!({"score": 0.8}), json!({"score": 0.4})])
            .unwrap();
        assert!(close(&merged["score"], 0.7));
    }

    #[test]
    fn test_average_nested_arrays() {
        let merged = CombineStrategy::Average
            .combine(
                "c",
                vec![json!({"probs": [0.2, 0.8]}), json!({"probs": [0.6, 0.4]})],
            )
            .unwrap();
        assert!(close(&merged["probs"][0], 0.4));
        assert!(close(&merged["probs"][1], 0.6));
    }

    #[test]
    fn test_mismatched_shapes_are_merge_errors() {
        let cases = vec![
            ("array length", json!([1, 2]), json!([1, 2, 3])),
            ("missing field", json!({"a": 1}), json!({"b": 1})),
            ("extra field", json!({"a": 1}), json!({"a": 1, "b": 2})),
            ("string", json!("yes"), json!("no")),
            ("number vs object", json!(1), json!({"a": 1})),
        ];

        for (name, lhs, rhs) in cases {
            let result = CombineStrategy::Average.combine("c", vec![lhs, rhs]);
            match result {
                Err(PredictError::Merge { unit_id, .. }) => assert_eq!(unit_id, "c", "{}", name),
                other => panic!("{}: expected merge error, got {:?}", name, other),
            }
        }
    }

    #[test]
    fn test_from_config_requires_weights_only_for_weighted_merge() {
        assert!(CombineStrategy::from_config("c", CombineStrategyName::WeightedMerge, None).is_err());
        assert!(
            CombineStrategy::from_config("c", CombineStrategyName::Average, Some(vec![1.0])).is_err()
        );
        assert_eq!(
            CombineStrategy::from_config("c", CombineStrategyName::AllRequired, None).unwrap(),
            CombineStrategy::AllRequired
        );
    }

    #[test]
    fn test_validate_weights_against_children() {
        let strategy = CombineStrategy::WeightedMerge {
            weights: vec![1.0, 2.0],
        };
        assert!(strategy.validate("c", 2).is_ok());
        assert!(strategy.validate("c", 3).is_err());
        assert!(CombineStrategy::AllRequired.validate("c", 0).is_err());
    }

    #[test]
    fn test_validate_rejects_weights_summing_to_infinity() {
        let strategy = CombineStrategy::WeightedMerge {
            weights: vec![1e308, 1e308],
        };
        match strategy.validate("c", 2) {
            Err(ConfigError::InvalidUnit { unit_id, reason }) => {
                assert_eq!(unit_id, "c");
                assert!(reason.contains("overflow"));
            }
            other => panic!("expected invalid unit, got {:?}", other),
        }
    }
}
