// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::errors::InferenceError;
use crate::units::payload::lookup_path;
use crate::units::ModelSpec;

/// In-process scorers, selected by a model's `implementation` name.
///
/// - "echo" -> returns the payload unchanged
/// - "constant" -> returns `options.output` (required)
/// - "linear" -> `{"score": bias + Σ weight × feature}` with `options.weights` keyed by dotted path
#[derive(Debug, Clone, PartialEq)]
pub enum LocalScorer {
    Echo,
    Constant(Value),
    Linear { weights: BTreeMap<String, f64>, bias: f64 },
}

impl LocalScorer {
    pub fn from_spec(spec: &ModelSpec) -> Result<Self, InferenceError> {
        match spec.implementation.as_str() {
            "echo" => Ok(LocalScorer::Echo),
            "constant" => spec
                .option("output")
                .cloned()
                .map(LocalScorer::Constant)
                .ok_or_else(|| invalid_options(spec, "'output' is required")),
            "linear" => {
                let bias = match spec.option("bias") {
                    None => 0.0,
                    Some(value) => value
                        .as_f64()
                        .ok_or_else(|| invalid_options(spec, "'bias' must be a number"))?,
                };
                let weights = match spec.option("weights") {
                    Some(Value::Object(map)) => map
                        .iter()
                        .map(|(feature, weight)| {
                            weight
                                .as_f64()
                                .map(|w| (feature.clone(), w))
                                .ok_or_else(|| {
                                    invalid_options(
                                        spec,
                                        format!("weight for '{}' must be a number", feature),
                                    )
                                })
                        })
                        .collect::<Result<BTreeMap<_, _>, _>>()?,
                    _ => {
                        return Err(invalid_options(
                            spec,
                            "'weights' must map feature paths to numbers",
                        ))
                    }
                };
                Ok(LocalScorer::Linear { weights, bias })
            }
            other => Err(InferenceError::UnknownModel(other.to_string())),
        }
    }

    pub fn score(&self, payload: &Value) -> Result<Value, InferenceError> {
        match self {
            LocalScorer::Echo => Ok(payload.clone()),
            LocalScorer::Constant(output) => Ok(output.clone()),
            LocalScorer::Linear { weights, bias } => {
                let mut score = *bias;
                for (feature, weight) in weights {
                    let value = lookup_path(payload, feature)
                        .ok_or_else(|| {
                            InferenceError::InvalidInput(format!("missing feature '{}'", feature))
                        })?
                        .as_f64()
                        .ok_or_else(|| {
                            InferenceError::InvalidInput(format!(
                                "feature '{}' is not a number",
                                feature
                            ))
                        })?;
                    score += weight * value;
                }
                Ok(json!({ "score": score }))
            }
        }
    }

    pub fn list_available_implementations() -> Vec<&'static str> {
        vec!["echo", "constant", "linear"]
    }
}

fn invalid_options(spec: &ModelSpec, reason: impl Into<String>) -> InferenceError {
    InferenceError::InvalidOptions {
        model: spec.name.clone(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo_and_constant() {
        let payload = json!({"x": 1});
        assert_eq!(
            LocalScorer::from_spec(&ModelSpec::new("e", "echo"))
                .unwrap()
                .score(&payload)
                .unwrap(),
            payload
        );

        let constant = ModelSpec::new("c", "constant").with_option("output", json!({"score": 0.8}));
        assert_eq!(
            LocalScorer::from_spec(&constant).unwrap().score(&payload).unwrap(),
            json!({"score": 0.8})
        );
    }

    #[test]
    fn test_linear_scores_nested_features() {
        let spec = ModelSpec::new("income", "linear")
            .with_option("bias", json!(0.5))
            .with_option("weights", json!({"age": 0.1, "account.balance": 0.001}));
        let scorer = LocalScorer::from_spec(&spec).unwrap();

        let output = scorer
            .score(&json!({"age": 40, "account": {"balance": 1000}}))
            .unwrap();
        let score = output["score"].as_f64().unwrap();
        assert!((score - 5.5).abs() < 1e-9);

        assert!(matches!(
            scorer.score(&json!({"age": 40})),
            Err(InferenceError::InvalidInput(_))
        ));
        assert!(matches!(
            scorer.score(&json!({"age": "old", "account": {"balance": 1}})),
            Err(InferenceError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_rejects_bad_specs() {
        assert_eq!(
            LocalScorer::from_spec(&ModelSpec::new("x", "gradient_boosting")),
            Err(InferenceError::UnknownModel("gradient_boosting".into()))
        );
        assert!(matches!(
            LocalScorer::from_spec(&ModelSpec::new("c", "constant")),
            Err(InferenceError::InvalidOptions { .. })
        ));
        assert!(matches!(
            LocalScorer::from_spec(
                &ModelSpec::new("l", "linear").with_option("weights", json!({"age": "heavy"}))
            ),
            Err(InferenceError::InvalidOptions { .. })
        ));
        assert!(matches!(
            LocalScorer::from_spec(&ModelSpec::new("l", "linear")),
            Err(InferenceError::InvalidOptions { .. })
        ));
    }
}
