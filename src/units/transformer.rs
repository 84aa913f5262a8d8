// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Transformer units: pure, synchronous payload rewrites.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::errors::{ConfigError, PredictError};
use crate::units::payload::{insert_path, lookup_path_mut};

/// Whether the rewrite runs on the way down or on the way back up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformPhase {
    /// Rewrite the request before it reaches the child
    #[default]
    Input,
    /// Rewrite the child's result
    Output,
}

/// A single payload rewrite.
///
/// ```yaml
/// transform: { op: scale, field: score, factor: 100 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Transform {
    Identity,
    /// Multiply every number at `field` (or in the whole payload)
    Scale {
        #[serde(default)]
        field: Option<String>,
        factor: f64,
    },
    /// Add `amount` to every number at `field` (or in the whole payload)
    Offset {
        #[serde(default)]
        field: Option<String>,
        amount: f64,
    },
    /// Keep only the listed top-level fields
    Select { fields: Vec<String> },
    Rename { from: String, to: String },
    Set { field: String, value: Value },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformerSpec {
    #[serde(default)]
    pub phase: TransformPhase,
    pub transform: Transform,
}

impl TransformerSpec {
    pub fn new(phase: TransformPhase, transform: Transform) -> Self {
        Self { phase, transform }
    }

    pub fn validate(&self, unit_id: &str, child_count: usize) -> Result<(), ConfigError> {
        if child_count > 1 {
            return Err(ConfigError::invalid_unit(
                unit_id,
                format!("a transformer wraps at most one child, found {}", child_count),
            ));
        }
        match &self.transform {
            Transform::Scale { factor: n, .. } | Transform::Offset { amount: n, .. }
                if !n.is_finite() =>
            {
                Err(ConfigError::invalid_unit(unit_id, "transform operand must be finite"))
            }
            Transform::Select { fields } if fields.is_empty() => Err(ConfigError::invalid_unit(
                unit_id,
                "select needs at least one field",
            )),
            _ => Ok(()),
        }
    }

    pub fn apply(&self, unit_id: &str, payload: Value) -> Result<Value, PredictError> {
        self.transform
            .apply(payload)
            .map_err(|reason| PredictError::Transform {
                unit_id: unit_id.to_string(),
                reason,
            })
    }
}

impl Transform {
    pub fn apply(&self, mut payload: Value) -> Result<Value, String> {
        match self {
            Transform::Identity => Ok(payload),
            Transform::Scale { field, factor } => {
                map_numbers_at(&mut payload, field.as_deref(), |n| n * factor)?;
                Ok(payload)
            }
            Transform::Offset { field, amount } => {
                map_numbers_at(&mut payload, field.as_deref(), |n| n + amount)?;
                Ok(payload)
            }
            Transform::Select { fields } => {
                let Value::Object(mut map) = payload else {
                    return Err("select requires an object payload".to_string());
                };
                let mut kept = Map::new();
                for field in fields {
                    let value = map
                        .remove(field)
                        .ok_or_else(|| format!("field '{}' not found", field))?;
                    kept.insert(field.clone(), value);
                }
                Ok(Value::Object(kept))
            }
            Transform::Rename { from, to } => {
                let Value::Object(map) = &mut payload else {
                    return Err("rename requires an object payload".to_string());
                };
                let value = map
                    .remove(from)
                    .ok_or_else(|| format!("field '{}' not found", from))?;
                map.insert(to.clone(), value);
                Ok(payload)
            }
            Transform::Set { field, value } => {
                insert_path(&mut payload, field, value.clone())?;
                Ok(payload)
            }
        }
    }
}

fn map_numbers_at(
    payload: &mut Value,
    field: Option<&str>,
    op: impl Fn(f64) -> f64 + Copy,
) -> Result<(), String> {
    let target = match field {
        Some(path) => {
            lookup_path_mut(payload, path).ok_or_else(|| format!("field '{}' not found", path))?
        }
        None => payload,
    };
    let touched = map_numbers(target, op)?;
    if touched == 0 {
        return Err("no numeric values to rewrite".to_string());
    }
    Ok(())
}

fn map_numbers(value: &mut Value, op: impl Fn(f64) -> f64 + Copy) -> Result<usize, String> {
    match value {
        Value::Number(number) => {
            let current = number
                .as_f64()
                .ok_or_else(|| "number is not representable as f64".to_string())?;
            *number = Number::from_f64(op(current))
                .ok_or_else(|| "rewritten value is not finite".to_string())?;
            Ok(1)
        }
        Value::Array(items) => items.iter_mut().map(|item| map_numbers(item, op)).sum(),
        Value::Object(map) => map.values_mut().map(|item| map_numbers(item, op)).sum(),
        _ => Ok(0),
    }
}
