// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Model units: leaves that hand their payload to the inference collaborator.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::config::consts::UNVERSIONED;
use crate::traits::MetricTags;

/// Static description of the model behind a model unit.
///
/// # Example
/// ```yaml
/// model:
///   name: income-classifier
///   version: "2"
///   implementation: linear
///   options:
///     bias: 0.1
///     weights: { age: 0.02 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Model name used in metrics and logs
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    /// Which scorer the inference client should use
    pub implementation: String,
    /// Remote address, for clients that talk to a model server
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub options: BTreeMap<String, Value>,
}

impl ModelSpec {
    pub fn new(name: impl Into<String>, implementation: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            implementation: implementation.into(),
            endpoint: None,
            options: BTreeMap::new(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_option(mut self, key: &str, value: Value) -> Self {
        self.options.insert(key.to_string(), value);
        self
    }

    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    /// Tags identifying this model in every metric it emits.
    pub fn metric_tags(&self, predictor: &str, unit_id: &str) -> MetricTags {
        MetricTags::new()
            .with("predictor", predictor)
            .with("unit", unit_id)
            .with("model_name", self.name.as_str())
            .with(
                "model_version",
                self.version.as_deref().unwrap_or(UNVERSIONED),
            )
    }
}
