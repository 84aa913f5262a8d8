// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::ConfigError;
use crate::units::{CombineStrategy, ModelSpec, RoutingPolicy, TransformerSpec};

/// Kind-specific behaviour and configuration of a unit.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitKind {
    Model(ModelSpec),
    Combiner(CombineStrategy),
    Router(RoutingPolicy),
    Transformer(TransformerSpec),
}

/// Serializable tag of a [`UnitKind`], recorded in traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKindName {
    Model,
    Combiner,
    Router,
    Transformer,
}

impl UnitKindName {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitKindName::Model => "model",
            UnitKindName::Combiner => "combiner",
            UnitKindName::Router => "router",
            UnitKindName::Transformer => "transformer",
        }
    }
}

impl fmt::Display for UnitKindName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl UnitKind {
    pub fn name(&self) -> UnitKindName {
        match self {
            UnitKind::Model(_) => UnitKindName::Model,
            UnitKind::Combiner(_) => UnitKindName::Combiner,
            UnitKind::Router(_) => UnitKindName::Router,
            UnitKind::Transformer(_) => UnitKindName::Transformer,
        }
    }

    /// Checks that need to know how many children the unit was given.
    pub fn validate(&self, unit_id: &str, child_count: usize) -> Result<(), ConfigError> {
        match self {
            UnitKind::Model(spec) => {
                if child_count > 0 {
                    return Err(ConfigError::invalid_unit(
                        unit_id,
                        format!("a model unit is a leaf but has {} children", child_count),
                    ));
                }
                if spec.implementation.trim().is_empty() {
                    return Err(ConfigError::invalid_unit(
                        unit_id,
                        "model implementation must not be empty",
                    ));
                }
                Ok(())
            }
            UnitKind::Combiner(strategy) => strategy.validate(unit_id, child_count),
            UnitKind::Router(policy) => policy.validate(unit_id, child_count),
            UnitKind::Transformer(spec) => spec.validate(unit_id, child_count),
        }
    }
}
