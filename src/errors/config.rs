// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors raised while loading, validating and activating a predictor graph.
//!
//! Everything in this module is fatal: a graph that produced any of these errors
//! is never handed to the execution engine.

use std::path::PathBuf;
use thiserror::Error;

/// Structural problems found in a predictor definition.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A circular reference was detected in the unit graph
    #[error("Cyclic reference detected: {}", .cycle.join(" -> "))]
    CyclicDependency {
        /// The cycle path showing the circular reference
        cycle: Vec<String>,
    },

    /// A unit lists a child that doesn't exist
    #[error("Unit '{unit_id}' references child '{missing_child}' which does not exist")]
    UnresolvedChild {
        unit_id: String,
        missing_child: String,
    },

    /// Two units share the same id
    #[error("Duplicate unit ID: '{unit_id}'")]
    DuplicateUnitId { unit_id: String },

    /// The declared root is not one of the units
    #[error("Root unit '{root}' does not exist")]
    MissingRoot { root: String },

    /// A unit is listed as a child of more than one parent
    #[error("Unit '{child_id}' has more than one parent: {}", .parents.join(", "))]
    SharedChild {
        child_id: String,
        parents: Vec<String>,
    },

    /// A unit cannot be reached from the root
    #[error("Unit '{unit_id}' is not reachable from root '{root}'")]
    UnreachableUnit { unit_id: String, root: String },
}

/// Errors produced while turning a predictor definition into a live graph.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read predictor config '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported predictor config format for '{}' (expected .yaml, .yml or .toml)", .path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("Invalid YAML predictor config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid TOML predictor config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration validation failed:\n{}", render_validation_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("Invalid executor options: {reason}")]
    InvalidExecutorOptions { reason: String },

    /// Kind-specific configuration that can never execute correctly
    #[error("Invalid configuration for unit '{unit_id}': {reason}")]
    InvalidUnit { unit_id: String, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid_unit(unit_id: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidUnit {
            unit_id: unit_id.to_string(),
            reason: reason.into(),
        }
    }
}

fn render_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
