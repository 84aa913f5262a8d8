// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for predictor loading and validation.
//!
//! This module contains message types for logging events related to:
//! * Config file loading
//! * Structural validation failures
//! * Graph activation

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A predictor config file was parsed.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use predictor_dag::observability::messages::validation::ConfigLoaded;
///
/// let msg = ConfigLoaded {
///     path: "configs/ensemble.yaml",
///     predictor: "income-ensemble",
///     unit_count: 4,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct ConfigLoaded<'a> {
    pub path: &'a str,
    pub predictor: &'a str,
    pub unit_count: usize,
}

impl Display for ConfigLoaded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Loaded predictor '{}' from {} ({} units)",
            self.predictor, self.path, self.unit_count
        )
    }
}

impl StructuredLog for ConfigLoaded<'_> {
    fn log(&self) {
        tracing::info!(
            path = self.path,
            predictor = self.predictor,
            unit_count = self.unit_count,
            "{}", self
        );
    }
}

/// Structural validation rejected a predictor definition.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use predictor_dag::observability::messages::validation::ValidationFailed;
///
/// let msg = ValidationFailed {
///     predictor: "income-ensemble",
///     error_count: 2,
///     first_error: "Root unit 'root' does not exist",
/// };
///
/// tracing::error!("{}", msg);
/// ```
pub struct ValidationFailed<'a> {
    pub predictor: &'a str,
    pub error_count: usize,
    pub first_error: &'a str,
}

impl Display for ValidationFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Predictor '{}' failed validation with {} error(s), first: {}",
            self.predictor, self.error_count, self.first_error
        )
    }
}

impl StructuredLog for ValidationFailed<'_> {
    fn log(&self) {
        tracing::error!(
            predictor = self.predictor,
            error_count = self.error_count,
            first_error = self.first_error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::ERROR,
            "span_name",
            name = name,
            predictor = self.predictor,
            error_count = self.error_count,
        )
    }
}

/// A validated graph was activated and can serve requests.
///
/// # Log Level
/// `info!` - Important operational event
pub struct GraphActivated<'a> {
    pub predictor: &'a str,
    pub root: &'a str,
    pub unit_count: usize,
    pub model_count: usize,
    pub max_concurrency: usize,
}

impl Display for GraphActivated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Activated predictor '{}' rooted at '{}': {} units, {} models, max concurrency {}",
            self.predictor, self.root, self.unit_count, self.model_count, self.max_concurrency
        )
    }
}

impl StructuredLog for GraphActivated<'_> {
    fn log(&self) {
        tracing::info!(
            predictor = self.predictor,
            root = self.root,
            unit_count = self.unit_count,
            model_count = self.model_count,
            max_concurrency = self.max_concurrency,
            "{}", self
        );
    }
}
