// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the prediction request lifecycle.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// A prediction request entered the graph.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use predictor_dag::observability::messages::engine::PredictionStarted;
///
/// let msg = PredictionStarted {
///     predictor: "income-ensemble",
///     request_id: "9f2c",
///     unit_count: 3,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct PredictionStarted<'a> {
    pub predictor: &'a str,
    pub request_id: &'a str,
    pub unit_count: usize,
}

impl Display for PredictionStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting prediction {} on predictor '{}' ({} units)",
            self.request_id, self.predictor, self.unit_count
        )
    }
}

impl StructuredLog for PredictionStarted<'_> {
    fn log(&self) {
        tracing::info!(
            predictor = self.predictor,
            request_id = self.request_id,
            unit_count = self.unit_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "prediction",
            span_name = name,
            predictor = self.predictor,
            request_id = self.request_id,
        )
    }
}

/// A prediction produced a complete result.
///
/// # Log Level
/// `info!` - Important operational event
pub struct PredictionCompleted<'a> {
    pub predictor: &'a str,
    pub request_id: &'a str,
    pub units_visited: usize,
    pub duration: Duration,
}

impl Display for PredictionCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Prediction {} on predictor '{}' completed: {} units visited in {:?}",
            self.request_id, self.predictor, self.units_visited, self.duration
        )
    }
}

impl StructuredLog for PredictionCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            predictor = self.predictor,
            request_id = self.request_id,
            units_visited = self.units_visited,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }
}

/// A prediction failed.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use predictor_dag::observability::messages::engine::PredictionFailed;
///
/// let error = std::io::Error::new(std::io::ErrorKind::Other, "model offline");
/// let msg = PredictionFailed {
///     predictor: "income-ensemble",
///     request_id: "9f2c",
///     error_kind: "inference",
///     error: &error,
/// };
///
/// tracing::error!("{}", msg);
/// ```
pub struct PredictionFailed<'a> {
    pub predictor: &'a str,
    pub request_id: &'a str,
    pub error_kind: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for PredictionFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Prediction {} on predictor '{}' failed ({}): {}",
            self.request_id, self.predictor, self.error_kind, self.error
        )
    }
}

impl StructuredLog for PredictionFailed<'_> {
    fn log(&self) {
        tracing::error!(
            predictor = self.predictor,
            request_id = self.request_id,
            error_kind = self.error_kind,
            error = %self.error,
            "{}", self
        );
    }
}

/// The request deadline elapsed; outstanding work is being cancelled.
///
/// # Log Level
/// `warn!` - Request abandoned
pub struct DeadlineExceeded<'a> {
    pub predictor: &'a str,
    pub request_id: &'a str,
    pub deadline: Duration,
}

impl Display for DeadlineExceeded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Prediction {} on predictor '{}' exceeded its {:?} deadline, cancelling outstanding units",
            self.request_id, self.predictor, self.deadline
        )
    }
}

impl StructuredLog for DeadlineExceeded<'_> {
    fn log(&self) {
        tracing::warn!(
            predictor = self.predictor,
            request_id = self.request_id,
            deadline_ms = self.deadline.as_millis() as u64,
            "{}", self
        );
    }
}

/// A sibling failure stopped the rest of a unit's children.
///
/// # Log Level
/// `debug!` - Detailed scheduling information
pub struct SiblingsCancelled<'a> {
    pub unit_id: &'a str,
    pub failed_child: &'a str,
    pub never_started: usize,
}

impl Display for SiblingsCancelled<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Unit '{}' cancelled its remaining children after '{}' settled ({} never started)",
            self.unit_id, self.failed_child, self.never_started
        )
    }
}

impl StructuredLog for SiblingsCancelled<'_> {
    fn log(&self) {
        tracing::debug!(
            unit_id = self.unit_id,
            failed_child = self.failed_child,
            never_started = self.never_started,
            "{}", self
        );
    }
}
