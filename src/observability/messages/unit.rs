// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for individual unit execution.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// A unit started executing.
///
/// # Log Level
/// `debug!` - Detailed execution information
///
/// # Example
/// ```
/// use predictor_dag::observability::messages::unit::UnitExecutionStarted;
///
/// let msg = UnitExecutionStarted {
///     unit_id: "model_a",
///     kind: "model",
/// };
///
/// tracing::debug!("{}", msg);
/// ```
pub struct UnitExecutionStarted<'a> {
    pub unit_id: &'a str,
    pub kind: &'a str,
}

impl Display for UnitExecutionStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Executing {} unit '{}'", self.kind, self.unit_id)
    }
}

impl StructuredLog for UnitExecutionStarted<'_> {
    fn log(&self) {
        tracing::debug!(unit_id = self.unit_id, kind = self.kind, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "unit",
            span_name = name,
            unit_id = self.unit_id,
            kind = self.kind,
        )
    }
}

/// A unit finished successfully.
///
/// # Log Level
/// `debug!` - Detailed execution information
pub struct UnitExecutionCompleted<'a> {
    pub unit_id: &'a str,
    pub kind: &'a str,
    pub duration: Duration,
}

impl Display for UnitExecutionCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} unit '{}' completed in {:?}",
            self.kind, self.unit_id, self.duration
        )
    }
}

impl StructuredLog for UnitExecutionCompleted<'_> {
    fn log(&self) {
        tracing::debug!(
            unit_id = self.unit_id,
            kind = self.kind,
            duration_us = self.duration.as_micros() as u64,
            "{}", self
        );
    }
}

/// A unit failed on its own account (not because a child did).
///
/// # Log Level
/// `warn!` - The parent decides whether the request survives
///
/// # Example
/// ```
/// use predictor_dag::observability::messages::unit::UnitExecutionFailed;
///
/// let error = std::io::Error::new(std::io::ErrorKind::Other, "model offline");
/// let msg = UnitExecutionFailed {
///     unit_id: "model_a",
///     kind: "model",
///     error: &error,
/// };
///
/// tracing::warn!("{}", msg);
/// ```
pub struct UnitExecutionFailed<'a> {
    pub unit_id: &'a str,
    pub kind: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for UnitExecutionFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{} unit '{}' failed: {}", self.kind, self.unit_id, self.error)
    }
}

impl StructuredLog for UnitExecutionFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            unit_id = self.unit_id,
            kind = self.kind,
            error = %self.error,
            "{}", self
        );
    }
}

/// A router picked its branches for this request.
///
/// # Log Level
/// `debug!` - Detailed execution information
pub struct RouteSelected<'a> {
    pub unit_id: &'a str,
    pub chosen: &'a [usize],
    pub child_count: usize,
}

impl Display for RouteSelected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Router '{}' selected branches {:?} of {}",
            self.unit_id, self.chosen, self.child_count
        )
    }
}

impl StructuredLog for RouteSelected<'_> {
    fn log(&self) {
        tracing::debug!(
            unit_id = self.unit_id,
            chosen = ?self.chosen,
            child_count = self.child_count,
            "{}", self
        );
    }
}

/// A first-success combiner skipped a failed child and kept going.
///
/// # Log Level
/// `info!` - Degraded but successful
pub struct FallbackUsed<'a> {
    pub unit_id: &'a str,
    pub failed_child: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for FallbackUsed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Combiner '{}' falling back past child '{}': {}",
            self.unit_id, self.failed_child, self.error
        )
    }
}

impl StructuredLog for FallbackUsed<'_> {
    fn log(&self) {
        tracing::info!(
            unit_id = self.unit_id,
            failed_child = self.failed_child,
            error = %self.error,
            "{}", self
        );
    }
}
