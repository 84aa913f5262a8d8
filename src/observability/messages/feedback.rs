// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for feedback propagation.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Feedback for a finished request is about to walk its trace.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use predictor_dag::observability::messages::feedback::FeedbackPropagationStarted;
///
/// let msg = FeedbackPropagationStarted {
///     predictor: "income-ensemble",
///     request_id: "9f2c",
///     reward: 1.0,
///     trace_len: 3,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct FeedbackPropagationStarted<'a> {
    pub predictor: &'a str,
    pub request_id: &'a str,
    pub reward: f64,
    pub trace_len: usize,
}

impl Display for FeedbackPropagationStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Propagating reward {} for request {} across {} traced units",
            self.reward, self.request_id, self.trace_len
        )
    }
}

impl StructuredLog for FeedbackPropagationStarted<'_> {
    fn log(&self) {
        tracing::info!(
            predictor = self.predictor,
            request_id = self.request_id,
            reward = self.reward,
            trace_len = self.trace_len,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "feedback",
            span_name = name,
            predictor = self.predictor,
            request_id = self.request_id,
        )
    }
}

/// One traced unit received the feedback.
///
/// # Log Level
/// `debug!` - Detailed execution information
pub struct FeedbackDelivered<'a> {
    pub unit_id: &'a str,
    pub kind: &'a str,
}

impl Display for FeedbackDelivered<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Delivered feedback to {} unit '{}'", self.kind, self.unit_id)
    }
}

impl StructuredLog for FeedbackDelivered<'_> {
    fn log(&self) {
        tracing::debug!(unit_id = self.unit_id, kind = self.kind, "{}", self);
    }
}

/// A traced unit no longer exists in the active graph.
///
/// # Log Level
/// `warn!` - Graph changed since the request ran
pub struct FeedbackSkipped<'a> {
    pub unit_id: &'a str,
    pub predictor: &'a str,
}

impl Display for FeedbackSkipped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Skipping feedback for unit '{}': no longer part of predictor '{}'",
            self.unit_id, self.predictor
        )
    }
}

impl StructuredLog for FeedbackSkipped<'_> {
    fn log(&self) {
        tracing::warn!(
            unit_id = self.unit_id,
            predictor = self.predictor,
            "{}", self
        );
    }
}

/// A unit's feedback hook failed. Propagation continues with the next unit.
///
/// # Log Level
/// `warn!` - Partial delivery
pub struct FeedbackFailed<'a> {
    pub unit_id: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for FeedbackFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Feedback for unit '{}' failed: {}", self.unit_id, self.error)
    }
}

impl StructuredLog for FeedbackFailed<'_> {
    fn log(&self) {
        tracing::warn!(unit_id = self.unit_id, error = %self.error, "{}", self);
    }
}

/// Feedback propagation finished.
///
/// # Log Level
/// `info!` - Important operational event
pub struct FeedbackPropagationCompleted<'a> {
    pub request_id: &'a str,
    pub delivered: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl Display for FeedbackPropagationCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Feedback for request {} done: {} delivered, {} skipped, {} failed",
            self.request_id, self.delivered, self.skipped, self.failed
        )
    }
}

impl StructuredLog for FeedbackPropagationCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            request_id = self.request_id,
            delivered = self.delivered,
            skipped = self.skipped,
            failed = self.failed,
            "{}", self
        );
    }
}
