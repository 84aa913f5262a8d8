// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors surfaced by a prediction request.
//!
//! Every failure starts at one unit and is wrapped once per enclosing composite
//! on its way up, so the caller receives a single error that still knows the full
//! path from the root to the unit that broke.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use super::InferenceError;

/// Coarse classification of a [`PredictError`], taken from its root cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Inference,
    Routing,
    Merge,
    Transform,
    Timeout,
    Cancelled,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Inference => "inference",
            ErrorKind::Routing => "routing",
            ErrorKind::Merge => "merge",
            ErrorKind::Transform => "transform",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum PredictError {
    /// The inference collaborator failed for a model unit.
    #[error("Inference failed at unit '{unit_id}': {source}")]
    Inference {
        unit_id: String,
        #[source]
        source: InferenceError,
    },

    /// A router could not select a viable branch.
    #[error("Routing failed at unit '{unit_id}': {reason}")]
    Routing { unit_id: String, reason: String },

    /// A combiner received inputs it cannot merge.
    #[error("Merge failed at unit '{unit_id}': {reason}")]
    Merge { unit_id: String, reason: String },

    /// A transformer could not rewrite its payload.
    #[error("Transform failed at unit '{unit_id}': {reason}")]
    Transform { unit_id: String, reason: String },

    /// The request deadline elapsed before the graph finished.
    #[error("Prediction exceeded its deadline of {deadline:?}")]
    Timeout { deadline: Duration },

    /// The unit stopped because its sibling group or request was cancelled.
    #[error("Unit '{unit_id}' was cancelled")]
    Cancelled { unit_id: String },

    /// A child failed; wraps the child's error with the parent's id.
    #[error("Unit '{unit_id}' failed because child '{child_id}' failed: {source}")]
    ChildFailed {
        unit_id: String,
        child_id: String,
        #[source]
        source: Box<PredictError>,
    },

    #[error("Internal execution error at unit '{unit_id}': {message}")]
    Internal { unit_id: String, message: String },
}

impl PredictError {
    /// Wrap `self` as the failure of `child_id` under `unit_id`.
    pub fn within(self, unit_id: &str, child_id: &str) -> Self {
        PredictError::ChildFailed {
            unit_id: unit_id.to_string(),
            child_id: child_id.to_string(),
            source: Box::new(self),
        }
    }

    /// The innermost error, i.e. the one raised by the failing unit itself.
    pub fn root_cause(&self) -> &PredictError {
        let mut current = self;
        while let PredictError::ChildFailed { source, .. } = current {
            current = source;
        }
        current
    }

    pub fn kind(&self) -> ErrorKind {
        match self.root_cause() {
            PredictError::Inference { .. } => ErrorKind::Inference,
            PredictError::Routing { .. } => ErrorKind::Routing,
            PredictError::Merge { .. } => ErrorKind::Merge,
            PredictError::Transform { .. } => ErrorKind::Transform,
            PredictError::Timeout { .. } => ErrorKind::Timeout,
            PredictError::Cancelled { .. } => ErrorKind::Cancelled,
            PredictError::Internal { .. } => ErrorKind::Internal,
            PredictError::ChildFailed { .. } => unreachable!("root_cause never returns ChildFailed"),
        }
    }

    /// Id of the unit where the failure originated, if a unit raised it.
    pub fn origin_unit(&self) -> Option<&str> {
        match self.root_cause() {
            PredictError::Inference { unit_id, .. }
            | PredictError::Routing { unit_id, .. }
            | PredictError::Merge { unit_id, .. }
            | PredictError::Transform { unit_id, .. }
            | PredictError::Cancelled { unit_id }
            | PredictError::Internal { unit_id, .. } => Some(unit_id.as_str()),
            PredictError::Timeout { .. } | PredictError::ChildFailed { .. } => None,
        }
    }

    /// Unit ids from the outermost wrapper down to the origin.
    pub fn path(&self) -> Vec<&str> {
        let mut path = Vec::new();
        let mut current = self;
        while let PredictError::ChildFailed {
            unit_id, source, ..
        } = current
        {
            path.push(unit_id.as_str());
            current = source;
        }
        if let Some(origin) = current.origin_unit() {
            path.push(origin);
        }
        path
    }

    /// Cancellation is a consequence of another failure, never a cause.
    pub fn is_cancellation(&self) -> bool {
        self.kind() == ErrorKind::Cancelled
    }

    /// Whether a `first_success` combiner may move on to its next child.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Timeout | ErrorKind::Cancelled)
    }
}
