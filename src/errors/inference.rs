// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::time::Duration;
use thiserror::Error;

/// Failures reported by an inference collaborator.
///
/// The engine never retries on these; retry policy belongs to the collaborator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
    /// No scorer is registered under the model's implementation name.
    #[error("Unknown model implementation: '{0}'")]
    UnknownModel(String),

    /// The model's options cannot be used to score anything.
    #[error("Invalid options for model '{model}': {reason}")]
    InvalidOptions { model: String, reason: String },

    /// The payload does not have the shape the model expects.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The backing service failed or is unavailable.
    #[error("Model backend error: {0}")]
    Backend(String),

    /// The collaborator gave up waiting on its backend.
    #[error("Model call timed out after {0:?}")]
    Timeout(Duration),
}
