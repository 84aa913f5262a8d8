// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use super::InferenceError;
use thiserror::Error;

/// Failure inside a unit's feedback hook. Logged per unit, never propagated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeedbackError {
    /// The recorded branch no longer exists on the live router.
    #[error("Router '{unit_id}' has no child at recorded index {index} ({child_count} children)")]
    StaleRoute {
        unit_id: String,
        index: usize,
        child_count: usize,
    },

    /// The inference collaborator rejected the forwarded feedback.
    #[error("Feedback delivery to model unit '{unit_id}' failed: {source}")]
    Delivery {
        unit_id: String,
        #[source]
        source: InferenceError,
    },
}
