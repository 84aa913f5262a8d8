// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::Value;

use crate::engine::FeedbackRecord;
use crate::errors::InferenceError;
use crate::units::ModelSpec;

/// The collaborator that actually scores payloads for model units.
///
/// Calls are raced against the request's cancellation token, so dropping the
/// returned future must be a safe way to abandon an in-flight call.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Score `payload` with the model described by `model`.
    async fn score(&self, payload: &Value, model: &ModelSpec) -> Result<Value, InferenceError>;

    /// Forward a reward to the model behind `model`. Best effort.
    async fn send_feedback(
        &self,
        _feedback: &FeedbackRecord,
        _model: &ModelSpec,
    ) -> Result<(), InferenceError> {
        Ok(())
    }

    /// Reject model specs this client can never serve. Called once at graph activation.
    fn validate(&self, _model: &ModelSpec) -> Result<(), InferenceError> {
        Ok(())
    }

    fn name(&self) -> &'static str;
}
