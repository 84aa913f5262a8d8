// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::Value;

use super::scorers::LocalScorer;
use crate::engine::FeedbackRecord;
use crate::errors::InferenceError;
use crate::traits::InferenceClient;
use crate::units::ModelSpec;

/// Inference client that scores every model in-process.
///
/// Model specs are resolved to a [`LocalScorer`] on each call; specs that can
/// never be scored are rejected up front by [`validate`](InferenceClient::validate).
#[derive(Debug, Default, Clone)]
pub struct LocalInferenceClient;

impl LocalInferenceClient {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl InferenceClient for LocalInferenceClient {
    async fn score(&self, payload: &Value, model: &ModelSpec) -> Result<Value, InferenceError> {
        LocalScorer::from_spec(model)?.score(payload)
    }

    async fn send_feedback(
        &self,
        feedback: &FeedbackRecord,
        model: &ModelSpec,
    ) -> Result<(), InferenceError> {
        // Local scorers are static; nothing learns from the reward.
        tracing::debug!(
            model_name = %model.name,
            reward = feedback.reward,
            "Local model received feedback"
        );
        Ok(())
    }

    fn validate(&self, model: &ModelSpec) -> Result<(), InferenceError> {
        LocalScorer::from_spec(model).map(|_| ())
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_scores_through_trait_object() {
        let client: Box<dyn InferenceClient> = Box::new(LocalInferenceClient::new());
        let spec = ModelSpec::new("a", "constant").with_option("output", json!({"score": 0.4}));

        assert!(client.validate(&spec).is_ok());
        assert_eq!(
            client.score(&json!({}), &spec).await.unwrap(),
            json!({"score": 0.4})
        );
        assert!(client
            .send_feedback(&FeedbackRecord::new(1.0), &spec)
            .await
            .is_ok());
        assert_eq!(client.name(), "local");
    }

    #[test]
    fn test_validate_rejects_unknown_implementation() {
        let client = LocalInferenceClient::new();
        assert_eq!(
            client.validate(&ModelSpec::new("x", "tensorflow")),
            Err(InferenceError::UnknownModel("tensorflow".into()))
        );
        for implementation in LocalScorer::list_available_implementations() {
            assert_ne!(
                client.validate(&ModelSpec::new("x", implementation)),
                Err(InferenceError::UnknownModel(implementation.into()))
            );
        }
    }
}
