// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Scriptable inference client for engine tests.
//!
//! Behaviour is keyed by model name. Models without a script echo their payload.
//! Every call is counted, and the client tracks how many calls were in flight at
//! once so tests can check the concurrency limit.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::engine::FeedbackRecord;
use crate::errors::InferenceError;
use crate::traits::InferenceClient;
use crate::units::ModelSpec;

#[derive(Debug, Clone)]
enum Outcome {
    Echo,
    Respond(Value),
    Fail(String),
}

#[derive(Debug, Clone)]
struct Script {
    delay: Option<Duration>,
    outcome: Outcome,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            delay: None,
            outcome: Outcome::Echo,
        }
    }
}

#[derive(Debug, Default)]
pub struct StubInferenceClient {
    scripts: HashMap<String, Script>,
    rejected_feedback: HashSet<String>,
    rejected_models: HashSet<String>,
    calls: Mutex<HashMap<String, usize>>,
    feedback: Mutex<HashMap<String, usize>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl StubInferenceClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Model `name` returns `output`.
    pub fn respond(mut self, name: &str, output: Value) -> Self {
        self.scripts.entry(name.to_string()).or_default().outcome = Outcome::Respond(output);
        self
    }

    /// Model `name` fails with a backend error.
    pub fn fail(mut self, name: &str, message: &str) -> Self {
        self.scripts.entry(name.to_string()).or_default().outcome =
            Outcome::Fail(message.to_string());
        self
    }

    /// Model `name` sleeps for `delay` before producing its outcome.
    pub fn delay(mut self, name: &str, delay: Duration) -> Self {
        self.scripts.entry(name.to_string()).or_default().delay = Some(delay);
        self
    }

    pub fn reject_feedback(mut self, name: &str) -> Self {
        self.rejected_feedback.insert(name.to_string());
        self
    }

    /// Model `name` fails activation.
    pub fn reject_model(mut self, name: &str) -> Self {
        self.rejected_models.insert(name.to_string());
        self
    }

    /// Number of `score` calls that started for model `name`.
    pub fn calls(&self, name: &str) -> usize {
        count(&self.calls, name)
    }

    pub fn total_calls(&self) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.values().sum())
            .unwrap_or_default()
    }

    pub fn feedback_for(&self, name: &str) -> usize {
        count(&self.feedback, name)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

fn count(counter: &Mutex<HashMap<String, usize>>, name: &str) -> usize {
    counter
        .lock()
        .map(|counts| counts.get(name).copied().unwrap_or_default())
        .unwrap_or_default()
}

fn bump(counter: &Mutex<HashMap<String, usize>>, name: &str) {
    if let Ok(mut counts) = counter.lock() {
        *counts.entry(name.to_string()).or_default() += 1;
    }
}

/// Decrements the in-flight count when the call finishes or is dropped.
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn enter(in_flight: &Arc<AtomicUsize>, max_in_flight: &AtomicUsize) -> Self {
        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        max_in_flight.fetch_max(now, Ordering::SeqCst);
        Self(Arc::clone(in_flight))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl InferenceClient for StubInferenceClient {
    async fn score(&self, payload: &Value, model: &ModelSpec) -> Result<Value, InferenceError> {
        bump(&self.calls, &model.name);
        let _in_flight = InFlight::enter(&self.in_flight, &self.max_in_flight);
        let script = self.scripts.get(&model.name).cloned().unwrap_or_default();

        if let Some(delay) = script.delay {
            tokio::time::sleep(delay).await;
        }

        match script.outcome {
            Outcome::Echo => Ok(payload.clone()),
            Outcome::Respond(output) => Ok(output),
            Outcome::Fail(message) => Err(InferenceError::Backend(message)),
        }
    }

    async fn send_feedback(
        &self,
        _feedback: &FeedbackRecord,
        model: &ModelSpec,
    ) -> Result<(), InferenceError> {
        if self.rejected_feedback.contains(&model.name) {
            return Err(InferenceError::Backend(format!(
                "feedback endpoint for '{}' unavailable",
                model.name
            )));
        }
        bump(&self.feedback, &model.name);
        Ok(())
    }

    fn validate(&self, model: &ModelSpec) -> Result<(), InferenceError> {
        if self.rejected_models.contains(&model.name) {
            return Err(InferenceError::UnknownModel(model.name.clone()));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}
