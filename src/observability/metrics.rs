// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! [`MetricsSink`] implementations and the metric names the engine emits.

use std::sync::Mutex;

use crate::traits::{MetricTags, MetricsSink};

pub mod names {
    /// Prediction requests received.
    pub const REQUESTS: &str = "predictor_requests_total";
    /// Failed prediction requests, tagged by error kind.
    pub const REQUEST_ERRORS: &str = "predictor_request_errors_total";
    pub const REQUEST_LATENCY_MS: &str = "predictor_request_latency_ms";

    /// Model unit invocations.
    pub const UNIT_REQUESTS: &str = "predictor_unit_requests_total";
    pub const UNIT_ERRORS: &str = "predictor_unit_errors_total";
    pub const UNIT_LATENCY_MS: &str = "predictor_unit_latency_ms";

    pub const MODEL_FEEDBACK: &str = "predictor_model_feedback_total";
    pub const MODEL_FEEDBACK_REWARD: &str = "predictor_model_feedback_reward";
    pub const ROUTER_FEEDBACK: &str = "predictor_router_feedback_total";
    pub const ROUTER_FEEDBACK_REWARD: &str = "predictor_router_feedback_reward";
    pub const UNIT_FEEDBACK: &str = "predictor_unit_feedback_total";
}

/// Forwards to the process-wide recorder installed through the `metrics` crate.
///
/// Counters become `metrics` counters and recorded values become histograms.
/// With no recorder installed every call is a no-op.
#[derive(Debug, Default, Clone, Copy)]
pub struct FacadeMetricsSink;

impl FacadeMetricsSink {
    fn labels(tags: &MetricTags) -> Vec<metrics::Label> {
        tags.iter()
            .map(|(key, value)| metrics::Label::new(key.clone(), value.clone()))
            .collect()
    }
}

impl MetricsSink for FacadeMetricsSink {
    fn increment(&self, name: &str, tags: &MetricTags) {
        metrics::counter!(name.to_string(), Self::labels(tags)).increment(1);
    }

    fn record_value(&self, name: &str, tags: &MetricTags, amount: f64) {
        metrics::histogram!(name.to_string(), Self::labels(tags)).record(amount);
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetricsSink;

impl MetricsSink for NoopMetricsSink {
    fn increment(&self, _name: &str, _tags: &MetricTags) {}

    fn record_value(&self, _name: &str, _tags: &MetricTags, _amount: f64) {}
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricEvent {
    pub name: String,
    pub tags: MetricTags,
    /// `1.0` for increments, the recorded amount otherwise
    pub amount: f64,
    pub is_counter: bool,
}

/// Keeps every event in memory. Used by the CLI summary and by tests.
#[derive(Debug, Default)]
pub struct RecordingMetricsSink {
    events: Mutex<Vec<MetricEvent>>,
}

impl RecordingMetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<MetricEvent> {
        self.lock().clone()
    }

    /// Number of increments recorded under `name`.
    pub fn count(&self, name: &str) -> usize {
        self.lock()
            .iter()
            .filter(|e| e.is_counter && e.name == name)
            .count()
    }

    /// Number of increments under `name` whose `key` tag equals `value`.
    pub fn count_tagged(&self, name: &str, key: &str, value: &str) -> usize {
        self.lock()
            .iter()
            .filter(|e| e.is_counter && e.name == name && e.tags.get(key) == Some(value))
            .count()
    }

    /// Sum of every value recorded under `name`.
    pub fn sum(&self, name: &str) -> f64 {
        self.lock()
            .iter()
            .filter(|e| !e.is_counter && e.name == name)
            .map(|e| e.amount)
            .sum()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<MetricEvent>> {
        // A panicking writer cannot leave a Vec half-pushed, so the data is still usable.
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push(&self, name: &str, tags: &MetricTags, amount: f64, is_counter: bool) {
        self.lock().push(MetricEvent {
            name: name.to_string(),
            tags: tags.clone(),
            amount,
            is_counter,
        });
    }
}

impl MetricsSink for RecordingMetricsSink {
    fn increment(&self, name: &str, tags: &MetricTags) {
        self.push(name, tags, 1.0, true);
    }

    fn record_value(&self, name: &str, tags: &MetricTags, amount: f64) {
        self.push(name, tags, amount, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_counts_and_sums() {
        let sink = RecordingMetricsSink::new();
        let tags = MetricTags::new().with("unit", "model_a");

        sink.increment(names::MODEL_FEEDBACK, &tags);
        sink.increment(names::MODEL_FEEDBACK, &MetricTags::new().with("unit", "model_b"));
        sink.record_value(names::MODEL_FEEDBACK_REWARD, &tags, 0.5);
        sink.record_value(names::MODEL_FEEDBACK_REWARD, &tags, 1.0);

        assert_eq!(sink.count(names::MODEL_FEEDBACK), 2);
        assert_eq!(sink.count_tagged(names::MODEL_FEEDBACK, "unit", "model_a"), 1);
        assert_eq!(sink.count(names::MODEL_FEEDBACK_REWARD), 0);
        assert_eq!(sink.sum(names::MODEL_FEEDBACK_REWARD), 1.5);
        assert_eq!(sink.events().len(), 4);
    }

    #[test]
    fn test_facade_sink_without_recorder_is_silent() {
        let sink = FacadeMetricsSink;
        let tags = MetricTags::new().with("unit", "m");
        sink.increment(names::REQUESTS, &tags);
        sink.record_value(names::REQUEST_LATENCY_MS, &tags, 3.0);
    }
}
