// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Per-request data: what goes in, what comes out, and the recorded path.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use crate::config::consts::REQUEST_ID_HEX_DIGITS;
use crate::graph::UnitKindName;

/// An inbound prediction call.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRequest {
    pub payload: Value,
    /// Generated when absent
    pub request_id: Option<String>,
    /// Seed for weighted routers. Drawn at random when absent.
    pub seed: Option<u64>,
    /// Overrides the engine's default deadline
    pub deadline: Option<Duration>,
}

impl PredictionRequest {
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            request_id: None,
            seed: None,
            deadline: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

pub(crate) fn generate_request_id() -> String {
    format!(
        "{:0width$x}",
        rand::random::<u64>(),
        width = REQUEST_ID_HEX_DIGITS
    )
}

/// Output of a unit, or of the whole graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub payload: Value,
    /// Leaf units whose output flowed into `payload`
    pub origin_node_ids: BTreeSet<String>,
}

/// One invoked unit and the children it used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub unit_id: String,
    pub kind: UnitKindName,
    /// Declared indices of the children that contributed; empty for leaves
    pub chosen: Vec<usize>,
}

impl TraceEntry {
    pub fn new(unit_id: impl Into<String>, kind: UnitKindName, chosen: Vec<usize>) -> Self {
        Self {
            unit_id: unit_id.into(),
            kind,
            chosen,
        }
    }
}

/// The path a request took through the graph, in pre-order.
///
/// A unit's entry is followed by the sub-traces of its contributing children in
/// declared order, so the trace is the same for a given graph, payload and seed
/// no matter how the children were scheduled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Trace(Vec<TraceEntry>);

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: TraceEntry) {
        self.0.push(entry);
    }

    pub fn append(&mut self, mut other: Trace) {
        self.0.append(&mut other.0);
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TraceEntry> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn unit_ids(&self) -> Vec<&str> {
        self.0.iter().map(|e| e.unit_id.as_str()).collect()
    }

    pub fn contains(&self, unit_id: &str) -> bool {
        self.0.iter().any(|e| e.unit_id == unit_id)
    }
}

impl From<Vec<TraceEntry>> for Trace {
    fn from(entries: Vec<TraceEntry>) -> Self {
        Self(entries)
    }
}

impl<'a> IntoIterator for &'a Trace {
    type Item = &'a TraceEntry;
    type IntoIter = std::slice::Iter<'a, TraceEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Everything about a finished request that feedback needs later.
///
/// Serializable so callers can park it next to the response and replay feedback
/// once the ground truth arrives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    pub request_id: String,
    pub seed: u64,
    /// Router id to the branches it chose for this request
    pub routing: BTreeMap<String, Vec<usize>>,
    pub trace: Trace,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>, seed: u64, trace: Trace) -> Self {
        let routing = trace
            .iter()
            .filter(|entry| entry.kind == UnitKindName::Router)
            .map(|entry| (entry.unit_id.clone(), entry.chosen.clone()))
            .collect();
        Self {
            request_id: request_id.into(),
            seed,
            routing,
            trace,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub result: PredictionResult,
    pub context: RequestContext,
}

/// A reward (and optionally the true label) for a completed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub reward: f64,
    #[serde(default)]
    pub truth: Option<Value>,
}

impl FeedbackRecord {
    pub fn new(reward: f64) -> Self {
        Self {
            reward,
            truth: None,
        }
    }

    pub fn with_truth(mut self, truth: Value) -> Self {
        self.truth = Some(truth);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_context_derives_routing_from_trace() {
        let trace = Trace::from(vec![
            TraceEntry::new("root", UnitKindName::Router, vec![1]),
            TraceEntry::new("ensemble", UnitKindName::Combiner, vec![0, 1]),
            TraceEntry::new("a", UnitKindName::Model, vec![]),
            TraceEntry::new("b", UnitKindName::Model, vec![]),
        ]);
        let context = RequestContext::new("req", 7, trace);
        assert_eq!(context.routing.len(), 1);
        assert_eq!(context.routing["root"], vec![1]);
        assert_eq!(context.trace.unit_ids(), vec!["root", "ensemble", "a", "b"]);
    }

    #[test]
    fn test_context_survives_json() {
        let trace = Trace::from(vec![
            TraceEntry::new("root", UnitKindName::Router, vec![0]),
            TraceEntry::new("m", UnitKindName::Model, vec![]),
        ]);
        let context = RequestContext::new("req", 42, trace);
        let stored = serde_json::to_value(&context).unwrap();
        assert_eq!(stored["trace"][0], json!({"unit_id": "root", "kind": "router", "chosen": [0]}));
        let restored: RequestContext = serde_json::from_value(stored).unwrap();
        assert_eq!(restored, context);
    }

    #[test]
    fn test_generated_request_ids() {
        let id = generate_request_id();
        assert_eq!(id.len(), REQUEST_ID_HEX_DIGITS);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
