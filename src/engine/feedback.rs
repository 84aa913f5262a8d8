// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Delivery of rewards along a recorded trace.
//!
//! Feedback visits exactly the units listed in the request's trace, in trace
//! order, and never re-runs routing: a router is told which branches it picked
//! from the recorded `chosen` indices. Units that no longer exist in the live
//! graph (or changed kind since the request ran) are skipped.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::Instrument;

use crate::engine::{FeedbackRecord, RequestContext};
use crate::graph::PredictorGraph;
use crate::observability::messages::feedback::{
    FeedbackDelivered, FeedbackFailed, FeedbackPropagationCompleted, FeedbackPropagationStarted,
    FeedbackSkipped,
};
use crate::observability::messages::StructuredLog;
use crate::traits::{InferenceClient, MetricsSink};
use crate::units::feedback::{on_feedback, FeedbackServices};

/// What happened to each unit of a trace during feedback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSummary {
    pub delivered: Vec<String>,
    /// Units in the trace that the live graph no longer has
    pub skipped: Vec<String>,
    /// Unit id and the rendered error
    pub failed: Vec<(String, String)>,
}

impl FeedbackSummary {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.failed.is_empty()
    }
}

pub struct FeedbackPropagator {
    graph: Arc<PredictorGraph>,
    inference: Arc<dyn InferenceClient>,
    metrics: Arc<dyn MetricsSink>,
}

impl FeedbackPropagator {
    pub fn new(
        graph: Arc<PredictorGraph>,
        inference: Arc<dyn InferenceClient>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            graph,
            inference,
            metrics,
        }
    }

    /// Hand `feedback` to every unit in `context.trace`.
    ///
    /// Hooks run one at a time in trace order. A failing hook is logged and
    /// recorded; the walk carries on.
    pub async fn propagate(
        &self,
        context: &RequestContext,
        feedback: &FeedbackRecord,
    ) -> FeedbackSummary {
        let started = FeedbackPropagationStarted {
            predictor: self.graph.name(),
            request_id: &context.request_id,
            reward: feedback.reward,
            trace_len: context.trace.len(),
        };
        started.log();
        let span = started.span("propagate_feedback");

        let summary = self.walk(context, feedback).instrument(span).await;

        FeedbackPropagationCompleted {
            request_id: &context.request_id,
            delivered: summary.delivered.len(),
            skipped: summary.skipped.len(),
            failed: summary.failed.len(),
        }
        .log();
        summary
    }

    async fn walk(&self, context: &RequestContext, feedback: &FeedbackRecord) -> FeedbackSummary {
        let services = FeedbackServices {
            predictor: self.graph.name(),
            inference: self.inference.as_ref(),
            metrics: self.metrics.as_ref(),
        };
        let mut summary = FeedbackSummary::default();

        for entry in &context.trace {
            let node = match self.graph.unit(&entry.unit_id) {
                Some(node) if node.kind().name() == entry.kind => node,
                _ => {
                    FeedbackSkipped {
                        unit_id: &entry.unit_id,
                        predictor: self.graph.name(),
                    }
                    .log();
                    summary.skipped.push(entry.unit_id.clone());
                    continue;
                }
            };

            match on_feedback(node, &entry.chosen, feedback, &services).await {
                Ok(()) => {
                    FeedbackDelivered {
                        unit_id: node.id(),
                        kind: entry.kind.as_str(),
                    }
                    .log();
                    summary.delivered.push(entry.unit_id.clone());
                }
                Err(error) => {
                    FeedbackFailed {
                        unit_id: node.id(),
                        error: &error,
                    }
                    .log();
                    summary.failed.push((entry.unit_id.clone(), error.to_string()));
                }
            }
        }

        summary
    }
}
