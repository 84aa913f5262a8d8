// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Per-kind feedback hooks.

use crate::engine::FeedbackRecord;
use crate::errors::FeedbackError;
use crate::graph::{UnitKind, UnitNode};
use crate::observability::metrics::names;
use crate::traits::{InferenceClient, MetricTags, MetricsSink};

/// Collaborators a feedback hook may touch.
pub struct FeedbackServices<'a> {
    pub predictor: &'a str,
    pub inference: &'a dyn InferenceClient,
    pub metrics: &'a dyn MetricsSink,
}

/// Record `feedback` against `node`, which picked `chosen` when the request ran.
///
/// Hooks only emit metrics and forward to collaborators; they never touch the graph.
pub async fn on_feedback(
    node: &UnitNode,
    chosen: &[usize],
    feedback: &FeedbackRecord,
    services: &FeedbackServices<'_>,
) -> Result<(), FeedbackError> {
    match node.kind() {
        UnitKind::Model(spec) => {
            let tags = spec.metric_tags(services.predictor, node.id());
            services.metrics.increment(names::MODEL_FEEDBACK, &tags);
            services
                .metrics
                .record_value(names::MODEL_FEEDBACK_REWARD, &tags, feedback.reward);
            services
                .inference
                .send_feedback(feedback, spec)
                .await
                .map_err(|source| FeedbackError::Delivery {
                    unit_id: node.id().to_string(),
                    source,
                })
        }
        UnitKind::Router(_) => {
            let child_count = node.children().len();
            if let Some(&index) = chosen.iter().find(|&&index| index >= child_count) {
                return Err(FeedbackError::StaleRoute {
                    unit_id: node.id().to_string(),
                    index,
                    child_count,
                });
            }
            let branch = chosen
                .iter()
                .map(|index| index.to_string())
                .collect::<Vec<_>>()
                .join(",");
            let tags = MetricTags::new()
                .with("predictor", services.predictor)
                .with("unit", node.id())
                .with("branch", branch);
            services.metrics.increment(names::ROUTER_FEEDBACK, &tags);
            services
                .metrics
                .record_value(names::ROUTER_FEEDBACK_REWARD, &tags, feedback.reward);
            Ok(())
        }
        UnitKind::Combiner(_) | UnitKind::Transformer(_) => {
            let tags = MetricTags::new()
                .with("predictor", services.predictor)
                .with("unit", node.id())
                .with("kind", node.kind().name().as_str());
            services.metrics.increment(names::UNIT_FEEDBACK, &tags);
            Ok(())
        }
    }
}
