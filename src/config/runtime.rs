// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use crate::config::PredictorConfig;
use crate::engine::{EngineOptions, PredictorEngine};
use crate::errors::ConfigError;
use crate::graph::PredictorGraph;
use crate::traits::{InferenceClient, MetricsSink};

/// Predictor runtime builder - turns a loaded config into a running engine.
///
/// Builds the unit tree, runs the kind-specific checks, and activates the graph
/// against the given inference client.
///
/// # Examples
///
/// ```
/// use predictor_dag::backends::local::LocalInferenceClient;
/// use predictor_dag::config::{PredictorConfig, RuntimeBuilder};
/// use predictor_dag::observability::metrics::NoopMetricsSink;
/// use std::sync::Arc;
///
/// let cfg: PredictorConfig = serde_yaml::from_str(r#"
/// name: echo
/// root: m
/// executor_options: { max_concurrency: 2 }
/// units:
///   - id: m
///     type: model
///     model: { name: echo, implementation: echo }
/// "#).unwrap();
///
/// let engine = RuntimeBuilder::from_config(
///     &cfg,
///     Arc::new(LocalInferenceClient::new()),
///     Arc::new(NoopMetricsSink),
/// ).unwrap();
/// assert_eq!(engine.options().max_concurrency, 2);
/// ```
pub struct RuntimeBuilder;

impl RuntimeBuilder {
    /// Build a ready-to-serve engine from `cfg`.
    ///
    /// # Arguments
    /// * `cfg` - Predictor definition, including executor options
    /// * `inference` - Scores model units and receives their feedback
    /// * `metrics` - Receives request, unit and feedback metrics
    pub fn from_config(
        cfg: &PredictorConfig,
        inference: Arc<dyn InferenceClient>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Result<PredictorEngine, ConfigError> {
        let graph = PredictorGraph::from_config(cfg)?;
        PredictorEngine::new(
            graph,
            inference,
            metrics,
            EngineOptions::from(&cfg.executor_options),
        )
    }
}
