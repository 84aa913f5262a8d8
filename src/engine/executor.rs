// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Recursive execution of a predictor graph.
//!
//! Each unit runs as a future that owns everything it needs (`Arc`s into the
//! shared graph and collaborators, its own payload), so composites can hand their
//! children to `tokio` tasks without borrowing across tasks. The only mutable
//! per-request state is the outcome each unit returns to its parent.

use serde_json::Value;
use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::{check_max_concurrency, ExecutorOptions};
use crate::engine::context::generate_request_id;
use crate::engine::dispatch::{run_children, JoinPolicy};
use crate::engine::feedback::{FeedbackPropagator, FeedbackSummary};
use crate::engine::{
    FeedbackRecord, PredictionRequest, PredictionResponse, PredictionResult, RequestContext,
    Trace, TraceEntry,
};
use crate::errors::{ConfigError, PredictError};
use crate::graph::{PredictorGraph, UnitKind, UnitNode};
use crate::observability::messages::engine::{
    DeadlineExceeded, PredictionCompleted, PredictionFailed, PredictionStarted,
};
use crate::observability::messages::unit::{
    RouteSelected, UnitExecutionCompleted, UnitExecutionFailed, UnitExecutionStarted,
};
use crate::observability::messages::validation::GraphActivated;
use crate::observability::messages::StructuredLog;
use crate::observability::metrics::names;
use crate::traits::{InferenceClient, MetricTags, MetricsSink};
use crate::units::{CombineStrategy, ModelSpec, RoutingPolicy, TransformPhase, TransformerSpec};

/// Runtime knobs of a [`PredictorEngine`].
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    /// Model calls allowed in flight at once, across all requests
    pub max_concurrency: usize,
    /// Deadline for requests that do not carry their own
    pub default_deadline: Option<std::time::Duration>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions::from(&ExecutorOptions::default())
    }
}

impl From<&ExecutorOptions> for EngineOptions {
    fn from(options: &ExecutorOptions) -> Self {
        Self {
            max_concurrency: options.max_concurrency(),
            default_deadline: options.deadline(),
        }
    }
}

/// Executes prediction requests against an activated predictor graph.
///
/// The engine is shared by concurrent requests; each call to [`predict`](Self::predict)
/// snapshots the current graph, so a [`redeploy`](Self::redeploy) never changes a
/// request that is already running.
///
/// # Example
/// ```no_run
/// use predictor_dag::backends::local::LocalInferenceClient;
/// use predictor_dag::config::{load_and_validate_config, RuntimeBuilder};
/// use predictor_dag::engine::{FeedbackRecord, PredictionRequest};
/// use predictor_dag::observability::metrics::FacadeMetricsSink;
/// use serde_json::json;
/// use std::sync::Arc;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let cfg = load_and_validate_config("configs/ensemble.yaml")?;
/// let engine = RuntimeBuilder::from_config(
///     &cfg,
///     Arc::new(LocalInferenceClient::new()),
///     Arc::new(FacadeMetricsSink),
/// )?;
///
/// let response = engine
///     .predict(PredictionRequest::new(json!({"age": 42})).with_seed(7))
///     .await?;
/// engine
///     .send_feedback(&response.context, &FeedbackRecord::new(1.0))
///     .await;
/// # Ok(())
/// # }
/// ```
pub struct PredictorEngine {
    graph: RwLock<Arc<PredictorGraph>>,
    inference: Arc<dyn InferenceClient>,
    metrics: Arc<dyn MetricsSink>,
    limiter: Arc<Semaphore>,
    options: EngineOptions,
}

impl PredictorEngine {
    /// Activate `graph`. Fails if the inference client rejects any of its models.
    pub fn new(
        graph: PredictorGraph,
        inference: Arc<dyn InferenceClient>,
        metrics: Arc<dyn MetricsSink>,
        options: EngineOptions,
    ) -> Result<Self, ConfigError> {
        let max_concurrency = options.max_concurrency.max(1);
        check_max_concurrency(max_concurrency)?;
        activate(&graph, inference.as_ref(), max_concurrency)?;
        Ok(Self {
            graph: RwLock::new(Arc::new(graph)),
            inference,
            metrics,
            limiter: Arc::new(Semaphore::new(max_concurrency)),
            options: EngineOptions {
                max_concurrency,
                ..options
            },
        })
    }

    /// Snapshot of the active graph.
    pub fn graph(&self) -> Arc<PredictorGraph> {
        let guard = self.graph.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Swap in a new graph. Requests already running keep the old one.
    pub fn redeploy(&self, graph: PredictorGraph) -> Result<(), ConfigError> {
        activate(&graph, self.inference.as_ref(), self.options.max_concurrency)?;
        let mut guard = self.graph.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(graph);
        Ok(())
    }

    /// Run one request to completion.
    ///
    /// Returns the combined result with the context needed for feedback, or a
    /// single error describing where the request failed. Never a partial result.
    pub async fn predict(
        &self,
        request: PredictionRequest,
    ) -> Result<PredictionResponse, PredictError> {
        let graph = self.graph();
        let request_id = request.request_id.unwrap_or_else(generate_request_id);
        let seed = request.seed.unwrap_or_else(rand::random);
        let deadline = request.deadline.or(self.options.default_deadline);

        let started = PredictionStarted {
            predictor: graph.name(),
            request_id: &request_id,
            unit_count: graph.unit_count(),
        };
        started.log();
        let span = started.span("predict");

        let tags = MetricTags::new().with("predictor", graph.name());
        self.metrics.increment(names::REQUESTS, &tags);

        let scope = Arc::new(ExecutionScope {
            predictor: graph.name().to_string(),
            inference: Arc::clone(&self.inference),
            metrics: Arc::clone(&self.metrics),
            limiter: Arc::clone(&self.limiter),
            seed,
        });
        let request_token = CancellationToken::new();
        let start = Instant::now();

        let run = execute_unit(
            scope,
            Arc::clone(graph.root()),
            request.payload,
            request_token.clone(),
            false,
        );
        let outcome = async {
            match deadline {
                Some(deadline) => tokio::select! {
                    biased;
                    outcome = run => outcome,
                    _ = tokio::time::sleep(deadline) => {
                        request_token.cancel();
                        DeadlineExceeded {
                            predictor: graph.name(),
                            request_id: &request_id,
                            deadline,
                        }
                        .log();
                        Err(PredictError::Timeout { deadline })
                    }
                },
                None => run.await,
            }
        }
        .instrument(span)
        .await;

        let elapsed = start.elapsed();
        self.metrics
            .record_value(names::REQUEST_LATENCY_MS, &tags, elapsed.as_secs_f64() * 1000.0);

        match outcome {
            Ok(outcome) => {
                PredictionCompleted {
                    predictor: graph.name(),
                    request_id: &request_id,
                    units_visited: outcome.trace.len(),
                    duration: elapsed,
                }
                .log();
                Ok(PredictionResponse {
                    result: PredictionResult {
                        payload: outcome.payload,
                        origin_node_ids: outcome.origins,
                    },
                    context: RequestContext::new(request_id, seed, outcome.trace),
                })
            }
            Err(error) => {
                let kind = error.kind();
                self.metrics
                    .increment(names::REQUEST_ERRORS, &tags.clone().with("kind", kind.as_str()));
                PredictionFailed {
                    predictor: graph.name(),
                    request_id: &request_id,
                    error_kind: kind.as_str(),
                    error: &error,
                }
                .log();
                Err(error)
            }
        }
    }

    /// Route `feedback` along the trace recorded in `context`.
    ///
    /// Best effort: per-unit failures end up in the summary, never in an error.
    pub async fn send_feedback(
        &self,
        context: &RequestContext,
        feedback: &FeedbackRecord,
    ) -> FeedbackSummary {
        FeedbackPropagator::new(
            self.graph(),
            Arc::clone(&self.inference),
            Arc::clone(&self.metrics),
        )
        .propagate(context, feedback)
        .await
    }
}

fn activate(
    graph: &PredictorGraph,
    inference: &dyn InferenceClient,
    max_concurrency: usize,
) -> Result<(), ConfigError> {
    let mut model_count = 0;
    for node in graph.preorder() {
        if let UnitKind::Model(spec) = node.kind() {
            model_count += 1;
            inference
                .validate(spec)
                .map_err(|e| ConfigError::invalid_unit(node.id(), e.to_string()))?;
        }
    }
    GraphActivated {
        predictor: graph.name(),
        root: graph.root().id(),
        unit_count: graph.unit_count(),
        model_count,
        max_concurrency,
    }
    .log();
    Ok(())
}

/// Shared, read-only state of one request.
pub(crate) struct ExecutionScope {
    pub(crate) predictor: String,
    pub(crate) inference: Arc<dyn InferenceClient>,
    pub(crate) metrics: Arc<dyn MetricsSink>,
    pub(crate) limiter: Arc<Semaphore>,
    pub(crate) seed: u64,
}

/// What a unit hands back to its parent.
#[derive(Debug)]
pub(crate) struct UnitOutcome {
    pub(crate) payload: Value,
    pub(crate) origins: BTreeSet<String>,
    pub(crate) trace: Trace,
}

impl UnitOutcome {
    fn leaf(node: &UnitNode, payload: Value) -> Self {
        let mut trace = Trace::new();
        trace.push(TraceEntry::new(node.id(), node.kind().name(), Vec::new()));
        Self {
            payload,
            origins: BTreeSet::from([node.id().to_string()]),
            trace,
        }
    }
}

/// Children's outcomes pulled apart, still in declared order.
struct Contributions {
    chosen: Vec<usize>,
    payloads: Vec<Value>,
    origins: BTreeSet<String>,
    trace: Trace,
}

impl Contributions {
    fn collect(children: Vec<(usize, UnitOutcome)>) -> Self {
        let mut contributions = Contributions {
            chosen: Vec::with_capacity(children.len()),
            payloads: Vec::with_capacity(children.len()),
            origins: BTreeSet::new(),
            trace: Trace::new(),
        };
        for (index, outcome) in children {
            contributions.chosen.push(index);
            contributions.payloads.push(outcome.payload);
            contributions.origins.extend(outcome.origins);
            contributions.trace.append(outcome.trace);
        }
        contributions
    }

    fn into_outcome(self, node: &UnitNode, payload: Value) -> UnitOutcome {
        let mut trace = Trace::new();
        trace.push(TraceEntry::new(node.id(), node.kind().name(), self.chosen));
        trace.append(self.trace);
        UnitOutcome {
            payload,
            origins: self.origins,
            trace,
        }
    }
}

pub(crate) type UnitFuture = Pin<Box<dyn Future<Output = Result<UnitOutcome, PredictError>> + Send>>;

/// Execute `node` and everything below it.
///
/// `permit_held` is true when the parent already acquired a limiter permit on
/// this unit's behalf (model children of combiners and routers).
pub(crate) fn execute_unit(
    scope: Arc<ExecutionScope>,
    node: Arc<UnitNode>,
    payload: Value,
    cancel: CancellationToken,
    permit_held: bool,
) -> UnitFuture {
    Box::pin(async move {
        let kind = node.kind().name();
        let started = UnitExecutionStarted {
            unit_id: node.id(),
            kind: kind.as_str(),
        };
        started.log();
        let span = started.span("execute_unit");
        let start = Instant::now();

        let result = async {
            if cancel.is_cancelled() {
                return Err(PredictError::Cancelled {
                    unit_id: node.id().to_string(),
                });
            }
            match node.kind() {
                UnitKind::Model(spec) => {
                    execute_model(&scope, &node, spec, payload, &cancel, permit_held).await
                }
                UnitKind::Transformer(spec) => {
                    execute_transformer(&scope, &node, spec, payload, &cancel).await
                }
                UnitKind::Router(policy) => {
                    execute_router(&scope, &node, policy, payload, &cancel).await
                }
                UnitKind::Combiner(strategy) => {
                    execute_combiner(&scope, &node, strategy, payload, &cancel).await
                }
            }
        }
        .instrument(span)
        .await;

        match &result {
            Ok(_) => UnitExecutionCompleted {
                unit_id: node.id(),
                kind: kind.as_str(),
                duration: start.elapsed(),
            }
            .log(),
            // Child failures were already reported by the child itself.
            Err(PredictError::ChildFailed { .. }) => {}
            Err(error) if error.is_cancellation() => {}
            Err(error) => UnitExecutionFailed {
                unit_id: node.id(),
                kind: kind.as_str(),
                error,
            }
            .log(),
        }
        result
    })
}

pub(crate) async fn acquire_permit(
    limiter: &Arc<Semaphore>,
    unit_id: &str,
    cancel: &CancellationToken,
) -> Result<OwnedSemaphorePermit, PredictError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PredictError::Cancelled {
            unit_id: unit_id.to_string(),
        }),
        permit = Arc::clone(limiter).acquire_owned() => permit.map_err(|e| PredictError::Internal {
            unit_id: unit_id.to_string(),
            message: format!("concurrency limiter closed: {}", e),
        }),
    }
}

async fn execute_model(
    scope: &ExecutionScope,
    node: &UnitNode,
    spec: &ModelSpec,
    payload: Value,
    cancel: &CancellationToken,
    permit_held: bool,
) -> Result<UnitOutcome, PredictError> {
    let _permit = if permit_held {
        None
    } else {
        Some(acquire_permit(&scope.limiter, node.id(), cancel).await?)
    };

    let tags = spec.metric_tags(&scope.predictor, node.id());
    scope.metrics.increment(names::UNIT_REQUESTS, &tags);
    let start = Instant::now();

    // Dropping the in-flight call is how it gets cancelled.
    let scored = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            return Err(PredictError::Cancelled {
                unit_id: node.id().to_string(),
            });
        }
        scored = scope.inference.score(&payload, spec) => scored,
    };

    scope.metrics.record_value(
        names::UNIT_LATENCY_MS,
        &tags,
        start.elapsed().as_secs_f64() * 1000.0,
    );

    match scored {
        Ok(output) => Ok(UnitOutcome::leaf(node, output)),
        Err(source) => {
            scope.metrics.increment(names::UNIT_ERRORS, &tags);
            Err(PredictError::Inference {
                unit_id: node.id().to_string(),
                source,
            })
        }
    }
}

async fn execute_transformer(
    scope: &Arc<ExecutionScope>,
    node: &UnitNode,
    spec: &TransformerSpec,
    payload: Value,
    cancel: &CancellationToken,
) -> Result<UnitOutcome, PredictError> {
    let Some(child) = node.children().first() else {
        let rewritten = spec.apply(node.id(), payload)?;
        return Ok(UnitOutcome::leaf(node, rewritten));
    };

    let input = match spec.phase {
        TransformPhase::Input => spec.apply(node.id(), payload)?,
        TransformPhase::Output => payload,
    };

    let outcome = execute_unit(
        Arc::clone(scope),
        Arc::clone(child),
        input,
        cancel.clone(),
        false,
    )
    .await
    .map_err(|e| e.within(node.id(), child.id()))?;

    let mut contributions = Contributions::collect(vec![(0, outcome)]);
    let child_payload = contributions.payloads.pop().unwrap_or(Value::Null);
    let output = match spec.phase {
        TransformPhase::Input => child_payload,
        TransformPhase::Output => spec.apply(node.id(), child_payload)?,
    };
    Ok(contributions.into_outcome(node, output))
}

async fn execute_router(
    scope: &Arc<ExecutionScope>,
    node: &UnitNode,
    policy: &RoutingPolicy,
    payload: Value,
    cancel: &CancellationToken,
) -> Result<UnitOutcome, PredictError> {
    let selected = policy.route(node.id(), node.children().len(), &payload, scope.seed)?;
    RouteSelected {
        unit_id: node.id(),
        chosen: &selected,
        child_count: node.children().len(),
    }
    .log();

    let children =
        run_children(scope, node, &selected, &payload, cancel, JoinPolicy::AllRequired).await?;
    let mut contributions = Contributions::collect(children);

    let output = match policy {
        RoutingPolicy::FanOut { .. } => Value::Array(std::mem::take(&mut contributions.payloads)),
        RoutingPolicy::Predicate { .. } | RoutingPolicy::Weighted { .. } => {
            contributions.payloads.pop().ok_or_else(|| PredictError::Internal {
                unit_id: node.id().to_string(),
                message: "selected branch produced no result".to_string(),
            })?
        }
    };
    Ok(contributions.into_outcome(node, output))
}

async fn execute_combiner(
    scope: &Arc<ExecutionScope>,
    node: &UnitNode,
    strategy: &CombineStrategy,
    payload: Value,
    cancel: &CancellationToken,
) -> Result<UnitOutcome, PredictError> {
    let selected: Vec<usize> = (0..node.children().len()).collect();
    let policy = if strategy.tolerates_child_failure() {
        JoinPolicy::FirstSuccess
    } else {
        JoinPolicy::AllRequired
    };

    let children = run_children(scope, node, &selected, &payload, cancel, policy).await?;
    let mut contributions = Contributions::collect(children);
    let merged = strategy.combine(node.id(), std::mem::take(&mut contributions.payloads))?;
    Ok(contributions.into_outcome(node, merged))
}
