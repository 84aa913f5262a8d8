// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Deserialize;
use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::config::consts::DEFAULT_MAX_CONCURRENCY;
use crate::errors::ConfigError;
use crate::observability::messages::validation::{ConfigLoaded, ValidationFailed};
use crate::observability::messages::StructuredLog;
use crate::units::{
    CombineStrategyName, ModelSpec, RouteRule, Transform, TransformPhase,
};

/// A predictor definition as written in a config file.
///
/// Units are declared flat and reference their children by id; the builder turns
/// them into a tree rooted at `root`.
///
/// # Example
/// ```yaml
/// name: income-ensemble
/// root: ensemble
/// executor_options:
///   max_concurrency: 4
///   deadline_ms: 500
/// units:
///   - id: ensemble
///     type: combiner
///     strategy: weighted_merge
///     weights: [3.0, 1.0]
///     children: [model_a, model_b]
///   - id: model_a
///     type: model
///     model: { name: income-a, implementation: constant, options: { output: { score: 0.8 } } }
///   - id: model_b
///     type: model
///     model: { name: income-b, implementation: constant, options: { output: { score: 0.4 } } }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct PredictorConfig {
    pub name: String,
    pub root: String,
    #[serde(default)]
    pub executor_options: ExecutorOptions,
    pub units: Vec<UnitConfig>,
}

/// Engine tuning knobs.
///
/// # Fields
/// * `max_concurrency` - Upper bound on model calls in flight at once (defaults to host parallelism)
/// * `deadline_ms` - Default per-request deadline, used when the request carries none
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecutorOptions {
    pub max_concurrency: Option<usize>,
    pub deadline_ms: Option<u64>,
}

impl ExecutorOptions {
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency.filter(|n| *n > 0).unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(DEFAULT_MAX_CONCURRENCY)
        })
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }

    /// Reject settings the executor cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_max_concurrency(self.max_concurrency())
    }
}

/// The request limiter is a tokio semaphore, which caps its permit count.
pub(crate) fn check_max_concurrency(max_concurrency: usize) -> Result<(), ConfigError> {
    if max_concurrency > Semaphore::MAX_PERMITS {
        return Err(ConfigError::InvalidExecutorOptions {
            reason: format!(
                "max_concurrency {} exceeds the limit of {}",
                max_concurrency,
                Semaphore::MAX_PERMITS
            ),
        });
    }
    Ok(())
}

/// One unit declaration.
#[derive(Debug, Clone, Deserialize)]
pub struct UnitConfig {
    pub id: String,
    /// Child unit ids in declared order
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(flatten)]
    pub kind: UnitKindConfig,
}

/// Kind-specific part of a unit declaration, selected by its `type` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UnitKindConfig {
    Model {
        model: ModelSpec,
    },
    Combiner {
        strategy: CombineStrategyName,
        #[serde(default)]
        weights: Option<Vec<f64>>,
    },
    Router {
        policy: RouterPolicyName,
        #[serde(default)]
        rules: Vec<RouteRule>,
        #[serde(default)]
        default: Option<usize>,
        #[serde(default)]
        weights: Option<Vec<f64>>,
        #[serde(default)]
        fan_out: Option<Vec<usize>>,
    },
    Transformer {
        #[serde(default)]
        phase: TransformPhase,
        transform: Transform,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouterPolicyName {
    Predicate,
    Weighted,
    FanOut,
}

/// Load a predictor config, picking the parser from the file extension.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PredictorConfig, ConfigError> {
    let path = path.as_ref();
    let format = path.extension().and_then(|ext| ext.to_str());
    if !matches!(format, Some("yaml" | "yml" | "toml")) {
        return Err(ConfigError::UnsupportedFormat {
            path: path.to_path_buf(),
        });
    }

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let cfg: PredictorConfig = match format {
        Some("toml") => toml::from_str(&content)?,
        _ => serde_yaml::from_str(&content)?,
    };

    ConfigLoaded {
        path: &path.display().to_string(),
        predictor: &cfg.name,
        unit_count: cfg.units.len(),
    }
    .log();

    Ok(cfg)
}

/// Load a config and run the structural checks on it.
///
/// Kind-specific checks run later, when the graph is built.
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<PredictorConfig, ConfigError> {
    let cfg = load_config(path)?;

    if let Err(validation_errors) = crate::config::validate_predictor_graph(&cfg) {
        let first_error = validation_errors
            .first()
            .map(|e| e.to_string())
            .unwrap_or_default();
        ValidationFailed {
            predictor: &cfg.name,
            error_count: validation_errors.len(),
            first_error: &first_error,
        }
        .log();
        return Err(ConfigError::Validation(validation_errors));
    }
    cfg.executor_options.validate()?;

    Ok(cfg)
}
