// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and metrics.
//!
//! Log lines are produced by small message structs (see [`messages`]) with a
//! `Display` impl and a [`StructuredLog`](messages::StructuredLog) impl, so there
//! are no format strings scattered through the engine.
//!
//! # Architecture
//!
//! * `messages::engine` - request lifecycle
//! * `messages::unit` - unit execution and routing
//! * `messages::feedback` - feedback propagation
//! * `messages::validation` - config loading and graph activation
//! * `metrics` - metric names and [`MetricsSink`](crate::traits::MetricsSink) implementations
//!
//! # Usage
//!
//! ```rust
//! use predictor_dag::observability::messages::unit::UnitExecutionFailed;
//!
//! let error = std::io::Error::new(std::io::ErrorKind::Other, "test error");
//! let msg = UnitExecutionFailed {
//!     unit_id: "model_a",
//!     kind: "model",
//!     error: &error,
//! };
//!
//! tracing::warn!("{}", msg);
//! ```

pub mod messages;
pub mod metrics;
