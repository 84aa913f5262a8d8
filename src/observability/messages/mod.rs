// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message is a small struct with a `Display` impl for the human-readable
//! line and a [`StructuredLog`] impl that emits the same event with typed fields
//! at the message's level.
//!
//! # Organization
//!
//! * `engine` - request lifecycle: start, completion, failure, deadline
//! * `unit` - per-unit execution and routing decisions
//! * `feedback` - feedback propagation along a recorded trace
//! * `validation` - graph loading and activation
//!
//! # Usage Pattern
//!
//! ```rust
//! use predictor_dag::observability::messages::{engine::PredictionStarted, StructuredLog};
//!
//! let msg = PredictionStarted {
//!     predictor: "income-ensemble",
//!     request_id: "9f2c",
//!     unit_count: 3,
//! };
//!
//! msg.log();
//! ```

use tracing::Span;

pub mod engine;
pub mod feedback;
pub mod unit;
pub mod validation;

/// Emit a message as a structured `tracing` event, or open a span carrying its fields.
pub trait StructuredLog {
    fn log(&self);

    fn span(&self, _name: &str) -> Span {
        Span::none()
    }
}
