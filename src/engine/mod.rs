// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Request execution and feedback.
//!
//! [`PredictorEngine`] owns the active graph and runs requests against it.
//! Composite units fan their children out as `tokio` tasks under a single
//! engine-wide limit on in-flight model calls; the first failure cancels the
//! rest of the request. Each successful response carries a [`RequestContext`]
//! whose trace later drives [`PredictorEngine::send_feedback`].

mod context;
mod dispatch;
mod executor;
mod feedback;


pub use context::{
    FeedbackRecord, PredictionRequest, PredictionResponse, PredictionResult, RequestContext,
    Trace, TraceEntry,
};
pub use executor::{EngineOptions, PredictorEngine};
pub use feedback::{FeedbackPropagator, FeedbackSummary};
