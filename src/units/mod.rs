// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Behaviour of the four unit kinds.
//!
//! * `model` - leaf inference through the [`InferenceClient`](crate::traits::InferenceClient)
//! * `combiner` - deterministic merge of ordered child results
//! * `router` - branch selection by predicate, weight or fixed fan-out
//! * `transformer` - synchronous payload rewrites around at most one child
//!
//! Feedback hooks for every kind live in `feedback`.

pub mod combiner;
pub mod feedback;
pub mod model;
pub mod payload;
pub mod router;
pub mod transformer;

pub use combiner::{CombineStrategy, CombineStrategyName};
pub use model::ModelSpec;
pub use router::{CompareOp, Predicate, RouteRule, RoutingPolicy};
pub use transformer::{Transform, TransformPhase, TransformerSpec};
