// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod inference;
pub mod metrics;

pub use inference::InferenceClient;
pub use metrics::{MetricTags, MetricsSink};
