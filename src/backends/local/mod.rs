// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod client;
pub mod scorers;

pub use client::LocalInferenceClient;
pub use scorers::LocalScorer;
