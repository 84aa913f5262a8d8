// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Inference client implementations.
//!
//! Model units never score anything themselves: they hand their payload to the
//! engine's [`InferenceClient`](crate::traits::InferenceClient). This module
//! provides the clients that ship with the crate.
//!
//! # Available Backends
//!
//! ## Local Backend
//! In-process scorers selected by a model's `implementation`:
//! - **echo**: returns the payload unchanged
//! - **constant**: returns the configured `output`
//! - **linear**: bias plus weighted sum of numeric features
//!
//! ## Stub Backend (Test-Only)
//! Scriptable client for engine tests (only available in test builds):
//! - per-model responses, failures and delays
//! - call, feedback and in-flight counters
//!
//! # Examples
//!
//! ```rust
//! use predictor_dag::backends::local::LocalInferenceClient;
//! use predictor_dag::traits::InferenceClient;
//! use predictor_dag::units::ModelSpec;
//!
//! let client = LocalInferenceClient::new();
//! assert!(client.validate(&ModelSpec::new("income", "echo")).is_ok());
//! assert!(client.validate(&ModelSpec::new("income", "xgboost")).is_err());
//! ```

pub mod local;
#[cfg(test)]
pub mod stub;
