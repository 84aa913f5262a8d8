// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod execution;
mod feedback;
mod inference;

pub use config::{ConfigError, ValidationError};
pub use execution::{ErrorKind, PredictError};
pub use feedback::FeedbackError;
pub use inference::InferenceError;
