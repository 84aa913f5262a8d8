// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod builder;
mod loader;
mod runtime;
mod validation;

pub mod consts;

pub(crate) use loader::check_max_concurrency;
pub use loader::{
    load_and_validate_config, load_config, ExecutorOptions, PredictorConfig, RouterPolicyName,
    UnitConfig, UnitKindConfig,
};
pub use runtime::RuntimeBuilder;
pub use validation::validate_predictor_graph;
