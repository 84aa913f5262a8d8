// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod backends;   // inference clients
pub mod config;     // config loading + validation
pub mod engine;     // request execution + feedback
pub mod errors;     // error handling
pub mod graph;      // immutable unit tree
pub mod observability;
pub mod traits;     // collaborator seams
pub mod units;      // per-kind behaviour
