// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Fallback for model concurrency when the host parallelism cannot be determined
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;
/// Tag value used when a model spec carries no version
pub const UNVERSIONED: &str = "unversioned";
/// Length, in hex digits, of generated request ids
pub const REQUEST_ID_HEX_DIGITS: usize = 16;
