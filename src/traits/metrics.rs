// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Ordered key/value tags attached to a metric.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricTags(Vec<(String, String)>);

impl MetricTags {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.0.push((key.to_string(), value.into()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, String)> {
        self.0.iter()
    }
}

/// Process-wide metrics collaborator.
///
/// Implementations are fire-and-forget: they must not block and cannot fail the caller.
pub trait MetricsSink: Send + Sync {
    fn increment(&self, name: &str, tags: &MetricTags);

    fn record_value(&self, name: &str, tags: &MetricTags, amount: f64);
}
