// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The predictor graph: an immutable tree of units shared by every request.
//!
//! Nodes are reference counted so concurrent requests (and the tasks inside one
//! request) can hold on to any subtree without copying it. Nothing in here is
//! mutated after construction.

mod kind;

pub use kind::{UnitKind, UnitKindName};

use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::{ConfigError, ValidationError};
use crate::units::{CombineStrategy, ModelSpec, RoutingPolicy, TransformerSpec};

/// One step of a predictor graph.
#[derive(Debug)]
pub struct UnitNode {
    id: String,
    kind: UnitKind,
    children: Vec<Arc<UnitNode>>,
}

impl UnitNode {
    pub fn new(id: impl Into<String>, kind: UnitKind, children: Vec<Arc<UnitNode>>) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            kind,
            children,
        })
    }

    pub fn model(id: impl Into<String>, spec: ModelSpec) -> Arc<Self> {
        Self::new(id, UnitKind::Model(spec), Vec::new())
    }

    pub fn combiner(
        id: impl Into<String>,
        strategy: CombineStrategy,
        children: Vec<Arc<UnitNode>>,
    ) -> Arc<Self> {
        Self::new(id, UnitKind::Combiner(strategy), children)
    }

    pub fn router(
        id: impl Into<String>,
        policy: RoutingPolicy,
        children: Vec<Arc<UnitNode>>,
    ) -> Arc<Self> {
        Self::new(id, UnitKind::Router(policy), children)
    }

    pub fn transformer(
        id: impl Into<String>,
        spec: TransformerSpec,
        child: Option<Arc<UnitNode>>,
    ) -> Arc<Self> {
        Self::new(id, UnitKind::Transformer(spec), child.into_iter().collect())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> &UnitKind {
        &self.kind
    }

    pub fn children(&self) -> &[Arc<UnitNode>] {
        &self.children
    }

    pub fn is_model(&self) -> bool {
        matches!(self.kind, UnitKind::Model(_))
    }
}

/// A validated predictor graph.
#[derive(Debug)]
pub struct PredictorGraph {
    name: String,
    root: Arc<UnitNode>,
    units: HashMap<String, Arc<UnitNode>>,
}

impl PredictorGraph {
    /// Index the tree under `root` and run every kind-specific check.
    ///
    /// Fails if an id appears twice (including the same node reachable twice)
    /// or any unit's configuration cannot work with its children.
    pub fn new(name: impl Into<String>, root: Arc<UnitNode>) -> Result<Self, ConfigError> {
        let mut units = HashMap::new();
        let mut duplicates = Vec::new();
        let mut stack = vec![Arc::clone(&root)];

        while let Some(node) = stack.pop() {
            node.kind().validate(node.id(), node.children().len())?;
            stack.extend(node.children().iter().rev().cloned());
            if units.insert(node.id().to_string(), Arc::clone(&node)).is_some() {
                duplicates.push(ValidationError::DuplicateUnitId {
                    unit_id: node.id().to_string(),
                });
            }
        }

        if !duplicates.is_empty() {
            return Err(ConfigError::Validation(duplicates));
        }

        Ok(Self {
            name: name.into(),
            root,
            units,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Arc<UnitNode> {
        &self.root
    }

    pub fn unit(&self, id: &str) -> Option<&Arc<UnitNode>> {
        self.units.get(id)
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Every unit, parents before children, siblings in declared order.
    pub fn preorder(&self) -> Vec<&Arc<UnitNode>> {
        let mut ordered = Vec::with_capacity(self.units.len());
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            ordered.push(node);
            stack.extend(node.children().iter().rev());
        }
        ordered
    }
}
