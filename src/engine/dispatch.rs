// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Fan-out of a composite unit's children and the join that follows.
//!
//! Children are started in declared order, each as its own `tokio` task in a
//! `JoinSet`. Model children need a limiter permit before they start, and the
//! parent acquires it on their behalf, so a child still waiting for a permit has
//! not started. When the group settles early (a failure under `AllRequired`, a
//! winner under `FirstSuccess`) the queue is abandoned, the group token is
//! cancelled and dropping the `JoinSet` aborts whatever is still running.

use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, TryAcquireError};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::engine::executor::{acquire_permit, execute_unit, ExecutionScope, UnitOutcome};
use crate::errors::PredictError;
use crate::graph::UnitNode;
use crate::observability::messages::engine::SiblingsCancelled;
use crate::observability::messages::unit::FallbackUsed;
use crate::observability::messages::StructuredLog;

/// How a group of children settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JoinPolicy {
    /// Every child must succeed; the first failure settles the group.
    AllRequired,
    /// The lowest-index success wins once every lower index has failed.
    FirstSuccess,
}

type ChildResult = (usize, Result<UnitOutcome, PredictError>, Option<OwnedSemaphorePermit>);

enum Verdict {
    Complete,
    Winner(usize),
    Failed(usize),
    Aborted(PredictError),
}

struct ChildGroup<'a> {
    parent: &'a UnitNode,
    policy: JoinPolicy,
    selected: &'a [usize],
    settled: BTreeMap<usize, Result<UnitOutcome, PredictError>>,
}

impl ChildGroup<'_> {
    fn settle(&mut self, joined: Result<ChildResult, JoinError>) -> Option<Verdict> {
        let (index, result, permit) = match joined {
            Ok(child) => child,
            Err(join_error) => {
                return Some(Verdict::Aborted(PredictError::Internal {
                    unit_id: self.parent.id().to_string(),
                    message: format!("child task did not complete: {}", join_error),
                }))
            }
        };
        // Released only now, so a sibling waiting on it cannot start before this result is seen.
        drop(permit);

        if let (JoinPolicy::FirstSuccess, Err(error)) = (self.policy, &result) {
            if error.is_recoverable() {
                FallbackUsed {
                    unit_id: self.parent.id(),
                    failed_child: child_id(self.parent, index),
                    error,
                }
                .log();
            }
        }
        self.settled.insert(index, result);

        match self.policy {
            JoinPolicy::AllRequired => {
                if matches!(self.settled.get(&index), Some(Err(_))) {
                    Some(Verdict::Failed(index))
                } else if self.settled.len() == self.selected.len() {
                    Some(Verdict::Complete)
                } else {
                    None
                }
            }
            JoinPolicy::FirstSuccess => self.first_success_verdict(),
        }
    }

    /// Walk the children in declared order until one is undecided or has succeeded.
    fn first_success_verdict(&self) -> Option<Verdict> {
        for &index in self.selected {
            match self.settled.get(&index) {
                None => return None,
                Some(Ok(_)) => return Some(Verdict::Winner(index)),
                Some(Err(error)) if !error.is_recoverable() => return Some(Verdict::Failed(index)),
                Some(Err(_)) => continue,
            }
        }
        self.selected.first().map(|&index| Verdict::Failed(index))
    }
}

/// Run the `selected` children of `parent` and return their outcomes in declared order.
///
/// Under `FirstSuccess` only the winner is returned. Errors come back wrapped as
/// the failure of the child that caused them.
pub(crate) async fn run_children(
    scope: &Arc<ExecutionScope>,
    parent: &UnitNode,
    selected: &[usize],
    payload: &Value,
    cancel: &CancellationToken,
    policy: JoinPolicy,
) -> Result<Vec<(usize, UnitOutcome)>, PredictError> {
    let group_token = cancel.child_token();
    let mut tasks: JoinSet<ChildResult> = JoinSet::new();
    let mut queue: VecDeque<usize> = selected.iter().copied().collect();
    let mut group = ChildGroup {
        parent,
        policy,
        selected,
        settled: BTreeMap::new(),
    };

    let verdict = loop {
        if let Some(&index) = queue.front() {
            let Some(child) = parent.children().get(index) else {
                break Verdict::Aborted(PredictError::Internal {
                    unit_id: parent.id().to_string(),
                    message: format!("no child at index {}", index),
                });
            };

            let permit = if child.is_model() {
                match Arc::clone(&scope.limiter).try_acquire_owned() {
                    Ok(permit) => Some(permit),
                    Err(TryAcquireError::Closed) => {
                        break Verdict::Aborted(PredictError::Internal {
                            unit_id: parent.id().to_string(),
                            message: "concurrency limiter closed".to_string(),
                        })
                    }
                    Err(TryAcquireError::NoPermits) => {
                        // Keep settling running siblings while we wait: one of them
                        // may decide the group before this child ever starts.
                        tokio::select! {
                            biased;
                            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                                match group.settle(joined) {
                                    Some(verdict) => break verdict,
                                    None => continue,
                                }
                            }
                            permit = acquire_permit(&scope.limiter, child.id(), &group_token) => {
                                match permit {
                                    Ok(permit) => Some(permit),
                                    Err(error) => break Verdict::Aborted(error),
                                }
                            }
                        }
                    }
                }
            } else {
                None
            };

            queue.pop_front();
            let permit_held = permit.is_some();
            let future = execute_unit(
                Arc::clone(scope),
                Arc::clone(child),
                payload.clone(),
                group_token.clone(),
                permit_held,
            );
            tasks.spawn(
                async move {
                    let result = future.await;
                    (index, result, permit)
                }
                .in_current_span(),
            );
        } else if let Some(joined) = tasks.join_next().await {
            if let Some(verdict) = group.settle(joined) {
                break verdict;
            }
        } else {
            break Verdict::Complete;
        }
    };

    if !matches!(verdict, Verdict::Complete) && (!queue.is_empty() || !tasks.is_empty()) {
        group_token.cancel();
        if let Verdict::Failed(index) | Verdict::Winner(index) = &verdict {
            SiblingsCancelled {
                unit_id: parent.id(),
                failed_child: child_id(parent, *index),
                never_started: queue.len(),
            }
            .log();
        }
    }
    // Aborts anything still running.
    drop(tasks);

    match verdict {
        Verdict::Complete => group
            .settled
            .into_iter()
            .map(|(index, result)| {
                result
                    .map(|outcome| (index, outcome))
                    .map_err(|error| error.within(parent.id(), child_id(parent, index)))
            })
            .collect(),
        Verdict::Winner(index) => match group.settled.remove(&index) {
            Some(Ok(outcome)) => Ok(vec![(index, outcome)]),
            _ => Err(PredictError::Internal {
                unit_id: parent.id().to_string(),
                message: format!("winning child {} has no result", index),
            }),
        },
        Verdict::Failed(index) => match group.settled.remove(&index) {
            Some(Err(error)) => Err(error.within(parent.id(), child_id(parent, index))),
            _ => Err(PredictError::Internal {
                unit_id: parent.id().to_string(),
                message: format!("failed child {} has no error", index),
            }),
        },
        Verdict::Aborted(error) => Err(error),
    }
}

fn child_id(parent: &UnitNode, index: usize) -> &str {
    parent
        .children()
        .get(index)
        .map(|child| child.id())
        .unwrap_or_default()
}
