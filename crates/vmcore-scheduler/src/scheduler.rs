// Path: crates/vmcore-scheduler/src/scheduler.rs
//! `RequestScheduler` (spec.md §4.6): loads proposed requests into a
//! `DagNode` graph, verifies the proposer's adjacency against the
//! collision-clique algorithm, builds the execution DAG's initial source
//! set, and schedules ready requests to a worker pool through a blocking
//! queue.
//!
//! Callers must run the three phases in order — `add_request`/
//! `finalize_request` for every request, then `check_dependency_graph`, then
//! `build_exec_dag` — before any thread calls `next_request`. This mirrors
//! the sequential `loadRequests` / `checkDependencyGraph` / `execute` steps
//! of spec.md §4.9; `build_exec_dag` enqueuing the initial source set before
//! workers start polling is what makes the ready queue's producer-counted
//! termination (spec.md §4.6, §5) race-free.

use dashmap::{DashMap, DashSet};
use std::sync::atomic::Ordering;
use thiserror::Error;
use vmcore_types::{BlockError, Digest, StatusCode};

use crate::collision::{required_edges_for_chunk, verify_collisions};
use crate::merge::sort_access_blocks;
use crate::queue::ReadyQueue;
use crate::request::{AppRequestInfo, DagNode};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Block(#[from] BlockError),
    #[error("unknown request id {0}")]
    UnknownRequest(u32),
    #[error("submit_result called for request {0}, which is not currently running")]
    NotRunning(u32),
}

/// The request scheduler and DAG verifier (spec.md §4.6). Owns every
/// request for the lifetime of a block: `DagNode`s for in-degree tracking
/// and collision verification, the requests themselves (handed out exactly
/// once via `next_request`), and the blocking ready queue.
pub struct RequestScheduler {
    total_request_count: u32,
    nodes: DashMap<u32, DagNode>,
    requests: DashMap<u32, AppRequestInfo>,
    running: DashSet<u32>,
    queue: ReadyQueue,
}

impl RequestScheduler {
    pub fn new(total_request_count: u32) -> Self {
        Self {
            total_request_count,
            nodes: DashMap::new(),
            requests: DashMap::new(),
            running: DashSet::new(),
            queue: ReadyQueue::new(),
        }
    }

    pub fn total_request_count(&self) -> u32 {
        self.total_request_count
    }

    /// `add_request(info)` (spec.md §4.6): stores the access map and wraps
    /// the info in a `DagNode`.
    pub fn add_request(&self, info: AppRequestInfo) -> Result<(), SchedulerError> {
        if info.id >= self.total_request_count {
            return Err(SchedulerError::UnknownRequest(info.id));
        }
        let node = DagNode::new(info.adjacency.clone(), info.attachments.clone(), info.digest);
        self.nodes.insert(info.id, node);
        self.requests.insert(info.id, info);
        Ok(())
    }

    /// `finalize_request(id)` (spec.md §4.6): increments in-degree of every
    /// adjacent node, then injects each attachment's digest into this
    /// request's `httpRequest` (the fee-payer pattern of spec.md §3).
    pub fn finalize_request(&self, id: u32) -> Result<(), SchedulerError> {
        let (adjacency, attachments) = {
            let node = self.nodes.get(&id).ok_or(SchedulerError::UnknownRequest(id))?;
            (node.adjacency.clone(), node.attachments.clone())
        };

        for succ in adjacency {
            if let Some(succ_node) = self.nodes.get(&succ) {
                succ_node.in_degree.fetch_add(1, Ordering::SeqCst);
            }
        }

        if !attachments.is_empty() {
            let digests: Vec<Digest> = attachments
                .iter()
                .map(|a| {
                    self.nodes
                        .get(a)
                        .map(|n| n.digest)
                        .ok_or(SchedulerError::UnknownRequest(*a))
                })
                .collect::<Result<_, _>>()?;
            let mut req = self.requests.get_mut(&id).ok_or(SchedulerError::UnknownRequest(id))?;
            for digest in &digests {
                req.http_request.inject_attachment_digest(digest);
            }
        }
        Ok(())
    }

    /// A lightweight adjacency-only snapshot of every node, indexed by
    /// request id, used for the collision verifier's reachability search
    /// (spec.md §4.6). Missing ids (never added) get an empty node so
    /// `nodes.get(id)` in `collision::reachable` stays a simple index.
    fn adjacency_snapshot(&self) -> Vec<DagNode> {
        (0..self.total_request_count)
            .map(|id| match self.nodes.get(&id) {
                Some(n) => DagNode::new(n.adjacency.clone(), n.attachments.clone(), n.digest),
                None => DagNode::new(Vec::new(), Vec::new(), Digest::ZERO),
            })
            .collect()
    }

    /// `sort_access_blocks(workers)` + the collision-clique verifier
    /// (spec.md §4.6): merges every request's declared access map into one
    /// globally-sorted map, then checks that every collision it implies has
    /// a corresponding path in the proposer's DAG.
    pub fn check_dependency_graph(&self, workers: usize) -> Result<(), SchedulerError> {
        let requests: Vec<AppRequestInfo> = self.requests.iter().map(|r| r.value().clone()).collect();
        let merged = sort_access_blocks(&requests, workers);
        let snapshot = self.adjacency_snapshot();
        verify_collisions(&merged, &snapshot)?;
        Ok(())
    }

    /// Exposes the required-edge computation for a single chunk's
    /// already-sorted access list, for callers (e.g. the block validator)
    /// that want to report every missing edge rather than stop at the
    /// first one found by [`RequestScheduler::check_dependency_graph`].
    pub fn required_edges_for_chunk(sorted: &[vmcore_types::DeclaredAccess]) -> Vec<(u32, u32)> {
        required_edges_for_chunk(sorted).into_iter().map(|e| (e.lower, e.upper)).collect()
    }

    /// `build_exec_dag()` (spec.md §4.6): enqueues every zero-in-degree node.
    /// A block error if the source set is empty while requests were
    /// proposed, or if it does not contain request 0.
    pub fn build_exec_dag(&self) -> Result<(), SchedulerError> {
        if self.total_request_count == 0 {
            return Ok(());
        }
        let mut any_source = false;
        let mut has_zero = false;
        for id in 0..self.total_request_count {
            let Some(node) = self.nodes.get(&id) else { continue };
            if node.in_degree.load(Ordering::SeqCst) == 0 {
                any_source = true;
                if id == 0 {
                    has_zero = true;
                }
                self.queue.enqueue(id);
            }
        }
        if !any_source {
            return Err(BlockError::EmptySourceSet(self.total_request_count).into());
        }
        if !has_zero {
            return Err(BlockError::SourceSetMissingRequestZero.into());
        }
        Ok(())
    }

    /// `next_request()` (spec.md §4.6): blocks on the ready queue until a
    /// request is available or every producer has retired, returning
    /// `None` once the queue is permanently drained.
    pub fn next_request(&self) -> Option<(u32, AppRequestInfo)> {
        let id = self.queue.blocking_dequeue()?;
        self.running.insert(id);
        let req = self.requests.remove(&id).map(|(_, v)| v);
        req.map(|r| (id, r))
    }

    /// `submit_result(reqID, statusCode)` (spec.md §4.6): decrements each
    /// successor's in-degree, enqueues those reaching zero, then retires the
    /// producer added by `next_request`. Raises `FailedFeePayment` if the
    /// request declared attachments and itself completed with an error
    /// status (spec.md §4.6, §7).
    pub fn submit_result(&self, id: u32, status: StatusCode) -> Result<(), SchedulerError> {
        if self.running.remove(&id).is_none() {
            return Err(SchedulerError::NotRunning(id));
        }

        let (adjacency, has_attachments) = {
            let node = self.nodes.get(&id).ok_or(SchedulerError::UnknownRequest(id))?;
            (node.adjacency.clone(), !node.attachments.is_empty())
        };

        if has_attachments && status.is_error() {
            self.queue.remove_producer();
            return Err(BlockError::FailedFeePayment(id).into());
        }

        for succ in adjacency {
            if let Some(succ_node) = self.nodes.get(&succ) {
                let prev = succ_node.in_degree.fetch_sub(1, Ordering::SeqCst);
                if prev == 1 {
                    self.queue.enqueue(succ);
                }
            }
        }
        self.queue.remove_producer();
        Ok(())
    }

    /// Whether every node has been submitted and the queue has permanently
    /// drained (spec.md §4.6: "if any node remains after the queue drains,
    /// the graph is not a dag"). Call only after `next_request` has
    /// returned `None` to every worker.
    pub fn all_submitted(&self) -> bool {
        self.requests.is_empty() && self.running.is_empty()
    }
}
