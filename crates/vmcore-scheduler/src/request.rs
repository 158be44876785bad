// Path: crates/vmcore-scheduler/src/request.rs
//! The scheduler's view of one proposed request (spec.md §4.6, §6.5): its
//! declared memory accesses, the proposer's adjacency edges, and the
//! attachments whose digests must be injected before execution.

use vmcore_types::{DeclaredAccess, Digest, HttpRequest, LongID, LongLongID};

/// One request as fed to `RequestScheduler::add_request` (spec.md §6.5
/// `AppRequestInfo`, narrowed to the fields the scheduler itself consumes —
/// `gas`/`signedMessagesList` belong to the executor and signature manager,
/// not the DAG verifier).
#[derive(Debug, Clone)]
pub struct AppRequestInfo {
    pub id: u32,
    pub called_app_id: LongID,
    /// Declared accesses, grouped by the chunk they target.
    pub memory_access_map: Vec<((LongID, LongLongID), Vec<DeclaredAccess>)>,
    /// Proposer-supplied outgoing edges (spec.md §3 `DagNode.adjacency`).
    pub adjacency: Vec<u32>,
    /// Sibling requests whose digests must be injected into this request's
    /// body before execution (spec.md §3, §6.5).
    pub attachments: Vec<u32>,
    /// The proposer-supplied digest for this request (spec.md §6.5), read by
    /// `finalize_request` when injecting attachment digests into a dependent
    /// request's `httpRequest`.
    pub digest: Digest,
    /// The request body handed to the dispatcher (spec.md §3 `AppRequest`).
    /// Mutated in place by `finalize_request` to inject attachment digests.
    pub http_request: HttpRequest,
}

/// `DagNode`: `{request, adjacency-set, in-degree}` (spec.md §3). In-degree
/// is atomic; adjacency is immutable once `finalize_request` has run.
#[derive(Debug)]
pub(crate) struct DagNode {
    pub adjacency: Vec<u32>,
    pub attachments: Vec<u32>,
    pub in_degree: std::sync::atomic::AtomicUsize,
    pub digest: Digest,
}

impl DagNode {
    pub(crate) fn new(adjacency: Vec<u32>, attachments: Vec<u32>, digest: Digest) -> Self {
        Self {
            adjacency,
            attachments,
            in_degree: std::sync::atomic::AtomicUsize::new(0),
            digest,
        }
    }
}
