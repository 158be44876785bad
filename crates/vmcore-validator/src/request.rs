// Path: crates/vmcore-validator/src/request.rs
//! `AppRequestInfo`, the full wire shape of one proposed request (spec.md
//! §3 `AppRequest`, §6.5). `vmcore_scheduler::AppRequestInfo` carries only
//! the fields the DAG verifier needs; this is the complete wire record the
//! block loader hands over, which this crate splits into the scheduler's
//! narrower view plus the executor/signature-manager setup the scheduler
//! has no business knowing about.

use std::collections::HashSet;
use vmcore_scheduler::AppRequestInfo as SchedulerRequestInfo;
use vmcore_types::{DeclaredAccess, Digest, HttpRequest, LongID, LongLongID};

/// One proposed transaction, exactly spec.md §6.5's `AppRequestInfo`.
#[derive(Debug, Clone)]
pub struct TransactionRequest {
    pub id: u32,
    pub called_app_id: LongID,
    pub http_request: HttpRequest,
    pub gas: u64,
    /// Apps this request is permitted to `dependant_call` into (spec.md
    /// §4.7 `declared list`).
    pub app_access_list: HashSet<LongID>,
    /// Invocation ids the proposer declared as stack-size failures
    /// (spec.md §4.7, §6.5).
    pub stack_size_failures: HashSet<u64>,
    /// Invocation ids the proposer declared as CPU-time failures.
    pub cpu_time_failures: HashSet<u64>,
    pub memory_access_map: Vec<((LongID, LongLongID), Vec<DeclaredAccess>)>,
    pub adjacency: Vec<u32>,
    pub attachments: Vec<u32>,
    /// Pre-seeds the virtual signature manager (spec.md §4.8, §6.5).
    pub signed_messages_list: Vec<(LongID, Vec<u8>)>,
    pub digest: Digest,
}

/// The executor/signature-manager setup fields split out of
/// [`TransactionRequest`] once its scheduler-facing half has moved into
/// `RequestScheduler::add_request`.
#[derive(Debug, Clone)]
pub struct RequestAux {
    pub gas: u64,
    pub app_access_list: HashSet<LongID>,
    pub stack_size_failures: HashSet<u64>,
    pub cpu_time_failures: HashSet<u64>,
    pub signed_messages_list: Vec<(LongID, Vec<u8>)>,
}

impl TransactionRequest {
    /// Splits this request into the scheduler's narrow view and the
    /// remaining executor-facing fields, consuming `self` so neither half
    /// needs to clone the (potentially large) http request body twice.
    pub fn split(self) -> (SchedulerRequestInfo, RequestAux) {
        let info = SchedulerRequestInfo {
            id: self.id,
            called_app_id: self.called_app_id,
            memory_access_map: self.memory_access_map,
            adjacency: self.adjacency,
            attachments: self.attachments,
            digest: self.digest,
            http_request: self.http_request,
        };
        let aux = RequestAux {
            gas: self.gas,
            app_access_list: self.app_access_list,
            stack_size_failures: self.stack_size_failures,
            cpu_time_failures: self.cpu_time_failures,
            signed_messages_list: self.signed_messages_list,
        };
        (info, aux)
    }
}
