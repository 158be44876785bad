// Path: crates/vmcore-validator/src/iface.rs
//! The external collaborator interfaces (spec.md §6.1, §6.3): traits this
//! crate only consumes. Concrete PV-DB fetching, native-module loading, and
//! consensus/block-loading wire protocols are out of scope (spec.md §1);
//! `vmcore_storage::page::PageLoader` and `vmcore_executor::AppLoader`
//! already cover §6.2/§6.3, so this module only adds the `BlockLoader`
//! (§6.1) that is specific to orchestration.

use std::collections::BTreeMap;
use vmcore_storage::page::{BlockRef, MigrationInfo};
use vmcore_storage::ChunkBoundsInfo;
use vmcore_types::{Digest, FullID, VarLenFullID};

use crate::request::TransactionRequest;

/// One worker's share of the block's proposed requests (spec.md §6.1
/// `request_streams(n)`). Yields `AppRequestInfo` until exhausted.
pub trait RequestStream: Send {
    fn next(&mut self) -> Option<TransactionRequest>;
}

/// `BlockLoader` (spec.md §6.1, consumed): the block-level collaborator the
/// orchestration pipeline asks for the proposed transaction set, the
/// page-access lists, the proposer's size bounds, and the response-list
/// digest to check validation against. Loading, signing, and replicating
/// blocks themselves are explicit non-goals (spec.md §1).
pub trait BlockLoader: Send + Sync {
    fn set_current_block(&mut self, block: BlockRef);
    fn num_requests(&self) -> u32;
    fn num_chunks(&self) -> u32;
    fn readonly_pages(&self) -> Vec<VarLenFullID>;
    fn writable_pages(&self) -> Vec<VarLenFullID>;
    fn migration_list(&self) -> Vec<MigrationInfo>;
    fn proposed_size_bounds(&self) -> BTreeMap<FullID, ChunkBoundsInfo>;
    /// Splits the proposed request set into `n` streams for parallel
    /// loading (spec.md §4.9 `loadRequests`, run in parallel).
    fn request_streams(&mut self, n: usize) -> Vec<Box<dyn RequestStream>>;
    fn response_list_digest(&self) -> Digest;
}
