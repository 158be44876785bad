// Path: crates/vmcore-validator/src/validator.rs
//! `BlockValidator`: the top-level orchestration pipeline (spec.md §4.9).
//! Mirrors the source's `loadRequests` / `checkDependencyGraph` / `execute`
//! sequence — a two-phase barrier load (every `addRequest` before any
//! `finalizeRequest`) followed by a worker pool draining the scheduler's
//! ready queue — grounded on `original_source/src/BlockValidator.cpp`.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use thiserror::Error;

use vmcore_executor::{ControlledExecutor, FailureManager, RequestExecution};
use vmcore_heap::{build_modifier, AccessMap};
use vmcore_scheduler::{RequestScheduler, SchedulerError};
use vmcore_sigmgr::VirtualSignatureManager;
use vmcore_storage::page::{BlockRef, PageLoader};
use vmcore_storage::{ChunkIndex, ChunkIndexError, Page, PageCache, PageCacheError};
use vmcore_telemetry::ScopeTimer;
use vmcore_types::digest::Hasher;
use vmcore_types::{BlockError, Digest, ErrorCode, FullID, HttpResponse, StatusCode};

use crate::config::ExecutorConfig;
use crate::iface::BlockLoader;
use crate::request::RequestAux;

/// Everything this crate is willing to tell the host the block decided on
/// (spec.md §4.9): the per-request responses and the response-list digest
/// the host can compare against what the proposer committed to.
#[derive(Debug)]
pub struct ValidationOutcome {
    pub responses: BTreeMap<u32, HttpResponse>,
    pub response_list_digest: Digest,
}

#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error(transparent)]
    Block(#[from] BlockError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error(transparent)]
    ChunkIndex(#[from] ChunkIndexError),
    #[error(transparent)]
    PageCache(#[from] PageCacheError),
    #[error("request {0} was scheduled for execution but its aux state was never loaded")]
    MissingRequestAux(u32),
    #[error("a worker thread panicked while validating this block")]
    WorkerPanicked,
}

impl ErrorCode for ValidatorError {
    fn code(&self) -> &'static str {
        match self {
            Self::Block(e) => e.code(),
            Self::Scheduler(SchedulerError::Block(e)) => e.code(),
            Self::Scheduler(_) => "VALIDATOR_SCHEDULER_ERROR",
            Self::ChunkIndex(_) => "VALIDATOR_CHUNK_INDEX_ERROR",
            Self::PageCache(_) => "VALIDATOR_PAGE_CACHE_ERROR",
            Self::MissingRequestAux(_) => "VALIDATOR_MISSING_REQUEST_AUX",
            Self::WorkerPanicked => "VALIDATOR_WORKER_PANICKED",
        }
    }
}

fn record_abort(slot: &Mutex<Option<ValidatorError>>, err: ValidatorError) {
    let mut guard = slot.lock();
    if guard.is_none() {
        *guard = Some(err);
    }
}

fn digest_responses(responses: &BTreeMap<u32, HttpResponse>) -> Digest {
    let mut hasher = Hasher::new();
    for response in responses.values() {
        hasher.update(&response.to_wire());
    }
    hasher.finish()
}

pub struct BlockValidator {
    config: ExecutorConfig,
}

impl BlockValidator {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    /// Runs the full pipeline for one block: prepares pages, builds the
    /// chunk index, loads and verifies the request DAG, executes it to
    /// completion, and checks the committed response list against the
    /// proposer's declared digest (spec.md §4.9).
    pub fn validate_block(
        &self,
        block_loader: &mut dyn BlockLoader,
        page_loader: &dyn PageLoader,
        app_loader: Arc<dyn vmcore_executor::AppLoader>,
        block: BlockRef,
        previous_block: BlockRef,
    ) -> Result<ValidationOutcome, ValidatorError> {
        let _span = tracing::info_span!("validate_block", height = block.height).entered();

        block_loader.set_current_block(block);
        let num_requests = block_loader.num_requests();
        let readonly_ids = block_loader.readonly_pages();
        let writable_ids = block_loader.writable_pages();
        let migrations = block_loader.migration_list();
        let bounds = block_loader.proposed_size_bounds();

        let page_cache = PageCache::new();
        {
            let _timer = ScopeTimer::new("prepare_pages");
            page_cache.prepare_pages(
                block,
                previous_block,
                &readonly_ids,
                false,
                &[],
                page_loader,
                self.config.default_page_capacity,
            )?;
            page_cache.prepare_pages(
                block,
                previous_block,
                &writable_ids,
                true,
                &migrations,
                page_loader,
                self.config.default_page_capacity,
            )?;
        }

        let readonly_pages: Vec<Page> = readonly_ids.iter().filter_map(|id| page_cache.get(id)).collect();
        let writable_pages: Vec<Page> = writable_ids.iter().filter_map(|id| page_cache.get(id)).collect();
        let index = {
            let _timer = ScopeTimer::new("build_chunk_index");
            ChunkIndex::build(&readonly_pages, &writable_pages, bounds)?
        };

        let scheduler = RequestScheduler::new(num_requests);
        let auxes: DashMap<u32, RequestAux> = DashMap::new();

        tracing::debug!(num_requests, "loading proposed requests");
        {
            let _timer = ScopeTimer::new("load_requests");
            self.load_requests(block_loader, &scheduler, &auxes)?;
        }

        {
            let _timer = ScopeTimer::new("check_dependency_graph");
            for id in 0..num_requests {
                scheduler.finalize_request(id)?;
            }
            scheduler.check_dependency_graph(self.config.worker_count.max(1))?;
            scheduler.build_exec_dag()?;
        }

        let responses = {
            let _timer = ScopeTimer::new("execute");
            match self.execute_requests(&scheduler, &auxes, &index, app_loader) {
                Ok(responses) => responses,
                Err(err) => {
                    tracing::warn!(error = %err, "block execution aborted, rolling back writable pages");
                    page_cache.rollback(&writable_ids);
                    return Err(err);
                }
            }
        };

        if num_requests > 0 && !scheduler.all_submitted() {
            page_cache.rollback(&writable_ids);
            return Err(BlockError::NotADag.into());
        }

        let response_list_digest = digest_responses(&responses);
        let expected_digest = block_loader.response_list_digest();
        if response_list_digest != expected_digest {
            page_cache.rollback(&writable_ids);
            return Err(BlockError::Invalid("response list digest did not match the proposer's declared digest".to_string()).into());
        }

        {
            let _timer = ScopeTimer::new("commit");
            page_cache.commit(&writable_ids);
        }
        tracing::info!(num_requests, %response_list_digest, "block validated");
        Ok(ValidationOutcome { responses, response_list_digest })
    }

    /// Phase one: every `add_request` across every stream completes before
    /// any `finalize_request` runs (the barrier `original_source`'s
    /// `BlockValidator::loadRequests` enforces with its own thread pool).
    fn load_requests(&self, block_loader: &mut dyn BlockLoader, scheduler: &RequestScheduler, auxes: &DashMap<u32, RequestAux>) -> Result<(), ValidatorError> {
        let streams = block_loader.request_streams(self.config.worker_count.max(1));
        std::thread::scope(|scope| -> Result<(), ValidatorError> {
            let handles: Vec<_> = streams
                .into_iter()
                .map(|mut stream| {
                    let scheduler = scheduler;
                    let auxes = auxes;
                    scope.spawn(move || -> Result<(), ValidatorError> {
                        while let Some(request) = stream.next() {
                            let (info, aux) = request.split();
                            let id = info.id;
                            scheduler.add_request(info)?;
                            auxes.insert(id, aux);
                        }
                        Ok(())
                    })
                })
                .collect();
            for handle in handles {
                handle.join().map_err(|_| ValidatorError::WorkerPanicked)??;
            }
            Ok(())
        })
    }

    /// Phase two: a worker pool drains the scheduler's ready queue until it
    /// permanently empties. Every dequeued request always reaches
    /// `submit_result`, even on an internal failure, so the queue's
    /// producer bookkeeping never deadlocks a sibling worker; the first
    /// error recorded aborts the whole block once every worker has joined
    /// (spec.md §9: cooperative rather than preemptive abort).
    fn execute_requests(
        &self,
        scheduler: &RequestScheduler,
        auxes: &DashMap<u32, RequestAux>,
        index: &ChunkIndex,
        app_loader: Arc<dyn vmcore_executor::AppLoader>,
    ) -> Result<BTreeMap<u32, HttpResponse>, ValidatorError> {
        let responses: DashMap<u32, HttpResponse> = DashMap::new();
        let abort_reason: Mutex<Option<ValidatorError>> = Mutex::new(None);
        let executor = ControlledExecutor::new(app_loader.clone());

        std::thread::scope(|scope| {
            for _ in 0..self.config.worker_count.max(1) {
                let scheduler = scheduler;
                let auxes = auxes;
                let responses = &responses;
                let abort_reason = &abort_reason;
                let index = index;
                let executor = &executor;
                let app_loader = app_loader.clone();
                scope.spawn(move || {
                    while let Some((id, req_info)) = scheduler.next_request() {
                        let Some((_, aux)) = auxes.remove(&id) else {
                            record_abort(abort_reason, ValidatorError::MissingRequestAux(id));
                            let _ = scheduler.submit_result(id, StatusCode::InternalError);
                            continue;
                        };

                        let access_map: AccessMap = req_info.memory_access_map.iter().cloned().collect();
                        let modifier = match build_modifier(index, &access_map) {
                            Ok(modifier) => modifier,
                            Err(err) => {
                                record_abort(
                                    abort_reason,
                                    ValidatorError::Block(BlockError::Invalid(format!("request {id}: {err}"))),
                                );
                                let _ = scheduler.submit_result(id, StatusCode::InternalError);
                                continue;
                            }
                        };

                        let sigmgr = VirtualSignatureManager::new();
                        if let Err(err) = sigmgr.seed(aux.signed_messages_list) {
                            record_abort(abort_reason, ValidatorError::Block(BlockError::Invalid(format!("request {id}: {err}"))));
                        }

                        let failures = FailureManager::new(aux.stack_size_failures, aux.cpu_time_failures);
                        let execution =
                            RequestExecution::with_signature_manager(modifier, failures, aux.app_access_list, app_loader.clone(), sigmgr);

                        let response = executor.invoke_dispatcher(&execution, req_info.called_app_id, &req_info.http_request, aux.gas);

                        let commit_result = execution
                            .heap()
                            .lock()
                            .write_to_heap(|app, chunk_id| index.get_chunk(&FullID { app, id: chunk_id }).ok());
                        if let Err(err) = commit_result {
                            record_abort(
                                abort_reason,
                                ValidatorError::Block(BlockError::Invalid(format!("request {id}: failed to commit heap: {err}"))),
                            );
                        }

                        let status = response.status;
                        responses.insert(id, response);

                        if let Err(err) = scheduler.submit_result(id, status) {
                            record_abort(abort_reason, err.into());
                        }
                    }
                });
            }
        });

        if let Some(err) = abort_reason.into_inner() {
            return Err(err);
        }
        Ok(responses.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_digest_is_order_independent_of_insertion_but_ordered_by_id() {
        let mut a = BTreeMap::new();
        a.insert(1u32, HttpResponse::ok("x", b"one".to_vec()));
        a.insert(0u32, HttpResponse::ok("x", b"zero".to_vec()));

        let mut expected_hasher = Hasher::new();
        expected_hasher.update(&HttpResponse::ok("x", b"zero".to_vec()).to_wire());
        expected_hasher.update(&HttpResponse::ok("x", b"one".to_vec()).to_wire());

        assert_eq!(digest_responses(&a), expected_hasher.finish());
    }
}
