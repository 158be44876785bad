// Path: crates/vmcore-executor/src/executor.rs
//! The controlled executor (spec.md §4.7): runs a dispatcher invocation
//! under a bounded stack and a soft CPU-time budget, and gives the running
//! dispatcher a `DispatchCtx` through which it can call out to other
//! applications (`dependant_call`, `invoke_deferred`) and guard against
//! reentrancy (`enter_area`/`exit_area`).
//!
//! Rust has no safe, portable way to forcibly preempt a running thread, so
//! the CPU-time budget is enforced by racing the invocation's own thread
//! against a watchdog timeout on a `crossbeam_channel` rendezvous: on
//! timeout the parent gives up and reports `ExecutionTimeout`, but the
//! child thread itself is left running and is not killed. This is a
//! deliberate, documented weakening of the source's signal-based
//! preemption (see DESIGN.md).

use crate::dispatcher::AppHandle;
use crate::failure_manager::FailureManager;
use crate::gas;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use vmcore_heap::{HeapModifier, HeapModifierError, Pod};
use vmcore_sigmgr::VirtualSignatureManager;
use vmcore_types::{ApplicationError, HttpRequest, HttpResponse, LongID, LongLongID, StatusCode};

/// Maps a `HeapModifier` failure onto the `ApplicationError` a dispatcher
/// sees (spec.md §4.5, §7): none of these are block-fatal on their own, they
/// unwind to the invoking call context like any other application error.
fn heap_error_to_application_error(err: HeapModifierError) -> ApplicationError {
    match err {
        HeapModifierError::ChunkNotDefined | HeapModifierError::NoContext => ApplicationError::NotFound(err.to_string()),
        HeapModifierError::LimitExceeded => ApplicationError::LimitExceeded(err.to_string()),
        HeapModifierError::InvalidRestoreTarget(_) | HeapModifierError::InvalidSentinel(_) | HeapModifierError::MissingSizeBounds => {
            ApplicationError::InvalidOperation(err.to_string())
        }
        HeapModifierError::ChunkInfo(_) => ApplicationError::OutOfRange(err.to_string()),
        HeapModifierError::ChunkIndex(_) => ApplicationError::NotFound(err.to_string()),
        HeapModifierError::AccessBlock(_) | HeapModifierError::Chunk(_) => ApplicationError::MemoryFault(err.to_string()),
    }
}

/// Per-request state threaded through every invocation in a request's call
/// tree. `Arc`-wrapped throughout so it can be cloned cheaply into the
/// spawned thread each invocation runs on.
#[derive(Clone)]
pub struct RequestExecution {
    heap: Arc<Mutex<HeapModifier>>,
    failures: Arc<FailureManager>,
    declared_apps: Arc<HashSet<LongID>>,
    reentrancy: Arc<Mutex<HashSet<LongID>>>,
    loader: Arc<dyn crate::dispatcher::AppLoader>,
    sigmgr: Arc<VirtualSignatureManager>,
}

impl RequestExecution {
    pub fn new(
        heap: HeapModifier,
        failures: FailureManager,
        declared_apps: HashSet<LongID>,
        loader: Arc<dyn crate::dispatcher::AppLoader>,
    ) -> Self {
        Self::with_signature_manager(heap, failures, declared_apps, loader, VirtualSignatureManager::new())
    }

    /// Like [`RequestExecution::new`], but with a pre-seeded virtual
    /// signature manager (spec.md §4.8, §6.5 `signedMessagesList`), for
    /// hosts that wire it up before a request starts executing.
    pub fn with_signature_manager(
        heap: HeapModifier,
        failures: FailureManager,
        declared_apps: HashSet<LongID>,
        loader: Arc<dyn crate::dispatcher::AppLoader>,
        sigmgr: VirtualSignatureManager,
    ) -> Self {
        Self {
            heap: Arc::new(Mutex::new(heap)),
            failures: Arc::new(failures),
            declared_apps: Arc::new(declared_apps),
            reentrancy: Arc::new(Mutex::new(HashSet::new())),
            loader,
            sigmgr: Arc::new(sigmgr),
        }
    }

    pub fn heap(&self) -> &Arc<Mutex<HeapModifier>> {
        &self.heap
    }
}

/// The handle a running dispatcher uses to call out (spec.md §4.7). One is
/// constructed per invocation; it borrows nothing beyond this call's gas
/// and depth bookkeeping, so nested calls can freely build their own.
pub struct DispatchCtx<'a> {
    execution: &'a RequestExecution,
    app_id: LongID,
    invocation_id: u64,
    depth: usize,
    remaining_external_gas: u64,
    /// This invocation's remaining share of gas still available to lend to
    /// a further `dependant_call`. Halved after each call (spec.md §4.7),
    /// so a run of sibling calls from the same invocation can never sum to
    /// more than roughly twice its first forwarded share.
    next_lend_share: std::cell::Cell<u64>,
    deferred: Vec<(LongID, HttpRequest)>,
}

impl<'a> DispatchCtx<'a> {
    fn new(execution: &'a RequestExecution, app_id: LongID, invocation_id: u64, depth: usize, remaining_external_gas: u64) -> Self {
        Self {
            execution,
            app_id,
            invocation_id,
            depth,
            remaining_external_gas,
            next_lend_share: std::cell::Cell::new(remaining_external_gas),
            deferred: Vec::new(),
        }
    }

    pub fn app_id(&self) -> LongID {
        self.app_id
    }

    pub fn invocation_id(&self) -> u64 {
        self.invocation_id
    }

    /// Marks this app's call area as entered; fails `ReentrancyAttempt` if
    /// it is already held by an ancestor on this request (spec.md §4.7, S4).
    pub fn enter_area(&self) -> Result<(), ApplicationError> {
        let mut held = self.execution.reentrancy.lock();
        if !held.insert(self.app_id) {
            return Err(ApplicationError::ReentrancyAttempt);
        }
        Ok(())
    }

    /// Releases this app's call area. Idempotent: calling it without a
    /// matching `enter_area` is a no-op.
    pub fn exit_area(&self) {
        self.execution.reentrancy.lock().remove(&self.app_id);
    }

    /// Aborts the current invocation with the given message (spec.md
    /// §4.7). Always returns `Err` so callers can write `return
    /// ctx.revert("...")`.
    pub fn revert(&self, message: impl Into<String>) -> Result<HttpResponse, ApplicationError> {
        Err(ApplicationError::Reverted(message.into()))
    }

    /// Synchronous call into another application (spec.md §4.7
    /// `dependantCall`). Fails `LimitViolated` if `called_app` is not in
    /// this request's proposer-declared call list. A genuine
    /// `ApplicationError` raised by the callee (including
    /// `ReentrancyAttempt`) propagates unchanged; a callee that returns
    /// normally with an error status (>= 400) is instead wrapped as
    /// `InvalidOperation`, matching the source's "errors propagate, bad
    /// statuses don't" split (spec.md §4.7, traced against scenario S4).
    pub fn dependant_call(&mut self, forwarded_gas: u8, called_app: LongID, request: &HttpRequest) -> Result<HttpResponse, ApplicationError> {
        FailureManager::check_depth(self.depth + 1)?;
        if !self.execution.declared_apps.contains(&called_app) {
            return Err(ApplicationError::LimitViolated(format!(
                "app {called_app} is not in this request's declared call list"
            )));
        }
        let share = self.next_lend_share.get();
        let gas_for_call = gas::forward(share, forwarded_gas);
        gas::check_min_clocks(gas_for_call, gas::MIN_CLOCKS)?;
        self.next_lend_share.set(gas::halve(share));

        let handle = self
            .execution
            .loader
            .load(called_app)
            .ok_or_else(|| ApplicationError::NotFound(format!("app {called_app} has no registered dispatcher")))?;

        let response = invoke_one(self.execution, &handle, request, self.depth + 1, gas_for_call)?;
        if response.status.is_error() {
            return Err(ApplicationError::InvalidOperation(format!(
                "callee {called_app} returned {}",
                response.status
            )));
        }
        Ok(response)
    }

    /// Queues a call to run only after the current dispatcher returns
    /// successfully (spec.md §4.7 `invokeDeferred`). The deferred call's
    /// response is discarded and its failure does not propagate to this
    /// invocation.
    pub fn invoke_deferred(&mut self, called_app: LongID, request: HttpRequest) {
        self.deferred.push((called_app, request));
    }

    /// `sign(msg, issuerApp)` (spec.md §4.8), issued as this invocation's
    /// own app.
    pub fn sign(&self, msg: &[u8]) -> Result<(), ApplicationError> {
        self.execution.sigmgr.sign(msg, self.app_id).map_err(|e| e.into_application_error())
    }

    /// `verify(msg, issuerApp)` (spec.md §4.8): a membership test against
    /// `issuer_app`'s signed set, not necessarily this invocation's own app.
    pub fn verify(&self, msg: &[u8], issuer_app: LongID) -> bool {
        self.execution.sigmgr.verify(msg, issuer_app)
    }

    /// `verify_and_invalidate(msg, issuerApp)` (spec.md §4.8).
    pub fn verify_and_invalidate(&self, msg: &[u8], issuer_app: LongID) -> Result<(), ApplicationError> {
        self.execution.sigmgr.verify_and_invalidate(msg, issuer_app).map_err(|e| e.into_application_error())
    }

    /// Re-selects this invocation's own app as the heap's active context
    /// before every call (spec.md §4.5: "load_context ... used by nested
    /// calls"). A shared `HeapModifier` is threaded through a request's
    /// whole call tree, and `dependant_call` blocks the caller until the
    /// callee returns, so only one invocation ever touches the heap at a
    /// time — but the callee leaves its own context selected, so the
    /// caller must reassert its own before resuming.
    fn with_own_context<T>(&self, f: impl FnOnce(&mut HeapModifier) -> Result<T, HeapModifierError>) -> Result<T, ApplicationError> {
        let mut heap = self.execution.heap.lock();
        heap.load_context(self.app_id);
        f(&mut heap).map_err(heap_error_to_application_error)
    }

    /// `load_chunk(id)` (spec.md §4.5): selects the current chunk within
    /// this invocation's own app context.
    pub fn load_chunk(&self, chunk: LongLongID) -> Result<(), ApplicationError> {
        self.with_own_context(|heap| heap.load_chunk(chunk))
    }

    /// `read<T>(offset, index)` (spec.md §4.5).
    pub fn read<T: Pod>(&self, offset: usize, index: usize) -> Result<T, ApplicationError> {
        self.with_own_context(|heap| heap.read::<T>(offset, index))
    }

    /// `write<T>(offset, value, index)` (spec.md §4.5).
    pub fn write<T: Pod>(&self, offset: usize, value: T, index: usize) -> Result<(), ApplicationError> {
        self.with_own_context(|heap| heap.write(offset, value, index))
    }

    /// `add_int<T>(offset, delta)` (spec.md §4.5).
    pub fn add_int<T: Pod>(&self, offset: usize, delta: T) -> Result<(), ApplicationError> {
        self.with_own_context(|heap| heap.add_int(offset, delta))
    }

    /// `save_version()` (spec.md §4.5).
    pub fn save_version(&self) -> Result<u32, ApplicationError> {
        self.with_own_context(|heap| heap.save_version())
    }

    /// `restore_version(v)` (spec.md §4.5).
    pub fn restore_version(&self, v: u32) -> Result<(), ApplicationError> {
        self.with_own_context(|heap| heap.restore_version(v))
    }

    /// `get_chunk_size()` (spec.md §4.5).
    pub fn get_chunk_size(&self) -> Result<u64, ApplicationError> {
        self.with_own_context(|heap| heap.get_chunk_size())
    }

    /// `update_chunk_size(n)` (spec.md §4.5).
    pub fn update_chunk_size(&self, n: u64) -> Result<(), ApplicationError> {
        self.with_own_context(|heap| heap.update_chunk_size(n))
    }
}

/// Runs every deferred call queued by a now-successfully-returned
/// invocation. Each runs independently; a deferred call's own failure is
/// swallowed (spec.md §4.7: "response discarded; failure does not
/// propagate unless explicitly re-dispatched"), mirroring scenario S6.
fn run_deferred(execution: &RequestExecution, deferred: Vec<(LongID, HttpRequest)>, depth: usize) {
    for (called_app, request) in deferred {
        let Some(handle) = execution.loader.load(called_app) else {
            tracing::warn!(target: "vmcore_executor", app = called_app.to_string(), "deferred call to unknown app dropped");
            continue;
        };
        if let Err(err) = invoke_one(execution, &handle, &request, depth + 1, u64::MAX) {
            tracing::warn!(target: "vmcore_executor", app = called_app.to_string(), error = %err, "deferred call failed, ignored");
        }
    }
}

/// One bounded invocation: spawns the dispatcher on a thread sized by the
/// failure manager's declared stack budget, races it against a CPU-time
/// watchdog, and restores the heap to its entry snapshot on any failure
/// (spec.md §4.7: "Running -> Failed" rolls back to the call's entry
/// version).
fn invoke_one(
    execution: &RequestExecution,
    handle: &AppHandle,
    request: &HttpRequest,
    depth: usize,
    remaining_external_gas: u64,
) -> Result<HttpResponse, ApplicationError> {
    FailureManager::check_depth(depth)?;

    let invocation_id = execution.failures.next_invocation_id();
    let stack_size = execution.failures.get_stack_size(invocation_id);
    let timeout = execution.failures.get_exec_time(invocation_id, remaining_external_gas.min(u32::MAX as u64).max(1));

    let entry_version = execution.heap.lock().current_version();

    let (tx, rx) = crossbeam_channel::bounded::<Result<(HttpResponse, Vec<(LongID, HttpRequest)>), ApplicationError>>(1);
    let exec = execution.clone();
    let app_id = handle.app_id;
    let dispatcher = Arc::clone(&handle.dispatcher);
    let req = request.clone();

    let spawn_result = thread::Builder::new().stack_size(stack_size).spawn(move || {
        let mut ctx = DispatchCtx::new(&exec, app_id, invocation_id, depth, remaining_external_gas);
        let outcome = dispatcher.invoke(&mut ctx, &req).map(|resp| (resp, ctx.deferred));
        let _ = tx.send(outcome);
    });

    if spawn_result.is_err() {
        return Err(ApplicationError::InvalidOperation("failed to spawn invocation thread".to_string()));
    }

    let result = match rx.recv_timeout(timeout) {
        Ok(outcome) => outcome,
        Err(_) => {
            tracing::warn!(target: "vmcore_executor", app = app_id.to_string(), invocation_id, "invocation exceeded its cpu time budget");
            Err(ApplicationError::ExecutionTimeout)
        }
    };

    match result {
        Ok((response, deferred)) => {
            run_deferred(execution, deferred, depth);
            Ok(response)
        }
        Err(err) => {
            if let Err(restore_err) = execution.heap.lock().restore_version(entry_version) {
                tracing::error!(target: "vmcore_executor", error = %restore_err, "failed to restore heap snapshot after invocation failure");
            }
            execution.reentrancy.lock().remove(&app_id);
            Err(err)
        }
    }
}

/// The entry point into a request's top-level invocation (spec.md §4.7
/// `invokeDispatcher`): resolves the app's dispatcher, runs it under the
/// controlled executor, and materializes the result as an HTTP-shaped
/// response instead of propagating the error, since nothing above the
/// executor can `?` out of a whole request.
pub struct ControlledExecutor {
    loader: Arc<dyn crate::dispatcher::AppLoader>,
}

impl ControlledExecutor {
    pub fn new(loader: Arc<dyn crate::dispatcher::AppLoader>) -> Self {
        Self { loader }
    }

    pub fn invoke_dispatcher(&self, execution: &RequestExecution, app_id: LongID, request: &HttpRequest, external_gas: u64) -> HttpResponse {
        let Some(handle) = self.loader.load(app_id) else {
            return HttpResponse::error(StatusCode::NotFound, "vmcore-executor", format!("app {app_id} has no registered dispatcher"));
        };

        match invoke_one(execution, &handle, request, 0, external_gas) {
            Ok(response) => response,
            Err(err) => HttpResponse::error(err.status(), "vmcore-executor", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::{AppHandle, AppLoader, FnDispatcher};
    use std::collections::HashMap;
    use std::time::Duration;
    use vmcore_heap::{build_modifier, AccessMap};
    use vmcore_storage::ChunkIndex;

    struct TestLoader {
        apps: Mutex<HashMap<LongID, AppHandle>>,
    }

    impl TestLoader {
        fn new() -> Self {
            Self { apps: Mutex::new(HashMap::new()) }
        }

        fn register(&self, app_id: LongID, dispatcher: Arc<dyn crate::dispatcher::Dispatcher>) {
            self.apps.lock().insert(
                app_id,
                AppHandle {
                    app_id,
                    version: 1,
                    dispatcher,
                },
            );
        }
    }

    impl AppLoader for TestLoader {
        fn load(&self, app_id: LongID) -> Option<AppHandle> {
            self.apps.lock().get(&app_id).cloned()
        }
        fn unload(&self, _handle: AppHandle) {}
    }

    fn empty_heap() -> HeapModifier {
        let index = ChunkIndex::build(&[], &[], std::collections::BTreeMap::new()).expect("empty index always builds");
        build_modifier(&index, &AccessMap::new()).expect("empty access map always builds")
    }

    fn empty_execution(loader: Arc<dyn AppLoader>) -> RequestExecution {
        RequestExecution::new(empty_heap(), FailureManager::new(HashSet::new(), HashSet::new()), HashSet::new(), loader)
    }

    fn execution_declaring(loader: Arc<dyn AppLoader>, declared: HashSet<LongID>) -> RequestExecution {
        RequestExecution::new(empty_heap(), FailureManager::new(HashSet::new(), HashSet::new()), declared, loader)
    }

    #[test]
    fn reentrant_self_call_is_rejected_with_status_523() {
        let loader = Arc::new(TestLoader::new());
        let app: LongID = LongID(22);
        loader.register(
            app,
            Arc::new(FnDispatcher(move |ctx: &mut DispatchCtx<'_>, _req: &HttpRequest| {
                ctx.enter_area()?;
                let inner = HttpRequest::new("GET", "/", Vec::new());
                let result = ctx.dependant_call(255, app, &inner);
                ctx.exit_area();
                result
            })),
        );
        let execution = execution_declaring(loader.clone(), HashSet::from([app]));
        let executor = ControlledExecutor::new(loader);
        let response = executor.invoke_dispatcher(&execution, app, &HttpRequest::new("GET", "/", Vec::new()), 10_000);
        assert_eq!(response.status, StatusCode::ReentrancyAttempt);
    }

    #[test]
    fn a_call_exceeding_its_time_budget_reports_execution_timeout() {
        let loader = Arc::new(TestLoader::new());
        let app: LongID = LongID(1);
        loader.register(
            app,
            Arc::new(FnDispatcher(|_ctx: &mut DispatchCtx<'_>, _req: &HttpRequest| {
                thread::sleep(Duration::from_millis(50));
                Ok(HttpResponse::ok("test", Vec::new()))
            })),
        );
        // invocation id 0 is a declared cpu-time failure: a 150us/gas budget
        // against a single gas unit gives a timeout far shorter than the sleep.
        let failures = FailureManager::new(HashSet::new(), HashSet::from([0u64]));
        let execution = RequestExecution::new(empty_heap(), failures, HashSet::new(), loader.clone());
        let executor = ControlledExecutor::new(loader);
        let response = executor.invoke_dispatcher(&execution, app, &HttpRequest::new("GET", "/", Vec::new()), 1);
        assert_eq!(response.status, StatusCode::ExecutionTimeout);
    }

    #[test]
    fn sibling_requests_are_unaffected_by_a_failed_invocation() {
        let loader = Arc::new(TestLoader::new());
        let ok_app: LongID = LongID(2);
        let fail_app: LongID = LongID(3);
        loader.register(ok_app, Arc::new(FnDispatcher(|_ctx: &mut DispatchCtx<'_>, _req: &HttpRequest| Ok(HttpResponse::ok("test", b"fine".to_vec())))));
        loader.register(fail_app, Arc::new(FnDispatcher(|ctx: &mut DispatchCtx<'_>, _req: &HttpRequest| ctx.revert("boom"))));

        let execution = empty_execution(loader.clone());
        let executor = ControlledExecutor::new(loader);
        let failed = executor.invoke_dispatcher(&execution, fail_app, &HttpRequest::new("GET", "/", Vec::new()), 10_000);
        assert_eq!(failed.status, StatusCode::BadRequest);

        let ok = executor.invoke_dispatcher(&execution, ok_app, &HttpRequest::new("GET", "/", Vec::new()), 10_000);
        assert_eq!(ok.status, StatusCode::Ok);
        assert_eq!(ok.body, b"fine");
    }

    #[test]
    fn deferred_call_failure_does_not_propagate_to_the_caller() {
        let loader = Arc::new(TestLoader::new());
        let caller: LongID = LongID(4);
        let callee: LongID = LongID(5);
        loader.register(callee, Arc::new(FnDispatcher(|ctx: &mut DispatchCtx<'_>, _req: &HttpRequest| ctx.revert("callee always fails"))));
        loader.register(
            caller,
            Arc::new(FnDispatcher(move |ctx: &mut DispatchCtx<'_>, _req: &HttpRequest| {
                ctx.invoke_deferred(callee, HttpRequest::new("GET", "/", Vec::new()));
                Ok(HttpResponse::ok("test", b"caller-ok".to_vec()))
            })),
        );
        let execution = empty_execution(loader.clone());
        let executor = ControlledExecutor::new(loader);
        let response = executor.invoke_dispatcher(&execution, caller, &HttpRequest::new("GET", "/", Vec::new()), 10_000);
        assert_eq!(response.status, StatusCode::Ok);
        assert_eq!(response.body, b"caller-ok");
    }

    #[test]
    fn depth_beyond_the_limit_is_rejected_before_dispatch() {
        let loader = Arc::new(TestLoader::new());
        let app: LongID = LongID(6);
        loader.register(
            app,
            Arc::new(FnDispatcher(move |ctx: &mut DispatchCtx<'_>, req: &HttpRequest| ctx.dependant_call(255, app, req))),
        );
        let execution = execution_declaring(loader.clone(), HashSet::from([app]));
        let executor = ControlledExecutor::new(loader);
        let response = executor.invoke_dispatcher(&execution, app, &HttpRequest::new("GET", "/", Vec::new()), 1_000_000_000);
        assert_eq!(response.status, StatusCode::LimitExceeded);
    }

    #[test]
    fn dispatch_ctx_add_int_accumulates_across_invocations_of_the_same_request() {
        use std::collections::BTreeMap as Map;
        use vmcore_storage::{ChunkBoundsInfo, Page};
        use vmcore_types::{AccessType, DeclaredAccess, FullID, VarLenFullID};

        let id = FullID::new(LongID(30), LongID(31), LongID(32));
        let var_id = VarLenFullID::encode(&id).unwrap();
        let page = Page::new_empty(var_id, 16, 0, true).unwrap();
        let mut bounds = Map::new();
        bounds.insert(
            id,
            ChunkBoundsInfo {
                size_lower_bound: 0,
                size_upper_bound: 16,
            },
        );
        let index = ChunkIndex::build(&[], &[page], bounds).unwrap();
        let chunk = index.get_chunk(&id).unwrap();

        let mut access_map = AccessMap::new();
        access_map.insert(
            (id.app, id.id),
            vec![
                DeclaredAccess {
                    offset: -2,
                    size: 0,
                    access_type: AccessType::ReadOnly,
                    request_id: 0,
                    new_size: None,
                },
                DeclaredAccess {
                    offset: 0,
                    size: 8,
                    access_type: AccessType::IntAdditive,
                    request_id: 0,
                    new_size: None,
                },
            ],
        );
        let modifier = build_modifier(&index, &access_map).unwrap();

        let loader = Arc::new(TestLoader::new());
        let app = id.app;
        let chunk_id = id.id;
        loader.register(
            app,
            Arc::new(FnDispatcher(move |ctx: &mut DispatchCtx<'_>, _req: &HttpRequest| {
                ctx.load_chunk(chunk_id)?;
                ctx.add_int::<u64>(0, 1234)?;
                ctx.save_version()?;
                ctx.add_int::<u64>(0, 556_677)?;
                Ok(HttpResponse::ok("test", Vec::new()))
            })),
        );

        let execution = RequestExecution::new(modifier, FailureManager::new(HashSet::new(), HashSet::new()), HashSet::new(), loader.clone());
        let executor = ControlledExecutor::new(loader);
        let response = executor.invoke_dispatcher(&execution, app, &HttpRequest::new("GET", "/", Vec::new()), 10_000);
        assert_eq!(response.status, StatusCode::Ok);

        execution.heap().lock().write_to_heap(|_app, _chunk| Some(chunk.clone())).unwrap();
        let bytes = chunk.read_at(0, 8).unwrap();
        assert_eq!(u64::from_le_bytes(bytes.try_into().unwrap()), 557_911);
    }
}
