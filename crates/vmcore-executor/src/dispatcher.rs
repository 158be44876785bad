// Path: crates/vmcore-executor/src/dispatcher.rs
//! The application-loading collaborator (spec.md §6.3) and the dispatcher
//! ABI it hands back. Concrete native-module loading is explicitly out of
//! scope (spec.md §1); `Dispatcher` is the safe boundary this workspace
//! substitutes for the source's raw `fn(response_buffer, request_view) ->
//! status_code` function pointer, so host-provided dispatchers can be
//! expressed as ordinary Rust closures/trait objects instead of unchecked
//! native calls.

use crate::executor::DispatchCtx;
use std::sync::Arc;
use vmcore_types::{ApplicationError, HttpRequest, HttpResponse, LongID};

/// One loaded application (spec.md §6.3 `AppHandle`).
#[derive(Clone)]
pub struct AppHandle {
    pub app_id: LongID,
    pub version: u64,
    pub dispatcher: Arc<dyn Dispatcher>,
}

/// The dispatcher ABI (spec.md §6.3): untrusted application code invoked
/// under the controlled executor's sandbox. Given a mutable call context —
/// through which `dependant_call`/`invoke_deferred`/`enter_area`/`exit_area`
/// are available — and the inbound request, produces a response or an
/// `ApplicationError` that unwinds to the nearest call context (spec.md
/// §4.7, §7).
pub trait Dispatcher: Send + Sync {
    fn invoke(&self, ctx: &mut DispatchCtx<'_>, request: &HttpRequest) -> Result<HttpResponse, ApplicationError>;
}

/// `AppLoader` (spec.md §6.3, consumed): compiles/loads an application's
/// dispatcher. `load` returns `None` when the app has no registered
/// dispatcher, matching `dependant_call`'s `NotFound` contract.
pub trait AppLoader: Send + Sync {
    fn load(&self, app_id: LongID) -> Option<AppHandle>;
    fn unload(&self, handle: AppHandle);
}

/// A closure-backed `Dispatcher`, for tests and for hosts that implement an
/// application purely in Rust rather than loading a native module.
pub struct FnDispatcher<F>(pub F)
where
    F: Fn(&mut DispatchCtx<'_>, &HttpRequest) -> Result<HttpResponse, ApplicationError> + Send + Sync;

impl<F> Dispatcher for FnDispatcher<F>
where
    F: Fn(&mut DispatchCtx<'_>, &HttpRequest) -> Result<HttpResponse, ApplicationError> + Send + Sync,
{
    fn invoke(&self, ctx: &mut DispatchCtx<'_>, request: &HttpRequest) -> Result<HttpResponse, ApplicationError> {
        (self.0)(ctx, request)
    }
}
