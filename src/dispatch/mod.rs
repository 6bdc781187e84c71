//! Offload dispatchers: run a prime count somewhere and deliver it to a sink.
//!
//! Every strategy implements the same `Dispatcher` contract, so callers see
//! one result per request regardless of where the count ran. The strategy is
//! picked once by `new_dispatcher`; background failures later fall back to
//! inline execution rather than surfacing an error.

pub mod inline;
#[cfg(feature = "process-worker")]
pub mod process;
#[cfg(feature = "thread-worker")]
pub mod thread;

pub use inline::InlineDispatcher;
#[cfg(feature = "process-worker")]
pub use process::ProcessDispatcher;
#[cfg(feature = "thread-worker")]
pub use thread::ThreadDispatcher;

#[cfg(any(feature = "thread-worker", feature = "process-worker"))]
use crate::protocol::WorkerRequest;
use crate::{DispatchConfig, Request, Strategy};
use std::path::Path;
use std::sync::Arc;

/// Message handed to a background unit: the bound to count plus the request
/// whose sink receives the reply.
#[cfg(any(feature = "thread-worker", feature = "process-worker"))]
pub(crate) struct Job {
    pub(crate) message: WorkerRequest,
    pub(crate) request: Request,
}

#[cfg(any(feature = "thread-worker", feature = "process-worker"))]
impl Job {
    pub(crate) fn new(request: Request) -> Self {
        let message = WorkerRequest {
            id: request.id(),
            bound: request.bound(),
        };
        Self { message, request }
    }
}

/// Core trait for offload strategies
pub trait Dispatcher: Send + Sync {
    /// Run the request and deliver its count to the request's sink exactly once.
    fn submit(&self, request: Request);

    /// The strategy this dispatcher executes with
    fn strategy(&self) -> Strategy;

    /// Count the primes up to `bound` and hand the result to `sink`.
    fn dispatch<F>(&self, bound: i64, sink: F)
    where
        Self: Sized,
        F: FnOnce(u64) + Send + 'static,
    {
        self.submit(Request::new(bound, sink));
    }
}

impl<D: Dispatcher + ?Sized> Dispatcher for Box<D> {
    fn submit(&self, request: Request) {
        (**self).submit(request)
    }

    fn strategy(&self) -> Strategy {
        (**self).strategy()
    }
}

impl<D: Dispatcher + ?Sized> Dispatcher for Arc<D> {
    fn submit(&self, request: Request) {
        (**self).submit(request)
    }

    fn strategy(&self) -> Strategy {
        (**self).strategy()
    }
}

/// Whether this build and target can spawn worker threads
pub fn threads_available() -> bool {
    cfg!(feature = "thread-worker") && !cfg!(all(target_family = "wasm", not(target_feature = "atomics")))
}

/// Whether a worker process can be launched from `exe`
pub fn process_worker_available(exe: &Path) -> bool {
    cfg!(feature = "process-worker") && threads_available() && exe.is_file()
}

/// Build the dispatcher for `config`.
///
/// `Auto` prefers a thread worker and drops to inline when threads are not
/// available. An explicit strategy that cannot run here degrades the same way
/// (`process` -> `thread` -> `inline`) with a warning.
pub fn new_dispatcher(config: &DispatchConfig) -> Box<dyn Dispatcher> {
    match config.strategy {
        Strategy::Inline => Box::new(InlineDispatcher::new()),
        Strategy::Process => process_or_fallback(config),
        Strategy::Thread => thread_or_inline(config, true),
        Strategy::Auto => thread_or_inline(config, false),
    }
}

#[cfg(feature = "process-worker")]
fn process_or_fallback(config: &DispatchConfig) -> Box<dyn Dispatcher> {
    match config.resolve_worker_exe() {
        Ok(exe) if process_worker_available(&exe) => Box::new(ProcessDispatcher::new(exe)),
        Ok(exe) => {
            log::warn!("worker executable {} is not usable; using a thread worker", exe.display());
            thread_or_inline(config, false)
        }
        Err(e) => {
            log::warn!("{}; using a thread worker", e);
            thread_or_inline(config, false)
        }
    }
}

#[cfg(not(feature = "process-worker"))]
fn process_or_fallback(config: &DispatchConfig) -> Box<dyn Dispatcher> {
    log::warn!("built without process-worker support; using a thread worker");
    thread_or_inline(config, false)
}

#[cfg(feature = "thread-worker")]
fn thread_or_inline(config: &DispatchConfig, explicit: bool) -> Box<dyn Dispatcher> {
    if threads_available() {
        return Box::new(ThreadDispatcher::from_config(config));
    }
    if explicit {
        log::warn!("threads are not available on this target; running inline");
    }
    Box::new(InlineDispatcher::new())
}

#[cfg(not(feature = "thread-worker"))]
fn thread_or_inline(_config: &DispatchConfig, explicit: bool) -> Box<dyn Dispatcher> {
    if explicit {
        log::warn!("built without thread-worker support; running inline");
    }
    Box::new(InlineDispatcher::new())
}
