//! Synchronous dispatcher: counts on the caller's thread.

use super::Dispatcher;
use crate::{count_primes, Request, Strategy};

/// Runs every request on the calling thread; the sink fires before
/// `submit` returns.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineDispatcher;

impl InlineDispatcher {
    pub fn new() -> Self {
        InlineDispatcher
    }
}

impl Dispatcher for InlineDispatcher {
    fn submit(&self, mut request: Request) {
        request.mark_dispatched(Strategy::Inline);
        let count = count_primes(request.bound());
        request.complete(count);
    }

    fn strategy(&self) -> Strategy {
        Strategy::Inline
    }
}

/// Complete a request on the current thread after a background path failed.
#[cfg_attr(not(any(feature = "thread-worker", feature = "process-worker")), allow(dead_code))]
pub(crate) fn run_fallback(mut request: Request) {
    request.mark_fallback();
    let count = count_primes(request.bound());
    request.complete(count);
}
