//! A single prime-count request and its one-shot result sink.

use crate::Strategy;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Callback receiving the count for exactly one request, plus the strategy
/// that actually produced it
pub type Sink = Box<dyn FnOnce(u64, Strategy) + Send + 'static>;

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Lifecycle of a request: `Created -> Dispatched -> Completed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Created,
    Dispatched,
    Completed,
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RequestState::Created => "created",
            RequestState::Dispatched => "dispatched",
            RequestState::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// A bound paired with the sink that receives its count.
///
/// `complete` consumes the request, so a sink can never fire twice, and every
/// dispatcher path ends in `complete`, so it never fires zero times.
pub struct Request {
    id: u64,
    bound: i64,
    state: RequestState,
    ran_on: Option<Strategy>,
    sink: Sink,
}

impl Request {
    /// Create a request with a fresh process-unique id
    pub fn new<F>(bound: i64, sink: F) -> Self
    where
        F: FnOnce(u64) + Send + 'static,
    {
        Self::with_origin(bound, move |count, _| sink(count))
    }

    /// Like `new`, but the sink also learns which strategy ran the count,
    /// so a background request that fell back to inline reports `Inline`
    pub fn with_origin<F>(bound: i64, sink: F) -> Self
    where
        F: FnOnce(u64, Strategy) + Send + 'static,
    {
        let id = NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed);
        log::trace!("request {} {} (bound {})", id, RequestState::Created, bound);
        Self {
            id,
            bound,
            state: RequestState::Created,
            ran_on: None,
            sink: Box::new(sink),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn bound(&self) -> i64 {
        self.bound
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    /// Strategy the request was handed to, once dispatched
    pub fn ran_on(&self) -> Option<Strategy> {
        self.ran_on
    }

    /// Record that `strategy` has taken the request over
    pub fn mark_dispatched(&mut self, strategy: Strategy) {
        debug_assert_eq!(self.state, RequestState::Created);
        self.state = RequestState::Dispatched;
        self.ran_on = Some(strategy);
        log::debug!("request {} {} via {}", self.id, self.state, strategy);
    }

    /// Record that a background path gave up and the count runs inline
    #[cfg_attr(not(any(feature = "thread-worker", feature = "process-worker")), allow(dead_code))]
    pub(crate) fn mark_fallback(&mut self) {
        if self.state == RequestState::Created {
            self.state = RequestState::Dispatched;
        }
        self.ran_on = Some(Strategy::Inline);
        log::debug!("request {} falling back to inline", self.id);
    }

    /// Deliver the count to the sink and drop the request.
    ///
    /// Dispatchers implemented outside this crate finish every request here.
    pub fn complete(self, count: u64) {
        let Request { id, ran_on, sink, .. } = self;
        let ran_on = ran_on.unwrap_or(Strategy::Inline);
        log::debug!("request {} {} with {} ({})", id, RequestState::Completed, count, ran_on);
        sink(count, ran_on);
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("id", &self.id)
            .field("bound", &self.bound)
            .field("state", &self.state)
            .field("ran_on", &self.ran_on)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn ids_are_unique() {
        let a = Request::new(1, |_| {});
        let b = Request::new(1, |_| {});
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn lifecycle_reaches_completion_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(AtomicU64::new(0));
        let (c, s) = (calls.clone(), seen.clone());

        let mut req = Request::new(10, move |n| {
            c.fetch_add(1, Ordering::SeqCst);
            s.store(n, Ordering::SeqCst);
        });
        assert_eq!(req.state(), RequestState::Created);
        assert_eq!(req.bound(), 10);

        req.mark_dispatched(Strategy::Inline);
        assert_eq!(req.state(), RequestState::Dispatched);

        req.complete(4);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(seen.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn origin_follows_fallback() {
        let seen = Arc::new(std::sync::Mutex::new(None));
        let s = seen.clone();
        let mut req = Request::with_origin(10, move |n, origin| {
            *s.lock().unwrap() = Some((n, origin));
        });
        req.mark_dispatched(Strategy::Thread);
        assert_eq!(req.ran_on(), Some(Strategy::Thread));
        req.mark_fallback();
        assert_eq!(req.state(), RequestState::Dispatched);
        req.complete(4);
        assert_eq!(*seen.lock().unwrap(), Some((4, Strategy::Inline)));
    }

    #[test]
    fn debug_omits_sink() {
        let req = Request::new(5, |_| {});
        let s = format!("{:?}", req);
        assert!(s.contains("bound: 5"));
        assert!(s.contains("Created"));
    }
}
