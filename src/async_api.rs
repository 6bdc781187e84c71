use crate::dispatch::{new_dispatcher, Dispatcher};
use crate::{count_primes, DispatchConfig, Error, Request, Strategy};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::oneshot;

/// An async-friendly front end over any `Dispatcher`.
///
/// Each call creates a one-shot channel, uses its sender as the request's
/// sink and awaits the receiver, so the awaiting task is never blocked while
/// a background worker counts. With the inline strategy the count runs
/// inside `count` itself.
#[derive(Clone)]
pub struct Offload {
    dispatcher: Arc<dyn Dispatcher>,
}

impl Offload {
    pub fn new<D: Dispatcher + 'static>(dispatcher: D) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// Build the dispatcher for `config` and wrap it
    pub fn from_config(config: &DispatchConfig) -> Self {
        Self {
            dispatcher: Arc::from(new_dispatcher(config)),
        }
    }

    pub fn strategy(&self) -> Strategy {
        self.dispatcher.strategy()
    }

    /// Count the primes in `[2, bound]`
    pub async fn count(&self, bound: i64) -> u64 {
        self.count_with_origin(bound).await.0
    }

    /// Count the primes in `[2, bound]` and report which strategy produced
    /// the count (`Inline` when a background worker fell back)
    pub async fn count_with_origin(&self, bound: i64) -> (u64, Strategy) {
        let (tx, rx) = oneshot::channel();
        let request = Request::with_origin(bound, move |n, origin| {
            let _ = tx.send((n, origin));
        });
        let id = request.id();
        self.dispatcher.submit(request);

        match rx.await {
            Ok(delivered) => delivered,
            Err(e) => {
                // Every dispatcher path completes its request; a dropped sink is a bug.
                let err = Error::Canceled(format!("request {}: {}", id, e));
                log::error!("{}; recounting inline", err);
                (count_primes(bound), Strategy::Inline)
            }
        }
    }

    /// Count every bound concurrently; results follow input order
    pub async fn count_all(&self, bounds: &[i64]) -> Vec<u64> {
        join_all(bounds.iter().map(|&b| self.count(b))).await
    }

    /// `count_all` with the producing strategy of each count
    pub async fn count_all_with_origin(&self, bounds: &[i64]) -> Vec<(u64, Strategy)> {
        join_all(bounds.iter().map(|&b| self.count_with_origin(b))).await
    }
}

impl std::fmt::Debug for Offload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Offload")
            .field("strategy", &self.strategy())
            .finish()
    }
}
