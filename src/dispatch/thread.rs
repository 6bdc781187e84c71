//! Thread-backed dispatcher: one short-lived worker thread per request.

use super::inline::run_fallback;
use super::{Dispatcher, Job};
use crate::protocol;
use crate::{DispatchConfig, Request, Strategy};
use std::sync::mpsc::{self, Receiver};
use std::thread;

/// Spawns a fresh named thread for every request.
///
/// The bound crosses into the thread over a capacity-1 channel; the thread
/// answers by completing the request and then exits. The sink therefore runs
/// on the worker thread, never on the caller's.
#[derive(Debug, Clone)]
pub struct ThreadDispatcher {
    name_prefix: String,
    stack_size: Option<usize>,
}

impl ThreadDispatcher {
    pub fn new() -> Self {
        Self::from_config(&DispatchConfig::default())
    }

    pub fn from_config(config: &DispatchConfig) -> Self {
        Self {
            name_prefix: config.thread_name_prefix.clone(),
            stack_size: config.stack_size,
        }
    }

    fn builder(&self, id: u64) -> thread::Builder {
        let builder = thread::Builder::new().name(format!("{}-{}", self.name_prefix, id));
        match self.stack_size {
            Some(size) => builder.stack_size(size),
            None => builder,
        }
    }
}

impl Default for ThreadDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn worker_main(rx: Receiver<Job>) {
    // Exactly one job arrives; the sender is dropped right after sending it.
    if let Ok(Job { message, request }) = rx.recv() {
        let reply = protocol::handle(message);
        request.complete(reply.count);
    }
}

impl Dispatcher for ThreadDispatcher {
    fn submit(&self, mut request: Request) {
        let (tx, rx) = mpsc::sync_channel::<Job>(1);

        let spawned = self.builder(request.id()).spawn(move || worker_main(rx));
        if let Err(e) = spawned {
            log::warn!("thread worker for request {} failed to start ({}); running inline", request.id(), e);
            run_fallback(request);
            return;
        }

        request.mark_dispatched(Strategy::Thread);
        if let Err(mpsc::SendError(job)) = tx.send(Job::new(request)) {
            log::warn!("thread worker for request {} exited early; running inline", job.request.id());
            run_fallback(job.request);
        }
    }

    fn strategy(&self) -> Strategy {
        Strategy::Thread
    }
}
