//! Process-backed dispatcher: one child `primeworker worker` per request.
//!
//! A driver thread owns the child for the whole round trip: it writes one
//! request line, closes stdin, reads one response line and reaps the child.
//! Any failure along the way is logged and the count is computed on the
//! driver thread instead.

use super::inline::run_fallback;
use super::{Dispatcher, Job};
use crate::protocol::{self, WorkerRequest, WorkerResponse};
use crate::{Error, Request, Result, Strategy, WORKER_SUBCOMMAND};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;

/// Launches `<exe> worker` for every request.
#[derive(Debug, Clone)]
pub struct ProcessDispatcher {
    exe: PathBuf,
}

impl ProcessDispatcher {
    pub fn new(exe: impl Into<PathBuf>) -> Self {
        Self { exe: exe.into() }
    }

    /// Path of the worker executable
    pub fn exe(&self) -> &Path {
        &self.exe
    }

    /// Send one request to a fresh worker process and wait for its reply.
    pub fn round_trip(&self, message: WorkerRequest) -> Result<WorkerResponse> {
        let mut child = Command::new(&self.exe)
            .arg(WORKER_SUBCOMMAND)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| Error::SpawnError(format!("{}: {}", self.exe.display(), e)))?;

        let res = exchange(&mut child, message);
        if res.is_err() {
            let _ = child.kill();
        }
        let _ = child.wait();
        res
    }

    fn driver_main(&self, rx: Receiver<Job>) {
        let Ok(Job { message, request }) = rx.recv() else {
            return;
        };
        match self.round_trip(message) {
            Ok(reply) => request.complete(reply.count),
            Err(e) => {
                log::warn!("process worker for request {} failed ({}); counting on the driver thread", message.id, e);
                run_fallback(request);
            }
        }
    }
}

fn exchange(child: &mut Child, message: WorkerRequest) -> Result<WorkerResponse> {
    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| Error::SpawnError("worker stdin was not captured".to_string()))?;
    writeln!(stdin, "{}", protocol::encode(&message)?)?;
    stdin.flush()?;
    // EOF tells the worker there is nothing more to answer
    drop(stdin);

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::SpawnError("worker stdout was not captured".to_string()))?;
    let mut line = String::new();
    if BufReader::new(stdout).read_line(&mut line)? == 0 {
        return Err(Error::WorkerClosed(message.id));
    }

    let reply: WorkerResponse = protocol::decode(&line)?;
    if reply.id != message.id {
        return Err(Error::ProtocolError(format!(
            "reply id {} does not match request {}",
            reply.id, message.id
        )));
    }
    Ok(reply)
}

impl Dispatcher for ProcessDispatcher {
    fn submit(&self, mut request: Request) {
        let (tx, rx) = mpsc::sync_channel::<Job>(1);
        let driver = self.clone();

        let spawned = thread::Builder::new()
            .name(format!("primeworker-proc-{}", request.id()))
            .spawn(move || driver.driver_main(rx));
        if let Err(e) = spawned {
            log::warn!("driver thread for request {} failed to start ({}); running inline", request.id(), e);
            run_fallback(request);
            return;
        }

        request.mark_dispatched(Strategy::Process);
        if let Err(mpsc::SendError(job)) = tx.send(Job::new(request)) {
            log::warn!("driver thread for request {} exited early; running inline", job.request.id());
            run_fallback(job.request);
        }
    }

    fn strategy(&self) -> Strategy {
        Strategy::Process
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn missing_executable_is_a_spawn_error() {
        let d = ProcessDispatcher::new("/no/such/primeworker");
        let err = d.round_trip(WorkerRequest { id: 1, bound: 10 }).unwrap_err();
        assert!(matches!(err, Error::SpawnError(_)));
    }

    #[test]
    fn missing_executable_still_delivers() {
        let d = ProcessDispatcher::new("/no/such/primeworker");
        let (tx, rx) = mpsc::channel();
        d.dispatch(100, move |n| {
            let _ = tx.send(n);
        });
        assert_eq!(rx.recv_timeout(Duration::from_secs(10)).unwrap(), 25);
    }

    #[cfg(unix)]
    #[test]
    fn silent_worker_is_rejected() {
        let exe = Path::new("/bin/true");
        if !exe.is_file() {
            return;
        }
        let d = ProcessDispatcher::new(exe);
        assert!(d.round_trip(WorkerRequest { id: 2, bound: 10 }).is_err());

        let (tx, rx) = mpsc::channel();
        d.dispatch(10, move |n| {
            let _ = tx.send(n);
        });
        assert_eq!(rx.recv_timeout(Duration::from_secs(10)).unwrap(), 4);
    }

    #[test]
    fn failed_worker_reports_inline_origin() {
        let d = ProcessDispatcher::new("/no/such/primeworker");
        let (tx, rx) = mpsc::channel();
        d.submit(Request::with_origin(1000, move |n, origin| {
            let _ = tx.send((n, origin));
        }));
        assert_eq!(rx.recv_timeout(Duration::from_secs(10)).unwrap(), (168, Strategy::Inline));
    }

    #[cfg(unix)]
    #[test]
    fn non_json_reply_is_a_protocol_error() {
        // `echo worker` answers with the bare word "worker"
        let exe = Path::new("/bin/echo");
        if !exe.is_file() {
            return;
        }
        let d = ProcessDispatcher::new(exe);
        let err = d.round_trip(WorkerRequest { id: 3, bound: 10 }).unwrap_err();
        assert!(matches!(err, Error::ProtocolError(_) | Error::Io(_)), "{:?}", err);
    }
}
