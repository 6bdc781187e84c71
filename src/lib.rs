//! Offloaded prime counting
//!
//! Counts the primes up to a bound on a background execution unit when one is
//! available, and inline on the caller's thread when it is not. Callers hand
//! over a bound and a sink; the sink receives exactly one count.
//!
//! # Strategies
//!
//! - **auto** (default): **thread** when the target can spawn threads, else **inline**
//! - **thread**: a short-lived named thread per request
//! - **process**: a child `primeworker worker` per request, speaking JSON lines
//! - **inline**: no offloading, the count runs before `dispatch` returns
//!
//! # Example
//!
//! ```
//! use primeworker::{DispatchConfig, Dispatcher};
//! use std::sync::mpsc;
//!
//! let dispatcher = primeworker::new_dispatcher(&DispatchConfig::default());
//! let (tx, rx) = mpsc::channel();
//! dispatcher.dispatch(1000, move |count| {
//!     let _ = tx.send(count);
//! });
//! assert_eq!(rx.recv().unwrap(), 168);
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub mod error;
pub use error::{Error, Result};

pub mod primes;
pub use primes::{count_primes, is_prime};

pub mod request;
pub use request::{Request, RequestState, Sink};

// Wire messages shared by thread and process workers
pub mod protocol;

pub mod dispatch;
pub use dispatch::{new_dispatcher, Dispatcher, InlineDispatcher};
#[cfg(feature = "process-worker")]
pub use dispatch::ProcessDispatcher;
#[cfg(feature = "thread-worker")]
pub use dispatch::ThreadDispatcher;

// Async-friendly facade over any dispatcher
pub mod async_api;
pub use async_api::Offload;

/// File stem of the binary that understands the worker subcommand
pub const BIN_NAME: &str = "primeworker";

/// Subcommand a process worker is launched with
pub const WORKER_SUBCOMMAND: &str = "worker";

/// Environment variable overriding `DispatchConfig::strategy`
pub const STRATEGY_ENV: &str = "PRIMEWORKER_STRATEGY";

/// Environment variable overriding `DispatchConfig::worker_exe`
pub const WORKER_EXE_ENV: &str = "PRIMEWORKER_WORKER_EXE";

/// Where prime counts run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Use a background thread when available, otherwise inline
    #[default]
    Auto,
    /// Fresh worker thread per request
    Thread,
    /// Fresh worker process per request
    Process,
    /// Caller's thread, synchronously
    Inline,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Strategy::Auto => "auto",
            Strategy::Thread => "thread",
            Strategy::Process => "process",
            Strategy::Inline => "inline",
        };
        f.write_str(s)
    }
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Strategy::Auto),
            "thread" => Ok(Strategy::Thread),
            "process" => Ok(Strategy::Process),
            "inline" | "main" => Ok(Strategy::Inline),
            other => Err(Error::ConfigError(format!(
                "unknown strategy '{}' (expected auto, thread, process or inline)",
                other
            ))),
        }
    }
}

/// Configuration for building a dispatcher
///
/// The defaults offload to a thread when the target supports it:
///
/// ```
/// let cfg = primeworker::DispatchConfig::default();
/// assert_eq!(cfg.strategy, primeworker::Strategy::Auto);
/// assert!(cfg.worker_exe.is_none());
/// ```
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Which execution strategy to use
    pub strategy: Strategy,
    /// Worker binary for the process strategy.
    ///
    /// `None` means the current executable, which is only accepted when it is
    /// the `primeworker` binary itself. Library consumers that want process
    /// workers must point this at an installed `primeworker`; otherwise the
    /// process strategy degrades to a thread worker.
    pub worker_exe: Option<PathBuf>,
    /// Prefix for worker thread names; the request id is appended
    pub thread_name_prefix: String,
    /// Stack size for worker threads (`None` => platform default)
    pub stack_size: Option<usize>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Auto,
            worker_exe: None,
            thread_name_prefix: "primeworker".to_string(),
            stack_size: None,
        }
    }
}

impl DispatchConfig {
    /// Defaults overridden by `PRIMEWORKER_STRATEGY` and `PRIMEWORKER_WORKER_EXE`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(s) = lookup(STRATEGY_ENV).filter(|s| !s.trim().is_empty()) {
            cfg.strategy = s.parse()?;
        }
        if let Some(p) = lookup(WORKER_EXE_ENV).filter(|s| !s.trim().is_empty()) {
            cfg.worker_exe = Some(PathBuf::from(p));
        }
        Ok(cfg)
    }

    /// The worker executable the process strategy would launch.
    ///
    /// Without an explicit `worker_exe`, the current executable qualifies only
    /// if it is the `primeworker` binary; any other host would be re-run with
    /// a `worker` argument it does not understand.
    pub fn resolve_worker_exe(&self) -> Result<PathBuf> {
        if let Some(p) = &self.worker_exe {
            return Ok(p.clone());
        }
        let exe = std::env::current_exe()
            .map_err(|e| Error::ConfigError(format!("cannot locate current executable: {}", e)))?;
        if is_worker_binary(&exe) {
            Ok(exe)
        } else {
            Err(Error::ConfigError(format!(
                "current executable {} is not a {} binary; set worker_exe",
                exe.display(),
                BIN_NAME
            )))
        }
    }
}

fn is_worker_binary(path: &std::path::Path) -> bool {
    path.file_stem().and_then(|s| s.to_str()) == Some(BIN_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = DispatchConfig::default();
        assert_eq!(config.strategy, Strategy::Auto);
        assert_eq!(config.thread_name_prefix, "primeworker");
        assert!(config.stack_size.is_none());
    }

    #[test]
    fn strategy_parses_case_insensitively() {
        assert_eq!("THREAD".parse::<Strategy>().unwrap(), Strategy::Thread);
        assert_eq!(" process ".parse::<Strategy>().unwrap(), Strategy::Process);
        assert_eq!("main".parse::<Strategy>().unwrap(), Strategy::Inline);
        assert!("gpu".parse::<Strategy>().is_err());
        assert_eq!(Strategy::Inline.to_string(), "inline");
    }

    #[test]
    fn env_overrides_defaults() {
        let vars: HashMap<&str, &str> = [(STRATEGY_ENV, "inline"), (WORKER_EXE_ENV, "/opt/pw")].into_iter().collect();
        let cfg = DispatchConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(cfg.strategy, Strategy::Inline);
        assert_eq!(cfg.worker_exe, Some(PathBuf::from("/opt/pw")));
        assert_eq!(cfg.resolve_worker_exe().unwrap(), PathBuf::from("/opt/pw"));
    }

    #[test]
    fn empty_env_keeps_defaults() {
        let cfg = DispatchConfig::from_lookup(|_| Some(String::new())).unwrap();
        assert_eq!(cfg.strategy, Strategy::Auto);
        assert!(cfg.worker_exe.is_none());
    }

    #[test]
    fn foreign_host_is_not_a_default_worker() {
        // the unit-test harness is `primeworker-<hash>`, not the CLI binary
        let err = DispatchConfig::default().resolve_worker_exe().unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
        assert!(is_worker_binary(std::path::Path::new("/usr/local/bin/primeworker")));
        assert!(is_worker_binary(std::path::Path::new("C:/tools/primeworker.exe")));
        assert!(!is_worker_binary(std::path::Path::new("/usr/bin/myapp")));
    }

    #[test]
    fn bad_env_strategy_is_config_error() {
        let err = DispatchConfig::from_lookup(|k| (k == STRATEGY_ENV).then(|| "fast".to_string())).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }
}
