//! Async handle for in-flight sends.
//!
//! # Design
//! `Pending<T>` wraps a oneshot receiver plus a handle to the client's
//! worker runtime. Every combinator spawns a new worker task at the moment
//! of registration, so continuations run on the worker pool — never on the
//! thread that composed the chain — and execute in registration order
//! within a single chain. `or_timeout` measures from the moment it is
//! composed; when it fires, downstream continuations observe
//! `Error::AsyncTimeout` and their closures are not invoked. The upstream
//! task keeps running (in-flight network activity is not aborted), but the
//! caller is unblocked promptly.

use std::future::Future;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::error::Error;

/// A handle to a value that will eventually be produced on the client's
/// worker pool.
///
/// Obtained from [`Client::send_async`](crate::Client::send_async).
/// Dropping a `Pending` detaches the chain without cancelling the
/// underlying work.
#[derive(Debug)]
pub struct Pending<T> {
    rx: oneshot::Receiver<Result<T, Error>>,
    handle: Handle,
}

impl<T: Send + 'static> Pending<T> {
    /// Spawn `fut` on the worker runtime and return a handle to its result.
    pub(crate) fn spawn<F>(handle: Handle, fut: F) -> Self
    where
        F: Future<Output = Result<T, Error>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        handle.spawn(async move {
            // The receiver may have been dropped; nothing to do then.
            let _ = tx.send(fut.await);
        });
        Pending { rx, handle }
    }

    /// Register a continuation that transforms the eventual value.
    ///
    /// `f` runs on a worker thread once the value is available. It is not
    /// invoked if the chain has already failed.
    pub fn map<U, F>(self, f: F) -> Pending<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let Pending { rx, handle } = self;
        Pending::spawn(handle, async move {
            match rx.await {
                Ok(Ok(value)) => Ok(f(value)),
                Ok(Err(err)) => Err(err),
                Err(_) => Err(Error::AsyncTimeout),
            }
        })
    }

    /// Register a terminal continuation that consumes the value for side
    /// effects. Not invoked if the chain has already failed.
    pub fn consume<F>(self, f: F) -> Pending<()>
    where
        F: FnOnce(T) + Send + 'static,
    {
        self.map(f)
    }

    /// Impose an additional timeout on the chain, measured from now (not
    /// from when the original request was issued). On elapse the chain
    /// resolves to [`Error::AsyncTimeout`] and downstream continuations
    /// are skipped.
    pub fn or_timeout(self, limit: Duration) -> Pending<T> {
        let Pending { rx, handle } = self;
        Pending::spawn(handle, async move {
            match tokio::time::timeout(limit, rx).await {
                Ok(Ok(result)) => result,
                Ok(Err(_)) => Err(Error::AsyncTimeout),
                Err(_) => Err(Error::AsyncTimeout),
            }
        })
    }

    /// Block the calling thread until the chain resolves.
    ///
    /// Must not be called from async context or from continuation code
    /// running on the worker pool.
    pub fn wait(self) -> Result<T, Error> {
        self.rx.blocking_recv().unwrap_or(Err(Error::AsyncTimeout))
    }

    /// Block the calling thread for at most `limit`. The same calling
    /// restrictions as [`wait`](Pending::wait) apply.
    pub fn wait_timeout(self, limit: Duration) -> Result<T, Error> {
        let Pending { rx, handle } = self;
        handle.block_on(async move {
            match tokio::time::timeout(limit, rx).await {
                Ok(Ok(result)) => result,
                Ok(Err(_)) => Err(Error::AsyncTimeout),
                Err(_) => Err(Error::AsyncTimeout),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap()
    }

    #[test]
    fn map_transforms_value() {
        let rt = runtime();
        let pending = Pending::spawn(rt.handle().clone(), async { Ok(21) });
        let result = pending.map(|n| n * 2).wait().unwrap();
        assert_eq!(result, 42);
    }

    #[test]
    fn continuations_run_in_registration_order() {
        let rt = runtime();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let first = seen.clone();
        let second = seen.clone();
        let pending = Pending::spawn(rt.handle().clone(), async { Ok("value") })
            .map(move |v| {
                first.lock().unwrap().push("map");
                v
            })
            .consume(move |_| {
                second.lock().unwrap().push("consume");
            });
        pending.wait().unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["map", "consume"]);
    }

    #[test]
    fn or_timeout_resolves_to_async_timeout() {
        let rt = runtime();
        let pending = Pending::spawn(rt.handle().clone(), async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(1)
        });
        let err = pending.or_timeout(Duration::from_millis(50)).wait().unwrap_err();
        assert!(matches!(err, Error::AsyncTimeout));
    }

    #[test]
    fn continuation_after_timeout_is_not_invoked() {
        let rt = runtime();
        let invoked = Arc::new(AtomicBool::new(false));
        let flag = invoked.clone();
        let pending = Pending::spawn(rt.handle().clone(), async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(1)
        })
        .or_timeout(Duration::from_millis(50))
        .map(move |n| {
            flag.store(true, Ordering::SeqCst);
            n
        });
        assert!(pending.wait().is_err());
        assert!(!invoked.load(Ordering::SeqCst));
    }

    #[test]
    fn continuation_runs_on_worker_thread() {
        let rt = runtime();
        let registering = std::thread::current().id();
        let observed = Arc::new(Mutex::new(None));
        let slot = observed.clone();
        Pending::spawn(rt.handle().clone(), async { Ok(()) })
            .consume(move |_| {
                *slot.lock().unwrap() = Some(std::thread::current().id());
            })
            .wait()
            .unwrap();
        let worker = observed.lock().unwrap().expect("continuation ran");
        assert_ne!(worker, registering);
    }

    #[test]
    fn wait_timeout_returns_value_in_time() {
        let rt = runtime();
        let pending = Pending::spawn(rt.handle().clone(), async { Ok("done") });
        let value = pending.wait_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(value, "done");
    }

    #[test]
    fn wait_timeout_elapses() {
        let rt = runtime();
        let pending = Pending::spawn(rt.handle().clone(), async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        });
        let err = pending.wait_timeout(Duration::from_millis(50)).unwrap_err();
        assert!(matches!(err, Error::AsyncTimeout));
    }
}
