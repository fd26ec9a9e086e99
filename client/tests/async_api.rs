//! Asynchronous sends and continuation chains against the live mock server.
//!
//! # Design
//! Verifies the `Pending` contract end to end: non-blocking dispatch,
//! continuation composition and ordering, the composed chain timeout, and
//! the guarantee that continuations run on the client's worker pool rather
//! than the thread that registered them.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use httpc::{handler, Client, Error, Request};

fn start_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });
    addr
}

#[test]
fn async_send_resolves_with_body() {
    let addr = start_server();
    let client = Client::new().unwrap();
    let request = Request::builder(format!("http://{addr}/text")).build().unwrap();

    let body = client
        .send_async(&request, handler::text())
        .map(|response| response.into_body())
        .wait_timeout(Duration::from_secs(10))
        .unwrap();

    assert!(!body.is_empty());
}

#[test]
fn send_async_does_not_block_the_caller() {
    let addr = start_server();
    let client = Client::new().unwrap();
    let request = Request::builder(format!("http://{addr}/slow/2000")).build().unwrap();

    let started = Instant::now();
    let pending = client.send_async(&request, handler::discard());
    assert!(started.elapsed() < Duration::from_millis(500));

    // Detaching is allowed; the in-flight request is simply abandoned.
    drop(pending);
}

#[test]
fn consume_observes_the_terminal_value() {
    let addr = start_server();
    let client = Client::new().unwrap();
    let request = Request::builder(format!("http://{addr}/text")).build().unwrap();

    let seen = Arc::new(Mutex::new(None));
    let slot = seen.clone();
    client
        .send_async(&request, handler::text())
        .map(|response| response.into_body())
        .consume(move |body| {
            *slot.lock().unwrap() = Some(body);
        })
        .wait_timeout(Duration::from_secs(10))
        .unwrap();

    let body = seen.lock().unwrap().take().unwrap();
    assert!(!body.is_empty());
}

#[test]
fn chain_timeout_resolves_to_async_timeout_and_skips_continuations() {
    let addr = start_server();
    let client = Client::new().unwrap();
    let request = Request::builder(format!("http://{addr}/slow/5000")).build().unwrap();

    let invoked = Arc::new(AtomicBool::new(false));
    let flag = invoked.clone();
    let err = client
        .send_async(&request, handler::text())
        .or_timeout(Duration::from_millis(200))
        .consume(move |_| {
            flag.store(true, Ordering::SeqCst);
        })
        .wait()
        .unwrap_err();

    assert!(matches!(err, Error::AsyncTimeout), "got: {err}");
    assert!(!invoked.load(Ordering::SeqCst), "continuation must not run");
}

#[test]
fn continuations_run_on_a_worker_thread() {
    let addr = start_server();
    let client = Client::new().unwrap();
    let request = Request::builder(format!("http://{addr}/text")).build().unwrap();

    let registering = std::thread::current().id();
    let observed = Arc::new(Mutex::new(None));
    let slot = observed.clone();
    client
        .send_async(&request, handler::discard())
        .consume(move |_| {
            let current = std::thread::current();
            *slot.lock().unwrap() = Some((current.id(), current.name().map(String::from)));
        })
        .wait_timeout(Duration::from_secs(10))
        .unwrap();

    let (worker_id, worker_name) = observed.lock().unwrap().take().expect("continuation ran");
    assert_ne!(worker_id, registering);
    assert_eq!(worker_name.as_deref(), Some("httpc-worker"));
}

#[test]
fn blocking_wait_with_timeout_retrieves_the_response() {
    let addr = start_server();
    let client = Client::new().unwrap();
    let request = Request::builder(format!("http://{addr}/text")).build().unwrap();

    let response = client
        .send_async(&request, handler::text())
        .wait_timeout(Duration::from_secs(10))
        .unwrap();

    assert!(response.is_success());
    assert!(response.first_header("content-type").is_some());
    assert!(!response.body().is_empty());
}

#[test]
fn concurrent_async_sends_are_independent() {
    let addr = start_server();
    let client = Client::new().unwrap();
    let request = Request::builder(format!("http://{addr}/text")).build().unwrap();

    let pendings: Vec<_> = (0..4)
        .map(|_| client.send_async(&request, handler::text()))
        .collect();

    for pending in pendings {
        let response = pending.wait_timeout(Duration::from_secs(10)).unwrap();
        assert!(response.is_success());
    }
}
