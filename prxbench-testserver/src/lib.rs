//! Local origin server and forward proxy for integration tests.
//!
//! `TestServer` is the benchmark target; `ForwardProxy` is a minimal
//! absolute-form HTTP/1.1 forwarder, so tests can exercise real
//! proxy-routed requests without leaving the loopback interface.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::{TokioExecutor, TokioIo};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Duration, sleep};

pub const PATH_PLAINTEXT: &str = "/plaintext";
pub const PATH_SLOW: &str = "/slow";
pub const PATH_STATUS: &str = "/status/{code}";
pub const PATH_BYTES: &str = "/bytes/{n}";

const MAX_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, Default)]
pub struct TestServerStats {
    requests_total: Arc<AtomicU64>,
}

impl TestServerStats {
    fn inc_requests_total(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
pub struct TestServer {
    addr: SocketAddr,
    stats: TestServerStats,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

#[derive(Debug, Deserialize)]
struct SlowParams {
    ms: Option<u64>,
}

async fn plaintext(State(stats): State<TestServerStats>) -> &'static str {
    stats.inc_requests_total();
    "Hello, World!"
}

async fn slow(State(stats): State<TestServerStats>, Query(params): Query<SlowParams>) -> &'static str {
    stats.inc_requests_total();
    sleep(Duration::from_millis(params.ms.unwrap_or(100))).await;
    "ok"
}

async fn status(
    State(stats): State<TestServerStats>,
    Path(code): Path<u16>,
) -> (StatusCode, &'static str) {
    stats.inc_requests_total();
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, "")
}

async fn bytes(State(stats): State<TestServerStats>, Path(n): Path<usize>) -> Vec<u8> {
    stats.inc_requests_total();
    vec![b'x'; n.min(MAX_BYTES)]
}

impl TestServer {
    pub async fn start() -> anyhow::Result<Self> {
        let stats = TestServerStats::default();
        let app = Router::new()
            .route(PATH_PLAINTEXT, get(plaintext))
            .route(PATH_SLOW, get(slow))
            .route(PATH_STATUS, get(status))
            .route(PATH_BYTES, get(bytes))
            .with_state(stats.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
        });

        Ok(Self {
            addr,
            stats,
            shutdown: Some(shutdown_tx),
            task,
        })
    }

    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    #[must_use]
    pub fn stats(&self) -> &TestServerStats {
        &self.stats
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = (&mut self.task).await;
    }
}

/// Minimal HTTP/1.1 forward proxy: accepts absolute-form requests and
/// re-issues them to the origin named in the request target.
#[derive(Debug)]
pub struct ForwardProxy {
    addr: SocketAddr,
    forwarded: Arc<AtomicU64>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ForwardProxy {
    pub async fn start() -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let forwarded = Arc::new(AtomicU64::new(0));
        let client: Client<HttpConnector, Incoming> =
            Client::builder(TokioExecutor::new()).build_http();

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let accept_forwarded = forwarded.clone();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    accepted = listener.accept() => {
                        let Ok((stream, _peer)) = accepted else {
                            break;
                        };
                        let client = client.clone();
                        let forwarded = accept_forwarded.clone();
                        tokio::spawn(async move {
                            let service = service_fn(move |req: hyper::Request<Incoming>| {
                                let client = client.clone();
                                let forwarded = forwarded.clone();
                                async move {
                                    forwarded.fetch_add(1, Ordering::Relaxed);
                                    client.request(req).await
                                }
                            });

                            let _ = hyper::server::conn::http1::Builder::new()
                                .serve_connection(TokioIo::new(stream), service)
                                .await;
                        });
                    }
                }
            }
        });

        Ok(Self {
            addr,
            forwarded,
            shutdown: Some(shutdown_tx),
            task,
        })
    }

    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Requests this proxy has forwarded so far.
    #[must_use]
    pub fn forwarded_total(&self) -> u64 {
        self.forwarded.load(Ordering::Relaxed)
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = (&mut self.task).await;
    }
}
