#![allow(dead_code)]

use axum::Router;
use deployctl::RequestExecutor;
use deployctl::config::UpstreamResolvedConfig;
use deployctl::providers::build_http_client;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use url::Url;

pub const TEST_TOKEN: &str = "test-token-123";

pub async fn spawn_test_server(app: Router) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    let base = Url::parse(&format!("http://{}", addr)).expect("valid base url");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    base
}

/// Base URL of a port nothing listens on.
pub async fn closed_port_url() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    Url::parse(&format!("http://{}", addr)).expect("valid base url")
}

pub fn upstream(base_delay: Duration, max_attempts: usize) -> UpstreamResolvedConfig {
    UpstreamResolvedConfig {
        retry_max_times: max_attempts,
        retry_base_delay: base_delay,
        request_timeout: Duration::from_secs(2),
        ..UpstreamResolvedConfig::default()
    }
}

/// Records every wait the executor asks for instead of sleeping.
#[derive(Clone, Default)]
pub struct SleepLog(Arc<Mutex<Vec<Duration>>>);

impl SleepLog {
    pub fn waits(&self) -> Vec<Duration> {
        self.0.lock().unwrap().clone()
    }
}

pub fn recording_executor(
    provider: &'static str,
    base: Url,
    cfg: &UpstreamResolvedConfig,
    log: &SleepLog,
) -> RequestExecutor {
    let client = build_http_client(cfg).expect("http client");
    let log = log.clone();
    RequestExecutor::new(provider, client, base, TEST_TOKEN, cfg).with_sleeper(move |dur| {
        log.0.lock().unwrap().push(dur);
        std::future::ready(())
    })
}
