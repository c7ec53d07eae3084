// tests/common/mod.rs
pub use axum::Router;
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::routing::post;
use axum::{Form, Json};
use http::StatusCode;

use anyhow::Result;
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use reqwest::{Request, Response};
use serde_json::Value;

use crate::resilience::retry::RetrySettings;
use crate::transport::Transport;

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

/// Identity provider stub that records every form it receives.
pub struct TokenServer {
    pub addr: SocketAddr,
    pub forms: Arc<Mutex<Vec<HashMap<String, String>>>>,
    pub handle: JoinHandle<()>,
}

impl TokenServer {
    pub fn url(&self) -> String {
        format!("http://{}/token", self.addr)
    }

    pub fn calls(&self) -> usize {
        self.forms.lock().unwrap().len()
    }

    pub fn grant_types(&self) -> Vec<String> {
        self.forms
            .lock()
            .unwrap()
            .iter()
            .map(|form| form.get("grant_type").cloned().unwrap_or_default())
            .collect()
    }

    pub fn form(&self, index: usize) -> HashMap<String, String> {
        self.forms.lock().unwrap()[index].clone()
    }
}

impl Drop for TokenServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Token endpoint at `/token` answering with `respond(call index, form)`.
pub async fn spawn_token_server<F>(respond: F) -> TokenServer
where
    F: Fn(usize, &HashMap<String, String>) -> (StatusCode, Value) + Send + Sync + 'static,
{
    spawn_slow_token_server(Duration::ZERO, respond).await
}

/// Like [`spawn_token_server`], but every answer is delayed by `delay`.
pub async fn spawn_slow_token_server<F>(delay: Duration, respond: F) -> TokenServer
where
    F: Fn(usize, &HashMap<String, String>) -> (StatusCode, Value) + Send + Sync + 'static,
{
    let forms: Arc<Mutex<Vec<HashMap<String, String>>>> = Arc::new(Mutex::new(Vec::new()));
    let respond = Arc::new(respond);
    let router = Router::new().route(
        "/token",
        post({
            let forms = forms.clone();
            move |Form(form): Form<HashMap<String, String>>| {
                let forms = forms.clone();
                let respond = respond.clone();
                async move {
                    let (status, body) = {
                        let mut forms = forms.lock().unwrap();
                        let reply = respond(forms.len(), &form);
                        forms.push(form);
                        reply
                    };
                    tokio::time::sleep(delay).await;
                    (status, Json(body))
                }
            }
        }),
    );
    let (handle, addr) = spawn_axum(router).await;
    TokenServer {
        addr,
        forms,
        handle,
    }
}

/// Unsigned JWT with the given `typ` that expires `expires_in` seconds from now,
/// or never when `None`.
pub fn make_token(typ: &str, expires_in: Option<i64>) -> String {
    let mut claims = json!({
        "typ": typ,
        "jti": next_id(),
    });
    if let Some(seconds) = expires_in {
        claims["exp"] = Value::from(Utc::now().timestamp() + seconds);
    }
    format!(
        "{}.{}.",
        URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(claims.to_string())
    )
}

fn next_id() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static NEXT: AtomicU64 = AtomicU64::new(0);
    format!("id-{}", NEXT.fetch_add(1, Ordering::Relaxed))
}

/// Successful token endpoint body for a fresh access/refresh pair.
pub fn token_body(access: &str, refresh: &str) -> Value {
    json!({
        "token_type": "bearer",
        "access_token": access,
        "refresh_token": refresh,
        "expires_in": 300,
        "refresh_expires_in": 1800,
    })
}

/// Backoff short enough for tests.
pub fn fast_retry() -> RetrySettings {
    RetrySettings {
        initial_interval: Duration::from_millis(10),
        multiplier: 1.5,
        max_interval: Duration::from_millis(50),
        max_elapsed_time: Duration::from_secs(5),
    }
}

/// Transport that fails the test if it is ever used.
pub struct PanicTransport;

#[async_trait]
impl Transport for PanicTransport {
    async fn send(&self, request: Request) -> Result<Response> {
        panic!("unexpected request to {}", request.url());
    }
}

/// Transport that records every request and answers with an empty 200.
#[derive(Default)]
pub struct RecordingTransport {
    pub requests: Mutex<Vec<(String, Option<String>)>>,
}

impl RecordingTransport {
    /// (url, authorization header) of every request seen so far.
    pub fn seen(&self) -> Vec<(String, Option<String>)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, request: Request) -> Result<Response> {
        let authorization = request
            .headers()
            .get(reqwest::header::AUTHORIZATION)
            .map(|value| value.to_str().unwrap().to_string());
        self.requests
            .lock()
            .unwrap()
            .push((request.url().to_string(), authorization));
        Ok(Response::from(http::Response::new("ok")))
    }
}

pub fn recording() -> Arc<RecordingTransport> {
    Arc::new(RecordingTransport::default())
}
