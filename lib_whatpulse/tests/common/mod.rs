//! In-process stand-ins for the WhatPulse public API and local client.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// Shared, mutable behavior of a mock server.
#[derive(Default)]
pub struct Mock {
    pub hits: AtomicUsize,
    /// 0 means 200.
    pub status: AtomicU16,
    pub delay_ms: AtomicU64,
    pub payload: Mutex<Value>,
    pub last_query: Mutex<HashMap<String, String>>,
    pub last_body: Mutex<Option<Value>>,
    pub last_path: Mutex<Option<String>>,
}

impl Mock {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn set_status(&self, status: u16) {
        self.status.store(status, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set_payload(&self, payload: Value) {
        *self.payload.lock().unwrap() = payload;
    }

    async fn respond(&self) -> (StatusCode, Json<Value>) {
        self.hits.fetch_add(1, Ordering::SeqCst);
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        let status = match self.status.load(Ordering::SeqCst) {
            0 => StatusCode::OK,
            code => StatusCode::from_u16(code).unwrap(),
        };
        (status, Json(self.payload.lock().unwrap().clone()))
    }
}

async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// A public API mock at `http://{addr}/user.php`.
pub async fn public_api(payload: Value) -> (String, Arc<Mock>) {
    let mock = Arc::new(Mock::default());
    mock.set_payload(payload);

    async fn handler(
        State(mock): State<Arc<Mock>>,
        Query(query): Query<HashMap<String, String>>,
    ) -> (StatusCode, Json<Value>) {
        *mock.last_query.lock().unwrap() = query;
        mock.respond().await
    }

    let router = Router::new()
        .route("/user.php", get(handler))
        .with_state(mock.clone());
    let addr = serve(router).await;
    (format!("http://{addr}/user.php"), mock)
}

/// A local client mock: `GET /v1/all-stats` plus the three action endpoints.
pub async fn client_api(payload: Value) -> (String, Arc<Mock>) {
    let mock = Arc::new(Mock::default());
    mock.set_payload(payload);

    async fn stats(State(mock): State<Arc<Mock>>) -> (StatusCode, Json<Value>) {
        *mock.last_path.lock().unwrap() = Some("/v1/all-stats".to_string());
        mock.respond().await
    }

    async fn action(
        State(mock): State<Arc<Mock>>,
        uri: axum::http::Uri,
        body: String,
    ) -> (StatusCode, Json<Value>) {
        *mock.last_path.lock().unwrap() = Some(uri.path().to_string());
        *mock.last_body.lock().unwrap() = serde_json::from_str(&body).ok();
        mock.respond().await
    }

    let router = Router::new()
        .route("/v1/all-stats", get(stats))
        .route("/v1/pulse", post(action))
        .route("/v1/open-window", post(action))
        .route("/v1/profiles/activate", post(action))
        .with_state(mock.clone());
    let addr = serve(router).await;
    (format!("http://{addr}"), mock)
}

/// A typical public API document.
pub fn public_payload() -> Value {
    json!({
        "Keys": "1000",
        "Clicks": "500",
        "DownloadMB": "2048",
        "UploadMB": "1024",
        "UptimeShort": "10d 4h",
        "UptimeSeconds": "878400",
        "LastPulse": "2024-01-01 10:00:00",
        "LastPulseUnixTimestamp": "1704103200",
        "DateJoined": "2020-05-01",
        "Pulses": "321",
        "Ranks": { "Keys": "1234", "Clicks": "5678" },
        "Team": { "Name": "Rustaceans", "Ranks": { "Keys": "7" } }
    })
}

/// A typical local client `/v1/all-stats` document.
pub fn client_payload() -> Value {
    json!({
        "account-totals": {
            "keys": 2000,
            "clicks": 900,
            "download": 4096,
            "upload": 2048,
            "uptime": 900000
        },
        "unpulsed": { "keys": 12, "clicks": 3 },
        "realtime": { "download": "1.2MB/s", "upload": "0.3MB/s" }
    })
}
