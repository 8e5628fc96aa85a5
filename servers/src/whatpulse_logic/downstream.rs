use crate::whatpulse_logic::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use lib_whatpulse::adapter::{ButtonInfo, SensorState};
use lib_whatpulse::stats::actions::ProfileId;
use lib_whatpulse::stats::client::{FetchState, Source};
use lib_whatpulse::WhatPulseError;
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use tokio::sync::broadcast;
use tracing::{info, warn};

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/sensors", get(list_sensors))
        .route("/sensors/{unique_id}", get(get_sensor))
        .route("/buttons", get(list_buttons))
        .route("/buttons/{action_id}/press", post(press_button))
        .route("/services/activate_profile", post(activate_profile))
        .with_state(app_state)
}

pub async fn run(
    port: u16,
    app_state: AppState,
    mut shutdown: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let app = router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Downstream server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.recv().await.ok();
            info!("Downstream server shutting down.");
        })
        .await?;
    Ok(())
}

/// An error reply: `{"error": "..."}` with a status derived from the cause.
struct ApiError(StatusCode, String);

impl From<WhatPulseError> for ApiError {
    fn from(err: WhatPulseError) -> Self {
        let status = match err {
            WhatPulseError::UnknownAction(_) | WhatPulseError::ClientApiDisabled => StatusCode::NOT_FOUND,
            WhatPulseError::InvalidProfileId(_) | WhatPulseError::InvalidUrl { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(json!({ "error": self.1 }))).into_response()
    }
}

/// `200` on success, `502` when the client did not accept the action.
fn action_outcome(success: bool) -> Response {
    let status = if success { StatusCode::OK } else { StatusCode::BAD_GATEWAY };
    (status, Json(json!({ "success": success }))).into_response()
}

/// Liveness plus the throttle state of each enabled source.
async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let settings = state.adapter.settings();
    let client = state.adapter.client();
    let (public, local) = tokio::join!(
        client.fetch_state(Source::Public),
        client.fetch_state(Source::Client),
    );
    Json(json!({
        "status": "ok",
        "api_type": client.api_type(),
        "scan_interval_secs": settings.scan_interval.as_secs(),
        "sensors": state.registry.sensors().len(),
        "sources": {
            "public": public.as_ref().map(source_health),
            "client": local.as_ref().map(source_health),
        },
    }))
}

fn source_health(fetch: &FetchState) -> Value {
    json!({
        "last_fetch_unix": fetch.last_fetch_unix(),
        "refresh_interval_secs": fetch.refresh_interval_secs(),
        "has_data": fetch.cached_payload().is_some(),
    })
}

async fn list_sensors(State(state): State<AppState>) -> Json<Vec<SensorState>> {
    Json(state.registry.sensors())
}

async fn get_sensor(
    State(state): State<AppState>,
    Path(unique_id): Path<String>,
) -> Result<Json<SensorState>, ApiError> {
    state
        .registry
        .sensor(&unique_id)
        .map(Json)
        .ok_or_else(|| ApiError(StatusCode::NOT_FOUND, format!("Unknown sensor: {unique_id}")))
}

async fn list_buttons(State(state): State<AppState>) -> Json<Vec<ButtonInfo>> {
    Json(state.registry.buttons())
}

async fn press_button(
    State(state): State<AppState>,
    Path(action_id): Path<String>,
) -> Result<Response, ApiError> {
    info!(action = %action_id, "Button pressed");
    let success = state.adapter.press(&action_id).await?;
    Ok(action_outcome(success))
}

#[derive(Debug, Deserialize)]
struct ActivateProfileRequest {
    profile_id: i64,
    client_api_url: Option<String>,
}

async fn activate_profile(
    State(state): State<AppState>,
    Json(request): Json<ActivateProfileRequest>,
) -> Result<Response, ApiError> {
    let profile_id = ProfileId::try_from(request.profile_id).inspect_err(|e| {
        warn!(error = %e, "Rejected activate_profile call");
    })?;
    let success = state
        .adapter
        .activate_profile(profile_id, request.client_api_url.as_deref())
        .await?;
    Ok(action_outcome(success))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::whatpulse_logic::state::EntityRegistry;
    use lib_whatpulse::adapter::Adapter;
    use lib_whatpulse::configs::AdapterConfig;
    use lib_whatpulse::stats::client::ApiType;
    use std::sync::Arc;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    /// A local client that accepts pulses and rejects everything else.
    async fn mock_client() -> String {
        let app = Router::new()
            .route("/v1/pulse", post(|| async { StatusCode::OK }))
            .route("/v1/open-window", post(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
            .route("/v1/profiles/activate", post(|| async { StatusCode::OK }));
        serve(app).await
    }

    async fn bridge(api_type: ApiType, client_api_url: String) -> String {
        let settings = AdapterConfig {
            userid: Some("42".into()),
            api_type: Some(api_type),
            client_api_url: Some(client_api_url),
            sensors: Some(vec!["Keys".into(), "UnpulsedKeys".into()]),
            request_timeout_secs: Some(2),
            ..Default::default()
        }
        .validate()
        .unwrap();
        let adapter = Arc::new(Adapter::setup(settings).unwrap());
        let registry = Arc::new(EntityRegistry::default());
        let _poller = adapter.poller(registry.clone());
        serve(router(AppState::new(adapter, registry))).await
    }

    #[tokio::test]
    async fn sensors_and_buttons_are_listed() {
        let base = bridge(ApiType::Client, mock_client().await).await;
        let http = reqwest::Client::new();

        let sensors: Vec<Value> = http.get(format!("{base}/sensors")).send().await.unwrap().json().await.unwrap();
        assert_eq!(sensors.len(), 2);

        let keys = http.get(format!("{base}/sensors/whatpulse_42_Keys")).send().await.unwrap();
        assert_eq!(keys.status(), 200);
        let keys: Value = keys.json().await.unwrap();
        assert_eq!(keys["name"], "WhatPulse Keys");
        assert_eq!(keys["state"], Value::Null);

        let missing = http.get(format!("{base}/sensors/whatpulse_42_Mice")).send().await.unwrap();
        assert_eq!(missing.status(), 404);

        let buttons: Vec<Value> = http.get(format!("{base}/buttons")).send().await.unwrap().json().await.unwrap();
        assert_eq!(buttons.len(), 2);
    }

    #[tokio::test]
    async fn health_reports_enabled_sources() {
        let base = bridge(ApiType::Client, mock_client().await).await;
        let http = reqwest::Client::new();

        let health = http.get(format!("{base}/health")).send().await.unwrap();
        assert_eq!(health.status(), 200);
        let health: Value = health.json().await.unwrap();
        assert_eq!(health["status"], "ok");
        assert_eq!(health["api_type"], "client");
        assert_eq!(health["scan_interval_secs"], 30);
        assert_eq!(health["sensors"], 2);
        assert_eq!(health["sources"]["public"], Value::Null);
        assert_eq!(
            health["sources"]["client"],
            json!({"last_fetch_unix": null, "refresh_interval_secs": 30, "has_data": false})
        );
    }

    #[tokio::test]
    async fn button_presses_report_outcome() {
        let base = bridge(ApiType::Client, mock_client().await).await;
        let http = reqwest::Client::new();

        let ok = http.post(format!("{base}/buttons/pulse/press")).send().await.unwrap();
        assert_eq!(ok.status(), 200);
        assert_eq!(ok.json::<Value>().await.unwrap(), json!({"success": true}));

        let rejected = http.post(format!("{base}/buttons/open_window/press")).send().await.unwrap();
        assert_eq!(rejected.status(), 502);
        assert_eq!(rejected.json::<Value>().await.unwrap(), json!({"success": false}));

        let unknown = http.post(format!("{base}/buttons/reboot/press")).send().await.unwrap();
        assert_eq!(unknown.status(), 404);
    }

    #[tokio::test]
    async fn activate_profile_validates_input() {
        let base = bridge(ApiType::Client, mock_client().await).await;
        let http = reqwest::Client::new();
        let url = format!("{base}/services/activate_profile");

        let ok = http.post(&url).json(&json!({"profile_id": 2})).send().await.unwrap();
        assert_eq!(ok.status(), 200);

        let zero = http.post(&url).json(&json!({"profile_id": 0})).send().await.unwrap();
        assert_eq!(zero.status(), 400);

        let bad_url = http
            .post(&url)
            .json(&json!({"profile_id": 2, "client_api_url": "nope"}))
            .send()
            .await
            .unwrap();
        assert_eq!(bad_url.status(), 400);
    }

    #[tokio::test]
    async fn activate_profile_needs_client_api() {
        let base = bridge(ApiType::Public, "http://localhost:3490".into()).await;
        let http = reqwest::Client::new();

        let reply = http
            .post(format!("{base}/services/activate_profile"))
            .json(&json!({"profile_id": 2}))
            .send()
            .await
            .unwrap();
        assert_eq!(reply.status(), 404);

        let buttons: Vec<Value> = http.get(format!("{base}/buttons")).send().await.unwrap().json().await.unwrap();
        assert!(buttons.is_empty());
    }
}
