use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::app::AppState;
use crate::formats::BookAnalysis;
use crate::pipeline::RunReport;
use crate::provider::CredentialBroker as _;
use crate::samples;

type ApiError = (StatusCode, String);

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok\n" }))
        .route("/api/state", get(get_state))
        .route("/api/runs", post(start_run))
        .route("/api/runs/analysis", post(start_render))
        .route("/api/reset", post(reset))
        .route(
            "/api/credential",
            get(get_credential).put(select_credential),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StartRunRequest {
    pub text: Option<String>,
    pub example: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartRunResponse {
    pub run_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CredentialStatus {
    pub has_credential: bool,
    pub selection_requested: bool,
}

#[derive(Debug, Deserialize)]
pub struct SelectCredentialRequest {
    pub api_key: String,
}

async fn get_state(State(state): State<AppState>) -> Json<RunReport> {
    Json(RunReport {
        state: state.session.state(),
        analysis: state.session.displayed(),
    })
}

async fn start_run(
    State(state): State<AppState>,
    Json(req): Json<StartRunRequest>,
) -> Result<(StatusCode, Json<StartRunResponse>), ApiError> {
    let text = match (req.example, req.text) {
        (true, _) => samples::example_text(),
        (false, Some(text)) if !text.trim().is_empty() => text,
        (false, _) => {
            return Err((
                StatusCode::BAD_REQUEST,
                "text is required (or set example=true)".to_string(),
            ));
        }
    };

    let tracker = state.session.start_text(text);
    tracing::info!(run_id = %tracker.run_id(), example = req.example, "run started");
    Ok((
        StatusCode::ACCEPTED,
        Json(StartRunResponse {
            run_id: tracker.run_id(),
        }),
    ))
}

async fn start_render(
    State(state): State<AppState>,
    Json(analysis): Json<BookAnalysis>,
) -> (StatusCode, Json<StartRunResponse>) {
    let tracker = state.session.start_analysis(analysis);
    tracing::info!(run_id = %tracker.run_id(), "render started");
    (
        StatusCode::ACCEPTED,
        Json(StartRunResponse {
            run_id: tracker.run_id(),
        }),
    )
}

async fn reset(State(state): State<AppState>) -> StatusCode {
    state.session.reset();
    StatusCode::NO_CONTENT
}

async fn get_credential(State(state): State<AppState>) -> Json<CredentialStatus> {
    Json(CredentialStatus {
        has_credential: state.credentials.has_credential(),
        selection_requested: state.credentials.selection_requested(),
    })
}

async fn select_credential(
    State(state): State<AppState>,
    Json(req): Json<SelectCredentialRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .credentials
        .select(&req.api_key)
        .map_err(|err| (StatusCode::BAD_REQUEST, err.to_string()))?;
    Ok(StatusCode::NO_CONTENT)
}
