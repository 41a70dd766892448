use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Json, Response};
use dolphins_registry::{DiverProfile, Invocation, Operation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_json::value::RawValue;

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NewLevelRequest {
    pub id: String,
    pub levelname: String,
    pub org: String,
    pub instid: String,
}

#[derive(Debug, Deserialize)]
pub struct CourseRequest {
    pub id: String,
    pub levelname: String,
    pub course: String,
}

#[derive(Debug, Deserialize)]
pub struct TestResultRequest {
    pub id: String,
    pub levelname: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct DiverQuery {
    pub id: String,
}

/// Body returned by every successful mutation.
#[derive(Debug, Serialize)]
pub struct MutationResponse {
    pub result: &'static str,
    pub record: Box<RawValue>,
}

fn mutation(state: &AppState, invocation: Invocation) -> ServerResult<Json<MutationResponse>> {
    let encoded = state.execute(&invocation)?;
    let record = RawValue::from_string(encoded).map_err(|e| ServerError::Internal(e.to_string()))?;
    Ok(Json(MutationResponse {
        result: "success",
        record,
    }))
}

fn raw_json(body: String) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

/// Health check handler.
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Info handler.
pub async fn info_handler() -> Json<serde_json::Value> {
    let operations: Vec<&str> = Operation::ALL.iter().map(Operation::name).collect();
    Json(json!({
        "name": "dolphins-server",
        "version": env!("CARGO_PKG_VERSION"),
        "operations": operations,
    }))
}

pub async fn add_diver(
    State(state): State<AppState>,
    Json(profile): Json<DiverProfile>,
) -> ServerResult<Json<MutationResponse>> {
    tracing::info!(id = %profile.id, "add diver");
    mutation(
        &state,
        Invocation::new(
            Operation::AddDiver.name(),
            [profile.id, profile.name, profile.birth_date, profile.gender, profile.diver_type],
        ),
    )
}

pub async fn add_level(
    State(state): State<AppState>,
    Json(req): Json<NewLevelRequest>,
) -> ServerResult<Json<MutationResponse>> {
    tracing::info!(id = %req.id, level = %req.levelname, "add level");
    mutation(
        &state,
        Invocation::new(Operation::AddLevel.name(), [req.id, req.levelname, req.org, req.instid]),
    )
}

pub async fn add_course(
    State(state): State<AppState>,
    Json(req): Json<CourseRequest>,
) -> ServerResult<Json<MutationResponse>> {
    tracing::info!(id = %req.id, level = %req.levelname, course = %req.course, "add course");
    mutation(
        &state,
        Invocation::new(Operation::AddCourse.name(), [req.id, req.levelname, req.course]),
    )
}

pub async fn add_test_result(
    State(state): State<AppState>,
    Json(req): Json<TestResultRequest>,
) -> ServerResult<Json<MutationResponse>> {
    tracing::info!(id = %req.id, level = %req.levelname, status = %req.status, "add test result");
    mutation(
        &state,
        Invocation::new(Operation::AddTestResult.name(), [req.id, req.levelname, req.status]),
    )
}

pub async fn get_diver(
    State(state): State<AppState>,
    Query(query): Query<DiverQuery>,
) -> ServerResult<Response> {
    let record = state.execute(&Invocation::new(Operation::GetLevel.name(), [query.id]))?;
    Ok(raw_json(record))
}

pub async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<DiverQuery>,
) -> ServerResult<Response> {
    let history = state.execute(&Invocation::new(Operation::GetHistoryForKey.name(), [query.id]))?;
    Ok(raw_json(history))
}

/// Generic dispatch: `{"fn": "...", "args": [...]}`.
pub async fn invoke(
    State(state): State<AppState>,
    Json(invocation): Json<Invocation>,
) -> ServerResult<Response> {
    Ok(raw_json(state.execute(&invocation)?))
}
