use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::data::{RawSlot, Session, SessionId, StudentId, UpdateMode};
use crate::engine::{Coordinator, UpdateReport};
use crate::error::StoreError;
use crate::store::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SessionStore>,
    pub coordinator: Coordinator,
}

impl AppState {
    pub fn new(coordinator: Coordinator) -> Self {
        AppState {
            store: Arc::new(SessionStore::new(coordinator.clone())),
            coordinator,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            StoreError::SessionNotFound(_) => (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND"),
            StoreError::StudentNotEnrolled { .. } => (StatusCode::BAD_REQUEST, "STUDENT_NOT_ENROLLED"),
        };
        warn!("Request failed: {self}");
        let body = ApiError {
            code: code.to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub teacher_availability: Vec<RawSlot>,
}

#[derive(Debug, Deserialize)]
pub struct TeacherAvailabilityRequest {
    pub availability: Vec<RawSlot>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub student_id: StudentId,
    #[serde(default)]
    pub windows: Option<Vec<RawSlot>>,
}

#[derive(Debug, Deserialize)]
pub struct PreferenceRequest {
    pub windows: Vec<RawSlot>,
    #[serde(default)]
    pub mode: UpdateMode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSnapshot {
    pub student_id: StudentId,
    #[serde(default)]
    pub windows: Vec<RawSlot>,
}

/// A complete session snapshot for one-shot coordination.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinateRequest {
    #[serde(default)]
    pub teacher_availability: Vec<RawSlot>,
    #[serde(default)]
    pub students: Vec<StudentSnapshot>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session: Session,
    #[serde(flatten)]
    pub report: UpdateReport,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveResponse {
    #[serde(flatten)]
    pub report: UpdateReport,
    pub retired: bool,
}

type ApiResult<T> = Result<Json<T>, StoreError>;

async fn create_session_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> (StatusCode, Json<SessionResponse>) {
    let (session, report) = state.store.create(&request.teacher_availability).await;
    (StatusCode::CREATED, Json(SessionResponse { session, report }))
}

async fn get_session_handler(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> ApiResult<Session> {
    state.store.get(id).await.map(Json)
}

async fn teacher_handler(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
    Json(request): Json<TeacherAvailabilityRequest>,
) -> ApiResult<UpdateReport> {
    state
        .store
        .set_teacher_availability(id, &request.availability)
        .await
        .map(Json)
}

async fn join_handler(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
    Json(request): Json<JoinRequest>,
) -> ApiResult<UpdateReport> {
    state
        .store
        .join(id, &request.student_id, request.windows.as_deref())
        .await
        .map(Json)
}

async fn preferences_handler(
    State(state): State<AppState>,
    Path((id, student_id)): Path<(SessionId, StudentId)>,
    Json(request): Json<PreferenceRequest>,
) -> ApiResult<UpdateReport> {
    state
        .store
        .update_preferences(id, &student_id, &request.windows, request.mode)
        .await
        .map(Json)
}

async fn leave_handler(
    State(state): State<AppState>,
    Path((id, student_id)): Path<(SessionId, StudentId)>,
) -> ApiResult<LeaveResponse> {
    let left = state.store.leave(id, &student_id).await?;
    Ok(Json(LeaveResponse {
        report: left.report,
        retired: left.retired,
    }))
}

/// Coordinates a snapshot without touching the store.
async fn coordinate_handler(
    State(state): State<AppState>,
    Json(request): Json<CoordinateRequest>,
) -> Json<UpdateReport> {
    let students = request
        .students
        .iter()
        .map(|student| (student.student_id.as_str(), student.windows.as_slice()));
    Json(
        state
            .coordinator
            .coordinate_snapshot(&request.teacher_availability, students),
    )
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/schedule/coordinate", post(coordinate_handler))
        .route("/v1/sessions", post(create_session_handler))
        .route("/v1/sessions/:id", get(get_session_handler))
        .route("/v1/sessions/:id/teacher", put(teacher_handler))
        .route("/v1/sessions/:id/students", post(join_handler))
        .route(
            "/v1/sessions/:id/students/:student_id",
            put(preferences_handler).delete(leave_handler),
        )
        .with_state(state)
}

pub async fn run_server(config: ServerConfig, coordinator: Coordinator) -> std::io::Result<()> {
    let app = router(AppState::new(coordinator));

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("Server running at http://{}", listener.local_addr()?);

    axum::serve(listener, app).await
}
