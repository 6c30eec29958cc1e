// src/api.rs
use axum::{
    extract::{FromRequest, FromRequestParts, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::assignment_store::{Assignment, EmployeeId, HalfDay, SlotKey};
use crate::planner::{DropTarget, DropVerdict, MoveOutcome, SlotPlanner, TaskRef};
use crate::slot_layout::{resolve_column, SlotBounds, SLOT_COLUMNS};
use crate::AppError;

#[derive(Clone)]
pub struct AppState {
    pub planner: Arc<SlotPlanner>,
}

// --- Request/Response Bodies ---

#[derive(Deserialize, Debug)]
pub struct ResolveColumnRequest {
    pub drop_x: f64,
    pub slot_bounds: SlotBounds,
}

#[derive(Serialize, Debug)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Serialize, Debug)]
pub struct ResolveColumnResponse {
    pub column: u8,
}

#[derive(Deserialize, Debug, Default)]
pub struct ValidateDropRequest {
    pub hours: Option<Decimal>,
    pub assignment_id: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct DropTaskRequest {
    pub task_id: String,
    pub title: String,
    pub hours: Option<Decimal>,
    #[serde(flatten)]
    pub target: DropTarget,
}

#[derive(Deserialize, Debug)]
pub struct MoveAssignmentRequest {
    pub employee_id: EmployeeId,
    pub date: NaiveDate,
    pub half_day: HalfDay,
    #[serde(flatten)]
    pub target: DropTarget,
}

type SlotPath = AppPath<(EmployeeId, NaiveDate, HalfDay)>;

// --- Extractors ---

/// `Json` body whose rejection is reported as an `AppError`.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// `Path` parameters whose rejection is reported as an `AppError`.
#[derive(FromRequestParts)]
#[from_request(via(Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

// --- Router ---

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/layout/column", post(handle_resolve_column))
        .route(
            "/slots/{employee_id}/{date}/{half_day}",
            get(handle_get_slot),
        )
        .route(
            "/slots/{employee_id}/{date}/{half_day}/validate",
            post(handle_validate_drop),
        )
        .route(
            "/slots/{employee_id}/{date}/{half_day}/tasks",
            post(handle_drop_task),
        )
        .route("/assignments/{id}", delete(handle_remove_assignment))
        .route("/assignments/{id}/move", post(handle_move_assignment));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// --- Handlers ---

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn handle_resolve_column(
    AppJson(payload): AppJson<ResolveColumnRequest>,
) -> Json<ResolveColumnResponse> {
    Json(ResolveColumnResponse {
        column: resolve_column(payload.drop_x, payload.slot_bounds),
    })
}

async fn handle_get_slot(
    State(state): State<AppState>,
    AppPath((employee_id, date, half_day)): SlotPath,
) -> Result<Json<Vec<Assignment>>, AppError> {
    let key = SlotKey::new(employee_id, date, half_day);
    Ok(Json(state.planner.slot(&key).await?))
}

async fn handle_validate_drop(
    State(state): State<AppState>,
    AppPath((employee_id, date, half_day)): SlotPath,
    AppJson(payload): AppJson<ValidateDropRequest>,
) -> Result<Json<DropVerdict>, AppError> {
    let key = SlotKey::new(employee_id, date, half_day);
    let verdict = state
        .planner
        .check_drop(&key, payload.hours, payload.assignment_id.as_deref())
        .await?;
    Ok(Json(verdict))
}

async fn handle_drop_task(
    State(state): State<AppState>,
    AppPath((employee_id, date, half_day)): SlotPath,
    AppJson(payload): AppJson<DropTaskRequest>,
) -> Result<impl IntoResponse, AppError> {
    check_target(&payload.target)?;
    if payload.task_id.trim().is_empty() {
        return Err(AppError::BadRequest("task_id must not be empty".to_string()));
    }

    let key = SlotKey::new(employee_id, date, half_day);
    info!("Drop request for task {} into slot {}", payload.task_id, key);
    let task = TaskRef {
        task_id: payload.task_id,
        title: payload.title,
    };
    let arrangement = state
        .planner
        .drop_task(&key, task, payload.hours, payload.target)
        .await?;
    Ok((StatusCode::CREATED, Json(arrangement)))
}

async fn handle_move_assignment(
    State(state): State<AppState>,
    AppPath(id): AppPath<String>,
    AppJson(payload): AppJson<MoveAssignmentRequest>,
) -> Result<Json<MoveOutcome>, AppError> {
    check_target(&payload.target)?;

    let to_key = SlotKey::new(payload.employee_id, payload.date, payload.half_day);
    info!("Move request for assignment {} to slot {}", id, to_key);
    let outcome = state
        .planner
        .move_assignment(&id, &to_key, payload.target)
        .await?;
    Ok(Json(outcome))
}

async fn handle_remove_assignment(
    State(state): State<AppState>,
    AppPath(id): AppPath<String>,
) -> Result<Json<Vec<Assignment>>, AppError> {
    info!("Remove request for assignment {}", id);
    Ok(Json(state.planner.remove_assignment(&id).await?))
}

/// Explicit columns must address one of the slot's columns.
fn check_target(target: &DropTarget) -> Result<(), AppError> {
    match *target {
        DropTarget::Column { target_column } if target_column >= SLOT_COLUMNS => {
            Err(AppError::BadRequest(format!(
                "target_column {} is outside 0..{}",
                target_column,
                SLOT_COLUMNS - 1
            )))
        }
        _ => Ok(()),
    }
}
