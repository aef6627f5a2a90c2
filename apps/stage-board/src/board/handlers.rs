//! Axum route handlers for the stage board API.
//!
//! Every mutating call answers with the current board view and the events the
//! orchestrator queued while handling it.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::board::collision::{Collision, DragGeometry, Droppable};
use crate::board::confirmation::TransitionForm;
use crate::board::engine::DropOutcome;
use crate::board::orchestrator::{
    BoardEvent, BoardOrchestrator, BoardView, SharedBoard, SubmissionOutcome,
};
use crate::board::schedule::ScheduleForm;
use crate::board::BoardError;
use crate::errors::AppError;
use crate::models::candidate::{CandidateStage, InterviewSchedule};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBoardRequest {
    pub job_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragStartRequest {
    pub candidate_id: i64,
}

/// Pointer-move and drop ticks share the same payload.
#[derive(Debug, Deserialize)]
pub struct DragGestureRequest {
    #[serde(flatten)]
    pub geometry: DragGeometry,
    #[serde(default)]
    pub droppables: Vec<Droppable>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardResponse {
    pub session_id: Uuid,
    pub board: BoardView,
    pub events: Vec<BoardEvent>,
}

#[derive(Debug, Serialize)]
pub struct DragMoveResponse {
    pub collisions: Vec<Collision>,
    #[serde(flatten)]
    pub board: BoardResponse,
}

#[derive(Debug, Serialize)]
pub struct DropResponse {
    pub outcome: DropOutcome,
    #[serde(flatten)]
    pub board: BoardResponse,
}

#[derive(Debug, Serialize)]
pub struct ConfirmationResponse {
    pub outcome: SubmissionOutcome,
    #[serde(flatten)]
    pub board: BoardResponse,
}

#[derive(Debug, Serialize)]
pub struct CandidateDetailResponse {
    pub candidate: CandidateStage,
    pub interview: Option<InterviewSchedule>,
}

#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    /// `None` when the service refused; the events carry the reason.
    pub candidate: Option<CandidateStage>,
    #[serde(flatten)]
    pub board: BoardResponse,
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

async fn session(state: &AppState, id: Uuid) -> Result<SharedBoard, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Board session {id} not found")))
}

fn respond(session_id: Uuid, board: &mut BoardOrchestrator) -> BoardResponse {
    BoardResponse {
        session_id,
        board: board.view(),
        events: board.drain_events(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/boards
///
/// Opens a board session for a job and performs the initial load. A failed
/// stage listing still creates the session, in the `failed` load state, so the
/// client can retry with a refresh.
pub async fn handle_create_board(
    State(state): State<AppState>,
    Json(request): Json<CreateBoardRequest>,
) -> Result<(StatusCode, Json<BoardResponse>), AppError> {
    if request.job_id <= 0 {
        return Err(AppError::validation("jobId must be a positive integer"));
    }

    let board =
        BoardOrchestrator::new(state.api.clone(), request.job_id, state.config.candidate_query());
    let (session_id, shared) = state.sessions.insert(board).await;
    info!(%session_id, job_id = request.job_id, "Board session opened");

    if let Err(e) = shared.load().await {
        warn!(%session_id, job_id = request.job_id, "Initial board load failed: {e}");
    }

    let mut board = shared.lock().await;
    Ok((StatusCode::CREATED, Json(respond(session_id, &mut board))))
}

/// GET /api/v1/boards/:id
pub async fn handle_get_board(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BoardResponse>, AppError> {
    let shared = session(&state, id).await?;
    let mut board = shared.lock().await;
    Ok(Json(respond(id, &mut board)))
}

/// DELETE /api/v1/boards/:id
pub async fn handle_close_board(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.sessions.remove(id).await {
        return Err(AppError::NotFound(format!("Board session {id} not found")));
    }
    info!(session_id = %id, "Board session closed");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/boards/:id/refresh
///
/// Answers 409 while a load is already in progress. A failed reload is
/// reported through the view's load state.
pub async fn handle_refresh(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BoardResponse>, AppError> {
    let shared = session(&state, id).await?;
    match shared.refresh().await {
        Ok(()) => {}
        Err(BoardError::Busy) => return Err(BoardError::Busy.into()),
        Err(e) => warn!(session_id = %id, "Board refresh failed: {e}"),
    }
    let mut board = shared.lock().await;
    Ok(Json(respond(id, &mut board)))
}

/// POST /api/v1/boards/:id/drag/start
pub async fn handle_drag_start(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<DragStartRequest>,
) -> Result<Json<BoardResponse>, AppError> {
    let shared = session(&state, id).await?;
    let mut board = shared.lock().await;
    board.begin_drag(request.candidate_id)?;
    Ok(Json(respond(id, &mut board)))
}

/// POST /api/v1/boards/:id/drag/move
///
/// Returns the ranked collisions for the current pointer and card geometry.
pub async fn handle_drag_move(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<DragGestureRequest>,
) -> Result<Json<DragMoveResponse>, AppError> {
    let shared = session(&state, id).await?;
    let mut board = shared.lock().await;
    let collisions = board.drag_move(&request.geometry, &request.droppables)?;
    Ok(Json(DragMoveResponse {
        collisions,
        board: respond(id, &mut board),
    }))
}

/// POST /api/v1/boards/:id/drag/drop
pub async fn handle_drop(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<DragGestureRequest>,
) -> Result<Json<DropResponse>, AppError> {
    let shared = session(&state, id).await?;
    let mut board = shared.lock().await;
    let outcome = board.drop_at(&request.geometry, &request.droppables)?;
    Ok(Json(DropResponse {
        outcome,
        board: respond(id, &mut board),
    }))
}

/// POST /api/v1/boards/:id/drag/cancel
pub async fn handle_drag_cancel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BoardResponse>, AppError> {
    let shared = session(&state, id).await?;
    let mut board = shared.lock().await;
    board.cancel_drag()?;
    Ok(Json(respond(id, &mut board)))
}

/// POST /api/v1/boards/:id/confirmation
///
/// Submits the pass/fail decision for the pending move. The board lock is
/// released while the recruitment service is called, so a cancel can land in
/// between; the late answer is then discarded.
pub async fn handle_submit_confirmation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(form): Json<TransitionForm>,
) -> Result<Json<ConfirmationResponse>, AppError> {
    let shared = session(&state, id).await?;
    let outcome = shared.submit_confirmation(&form).await?;

    let mut board = shared.lock().await;
    Ok(Json(ConfirmationResponse {
        outcome,
        board: respond(id, &mut board),
    }))
}

/// DELETE /api/v1/boards/:id/confirmation
pub async fn handle_cancel_confirmation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BoardResponse>, AppError> {
    let shared = session(&state, id).await?;
    let mut board = shared.lock().await;
    board.cancel_confirmation()?;
    Ok(Json(respond(id, &mut board)))
}

/// GET /api/v1/boards/:id/candidates/:candidate_id
///
/// Opens the candidate detail view.
pub async fn handle_show_candidate(
    State(state): State<AppState>,
    Path((id, candidate_id)): Path<(Uuid, i64)>,
) -> Result<Json<CandidateDetailResponse>, AppError> {
    let shared = session(&state, id).await?;
    let mut board = shared.lock().await;
    let candidate = board.show_candidate(candidate_id)?.clone();
    Ok(Json(CandidateDetailResponse {
        interview: candidate.interview(),
        candidate,
    }))
}

/// DELETE /api/v1/boards/:id/selection
pub async fn handle_close_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BoardResponse>, AppError> {
    let shared = session(&state, id).await?;
    let mut board = shared.lock().await;
    board.close_candidate();
    Ok(Json(respond(id, &mut board)))
}

/// PUT /api/v1/boards/:id/candidates/:candidate_id/schedule
pub async fn handle_schedule_interview(
    State(state): State<AppState>,
    Path((id, candidate_id)): Path<(Uuid, i64)>,
    Json(form): Json<ScheduleForm>,
) -> Result<Json<ScheduleResponse>, AppError> {
    let shared = session(&state, id).await?;
    let mut board = shared.lock().await;
    let today = chrono::Local::now().date_naive();
    let candidate = board.schedule_interview(candidate_id, &form, today).await?;
    Ok(Json(ScheduleResponse {
        candidate,
        board: respond(id, &mut board),
    }))
}
