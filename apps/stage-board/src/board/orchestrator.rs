//! Board orchestrator. Owns the canonical board for one job and talks to the
//! pipeline service on its behalf.
//!
//! Outward notifications are queued as [`BoardEvent`]s and handed to the
//! embedding page through [`BoardOrchestrator::drain_events`]. Only confirmed
//! changes produce `CandidateMoved`; drag and transition failures never escape
//! as errors, they become notices.
//!
//! Long round trips (loading, submitting a decision) are split into a begin
//! step, a detached network call and a finish step. [`SharedBoard`] runs the
//! network part without holding the board lock, so the board can still be
//! viewed and dragged while it loads.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::board::collision::{active_target, resolve_collisions, Collision, DragGeometry, DropTarget, Droppable};
use crate::board::column::{map_to_stage_columns, Board};
use crate::board::confirmation::{
    interpret_response, send_transition, success_message, ConfirmationOutcome,
    ConfirmationView, StageTransitionConfirmation, TransitionForm, TransitionSubmission,
};
use crate::board::engine::{CandidateMoved, DragError, DragTransitionEngine, DropOutcome, PhaseKind};
use crate::board::schedule::ScheduleForm;
use crate::board::BoardError;
use crate::models::candidate::CandidateStage;
use crate::models::stage::Stage;
use crate::models::transition::{TransitionResponse, TransitionResult};
use crate::pipeline_client::{ApiError, CandidateQuery, PipelineApi};

const STAGES_FAILED_MESSAGE: &str = "Could not load the pipeline stages";
const SCHEDULE_FAILED_MESSAGE: &str = "Failed to schedule the interview. Please try again!";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum LoadState {
    Idle,
    Loading,
    Ready,
    /// Stage list could not be fetched; retry with a refresh.
    Failed { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A toast for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BoardEvent {
    ColumnsChanged { columns: Board },
    CandidateMoved(CandidateMoved),
    CandidateUpdated { candidate: CandidateStage },
    RefreshRequested,
    Notice(Notice),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SubmissionOutcome {
    Committed,
    RolledBack,
    /// The result belongs to a move that was already cancelled or replaced.
    Stale,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    pub job_id: i64,
    pub load_state: LoadState,
    pub columns: Board,
    pub phase: PhaseKind,
    pub dragging: Option<i64>,
    pub confirmation: Option<ConfirmationView>,
    pub selected_candidate: Option<CandidateStage>,
}

/// Everything a load needs, detached from the board.
pub struct LoadRequest {
    generation: u64,
    api: Arc<dyn PipelineApi>,
    job_id: i64,
    query: CandidateQuery,
}

pub struct LoadedBoard {
    stages: Vec<Stage>,
    candidates: HashMap<i64, Vec<CandidateStage>>,
}

impl LoadRequest {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Stage listing first, then every stage's candidates concurrently.
    pub async fn fetch(&self) -> Result<LoadedBoard, ApiError> {
        let stages = self.api.get_stages_by_job(self.job_id).await?;
        let candidates = fetch_candidates(self.api.as_ref(), &stages, &self.query).await;
        Ok(LoadedBoard { stages, candidates })
    }
}

pub struct BoardOrchestrator {
    api: Arc<dyn PipelineApi>,
    job_id: i64,
    query: CandidateQuery,
    board: Board,
    load_state: LoadState,
    load_generation: u64,
    engine: DragTransitionEngine,
    confirmation: Option<StageTransitionConfirmation>,
    selected: Option<i64>,
    events: Vec<BoardEvent>,
}

impl BoardOrchestrator {
    pub fn new(api: Arc<dyn PipelineApi>, job_id: i64, query: CandidateQuery) -> Self {
        Self {
            api,
            job_id,
            query,
            board: Board::default(),
            load_state: LoadState::Idle,
            load_generation: 0,
            engine: DragTransitionEngine::new(),
            confirmation: None,
            selected: None,
            events: Vec::new(),
        }
    }

    pub fn view(&self) -> BoardView {
        BoardView {
            job_id: self.job_id,
            load_state: self.load_state.clone(),
            columns: self.board.clone(),
            phase: self.engine.phase_kind(),
            dragging: self.engine.dragged_candidate().map(|c| c.id),
            confirmation: self.confirmation.as_ref().map(|d| d.view()),
            selected_candidate: self.selected_candidate().cloned(),
        }
    }

    pub fn drain_events(&mut self) -> Vec<BoardEvent> {
        std::mem::take(&mut self.events)
    }

    // ── Loading ─────────────────────────────────────────────────────────

    /// Marks the board as loading. Only one load runs at a time.
    pub fn begin_load(&mut self) -> Result<LoadRequest, BoardError> {
        if self.load_state == LoadState::Loading {
            return Err(BoardError::Busy);
        }
        self.load_generation += 1;
        self.load_state = LoadState::Loading;
        info!(
            job_id = self.job_id,
            generation = self.load_generation,
            "Loading stage board"
        );
        Ok(LoadRequest {
            generation: self.load_generation,
            api: self.api.clone(),
            job_id: self.job_id,
            query: self.query.clone(),
        })
    }

    /// Applies a finished load. A failed stage listing leaves the board in
    /// `LoadState::Failed`. Results from a superseded load are dropped.
    pub fn finish_load(
        &mut self,
        generation: u64,
        fetched: Result<LoadedBoard, ApiError>,
    ) -> Result<(), BoardError> {
        if generation != self.load_generation {
            warn!(
                job_id = self.job_id,
                generation,
                current = self.load_generation,
                "Ignoring superseded board load"
            );
            return Ok(());
        }

        match fetched {
            Ok(loaded) => {
                self.sync_columns(&loaded.stages, &loaded.candidates);
                info!(
                    job_id = self.job_id,
                    stages = loaded.stages.len(),
                    candidates = self.board.candidate_count(),
                    "Stage board loaded"
                );
                Ok(())
            }
            Err(e) => {
                warn!(job_id = self.job_id, "Failed to load pipeline stages: {e}");
                self.load_state = LoadState::Failed {
                    message: STAGES_FAILED_MESSAGE.to_string(),
                };
                Err(BoardError::Api(e))
            }
        }
    }

    /// Replaces the board wholesale from external data. Any drag or open
    /// confirmation refers to the old board and is dropped, as is any load
    /// still in flight.
    pub fn sync_columns(
        &mut self,
        stages: &[Stage],
        candidates_by_stage: &HashMap<i64, Vec<CandidateStage>>,
    ) {
        if self.engine.phase_kind() != PhaseKind::Idle {
            debug!(job_id = self.job_id, "Discarding in-flight gesture on resync");
        }
        self.engine.reset();
        self.confirmation = None;
        self.board = map_to_stage_columns(stages, candidates_by_stage);
        self.load_generation += 1;
        self.load_state = LoadState::Ready;
        if let Some(id) = self.selected {
            if self.board.candidate(id).is_none() {
                self.selected = None;
            }
        }
    }

    // ── Drag gesture ────────────────────────────────────────────────────

    pub fn begin_drag(&mut self, candidate_id: i64) -> Result<(), BoardError> {
        self.engine.begin_drag(&self.board, candidate_id)?;
        Ok(())
    }

    /// Pointer-move tick: ranks collisions and remembers the active target.
    pub fn drag_move(
        &mut self,
        geometry: &DragGeometry,
        droppables: &[Droppable],
    ) -> Result<Vec<Collision>, BoardError> {
        let collisions = resolve_collisions(geometry, droppables);
        self.engine.drag_over(collisions.first().map(|c| c.target))?;
        Ok(collisions)
    }

    pub fn drop_at(
        &mut self,
        geometry: &DragGeometry,
        droppables: &[Droppable],
    ) -> Result<DropOutcome, BoardError> {
        self.drop_on(active_target(geometry, droppables))
    }

    pub fn drop_on(&mut self, target: Option<DropTarget>) -> Result<DropOutcome, BoardError> {
        let outcome = self.engine.drop(&mut self.board, target)?;
        match &outcome {
            DropOutcome::Reordered { .. } => self.events.push(BoardEvent::ColumnsChanged {
                columns: self.board.clone(),
            }),
            DropOutcome::AwaitingConfirmation(_) => {
                self.confirmation = self.engine.pending().map(StageTransitionConfirmation::open);
            }
            DropOutcome::Reverted | DropOutcome::Unchanged => {}
        }
        Ok(outcome)
    }

    pub fn cancel_drag(&mut self) -> Result<(), BoardError> {
        self.engine.cancel_drag(&mut self.board)?;
        Ok(())
    }

    // ── Confirmation ────────────────────────────────────────────────────

    /// Validates the decision and detaches the service call. Invalid forms are
    /// rejected here, before any request is made.
    pub fn prepare_submission(
        &mut self,
        form: &TransitionForm,
    ) -> Result<TransitionSubmission, BoardError> {
        let dialog = self.confirmation.as_mut().ok_or(BoardError::NoPendingMove)?;
        if dialog.is_submitting() {
            return Err(BoardError::SubmissionInFlight);
        }
        dialog.submit(form).map_err(BoardError::Validation)
    }

    /// Applies the service's answer to the move identified by `ticket`.
    pub fn complete_submission(
        &mut self,
        ticket: u64,
        result: TransitionResult,
        response: Result<TransitionResponse, ApiError>,
    ) -> SubmissionOutcome {
        if self.confirmation.as_ref().map(|d| d.ticket()) != Some(ticket) {
            warn!(
                job_id = self.job_id,
                ticket, "Ignoring stage transition result for an abandoned move"
            );
            return SubmissionOutcome::Stale;
        }
        self.confirmation = None;

        match interpret_response(result, response) {
            ConfirmationOutcome::Accepted { result, .. } => {
                let Some(moved) = self.engine.confirm(ticket) else {
                    return SubmissionOutcome::Stale;
                };
                info!(
                    candidate_id = moved.candidate_id,
                    from = moved.from_stage_id,
                    to = moved.to_stage_id,
                    "Stage transition committed"
                );
                self.notify(NoticeLevel::Success, success_message(result));
                self.events.push(BoardEvent::CandidateMoved(moved));
                self.events.push(BoardEvent::RefreshRequested);
                SubmissionOutcome::Committed
            }
            ConfirmationOutcome::Rejected { message } => {
                self.engine.rollback(&mut self.board, ticket);
                self.notify(NoticeLevel::Error, message);
                SubmissionOutcome::RolledBack
            }
        }
    }

    /// Closing the dialog without submitting always rolls the move back.
    pub fn cancel_confirmation(&mut self) -> Result<(), BoardError> {
        let dialog = self.confirmation.take().ok_or(BoardError::NoPendingMove)?;
        self.engine.rollback(&mut self.board, dialog.ticket());
        info!(
            job_id = self.job_id,
            ticket = dialog.ticket(),
            "Stage transition cancelled"
        );
        Ok(())
    }

    // ── Card affordances ────────────────────────────────────────────────

    pub fn show_candidate(&mut self, candidate_id: i64) -> Result<&CandidateStage, BoardError> {
        let candidate = self
            .board
            .candidate(candidate_id)
            .ok_or(BoardError::UnknownCandidate(candidate_id))?;
        self.selected = Some(candidate_id);
        Ok(candidate)
    }

    pub fn close_candidate(&mut self) {
        self.selected = None;
    }

    pub fn selected_candidate(&self) -> Option<&CandidateStage> {
        self.selected.and_then(|id| self.board.candidate(id))
    }

    /// Replaces one card in place and announces it.
    pub fn update_candidate(&mut self, candidate: CandidateStage) -> bool {
        let replaced = self.board.replace_candidate(candidate.clone());
        if replaced {
            self.events.push(BoardEvent::CandidateUpdated { candidate });
        }
        replaced
    }

    /// Books an interview, then re-reads the card from the service. Service
    /// failures become an error notice and leave the card untouched.
    ///
    /// Refused while a gesture or a pending move holds a snapshot, since a
    /// rollback to that snapshot would silently undo the update.
    pub async fn schedule_interview(
        &mut self,
        candidate_id: i64,
        form: &ScheduleForm,
        today: NaiveDate,
    ) -> Result<Option<CandidateStage>, BoardError> {
        match self.engine.phase_kind() {
            PhaseKind::Idle => {}
            PhaseKind::Dragging => return Err(DragError::DragInProgress.into()),
            PhaseKind::AwaitingConfirmation => return Err(DragError::ConfirmationPending.into()),
        }
        if self.board.candidate(candidate_id).is_none() {
            return Err(BoardError::UnknownCandidate(candidate_id));
        }
        let request = form.validate(today).map_err(BoardError::Validation)?;

        if let Err(e) = self.api.update_schedule(candidate_id, &request).await {
            warn!(candidate_id, "Scheduling interview failed: {e}");
            let message = e
                .user_message()
                .unwrap_or_else(|| SCHEDULE_FAILED_MESSAGE.to_string());
            self.notify(NoticeLevel::Error, message);
            return Ok(None);
        }

        match self.api.get_candidate_stage(candidate_id).await {
            Ok(updated) => {
                self.update_candidate(updated.clone());
                self.notify(NoticeLevel::Success, "Interview scheduled");
                Ok(Some(updated))
            }
            Err(e) => {
                warn!(candidate_id, "Re-reading scheduled candidate failed: {e}");
                self.notify(NoticeLevel::Error, SCHEDULE_FAILED_MESSAGE);
                Ok(None)
            }
        }
    }

    fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.events.push(BoardEvent::Notice(Notice {
            level,
            message: message.into(),
        }));
    }
}

#[cfg(test)]
impl BoardOrchestrator {
    pub fn job_id(&self) -> i64 {
        self.job_id
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    pub fn phase(&self) -> PhaseKind {
        self.engine.phase_kind()
    }

    pub fn confirmation(&self) -> Option<&StageTransitionConfirmation> {
        self.confirmation.as_ref()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Shared handle
// ────────────────────────────────────────────────────────────────────────────

/// A board shared between requests.
///
/// The network part of a load or a submission runs on a spawned task without
/// the lock, so other requests keep working and see `LoadState::Loading`. The
/// task runs to completion even if the caller goes away, so a board is never
/// left loading or submitting forever.
#[derive(Clone)]
pub struct SharedBoard(Arc<Mutex<BoardOrchestrator>>);

impl SharedBoard {
    pub fn new(board: BoardOrchestrator) -> Self {
        Self(Arc::new(Mutex::new(board)))
    }

    pub async fn lock(&self) -> MutexGuard<'_, BoardOrchestrator> {
        self.0.lock().await
    }

    /// Initial load. `Busy` if another load is running.
    pub async fn load(&self) -> Result<(), BoardError> {
        let request = self.lock().await.begin_load()?;
        let board = self.clone();
        tokio::spawn(async move {
            let fetched = request.fetch().await;
            board.lock().await.finish_load(request.generation(), fetched)
        })
        .await?
    }

    /// Manual refresh. Also the retry path after a failed load.
    pub async fn refresh(&self) -> Result<(), BoardError> {
        debug!("Board refresh requested");
        self.load().await
    }

    /// Submits the pass/fail decision for the pending move. A committed move
    /// is followed by a reload to pick up server-side effects.
    pub async fn submit_confirmation(
        &self,
        form: &TransitionForm,
    ) -> Result<SubmissionOutcome, BoardError> {
        let (api, submission) = {
            let mut board = self.lock().await;
            let submission = board.prepare_submission(form)?;
            (board.api.clone(), submission)
        };

        let board = self.clone();
        let outcome = tokio::spawn(async move {
            let response = send_transition(api.as_ref(), &submission).await;
            board.lock().await.complete_submission(
                submission.ticket,
                submission.request.result,
                response,
            )
        })
        .await?;

        if outcome == SubmissionOutcome::Committed {
            if let Err(e) = self.load().await {
                warn!("Refresh after stage transition failed: {e}");
            }
        }
        Ok(outcome)
    }
}

/// Fetches every stage's candidates concurrently. A failing stage degrades to
/// an empty list without holding up the others.
async fn fetch_candidates(
    api: &dyn PipelineApi,
    stages: &[Stage],
    query: &CandidateQuery,
) -> HashMap<i64, Vec<CandidateStage>> {
    let fetches = stages.iter().map(|stage| async move {
        (stage.id, api.get_candidates_by_stage(stage.id, query).await)
    });

    join_all(fetches)
        .await
        .into_iter()
        .map(|(stage_id, result)| match result {
            Ok(candidates) => (stage_id, candidates),
            Err(e) => {
                warn!(stage_id, "Candidate fetch failed, showing empty stage: {e}");
                (stage_id, Vec::new())
            }
        })
        .collect()
}
