//! In-memory [`PipelineApi`] used by board and route tests.
//!
//! Behaves like the recruitment service for the happy paths (a passed
//! candidate moves to the requested stage, scheduling marks the card
//! `Scheduled`) and can be told to fail individual calls.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::models::candidate::{CandidateProfile, CandidateStage, CandidateStatus};
use crate::models::stage::Stage;
use crate::models::transition::{
    ScheduleRequest, TransitionRequest, TransitionResponse, TransitionResult,
};
use crate::pipeline_client::{ApiError, CandidateQuery, PipelineApi};

#[derive(Default)]
struct FakeState {
    stages: Vec<Stage>,
    candidates: HashMap<i64, Vec<CandidateStage>>,
    failing_stages: HashSet<i64>,
    stages_unavailable: bool,
    stage_gate: Option<Arc<Notify>>,
    transition_rejection: Option<Vec<String>>,
    transition_http_error: Option<(u16, String)>,
    schedule_unavailable: bool,
    transition_calls: Vec<(i64, TransitionRequest)>,
    schedule_calls: Vec<(i64, ScheduleRequest)>,
    candidate_fetches: usize,
}

#[derive(Default)]
pub struct FakePipeline {
    state: Mutex<FakeState>,
}

pub fn candidate(id: i64, stage_id: i64, name: &str) -> CandidateStage {
    CandidateStage {
        id,
        candidate_job_id: id * 10,
        job_stage_id: stage_id,
        user: CandidateProfile {
            full_name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            ..CandidateProfile::default()
        },
        ..CandidateStage::default()
    }
}

fn unavailable() -> ApiError {
    ApiError::Api {
        status: 503,
        message: "service unavailable".to_string(),
        envelope_messages: vec![],
    }
}

impl FakePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stage(self, id: i64, name: &str, stage_number: i32) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.stages.push(Stage::new(id, name, stage_number));
            state.candidates.entry(id).or_default();
        }
        self
    }

    pub fn with_candidate(self, stage_id: i64, card: CandidateStage) -> Self {
        self.state
            .lock()
            .unwrap()
            .candidates
            .entry(stage_id)
            .or_default()
            .push(card);
        self
    }

    pub fn fail_stage(self, stage_id: i64) -> Self {
        self.state.lock().unwrap().failing_stages.insert(stage_id);
        self
    }

    pub fn set_stages_unavailable(&self, unavailable: bool) {
        self.state.lock().unwrap().stages_unavailable = unavailable;
    }

    /// Parks every stage listing until `release_stage_listing` is called.
    pub fn hold_stage_listing(&self) {
        self.state.lock().unwrap().stage_gate = Some(Arc::new(Notify::new()));
    }

    pub fn release_stage_listing(&self) {
        if let Some(gate) = self.state.lock().unwrap().stage_gate.take() {
            gate.notify_one();
        }
    }

    pub fn reject_transitions(&self, messages: &[&str]) {
        self.state.lock().unwrap().transition_rejection =
            Some(messages.iter().map(|m| m.to_string()).collect());
    }

    pub fn fail_transitions_with(&self, status: u16, body: &str) {
        self.state.lock().unwrap().transition_http_error = Some((status, body.to_string()));
    }

    pub fn set_schedule_unavailable(&self, unavailable: bool) {
        self.state.lock().unwrap().schedule_unavailable = unavailable;
    }

    pub fn transition_calls(&self) -> Vec<(i64, TransitionRequest)> {
        self.state.lock().unwrap().transition_calls.clone()
    }

    pub fn schedule_calls(&self) -> Vec<(i64, ScheduleRequest)> {
        self.state.lock().unwrap().schedule_calls.clone()
    }

    pub fn candidate_fetches(&self) -> usize {
        self.state.lock().unwrap().candidate_fetches
    }

    pub fn stage_of(&self, candidate_id: i64) -> Option<i64> {
        let state = self.state.lock().unwrap();
        state
            .candidates
            .iter()
            .find(|(_, cards)| cards.iter().any(|c| c.id == candidate_id))
            .map(|(stage_id, _)| *stage_id)
    }
}

#[async_trait]
impl PipelineApi for FakePipeline {
    async fn get_stages_by_job(&self, _job_id: i64) -> Result<Vec<Stage>, ApiError> {
        let gate = self.state.lock().unwrap().stage_gate.clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let state = self.state.lock().unwrap();
        if state.stages_unavailable {
            return Err(unavailable());
        }
        Ok(state.stages.clone())
    }

    async fn get_candidates_by_stage(
        &self,
        stage_id: i64,
        _query: &CandidateQuery,
    ) -> Result<Vec<CandidateStage>, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.candidate_fetches += 1;
        if state.failing_stages.contains(&stage_id) {
            return Err(unavailable());
        }
        Ok(state.candidates.get(&stage_id).cloned().unwrap_or_default())
    }

    async fn update_stage_result(
        &self,
        candidate_stage_id: i64,
        request: &TransitionRequest,
    ) -> Result<TransitionResponse, ApiError> {
        let mut state = self.state.lock().unwrap();
        state
            .transition_calls
            .push((candidate_stage_id, request.clone()));

        if let Some((status, body)) = &state.transition_http_error {
            return Err(crate::pipeline_client::api_error(*status, body));
        }
        if let Some(messages) = &state.transition_rejection {
            return Ok(TransitionResponse::rejected(messages.clone()));
        }

        let Some(source) = state
            .candidates
            .iter()
            .find(|(_, cards)| cards.iter().any(|c| c.id == candidate_stage_id))
            .map(|(stage_id, _)| *stage_id)
        else {
            return Ok(TransitionResponse::rejected(vec![
                "Candidate stage not found".to_string(),
            ]));
        };

        let cards = state.candidates.entry(source).or_default();
        let position = cards
            .iter()
            .position(|c| c.id == candidate_stage_id)
            .unwrap_or_default();

        match (request.result, request.job_stage_id) {
            (TransitionResult::Pass, Some(target)) => {
                let mut card = cards.remove(position);
                card.job_stage_id = target;
                card.status = CandidateStatus::Pending;
                card.hiring_manager_feedback = Some(request.hiring_manager_feedback.clone());
                state.candidates.entry(target).or_default().push(card.clone());
                Ok(TransitionResponse::accepted(Some(card)))
            }
            (TransitionResult::Pass, None) => {
                cards[position].status = CandidateStatus::Passed;
                Ok(TransitionResponse::accepted(Some(cards[position].clone())))
            }
            (TransitionResult::Fail, _) => {
                cards[position].status = CandidateStatus::Failed;
                cards[position].hiring_manager_feedback =
                    Some(request.hiring_manager_feedback.clone());
                Ok(TransitionResponse::accepted(Some(cards[position].clone())))
            }
        }
    }

    async fn update_schedule(
        &self,
        candidate_stage_id: i64,
        request: &ScheduleRequest,
    ) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.schedule_calls.push((candidate_stage_id, request.clone()));
        if state.schedule_unavailable {
            return Err(unavailable());
        }
        let card = state
            .candidates
            .values_mut()
            .flat_map(|cards| cards.iter_mut())
            .find(|c| c.id == candidate_stage_id)
            .ok_or_else(|| ApiError::Business(vec!["Candidate stage not found".to_string()]))?;
        card.status = CandidateStatus::Scheduled;
        card.interview_date = Some(request.interview_date);
        card.interview_start_time = Some(request.interview_start_time);
        card.interview_end_time = Some(request.interview_end_time);
        card.interview_location = Some(request.interview_location.clone());
        card.google_meet_link = Some(request.google_meet_link.clone());
        Ok(())
    }

    async fn get_candidate_stage(
        &self,
        candidate_stage_id: i64,
    ) -> Result<CandidateStage, ApiError> {
        let state = self.state.lock().unwrap();
        state
            .candidates
            .values()
            .flatten()
            .find(|c| c.id == candidate_stage_id)
            .cloned()
            .ok_or(ApiError::MissingResult)
    }
}
