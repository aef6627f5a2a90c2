//! Stage transition confirmation: the pass/fail gate in front of every
//! cross-stage move.
//!
//! No candidate leaves a stage without an explicit decision and written
//! feedback. The form is validated locally before anything is sent; the
//! service's answer is turned into either "keep the move" or "roll back with
//! this message".

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::board::engine::PendingMove;
use crate::board::FieldErrors;
use crate::models::candidate::CandidateStage;
use crate::models::transition::{TransitionRequest, TransitionResponse, TransitionResult};
use crate::pipeline_client::{join_messages, ApiError, PipelineApi};

pub const FEEDBACK_MAX_CHARS: usize = 1000;

const BUSINESS_FAILURE_MESSAGE: &str = "Failed to update the candidate result";
const TRANSPORT_FAILURE_MESSAGE: &str =
    "Failed to update the candidate result. Please try again!";

/// What the hiring manager filled in. Nothing is preselected.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionForm {
    #[serde(default)]
    pub result: Option<TransitionResult>,
    #[serde(default)]
    pub feedback: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub result: TransitionResult,
    /// Trimmed, non-empty, at most [`FEEDBACK_MAX_CHARS`] characters.
    pub feedback: String,
}

impl TransitionForm {
    #[cfg(test)]
    pub fn new(result: Option<TransitionResult>, feedback: impl Into<String>) -> Self {
        Self {
            result,
            feedback: feedback.into(),
        }
    }

    pub fn validate(&self) -> Result<Decision, FieldErrors> {
        let mut errors = FieldErrors::default();

        if self.result.is_none() {
            errors.add("result", "Please choose a result");
        }

        let feedback = self.feedback.trim();
        if feedback.is_empty() {
            errors.add("feedback", "Please enter feedback");
        } else if feedback.chars().count() > FEEDBACK_MAX_CHARS {
            errors.add(
                "feedback",
                format!("Feedback must be at most {FEEDBACK_MAX_CHARS} characters"),
            );
        }

        match self.result {
            Some(result) if errors.is_empty() => Ok(Decision {
                result,
                feedback: feedback.to_string(),
            }),
            _ => Err(errors),
        }
    }
}

/// The open confirmation dialog for one pending move.
#[derive(Debug, Clone, PartialEq)]
pub struct StageTransitionConfirmation {
    ticket: u64,
    candidate: CandidateStage,
    target_stage_id: i64,
    target_stage_name: String,
    submitting: bool,
}

/// Everything needed to call the service, detached from the board so the
/// call can run without holding the board.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionSubmission {
    pub ticket: u64,
    pub candidate_stage_id: i64,
    pub request: TransitionRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationView {
    pub ticket: u64,
    pub candidate_id: i64,
    pub candidate_name: String,
    pub target_stage_id: i64,
    pub target_stage_name: String,
    pub submitting: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmationOutcome {
    Accepted {
        result: TransitionResult,
        candidate: Option<CandidateStage>,
    },
    Rejected {
        message: String,
    },
}

impl StageTransitionConfirmation {
    pub fn open(pending: &PendingMove) -> Self {
        Self {
            ticket: pending.ticket,
            candidate: pending.candidate.clone(),
            target_stage_id: pending.target_stage_id,
            target_stage_name: pending.target_stage_name.clone(),
            submitting: false,
        }
    }

    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    #[cfg(test)]
    pub fn target_stage_name(&self) -> &str {
        &self.target_stage_name
    }

    /// Validates the form and marks the dialog as submitting.
    pub fn submit(&mut self, form: &TransitionForm) -> Result<TransitionSubmission, FieldErrors> {
        let decision = form.validate()?;
        self.submitting = true;
        Ok(TransitionSubmission {
            ticket: self.ticket,
            candidate_stage_id: self.candidate.id,
            request: TransitionRequest {
                result: decision.result,
                hiring_manager_feedback: decision.feedback,
                job_stage_id: Some(self.target_stage_id),
            },
        })
    }

    pub fn view(&self) -> ConfirmationView {
        ConfirmationView {
            ticket: self.ticket,
            candidate_id: self.candidate.id,
            candidate_name: self.candidate.display_name().to_string(),
            target_stage_id: self.target_stage_id,
            target_stage_name: self.target_stage_name.clone(),
            submitting: self.submitting,
        }
    }
}

/// Sends the decision. Never retried: a rejected transition goes back to the
/// user.
pub async fn send_transition(
    api: &dyn PipelineApi,
    submission: &TransitionSubmission,
) -> Result<TransitionResponse, ApiError> {
    info!(
        candidate_stage_id = submission.candidate_stage_id,
        result = ?submission.request.result,
        target = ?submission.request.job_stage_id,
        "Submitting stage transition"
    );
    api.update_stage_result(submission.candidate_stage_id, &submission.request)
        .await
}

pub fn interpret_response(
    result: TransitionResult,
    response: Result<TransitionResponse, ApiError>,
) -> ConfirmationOutcome {
    match response {
        Ok(response) if response.is_success => ConfirmationOutcome::Accepted {
            result,
            candidate: response.candidate,
        },
        Ok(response) => {
            let message = join_messages(&response.error_messages)
                .unwrap_or_else(|| BUSINESS_FAILURE_MESSAGE.to_string());
            warn!("Stage transition rejected: {message}");
            ConfirmationOutcome::Rejected { message }
        }
        Err(e) => {
            warn!("Stage transition failed: {e}");
            ConfirmationOutcome::Rejected {
                message: e
                    .user_message()
                    .unwrap_or_else(|| TRANSPORT_FAILURE_MESSAGE.to_string()),
            }
        }
    }
}

pub fn success_message(result: TransitionResult) -> &'static str {
    match result {
        TransitionResult::Pass => "Candidate passed this stage",
        TransitionResult::Fail => "Candidate result updated",
    }
}
