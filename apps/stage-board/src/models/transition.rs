use serde::{Deserialize, Serialize};

use crate::models::candidate::CandidateStage;

/// The hiring decision recorded when a candidate leaves a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionResult {
    Pass,
    Fail,
}

/// Body of `PUT /CandidateStage/{id}/result`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    pub result: TransitionResult,
    pub hiring_manager_feedback: String,
    /// Target stage for drag-and-drop moves. Absent means "next stage".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_stage_id: Option<i64>,
}

/// Outcome of a stage transition call that reached the service.
///
/// `is_success == false` is a business-rule rejection; the messages are meant
/// for the user.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionResponse {
    pub is_success: bool,
    pub error_messages: Vec<String>,
    pub candidate: Option<CandidateStage>,
}

impl TransitionResponse {
    #[cfg(test)]
    pub fn accepted(candidate: Option<CandidateStage>) -> Self {
        Self {
            is_success: true,
            error_messages: vec![],
            candidate,
        }
    }

    #[cfg(test)]
    pub fn rejected(messages: Vec<String>) -> Self {
        Self {
            is_success: false,
            error_messages: messages,
            candidate: None,
        }
    }
}

/// Body of `PUT /CandidateStage/{id}/schedule`.
///
/// Empty strings clear the optional fields on the service side.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRequest {
    pub interview_date: chrono::NaiveDate,
    pub interview_start_time: chrono::NaiveTime,
    pub interview_end_time: chrono::NaiveTime,
    pub interview_location: String,
    pub google_meet_link: String,
}
