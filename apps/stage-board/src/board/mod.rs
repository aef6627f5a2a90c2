// Recruitment stage board: columns, collision resolution, the drag state
// machine, the pass/fail confirmation gate and the orchestrator tying them to
// the pipeline service. Axum handlers live in `handlers`.

pub mod collision;
pub mod column;
pub mod confirmation;
pub mod engine;
pub mod geometry;
pub mod handlers;
pub mod orchestrator;
pub mod schedule;

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::board::engine::DragError;
use crate::pipeline_client::ApiError;

/// Field-level validation messages, keyed by the form field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    /// Keeps the first message per field.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
impl FieldErrors {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[derive(Debug, Error)]
pub enum BoardError {
    #[error(transparent)]
    Drag(#[from] DragError),

    #[error("No stage transition is awaiting confirmation")]
    NoPendingMove,

    #[error("The stage transition is already being submitted")]
    SubmissionInFlight,

    #[error("Candidate {0} is not on the board")]
    UnknownCandidate(i64),

    #[error("The board is busy loading")]
    Busy,

    #[error("Invalid input")]
    Validation(FieldErrors),

    #[error("Pipeline service error: {0}")]
    Api(#[from] ApiError),

    #[error("Board task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
