use serde::{Deserialize, Serialize};

/// One ordered step of a job's hiring pipeline, as listed by
/// `GET /JobStage/by-job/{jobId}`. Stages never change during a board session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    pub id: i64,
    pub name: String,
    pub stage_number: i32,
}

impl Stage {
    #[cfg(test)]
    pub fn new(id: i64, name: impl Into<String>, stage_number: i32) -> Self {
        Self {
            id,
            name: name.into(),
            stage_number,
        }
    }
}
