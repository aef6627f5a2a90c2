//! Columns and the board they make up.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::candidate::CandidateStage;
use crate::models::stage::Stage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorTag {
    Blue,
    Yellow,
    Purple,
    Green,
    Orange,
    Teal,
    Pink,
    Red,
}

/// Column colors, assigned by column index and wrapping around.
pub const STAGE_PALETTE: [ColorTag; 8] = [
    ColorTag::Blue,
    ColorTag::Yellow,
    ColorTag::Purple,
    ColorTag::Green,
    ColorTag::Orange,
    ColorTag::Teal,
    ColorTag::Pink,
    ColorTag::Red,
];

/// One pipeline stage with its candidates, top to bottom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageColumn {
    pub id: String,
    pub stage_id: i64,
    pub title: String,
    pub stage_number: i32,
    pub candidates: Vec<CandidateStage>,
    pub color: ColorTag,
}

impl StageColumn {
    pub fn position_of(&self, candidate_id: i64) -> Option<usize> {
        self.candidates.iter().position(|c| c.id == candidate_id)
    }

    pub fn contains(&self, candidate_id: i64) -> bool {
        self.position_of(candidate_id).is_some()
    }
}

/// The ordered list of columns rendered for a job.
///
/// Cloning a board is a full value copy; rollback snapshots rely on that.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    columns: Vec<StageColumn>,
}

/// Builds one column per stage, ordered by `stage_number`.
///
/// Stages without an entry in `candidates_by_stage` get an empty column.
pub fn map_to_stage_columns(
    stages: &[Stage],
    candidates_by_stage: &HashMap<i64, Vec<CandidateStage>>,
) -> Board {
    let mut ordered: Vec<&Stage> = stages.iter().collect();
    ordered.sort_by_key(|s| s.stage_number);

    let columns = ordered
        .into_iter()
        .enumerate()
        .map(|(index, stage)| StageColumn {
            id: format!("stage-{}", stage.id),
            stage_id: stage.id,
            title: stage.name.clone(),
            stage_number: stage.stage_number,
            candidates: candidates_by_stage
                .get(&stage.id)
                .cloned()
                .unwrap_or_default(),
            color: STAGE_PALETTE[index % STAGE_PALETTE.len()],
        })
        .collect();

    Board { columns }
}

impl Board {
    pub fn columns(&self) -> &[StageColumn] {
        &self.columns
    }

    pub(crate) fn columns_mut(&mut self) -> &mut [StageColumn] {
        &mut self.columns
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column_index(&self, stage_id: i64) -> Option<usize> {
        self.columns.iter().position(|c| c.stage_id == stage_id)
    }

    #[cfg(test)]
    pub fn column(&self, stage_id: i64) -> Option<&StageColumn> {
        self.columns.iter().find(|c| c.stage_id == stage_id)
    }

    /// The column currently holding `candidate_id`.
    pub fn column_of(&self, candidate_id: i64) -> Option<&StageColumn> {
        self.columns.iter().find(|c| c.contains(candidate_id))
    }

    /// `(column index, card index)` of a candidate.
    pub fn locate(&self, candidate_id: i64) -> Option<(usize, usize)> {
        self.columns
            .iter()
            .enumerate()
            .find_map(|(ci, column)| column.position_of(candidate_id).map(|pi| (ci, pi)))
    }

    pub fn candidate(&self, candidate_id: i64) -> Option<&CandidateStage> {
        self.locate(candidate_id)
            .map(|(ci, pi)| &self.columns[ci].candidates[pi])
    }

    pub fn candidate_count(&self) -> usize {
        self.columns.iter().map(|c| c.candidates.len()).sum()
    }

    /// Swaps a card for a fresher copy in place. Returns `false` if the
    /// candidate is not on the board.
    pub fn replace_candidate(&mut self, updated: CandidateStage) -> bool {
        match self.locate(updated.id) {
            Some((ci, pi)) => {
                self.columns[ci].candidates[pi] = updated;
                true
            }
            None => false,
        }
    }
}
