//! Drag transition engine: the state machine behind one drag gesture.
//!
//! ```text
//! Idle ──begin──▶ Dragging ──drop (same stage)──▶ Idle (committed)
//!                    │  └────drop (no target)───▶ Idle (reverted)
//!                    └──drop (other stage)──▶ AwaitingConfirmation
//!                                               ├─confirm──▶ Idle (kept)
//!                                               └─rollback─▶ Idle (snapshot restored)
//! ```
//!
//! The board is only mutated on drop. The snapshot taken at `begin_drag` is the
//! single rollback point for the whole gesture.

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::board::collision::DropTarget;
use crate::board::column::Board;
use crate::models::candidate::CandidateStage;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DragError {
    #[error("Candidate {0} is not on the board")]
    UnknownCandidate(i64),
    #[error("A stage transition is awaiting confirmation")]
    ConfirmationPending,
    #[error("No drag gesture in progress")]
    NotDragging,
    #[error("A drag gesture is in progress")]
    DragInProgress,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveDrag {
    pub candidate: CandidateStage,
    pub source_stage_id: i64,
    pub snapshot: Board,
    pub over: Option<DropTarget>,
}

/// A cross-stage drop waiting for its pass/fail decision.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMove {
    /// Identifies this move; results carrying another ticket are stale.
    pub ticket: u64,
    pub candidate: CandidateStage,
    pub source_stage_id: i64,
    pub target_stage_id: i64,
    pub target_stage_name: String,
    pub snapshot: Board,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum DragPhase {
    #[default]
    Idle,
    Dragging(ActiveDrag),
    AwaitingConfirmation(PendingMove),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PhaseKind {
    Idle,
    Dragging,
    AwaitingConfirmation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveSummary {
    pub ticket: u64,
    pub candidate_id: i64,
    pub source_stage_id: i64,
    pub target_stage_id: i64,
    pub target_stage_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DropOutcome {
    /// Nothing valid under the drop; board is back at the snapshot.
    Reverted,
    /// Dropped back where it was.
    Unchanged,
    /// Same-stage reorder, already committed.
    Reordered {
        #[serde(rename = "stageId")]
        stage_id: i64,
    },
    /// Cross-stage move applied optimistically, needs a decision.
    AwaitingConfirmation(MoveSummary),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateMoved {
    pub candidate_id: i64,
    pub from_stage_id: i64,
    pub to_stage_id: i64,
}

#[derive(Debug, Default)]
pub struct DragTransitionEngine {
    phase: DragPhase,
    last_ticket: u64,
}

impl DragTransitionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn phase(&self) -> &DragPhase {
        &self.phase
    }

    pub fn phase_kind(&self) -> PhaseKind {
        match self.phase {
            DragPhase::Idle => PhaseKind::Idle,
            DragPhase::Dragging(_) => PhaseKind::Dragging,
            DragPhase::AwaitingConfirmation(_) => PhaseKind::AwaitingConfirmation,
        }
    }

    pub fn dragged_candidate(&self) -> Option<&CandidateStage> {
        match &self.phase {
            DragPhase::Dragging(drag) => Some(&drag.candidate),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn hovered(&self) -> Option<DropTarget> {
        match &self.phase {
            DragPhase::Dragging(drag) => drag.over,
            _ => None,
        }
    }

    pub fn pending(&self) -> Option<&PendingMove> {
        match &self.phase {
            DragPhase::AwaitingConfirmation(pending) => Some(pending),
            _ => None,
        }
    }

    /// Picks up a card. Starting over while already dragging restarts the
    /// gesture from the current board.
    pub fn begin_drag(&mut self, board: &Board, candidate_id: i64) -> Result<(), DragError> {
        if matches!(self.phase, DragPhase::AwaitingConfirmation(_)) {
            return Err(DragError::ConfirmationPending);
        }
        let column = board
            .column_of(candidate_id)
            .ok_or(DragError::UnknownCandidate(candidate_id))?;
        let candidate = board
            .candidate(candidate_id)
            .cloned()
            .ok_or(DragError::UnknownCandidate(candidate_id))?;

        debug!(candidate_id, stage_id = column.stage_id, "Drag started");
        self.phase = DragPhase::Dragging(ActiveDrag {
            candidate,
            source_stage_id: column.stage_id,
            snapshot: board.clone(),
            over: None,
        });
        Ok(())
    }

    /// Records the hovered target. Never touches the board.
    pub fn drag_over(&mut self, target: Option<DropTarget>) -> Result<(), DragError> {
        match &mut self.phase {
            DragPhase::Dragging(drag) => {
                drag.over = target;
                Ok(())
            }
            DragPhase::AwaitingConfirmation(_) => Err(DragError::ConfirmationPending),
            DragPhase::Idle => Err(DragError::NotDragging),
        }
    }

    /// Aborts the gesture (escape, pointer cancel) and restores the snapshot.
    pub fn cancel_drag(&mut self, board: &mut Board) -> Result<(), DragError> {
        match std::mem::take(&mut self.phase) {
            DragPhase::Dragging(drag) => {
                debug!(candidate_id = drag.candidate.id, "Drag cancelled");
                *board = drag.snapshot;
                Ok(())
            }
            other => {
                let err = phase_error(&other);
                self.phase = other;
                Err(err)
            }
        }
    }

    pub fn drop(
        &mut self,
        board: &mut Board,
        target: Option<DropTarget>,
    ) -> Result<DropOutcome, DragError> {
        let drag = match std::mem::take(&mut self.phase) {
            DragPhase::Dragging(drag) => drag,
            other => {
                let err = phase_error(&other);
                self.phase = other;
                return Err(err);
            }
        };

        let candidate_id = drag.candidate.id;
        let snapshot = &drag.snapshot;

        let Some(target) = target else {
            return Ok(revert(board, drag, "no drop target"));
        };
        if target == (DropTarget::Card { candidate_id }) {
            return Ok(revert(board, drag, "dropped on itself"));
        }

        let Some(source_index) = snapshot.column_index(drag.source_stage_id) else {
            return Ok(revert(board, drag, "source column missing"));
        };
        let Some(target_stage_id) = (match target {
            DropTarget::Column { stage_id } => Some(stage_id),
            DropTarget::Card { candidate_id: over } => snapshot.column_of(over).map(|c| c.stage_id),
        }) else {
            return Ok(revert(board, drag, "target card not on the board"));
        };
        let Some(target_index) = snapshot.column_index(target_stage_id) else {
            return Ok(revert(board, drag, "target column missing"));
        };
        let Some(from) = snapshot.columns()[source_index].position_of(candidate_id) else {
            return Ok(revert(board, drag, "candidate left its source column"));
        };

        let mut arranged = snapshot.clone();

        if source_index == target_index {
            let cards = &mut arranged.columns_mut()[source_index].candidates;
            let moved = cards.remove(from);
            match target {
                DropTarget::Card { candidate_id: over } => {
                    // array-move: land at the hovered card's original index
                    let to = snapshot.columns()[source_index]
                        .position_of(over)
                        .unwrap_or(cards.len())
                        .min(cards.len());
                    cards.insert(to, moved);
                }
                DropTarget::Column { .. } => cards.push(moved),
            }

            if arranged == drag.snapshot {
                *board = drag.snapshot;
                return Ok(DropOutcome::Unchanged);
            }
            debug!(candidate_id, stage_id = target_stage_id, "Reordered within stage");
            *board = arranged;
            return Ok(DropOutcome::Reordered {
                stage_id: target_stage_id,
            });
        }

        let moved = arranged.columns_mut()[source_index]
            .candidates
            .remove(from);
        let target_column = &mut arranged.columns_mut()[target_index];
        let insert_at = match target {
            DropTarget::Card { candidate_id: over } => target_column
                .position_of(over)
                .unwrap_or(target_column.candidates.len()),
            DropTarget::Column { .. } => target_column.candidates.len(),
        };
        target_column.candidates.insert(insert_at, moved);
        let target_stage_name = target_column.title.clone();

        self.last_ticket += 1;
        let summary = MoveSummary {
            ticket: self.last_ticket,
            candidate_id,
            source_stage_id: drag.source_stage_id,
            target_stage_id,
            target_stage_name: target_stage_name.clone(),
        };
        debug!(
            candidate_id,
            from = drag.source_stage_id,
            to = target_stage_id,
            ticket = self.last_ticket,
            "Cross-stage drop awaiting confirmation"
        );

        *board = arranged;
        self.phase = DragPhase::AwaitingConfirmation(PendingMove {
            ticket: self.last_ticket,
            candidate: drag.candidate,
            source_stage_id: drag.source_stage_id,
            target_stage_id,
            target_stage_name,
            snapshot: drag.snapshot,
        });
        Ok(DropOutcome::AwaitingConfirmation(summary))
    }

    /// Keeps the optimistic arrangement. `None` if `ticket` is not the open move.
    pub fn confirm(&mut self, ticket: u64) -> Option<CandidateMoved> {
        if self.pending().map(|p| p.ticket) != Some(ticket) {
            return None;
        }
        match std::mem::take(&mut self.phase) {
            DragPhase::AwaitingConfirmation(pending) => Some(CandidateMoved {
                candidate_id: pending.candidate.id,
                from_stage_id: pending.source_stage_id,
                to_stage_id: pending.target_stage_id,
            }),
            other => {
                self.phase = other;
                None
            }
        }
    }

    /// Restores the pre-drag board. Returns `false` if `ticket` is not the open move.
    pub fn rollback(&mut self, board: &mut Board, ticket: u64) -> bool {
        if self.pending().map(|p| p.ticket) != Some(ticket) {
            return false;
        }
        if let DragPhase::AwaitingConfirmation(pending) = std::mem::take(&mut self.phase) {
            debug!(ticket, candidate_id = pending.candidate.id, "Rolled back stage move");
            *board = pending.snapshot;
        }
        true
    }

    /// Forgets any gesture without touching the board. Used when the board is
    /// replaced wholesale and old snapshots no longer apply.
    pub fn reset(&mut self) {
        self.phase = DragPhase::Idle;
    }
}

fn phase_error(phase: &DragPhase) -> DragError {
    match phase {
        DragPhase::AwaitingConfirmation(_) => DragError::ConfirmationPending,
        _ => DragError::NotDragging,
    }
}

fn revert(board: &mut Board, drag: ActiveDrag, reason: &str) -> DropOutcome {
    debug!(candidate_id = drag.candidate.id, reason, "Drop reverted");
    *board = drag.snapshot;
    DropOutcome::Reverted
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use proptest::prelude::*;

    use super::*;
    use crate::board::column::map_to_stage_columns;
    use crate::models::stage::Stage;
    use crate::pipeline_client::fake::candidate;

    /// Screening(1): [C=1, D=2], Interview(2): [E=3]
    fn two_stage_board() -> Board {
        let stages = vec![Stage::new(1, "Screening", 1), Stage::new(2, "Interview", 2)];
        let mut by_stage = HashMap::new();
        by_stage.insert(1, vec![candidate(1, 1, "C"), candidate(2, 1, "D")]);
        by_stage.insert(2, vec![candidate(3, 2, "E")]);
        map_to_stage_columns(&stages, &by_stage)
    }

    fn ids(board: &Board, stage_id: i64) -> Vec<i64> {
        board
            .column(stage_id)
            .unwrap()
            .candidates
            .iter()
            .map(|c| c.id)
            .collect()
    }

    #[test]
    fn test_begin_drag_unknown_candidate() {
        let board = two_stage_board();
        let mut engine = DragTransitionEngine::new();
        assert_eq!(
            engine.begin_drag(&board, 99),
            Err(DragError::UnknownCandidate(99))
        );
        assert_eq!(engine.phase_kind(), PhaseKind::Idle);
    }

    #[test]
    fn test_drag_over_does_not_mutate_board() {
        let board = two_stage_board();
        let mut engine = DragTransitionEngine::new();
        engine.begin_drag(&board, 1).unwrap();
        engine
            .drag_over(Some(DropTarget::Column { stage_id: 2 }))
            .unwrap();
        assert_eq!(engine.hovered(), Some(DropTarget::Column { stage_id: 2 }));
        assert_eq!(board, two_stage_board());
    }

    #[test]
    fn test_drop_without_target_reverts() {
        let mut board = two_stage_board();
        let mut engine = DragTransitionEngine::new();
        engine.begin_drag(&board, 1).unwrap();
        assert_eq!(engine.drop(&mut board, None), Ok(DropOutcome::Reverted));
        assert_eq!(board, two_stage_board());
        assert_eq!(engine.phase_kind(), PhaseKind::Idle);
    }

    #[test]
    fn test_drop_on_itself_is_noop() {
        let mut board = two_stage_board();
        let mut engine = DragTransitionEngine::new();
        engine.begin_drag(&board, 1).unwrap();
        let outcome = engine
            .drop(&mut board, Some(DropTarget::Card { candidate_id: 1 }))
            .unwrap();
        assert_eq!(outcome, DropOutcome::Reverted);
        assert_eq!(board, two_stage_board());
    }

    #[test]
    fn test_drop_on_unknown_column_reverts() {
        let mut board = two_stage_board();
        let mut engine = DragTransitionEngine::new();
        engine.begin_drag(&board, 1).unwrap();
        let outcome = engine
            .drop(&mut board, Some(DropTarget::Column { stage_id: 77 }))
            .unwrap();
        assert_eq!(outcome, DropOutcome::Reverted);
        assert_eq!(board, two_stage_board());
    }

    #[test]
    fn test_reorder_below_sibling_on_card() {
        let mut board = two_stage_board();
        let mut engine = DragTransitionEngine::new();
        engine.begin_drag(&board, 1).unwrap();
        let outcome = engine
            .drop(&mut board, Some(DropTarget::Card { candidate_id: 2 }))
            .unwrap();
        assert_eq!(outcome, DropOutcome::Reordered { stage_id: 1 });
        assert_eq!(ids(&board, 1), vec![2, 1]);
        assert_eq!(engine.phase_kind(), PhaseKind::Idle);
    }

    #[test]
    fn test_drop_on_own_column_moves_to_end() {
        let mut board = two_stage_board();
        let mut engine = DragTransitionEngine::new();
        engine.begin_drag(&board, 1).unwrap();
        let outcome = engine
            .drop(&mut board, Some(DropTarget::Column { stage_id: 1 }))
            .unwrap();
        assert_eq!(outcome, DropOutcome::Reordered { stage_id: 1 });
        assert_eq!(ids(&board, 1), vec![2, 1]);
    }

    #[test]
    fn test_last_card_dropped_on_own_column_is_unchanged() {
        let mut board = two_stage_board();
        let mut engine = DragTransitionEngine::new();
        engine.begin_drag(&board, 2).unwrap();
        let outcome = engine
            .drop(&mut board, Some(DropTarget::Column { stage_id: 1 }))
            .unwrap();
        assert_eq!(outcome, DropOutcome::Unchanged);
        assert_eq!(board, two_stage_board());
    }

    #[test]
    fn test_cross_stage_drop_on_column_appends_and_waits() {
        let mut board = two_stage_board();
        let mut engine = DragTransitionEngine::new();
        engine.begin_drag(&board, 1).unwrap();
        let outcome = engine
            .drop(&mut board, Some(DropTarget::Column { stage_id: 2 }))
            .unwrap();

        let DropOutcome::AwaitingConfirmation(summary) = outcome else {
            panic!("expected confirmation, got {outcome:?}");
        };
        assert_eq!(summary.target_stage_name, "Interview");
        assert_eq!(summary.source_stage_id, 1);
        assert_eq!(ids(&board, 1), vec![2]);
        assert_eq!(ids(&board, 2), vec![3, 1]);

        let pending = engine.pending().unwrap();
        assert_eq!(pending.snapshot, two_stage_board());
        assert_eq!(pending.ticket, summary.ticket);
    }

    #[test]
    fn test_cross_stage_drop_on_card_inserts_before() {
        let mut board = two_stage_board();
        let mut engine = DragTransitionEngine::new();
        engine.begin_drag(&board, 2).unwrap();
        engine
            .drop(&mut board, Some(DropTarget::Card { candidate_id: 3 }))
            .unwrap();
        assert_eq!(ids(&board, 2), vec![2, 3]);
    }

    #[test]
    fn test_confirm_keeps_arrangement() {
        let mut board = two_stage_board();
        let mut engine = DragTransitionEngine::new();
        engine.begin_drag(&board, 1).unwrap();
        let DropOutcome::AwaitingConfirmation(summary) = engine
            .drop(&mut board, Some(DropTarget::Column { stage_id: 2 }))
            .unwrap()
        else {
            panic!("expected confirmation");
        };

        assert_eq!(engine.confirm(summary.ticket + 1), None);
        let moved = engine.confirm(summary.ticket).unwrap();
        assert_eq!(
            moved,
            CandidateMoved {
                candidate_id: 1,
                from_stage_id: 1,
                to_stage_id: 2
            }
        );
        assert_eq!(ids(&board, 2), vec![3, 1]);
        assert_eq!(engine.phase_kind(), PhaseKind::Idle);
        assert_eq!(engine.confirm(summary.ticket), None);
    }

    #[test]
    fn test_rollback_restores_snapshot() {
        let mut board = two_stage_board();
        let mut engine = DragTransitionEngine::new();
        engine.begin_drag(&board, 1).unwrap();
        let DropOutcome::AwaitingConfirmation(summary) = engine
            .drop(&mut board, Some(DropTarget::Column { stage_id: 2 }))
            .unwrap()
        else {
            panic!("expected confirmation");
        };

        assert!(!engine.rollback(&mut board, summary.ticket + 1));
        assert_ne!(board, two_stage_board());
        assert!(engine.rollback(&mut board, summary.ticket));
        assert_eq!(board, two_stage_board());
    }

    #[test]
    fn test_new_drag_blocked_while_confirmation_open() {
        let mut board = two_stage_board();
        let mut engine = DragTransitionEngine::new();
        engine.begin_drag(&board, 1).unwrap();
        engine
            .drop(&mut board, Some(DropTarget::Column { stage_id: 2 }))
            .unwrap();
        assert_eq!(
            engine.begin_drag(&board, 2),
            Err(DragError::ConfirmationPending)
        );
        assert_eq!(
            engine.drop(&mut board, None),
            Err(DragError::ConfirmationPending)
        );
    }

    #[test]
    fn test_tickets_increase_per_move() {
        let mut board = two_stage_board();
        let mut engine = DragTransitionEngine::new();
        let mut tickets = Vec::new();
        for _ in 0..2 {
            engine.begin_drag(&board, 1).unwrap();
            if let Ok(DropOutcome::AwaitingConfirmation(summary)) =
                engine.drop(&mut board, Some(DropTarget::Column { stage_id: 2 }))
            {
                tickets.push(summary.ticket);
                assert!(engine.rollback(&mut board, summary.ticket));
            }
        }
        assert_eq!(tickets.len(), 2);
        assert!(tickets[1] > tickets[0]);
    }

    #[test]
    fn test_cancel_drag_restores_and_idles() {
        let mut board = two_stage_board();
        let mut engine = DragTransitionEngine::new();
        assert_eq!(engine.cancel_drag(&mut board), Err(DragError::NotDragging));
        engine.begin_drag(&board, 1).unwrap();
        engine.cancel_drag(&mut board).unwrap();
        assert_eq!(board, two_stage_board());
        assert_eq!(engine.phase_kind(), PhaseKind::Idle);
    }

    // ── Property tests ──────────────────────────────────────────────────

    fn board_from_sizes(sizes: &[usize]) -> Board {
        let mut next_id = 1;
        let mut stages = Vec::new();
        let mut by_stage = HashMap::new();
        for (index, size) in sizes.iter().enumerate() {
            let stage_id = index as i64 + 1;
            stages.push(Stage::new(stage_id, format!("Stage {stage_id}"), index as i32 + 1));
            let cards = (0..*size)
                .map(|_| {
                    let id = next_id;
                    next_id += 1;
                    candidate(id, stage_id, "Card")
                })
                .collect();
            by_stage.insert(stage_id, cards);
        }
        map_to_stage_columns(&stages, &by_stage)
    }

    fn sorted_ids(board: &Board) -> Vec<i64> {
        let mut all: Vec<i64> = board
            .columns()
            .iter()
            .flat_map(|c| c.candidates.iter().map(|card| card.id))
            .collect();
        all.sort_unstable();
        all
    }

    proptest! {
        #[test]
        fn same_stage_reorder_preserves_membership(
            sizes in prop::collection::vec(0usize..6, 1..4),
            pick in any::<prop::sample::Index>(),
            over in any::<prop::sample::Index>(),
            on_column in any::<bool>(),
        ) {
            let mut board = board_from_sizes(&sizes);
            let all = sorted_ids(&board);
            prop_assume!(!all.is_empty());

            let dragged = all[pick.index(all.len())];
            let column = board.column_of(dragged).unwrap().clone();
            let target = if on_column {
                DropTarget::Column { stage_id: column.stage_id }
            } else {
                let card = &column.candidates[over.index(column.candidates.len())];
                DropTarget::Card { candidate_id: card.id }
            };

            let before = board.clone();
            let mut engine = DragTransitionEngine::new();
            engine.begin_drag(&board, dragged).unwrap();
            engine.drop(&mut board, Some(target)).unwrap();

            prop_assert_eq!(engine.phase_kind(), PhaseKind::Idle);
            prop_assert_eq!(board.candidate_count(), before.candidate_count());
            prop_assert_eq!(sorted_ids(&board), all);
            for (after_col, before_col) in board.columns().iter().zip(before.columns()) {
                prop_assert_eq!(after_col.candidates.len(), before_col.candidates.len());
            }
        }

        #[test]
        fn cancelled_cross_stage_move_restores_board(
            sizes in prop::collection::vec(0usize..5, 2..5),
            pick in any::<prop::sample::Index>(),
            dest in any::<prop::sample::Index>(),
        ) {
            let mut board = board_from_sizes(&sizes);
            let all = sorted_ids(&board);
            prop_assume!(!all.is_empty());

            let dragged = all[pick.index(all.len())];
            let source = board.column_of(dragged).unwrap().stage_id;
            let others: Vec<i64> = board
                .columns()
                .iter()
                .map(|c| c.stage_id)
                .filter(|id| *id != source)
                .collect();
            let target = others[dest.index(others.len())];

            let before = board.clone();
            let mut engine = DragTransitionEngine::new();
            engine.begin_drag(&board, dragged).unwrap();
            let outcome = engine
                .drop(&mut board, Some(DropTarget::Column { stage_id: target }))
                .unwrap();
            let DropOutcome::AwaitingConfirmation(summary) = outcome else {
                return Err(TestCaseError::fail("cross-stage drop must wait for confirmation"));
            };
            prop_assert!(board.column(target).unwrap().contains(dragged));

            prop_assert!(engine.rollback(&mut board, summary.ticket));
            prop_assert_eq!(board, before);
        }
    }
}
