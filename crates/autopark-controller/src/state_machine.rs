//! Per-gate cycle state machine.
//!
//! Each gate worker owns one [`GateCycle`] and walks it through every plate
//! event it handles:
//!
//! - Idle → Recognizing → Deciding
//! - Deciding → Opening → Settling → Closing → Idle (gate cycled)
//! - Deciding → Rejecting → Idle (lot full, buzzer pulse)
//! - Deciding → Idle (duplicate entry, unknown exit plate)
//! - Recognizing → Idle (no plate read)
//!
//! Any other edge is an error. The last [`MAX_HISTORY_SIZE`] transitions are
//! kept for diagnostics.
//!
//! ```
//! use autopark_controller::state_machine::{CycleState, GateCycle};
//! use autopark_core::Direction;
//!
//! let mut cycle = GateCycle::new(Direction::Entry);
//! cycle.transition_to(CycleState::Recognizing).unwrap();
//! assert!(cycle.transition_to(CycleState::Opening).is_err());
//! ```

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::trace;

use autopark_core::Direction;

use crate::error::{ControllerError, Result};

/// Transitions kept per gate.
pub const MAX_HISTORY_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    /// Waiting for a plate event.
    Idle,
    /// Reading the plate from the event image.
    Recognizing,
    /// Consulting the ledger and slot state.
    Deciding,
    /// Open command being sent.
    Opening,
    /// Gate open, waiting for the vehicle to pass.
    Settling,
    /// Close command being sent.
    Closing,
    /// Lot full: buzzer pulse, gate stays shut.
    Rejecting,
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CycleState::Idle => "Idle",
            CycleState::Recognizing => "Recognizing",
            CycleState::Deciding => "Deciding",
            CycleState::Opening => "Opening",
            CycleState::Settling => "Settling",
            CycleState::Closing => "Closing",
            CycleState::Rejecting => "Rejecting",
        };
        f.write_str(name)
    }
}

impl CycleState {
    pub fn can_transition_to(&self, target: &CycleState) -> bool {
        use CycleState::*;

        matches!(
            (self, target),
            (Idle, Recognizing)
                | (Recognizing, Deciding | Idle)
                | (Deciding, Opening | Rejecting | Idle)
                | (Opening, Settling)
                | (Settling, Closing)
                | (Closing, Idle)
                | (Rejecting, Idle)
        )
    }

    /// True while the gate may be physically moving or open.
    pub fn is_actuating(&self) -> bool {
        matches!(
            self,
            CycleState::Opening | CycleState::Settling | CycleState::Closing
        )
    }
}

#[derive(Debug, Clone)]
pub struct CycleTransition {
    pub from: CycleState,
    pub to: CycleState,
    pub at: Instant,
}

/// State machine for one gate.
#[derive(Debug)]
pub struct GateCycle {
    gate: Direction,
    current: CycleState,
    history: VecDeque<CycleTransition>,
}

impl GateCycle {
    pub fn new(gate: Direction) -> Self {
        Self {
            gate,
            current: CycleState::Idle,
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
        }
    }

    pub fn gate(&self) -> Direction {
        self.gate
    }

    pub fn current_state(&self) -> CycleState {
        self.current
    }

    /// Oldest first.
    pub fn history(&self) -> &VecDeque<CycleTransition> {
        &self.history
    }

    /// The states visited since the cycle last left `Idle`, ending with the
    /// current one.
    pub fn last_cycle(&self) -> Vec<CycleState> {
        let start = self
            .history
            .iter()
            .rposition(|t| t.from == CycleState::Idle)
            .unwrap_or(0);
        let mut states: Vec<CycleState> = self.history.iter().skip(start).map(|t| t.from).collect();
        states.push(self.current);
        states
    }

    /// # Errors
    /// [`ControllerError::InvalidTransition`] if the edge does not exist.
    pub fn transition_to(&mut self, next: CycleState) -> Result<CycleTransition> {
        if !self.current.can_transition_to(&next) {
            return Err(ControllerError::InvalidTransition {
                gate: self.gate,
                from: self.current,
                to: next,
            });
        }

        let transition = CycleTransition {
            from: self.current,
            to: next,
            at: Instant::now(),
        };
        trace!(gate = %self.gate, from = %self.current, to = %next, "gate cycle transition");
        self.apply(transition.clone());
        Ok(transition)
    }

    /// Force the cycle back to `Idle`, e.g. after a workflow error.
    pub fn reset(&mut self) -> CycleTransition {
        let transition = CycleTransition {
            from: self.current,
            to: CycleState::Idle,
            at: Instant::now(),
        };
        self.apply(transition.clone());
        transition
    }

    fn apply(&mut self, transition: CycleTransition) {
        self.current = transition.to;
        self.history.push_back(transition);
        if self.history.len() > MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use CycleState::*;

    fn walk(cycle: &mut GateCycle, states: &[CycleState]) {
        for state in states {
            cycle.transition_to(*state).unwrap();
        }
    }

    #[test]
    fn test_new_cycle_is_idle() {
        let cycle = GateCycle::new(Direction::Exit);
        assert_eq!(cycle.current_state(), Idle);
        assert_eq!(cycle.gate(), Direction::Exit);
        assert!(cycle.history().is_empty());
    }

    #[rstest]
    #[case(&[Recognizing, Deciding, Opening, Settling, Closing, Idle])]
    #[case(&[Recognizing, Deciding, Rejecting, Idle])]
    #[case(&[Recognizing, Deciding, Idle])]
    #[case(&[Recognizing, Idle])]
    fn test_valid_cycles(#[case] states: &[CycleState]) {
        let mut cycle = GateCycle::new(Direction::Entry);
        walk(&mut cycle, states);
        assert_eq!(cycle.current_state(), Idle);
        assert_eq!(cycle.history().len(), states.len());
    }

    #[rstest]
    #[case(Idle, Opening)]
    #[case(Idle, Deciding)]
    #[case(Recognizing, Opening)]
    #[case(Settling, Idle)]
    #[case(Opening, Idle)]
    #[case(Rejecting, Opening)]
    #[case(Closing, Opening)]
    fn test_invalid_edges(#[case] from: CycleState, #[case] to: CycleState) {
        assert!(!from.can_transition_to(&to));
    }

    #[test]
    fn test_invalid_transition_leaves_state() {
        let mut cycle = GateCycle::new(Direction::Entry);
        let err = cycle.transition_to(Closing).unwrap_err();
        assert!(matches!(
            err,
            ControllerError::InvalidTransition { from: Idle, to: Closing, .. }
        ));
        assert_eq!(cycle.current_state(), Idle);
        assert!(cycle.history().is_empty());
    }

    #[test]
    fn test_history_is_bounded() {
        let mut cycle = GateCycle::new(Direction::Entry);
        for _ in 0..60 {
            walk(&mut cycle, &[Recognizing, Idle]);
        }
        assert_eq!(cycle.history().len(), MAX_HISTORY_SIZE);
        assert_eq!(cycle.history().back().map(|t| t.to), Some(Idle));
    }

    #[test]
    fn test_last_cycle() {
        let mut cycle = GateCycle::new(Direction::Entry);
        walk(&mut cycle, &[Recognizing, Idle]);
        walk(&mut cycle, &[Recognizing, Deciding, Rejecting, Idle]);
        assert_eq!(
            cycle.last_cycle(),
            vec![Idle, Recognizing, Deciding, Rejecting, Idle]
        );
    }

    #[test]
    fn test_reset_from_anywhere() {
        let mut cycle = GateCycle::new(Direction::Entry);
        walk(&mut cycle, &[Recognizing, Deciding, Opening, Settling]);
        assert!(cycle.current_state().is_actuating());

        let transition = cycle.reset();
        assert_eq!(transition.from, Settling);
        assert_eq!(cycle.current_state(), Idle);
    }
}
