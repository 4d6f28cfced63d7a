//! Voting event lifecycle rules.
//!
//! ```text
//! draft ──► live ──► frozen   (survey)
//!                └─► closed   (poll)
//! ```
//!
//! These checks look only at the event itself. The cross-event rule (one
//! live survey) and the entry-count precondition need the database and
//! live in [`crate::services::VotingEventService::change_state`].

use reelvote_common::{AppError, AppResult};
use reelvote_db::entities::voting_event::{EventKind, EventState};

/// Check that `kind` may move from `from` to `to`.
pub fn check_transition(kind: EventKind, from: EventState, to: EventState) -> AppResult<()> {
    if from.is_terminal() {
        return Err(AppError::InvalidState(format!(
            "This {} is {} and can no longer change state",
            kind.as_str(),
            from.as_str()
        )));
    }

    match (from, to) {
        (EventState::Draft, EventState::Live) => Ok(()),
        (EventState::Live, target) if target == kind.terminal_state() => Ok(()),
        (EventState::Live, target) if target.is_terminal() => Err(AppError::InvalidState(format!(
            "A {} ends as {}, not {}",
            kind.as_str(),
            kind.terminal_state().as_str(),
            target.as_str()
        ))),
        (from, to) => Err(AppError::InvalidState(format!(
            "Cannot move a {} from {} to {}",
            kind.as_str(),
            from.as_str(),
            to.as_str()
        ))),
    }
}

/// Check that entries may be added to or removed from an event.
pub fn ensure_entries_mutable(state: EventState) -> AppResult<()> {
    if state.accepts_entries() {
        Ok(())
    } else {
        Err(AppError::InvalidState(format!(
            "Movies cannot be changed once the event is {}",
            state.as_str()
        )))
    }
}

/// Check that ballots may be submitted or changed.
pub fn ensure_accepts_ballots(state: EventState) -> AppResult<()> {
    if state.accepts_ballots() {
        Ok(())
    } else {
        Err(AppError::InvalidState(format!(
            "Voting is not open (event is {})",
            state.as_str()
        )))
    }
}
