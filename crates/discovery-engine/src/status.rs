//! Profile status transitions
//!
//! Status only moves forward: `not_started < in_progress < needs_review <
//! complete`. Setting the current status again is a no-op. Going back to
//! `not_started` happens only through `initialize` or `clear`.

use crate::error::StatusError;
use discovery_model::ProfileStatus;

/// Validates a status change.
///
/// Illegal transitions return an error; with the `strict-debug` feature
/// they panic instead.
///
/// # Errors
/// [`StatusError`] when `to` is behind `from`
pub fn validate_transition(from: ProfileStatus, to: ProfileStatus) -> Result<(), StatusError> {
    if from == to || allowed(from, to) {
        Ok(())
    } else {
        #[cfg(feature = "strict-debug")]
        panic!("Illegal status transition attempted: {from:?} -> {to:?}");

        #[cfg(not(feature = "strict-debug"))]
        Err(StatusError { from, to })
    }
}

/// Statuses reachable from `from` in one call
#[must_use]
pub fn allowed_transitions(from: ProfileStatus) -> Vec<ProfileStatus> {
    use ProfileStatus::{Complete, InProgress, NeedsReview, NotStarted};
    match from {
        NotStarted => vec![InProgress, NeedsReview, Complete],
        InProgress => vec![NeedsReview, Complete],
        NeedsReview => vec![Complete],
        Complete => vec![],
    }
}

fn allowed(from: ProfileStatus, to: ProfileStatus) -> bool {
    allowed_transitions(from).contains(&to)
}
