use discovery_engine::{allowed_transitions, validate_transition};
use discovery_model::ProfileStatus;
use proptest::prelude::*;

fn any_status() -> impl Strategy<Value = ProfileStatus> {
    prop_oneof![
        Just(ProfileStatus::NotStarted),
        Just(ProfileStatus::InProgress),
        Just(ProfileStatus::NeedsReview),
        Just(ProfileStatus::Complete),
    ]
}

#[test]
fn test_not_started_transitions() {
    assert!(validate_transition(ProfileStatus::NotStarted, ProfileStatus::InProgress).is_ok());
    assert!(validate_transition(ProfileStatus::NotStarted, ProfileStatus::Complete).is_ok());
}

#[test]
fn test_complete_is_terminal() {
    assert!(allowed_transitions(ProfileStatus::Complete).is_empty());
}

#[cfg(not(feature = "strict-debug"))]
proptest! {
    #[test]
    fn prop_transitions_follow_rank(from in any_status(), to in any_status()) {
        let res = validate_transition(from, to);
        if to.rank() >= from.rank() {
            prop_assert!(res.is_ok());
        } else {
            prop_assert!(res.is_err());
            prop_assert!(!allowed_transitions(from).contains(&to));
        }
    }
}
