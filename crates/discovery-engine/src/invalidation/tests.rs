use super::*;
use discovery_model::{CustomGoal, FinancialGoals, ValuePiles, ValuesDiscovery};
use discovery_test_utils::{at, completed_goals, completed_values};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

const VALUES_TOKENS: [&str; 5] = ["piles", "top10", "top5", "tradeoffs", "nonNegotiables"];
const GOALS_TOKENS: [&str; 3] = ["piles", "ranked", "tradeoffs"];

fn boat() -> CustomGoal {
    CustomGoal {
        id: "g1".to_string(),
        label: "Boat".to_string(),
        target_amount: Some(40_000.0),
        target_year: None,
    }
}

/// Completed goals carrying one custom goal
fn goals_with_custom() -> FinancialGoals {
    let mut goals = completed_goals();
    goals.custom_goals = vec![boat()];
    goals
}

#[test]
fn chain_tokens_are_in_pipeline_order() {
    assert_eq!(VALUES_DISCOVERY_CHAIN.tokens(), VALUES_TOKENS.to_vec());
    assert_eq!(
        FINANCIAL_GOALS_CHAIN.tokens(),
        vec!["piles", "ranked", "tradeoffs"]
    );
}

#[test]
fn invalidating_piles_resets_everything_downstream() {
    let before = completed_values();
    let out = VALUES_DISCOVERY_CHAIN
        .invalidate_from(&before, "piles")
        .unwrap();

    assert_eq!(out.reset_steps, VALUES_TOKENS[1..].to_vec());
    let after = out.section;
    assert_eq!(after.piles, before.piles);
    assert_eq!(after.piles_completed_at, before.piles_completed_at);
    assert!(after.top10.is_empty() && after.top10_completed_at.is_none());
    assert!(after.top5.is_empty() && after.top5_completed_at.is_none());
    assert!(after.tradeoff_responses.is_empty());
    assert!(after.non_negotiables.is_empty());
    assert_eq!(after.derived, None);
    assert_eq!(after.completed_at, None);
    assert_eq!(after.state, DiscoveryState::InProgress);
    assert_eq!(after.started_at, before.started_at);
}

#[test]
fn goals_ranking_change_resets_only_tradeoffs() {
    let before = completed_goals();
    let out = FINANCIAL_GOALS_CHAIN.invalidate_from(&before, "ranked").unwrap();
    assert_eq!(out.reset_steps, vec!["tradeoffs"]);
    assert_eq!(out.section.ranked, before.ranked);
    assert!(out.section.tradeoff_responses.is_empty());
    assert_eq!(out.section.derived, None);
    assert_eq!(out.section.state, DiscoveryState::InProgress);
}

#[test]
fn terminal_step_only_clears_terminal_markers() {
    let before = completed_values();
    let out = VALUES_DISCOVERY_CHAIN
        .invalidate_from(&before, "nonNegotiables")
        .unwrap();

    assert!(out.reset_steps.is_empty());
    assert_eq!(out.section.non_negotiables, before.non_negotiables);
    assert_eq!(out.section.tradeoff_responses, before.tradeoff_responses);
    assert_eq!(out.section.derived, None);
    assert_eq!(out.section.completed_at, None);
}

#[test]
fn untouched_section_stays_not_started() {
    let before = ValuesDiscovery::default();
    assert!(!VALUES_DISCOVERY_CHAIN.is_touched(&before));
    let out = VALUES_DISCOVERY_CHAIN.invalidate_from(&before, "top5").unwrap();
    assert_eq!(out.section.state, DiscoveryState::NotStarted);
}

#[test]
fn answered_section_is_in_progress_after_invalidation() {
    let before = ValuesDiscovery {
        piles: ValuePiles {
            important: vec!["family".to_string()],
            ..ValuePiles::default()
        },
        top10: vec!["family".to_string()],
        ..ValuesDiscovery::default()
    };
    assert!(VALUES_DISCOVERY_CHAIN.is_touched(&before));

    let out = VALUES_DISCOVERY_CHAIN.invalidate_from(&before, "piles").unwrap();
    assert_eq!(out.reset_steps, VALUES_TOKENS[1..].to_vec());
    assert!(out.section.top10.is_empty());
    assert_eq!(out.section.piles, before.piles);
    assert_eq!(out.section.state, DiscoveryState::InProgress);
}

#[test]
fn start_ignores_untouched_sections() {
    let untouched = VALUES_DISCOVERY_CHAIN.start(&ValuesDiscovery::default(), at(5));
    assert_eq!(untouched, ValuesDiscovery::default());

    let answered = ValuesDiscovery {
        top5: vec!["health".to_string()],
        ..ValuesDiscovery::default()
    };
    let started = VALUES_DISCOVERY_CHAIN.start(&answered, at(5));
    assert_eq!(started.state, DiscoveryState::InProgress);
    assert_eq!(started.started_at, Some(at(5)));
    assert_eq!(VALUES_DISCOVERY_CHAIN.start(&completed_values(), at(9)), completed_values());
}

#[test]
fn custom_goals_survive_invalidation() {
    let before = goals_with_custom();
    let out = FINANCIAL_GOALS_CHAIN.invalidate_from(&before, "piles").unwrap();
    assert_eq!(out.reset_steps, vec!["ranked", "tradeoffs"]);
    assert_eq!(out.section.custom_goals, vec![boat()]);
    assert_eq!(out.section.piles, before.piles);
    assert!(out.section.ranked.is_empty());
}

#[cfg(not(feature = "strict-debug"))]
#[test]
fn unknown_token_is_rejected() {
    let err = VALUES_DISCOVERY_CHAIN
        .invalidate_from(&completed_values(), "top7")
        .unwrap_err();
    assert_eq!(
        err,
        InvalidationError::UnknownStep {
            section: SectionName::ValuesDiscovery,
            token: "top7".to_string(),
        }
    );
}

#[cfg(feature = "strict-debug")]
#[test]
#[should_panic(expected = "unknown step")]
fn unknown_token_panics_in_strict_mode() {
    let _ = VALUES_DISCOVERY_CHAIN.position("top7");
}

#[test]
fn completing_out_of_order_names_the_open_step() {
    let err = VALUES_DISCOVERY_CHAIN
        .complete_step(&ValuesDiscovery::default(), "top5", at(10))
        .unwrap_err();
    assert_eq!(
        err,
        InvalidationError::UpstreamIncomplete {
            section: SectionName::ValuesDiscovery,
            step: "top5",
            missing: "piles",
        }
    );
}

#[test]
fn completing_first_step_starts_the_section() {
    let next = VALUES_DISCOVERY_CHAIN
        .complete_step(&ValuesDiscovery::default(), "piles", at(10))
        .unwrap();
    assert_eq!(next.piles_completed_at, Some(at(10)));
    assert_eq!(next.started_at, Some(at(10)));
    assert_eq!(next.state, DiscoveryState::InProgress);
}

#[test]
fn complete_section_requires_every_step() {
    let mut partial = completed_values();
    partial.tradeoffs_completed_at = None;
    partial.non_negotiables_completed_at = None;
    let err = VALUES_DISCOVERY_CHAIN
        .complete_section(&partial, at(9))
        .unwrap_err();
    assert!(matches!(
        err,
        InvalidationError::UpstreamIncomplete { missing: "tradeoffs", .. }
    ));

    let reopened = VALUES_DISCOVERY_CHAIN
        .invalidate_from(&completed_values(), "nonNegotiables")
        .unwrap()
        .section;
    let done = VALUES_DISCOVERY_CHAIN
        .complete_section(&reopened, at(9))
        .unwrap();
    assert_eq!(done.state, DiscoveryState::Complete);
    assert_eq!(done.completed_at, Some(at(9)));
}

#[test]
fn reset_all_keeps_started_at_and_custom_goals() {
    let goals = FinancialGoals {
        state: DiscoveryState::InProgress,
        started_at: Some(at(1)),
        custom_goals: vec![boat()],
        ranked: vec!["travel".to_string()],
        piles_completed_at: Some(at(2)),
        ranked_completed_at: Some(at(3)),
        ..FinancialGoals::default()
    };
    let out = FINANCIAL_GOALS_CHAIN.reset_all(&goals);
    assert_eq!(out.reset_steps, vec!["piles", "ranked", "tradeoffs"]);
    assert_eq!(out.section.started_at, Some(at(1)));
    assert_eq!(out.section.custom_goals, goals.custom_goals);
    assert!(out.section.ranked.is_empty());
    assert_eq!(out.section.state, DiscoveryState::NotStarted);
}

#[test]
fn normalize_heals_a_gap() {
    let mut broken = completed_values();
    broken.top10_completed_at = None;
    assert!(matches!(
        VALUES_DISCOVERY_CHAIN.check_ordering(&broken),
        Err(InvalidationError::OrderingViolation {
            step: "top5",
            missing: "top10",
            ..
        })
    ));

    let out = VALUES_DISCOVERY_CHAIN.normalize(&broken);
    assert_eq!(out.reset_steps, vec!["top5", "tradeoffs", "nonNegotiables"]);
    assert!(VALUES_DISCOVERY_CHAIN.check_ordering(&out.section).is_ok());
    assert_eq!(out.section.derived, None);
    assert_eq!(out.section.state, DiscoveryState::InProgress);
    // top10 answers have no stamp but are not downstream of the gap
    assert_eq!(out.section.top10, broken.top10);
}

#[test]
fn normalize_leaves_valid_sections_alone() {
    let done = completed_values();
    let out = VALUES_DISCOVERY_CHAIN.normalize(&done);
    assert!(out.reset_steps.is_empty());
    assert_eq!(out.section, done);
}

#[cfg(not(feature = "strict-debug"))]
#[test]
fn op_on_simple_section_has_no_pipeline() {
    let mut profile = Profile::new("u1", at(0));
    let err = PipelineOp::InvalidateFrom("piles")
        .apply(&mut profile, SectionName::RiskComfort)
        .unwrap_err();
    assert_eq!(err, InvalidationError::NoPipeline(SectionName::RiskComfort));
}

#[test]
fn op_writes_back_into_the_profile() {
    let mut profile = Profile::new("u1", at(0));
    profile.values_discovery = completed_values();
    let reset = PipelineOp::InvalidateFrom("top10")
        .apply(&mut profile, SectionName::ValuesDiscovery)
        .unwrap();
    assert_eq!(reset, vec!["top5", "tradeoffs", "nonNegotiables"]);
    assert!(profile.values_discovery.top5.is_empty());
    assert!(!profile.values_discovery.top10.is_empty());
}

/// Every step answered; the first `completed` steps stamped
fn stamped_prefix<S: PipelineSection>(mut section: S, completed: usize) -> S {
    let steps = S::chain().steps;
    for step in &steps[completed..] {
        (step.set_completed_at)(&mut section, None);
    }
    if completed < steps.len() {
        section.set_state(DiscoveryState::InProgress);
        section.clear_terminal_markers();
    }
    section
}

/// Every step answered; stamps follow an arbitrary mask
fn stamped_mask<S: PipelineSection>(mut section: S, mask: &[bool]) -> S {
    for (step, &stamped) in S::chain().steps.iter().zip(mask) {
        if !stamped {
            (step.set_completed_at)(&mut section, None);
        }
    }
    section
}

proptest! {
    #[test]
    fn invalidation_preserves_upstream_and_clears_downstream(
        completed in 0usize..=5,
        index in 0usize..5,
    ) {
        let before = stamped_prefix(completed_values(), completed);
        let token = VALUES_TOKENS[index];
        let after = VALUES_DISCOVERY_CHAIN.invalidate_from(&before, token).unwrap().section;

        prop_assert!(VALUES_DISCOVERY_CHAIN.check_ordering(&after).is_ok());
        prop_assert!(after.derived.is_none());
        prop_assert!(after.completed_at.is_none());
        prop_assert_eq!(after.started_at, before.started_at);

        let steps = VALUES_DISCOVERY_CHAIN.steps;
        for step in &steps[..=index] {
            prop_assert_eq!((step.completed_at)(&after), (step.completed_at)(&before));
        }
        for step in &steps[index + 1..] {
            prop_assert!(!step.is_complete(&after));
        }
        prop_assert_eq!(&after.piles, &before.piles);
    }

    #[test]
    fn normalize_always_restores_ordering(mask in proptest::collection::vec(any::<bool>(), 5)) {
        let raw = stamped_mask(completed_values(), &mask);
        let healed = VALUES_DISCOVERY_CHAIN.normalize(&raw).section;
        prop_assert!(VALUES_DISCOVERY_CHAIN.check_ordering(&healed).is_ok());
        // the completed prefix survives
        for (step, _) in VALUES_DISCOVERY_CHAIN.steps.iter().zip(&mask).take_while(|(_, m)| **m) {
            prop_assert!(step.is_complete(&healed));
        }
    }

    #[test]
    fn goals_invalidation_preserves_upstream_and_clears_downstream(
        completed in 0usize..=3,
        index in 0usize..3,
    ) {
        let before = stamped_prefix(goals_with_custom(), completed);
        let token = GOALS_TOKENS[index];
        let after = FINANCIAL_GOALS_CHAIN.invalidate_from(&before, token).unwrap().section;

        prop_assert!(FINANCIAL_GOALS_CHAIN.check_ordering(&after).is_ok());
        prop_assert!(after.derived.is_none());
        prop_assert!(after.completed_at.is_none());
        prop_assert_eq!(after.started_at, before.started_at);
        prop_assert_eq!(after.state, DiscoveryState::InProgress);

        let steps = FINANCIAL_GOALS_CHAIN.steps;
        for step in &steps[..=index] {
            prop_assert_eq!((step.completed_at)(&after), (step.completed_at)(&before));
        }
        for step in &steps[index + 1..] {
            prop_assert!(!step.is_complete(&after));
            prop_assert!(!(step.has_answers)(&after));
        }
        prop_assert_eq!(&after.piles, &before.piles);
        prop_assert_eq!(&after.custom_goals, &before.custom_goals);
    }

    #[test]
    fn goals_normalize_always_restores_ordering(mask in proptest::collection::vec(any::<bool>(), 3)) {
        let raw = stamped_mask(goals_with_custom(), &mask);
        let healed = FINANCIAL_GOALS_CHAIN.normalize(&raw).section;
        prop_assert!(FINANCIAL_GOALS_CHAIN.check_ordering(&healed).is_ok());
        prop_assert_eq!(&healed.custom_goals, &raw.custom_goals);
        for (step, _) in FINANCIAL_GOALS_CHAIN.steps.iter().zip(&mask).take_while(|(_, m)| **m) {
            prop_assert!(step.is_complete(&healed));
        }
    }
}
