//! Dependency chains for the two pipeline sections

use super::{PipelineChain, PipelineSection, StepDescriptor};
use discovery_model::{
    DiscoveryState, FinancialGoals, GoalPiles, SectionName, Timestamp, ValuePiles,
    ValuesDiscovery,
};

/// piles → top10 → top5 → tradeoffs → nonNegotiables
pub static VALUES_DISCOVERY_CHAIN: PipelineChain<ValuesDiscovery> = PipelineChain {
    section: SectionName::ValuesDiscovery,
    steps: &[
        StepDescriptor {
            token: "piles",
            completed_at: |s| s.piles_completed_at,
            set_completed_at: |s, at| s.piles_completed_at = at,
            has_answers: |s| !s.piles.is_empty(),
            clear_answers: |s| s.piles = ValuePiles::default(),
        },
        StepDescriptor {
            token: "top10",
            completed_at: |s| s.top10_completed_at,
            set_completed_at: |s, at| s.top10_completed_at = at,
            has_answers: |s| !s.top10.is_empty(),
            clear_answers: |s| s.top10.clear(),
        },
        StepDescriptor {
            token: "top5",
            completed_at: |s| s.top5_completed_at,
            set_completed_at: |s, at| s.top5_completed_at = at,
            has_answers: |s| !s.top5.is_empty(),
            clear_answers: |s| s.top5.clear(),
        },
        StepDescriptor {
            token: "tradeoffs",
            completed_at: |s| s.tradeoffs_completed_at,
            set_completed_at: |s, at| s.tradeoffs_completed_at = at,
            has_answers: |s| !s.tradeoff_responses.is_empty(),
            clear_answers: |s| s.tradeoff_responses.clear(),
        },
        StepDescriptor {
            token: "nonNegotiables",
            completed_at: |s| s.non_negotiables_completed_at,
            set_completed_at: |s, at| s.non_negotiables_completed_at = at,
            has_answers: |s| !s.non_negotiables.is_empty(),
            clear_answers: |s| s.non_negotiables.clear(),
        },
    ],
};

/// piles → ranked → tradeoffs
pub static FINANCIAL_GOALS_CHAIN: PipelineChain<FinancialGoals> = PipelineChain {
    section: SectionName::FinancialGoals,
    steps: &[
        StepDescriptor {
            token: "piles",
            completed_at: |s| s.piles_completed_at,
            set_completed_at: |s, at| s.piles_completed_at = at,
            has_answers: |s| !s.piles.is_empty(),
            clear_answers: |s| s.piles = GoalPiles::default(),
        },
        StepDescriptor {
            token: "ranked",
            completed_at: |s| s.ranked_completed_at,
            set_completed_at: |s, at| s.ranked_completed_at = at,
            has_answers: |s| !s.ranked.is_empty(),
            clear_answers: |s| s.ranked.clear(),
        },
        StepDescriptor {
            token: "tradeoffs",
            completed_at: |s| s.tradeoffs_completed_at,
            set_completed_at: |s, at| s.tradeoffs_completed_at = at,
            has_answers: |s| !s.tradeoff_responses.is_empty(),
            clear_answers: |s| s.tradeoff_responses.clear(),
        },
    ],
};

impl PipelineSection for ValuesDiscovery {
    fn chain() -> &'static PipelineChain<Self> {
        &VALUES_DISCOVERY_CHAIN
    }

    fn state(&self) -> DiscoveryState {
        self.state
    }

    fn set_state(&mut self, state: DiscoveryState) {
        self.state = state;
    }

    fn started_at(&self) -> Option<Timestamp> {
        self.started_at
    }

    fn set_started_at(&mut self, at: Timestamp) {
        self.started_at = Some(at);
    }

    fn has_terminal_markers(&self) -> bool {
        self.derived.is_some() || self.completed_at.is_some()
    }

    fn clear_terminal_markers(&mut self) {
        self.derived = None;
        self.completed_at = None;
    }

    fn set_completed_at(&mut self, at: Timestamp) {
        self.completed_at = Some(at);
    }
}

impl PipelineSection for FinancialGoals {
    fn chain() -> &'static PipelineChain<Self> {
        &FINANCIAL_GOALS_CHAIN
    }

    fn state(&self) -> DiscoveryState {
        self.state
    }

    fn set_state(&mut self, state: DiscoveryState) {
        self.state = state;
    }

    fn started_at(&self) -> Option<Timestamp> {
        self.started_at
    }

    fn set_started_at(&mut self, at: Timestamp) {
        self.started_at = Some(at);
    }

    fn has_terminal_markers(&self) -> bool {
        self.derived.is_some() || self.completed_at.is_some()
    }

    fn clear_terminal_markers(&mut self) {
        self.derived = None;
        self.completed_at = None;
    }

    fn set_completed_at(&mut self, at: Timestamp) {
        self.completed_at = Some(at);
    }
}
