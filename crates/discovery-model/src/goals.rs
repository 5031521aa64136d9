//! Financial Goals section
//!
//! A three-step pipeline: goal cards are sorted into piles, the kept goals
//! are ranked, and pairwise tradeoffs are judged among the ranked goals.

use crate::sections::DiscoveryState;
use crate::timestamp::{self, Timestamp};
use serde::{Deserialize, Serialize};

/// Goal card sort
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GoalPiles {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub must_have: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nice_to_have: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub not_now: Vec<String>,
}

impl GoalPiles {
    /// No goal sorted yet
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.must_have.is_empty() && self.nice_to_have.is_empty() && self.not_now.is_empty()
    }
}

/// User-authored goal card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomGoal {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_year: Option<u16>,
}

/// Pairwise judgment between two ranked goals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalTradeoff {
    pub goal_a: String,
    pub goal_b: String,
    pub preferred: String,
}

/// Summary derived once every step is complete
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GoalsSummary {
    pub top_priorities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FinancialGoals {
    pub state: DiscoveryState,
    #[serde(with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub started_at: Option<Timestamp>,
    /// Not owned by any step; kept across resets
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub custom_goals: Vec<CustomGoal>,

    #[serde(skip_serializing_if = "GoalPiles::is_empty")]
    pub piles: GoalPiles,
    #[serde(with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub piles_completed_at: Option<Timestamp>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ranked: Vec<String>,
    #[serde(with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub ranked_completed_at: Option<Timestamp>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tradeoff_responses: Vec<GoalTradeoff>,
    #[serde(with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub tradeoffs_completed_at: Option<Timestamp>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub derived: Option<GoalsSummary>,
    #[serde(with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,
}

impl FinancialGoals {
    /// Step completion stamps in pipeline order
    #[must_use]
    pub fn step_completions(&self) -> [Option<Timestamp>; 3] {
        [
            self.piles_completed_at,
            self.ranked_completed_at,
            self.tradeoffs_completed_at,
        ]
    }
}
