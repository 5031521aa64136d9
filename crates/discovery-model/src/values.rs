//! Values Discovery section
//!
//! A five-step pipeline: a free sort of value cards into three piles feeds
//! a ranked top 10, which feeds a ranked top 5, which feeds pairwise
//! tradeoffs among the top 5, which feed the non-negotiables. The derived
//! summary sits at the end. Each step records its own completion
//! timestamp.

use crate::sections::DiscoveryState;
use crate::timestamp::{self, Timestamp};
use serde::{Deserialize, Serialize};

/// Three-pile free sort of value cards
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ValuePiles {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub important: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub somewhat_important: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub not_important: Vec<String>,
}

impl ValuePiles {
    /// No card sorted yet
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.important.is_empty()
            && self.somewhat_important.is_empty()
            && self.not_important.is_empty()
    }
}

/// One pairwise judgment between two of the top 5
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeoffResponse {
    pub value_a: String,
    pub value_b: String,
    pub preferred: String,
    /// 1 (slight) to 3 (strong)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<u8>,
}

/// Summary derived once every step is complete
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ValuesSummary {
    pub core_values: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dominant_theme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ValuesDiscovery {
    pub state: DiscoveryState,
    /// Immutable once set; survives a full reset
    #[serde(with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub started_at: Option<Timestamp>,

    #[serde(skip_serializing_if = "ValuePiles::is_empty")]
    pub piles: ValuePiles,
    #[serde(with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub piles_completed_at: Option<Timestamp>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub top10: Vec<String>,
    #[serde(with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub top10_completed_at: Option<Timestamp>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub top5: Vec<String>,
    #[serde(with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub top5_completed_at: Option<Timestamp>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tradeoff_responses: Vec<TradeoffResponse>,
    #[serde(with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub tradeoffs_completed_at: Option<Timestamp>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub non_negotiables: Vec<String>,
    #[serde(with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub non_negotiables_completed_at: Option<Timestamp>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub derived: Option<ValuesSummary>,
    #[serde(with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,
}

impl ValuesDiscovery {
    /// Step completion stamps in pipeline order
    #[must_use]
    pub fn step_completions(&self) -> [Option<Timestamp>; 5] {
        [
            self.piles_completed_at,
            self.top10_completed_at,
            self.top5_completed_at,
            self.tradeoffs_completed_at,
            self.non_negotiables_completed_at,
        ]
    }
}
