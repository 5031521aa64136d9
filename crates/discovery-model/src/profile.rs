//! Profile root aggregate

use crate::goals::FinancialGoals;
use crate::ids::ProfileId;
use crate::sections::{
    BasicContext, FinancialPurpose, FinancialSnapshot, PlanningPreferences, RetirementVision,
    RiskComfort,
};
use crate::timestamp::{self, Timestamp};
use crate::values::ValuesDiscovery;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// Profile lifecycle status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileStatus {
    /// Freshly created
    #[default]
    NotStarted,
    /// Some section edited
    InProgress,
    /// Flagged for advisor review
    NeedsReview,
    /// Finished
    Complete,
}

impl ProfileStatus {
    /// Position in the forward order
    #[inline]
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            Self::NotStarted => 0,
            Self::InProgress => 1,
            Self::NeedsReview => 2,
            Self::Complete => 3,
        }
    }
}

/// Section names as they appear on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SectionName {
    BasicContext,
    RetirementVision,
    PlanningPreferences,
    RiskComfort,
    FinancialSnapshot,
    ValuesDiscovery,
    FinancialGoals,
    FinancialPurpose,
}

impl SectionName {
    /// All sections in wizard order
    pub const ALL: [SectionName; 8] = [
        Self::BasicContext,
        Self::RetirementVision,
        Self::PlanningPreferences,
        Self::RiskComfort,
        Self::FinancialSnapshot,
        Self::ValuesDiscovery,
        Self::FinancialGoals,
        Self::FinancialPurpose,
    ];

    /// Wire name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BasicContext => "basicContext",
            Self::RetirementVision => "retirementVision",
            Self::PlanningPreferences => "planningPreferences",
            Self::RiskComfort => "riskComfort",
            Self::FinancialSnapshot => "financialSnapshot",
            Self::ValuesDiscovery => "valuesDiscovery",
            Self::FinancialGoals => "financialGoals",
            Self::FinancialPurpose => "financialPurpose",
        }
    }

    /// Sections with an internal step pipeline
    #[inline]
    #[must_use]
    pub fn is_pipeline(self) -> bool {
        matches!(self, Self::ValuesDiscovery | Self::FinancialGoals)
    }

    /// Wire names of the section's fields
    #[must_use]
    pub fn field_names(self) -> &'static [&'static str] {
        match self {
            Self::BasicContext => &[
                "firstName",
                "lastName",
                "birthYear",
                "maritalStatus",
                "dependents",
                "stateOfResidence",
                "occupation",
                "employmentStatus",
            ],
            Self::RetirementVision => &[
                "targetRetirementAge",
                "visionStatement",
                "lifestyle",
                "locationPlans",
                "concerns",
                "flexibility",
            ],
            Self::PlanningPreferences => &[
                "involvementLevel",
                "decisionStyle",
                "communicationPreference",
                "meetingFrequency",
                "topicsOfInterest",
            ],
            Self::RiskComfort => &[
                "toleranceScore",
                "reactionToDecline",
                "investmentExperience",
                "timeHorizonYears",
                "volatilityComfort",
            ],
            Self::FinancialSnapshot => &[
                "annualIncome",
                "monthlyExpenses",
                "retirementSavings",
                "emergencyFundMonths",
                "totalDebt",
                "homeEquity",
            ],
            Self::ValuesDiscovery => &[
                "state",
                "startedAt",
                "piles",
                "pilesCompletedAt",
                "top10",
                "top10CompletedAt",
                "top5",
                "top5CompletedAt",
                "tradeoffResponses",
                "tradeoffsCompletedAt",
                "nonNegotiables",
                "nonNegotiablesCompletedAt",
                "derived",
                "completedAt",
            ],
            Self::FinancialGoals => &[
                "state",
                "startedAt",
                "customGoals",
                "piles",
                "pilesCompletedAt",
                "ranked",
                "rankedCompletedAt",
                "tradeoffResponses",
                "tradeoffsCompletedAt",
                "derived",
                "completedAt",
            ],
            Self::FinancialPurpose => &["purposeStatement", "themes", "legacyIntent", "completedAt"],
        }
    }

    /// Whether `key` names a field of this section
    #[inline]
    #[must_use]
    pub fn has_field(self, key: &str) -> bool {
        self.field_names().contains(&key)
    }
}

impl std::fmt::Display for SectionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized section name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown section: {0}")]
pub struct UnknownSection(pub String);

impl FromStr for SectionName {
    type Err = UnknownSection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| UnknownSection(s.to_string()))
    }
}

/// Root aggregate: one person's discovery profile
///
/// # Invariants
/// - `updated_at >= created_at`
/// - belongs to exactly one tenant while resident
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: ProfileId,
    pub owner_id: String,
    #[serde(default)]
    pub status: ProfileStatus,
    #[serde(default)]
    pub basic_context: BasicContext,
    #[serde(default)]
    pub retirement_vision: RetirementVision,
    #[serde(default)]
    pub planning_preferences: PlanningPreferences,
    #[serde(default)]
    pub risk_comfort: RiskComfort,
    #[serde(default)]
    pub financial_snapshot: FinancialSnapshot,
    #[serde(default)]
    pub values_discovery: ValuesDiscovery,
    #[serde(default)]
    pub financial_goals: FinancialGoals,
    #[serde(default)]
    pub financial_purpose: FinancialPurpose,
    #[serde(default)]
    pub advisor_notes: String,
    #[serde(with = "timestamp")]
    pub created_at: Timestamp,
    #[serde(with = "timestamp")]
    pub updated_at: Timestamp,
}

impl Profile {
    /// Create an empty profile
    #[must_use]
    pub fn new(owner_id: impl Into<String>, at: Timestamp) -> Self {
        Self {
            id: ProfileId::new(),
            owner_id: owner_id.into(),
            status: ProfileStatus::NotStarted,
            basic_context: BasicContext::default(),
            retirement_vision: RetirementVision::default(),
            planning_preferences: PlanningPreferences::default(),
            risk_comfort: RiskComfort::default(),
            financial_snapshot: FinancialSnapshot::default(),
            values_discovery: ValuesDiscovery::default(),
            financial_goals: FinancialGoals::default(),
            financial_purpose: FinancialPurpose::default(),
            advisor_notes: String::new(),
            created_at: at,
            updated_at: at,
        }
    }

    /// Stamp `updated_at`, never earlier than `created_at`
    #[inline]
    pub fn touch(&mut self, at: Timestamp) {
        self.updated_at = at.max(self.created_at);
    }

    /// Section as a JSON object
    ///
    /// # Errors
    /// Only if the section type fails to serialize
    pub fn section_value(&self, section: SectionName) -> Result<Value, serde_json::Error> {
        match section {
            SectionName::BasicContext => serde_json::to_value(&self.basic_context),
            SectionName::RetirementVision => serde_json::to_value(&self.retirement_vision),
            SectionName::PlanningPreferences => serde_json::to_value(&self.planning_preferences),
            SectionName::RiskComfort => serde_json::to_value(&self.risk_comfort),
            SectionName::FinancialSnapshot => serde_json::to_value(&self.financial_snapshot),
            SectionName::ValuesDiscovery => serde_json::to_value(&self.values_discovery),
            SectionName::FinancialGoals => serde_json::to_value(&self.financial_goals),
            SectionName::FinancialPurpose => serde_json::to_value(&self.financial_purpose),
        }
    }

    /// Replace a section from a JSON object
    ///
    /// The profile is untouched if the value does not fit the section.
    ///
    /// # Errors
    /// Returns the deserialization error when `value` does not fit
    pub fn replace_section_value(
        &mut self,
        section: SectionName,
        value: Value,
    ) -> Result<(), serde_json::Error> {
        match section {
            SectionName::BasicContext => self.basic_context = serde_json::from_value(value)?,
            SectionName::RetirementVision => {
                self.retirement_vision = serde_json::from_value(value)?;
            }
            SectionName::PlanningPreferences => {
                self.planning_preferences = serde_json::from_value(value)?;
            }
            SectionName::RiskComfort => self.risk_comfort = serde_json::from_value(value)?,
            SectionName::FinancialSnapshot => {
                self.financial_snapshot = serde_json::from_value(value)?;
            }
            SectionName::ValuesDiscovery => {
                self.values_discovery = serde_json::from_value(value)?;
            }
            SectionName::FinancialGoals => self.financial_goals = serde_json::from_value(value)?,
            SectionName::FinancialPurpose => {
                self.financial_purpose = serde_json::from_value(value)?;
            }
        }
        Ok(())
    }
}
