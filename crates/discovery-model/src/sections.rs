//! Simple profile sections
//!
//! Every field is optional; a section is partially populated while the
//! wizard is in progress. Unset fields and empty lists are omitted on the
//! wire so a section serializes to exactly what has been answered.

use crate::timestamp::{self, Timestamp};
use serde::{Deserialize, Serialize};

/// Lifecycle of a pipeline section
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscoveryState {
    /// Nothing answered yet
    #[default]
    NotStarted,
    /// At least one step touched
    InProgress,
    /// Every step complete and the summary derived
    Complete,
}

/// Who the person is
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BasicContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_year: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marital_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependents: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_of_residence: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employment_status: Option<String>,
}

/// What retirement should look like
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetirementVision {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_retirement_age: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vision_statement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifestyle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_plans: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub concerns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flexibility: Option<String>,
}

/// How the person likes to plan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlanningPreferences {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub involvement_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision_style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub communication_preference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_frequency: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub topics_of_interest: Vec<String>,
}

/// Comfort with investment risk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RiskComfort {
    /// 1 (avoid all risk) to 10 (seek risk)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerance_score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reaction_to_decline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub investment_experience: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_horizon_years: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volatility_comfort: Option<String>,
}

/// Point-in-time numbers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FinancialSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annual_income: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_expenses: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retirement_savings: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergency_fund_months: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_debt: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_equity: Option<f64>,
}

/// Why the money matters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FinancialPurpose {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose_statement: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub themes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legacy_intent: Option<String>,
    #[serde(with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,
}
