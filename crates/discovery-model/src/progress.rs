//! Per-section completion progress
//!
//! Simple sections report answered fields over total fields. Pipeline
//! sections report completed steps over chain length, or `1.0` once the
//! section is complete.

use crate::goals::FinancialGoals;
use crate::profile::{Profile, SectionName};
use crate::sections::{
    BasicContext, DiscoveryState, FinancialPurpose, FinancialSnapshot, PlanningPreferences,
    RetirementVision, RiskComfort,
};
use crate::values::ValuesDiscovery;
use std::collections::BTreeMap;

/// Completion scalar in `[0, 1]`
pub trait SectionProgress {
    /// Fraction of the section answered
    fn progress(&self) -> f64;
}

#[allow(clippy::cast_precision_loss)]
fn ratio(filled: &[bool]) -> f64 {
    if filled.is_empty() {
        return 0.0;
    }
    filled.iter().filter(|f| **f).count() as f64 / filled.len() as f64
}

#[allow(clippy::cast_precision_loss)]
fn pipeline_ratio<const N: usize>(
    state: DiscoveryState,
    steps: [Option<crate::Timestamp>; N],
) -> f64 {
    if state == DiscoveryState::Complete {
        return 1.0;
    }
    ratio(&steps.map(|s| s.is_some()))
}

impl SectionProgress for BasicContext {
    fn progress(&self) -> f64 {
        ratio(&[
            self.first_name.is_some(),
            self.last_name.is_some(),
            self.birth_year.is_some(),
            self.marital_status.is_some(),
            self.dependents.is_some(),
            self.state_of_residence.is_some(),
            self.occupation.is_some(),
            self.employment_status.is_some(),
        ])
    }
}

impl SectionProgress for RetirementVision {
    fn progress(&self) -> f64 {
        ratio(&[
            self.target_retirement_age.is_some(),
            self.vision_statement.is_some(),
            self.lifestyle.is_some(),
            self.location_plans.is_some(),
            !self.concerns.is_empty(),
            self.flexibility.is_some(),
        ])
    }
}

impl SectionProgress for PlanningPreferences {
    fn progress(&self) -> f64 {
        ratio(&[
            self.involvement_level.is_some(),
            self.decision_style.is_some(),
            self.communication_preference.is_some(),
            self.meeting_frequency.is_some(),
            !self.topics_of_interest.is_empty(),
        ])
    }
}

impl SectionProgress for RiskComfort {
    fn progress(&self) -> f64 {
        ratio(&[
            self.tolerance_score.is_some(),
            self.reaction_to_decline.is_some(),
            self.investment_experience.is_some(),
            self.time_horizon_years.is_some(),
            self.volatility_comfort.is_some(),
        ])
    }
}

impl SectionProgress for FinancialSnapshot {
    fn progress(&self) -> f64 {
        ratio(&[
            self.annual_income.is_some(),
            self.monthly_expenses.is_some(),
            self.retirement_savings.is_some(),
            self.emergency_fund_months.is_some(),
            self.total_debt.is_some(),
            self.home_equity.is_some(),
        ])
    }
}

impl SectionProgress for FinancialPurpose {
    fn progress(&self) -> f64 {
        if self.completed_at.is_some() {
            return 1.0;
        }
        ratio(&[
            self.purpose_statement.is_some(),
            !self.themes.is_empty(),
            self.legacy_intent.is_some(),
        ])
    }
}

impl SectionProgress for ValuesDiscovery {
    fn progress(&self) -> f64 {
        pipeline_ratio(self.state, self.step_completions())
    }
}

impl SectionProgress for FinancialGoals {
    fn progress(&self) -> f64 {
        pipeline_ratio(self.state, self.step_completions())
    }
}

impl Profile {
    /// Progress of one section
    #[must_use]
    pub fn section_progress(&self, section: SectionName) -> f64 {
        match section {
            SectionName::BasicContext => self.basic_context.progress(),
            SectionName::RetirementVision => self.retirement_vision.progress(),
            SectionName::PlanningPreferences => self.planning_preferences.progress(),
            SectionName::RiskComfort => self.risk_comfort.progress(),
            SectionName::FinancialSnapshot => self.financial_snapshot.progress(),
            SectionName::ValuesDiscovery => self.values_discovery.progress(),
            SectionName::FinancialGoals => self.financial_goals.progress(),
            SectionName::FinancialPurpose => self.financial_purpose.progress(),
        }
    }

    /// Progress of every section
    #[must_use]
    pub fn progress_by_section(&self) -> BTreeMap<SectionName, f64> {
        SectionName::ALL
            .into_iter()
            .map(|name| (name, self.section_progress(name)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timestamp;

    #[test]
    fn simple_section_counts_answered_fields() {
        let risk = RiskComfort {
            tolerance_score: Some(4),
            ..RiskComfort::default()
        };
        assert!((risk.progress() - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn pipeline_counts_completed_steps() {
        let at = timestamp::from_millis(1);
        let goals = FinancialGoals {
            state: DiscoveryState::InProgress,
            piles_completed_at: at,
            ..FinancialGoals::default()
        };
        assert!((goals.progress() - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn complete_pipeline_is_full() {
        let vd = ValuesDiscovery {
            state: DiscoveryState::Complete,
            ..ValuesDiscovery::default()
        };
        assert!((vd.progress() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn fresh_profile_has_no_progress() {
        let profile = Profile::new("u1", timestamp::now());
        assert!(profile.progress_by_section().values().all(|p| *p == 0.0));
        assert_eq!(profile.progress_by_section().len(), 8);
    }
}
