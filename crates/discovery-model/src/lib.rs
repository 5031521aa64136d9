//! Discovery Profile Document Model
//!
//! The typed shape of a discovery profile:
//! - **Profile**: the root aggregate owned by one tenant
//! - **Sections**: independently typed, partially populated records
//! - **Pipeline sections**: [`ValuesDiscovery`] and [`FinancialGoals`], whose
//!   steps each carry a completion timestamp
//! - **Tenant**: the consumer or one advisor-managed client
//!
//! # Example
//!
//! ```rust
//! use discovery_model::{timestamp, Profile, ProfileStatus, SectionName};
//!
//! let profile = Profile::new("u1", timestamp::now());
//! assert_eq!(profile.status, ProfileStatus::NotStarted);
//! assert_eq!(profile.section_progress(SectionName::BasicContext), 0.0);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod goals;
pub mod ids;
pub mod profile;
pub mod progress;
pub mod sections;
pub mod timestamp;
pub mod values;

// Re-exports
pub use goals::{CustomGoal, FinancialGoals, GoalPiles, GoalTradeoff, GoalsSummary};
pub use ids::{ClientId, ProfileId, Tenant, CONSUMER_OWNER_ID};
pub use profile::{Profile, ProfileStatus, SectionName, UnknownSection};
pub use progress::SectionProgress;
pub use sections::{
    BasicContext, DiscoveryState, FinancialPurpose, FinancialSnapshot, PlanningPreferences,
    RetirementVision, RiskComfort,
};
pub use timestamp::Timestamp;
pub use values::{TradeoffResponse, ValuePiles, ValuesDiscovery, ValuesSummary};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
