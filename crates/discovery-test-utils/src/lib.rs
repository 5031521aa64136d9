//! Testing utilities for the discovery workspace
//!
//! Shared fixtures and an instrumented storage backend.

#![allow(missing_docs)]

use async_trait::async_trait;
use discovery_model::{
    timestamp, DiscoveryState, FinancialGoals, GoalTradeoff, GoalsSummary, Profile, Timestamp,
    TradeoffResponse, ValuesDiscovery, ValuesSummary,
};
use discovery_vault::{KeyValueStore, MemoryStore, SessionKey, StorageError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Deterministic session key
pub fn test_key() -> SessionKey {
    SessionKey::from_bytes([7u8; 32])
}

/// Fixed instant `ms` milliseconds after the epoch
pub fn at(ms: i64) -> Timestamp {
    timestamp::from_millis(ms).unwrap()
}

pub fn sample_profile(owner: &str) -> Profile {
    let mut profile = Profile::new(owner, at(1_700_000_000_000));
    profile.basic_context.first_name = Some("Jo".to_string());
    profile.basic_context.birth_year = Some(1970);
    profile
}

/// Values discovery with every step answered and stamped, plus the summary
pub fn completed_values() -> ValuesDiscovery {
    let mut values = ValuesDiscovery::default();
    values.state = DiscoveryState::Complete;
    values.started_at = Some(at(1_000));
    values.piles.important = vec!["family".to_string(), "health".to_string()];
    values.piles_completed_at = Some(at(2_000));
    values.top10 = vec!["family".to_string(), "health".to_string()];
    values.top10_completed_at = Some(at(3_000));
    values.top5 = vec!["family".to_string()];
    values.top5_completed_at = Some(at(4_000));
    values.tradeoff_responses = vec![TradeoffResponse {
        value_a: "family".to_string(),
        value_b: "health".to_string(),
        preferred: "family".to_string(),
        strength: Some(3),
    }];
    values.tradeoffs_completed_at = Some(at(5_000));
    values.non_negotiables = vec!["family".to_string()];
    values.non_negotiables_completed_at = Some(at(6_000));
    values.derived = Some(ValuesSummary {
        core_values: vec!["family".to_string()],
        dominant_theme: Some("connection".to_string()),
        summary: None,
    });
    values.completed_at = Some(at(7_000));
    values
}

/// Financial goals with every step answered and stamped, plus the summary
pub fn completed_goals() -> FinancialGoals {
    let mut goals = FinancialGoals::default();
    goals.state = DiscoveryState::Complete;
    goals.started_at = Some(at(1_000));
    goals.piles.must_have = vec!["travel".to_string(), "home".to_string()];
    goals.piles_completed_at = Some(at(2_000));
    goals.ranked = vec!["home".to_string(), "travel".to_string()];
    goals.ranked_completed_at = Some(at(3_000));
    goals.tradeoff_responses = vec![GoalTradeoff {
        goal_a: "home".to_string(),
        goal_b: "travel".to_string(),
        preferred: "home".to_string(),
    }];
    goals.tradeoffs_completed_at = Some(at(4_000));
    goals.derived = Some(GoalsSummary {
        top_priorities: vec!["home".to_string()],
        summary: None,
    });
    goals.completed_at = Some(at(5_000));
    goals
}

/// Memory backend that counts writes and can be told to fail them
#[derive(Debug, Clone, Default)]
pub struct CountingStore {
    inner: MemoryStore,
    writes: Arc<AtomicUsize>,
    fail_writes: Arc<AtomicBool>,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Successful and failed `set` calls so far
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }

    /// Underlying memory store, sharing state
    pub fn memory(&self) -> &MemoryStore {
        &self.inner
    }
}

#[async_trait]
impl KeyValueStore for CountingStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(format!("write to {key} refused")));
        }
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key).await
    }
}
