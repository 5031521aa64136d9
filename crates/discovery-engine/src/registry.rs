//! Advisor client registry
//!
//! The advisor's list of clients, kept in insertion order and persisted as
//! one encrypted blob outside every profile namespace. Each entry caches
//! per-section progress so the client list can show completion without
//! decrypting every profile.

use crate::error::RegistryError;
use discovery_model::{timestamp, ClientId, Profile, SectionName, Timestamp};
use discovery_vault::{EncryptedStorage, Envelope, KeyValueStore, ReadOutcome, StorageKey};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sections that count toward a client's completion
pub const TRACKED_SECTIONS: [SectionName; 5] = [
    SectionName::BasicContext,
    SectionName::RetirementVision,
    SectionName::PlanningPreferences,
    SectionName::RiskComfort,
    SectionName::FinancialSnapshot,
];

/// Client lifecycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    /// Added, nothing answered yet
    #[default]
    Pending,
    /// Some progress recorded
    Active,
    /// Every tracked section complete
    Completed,
    /// Hidden from the active list
    Archived,
}

/// One registry entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub status: ClientStatus,
    /// Cached progress per section, each in `[0, 1]`
    #[serde(default)]
    pub progress: BTreeMap<SectionName, f64>,
    #[serde(with = "timestamp")]
    pub created_at: Timestamp,
    #[serde(with = "timestamp")]
    pub updated_at: Timestamp,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<Timestamp>,
}

impl Client {
    /// Mean progress over [`TRACKED_SECTIONS`]
    #[must_use]
    pub fn profile_completion(&self) -> f64 {
        let total: f64 = TRACKED_SECTIONS
            .iter()
            .map(|section| self.progress.get(section).copied().unwrap_or(0.0))
            .sum();
        total / TRACKED_SECTIONS.len() as f64
    }

    /// Check if archived
    #[inline]
    #[must_use]
    pub fn is_archived(&self) -> bool {
        self.status == ClientStatus::Archived
    }
}

/// Input for [`ClientRegistry::add_client`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewClient {
    /// Explicit id; generated when absent
    pub id: Option<ClientId>,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl NewClient {
    /// Client with a name and nothing else
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// With explicit id
    #[inline]
    #[must_use]
    pub fn with_id(mut self, id: impl Into<ClientId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// With email
    #[inline]
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// With phone
    #[inline]
    #[must_use]
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }
}

/// Field changes for [`ClientRegistry::update_client`]; `None` keeps the field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: Option<ClientStatus>,
}

/// Persisted registry shape
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistryState {
    #[serde(default)]
    clients: Vec<Client>,
}

/// Status implied by progress
///
/// Archived clients stay archived and a status never moves back
/// automatically.
#[must_use]
pub fn derive_status(current: ClientStatus, progress: &BTreeMap<SectionName, f64>) -> ClientStatus {
    if current == ClientStatus::Archived {
        return current;
    }
    let all_done = TRACKED_SECTIONS
        .iter()
        .all(|section| progress.get(section).is_some_and(|p| *p >= 1.0));
    if all_done {
        ClientStatus::Completed
    } else if current == ClientStatus::Pending && progress.values().any(|p| *p > 0.0) {
        ClientStatus::Active
    } else {
        current
    }
}

/// Ordered client registry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientRegistry {
    clients: IndexMap<ClientId, Client>,
}

impl ClientRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of clients, archived included
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Look up one client
    #[inline]
    #[must_use]
    pub fn get(&self, id: &ClientId) -> Option<&Client> {
        self.clients.get(id)
    }

    /// Non-archived clients in insertion order
    pub fn clients(&self) -> impl Iterator<Item = &Client> {
        self.clients.values().filter(|client| !client.is_archived())
    }

    /// Every client in insertion order
    pub fn all_clients(&self) -> impl Iterator<Item = &Client> {
        self.clients.values()
    }

    /// Add a client
    ///
    /// # Errors
    /// - [`RegistryError::EmptyName`] for a blank name
    /// - [`RegistryError::DuplicateClient`] if the id is taken
    pub fn add_client(&mut self, new: NewClient) -> Result<ClientId, RegistryError> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        let id = new.id.unwrap_or_else(ClientId::generate);
        if self.clients.contains_key(&id) {
            return Err(RegistryError::DuplicateClient(id));
        }

        let now = timestamp::now();
        let client = Client {
            id: id.clone(),
            name: name.to_string(),
            email: new.email,
            phone: new.phone,
            status: ClientStatus::Pending,
            progress: BTreeMap::new(),
            created_at: now,
            updated_at: now,
            archived_at: None,
        };
        self.clients.insert(id.clone(), client);
        tracing::info!(client = %id, "added client");
        Ok(id)
    }

    /// Change contact fields or status
    ///
    /// # Errors
    /// - [`RegistryError::UnknownClient`] for an unknown id
    /// - [`RegistryError::EmptyName`] for a blank new name
    pub fn update_client(&mut self, id: &ClientId, update: ClientUpdate) -> Result<(), RegistryError> {
        let client = self.entry(id)?;
        if let Some(name) = update.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(RegistryError::EmptyName);
            }
            client.name = name.to_string();
        }
        if let Some(email) = update.email {
            client.email = Some(email);
        }
        if let Some(phone) = update.phone {
            client.phone = Some(phone);
        }
        if let Some(status) = update.status {
            client.status = status;
            client.archived_at = (status == ClientStatus::Archived).then(timestamp::now);
        }
        client.updated_at = timestamp::now();
        Ok(())
    }

    /// Record progress for one section, clamped to `[0, 1]`
    ///
    /// # Errors
    /// [`RegistryError::UnknownClient`] for an unknown id
    pub fn update_progress(
        &mut self,
        id: &ClientId,
        section: SectionName,
        progress: f64,
    ) -> Result<(), RegistryError> {
        let client = self.entry(id)?;
        let progress = if progress.is_nan() {
            0.0
        } else {
            progress.clamp(0.0, 1.0)
        };
        client.progress.insert(section, progress);
        client.status = derive_status(client.status, &client.progress);
        client.updated_at = timestamp::now();
        Ok(())
    }

    /// Refresh cached progress from a client's profile
    ///
    /// # Errors
    /// [`RegistryError::UnknownClient`] for an unknown id
    pub fn sync_from_profile(&mut self, id: &ClientId, profile: &Profile) -> Result<(), RegistryError> {
        let client = self.entry(id)?;
        client.progress = profile.progress_by_section();
        client.status = derive_status(client.status, &client.progress);
        client.updated_at = timestamp::now();
        tracing::debug!(client = %id, completion = client.profile_completion(), "synced progress");
        Ok(())
    }

    /// Hide a client from the active list
    ///
    /// # Errors
    /// [`RegistryError::UnknownClient`] for an unknown id
    pub fn archive_client(&mut self, id: &ClientId) -> Result<(), RegistryError> {
        let client = self.entry(id)?;
        if client.is_archived() {
            return Ok(());
        }
        let now = timestamp::now();
        client.status = ClientStatus::Archived;
        client.archived_at = Some(now);
        client.updated_at = now;
        tracing::info!(client = %id, "archived client");
        Ok(())
    }

    /// Bring an archived client back, with status re-derived from progress
    ///
    /// # Errors
    /// [`RegistryError::UnknownClient`] for an unknown id
    pub fn restore_client(&mut self, id: &ClientId) -> Result<(), RegistryError> {
        let client = self.entry(id)?;
        if !client.is_archived() {
            return Ok(());
        }
        client.status = derive_status(ClientStatus::Pending, &client.progress);
        client.archived_at = None;
        client.updated_at = timestamp::now();
        Ok(())
    }

    /// Remove a client; the rest keep their order
    ///
    /// The client's stored profile is not touched; purge it through the
    /// profile store.
    ///
    /// # Errors
    /// [`RegistryError::UnknownClient`] for an unknown id
    pub fn delete_client(&mut self, id: &ClientId) -> Result<Client, RegistryError> {
        let removed = self
            .clients
            .shift_remove(id)
            .ok_or_else(|| RegistryError::UnknownClient(id.clone()))?;
        tracing::info!(client = %id, "deleted client");
        Ok(removed)
    }

    fn entry(&mut self, id: &ClientId) -> Result<&mut Client, RegistryError> {
        self.clients
            .get_mut(id)
            .ok_or_else(|| RegistryError::UnknownClient(id.clone()))
    }

    /// Write the registry under `key`
    ///
    /// # Errors
    /// [`RegistryError::Storage`] if the write fails
    pub async fn save<S: KeyValueStore>(
        &self,
        storage: &EncryptedStorage<S>,
        key: &StorageKey,
    ) -> Result<(), RegistryError> {
        let state = RegistryState {
            clients: self.clients.values().cloned().collect(),
        };
        storage.write_json(key, &Envelope::new(state)).await?;
        tracing::debug!(key = %key, clients = self.clients.len(), "saved client registry");
        Ok(())
    }

    /// Read the registry at `key`; missing or unreadable blobs give an
    /// empty registry
    ///
    /// # Errors
    /// [`RegistryError::Storage`] if the backend read fails
    pub async fn load<S: KeyValueStore>(
        storage: &EncryptedStorage<S>,
        key: &StorageKey,
    ) -> Result<Self, RegistryError> {
        let state = match storage.read_json::<Envelope<RegistryState>>(key).await? {
            ReadOutcome::Loaded(envelope) => envelope.state,
            ReadOutcome::NotFound => RegistryState::default(),
            ReadOutcome::Corrupt(reason) => {
                tracing::warn!(key = %key, %reason, "client registry unreadable; starting empty");
                RegistryState::default()
            }
        };
        let clients = state
            .clients
            .into_iter()
            .map(|client| (client.id.clone(), client))
            .collect();
        Ok(Self { clients })
    }
}
