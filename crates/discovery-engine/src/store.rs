//! Resident profile store
//!
//! Holds at most one profile in memory, bound to exactly one tenant.
//! Mutations are synchronous and mark the store dirty; [`persist`] and
//! [`switch_tenant`] are the only operations that touch storage on the
//! write path.
//!
//! ## Tenant switching
//!
//! A switch flushes the outgoing profile under the outgoing tenant's key
//! before anything of the incoming tenant is read. If that flush fails the
//! switch is aborted and the outgoing profile stays resident and dirty, so
//! nothing is lost and nothing leaks across tenants.
//!
//! Every method that mutates takes `&mut self`; wrap the store in
//! [`SharedProfileStore`] to serialize switches from concurrent callers.
//!
//! [`persist`]: ProfileStore::persist
//! [`switch_tenant`]: ProfileStore::switch_tenant

use crate::config::EngineConfig;
use crate::error::StoreError;
use crate::invalidation::PipelineOp;
use crate::sanitize::sanitize_object;
use crate::status::validate_transition;
use discovery_model::{timestamp, Profile, ProfileStatus, SectionName, Tenant};
use discovery_vault::{
    CorruptReason, EncryptedStorage, Envelope, KeyValueStore, NamespaceResolver, ProfileState,
    ReadOutcome, SessionKey, StorageError, StorageKey,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Store shared between tasks; the lock serializes tenant switches
pub type SharedProfileStore<S> = Arc<Mutex<ProfileStore<S>>>;

/// Pipeline steps reset to restore step ordering, by section
pub type HealedSteps = BTreeMap<SectionName, Vec<&'static str>>;

/// Where a resident profile came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadSource {
    /// Decoded from the tenant's namespace
    Restored,
    /// Namespace empty; a fresh profile was created
    Fresh,
    /// Namespace unreadable; a fresh profile was created in its place
    Recovered(RecoveryReason),
}

/// Why a stored profile was discarded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryReason {
    /// Blob failed to decrypt or decode
    Corrupt(CorruptReason),
    /// Client blob carried another owner's profile
    OwnerMismatch {
        /// Owner found in the blob
        found: String,
    },
}

/// Result of a tenant switch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchOutcome {
    /// Tenant now resident
    pub tenant: Tenant,
    /// How the incoming profile was obtained
    pub source: LoadSource,
    /// Whether the outgoing profile was written
    pub flushed: bool,
    /// Out-of-order steps reset in the incoming profile
    pub healed: HealedSteps,
}

/// Result of [`ProfileStore::restore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreOutcome {
    /// How the profile was obtained
    pub source: LoadSource,
    /// Out-of-order steps reset in the stored profile
    pub healed: HealedSteps,
}

/// Result of [`ProfileStore::persist`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    /// Resident profile written under this key
    Written(StorageKey),
    /// Nothing to write
    Clean,
}

/// What a section patch did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionUpdate {
    /// Keys merged into the section
    pub applied: Vec<String>,
    /// Keys that did not fit the section schema
    pub dropped: Vec<String>,
    /// Reserved keys removed before merging
    pub stripped: Vec<String>,
    /// Pipeline steps reset to restore step ordering
    pub healed: Vec<&'static str>,
}

impl SectionUpdate {
    /// Check if the patch changed nothing
    #[inline]
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Borrowed form of [`ProfileState`] for writing
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResidentState<'a> {
    current_profile: Option<&'a Profile>,
}

/// In-memory owner of the active profile
pub struct ProfileStore<S> {
    storage: EncryptedStorage<S>,
    resolver: NamespaceResolver,
    verify_ownership: bool,
    tenant: Tenant,
    resident: Option<Profile>,
    dirty: bool,
}

impl<S> std::fmt::Debug for ProfileStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileStore")
            .field("tenant", &self.tenant)
            .field("resident", &self.resident.as_ref().map(|p| p.id))
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

impl<S: KeyValueStore> ProfileStore<S> {
    /// Create an empty store for the consumer tenant
    ///
    /// # Errors
    /// [`StoreError::Namespace`] for an invalid namespace layout
    pub fn new(backend: S, key: &SessionKey, config: &EngineConfig) -> Result<Self, StoreError> {
        Ok(Self {
            storage: EncryptedStorage::new(backend, key),
            resolver: config.resolver()?,
            verify_ownership: config.verify_ownership,
            tenant: Tenant::Consumer,
            resident: None,
            dirty: false,
        })
    }

    /// Wrap for sharing between tasks
    #[must_use]
    pub fn shared(self) -> SharedProfileStore<S> {
        Arc::new(Mutex::new(self))
    }

    /// Resident profile
    #[inline]
    #[must_use]
    pub fn profile(&self) -> Option<&Profile> {
        self.resident.as_ref()
    }

    /// Tenant the resident profile belongs to
    #[inline]
    #[must_use]
    pub fn tenant(&self) -> &Tenant {
        &self.tenant
    }

    /// Check for unsaved changes
    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Encrypted storage this store writes through
    #[inline]
    #[must_use]
    pub fn storage(&self) -> &EncryptedStorage<S> {
        &self.storage
    }

    /// Storage key of the current tenant
    #[must_use]
    pub fn storage_key(&self) -> StorageKey {
        self.resolver.resolve(&self.tenant)
    }

    /// Per-section progress of the resident profile
    #[must_use]
    pub fn section_progress(&self) -> Option<BTreeMap<SectionName, f64>> {
        self.resident.as_ref().map(Profile::progress_by_section)
    }

    /// Replace the resident profile with a fresh one
    ///
    /// A profile that has never been written is dirty. While a client tenant
    /// is current the profile is always owned by that client, whatever
    /// `owner_id` says.
    pub fn initialize(&mut self, owner_id: impl Into<String>) -> &Profile {
        let mut owner_id = owner_id.into();
        if let Some(id) = self.tenant.client_id() {
            if owner_id != id.as_str() {
                tracing::warn!(tenant = %self.tenant, requested = %owner_id, "client profile owner forced to client id");
                owner_id = id.as_str().to_string();
            }
        }
        let profile = Profile::new(owner_id, timestamp::now());
        tracing::info!(tenant = %self.tenant, profile = %profile.id, "initialized profile");
        self.dirty = true;
        self.resident.insert(profile)
    }

    /// Make `profile` resident
    ///
    /// Pipeline sections that break step ordering are healed first. The
    /// store is clean unless something was healed.
    pub fn load(&mut self, mut profile: Profile) -> HealedSteps {
        let healed = heal(&mut profile);
        tracing::debug!(tenant = %self.tenant, profile = %profile.id, ?healed, "loaded profile");
        self.resident = Some(profile);
        self.dirty = !healed.is_empty();
        healed
    }

    /// Shallow-merge a patch into one section
    ///
    /// Reserved keys are stripped first. Keys whose values do not fit the
    /// section schema are dropped and reported; the rest are applied. A
    /// patch to a pipeline section that breaks step ordering is healed by
    /// resetting the out-of-order steps; one that leaves answers behind
    /// moves the section in progress.
    ///
    /// # Errors
    /// - [`StoreError::PatchNotObject`] if `patch` is not an object
    /// - [`StoreError::NoResidentProfile`] if nothing is resident
    pub fn update_section(
        &mut self,
        section: SectionName,
        patch: Value,
    ) -> Result<SectionUpdate, StoreError> {
        let Value::Object(patch) = patch else {
            return Err(StoreError::PatchNotObject(section));
        };
        let profile = self.resident.as_ref().ok_or(StoreError::NoResidentProfile)?;

        let (patch, stripped) = sanitize_object(patch);
        if !stripped.is_empty() {
            tracing::warn!(%section, ?stripped, "stripped reserved keys from patch");
        }

        let mut merged = match profile.section_value(section)? {
            Value::Object(object) => object,
            _ => Map::new(),
        };
        let mut scratch = profile.clone();
        let mut update = SectionUpdate {
            stripped,
            ..SectionUpdate::default()
        };
        for (key, value) in patch {
            if !section.has_field(&key) {
                tracing::debug!(%section, %key, "dropping unknown patch key");
                update.dropped.push(key);
                continue;
            }
            let mut trial = merged.clone();
            trial.insert(key.clone(), value);
            match scratch.replace_section_value(section, Value::Object(trial.clone())) {
                Ok(()) => {
                    merged = trial;
                    update.applied.push(key);
                }
                Err(e) => {
                    tracing::debug!(%section, %key, error = %e, "dropping patch key");
                    update.dropped.push(key);
                }
            }
        }

        if update.is_noop() {
            return Ok(update);
        }

        let now = timestamp::now();
        if section.is_pipeline() {
            update.healed = PipelineOp::Normalize.apply(&mut scratch, section)?;
            if !update.healed.is_empty() {
                tracing::info!(%section, healed = ?update.healed, "reset out-of-order steps");
            }
            if update.applied.iter().any(|key| key != "state") {
                PipelineOp::Start(now).apply(&mut scratch, section)?;
            }
        }
        if scratch.status == ProfileStatus::NotStarted {
            scratch.status = ProfileStatus::InProgress;
        }
        scratch.touch(now);
        self.resident = Some(scratch);
        self.dirty = true;
        Ok(update)
    }

    /// Reset every pipeline step after `step` in `section`
    ///
    /// Returns the tokens of the steps that were reset.
    ///
    /// # Errors
    /// - [`StoreError::NoResidentProfile`] if nothing is resident
    /// - [`StoreError::Invalidation`] for an unknown step or a section
    ///   without a pipeline
    pub fn invalidate_from(
        &mut self,
        section: SectionName,
        step: &str,
    ) -> Result<Vec<&'static str>, StoreError> {
        let reset = self.apply_pipeline(section, PipelineOp::InvalidateFrom(step))?;
        tracing::debug!(%section, %step, ?reset, "invalidated downstream steps");
        Ok(reset)
    }

    /// Stamp one pipeline step complete
    ///
    /// # Errors
    /// As [`invalidate_from`](Self::invalidate_from), plus
    /// [`InvalidationError::UpstreamIncomplete`](crate::InvalidationError)
    pub fn complete_step(&mut self, section: SectionName, step: &str) -> Result<(), StoreError> {
        self.apply_pipeline(section, PipelineOp::CompleteStep(step, timestamp::now()))?;
        Ok(())
    }

    /// Mark a pipeline section complete
    ///
    /// # Errors
    /// As [`complete_step`](Self::complete_step)
    pub fn complete_section(&mut self, section: SectionName) -> Result<(), StoreError> {
        self.apply_pipeline(section, PipelineOp::CompleteSection(timestamp::now()))?;
        tracing::info!(%section, "section complete");
        Ok(())
    }

    /// Reset every step of a pipeline section
    ///
    /// # Errors
    /// As [`invalidate_from`](Self::invalidate_from)
    pub fn reset_section(&mut self, section: SectionName) -> Result<(), StoreError> {
        self.apply_pipeline(section, PipelineOp::ResetAll)?;
        Ok(())
    }

    fn apply_pipeline(
        &mut self,
        section: SectionName,
        op: PipelineOp<'_>,
    ) -> Result<Vec<&'static str>, StoreError> {
        let profile = self.resident.as_mut().ok_or(StoreError::NoResidentProfile)?;
        let reset = op.apply(profile, section)?;
        profile.touch(timestamp::now());
        self.dirty = true;
        Ok(reset)
    }

    /// Move the profile status forward
    ///
    /// # Errors
    /// - [`StoreError::NoResidentProfile`] if nothing is resident
    /// - [`StoreError::Status`] for a backward move
    pub fn update_status(&mut self, status: ProfileStatus) -> Result<(), StoreError> {
        let profile = self.resident.as_mut().ok_or(StoreError::NoResidentProfile)?;
        validate_transition(profile.status, status)?;
        if profile.status == status {
            return Ok(());
        }
        tracing::info!(from = ?profile.status, to = ?status, "profile status changed");
        profile.status = status;
        profile.touch(timestamp::now());
        self.dirty = true;
        Ok(())
    }

    /// Replace the advisor notes
    ///
    /// # Errors
    /// [`StoreError::NoResidentProfile`] if nothing is resident
    pub fn update_notes(&mut self, notes: impl Into<String>) -> Result<(), StoreError> {
        let profile = self.resident.as_mut().ok_or(StoreError::NoResidentProfile)?;
        profile.advisor_notes = notes.into();
        profile.touch(timestamp::now());
        self.dirty = true;
        Ok(())
    }

    /// Acknowledge an external save
    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    /// Drop the resident profile and return to the consumer tenant
    ///
    /// Storage is not touched.
    pub fn clear(&mut self) {
        tracing::info!(tenant = %self.tenant, "cleared resident profile");
        self.resident = None;
        self.dirty = false;
        self.tenant = Tenant::Consumer;
    }

    /// Write the resident profile if dirty
    ///
    /// A second call with no mutation in between writes nothing. On failure
    /// the store stays dirty.
    ///
    /// # Errors
    /// [`StoreError::Storage`] if the write fails
    pub async fn persist(&mut self) -> Result<PersistOutcome, StoreError> {
        Ok(self.flush().await?)
    }

    async fn flush(&mut self) -> Result<PersistOutcome, StorageError> {
        let Some(profile) = self.resident.as_ref().filter(|_| self.dirty) else {
            return Ok(PersistOutcome::Clean);
        };
        let key = self.resolver.resolve(&self.tenant);
        let envelope = Envelope::new(ResidentState {
            current_profile: Some(profile),
        });
        if let Err(e) = self.storage.write_json(&key, &envelope).await {
            tracing::warn!(tenant = %self.tenant, error = %e, "persist failed; profile stays dirty");
            return Err(e);
        }
        self.dirty = false;
        tracing::debug!(tenant = %self.tenant, key = %key, "persisted profile");
        Ok(PersistOutcome::Written(key))
    }

    /// Flush the outgoing tenant, then make `target` resident
    ///
    /// # Errors
    /// - [`StoreError::FlushFailed`] if the outgoing profile could not be
    ///   written; nothing changed
    /// - [`StoreError::Storage`] if the incoming namespace could not be
    ///   read; the outgoing profile stays resident
    pub async fn switch_tenant(&mut self, target: Tenant) -> Result<SwitchOutcome, StoreError> {
        let flushed = match self.flush().await {
            Ok(outcome) => matches!(outcome, PersistOutcome::Written(_)),
            Err(source) => {
                return Err(StoreError::FlushFailed {
                    tenant: self.tenant.clone(),
                    source,
                });
            }
        };

        let (profile, source, healed) = self.read_namespace(&target).await?;
        tracing::info!(from = %self.tenant, to = %target, ?source, flushed, "switched tenant");
        self.dirty = source != LoadSource::Restored || !healed.is_empty();
        self.resident = Some(profile);
        self.tenant = target.clone();
        Ok(SwitchOutcome {
            tenant: target,
            source,
            flushed,
            healed,
        })
    }

    /// Reload the current tenant from storage
    ///
    /// # Errors
    /// - [`StoreError::UnsavedChanges`] if the resident profile is dirty
    /// - [`StoreError::Storage`] if the namespace could not be read
    pub async fn restore(&mut self) -> Result<RestoreOutcome, StoreError> {
        if self.dirty {
            return Err(StoreError::UnsavedChanges(self.tenant.clone()));
        }
        let tenant = self.tenant.clone();
        let (profile, source, healed) = self.read_namespace(&tenant).await?;
        self.dirty = source != LoadSource::Restored || !healed.is_empty();
        self.resident = Some(profile);
        Ok(RestoreOutcome { source, healed })
    }

    /// Delete a tenant's stored profile
    ///
    /// Purging the current tenant also drops the resident profile.
    ///
    /// # Errors
    /// [`StoreError::Storage`] if the delete fails
    pub async fn purge_tenant(&mut self, tenant: &Tenant) -> Result<(), StoreError> {
        let key = self.resolver.resolve(tenant);
        self.storage.remove(&key).await?;
        if *tenant == self.tenant {
            self.resident = None;
            self.dirty = false;
        }
        tracing::info!(%tenant, "purged stored profile");
        Ok(())
    }

    async fn read_namespace(
        &self,
        tenant: &Tenant,
    ) -> Result<(Profile, LoadSource, HealedSteps), StoreError> {
        let key = self.resolver.resolve(tenant);
        let outcome = self
            .storage
            .read_json::<Envelope<ProfileState>>(&key)
            .await?;
        let fresh = || Profile::new(tenant.owner_id(), timestamp::now());

        let (mut profile, source) = match outcome {
            ReadOutcome::Loaded(Envelope {
                state:
                    ProfileState {
                        current_profile: Some(profile),
                    },
                ..
            }) => match tenant.client_id() {
                Some(id) if self.verify_ownership && profile.owner_id != id.as_str() => {
                    tracing::warn!(%tenant, found = %profile.owner_id, "stored profile belongs to another owner");
                    let reason = RecoveryReason::OwnerMismatch {
                        found: profile.owner_id,
                    };
                    (fresh(), LoadSource::Recovered(reason))
                }
                _ => (profile, LoadSource::Restored),
            },
            ReadOutcome::Loaded(_) | ReadOutcome::NotFound => (fresh(), LoadSource::Fresh),
            ReadOutcome::Corrupt(reason) => {
                tracing::debug!(%tenant, %reason, "starting fresh over unreadable profile");
                (fresh(), LoadSource::Recovered(RecoveryReason::Corrupt(reason)))
            }
        };
        let healed = heal(&mut profile);
        if !healed.is_empty() {
            tracing::warn!(%tenant, ?healed, "stored profile broke step ordering");
        }
        Ok((profile, source, healed))
    }
}

/// Normalize every pipeline section of `profile`
fn heal(profile: &mut Profile) -> HealedSteps {
    SectionName::ALL
        .into_iter()
        .filter(|section| section.is_pipeline())
        .filter_map(|section| match PipelineOp::Normalize.apply(profile, section) {
            Ok(reset) if !reset.is_empty() => Some((section, reset)),
            _ => None,
        })
        .collect()
}
