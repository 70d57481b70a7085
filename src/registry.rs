//! Deployment-unit registry
//!
//! Tracks the per-account/per-region deployment units of a single phase.
//! Every account can have at most one unit per (region, suffix) and the
//! registry hands out the same `Arc` handle on repeated requests, so leaf
//! provisioning logic can be re-entered after a partial run without creating
//! duplicates.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::{LandfallError, LandfallResult};
use crate::models::AccountDirectory;
use crate::naming::{unit_logical_id, unit_name};
use crate::phase::PhaseId;

/// Identity key of a deployment unit within one phase
type UnitKey = (String, String, Option<String>);

/// The handle under which one phase provisions resources for one
/// account/region
///
/// A unit is a pure identity: the external `name` (persisted, must never
/// silently change) and the internal `logical_id` (addressing only) are both
/// derived from the identity tuple. All resource mutation happens in leaf
/// logic holding this handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentUnit {
    pub account_key: String,
    pub account_id: String,
    pub region: String,
    pub phase: PhaseId,
    pub suffix: Option<String>,
    /// Externally visible name of the unit
    pub name: String,
    /// Internal addressing id, distinct from the name
    pub logical_id: String,
}

/// Options for constructing a [`DeploymentUnitRegistry`]
#[derive(Debug, Clone)]
pub struct RegistryOptions {
    /// Prefix prepended to every unit name, e.g. `"Accel-"`
    pub prefix: String,
    /// Region used when a caller does not specify one; also omitted from
    /// logical ids
    pub default_region: String,
}

/// Get-or-create registry for the deployment units of one phase
///
/// The identity map is shared mutable state for the duration of a run, so
/// creation is serialized per registry: concurrent `get_or_create` calls for
/// the same tuple observe exactly one insertion. The registry is passed by
/// reference into every step rather than living in a process-wide global, so
/// independent runs (including tests) never cross-contaminate.
pub struct DeploymentUnitRegistry {
    phase: PhaseId,
    options: RegistryOptions,
    directory: Arc<AccountDirectory>,
    units: Mutex<UnitMap>,
}

#[derive(Default)]
struct UnitMap {
    by_identity: HashMap<UnitKey, Arc<DeploymentUnit>>,
    /// Reverse index used to detect naming collisions between identities.
    /// Names are scoped per region, so the key carries both.
    by_name: HashMap<(String, String), UnitKey>,
    /// Insertion order, preserved for deterministic snapshots
    order: Vec<UnitKey>,
}

impl DeploymentUnitRegistry {
    pub fn new(phase: PhaseId, directory: Arc<AccountDirectory>, options: RegistryOptions) -> Self {
        Self {
            phase,
            options,
            directory,
            units: Mutex::new(UnitMap::default()),
        }
    }

    pub fn phase(&self) -> PhaseId {
        self.phase
    }

    /// Get the existing unit for the identity or create it
    ///
    /// Returns `Ok(None)` when the account key is absent from the directory:
    /// many optional steps legitimately skip accounts that are not part of a
    /// given stage. A naming collision is a defect and is returned as an
    /// error from both variants.
    pub fn try_get_or_create(
        &self,
        account_key: &str,
        region: Option<&str>,
        suffix: Option<&str>,
    ) -> LandfallResult<Option<Arc<DeploymentUnit>>> {
        let region = region.unwrap_or(&self.options.default_region);
        let key: UnitKey = (
            account_key.to_string(),
            region.to_string(),
            suffix.map(str::to_string),
        );

        let mut units = self.units.lock().expect("registry mutex poisoned");
        if let Some(existing) = units.by_identity.get(&key) {
            return Ok(Some(Arc::clone(existing)));
        }

        let Some(account) = self.directory.get(account_key) else {
            return Ok(None);
        };

        let name = unit_name(&self.options.prefix, account_key, self.phase, suffix);
        let logical_id = unit_logical_id(
            account_key,
            self.phase,
            region,
            &self.options.default_region,
            suffix,
        );

        let name_key = (name.clone(), region.to_string());
        if let Some((existing_account, ..)) = units.by_name.get(&name_key).cloned() {
            return Err(LandfallError::NamingCollision {
                name,
                existing: existing_account,
                requested: account_key.to_string(),
            });
        }

        let unit = Arc::new(DeploymentUnit {
            account_key: account_key.to_string(),
            account_id: account.provisioning_id().to_string(),
            region: region.to_string(),
            phase: self.phase,
            suffix: suffix.map(str::to_string),
            name,
            logical_id,
        });
        tracing::debug!(
            account = account_key,
            region,
            name = %unit.name,
            "registered deployment unit"
        );
        units.by_name.insert(name_key, key.clone());
        units.by_identity.insert(key.clone(), Arc::clone(&unit));
        units.order.push(key);
        Ok(Some(unit))
    }

    /// Mandatory variant of [`Self::try_get_or_create`]
    ///
    /// For steps that cannot proceed without the account: a missing account
    /// is a descriptive error instead of a skip.
    pub fn get_or_create(
        &self,
        account_key: &str,
        region: Option<&str>,
        suffix: Option<&str>,
    ) -> LandfallResult<Arc<DeploymentUnit>> {
        self.try_get_or_create(account_key, region, suffix)?
            .ok_or_else(|| LandfallError::UnknownAccount {
                account_key: account_key.to_string(),
            })
    }

    /// Pre-register a unit for every known account in each given region
    ///
    /// Drivers use this so downstream consumers observe the complete unit
    /// set up front, including units no step of this phase touches. Returns
    /// the number of units registered.
    pub fn preregister(&self, regions: &[&str]) -> LandfallResult<usize> {
        let keys: Vec<String> = self
            .directory
            .accounts()
            .iter()
            .map(|a| a.key().to_string())
            .collect();
        let before = self.len();
        for key in &keys {
            for region in regions {
                self.try_get_or_create(key, Some(region), None)?;
            }
        }
        Ok(self.len() - before)
    }

    /// Snapshot of all units in creation order
    pub fn units(&self) -> Vec<Arc<DeploymentUnit>> {
        let units = self.units.lock().expect("registry mutex poisoned");
        units
            .order
            .iter()
            .map(|key| Arc::clone(&units.by_identity[key]))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.units.lock().expect("registry mutex poisoned").order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
