//! Structured output ledger
//!
//! Append-mostly record store connecting phases that are never linked at
//! build time: a later phase discovers identifiers produced by an earlier
//! phase by querying here instead of referencing it directly. The ledger is a
//! durable artifact — an external driver persists the records between process
//! invocations and re-supplies them on re-runs — so payloads are validated
//! against their declared shape at read time as well as write time.

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{LandfallError, LandfallResult};
use crate::phase::PhaseId;
use crate::registry::DeploymentUnit;

/// A typed payload stored in the ledger
///
/// `KIND` is the tag that selects the payload's schema; records are stored as
/// JSON and re-validated against the implementing type on every read, so
/// schema drift across code versions is caught instead of misinterpreted.
pub trait OutputPayload: Serialize + DeserializeOwned {
    const KIND: &'static str;
}

/// One produced artifact: who produced it, where, in which phase, and what
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputRecord {
    pub account_key: String,
    pub region: String,
    pub phase: PhaseId,
    /// Payload kind tag, see [`OutputPayload::KIND`]
    pub kind: String,
    pub value: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

/// Narrowing filter for ledger queries
///
/// The payload kind is fixed by the query's type parameter; the filter only
/// narrows by producer.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputFilter<'a> {
    pub account_key: Option<&'a str>,
    pub region: Option<&'a str>,
}

impl<'a> OutputFilter<'a> {
    pub fn account(account_key: &'a str) -> Self {
        Self {
            account_key: Some(account_key),
            ..Self::default()
        }
    }

    pub fn account_and_region(account_key: &'a str, region: &'a str) -> Self {
        Self {
            account_key: Some(account_key),
            region: Some(region),
        }
    }

    fn matches(&self, record: &OutputRecord) -> bool {
        if let Some(account_key) = self.account_key {
            if record.account_key != account_key {
                return false;
            }
        }
        if let Some(region) = self.region {
            if record.region != region {
                return false;
            }
        }
        true
    }
}

/// The run's output record collection
///
/// Shared mutable state for the duration of a run: emits append under a write
/// lock, queries take a read lock. Re-emitting a record that already exists
/// from a prior partial run is a no-op, which keeps re-runs idempotent.
#[derive(Debug, Default)]
pub struct OutputLedger {
    records: RwLock<Vec<OutputRecord>>,
}

impl OutputLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from a prior run's records
    pub fn from_records(records: Vec<OutputRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    /// Parse a ledger from its persisted JSON form
    pub fn from_json(json: &str) -> LandfallResult<Self> {
        let records: Vec<OutputRecord> =
            serde_json::from_str(json).map_err(LandfallError::Ledger)?;
        Ok(Self::from_records(records))
    }

    /// Serialize all records for persistence by the external driver
    pub fn to_json(&self) -> LandfallResult<String> {
        let records = self.records.read().expect("ledger lock poisoned");
        serde_json::to_string_pretty(&*records).map_err(LandfallError::Ledger)
    }

    /// Append one produced artifact
    ///
    /// Validates the payload by serializing it, tags the record with the
    /// producing unit's identity and phase, and skips the append entirely
    /// when an identical record already exists.
    pub fn emit<P: OutputPayload>(
        &self,
        unit: &DeploymentUnit,
        payload: &P,
    ) -> LandfallResult<()> {
        let value = serde_json::to_value(payload).map_err(LandfallError::Serialize)?;
        let mut records = self.records.write().expect("ledger lock poisoned");
        let duplicate = records.iter().any(|r| {
            r.account_key == unit.account_key
                && r.region == unit.region
                && r.kind == P::KIND
                && r.value == value
        });
        if duplicate {
            tracing::debug!(
                account = %unit.account_key,
                region = %unit.region,
                kind = P::KIND,
                "output already recorded, skipping"
            );
            return Ok(());
        }
        records.push(OutputRecord {
            account_key: unit.account_key.clone(),
            region: unit.region.clone(),
            phase: unit.phase,
            kind: P::KIND.to_string(),
            value,
            recorded_at: Utc::now(),
        });
        Ok(())
    }

    /// All matching payloads, in emit order
    ///
    /// Every hit is validated against `P`'s declared shape; a record whose
    /// payload no longer parses is an error, never a silent misread.
    pub fn find_all<P: OutputPayload>(&self, filter: OutputFilter<'_>) -> LandfallResult<Vec<P>> {
        self.find_all_before::<P>(filter, None)
    }

    /// Exactly-one variant: errors when nothing matches
    ///
    /// For values an earlier phase is contractually guaranteed to have
    /// produced.
    pub fn find_one<P: OutputPayload>(&self, filter: OutputFilter<'_>) -> LandfallResult<P> {
        self.find_one_before(filter, None)
    }

    /// At-most-one variant: `None` on zero matches
    ///
    /// More than one match logs a warning and returns the first rather than
    /// aborting, preserving forward progress for non-critical lookups.
    pub fn try_find_one<P: OutputPayload>(
        &self,
        filter: OutputFilter<'_>,
    ) -> LandfallResult<Option<P>> {
        self.try_find_one_before(filter, None)
    }

    /// Snapshot of all records in emit order
    pub fn records(&self) -> Vec<OutputRecord> {
        self.records.read().expect("ledger lock poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.records.read().expect("ledger lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn find_one_before<P: OutputPayload>(
        &self,
        filter: OutputFilter<'_>,
        before: Option<PhaseId>,
    ) -> LandfallResult<P> {
        self.try_find_one_before(filter, before)?
            .ok_or_else(|| LandfallError::MissingPrerequisite {
                kind: P::KIND.to_string(),
                account_key: filter.account_key.map(str::to_string),
                region: filter.region.map(str::to_string),
            })
    }

    pub(crate) fn try_find_one_before<P: OutputPayload>(
        &self,
        filter: OutputFilter<'_>,
        before: Option<PhaseId>,
    ) -> LandfallResult<Option<P>> {
        let mut all = self.find_all_before::<P>(filter, before)?;
        if all.len() > 1 {
            tracing::warn!(
                kind = P::KIND,
                account = ?filter.account_key,
                region = ?filter.region,
                matches = all.len(),
                "expected at most one output, using the first"
            );
        }
        Ok(if all.is_empty() {
            None
        } else {
            Some(all.swap_remove(0))
        })
    }

    /// `find_all` restricted to records from phases strictly before `before`
    ///
    /// This is the read surface the phase runner hands to steps: phase N only
    /// ever observes outputs of phases < N, never a sibling's.
    pub(crate) fn find_all_before<P: OutputPayload>(
        &self,
        filter: OutputFilter<'_>,
        before: Option<PhaseId>,
    ) -> LandfallResult<Vec<P>> {
        let records = self.records.read().expect("ledger lock poisoned");
        records
            .iter()
            .filter(|r| r.kind == P::KIND)
            .filter(|r| before.map_or(true, |phase| r.phase < phase))
            .filter(|r| filter.matches(r))
            .map(|r| {
                serde_json::from_value(r.value.clone()).map_err(|source| {
                    LandfallError::PayloadShape {
                        kind: r.kind.clone(),
                        account_key: r.account_key.clone(),
                        region: r.region.clone(),
                        source,
                    }
                })
            })
            .collect()
    }
}
