//! Deployment-target resolution
//!
//! Translates the declarative `{organizationalUnits, accounts,
//! excludedAccounts}` selector into a concrete, deduplicated set of account
//! ids. By this layer account existence has already been validated upstream,
//! so an unknown key is a configuration defect, never a skip.

use std::collections::HashSet;

use crate::error::{LandfallError, LandfallResult};
use crate::models::{AccountDirectory, DeploymentTarget, ROOT_OU};

/// Resolve a deployment target to account ids
///
/// The result is deduplicated by account key and preserves first-seen order,
/// because downstream allocation (suffix assignment in particular) depends on
/// a deterministic order. Exclusion always wins regardless of which inclusion
/// path produced the account.
pub fn resolve(
    target: &DeploymentTarget,
    directory: &AccountDirectory,
) -> LandfallResult<Vec<String>> {
    let keys = resolve_keys(target, directory)?;
    keys.into_iter()
        .map(|key| {
            directory
                .id(&key)
                .map(str::to_string)
                .ok_or(LandfallError::UnknownAccount { account_key: key })
        })
        .collect()
}

/// Resolve a deployment target to account keys
///
/// Same contract as [`resolve`], one mapping step earlier. The algorithm:
/// a `"Root"` OU includes every known account; any other OU includes every
/// account whose membership equals that name exactly (flattening of nested
/// hierarchies, if any, happened at configuration load); explicit accounts
/// are appended; exclusions are resolved the same way and subtracted.
pub fn resolve_keys(
    target: &DeploymentTarget,
    directory: &AccountDirectory,
) -> LandfallResult<Vec<String>> {
    let included = included_keys(target, directory)?;
    let excluded = excluded_keys(target, directory)?;
    Ok(included
        .into_iter()
        .filter(|key| !excluded.contains(key))
        .collect())
}

fn included_keys(
    target: &DeploymentTarget,
    directory: &AccountDirectory,
) -> LandfallResult<Vec<String>> {
    let mut seen = HashSet::new();
    let mut keys = Vec::new();
    let mut push = |key: &str| {
        if seen.insert(key.to_string()) {
            keys.push(key.to_string());
        }
    };

    if target.organizational_units.iter().any(|ou| ou == ROOT_OU) {
        for account in directory.accounts() {
            push(account.key());
        }
    } else {
        for ou in &target.organizational_units {
            if !directory.has_ou(ou) {
                return Err(LandfallError::UnknownOrganizationalUnit {
                    ou_key: ou.clone(),
                });
            }
            for account in directory.ou_members(ou) {
                push(account.key());
            }
        }
    }

    for key in &target.accounts {
        if directory.get(key).is_none() {
            return Err(LandfallError::UnknownAccount {
                account_key: key.clone(),
            });
        }
        push(key);
    }

    Ok(keys)
}

fn excluded_keys(
    target: &DeploymentTarget,
    directory: &AccountDirectory,
) -> LandfallResult<HashSet<String>> {
    target
        .excluded_accounts
        .iter()
        .map(|key| {
            if directory.get(key).is_none() {
                return Err(LandfallError::UnknownAccount {
                    account_key: key.clone(),
                });
            }
            Ok(key.clone())
        })
        .collect()
}
