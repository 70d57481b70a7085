//! Deterministic naming for deployment units
//!
//! The external name and the internal logical id are pure functions of the
//! unit identity. The name is externally visible and persisted: changing the
//! scheme is equivalent to destroying and recreating the underlying
//! infrastructure. The logical id only affects internal addressing and is
//! deliberately kept distinct.

use sha2::{Digest, Sha256};

use crate::phase::PhaseId;

/// Upper bound on external names, matching the provisioning backend's limit
pub const MAX_NAME_LEN: usize = 128;

/// Length of the content-hash tail appended when folding long names
const FOLD_HASH_LEN: usize = 8;

/// Normalize a key into a PascalCase identifier fragment
///
/// Splits on every non-alphanumeric character and capitalizes each segment;
/// characters outside `[A-Za-z0-9]` never survive. `"shared-network"` and
/// `"shared_network"` both normalize to `"SharedNetwork"`.
pub fn pascal_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut at_boundary = true;
    for ch in input.chars() {
        if !ch.is_ascii_alphanumeric() {
            at_boundary = true;
            continue;
        }
        if at_boundary {
            out.extend(ch.to_uppercase());
            at_boundary = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Compute the external name for a deployment unit
///
/// `{prefix}{AccountKey}-Phase{N}` with an optional `-{Suffix}` tail. Names
/// longer than [`MAX_NAME_LEN`] are folded to a fixed length by truncation
/// plus a content-hash tail of the unfolded name, so two distinct identities
/// can never fold onto the same string.
pub fn unit_name(prefix: &str, account_key: &str, phase: PhaseId, suffix: Option<&str>) -> String {
    let account = pascal_case(account_key);
    let name = match suffix {
        Some(suffix) => format!("{prefix}{account}-Phase{phase}-{}", pascal_case(suffix)),
        None => format!("{prefix}{account}-Phase{phase}"),
    };
    fold(&name)
}

/// Compute the internal logical id for a deployment unit
///
/// `{AccountKey}Phase{N}[{Region}][{Suffix}]`; the region is omitted when it
/// equals the run's default region, and a leading digit is escaped because
/// logical ids must start with a letter.
pub fn unit_logical_id(
    account_key: &str,
    phase: PhaseId,
    region: &str,
    default_region: &str,
    suffix: Option<&str>,
) -> String {
    let mut account = pascal_case(account_key);
    if account.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        account.insert(0, 'a');
    }
    let region_part = if region == default_region {
        String::new()
    } else {
        pascal_case(region)
    };
    let suffix_part = suffix.map(pascal_case).unwrap_or_default();
    format!("{account}Phase{phase}{region_part}{suffix_part}")
}

/// Fold a name to at most [`MAX_NAME_LEN`] characters
///
/// Short names pass through unchanged. Long names keep a truncated head and
/// gain a hash tail derived from the full, unfolded name.
fn fold(name: &str) -> String {
    if name.len() <= MAX_NAME_LEN {
        return name.to_string();
    }
    let digest = Sha256::digest(name.as_bytes());
    let tail: String = digest
        .iter()
        .take(FOLD_HASH_LEN / 2)
        .map(|b| format!("{b:02x}"))
        .collect();
    let head_len = MAX_NAME_LEN - FOLD_HASH_LEN - 1;
    let head: String = name.chars().take(head_len).collect();
    format!("{head}-{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pascal_case_strips_separators() {
        assert_eq!(pascal_case("shared-network"), "SharedNetwork");
        assert_eq!(pascal_case("shared_network"), "SharedNetwork");
        assert_eq!(pascal_case("us-east-1"), "UsEast1");
    }

    #[test]
    fn pascal_case_preserves_interior_capitals() {
        assert_eq!(pascal_case("SharedNetwork"), "SharedNetwork");
    }

    #[test]
    fn unit_name_without_suffix() {
        let name = unit_name("Accel-", "shared-network", PhaseId(1), None);
        assert_eq!(name, "Accel-SharedNetwork-Phase1");
    }

    #[test]
    fn unit_name_with_suffix() {
        let name = unit_name("Accel-", "perimeter", PhaseId(-1), Some("alb"));
        assert_eq!(name, "Accel-Perimeter-Phase-1-Alb");
    }

    #[test]
    fn unit_name_is_deterministic() {
        let a = unit_name("Accel-", "ops", PhaseId(2), Some("nested"));
        let b = unit_name("Accel-", "ops", PhaseId(2), Some("nested"));
        assert_eq!(a, b);
    }

    #[test]
    fn unit_name_region_independent() {
        // The external name intentionally excludes the region; the logical id
        // carries it instead.
        let name = unit_name("Accel-", "ops", PhaseId(0), None);
        assert!(!name.contains("UsEast1"));
    }

    #[test]
    fn long_names_fold_to_fixed_length() {
        let long_key = "a".repeat(200);
        let name = unit_name("Accel-", &long_key, PhaseId(3), None);
        assert_eq!(name.len(), MAX_NAME_LEN);
    }

    #[test]
    fn folded_names_differ_for_distinct_identities() {
        let base = "a".repeat(200);
        let one = unit_name("Accel-", &format!("{base}x"), PhaseId(3), None);
        let two = unit_name("Accel-", &format!("{base}y"), PhaseId(3), None);
        assert_ne!(one, two);
    }

    #[test]
    fn logical_id_omits_default_region() {
        let id = unit_logical_id("ops", PhaseId(1), "ca-central-1", "ca-central-1", None);
        assert_eq!(id, "OpsPhase1");
    }

    #[test]
    fn logical_id_includes_non_default_region() {
        let id = unit_logical_id("ops", PhaseId(1), "us-east-1", "ca-central-1", None);
        assert_eq!(id, "OpsPhase1UsEast1");
    }

    #[test]
    fn logical_id_escapes_leading_digit() {
        let id = unit_logical_id("3rd-party", PhaseId(0), "ca-central-1", "ca-central-1", None);
        assert_eq!(id, "a3rdPartyPhase0");
    }

    #[test]
    fn logical_id_includes_suffix() {
        let id = unit_logical_id("ops", PhaseId(1), "ca-central-1", "ca-central-1", Some("alb"));
        assert_eq!(id, "OpsPhase1Alb");
    }
}
