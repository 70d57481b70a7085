//! Core data models for Landfall
//!
//! Defines the structures the orchestration core consumes from the validated
//! configuration:
//! - `Account`: one cloud account, either `Standard` or `GovCloud`
//! - `AccountDirectory`: lookup view over the run's accounts
//! - `OrganizationalUnit`: named account grouping, derived from membership
//! - `DeploymentTarget`: declarative selector for per-feature targeting

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Sentinel organizational unit meaning "every account in the organization"
pub const ROOT_OU: &str = "Root";

/// A standard (commercial partition) account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardAccount {
    /// Stable logical identifier, distinct from the numeric account id
    pub key: String,
    /// Numeric account id
    pub id: String,
    pub email: String,
    /// Organizational unit this account belongs to
    pub ou: String,
    /// Whether the account has been pre-warmed for provisioning
    #[serde(default)]
    pub warm: bool,
}

/// A GovCloud account, paired with the commercial-partition account that
/// carries its billing relationship
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GovCloudAccount {
    pub key: String,
    /// Numeric account id in the GovCloud partition
    pub id: String,
    /// Numeric account id of the paired commercial-partition account
    pub commercial_id: String,
    pub email: String,
    pub ou: String,
    #[serde(default)]
    pub warm: bool,
}

/// One cloud account as loaded from the validated configuration
///
/// The two shapes are mutually exclusive and the distinction only matters at
/// the provisioning-id boundary; everything else goes through the common
/// accessors. Immutable once loaded for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Account {
    Standard(StandardAccount),
    GovCloud(GovCloudAccount),
}

impl Account {
    /// Stable logical identifier for this account
    pub fn key(&self) -> &str {
        match self {
            Account::Standard(a) => &a.key,
            Account::GovCloud(a) => &a.key,
        }
    }

    /// Numeric account id in the account's own partition
    pub fn id(&self) -> &str {
        match self {
            Account::Standard(a) => &a.id,
            Account::GovCloud(a) => &a.id,
        }
    }

    pub fn email(&self) -> &str {
        match self {
            Account::Standard(a) => &a.email,
            Account::GovCloud(a) => &a.email,
        }
    }

    /// Organizational unit this account belongs to
    pub fn ou(&self) -> &str {
        match self {
            Account::Standard(a) => &a.ou,
            Account::GovCloud(a) => &a.ou,
        }
    }

    pub fn warm(&self) -> bool {
        match self {
            Account::Standard(a) => a.warm,
            Account::GovCloud(a) => a.warm,
        }
    }

    /// Account id under which resources are provisioned
    ///
    /// This is the one boundary where the account shape matters: GovCloud
    /// provisioning always happens in the GovCloud partition, while the
    /// paired commercial id exists only for billing.
    pub fn provisioning_id(&self) -> &str {
        match self {
            Account::Standard(a) => &a.id,
            Account::GovCloud(a) => &a.id,
        }
    }

    /// Paired commercial-partition account id, when the account has one
    pub fn commercial_id(&self) -> Option<&str> {
        match self {
            Account::Standard(_) => None,
            Account::GovCloud(a) => Some(&a.commercial_id),
        }
    }
}

/// A named grouping of accounts, derived from `Account::ou` membership
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationalUnit {
    pub key: String,
    /// Account keys of members, in directory order
    pub members: Vec<String>,
}

/// Declarative selector naming which accounts a feature applies to
///
/// Semantics: `union(expand(organizational_units), accounts) \ excluded_accounts`.
/// An empty selector resolves to the empty set and is a normal outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeploymentTarget {
    /// Organizational units to expand; `"Root"` means every account
    pub organizational_units: Vec<String>,
    /// Explicitly included account keys
    pub accounts: Vec<String>,
    /// Account keys removed from the result regardless of inclusion path
    pub excluded_accounts: Vec<String>,
}

impl DeploymentTarget {
    /// Selector covering every account in the organization
    pub fn root() -> Self {
        Self {
            organizational_units: vec![ROOT_OU.to_string()],
            ..Self::default()
        }
    }

    /// True if no inclusion list names anything
    pub fn is_empty(&self) -> bool {
        self.organizational_units.is_empty() && self.accounts.is_empty()
    }
}

/// Lookup view over the run's accounts
///
/// Consumed, not owned, by the core: the external driver loads and validates
/// the accounts, the directory only answers identity questions. Insertion
/// order is preserved because downstream allocation order depends on it.
#[derive(Debug, Clone)]
pub struct AccountDirectory {
    accounts: Vec<Account>,
    by_key: HashMap<String, usize>,
}

impl AccountDirectory {
    pub fn new(accounts: Vec<Account>) -> Self {
        let by_key = accounts
            .iter()
            .enumerate()
            .map(|(index, account)| (account.key().to_string(), index))
            .collect();
        Self { accounts, by_key }
    }

    /// All accounts in directory order
    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    /// Look up an account by key
    pub fn get(&self, key: &str) -> Option<&Account> {
        self.by_key.get(key).map(|&index| &self.accounts[index])
    }

    /// Look up an account id by key, `None` when the key is unknown
    pub fn id(&self, key: &str) -> Option<&str> {
        self.get(key).map(Account::id)
    }

    /// Accounts whose OU membership equals `ou` exactly, in directory order
    ///
    /// Flat equality only; nested-OU flattening, if any, is a
    /// configuration-load concern upstream of the core.
    pub fn ou_members<'a>(&'a self, ou: &'a str) -> impl Iterator<Item = &'a Account> + 'a {
        self.accounts.iter().filter(move |a| a.ou() == ou)
    }

    /// True if any account belongs to the given OU
    pub fn has_ou(&self, ou: &str) -> bool {
        self.accounts.iter().any(|a| a.ou() == ou)
    }

    /// Derive the organizational units from account membership,
    /// in first-seen order
    pub fn organizational_units(&self) -> Vec<OrganizationalUnit> {
        let mut order: Vec<String> = Vec::new();
        let mut members: HashMap<String, Vec<String>> = HashMap::new();
        for account in &self.accounts {
            let entry = members.entry(account.ou().to_string()).or_insert_with(|| {
                order.push(account.ou().to_string());
                Vec::new()
            });
            entry.push(account.key().to_string());
        }
        order
            .into_iter()
            .map(|key| {
                let members = members.remove(&key).unwrap_or_default();
                OrganizationalUnit { key, members }
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
