//! Shared fixtures for integration tests
#![allow(dead_code)]

use std::sync::Arc;

use landfall::{
    Account, AccountDirectory, OutputLedger, RegistryOptions, RunEnvironment, StandardAccount,
};

pub const DEFAULT_REGION: &str = "ca-central-1";
pub const PREFIX: &str = "Accel-";

pub fn standard(key: &str, id: &str, ou: &str) -> Account {
    Account::Standard(StandardAccount {
        key: key.to_string(),
        id: id.to_string(),
        email: format!("{key}@example.com"),
        ou: ou.to_string(),
        warm: false,
    })
}

/// The three-account organization used across the integration suites
pub fn directory() -> Arc<AccountDirectory> {
    Arc::new(AccountDirectory::new(vec![
        standard("Mgmt", "111", "Root"),
        standard("Sec", "222", "Security"),
        standard("Wkld1", "333", "Workloads"),
    ]))
}

pub fn environment() -> RunEnvironment {
    environment_with_ledger(Arc::new(OutputLedger::new()))
}

pub fn environment_with_ledger(ledger: Arc<OutputLedger>) -> RunEnvironment {
    RunEnvironment {
        directory: directory(),
        ledger,
        registry_options: RegistryOptions {
            prefix: PREFIX.to_string(),
            default_region: DEFAULT_REGION.to_string(),
        },
    }
}
