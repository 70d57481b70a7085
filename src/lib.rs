//! Landfall - phased landing-zone deployment core
//!
//! Landfall is the orchestration backbone for rolling out a landing-zone
//! environment across hundreds of cloud accounts and regions: deployment-unit
//! identity and deterministic naming, deployment-target resolution, and the
//! typed output ledger that lets later phases discover what earlier phases
//! produced without build-time coupling.

pub mod error;
pub mod ledger;
pub mod models;
pub mod naming;
pub mod outputs;
pub mod phase;
pub mod registry;
pub mod resolver;

// Re-exports for convenience
pub use error::{LandfallError, LandfallResult};
pub use ledger::{OutputFilter, OutputLedger, OutputPayload, OutputRecord};
pub use models::{
    Account, AccountDirectory, DeploymentTarget, GovCloudAccount, OrganizationalUnit,
    StandardAccount, ROOT_OU,
};
pub use phase::{PhaseId, PhaseRunner, PhaseStep, RunEnvironment, RunReport, StepContext};
pub use registry::{DeploymentUnit, DeploymentUnitRegistry, RegistryOptions};
pub use resolver::{resolve, resolve_keys};
