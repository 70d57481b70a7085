//! Error types for Landfall
//!
//! One `thiserror` enum for the whole crate. Configuration defects
//! (`UnknownAccount`, `UnknownOrganizationalUnit`) and naming collisions are
//! never swallowed; `MissingPrerequisite` is raised only by the mandatory
//! ledger query variant.

use thiserror::Error;

use crate::phase::PhaseId;

/// Result type alias for Landfall operations
pub type LandfallResult<T> = Result<T, LandfallError>;

/// Main error type for Landfall operations
#[derive(Error, Debug)]
pub enum LandfallError {
    /// A selector or mandatory lookup referenced an account key that is not
    /// in the account directory. Configuration correctness is a precondition
    /// for every phase, so this is fatal.
    #[error("unknown account '{account_key}'")]
    UnknownAccount { account_key: String },

    /// A selector referenced an organizational unit that no account belongs to
    #[error("unknown organizational unit '{ou_key}'")]
    UnknownOrganizationalUnit { ou_key: String },

    /// Two distinct deployment-unit identities computed the same external
    /// name. Silent reuse of another identity's infrastructure is
    /// unacceptable, so this is always fatal.
    #[error(
        "deployment unit name '{name}' for account '{requested}' collides with existing unit for account '{existing}'"
    )]
    NamingCollision {
        name: String,
        existing: String,
        requested: String,
    },

    /// A mandatory ledger query found nothing an earlier phase was
    /// contractually guaranteed to have produced
    #[error("missing prerequisite output '{kind}' (account: {account_key:?}, region: {region:?})")]
    MissingPrerequisite {
        kind: String,
        account_key: Option<String>,
        region: Option<String>,
    },

    /// A stored payload no longer matches the shape declared for its kind.
    /// Reads may happen in a different process invocation than the write, so
    /// schema drift is caught here rather than silently misinterpreted.
    #[error("output '{kind}' for account '{account_key}' in {region} does not match its declared shape: {source}")]
    PayloadShape {
        kind: String,
        account_key: String,
        region: String,
        source: serde_json::Error,
    },

    /// Payload serialization error
    #[error("failed to serialize output payload: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Ledger persistence (de)serialization error
    #[error("ledger (de)serialization error: {0}")]
    Ledger(#[source] serde_json::Error),

    /// A step failed, aborting its phase and the run
    #[error("step '{step}' failed in phase {phase}: {source}")]
    StepFailed {
        phase: PhaseId,
        step: String,
        source: Box<LandfallError>,
    },

    /// A step panicked or was cancelled, aborting its phase and the run
    #[error("step '{step}' panicked in phase {phase}")]
    StepPanicked { phase: PhaseId, step: String },
}
