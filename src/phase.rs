//! Phase sequencing and step execution
//!
//! Phases execute in a fixed, strict total order declared by their ordinal
//! id, never by source layout. Steps within one phase are independent and run
//! concurrently with no ordering guarantee among siblings; the architecture
//! assumes no step reads an output emitted by a sibling in the same phase.
//! Every step of phase N completes, ledger writes included, before any step
//! of phase N+1 begins.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use crate::error::{LandfallError, LandfallResult};
use crate::ledger::{OutputFilter, OutputLedger, OutputPayload};
use crate::models::{AccountDirectory, DeploymentTarget};
use crate::registry::{DeploymentUnit, DeploymentUnitRegistry, RegistryOptions};
use crate::resolver;

/// Ordinal id of a rollout phase
///
/// The ordinal is the declared total order: reordering phases is a visible,
/// checked change to this value, not a side effect of call sequence.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct PhaseId(pub i8);

impl PhaseId {
    /// The standard rollout sequence
    pub const SEQUENCE: [PhaseId; 7] = [
        PhaseId(-1),
        PhaseId(0),
        PhaseId(1),
        PhaseId(2),
        PhaseId(3),
        PhaseId(4),
        PhaseId(5),
    ];
}

impl fmt::Display for PhaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything a step may touch while running
///
/// Cheap to clone: shares the directory, the phase's registry, and the
/// ledger. Ledger reads through the context only see records from strictly
/// earlier phases; emits are tagged with the current phase through the unit
/// handle.
#[derive(Clone)]
pub struct StepContext {
    phase: PhaseId,
    directory: Arc<AccountDirectory>,
    registry: Arc<DeploymentUnitRegistry>,
    ledger: Arc<OutputLedger>,
}

impl StepContext {
    pub fn phase(&self) -> PhaseId {
        self.phase
    }

    pub fn directory(&self) -> &AccountDirectory {
        &self.directory
    }

    /// The registry for this phase's deployment units
    pub fn registry(&self) -> &DeploymentUnitRegistry {
        &self.registry
    }

    /// Resolve a deployment target to account ids
    pub fn resolve(&self, target: &DeploymentTarget) -> LandfallResult<Vec<String>> {
        resolver::resolve(target, &self.directory)
    }

    /// Resolve a deployment target to account keys
    pub fn resolve_keys(&self, target: &DeploymentTarget) -> LandfallResult<Vec<String>> {
        resolver::resolve_keys(target, &self.directory)
    }

    /// Record an artifact produced under the given unit
    pub fn emit<P: OutputPayload>(
        &self,
        unit: &DeploymentUnit,
        payload: &P,
    ) -> LandfallResult<()> {
        self.ledger.emit(unit, payload)
    }

    /// All matching outputs from strictly earlier phases
    pub fn find_all<P: OutputPayload>(&self, filter: OutputFilter<'_>) -> LandfallResult<Vec<P>> {
        self.ledger.find_all_before(filter, Some(self.phase))
    }

    /// At-most-one output from strictly earlier phases; `None` is a normal,
    /// skippable outcome
    pub fn try_find_one<P: OutputPayload>(
        &self,
        filter: OutputFilter<'_>,
    ) -> LandfallResult<Option<P>> {
        self.ledger.try_find_one_before(filter, Some(self.phase))
    }

    /// Exactly-one output from strictly earlier phases; missing is a
    /// `MissingPrerequisite` error
    pub fn find_one<P: OutputPayload>(&self, filter: OutputFilter<'_>) -> LandfallResult<P> {
        self.ledger.find_one_before(filter, Some(self.phase))
    }
}

/// One independently invoked unit of work within a phase
///
/// Steps delegate actual resource creation to leaf logic holding the unit
/// handles they obtain from the context; they carry no orchestration logic
/// themselves. A step missing an optional prerequisite should log and return
/// `Ok` (skip); a missing mandatory prerequisite propagates and halts the
/// run.
#[async_trait]
pub trait PhaseStep: Send + Sync {
    /// Stable name used in reports and failure messages
    fn name(&self) -> &str;

    async fn run(&self, ctx: &StepContext) -> LandfallResult<()>;
}

/// What a completed run did, per phase
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub phases: Vec<PhaseReport>,
}

#[derive(Debug, Clone)]
pub struct PhaseReport {
    pub phase: PhaseId,
    /// Step names in completion order
    pub steps_completed: Vec<String>,
    /// Deployment units registered by this phase
    pub units_created: usize,
}

/// Shared inputs of a run, injected into every phase
///
/// Explicit state passed by reference instead of process-wide globals, so
/// independent runs (including tests) never cross-contaminate.
pub struct RunEnvironment {
    pub directory: Arc<AccountDirectory>,
    pub ledger: Arc<OutputLedger>,
    pub registry_options: RegistryOptions,
}

/// Executes registered steps phase by phase
///
/// Failure philosophy: the first failing step aborts its phase and the run,
/// since later phases assume earlier ones fully completed. Changes already
/// applied by completed phases are left in place; operators fix the defect
/// and re-run, relying on the idempotent get-or-create and emit semantics.
#[derive(Default)]
pub struct PhaseRunner {
    phases: BTreeMap<PhaseId, Vec<Arc<dyn PhaseStep>>>,
}

impl PhaseRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a step under the given phase ordinal
    pub fn register<S: PhaseStep + 'static>(&mut self, phase: PhaseId, step: S) -> &mut Self {
        self.phases.entry(phase).or_default().push(Arc::new(step));
        self
    }

    /// Number of registered steps across all phases
    pub fn step_count(&self) -> usize {
        self.phases.values().map(Vec::len).sum()
    }

    /// Run all phases in ascending ordinal order
    pub async fn run(&self, env: &RunEnvironment) -> LandfallResult<RunReport> {
        let mut report = RunReport::default();
        for (&phase, steps) in &self.phases {
            let phase_report = self.run_phase(phase, steps, env).await?;
            report.phases.push(phase_report);
        }
        Ok(report)
    }

    async fn run_phase(
        &self,
        phase: PhaseId,
        steps: &[Arc<dyn PhaseStep>],
        env: &RunEnvironment,
    ) -> LandfallResult<PhaseReport> {
        tracing::info!(%phase, steps = steps.len(), "starting phase");
        let registry = Arc::new(DeploymentUnitRegistry::new(
            phase,
            Arc::clone(&env.directory),
            env.registry_options.clone(),
        ));

        let mut tasks = JoinSet::new();
        let mut names: HashMap<tokio::task::Id, String> = HashMap::new();
        for step in steps {
            let step = Arc::clone(step);
            let ctx = StepContext {
                phase,
                directory: Arc::clone(&env.directory),
                registry: Arc::clone(&registry),
                ledger: Arc::clone(&env.ledger),
            };
            let name = step.name().to_string();
            let handle = tasks.spawn(async move {
                let name = step.name().to_string();
                let result = step.run(&ctx).await;
                (name, result)
            });
            names.insert(handle.id(), name);
        }

        let mut steps_completed = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, Ok(()))) => {
                    tracing::info!(%phase, step = %name, "step completed");
                    steps_completed.push(name);
                }
                Ok((name, Err(source))) => {
                    tracing::error!(%phase, step = %name, error = %source, "step failed");
                    tasks.abort_all();
                    return Err(LandfallError::StepFailed {
                        phase,
                        step: name,
                        source: Box::new(source),
                    });
                }
                Err(join_error) => {
                    let step = names
                        .get(&join_error.id())
                        .cloned()
                        .unwrap_or_else(|| join_error.to_string());
                    tasks.abort_all();
                    return Err(LandfallError::StepPanicked { phase, step });
                }
            }
        }

        Ok(PhaseReport {
            phase,
            steps_completed,
            units_created: registry.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Account, StandardAccount};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Marker {
        from: String,
    }

    impl OutputPayload for Marker {
        const KIND: &'static str = "Marker";
    }

    fn environment() -> RunEnvironment {
        let directory = Arc::new(AccountDirectory::new(vec![Account::Standard(
            StandardAccount {
                key: "Mgmt".to_string(),
                id: "111".to_string(),
                email: "mgmt@example.com".to_string(),
                ou: "Root".to_string(),
                warm: false,
            },
        )]));
        RunEnvironment {
            directory,
            ledger: Arc::new(OutputLedger::new()),
            registry_options: RegistryOptions {
                prefix: "Accel-".to_string(),
                default_region: "ca-central-1".to_string(),
            },
        }
    }

    struct EmitStep {
        name: String,
        marker: String,
    }

    #[async_trait]
    impl PhaseStep for EmitStep {
        fn name(&self) -> &str {
            &self.name
        }

        async fn run(&self, ctx: &StepContext) -> LandfallResult<()> {
            let unit = ctx.registry().get_or_create("Mgmt", None, None)?;
            ctx.emit(
                &unit,
                &Marker {
                    from: self.marker.clone(),
                },
            )
        }
    }

    struct FailingStep;

    #[async_trait]
    impl PhaseStep for FailingStep {
        fn name(&self) -> &str {
            "failing"
        }

        async fn run(&self, ctx: &StepContext) -> LandfallResult<()> {
            ctx.find_one::<Marker>(OutputFilter::account("NeverEmitted"))
                .map(|_| ())
        }
    }

    /// Counts how many sibling-phase markers were visible when it ran
    struct CountingStep {
        seen: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl PhaseStep for CountingStep {
        fn name(&self) -> &str {
            "counting"
        }

        async fn run(&self, ctx: &StepContext) -> LandfallResult<()> {
            let visible = ctx.find_all::<Marker>(OutputFilter::default())?;
            self.seen.store(visible.len(), Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn phases_run_in_ordinal_order() {
        let env = environment();
        let mut runner = PhaseRunner::new();
        runner.register(
            PhaseId(1),
            EmitStep {
                name: "later".to_string(),
                marker: "phase-1".to_string(),
            },
        );
        runner.register(
            PhaseId(-1),
            EmitStep {
                name: "earlier".to_string(),
                marker: "phase--1".to_string(),
            },
        );

        let report = runner.run(&env).await.unwrap();

        let order: Vec<PhaseId> = report.phases.iter().map(|p| p.phase).collect();
        assert_eq!(order, vec![PhaseId(-1), PhaseId(1)]);
    }

    #[tokio::test]
    async fn steps_see_only_strictly_earlier_phases() {
        let env = environment();
        let seen = Arc::new(AtomicUsize::new(usize::MAX));

        let mut runner = PhaseRunner::new();
        runner.register(
            PhaseId(0),
            EmitStep {
                name: "emit-0".to_string(),
                marker: "zero".to_string(),
            },
        );
        runner.register(
            PhaseId(1),
            EmitStep {
                name: "emit-1".to_string(),
                marker: "one".to_string(),
            },
        );
        runner.register(
            PhaseId(1),
            CountingStep {
                seen: Arc::clone(&seen),
            },
        );

        runner.run(&env).await.unwrap();

        // Only the phase-0 marker is visible to the phase-1 step, regardless
        // of whether its sibling emitted first.
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failing_step_aborts_the_run() {
        let env = environment();
        let mut runner = PhaseRunner::new();
        runner.register(PhaseId(0), FailingStep);
        runner.register(
            PhaseId(1),
            EmitStep {
                name: "never-runs".to_string(),
                marker: "one".to_string(),
            },
        );

        let err = runner.run(&env).await.unwrap_err();

        assert!(matches!(
            err,
            LandfallError::StepFailed { phase, ref step, .. }
                if phase == PhaseId(0) && step == "failing"
        ));
        // Phase 1 never started.
        assert!(env.ledger.is_empty());
    }

    #[tokio::test]
    async fn report_counts_units_and_steps() {
        let env = environment();
        let mut runner = PhaseRunner::new();
        runner.register(
            PhaseId(0),
            EmitStep {
                name: "a".to_string(),
                marker: "a".to_string(),
            },
        );
        runner.register(
            PhaseId(0),
            EmitStep {
                name: "b".to_string(),
                marker: "b".to_string(),
            },
        );

        let report = runner.run(&env).await.unwrap();

        assert_eq!(report.phases.len(), 1);
        assert_eq!(report.phases[0].steps_completed.len(), 2);
        // Both steps share one (account, region) identity.
        assert_eq!(report.phases[0].units_created, 1);
        assert_eq!(env.ledger.len(), 2);
    }

    #[test]
    fn phase_sequence_is_strictly_increasing() {
        assert!(PhaseId::SEQUENCE.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(PhaseId::SEQUENCE[0], PhaseId(-1));
    }

    #[test]
    fn phase_display_matches_ordinal() {
        assert_eq!(PhaseId(-1).to_string(), "-1");
        assert_eq!(PhaseId(5).to_string(), "5");
    }
}
