use styx_core::Dataset;
use styx_store::{KvStore, ReadTxn};

use crate::assignment::AssignmentBuilder;
use crate::classify::{classify, Classified};
use crate::config::CompileConfig;
use crate::error::{PlanError, PlanResult};
use crate::plan::Plan;

/// Runs classify, probe, sort and assign against one read snapshot.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    config: CompileConfig,
}

impl Compiler {
    pub fn new(config: CompileConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompileConfig {
        &self.config
    }

    pub fn compile<T: ReadTxn + ?Sized>(&self, pattern: &Dataset, txn: &T) -> PlanResult<Plan> {
        let result = self.compile_inner(pattern, txn);
        if let Err(err) = &result {
            tracing::warn!(error = %err, "pattern rejected");
        }
        result
    }

    /// Open a snapshot of `store` and compile against it.
    pub fn compile_in<S: KvStore>(&self, store: &S, pattern: &Dataset) -> PlanResult<Plan> {
        let snapshot = store.view()?;
        self.compile(pattern, &snapshot)
    }

    fn compile_inner<T: ReadTxn + ?Sized>(&self, pattern: &Dataset, txn: &T) -> PlanResult<Plan> {
        let Classified {
            constants,
            mut codex_map,
        } = classify(pattern)?;

        if let Some(max) = self.config.max_variables {
            if codex_map.len() > max {
                return Err(PlanError::TooManyVariables {
                    count: codex_map.len(),
                    max,
                });
            }
        }

        codex_map.probe(txn)?;
        codex_map.sort(self.config.order);
        tracing::debug!(order = ?codex_map.ids(), "ordered variables");

        let assignments = AssignmentBuilder::new(&self.config).build(&mut codex_map, txn)?;
        let plan = Plan::new(assignments, codex_map.into_references(), constants);
        tracing::debug!(
            variables = plan.len(),
            constants = plan.constants().len(),
            "compiled plan"
        );
        Ok(plan)
    }
}

/// Compile with the default configuration.
pub fn compile<T: ReadTxn + ?Sized>(pattern: &Dataset, txn: &T) -> PlanResult<Plan> {
    Compiler::default().compile(pattern, txn)
}
