//! The compiled plan handed to a binding enumerator.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use styx_core::key::{rotate, value_key};
use styx_core::{Dataset, Position, Statement, VarId};
use styx_store::{ReadTxn, StoreError};

use crate::assignment::Assignment;
use crate::reference::{RefId, Reference};

/// Fixed variable order plus one [`Assignment`] per variable.
///
/// The plan owns the reference arena, so every [`RefId`] inside an
/// assignment resolves through [`Plan::reference`].
#[derive(Debug, Clone)]
pub struct Plan {
    assignments: Vec<Assignment>,
    positions: AHashMap<VarId, usize>,
    references: Vec<Reference>,
    constants: Vec<Reference>,
}

impl Plan {
    pub(crate) fn new(
        assignments: Vec<Assignment>,
        references: Vec<Reference>,
        constants: Vec<Reference>,
    ) -> Self {
        let positions = assignments
            .iter()
            .enumerate()
            .map(|(i, a)| (a.variable.clone(), i))
            .collect();
        Self {
            assignments,
            positions,
            references,
            constants,
        }
    }

    /// Variable ids in evaluation order.
    pub fn order(&self) -> impl Iterator<Item = &VarId> {
        self.assignments.iter().map(|a| &a.variable)
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn assignment(&self, id: &VarId) -> Option<&Assignment> {
        self.position(id).map(|i| &self.assignments[i])
    }

    pub fn position(&self, id: &VarId) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn reference(&self, id: RefId) -> &Reference {
        &self.references[id.index()]
    }

    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    /// Ground statements of the pattern.
    pub fn constants(&self) -> &[Reference] {
        &self.constants
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// First ground statement of `pattern` that the store does not hold.
    ///
    /// `pattern` must be the dataset this plan was compiled from.
    pub fn missing_constant<'d, T: ReadTxn + ?Sized>(
        &self,
        pattern: &'d Dataset,
        txn: &T,
    ) -> Result<Option<&'d Statement>, StoreError> {
        for constant in &self.constants {
            let Some(statement) = pattern.statement(&constant.graph, constant.index) else {
                continue;
            };
            let [Some(s), Some(p), Some(o)] = statement.terms().map(|t| t.as_node()) else {
                continue;
            };
            let (m, n, u) = rotate([s, p, o], Position::Subject);
            if txn.get(&value_key(Position::Subject, m, n, u))?.is_none() {
                return Ok(Some(statement));
            }
        }
        Ok(None)
    }

    pub fn explain_lines(&self) -> Vec<String> {
        let mut out = Vec::new();
        out.push(format!(
            "plan: {} variable(s), {} constant statement(s)",
            self.assignments.len(),
            self.constants.len()
        ));
        for (i, a) in self.assignments.iter().enumerate() {
            out.push(format!(
                "{i}: {} count={} norm={} length={}",
                a.variable, a.stats.count, a.stats.norm, a.stats.length
            ));
            for rid in &a.constraint {
                out.push(format!("  constraint {}", self.reference(*rid)));
            }
            for rid in &a.present {
                out.push(format!("  present {}", self.reference(*rid)));
            }
            match &a.value_root {
                Some(root) => out.push(format!("  value root: {} candidate(s)", root.len())),
                None => out.push("  value root: unconstrained".to_string()),
            }
            for rid in a.past.in_merge_order() {
                let r = self.reference(rid);
                let dep = r
                    .cursor()
                    .and_then(|c| c.id.as_ref())
                    .map(ToString::to_string)
                    .unwrap_or_default();
                out.push(format!("  past {dep}: {r}"));
            }
            for (dep, refs) in &a.future {
                out.push(format!("  future {dep}: {} reference(s)", refs.len()));
            }
            if !a.dependencies.is_empty() {
                let deps: Vec<String> = a.dependencies.iter().map(usize::to_string).collect();
                out.push(format!("  depends on: {}", deps.join(", ")));
            }
        }
        out
    }

    pub fn summary(&self) -> PlanSummary {
        let variables = self
            .assignments
            .iter()
            .map(|a| VariableSummary {
                variable: a.variable.clone(),
                count: a.stats.count,
                norm: a.stats.norm,
                length: a.stats.length,
                constraint: a.constraint.len(),
                present: a.present.len(),
                value_root: a.value_root.as_ref().map(Vec::len),
                past: a
                    .past
                    .in_merge_order()
                    .filter_map(|rid| self.reference(rid).cursor()?.id.clone())
                    .collect(),
                future: a.future.keys().cloned().collect(),
                dependencies: a.dependencies.clone(),
            })
            .collect();
        PlanSummary {
            order: self.order().cloned().collect(),
            constants: self.constants.len(),
            variables,
        }
    }
}

/// Serializable digest of a [`Plan`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub order: Vec<VarId>,
    pub constants: usize,
    pub variables: Vec<VariableSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableSummary {
    pub variable: VarId,
    pub count: u64,
    pub norm: u64,
    pub length: usize,
    pub constraint: usize,
    pub present: usize,
    /// Size of the value root; `None` when unconstrained.
    pub value_root: Option<usize>,
    /// Dependency of each past cursor, in merge order.
    pub past: Vec<VarId>,
    pub future: Vec<VarId>,
    pub dependencies: Vec<usize>,
}

impl PlanSummary {
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
