//! Assignment building: per-variable resolution in evaluation order.
//!
//! Runs after [`CodexMap::probe`] and [`CodexMap::sort`]. For the variable at
//! position `i` the builder:
//!
//! 1. copies `present` (single refs) and `constraint` from the codex
//! 2. intersects the candidate values of every present reference into the value root
//! 3. turns every double group whose other variable sits at `j < i` into past
//!    cursors and absorbs `j` plus that variable's own dependencies
//! 4. parks the remaining double groups in `future`
//!
//! A dual pair is therefore always resolved on the side of whichever variable
//! comes second.

use ahash::AHashMap;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use styx_core::{decode_node, Node, VarId};
use styx_store::{ReadTxn, StoreError};

use crate::codex::{CodexMap, CodexStats};
use crate::config::CompileConfig;
use crate::error::{PlanError, PlanResult};
use crate::past::Past;
use crate::reference::RefId;

/// Evaluation-time record of one variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub variable: VarId,
    pub stats: CodexStats,
    /// Self-join filters.
    pub constraint: Vec<RefId>,
    /// Single references defining the static candidate set.
    pub present: Vec<RefId>,
    /// Intersection of the present candidates. `None` when there are no
    /// present references and the domain comes from cursors alone.
    pub value_root: Option<Vec<Node>>,
    pub past: Past,
    /// Double groups whose other variable is assigned later.
    pub future: BTreeMap<VarId, Vec<RefId>>,
    /// Sorted earlier positions this variable is conditioned on.
    pub dependencies: Vec<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct AssignmentBuilder {
    require_value_root: bool,
}

impl AssignmentBuilder {
    pub fn new(config: &CompileConfig) -> Self {
        Self {
            require_value_root: config.require_value_root,
        }
    }

    /// Resolve every variable of a probed, sorted map.
    ///
    /// Cursors are released if resolution fails.
    pub fn build<T: ReadTxn + ?Sized>(
        &self,
        map: &mut CodexMap,
        txn: &T,
    ) -> PlanResult<Vec<Assignment>> {
        if !map.is_probed() {
            return Err(PlanError::Unprobed);
        }
        match self.build_all(map, txn) {
            Ok(assignments) => Ok(assignments),
            Err(err) => {
                let released = map.close();
                tracing::warn!(error = %err, released, "assignment failed, cursors released");
                Err(err)
            }
        }
    }

    fn build_all<T: ReadTxn + ?Sized>(
        &self,
        map: &mut CodexMap,
        txn: &T,
    ) -> PlanResult<Vec<Assignment>> {
        let ids = map.ids().to_vec();
        let mut positions: AHashMap<VarId, usize> = AHashMap::with_capacity(ids.len());
        let mut assignments: Vec<Assignment> = Vec::with_capacity(ids.len());

        for id in ids {
            let Some(codex) = map.codex(&id).cloned() else {
                continue;
            };
            let i = assignments.len();

            let value_root = self.value_root(map, &id, &codex.single, txn)?;

            let mut past = Past::new();
            let mut future = BTreeMap::new();
            let mut dependencies = BTreeSet::new();
            for (dep, refs) in &codex.double {
                match positions.get(dep) {
                    Some(&j) => {
                        past.push(dep, j, refs, map.references_mut());
                        dependencies.insert(j);
                        dependencies.extend(assignments[j].dependencies.iter().copied());
                    }
                    None => {
                        future.insert(dep.clone(), refs.clone());
                    }
                }
            }
            past.finish(map.references());

            tracing::debug!(
                variable = %id,
                position = i,
                count = codex.stats.count,
                present = codex.single.len(),
                past = past.len(),
                future = future.len(),
                "assigned variable"
            );

            positions.insert(id.clone(), i);
            assignments.push(Assignment {
                variable: id,
                stats: codex.stats,
                constraint: codex.constraint,
                present: codex.single,
                value_root,
                past,
                future,
                dependencies: dependencies.into_iter().collect(),
            });
        }
        Ok(assignments)
    }

    fn value_root<T: ReadTxn + ?Sized>(
        &self,
        map: &CodexMap,
        id: &VarId,
        present: &[RefId],
        txn: &T,
    ) -> PlanResult<Option<Vec<Node>>> {
        if present.is_empty() {
            if self.require_value_root {
                return Err(PlanError::EmptyValueRoot {
                    variable: id.clone(),
                });
            }
            return Ok(None);
        }

        let mut sets = Vec::with_capacity(present.len());
        for rid in present {
            if let Some(values) = map.reference(*rid).candidate_values(txn)? {
                sets.push(values);
            }
        }
        sets.sort_by_key(Vec::len);

        let mut sets = sets.into_iter();
        let mut root = sets.next().unwrap_or_default();
        for set in sets {
            if root.is_empty() {
                break;
            }
            root = intersect(&root, &set);
        }
        if root.is_empty() {
            return Err(PlanError::EmptyValueRoot {
                variable: id.clone(),
            });
        }

        let nodes = root
            .iter()
            .map(|v| decode_node(v).map(|(node, _)| node))
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from)?;
        Ok(Some(nodes))
    }
}

/// Sorted-merge intersection of two ascending sequences.
fn intersect(a: &[Vec<u8>], b: &[Vec<u8>]) -> Vec<Vec<u8>> {
    let mut out = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                out.push(a[i].clone());
                i += 1;
                j += 1;
            }
        }
    }
    out
}
