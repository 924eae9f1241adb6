//! Per-variable statistics: the Codex and the CodexMap.
//!
//! A [`Codex`] groups the references of one variable by shape:
//!
//! - `constraint`: the variable occupies two positions of one statement
//! - `single`: the variable plus two constants
//! - `double`: the variable plus one other variable, keyed by the other id
//!
//! The [`CodexMap`] owns the reference arena, the `id -> Codex` index, and the
//! first-seen order of variable ids. Probing fills in each reference's count
//! and folds them into [`CodexStats`]; sorting then fixes the evaluation order.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use styx_core::VarId;
use styx_store::{read_count, ReadTxn};

use crate::config::VariableOrder;
use crate::error::{PlanError, PlanResult};
use crate::reference::{Cursor, RefId, Reference};

/// Aggregates over a variable's probed single and double references.
///
/// Constraint references are filters only and do not contribute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodexStats {
    /// Sum of candidate counts.
    pub count: u64,
    /// Sum of squared candidate counts.
    pub norm: u64,
    /// Number of references folded in.
    pub length: usize,
}

impl CodexStats {
    fn add(self, count: u64) -> Self {
        Self {
            count: self.count.saturating_add(count),
            norm: self.norm.saturating_add(count.saturating_mul(count)),
            length: self.length + 1,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Codex {
    pub constraint: Vec<RefId>,
    pub single: Vec<RefId>,
    pub double: BTreeMap<VarId, Vec<RefId>>,
    pub stats: CodexStats,
}

impl Codex {
    /// Single and double references, the ones that get probed.
    pub fn probed_refs(&self) -> impl Iterator<Item = RefId> + '_ {
        self.single
            .iter()
            .chain(self.double.values().flatten())
            .copied()
    }
}

#[derive(Debug, Default)]
pub struct CodexMap {
    references: Vec<Reference>,
    index: AHashMap<VarId, Codex>,
    slice: Vec<VarId>,
    probed: bool,
}

impl CodexMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.slice.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slice.is_empty()
    }

    /// Variable ids in first-seen order, or evaluation order after [`CodexMap::sort`].
    pub fn ids(&self) -> &[VarId] {
        &self.slice
    }

    pub fn codex(&self, id: &VarId) -> Option<&Codex> {
        self.index.get(id)
    }

    pub fn reference(&self, id: RefId) -> &Reference {
        &self.references[id.index()]
    }

    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    pub fn is_probed(&self) -> bool {
        self.probed
    }

    /// Fetch the codex for `id`, creating it (and recording first-seen order) if needed.
    pub fn get_codex(&mut self, id: &VarId) -> &mut Codex {
        if !self.index.contains_key(id) {
            self.slice.push(id.clone());
        }
        self.index.entry(id.clone()).or_default()
    }

    pub(crate) fn push_reference(&mut self, reference: Reference) -> RefId {
        let id = RefId::new(self.references.len());
        self.references.push(reference);
        id
    }

    /// Record `reference` under `a`'s codex as pairing with `b`.
    pub fn insert_double(&mut self, a: &VarId, b: &VarId, reference: RefId) {
        self.get_codex(a)
            .double
            .entry(b.clone())
            .or_default()
            .push(reference);
    }

    /// Insert both halves of a two-variable statement and link them.
    pub(crate) fn insert_pair(
        &mut self,
        a: &VarId,
        ref_a: Reference,
        b: &VarId,
        ref_b: Reference,
    ) -> (RefId, RefId) {
        let id_a = self.push_reference(ref_a);
        let id_b = self.push_reference(ref_b);
        self.references[id_a.index()].dual = Some(id_b);
        self.references[id_b.index()].dual = Some(id_a);
        self.insert_double(a, b, id_a);
        self.insert_double(b, a, id_b);
        (id_a, id_b)
    }

    // ------------------------------------------------------------------------
    // Probe phase
    // ------------------------------------------------------------------------

    /// Attach a cursor with its candidate count to every single and double
    /// reference, then fold the counts into each codex's stats.
    ///
    /// On failure every cursor attached so far is released. A map is probed
    /// once; call [`CodexMap::close`] before probing it again.
    pub fn probe<T: ReadTxn + ?Sized>(&mut self, txn: &T) -> PlanResult<()> {
        if self.probed {
            return Err(PlanError::AlreadyProbed);
        }
        match self.probe_all(txn) {
            Ok(()) => {
                self.probed = true;
                Ok(())
            }
            Err(err) => {
                let released = self.close();
                tracing::warn!(error = %err, released, "probe failed, cursors released");
                Err(err)
            }
        }
    }

    fn probe_all<T: ReadTxn + ?Sized>(&mut self, txn: &T) -> PlanResult<()> {
        for position in 0..self.slice.len() {
            let id = self.slice[position].clone();
            let refs: Vec<RefId> = self.index[&id].probed_refs().collect();

            let mut stats = CodexStats::default();
            for rid in refs {
                let reference = &mut self.references[rid.index()];
                let Some(key) = reference.count_key() else {
                    continue;
                };
                let count = read_count(txn, &key)?;
                tracing::trace!(variable = %id, reference = %reference, count, "probed");
                reference.attach(Cursor::probed(key, count))?;
                if count == 0 {
                    return Err(PlanError::ZeroCandidateReference {
                        variable: id,
                        graph: reference.graph.clone(),
                        index: reference.index,
                        permutation: reference.permutation,
                    });
                }
                stats = stats.add(count);
            }

            if let Some(codex) = self.index.get_mut(&id) {
                codex.stats = stats;
            }
        }
        tracing::debug!(variables = self.slice.len(), "probed codex map");
        Ok(())
    }

    /// Stable sort of the variable order by aggregate count.
    ///
    /// Equal counts keep first-seen order.
    pub fn sort(&mut self, order: VariableOrder) {
        let Self { index, slice, .. } = self;
        slice.sort_by(|a, b| {
            let (ca, cb) = (index[a].stats.count, index[b].stats.count);
            match order {
                VariableOrder::DescendingCount => cb.cmp(&ca),
                VariableOrder::AscendingCount => ca.cmp(&cb),
            }
        });
    }

    /// Release every attached cursor. Returns how many were released.
    pub fn close(&mut self) -> usize {
        self.probed = false;
        self.references
            .iter_mut()
            .map(Reference::release)
            .filter(|released| *released)
            .count()
    }

    pub fn attached_cursors(&self) -> usize {
        self.references
            .iter()
            .filter(|r| r.cursor().is_some())
            .count()
    }

    pub(crate) fn references_mut(&mut self) -> &mut [Reference] {
        &mut self.references
    }

    pub(crate) fn into_references(self) -> Vec<Reference> {
        self.references
    }
}

impl fmt::Display for CodexMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |refs: &[RefId]| {
            refs.iter()
                .map(|r| self.reference(*r).to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        for id in &self.slice {
            let codex = &self.index[id];
            writeln!(f, "{id}:")?;
            writeln!(f, "  Constraint: [{}]", join(&codex.constraint))?;
            writeln!(f, "  Singles: [{}]", join(&codex.single))?;
            writeln!(f, "  Doubles:")?;
            for (other, refs) in &codex.double {
                writeln!(f, "    {other}: [{}]", join(refs))?;
            }
            writeln!(
                f,
                "  Count: {} Norm: {} Length: {}",
                codex.stats.count, codex.stats.norm, codex.stats.length
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use styx_core::{Node, Permutation, Term};

    fn single(graph: &str, index: usize) -> Reference {
        Reference::new(
            graph,
            index,
            Permutation::Subject,
            Some(Node::iri("p").into()),
            Some(Node::iri("o").into()),
        )
    }

    #[test]
    fn get_codex_records_first_seen_order() {
        let mut map = CodexMap::new();
        map.get_codex(&VarId::new("b"));
        map.get_codex(&VarId::new("a"));
        map.get_codex(&VarId::new("b"));
        assert_eq!(map.ids(), &[VarId::new("b"), VarId::new("a")]);
    }

    #[test]
    fn insert_pair_links_duals_symmetrically() {
        let mut map = CodexMap::new();
        let (x, y) = (VarId::new("x"), VarId::new("y"));
        let ra = Reference::new("g", 0, Permutation::Subject, Some(Term::Var(y.clone())), None);
        let rb = Reference::new("g", 0, Permutation::Predicate, None, Some(Term::Var(x.clone())));
        let (a, b) = map.insert_pair(&x, ra, &y, rb);

        assert_eq!(map.reference(a).dual, Some(b));
        assert_eq!(map.reference(b).dual, Some(a));
        assert_eq!(map.codex(&x).unwrap().double[&y], vec![a]);
        assert_eq!(map.codex(&y).unwrap().double[&x], vec![b]);
    }

    #[test]
    fn sort_is_stable_for_equal_counts() {
        let mut map = CodexMap::new();
        for (name, count) in [("a", 1), ("b", 5), ("c", 1), ("d", 5)] {
            let rid = map.push_reference(single("g", 0));
            let codex = map.get_codex(&VarId::new(name));
            codex.single.push(rid);
            codex.stats = CodexStats::default().add(count);
        }
        map.sort(VariableOrder::DescendingCount);
        let ids: Vec<&str> = map.ids().iter().map(VarId::as_str).collect();
        assert_eq!(ids, vec!["b", "d", "a", "c"]);

        map.sort(VariableOrder::AscendingCount);
        let ids: Vec<&str> = map.ids().iter().map(VarId::as_str).collect();
        assert_eq!(ids, vec!["a", "c", "b", "d"]);
    }

    #[test]
    fn stats_fold_counts_and_squares() {
        let stats = CodexStats::default().add(2).add(3);
        assert_eq!(
            stats,
            CodexStats {
                count: 5,
                norm: 13,
                length: 2
            }
        );
    }
}
