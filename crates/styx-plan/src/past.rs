//! Past index: the cursors a variable advances in lock-step with earlier variables.

use std::collections::BTreeMap;

use styx_core::VarId;

use crate::reference::{RefId, Reference};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Past {
    cursors: Vec<RefId>,
    /// Evaluation position of the dependency behind each flat entry.
    positions: Vec<usize>,
    index: BTreeMap<(VarId, usize), usize>,
    groups: Vec<(VarId, usize)>,
    order: Vec<usize>,
}

impl Past {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb the double group of `dep`, which sits at evaluation position `position`.
    ///
    /// Each cursor learns which variable it follows and its offset in the group.
    pub(crate) fn push(
        &mut self,
        dep: &VarId,
        position: usize,
        refs: &[RefId],
        references: &mut [Reference],
    ) {
        for (offset, rid) in refs.iter().enumerate() {
            if let Some(cursor) = references[rid.index()].cursor_mut() {
                cursor.id = Some(dep.clone());
                cursor.index = offset;
            }
            self.index.insert((dep.clone(), offset), self.cursors.len());
            self.cursors.push(*rid);
            self.positions.push(position);
        }
        self.groups.push((dep.clone(), position));
    }

    /// Fix the merge order: dependency position first, then smaller cursors first.
    pub(crate) fn finish(&mut self, references: &[Reference]) {
        let count = |rid: RefId| {
            references[rid.index()]
                .cursor()
                .map_or(0, |cursor| cursor.count)
        };
        let mut order: Vec<usize> = (0..self.cursors.len()).collect();
        order.sort_by_key(|&p| (self.positions[p], count(self.cursors[p])));
        self.order = order;
    }

    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }

    /// Flat cursor sequence in insertion order.
    pub fn cursors(&self) -> &[RefId] {
        &self.cursors
    }

    /// The `offset`-th cursor that follows `dep`.
    pub fn lookup(&self, dep: &VarId, offset: usize) -> Option<RefId> {
        self.index
            .get(&(dep.clone(), offset))
            .map(|&p| self.cursors[p])
    }

    /// Every cursor that follows `dep`, by offset.
    pub fn cursors_for<'a>(&'a self, dep: &VarId) -> impl Iterator<Item = RefId> + 'a {
        let start = (dep.clone(), 0);
        let dep = dep.clone();
        self.index
            .range(start..)
            .take_while(move |((d, _), _)| *d == dep)
            .map(|(_, &p)| self.cursors[p])
    }

    /// Merge order as flat positions.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn in_merge_order(&self) -> impl Iterator<Item = RefId> + '_ {
        self.order.iter().map(|&p| self.cursors[p])
    }

    /// `(dependency, evaluation position)` per absorbed group.
    pub fn groups(&self) -> &[(VarId, usize)] {
        &self.groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::Cursor;
    use styx_core::{Node, Permutation, Term};

    fn probed(count: u64) -> Reference {
        let mut r = Reference::new(
            "@default",
            0,
            Permutation::Object,
            Some(Term::var("a")),
            Some(Node::iri("p").into()),
        );
        r.attach(Cursor::probed(Vec::new(), count)).unwrap();
        r
    }

    #[test]
    fn merge_order_is_position_then_count() {
        let mut references = vec![probed(9), probed(3), probed(5)];
        let (a, b) = (VarId::new("a"), VarId::new("b"));

        let mut past = Past::new();
        past.push(&b, 1, &[RefId::new(0)], &mut references);
        past.push(&a, 0, &[RefId::new(1), RefId::new(2)], &mut references);
        past.finish(&references);

        assert_eq!(past.order(), &[1, 2, 0]);
        let merged: Vec<RefId> = past.in_merge_order().collect();
        assert_eq!(merged, vec![RefId::new(1), RefId::new(2), RefId::new(0)]);

        assert_eq!(past.lookup(&a, 1), Some(RefId::new(2)));
        assert_eq!(past.lookup(&a, 2), None);
        let for_a: Vec<RefId> = past.cursors_for(&a).collect();
        assert_eq!(for_a, vec![RefId::new(1), RefId::new(2)]);

        let cursor = references[2].cursor().unwrap();
        assert_eq!(cursor.id, Some(a.clone()));
        assert_eq!(cursor.index, 1);
        assert_eq!(past.groups(), &[(b, 1), (a, 0)]);
    }
}
