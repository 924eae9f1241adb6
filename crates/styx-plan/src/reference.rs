//! References: one occurrence of a variable in one statement.
//!
//! References live in an arena owned by the [`crate::CodexMap`] (and later
//! the [`crate::Plan`]) and are addressed by [`RefId`]. The `dual` link of a
//! two-variable statement is an arena index, so both halves can be built
//! before they point at each other.

use serde::{Deserialize, Serialize};
use std::fmt;

use styx_core::key::{major_key, minor_key, value_prefix};
use styx_core::{GraphName, Node, Permutation, Term, VarId};
use styx_store::{candidate_values, ReadTxn, StoreError};

use crate::error::{PlanError, PlanResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefId(usize);

impl RefId {
    pub(crate) const fn new(raw: usize) -> Self {
        Self(raw)
    }

    pub const fn index(self) -> usize {
        self.0
    }
}

/// Iteration state attached to a reference by the probe phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    /// Number of candidates behind the probed key.
    pub count: u64,
    /// The earlier variable this cursor is advanced with, once it is a `past` cursor.
    pub id: Option<VarId>,
    /// Offset of the reference within that variable's group.
    pub index: usize,
    /// The probed count key.
    pub key: Vec<u8>,
}

impl Cursor {
    pub(crate) fn probed(key: Vec<u8>, count: u64) -> Self {
        Self {
            count,
            id: None,
            index: 0,
            key,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Reference {
    pub graph: GraphName,
    pub index: usize,
    pub permutation: Permutation,
    /// First key slot (`M`); `None` for constraint and constant references.
    pub known_a: Option<Term>,
    /// Second key slot (`N`); the lone constant of a constraint reference.
    pub known_b: Option<Term>,
    /// The other half of a two-variable statement.
    pub dual: Option<RefId>,
    cursor: Option<Cursor>,
}

impl Reference {
    pub fn new(
        graph: &str,
        index: usize,
        permutation: Permutation,
        known_a: Option<Term>,
        known_b: Option<Term>,
    ) -> Self {
        Self {
            graph: graph.to_string(),
            index,
            permutation,
            known_a,
            known_b,
            dual: None,
            cursor: None,
        }
    }

    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    pub(crate) fn cursor_mut(&mut self) -> Option<&mut Cursor> {
        self.cursor.as_mut()
    }

    /// Attach the probed cursor. A reference is probed at most once.
    pub(crate) fn attach(&mut self, cursor: Cursor) -> PlanResult<()> {
        if self.cursor.is_some() {
            return Err(PlanError::AlreadyProbed);
        }
        self.cursor = Some(cursor);
        Ok(())
    }

    /// Drop the cursor, returning whether one was attached.
    pub(crate) fn release(&mut self) -> bool {
        self.cursor.take().is_some()
    }

    fn known_nodes(&self) -> Option<(&Node, &Node)> {
        match (&self.known_a, &self.known_b) {
            (Some(Term::Node(m)), Some(Term::Node(n))) => Some((m, n)),
            _ => None,
        }
    }

    /// The variable in the key slots, for the half of a two-variable statement.
    pub fn other(&self) -> Option<&VarId> {
        [&self.known_a, &self.known_b]
            .into_iter()
            .find_map(|t| t.as_ref().and_then(Term::as_var))
    }

    /// Key whose counter sizes this reference's candidate set.
    ///
    /// Two known constants read the minor counter of the rotation; one
    /// constant next to a variable reads the major counter of the constant's
    /// absolute position. Constraint and constant references have no count key.
    pub fn count_key(&self) -> Option<Vec<u8>> {
        let unknown = self.permutation.unknown()?;
        let (pm, pn) = self.permutation.key_positions()?;
        match (self.known_a.as_ref()?, self.known_b.as_ref()?) {
            (Term::Node(m), Term::Node(n)) => Some(minor_key(unknown, m, n)),
            (Term::Var(_), Term::Node(n)) => Some(major_key(pn, n)),
            (Term::Node(m), Term::Var(_)) => Some(major_key(pm, m)),
            (Term::Var(_), Term::Var(_)) => None,
        }
    }

    /// Value-key prefix for the candidates of a single reference.
    pub fn value_prefix(&self) -> Option<Vec<u8>> {
        let unknown = self.permutation.unknown()?;
        let (m, n) = self.known_nodes()?;
        Some(value_prefix(unknown, m, n))
    }

    /// Value-key prefix once the other variable is bound to `binding`.
    ///
    /// This is where an enumerator re-seeks a `past` cursor.
    pub fn seek_prefix(&self, binding: &Node) -> Option<Vec<u8>> {
        let unknown = self.permutation.unknown()?;
        let resolve = |t: &Option<Term>| match t {
            Some(Term::Node(n)) => Some(n.clone()),
            Some(Term::Var(_)) => Some(binding.clone()),
            None => None,
        };
        let m = resolve(&self.known_a)?;
        let n = resolve(&self.known_b)?;
        Some(value_prefix(unknown, &m, &n))
    }

    /// Encoded candidate values of a single reference, ascending.
    pub fn candidate_values<T: ReadTxn + ?Sized>(
        &self,
        txn: &T,
    ) -> Result<Option<Vec<Vec<u8>>>, StoreError> {
        let (Some(unknown), Some((m, n))) = (self.permutation.unknown(), self.known_nodes()) else {
            return Ok(None);
        };
        candidate_values(txn, unknown, m, n).map(Some)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = |t: &Option<Term>| match t {
            Some(t) => t.to_string(),
            None => "-".to_string(),
        };
        write!(
            f,
            "{}[{}] {} ({}, {})",
            self.graph,
            self.index,
            self.permutation,
            slot(&self.known_a),
            slot(&self.known_b)
        )?;
        if let Some(cursor) = &self.cursor {
            write!(f, " #{}", cursor.count)?;
        }
        Ok(())
    }
}
