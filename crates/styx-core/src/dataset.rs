//! Statements grouped into named sub-graphs.

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::permutation::Position;
use crate::term::{Term, VarId};

/// Name of the graph statements land in when none is given.
pub const DEFAULT_GRAPH: &str = "@default";

pub type GraphName = String;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Statement {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
}

impl Statement {
    pub fn new(subject: impl Into<Term>, predicate: impl Into<Term>, object: impl Into<Term>) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }

    pub fn get(&self, position: Position) -> &Term {
        match position {
            Position::Subject => &self.subject,
            Position::Predicate => &self.predicate,
            Position::Object => &self.object,
        }
    }

    pub fn terms(&self) -> [&Term; 3] {
        [&self.subject, &self.predicate, &self.object]
    }

    /// Variables of this statement in position order (repeats included).
    pub fn vars(&self) -> impl Iterator<Item = &VarId> {
        self.terms().into_iter().filter_map(Term::as_var)
    }

    pub fn is_ground(&self) -> bool {
        self.vars().next().is_none()
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}

/// A deduplicated set of statements per sub-graph.
///
/// Graphs iterate by name and statements keep their insertion index, so the
/// `(graph, index)` pair of a statement is stable for the life of the dataset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<GraphName, Vec<Statement>>",
    into = "BTreeMap<GraphName, Vec<Statement>>"
)]
pub struct Dataset {
    graphs: BTreeMap<GraphName, Vec<Statement>>,
    seen: AHashMap<GraphName, AHashSet<Statement>>,
}

impl PartialEq for Dataset {
    fn eq(&self, other: &Self) -> bool {
        self.graphs == other.graphs
    }
}

impl Eq for Dataset {}

impl From<BTreeMap<GraphName, Vec<Statement>>> for Dataset {
    fn from(graphs: BTreeMap<GraphName, Vec<Statement>>) -> Self {
        let mut dataset = Dataset::new();
        for (graph, statements) in graphs {
            for statement in statements {
                dataset.insert(&graph, statement);
            }
        }
        dataset
    }
}

impl From<Dataset> for BTreeMap<GraphName, Vec<Statement>> {
    fn from(dataset: Dataset) -> Self {
        dataset.graphs
    }
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert into `graph`. Returns `false` if the statement was already present.
    pub fn insert(&mut self, graph: &str, statement: Statement) -> bool {
        let seen = self.seen.entry(graph.to_string()).or_default();
        if !seen.insert(statement.clone()) {
            return false;
        }
        self.graphs
            .entry(graph.to_string())
            .or_default()
            .push(statement);
        true
    }

    /// Insert into the default graph.
    pub fn push(&mut self, statement: Statement) -> bool {
        self.insert(DEFAULT_GRAPH, statement)
    }

    pub fn graph(&self, name: &str) -> Option<&[Statement]> {
        self.graphs.get(name).map(Vec::as_slice)
    }

    pub fn statement(&self, graph: &str, index: usize) -> Option<&Statement> {
        self.graphs.get(graph)?.get(index)
    }

    pub fn graphs(&self) -> impl Iterator<Item = (&str, &[Statement])> {
        self.graphs
            .iter()
            .map(|(name, statements)| (name.as_str(), statements.as_slice()))
    }

    /// All statements as `(graph, index, statement)` in graph-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize, &Statement)> {
        self.graphs.iter().flat_map(|(name, statements)| {
            statements
                .iter()
                .enumerate()
                .map(move |(i, s)| (name.as_str(), i, s))
        })
    }

    pub fn len(&self) -> usize {
        self.graphs.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<Statement> for Dataset {
    fn from_iter<I: IntoIterator<Item = Statement>>(iter: I) -> Self {
        let mut dataset = Dataset::new();
        for statement in iter {
            dataset.push(statement);
        }
        dataset
    }
}
