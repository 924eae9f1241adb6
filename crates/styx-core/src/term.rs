//! Nodes, variables, and the terms that mix them.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Variables
// ============================================================================

/// Identifier of an unresolved blank node.
///
/// Ordering and hashing are by label; nothing observable depends on the
/// iteration order of a hash map keyed by `VarId`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VarId(String);

impl VarId {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_:{}", self.0)
    }
}

impl From<&str> for VarId {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

// ============================================================================
// Constant nodes
// ============================================================================

/// A constant value: an identifier or a literal with an optional annotation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Node {
    Iri(String),
    Literal {
        value: String,
        #[serde(default)]
        datatype: Option<String>,
        #[serde(default)]
        language: Option<String>,
    },
}

impl Node {
    pub fn iri(iri: impl Into<String>) -> Self {
        Node::Iri(iri.into())
    }

    /// Plain literal with no annotation.
    pub fn literal(value: impl Into<String>) -> Self {
        Node::Literal {
            value: value.into(),
            datatype: None,
            language: None,
        }
    }

    pub fn typed(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Node::Literal {
            value: value.into(),
            datatype: Some(datatype.into()),
            language: None,
        }
    }

    pub fn lang(value: impl Into<String>, language: impl Into<String>) -> Self {
        Node::Literal {
            value: value.into(),
            datatype: None,
            language: Some(language.into()),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Iri(iri) => write!(f, "<{iri}>"),
            Node::Literal {
                value,
                language: Some(lang),
                ..
            } => write!(f, "{value:?}@{lang}"),
            Node::Literal {
                value,
                datatype: Some(dt),
                ..
            } => write!(f, "{value:?}^^<{dt}>"),
            Node::Literal { value, .. } => write!(f, "{value:?}"),
        }
    }
}

// ============================================================================
// Terms
// ============================================================================

/// One position of a statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Term {
    Var(VarId),
    Node(Node),
}

impl Term {
    pub fn var(label: impl Into<String>) -> Self {
        Term::Var(VarId::new(label))
    }

    pub fn as_var(&self) -> Option<&VarId> {
        match self {
            Term::Var(v) => Some(v),
            Term::Node(_) => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Term::Var(_) => None,
            Term::Node(n) => Some(n),
        }
    }

    pub fn is_var(&self) -> bool {
        matches!(self, Term::Var(_))
    }
}

impl From<Node> for Term {
    fn from(node: Node) -> Self {
        Term::Node(node)
    }
}

impl From<VarId> for Term {
    fn from(var: VarId) -> Self {
        Term::Var(var)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Var(v) => v.fmt(f),
            Term::Node(n) => n.fmt(f),
        }
    }
}
