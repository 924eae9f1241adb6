//! Styx core: the shared vocabulary of the indexer and the planner.
//!
//! Graph data is a set of subject/predicate/object statements grouped into
//! named sub-graphs. Positions hold either a constant [`Node`] or a variable
//! ([`VarId`], a blank node left unresolved). The same model is used on both
//! sides of the store:
//!
//! - the index writer (`styx-store`) turns constant statements into count and
//!   value entries, and
//! - the planner (`styx-plan`) turns a pattern containing variables into
//!   lookup keys against those entries.
//!
//! The byte layout both sides agree on lives in [`key`].

pub mod dataset;
pub mod key;
pub mod permutation;
pub mod source;
pub mod term;

pub use dataset::{Dataset, GraphName, Statement, DEFAULT_GRAPH};
pub use key::{decode_node, encode_node, KeyError};
pub use permutation::{Permutation, Position};
pub use source::{Source, SourceList};
pub use term::{Node, Term, VarId};
