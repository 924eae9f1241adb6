//! Index writer: ground statements into value and count entries.
//!
//! For each statement `(s, p, o)` of a document the writer
//!
//! 1. appends a [`Source`] to the value entry of all three rotations, and
//! 2. when the statement is new to the store, bumps the three minor counters
//!    `(M, N)` and the three major counters `(q, node)`.
//!
//! Counts are per distinct statement, so indexing the same document twice
//! (or the same statement from two graphs) leaves them unchanged.

use styx_core::key::{encode_count, major_key, minor_key, rotate, value_key};
use styx_core::{Dataset, Node, Position, Source, SourceList, Term};

use crate::probe::read_count;
use crate::{KvStore, ReadTxn, StoreError, WriteTxn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexReport {
    /// Statements visited.
    pub statements: usize,
    /// Statements that were not yet in the store.
    pub inserted: usize,
}

pub struct IndexWriter<'s, S: KvStore> {
    store: &'s S,
    document: String,
}

impl<'s, S: KvStore> IndexWriter<'s, S> {
    pub fn new(store: &'s S, document: impl Into<String>) -> Self {
        Self {
            store,
            document: document.into(),
        }
    }

    /// Blank nodes in stored data become document-scoped identifiers.
    fn ground(&self, term: &Term) -> Node {
        match term {
            Term::Node(node) => node.clone(),
            Term::Var(v) => Node::Iri(format!("{}#_:{}", self.document, v.as_str())),
        }
    }

    /// Index every statement of `dataset` in one atomic update.
    pub fn index(&self, dataset: &Dataset) -> Result<IndexReport, StoreError> {
        let report = self.store.update(|txn| {
            let mut report = IndexReport::default();
            for (graph, index, statement) in dataset.iter() {
                let triple = [
                    self.ground(&statement.subject),
                    self.ground(&statement.predicate),
                    self.ground(&statement.object),
                ];
                let source = Source {
                    document: self.document.clone(),
                    graph: graph.to_string(),
                    index: ordinal(graph, index)?,
                };
                report.statements += 1;
                if self.insert(txn, &triple, source)? {
                    report.inserted += 1;
                }
            }
            Ok::<_, StoreError>(report)
        })?;

        tracing::debug!(
            document = %self.document,
            statements = report.statements,
            inserted = report.inserted,
            "indexed dataset"
        );
        Ok(report)
    }

    /// Returns whether the statement was new.
    fn insert(
        &self,
        txn: &mut dyn WriteTxn,
        triple: &[Node; 3],
        source: Source,
    ) -> Result<bool, StoreError> {
        let refs = [&triple[0], &triple[1], &triple[2]];

        // All three rotations are written together, so one probe decides.
        let (m, n, u) = rotate(refs, Position::Subject);
        let is_new = txn.get(&value_key(Position::Subject, m, n, u))?.is_none();

        for unknown in Position::ALL {
            let (m, n, u) = rotate(refs, unknown);
            let key = value_key(unknown, m, n, u);
            let mut list = match txn.get(&key)? {
                Some(bytes) => SourceList::from_bytes(&bytes)
                    .map_err(|e| StoreError::Codec(e.to_string()))?,
                None => SourceList::default(),
            };
            if list.insert(source.clone()) {
                let bytes = list
                    .to_bytes()
                    .map_err(|e| StoreError::Codec(e.to_string()))?;
                txn.put(key, bytes)?;
            }
        }

        if !is_new {
            return Ok(false);
        }

        for unknown in Position::ALL {
            let (m, n, _) = rotate(refs, unknown);
            increment(txn, minor_key(unknown, m, n))?;
        }
        for position in Position::ALL {
            increment(txn, major_key(position, &triple[position.index()]))?;
        }
        Ok(true)
    }
}

/// Statement ordinals are stored as `u32`.
fn ordinal(graph: &str, index: usize) -> Result<u32, StoreError> {
    u32::try_from(index)
        .map_err(|_| StoreError::Codec(format!("statement ordinal {index} in {graph} exceeds u32")))
}

fn increment(txn: &mut dyn WriteTxn, key: Vec<u8>) -> Result<(), StoreError> {
    let count = read_count(&*txn, &key)?;
    txn.put(key, encode_count(count + 1).to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use styx_core::Statement;

    fn sample() -> Dataset {
        let mut ds = Dataset::new();
        ds.push(Statement::new(
            Node::iri("joel"),
            Node::iri("name"),
            Node::literal("Joel"),
        ));
        ds.push(Statement::new(
            Node::iri("joel"),
            Node::iri("friend"),
            Term::var("b0"),
        ));
        ds
    }

    #[test]
    fn counts_are_per_distinct_statement() {
        let store = MemoryStore::new();
        let writer = IndexWriter::new(&store, "doc");
        let first = writer.index(&sample()).unwrap();
        assert_eq!(first, IndexReport { statements: 2, inserted: 2 });

        let again = writer.index(&sample()).unwrap();
        assert_eq!(again.inserted, 0);

        let snap = store.view().unwrap();
        let joel = Node::iri("joel");
        assert_eq!(
            read_count(&snap, &major_key(Position::Subject, &joel)).unwrap(),
            2
        );
        assert_eq!(
            read_count(
                &snap,
                &minor_key(Position::Subject, &Node::iri("name"), &Node::literal("Joel"))
            )
            .unwrap(),
            1
        );
    }

    #[test]
    fn ordinal_rejects_overflow() {
        assert_eq!(ordinal("g", 7).unwrap(), 7);
        assert_eq!(ordinal("g", u32::MAX as usize).unwrap(), u32::MAX);
        if let Ok(past_max) = usize::try_from(u64::from(u32::MAX) + 1) {
            assert!(matches!(
                ordinal("g", past_max),
                Err(StoreError::Codec(msg)) if msg.contains("exceeds u32")
            ));
        }
    }

    #[test]
    fn blank_nodes_are_scoped_to_the_document() {
        let store = MemoryStore::new();
        IndexWriter::new(&store, "doc").index(&sample()).unwrap();
        let snap = store.view().unwrap();
        let key = value_key(
            Position::Object,
            &Node::iri("joel"),
            &Node::iri("friend"),
            &Node::iri("doc#_:b0"),
        );
        let bytes = snap.get(&key).unwrap().expect("value entry");
        let list = SourceList::from_bytes(&bytes).unwrap();
        assert_eq!(list.sources[0].index, 1);
    }
}
