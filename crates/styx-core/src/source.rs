//! Provenance records stored under value keys.

use serde::{Deserialize, Serialize};

/// "This statement appeared in document `document`, sub-graph `graph`, at `index`."
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Source {
    pub document: String,
    pub graph: String,
    pub index: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceList {
    pub sources: Vec<Source>,
}

impl SourceList {
    /// Add `source` unless already listed. Returns whether it was added.
    pub fn insert(&mut self, source: Source) -> bool {
        match self.sources.binary_search(&source) {
            Ok(_) => false,
            Err(at) => {
                self.sources.insert(at, source);
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ciborium::ser::Error<std::io::Error>> {
        let mut out = Vec::new();
        ciborium::ser::into_writer(self, &mut out)?;
        Ok(out)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ciborium::de::Error<std::io::Error>> {
        ciborium::de::from_reader(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_keeps_sources_sorted_and_unique() {
        let mut list = SourceList::default();
        let a = Source {
            document: "doc".into(),
            graph: "@default".into(),
            index: 3,
        };
        let b = Source {
            index: 1,
            ..a.clone()
        };
        assert!(list.insert(a.clone()));
        assert!(list.insert(b.clone()));
        assert!(!list.insert(a.clone()));
        assert_eq!(list.sources, vec![b, a]);

        let bytes = list.to_bytes().unwrap();
        assert_eq!(SourceList::from_bytes(&bytes).unwrap(), list);
    }
}
