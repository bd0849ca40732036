use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::error::IndexError;
use crate::tokenizer::tokenize;

pub type DocId = u32;

/// Mapping from normalized term to the set of documents containing it.
///
/// Postings are `BTreeSet`s so document IDs always come out in ascending
/// order. The struct carries the next-available ID so a restored snapshot
/// never re-assigns an ID that is already in use.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvertedIndex {
    postings: HashMap<String, BTreeSet<DocId>>,
    docs: BTreeSet<DocId>,
    next_doc_id: DocId,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index `text` under a caller-supplied ID. Reusing an ID, or using
    /// the reserved `DocId::MAX`, is rejected before any term is touched,
    /// so a failed call leaves no trace. Keeping `DocId::MAX` out of the
    /// index means the counter bump below can never overflow.
    pub fn add_document(&mut self, id: DocId, text: &str) -> Result<(), IndexError> {
        if id == DocId::MAX {
            return Err(IndexError::DocumentIdOutOfRange(id));
        }
        if self.docs.contains(&id) {
            return Err(IndexError::DuplicateDocument(id));
        }
        for term in tokenize(text) {
            self.postings.entry(term).or_default().insert(id);
        }
        self.docs.insert(id);
        if id >= self.next_doc_id {
            self.next_doc_id = id + 1;
        }
        Ok(())
    }

    /// Index `text` under the next service-assigned ID and return it.
    /// next_doc_id is past every indexed ID, so a fresh assignment never
    /// collides; the only failure is an exhausted ID space (the counter
    /// reached the reserved `DocId::MAX`).
    pub fn insert_document(&mut self, text: &str) -> Result<DocId, IndexError> {
        let id = self.next_doc_id;
        self.add_document(id, text)?;
        Ok(id)
    }

    /// `None` means the term was never indexed; callers must treat that
    /// differently from a term that matches nothing.
    pub fn lookup_term(&self, term: &str) -> Option<&BTreeSet<DocId>> {
        self.postings.get(term)
    }

    /// Drop `id` from every posting list; term keys whose set empties are
    /// deleted. Removing an absent ID is a no-op.
    pub fn remove_document(&mut self, id: DocId) {
        if !self.docs.remove(&id) {
            return;
        }
        self.postings.retain(|_, ids| {
            ids.remove(&id);
            !ids.is_empty()
        });
    }

    /// Merge a pre-tokenized `term -> ids` payload by set union. The IDs
    /// are recorded as live documents so later removals reach them. The
    /// whole payload is validated before any set is touched: the reserved
    /// `DocId::MAX` anywhere rejects the merge with the index unchanged.
    pub fn merge_terms(&mut self, terms: HashMap<String, BTreeSet<DocId>>) -> Result<(), IndexError> {
        for ids in terms.values() {
            if ids.contains(&DocId::MAX) {
                return Err(IndexError::DocumentIdOutOfRange(DocId::MAX));
            }
        }
        for (term, ids) in terms {
            if ids.is_empty() {
                continue;
            }
            for &id in &ids {
                self.docs.insert(id);
                if id >= self.next_doc_id {
                    self.next_doc_id = id + 1;
                }
            }
            self.postings.entry(term).or_default().extend(ids);
        }
        Ok(())
    }

    pub fn contains_document(&self, id: DocId) -> bool {
        self.docs.contains(&id)
    }

    pub fn num_docs(&self) -> usize {
        self.docs.len()
    }

    pub fn num_terms(&self) -> usize {
        self.postings.len()
    }

    pub fn next_doc_id(&self) -> DocId {
        self.next_doc_id
    }

    pub fn serialize(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}
