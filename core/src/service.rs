use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use crate::error::{IndexError, ServiceError};
use crate::index::{DocId, InvertedIndex};
use crate::persist::{load_snapshot, save_snapshot};
use crate::query::{evaluate, QueryOutcome};

/// One batch of index mutations. Both ingestion shapes are supported:
/// raw documents (tokenized here) and pre-tokenized `term -> ids` merges;
/// `texts` go in under service-assigned IDs, `documents` under the
/// caller's own IDs.
#[derive(Debug, Default, Clone)]
pub struct Update {
    pub documents: BTreeMap<DocId, String>,
    pub terms: HashMap<String, BTreeSet<DocId>>,
    pub texts: Vec<String>,
}

impl Update {
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty() && self.terms.is_empty() && self.texts.is_empty()
    }
}

/// IDs assigned to the `texts` part of an applied update, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateReceipt {
    pub assigned: Vec<DocId>,
}

/// Concurrency-safe façade over the inverted index.
///
/// The service exclusively owns the in-memory index and the snapshot path.
/// Queries take the shared lock; updates take the exclusive lock for the
/// whole mutation plus the snapshot write, so readers never observe a
/// state that is not yet durable and a cancelled update is never visible
/// half-applied.
pub struct IndexService {
    index: RwLock<InvertedIndex>,
    snapshot_path: PathBuf,
}

impl IndexService {
    /// Load the snapshot at `path` if one exists, else start empty with
    /// the ID counter at 0.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ServiceError> {
        let snapshot_path = path.as_ref().to_path_buf();
        let index = match load_snapshot(&snapshot_path)? {
            Some(index) => {
                tracing::info!(
                    path = %snapshot_path.display(),
                    num_docs = index.num_docs(),
                    num_terms = index.num_terms(),
                    "loaded index snapshot"
                );
                index
            }
            None => {
                tracing::info!(path = %snapshot_path.display(), "no snapshot, starting empty");
                InvertedIndex::new()
            }
        };
        Ok(Self {
            index: RwLock::new(index),
            snapshot_path,
        })
    }

    pub fn query(&self, text: &str) -> QueryOutcome {
        let index = self.index.read();
        evaluate(&index, text)
    }

    /// Apply a batch of mutations and persist the new snapshot.
    ///
    /// Caller-supplied IDs are validated up front, so a duplicate rejects
    /// the whole batch with the index untouched. Once mutation starts it
    /// runs to completion under the exclusive lock; only the snapshot
    /// write can still fail, leaving the in-memory state ahead of disk.
    pub fn apply(&self, update: Update) -> Result<UpdateReceipt, ServiceError> {
        let mut index = self.index.write();

        // Validate the whole batch first so a bad entry rejects it with
        // nothing applied: IDs must be fresh and below the reserved
        // DocId::MAX, and the texts must fit in the remaining ID space.
        let mut next = index.next_doc_id();
        for &id in update.documents.keys() {
            if id == DocId::MAX {
                return Err(IndexError::DocumentIdOutOfRange(id).into());
            }
            if index.contains_document(id) {
                return Err(IndexError::DuplicateDocument(id).into());
            }
            next = next.max(id + 1);
        }
        for ids in update.terms.values() {
            if let Some(&id) = ids.iter().next_back() {
                if id == DocId::MAX {
                    return Err(IndexError::DocumentIdOutOfRange(id).into());
                }
                next = next.max(id + 1);
            }
        }
        if u64::from(next) + update.texts.len() as u64 > u64::from(DocId::MAX) {
            return Err(IndexError::DocumentIdOutOfRange(DocId::MAX).into());
        }

        for (id, text) in &update.documents {
            index.add_document(*id, text)?;
        }
        index.merge_terms(update.terms)?;
        let mut assigned: Vec<DocId> = Vec::with_capacity(update.texts.len());
        for text in &update.texts {
            assigned.push(index.insert_document(text)?);
        }

        save_snapshot(&self.snapshot_path, &index)?;
        tracing::debug!(
            num_docs = index.num_docs(),
            num_terms = index.num_terms(),
            "index updated"
        );
        Ok(UpdateReceipt { assigned })
    }

    /// Index one document under the next service-assigned ID.
    pub fn index_text(&self, text: &str) -> Result<DocId, ServiceError> {
        let mut index = self.index.write();
        let id = index.insert_document(text)?;
        save_snapshot(&self.snapshot_path, &index)?;
        Ok(id)
    }

    /// Remove a document everywhere it is posted. Idempotent.
    pub fn remove_document(&self, id: DocId) -> Result<(), ServiceError> {
        let mut index = self.index.write();
        index.remove_document(id);
        save_snapshot(&self.snapshot_path, &index)?;
        Ok(())
    }

    /// Retry durability after a `Persistence` failure without re-applying
    /// the update (re-applying would assign fresh document IDs).
    pub fn persist(&self) -> Result<(), ServiceError> {
        let index = self.index.read();
        save_snapshot(&self.snapshot_path, &index)
    }

    pub fn stats(&self) -> (usize, usize) {
        let index = self.index.read();
        (index.num_docs(), index.num_terms())
    }
}
