//! Inverted index engine: tokenizer, postings, AND-intersection query
//! evaluation, snapshot persistence, and the concurrency-safe service
//! façade the transport layer talks to.

pub mod error;
pub mod index;
pub mod persist;
pub mod query;
pub mod service;
pub mod tokenizer;

pub use error::{IndexError, ServiceError};
pub use index::{DocId, InvertedIndex};
pub use query::{evaluate, QueryOutcome};
pub use service::{IndexService, Update, UpdateReceipt};
