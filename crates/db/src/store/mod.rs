//! Collection-oriented persistence seam.
//!
//! Services talk to [`DocumentStore`] only; [`MongoStore`] backs it in
//! production and [`MemoryStore`] in tests and local tooling.

mod memory;
mod mongo;
mod query;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

use async_trait::async_trait;
use bson::{oid::ObjectId, Bson, Document};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),
    #[error("Operation on '{collection}' timed out after {timeout:?}")]
    Timeout {
        collection: String,
        timeout: Duration,
    },
    #[error("Unsupported query: {0}")]
    Unsupported(String),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub sort: Option<Document>,
    pub skip: Option<u64>,
    pub limit: Option<i64>,
}

impl FindOptions {
    pub fn sorted(sort: Document) -> Self {
        Self {
            sort: Some(sort),
            ..Self::default()
        }
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// What an aggregate count groups on.
#[derive(Debug, Clone)]
pub enum GroupKey {
    /// The raw value of a field.
    Field(String),
    /// A datetime field truncated to its UTC calendar day (`%Y-%m-%d`).
    Day(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupSort {
    KeyAscending,
    CountDescending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupCount {
    pub key: Bson,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
}

/// Generic document persistence over named collections.
///
/// Filters and updates use MongoDB syntax. Inserts assign an `_id` when the
/// document has none and return it.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
        sort: Option<Document>,
    ) -> StoreResult<Option<Document>>;

    async fn find_many(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> StoreResult<Vec<Document>>;

    async fn insert_one(&self, collection: &str, doc: Document) -> StoreResult<ObjectId>;

    async fn insert_many(&self, collection: &str, docs: Vec<Document>)
    -> StoreResult<Vec<ObjectId>>;

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> StoreResult<UpdateOutcome>;

    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> StoreResult<UpdateOutcome>;

    async fn delete_one(&self, collection: &str, filter: Document) -> StoreResult<u64>;

    async fn delete_many(&self, collection: &str, filter: Document) -> StoreResult<u64>;

    async fn count_documents(&self, collection: &str, filter: Document) -> StoreResult<u64>;

    /// Counts matching documents per group key.
    async fn aggregate_counts(
        &self,
        collection: &str,
        filter: Document,
        key: GroupKey,
        sort: GroupSort,
        limit: Option<i64>,
    ) -> StoreResult<Vec<GroupCount>>;
}

/// Returns the document's `_id`, assigning a fresh one if it has none.
pub(crate) fn ensure_object_id(doc: &mut Document) -> StoreResult<ObjectId> {
    match doc.get("_id") {
        Some(Bson::ObjectId(id)) => Ok(*id),
        Some(other) => Err(StoreError::Unsupported(format!(
            "only ObjectId primary keys are supported, got {other}"
        ))),
        None => {
            let id = ObjectId::new();
            doc.insert("_id", id);
            Ok(id)
        }
    }
}
