use bizchat_db::{DocumentStore, FindOptions, GroupCount, GroupKey, GroupSort, StoreError};
use bson::{doc, oid::ObjectId, Document};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{marker::PhantomData, sync::Arc};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum DaoError {
    #[error("Store error: {0}")]
    Store(StoreError),
    #[error("BSON serialization error: {0}")]
    BsonSer(#[from] bson::ser::Error),
    #[error("BSON deserialization error: {0}")]
    BsonDe(#[from] bson::de::Error),
    #[error("Entity not found")]
    NotFound,
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Validation: {0}")]
    Validation(String),
}

impl From<StoreError> for DaoError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateKey(detail) => {
                debug!(%detail, "Unique index rejected a write");
                DaoError::Conflict("A record with these details already exists".to_string())
            }
            other => DaoError::Store(other),
        }
    }
}

impl From<validator::ValidationErrors> for DaoError {
    fn from(e: validator::ValidationErrors) -> Self {
        DaoError::Validation(crate::validation::describe(&e))
    }
}

pub type DaoResult<T> = Result<T, DaoError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl PaginationParams {
    pub const MAX_PER_PAGE: u64 = 100;

    /// Page at least 1, page size within `1..=MAX_PER_PAGE`.
    pub fn clamped(&self) -> Self {
        Self {
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, Self::MAX_PER_PAGE),
        }
    }
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    25
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

impl<T> PaginatedResult<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PaginatedResult<U> {
        PaginatedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            total_pages: self.total_pages,
        }
    }
}

/// Typed access to one collection of the document store.
pub struct BaseDao<T> {
    store: Arc<dyn DocumentStore>,
    collection: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> BaseDao<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    pub fn new(store: Arc<dyn DocumentStore>, collection: &'static str) -> Self {
        Self {
            store,
            collection,
            _marker: PhantomData,
        }
    }

    pub fn collection_name(&self) -> &'static str {
        self.collection
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    fn decode(doc: Document) -> DaoResult<T> {
        Ok(bson::from_document(doc)?)
    }

    pub async fn find_by_id(&self, id: ObjectId) -> DaoResult<T> {
        self.find_one(doc! { "_id": id })
            .await?
            .ok_or(DaoError::NotFound)
    }

    /// Absent and other-company records are both `NotFound`.
    pub async fn find_by_id_in_company(&self, company_id: ObjectId, id: ObjectId) -> DaoResult<T> {
        self.find_one(doc! { "_id": id, "company_id": company_id })
            .await?
            .ok_or(DaoError::NotFound)
    }

    pub async fn find_one(&self, filter: Document) -> DaoResult<Option<T>> {
        self.find_one_sorted(filter, None).await
    }

    pub async fn find_one_sorted(
        &self,
        filter: Document,
        sort: Option<Document>,
    ) -> DaoResult<Option<T>> {
        self.store
            .find_one(self.collection, filter, sort)
            .await?
            .map(Self::decode)
            .transpose()
    }

    pub async fn find_many(&self, filter: Document, sort: Option<Document>) -> DaoResult<Vec<T>> {
        let options = FindOptions {
            sort,
            ..FindOptions::default()
        };
        self.find_with(filter, options).await
    }

    pub async fn find_with(&self, filter: Document, options: FindOptions) -> DaoResult<Vec<T>> {
        self.store
            .find_many(self.collection, filter, options)
            .await?
            .into_iter()
            .map(Self::decode)
            .collect()
    }

    pub async fn find_paginated(
        &self,
        filter: Document,
        sort: Option<Document>,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<T>> {
        let params = params.clamped();
        let total = self.count(filter.clone()).await?;
        let skip = params
            .page
            .saturating_sub(1)
            .saturating_mul(params.per_page)
            .min(i64::MAX as u64);
        let sort = sort.unwrap_or_else(|| doc! { "created_at": -1 });

        let items = self
            .find_with(
                filter,
                FindOptions::sorted(sort)
                    .skip(skip)
                    .limit(params.per_page as i64),
            )
            .await?;

        Ok(PaginatedResult {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
            total_pages: total.div_ceil(params.per_page),
        })
    }

    pub async fn insert_one(&self, entity: &T) -> DaoResult<ObjectId> {
        let doc = bson::to_document(entity)?;
        let id = self.store.insert_one(self.collection, doc).await?;
        debug!(collection = self.collection, %id, "Inserted document");
        Ok(id)
    }

    pub async fn insert_many(&self, entities: &[T]) -> DaoResult<Vec<ObjectId>> {
        let docs = entities
            .iter()
            .map(bson::to_document)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.store.insert_many(self.collection, docs).await?)
    }

    /// Applies `update` and stamps `updated_at`. Returns whether a document
    /// matched the filter.
    pub async fn update_one(&self, filter: Document, update: Document) -> DaoResult<bool> {
        let update = with_timestamp(update);
        let outcome = self
            .store
            .update_one(self.collection, filter, update)
            .await?;
        Ok(outcome.matched > 0)
    }

    /// Returns the number of matched documents.
    pub async fn update_many(&self, filter: Document, update: Document) -> DaoResult<u64> {
        let update = with_timestamp(update);
        let outcome = self
            .store
            .update_many(self.collection, filter, update)
            .await?;
        Ok(outcome.matched)
    }

    pub async fn update_by_id(&self, id: ObjectId, update: Document) -> DaoResult<bool> {
        self.update_one(doc! { "_id": id }, update).await
    }

    pub async fn delete_one(&self, filter: Document) -> DaoResult<u64> {
        Ok(self.store.delete_one(self.collection, filter).await?)
    }

    pub async fn hard_delete(&self, filter: Document) -> DaoResult<u64> {
        Ok(self.store.delete_many(self.collection, filter).await?)
    }

    pub async fn count(&self, filter: Document) -> DaoResult<u64> {
        Ok(self.store.count_documents(self.collection, filter).await?)
    }

    pub async fn count_by(
        &self,
        filter: Document,
        key: GroupKey,
        sort: GroupSort,
        limit: Option<i64>,
    ) -> DaoResult<Vec<GroupCount>> {
        Ok(self
            .store
            .aggregate_counts(self.collection, filter, key, sort, limit)
            .await?)
    }
}

fn with_timestamp(mut update: Document) -> Document {
    let now = bson::DateTime::now();
    match update.get_document_mut("$set") {
        Ok(set) => {
            set.insert("updated_at", now);
        }
        Err(_) => {
            update.insert("$set", doc! { "updated_at": now });
        }
    }
    update
}

/// Escapes regex metacharacters so user input matches literally.
pub fn escape_regex(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if "\\.+*?()|[]{}^$".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
