use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Bson, Document};
use futures::TryStreamExt;
use mongodb::{
    error::{ErrorKind, WriteFailure},
    Collection, Database,
};
use std::{future::Future, time::Duration};
use tracing::debug;

use super::{
    ensure_object_id, DocumentStore, FindOptions, GroupCount, GroupKey, GroupSort, StoreError,
    StoreResult, UpdateOutcome,
};

const DUPLICATE_KEY: i32 = 11000;

/// [`DocumentStore`] over a MongoDB database. Every operation is bounded by
/// `op_timeout`.
#[derive(Clone)]
pub struct MongoStore {
    db: Database,
    op_timeout: Duration,
}

impl MongoStore {
    pub fn new(db: Database, op_timeout: Duration) -> Self {
        Self { db, op_timeout }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection::<Document>(name)
    }

    async fn bounded<T, F>(&self, collection: &str, fut: F) -> StoreResult<T>
    where
        F: Future<Output = Result<T, mongodb::error::Error>>,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(result) => result.map_err(classify),
            Err(_) => Err(StoreError::Timeout {
                collection: collection.to_string(),
                timeout: self.op_timeout,
            }),
        }
    }
}

fn classify(e: mongodb::error::Error) -> StoreError {
    let duplicate = match e.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY =>
        {
            Some(write_error.message.clone())
        }
        ErrorKind::InsertMany(failure) => failure
            .write_errors
            .as_ref()
            .and_then(|errors| errors.iter().find(|we| we.code == DUPLICATE_KEY))
            .map(|we| we.message.clone()),
        _ => None,
    };
    match duplicate {
        Some(message) => StoreError::DuplicateKey(message),
        None => StoreError::Mongo(e),
    }
}

fn count_from(doc: &Document) -> u64 {
    match doc.get("count") {
        Some(Bson::Int32(n)) => u64::try_from(*n).unwrap_or(0),
        Some(Bson::Int64(n)) => u64::try_from(*n).unwrap_or(0),
        Some(Bson::Double(n)) if *n >= 0.0 => *n as u64,
        _ => 0,
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
        sort: Option<Document>,
    ) -> StoreResult<Option<Document>> {
        let coll = self.collection(collection);
        let mut action = coll.find_one(filter);
        if let Some(sort) = sort {
            action = action.sort(sort);
        }
        self.bounded(collection, async { action.await }).await
    }

    async fn find_many(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> StoreResult<Vec<Document>> {
        let coll = self.collection(collection);
        let mut action = coll.find(filter);
        if let Some(sort) = options.sort {
            action = action.sort(sort);
        }
        if let Some(skip) = options.skip {
            action = action.skip(skip);
        }
        if let Some(limit) = options.limit {
            action = action.limit(limit);
        }
        self.bounded(collection, async {
            let cursor = action.await?;
            cursor.try_collect::<Vec<Document>>().await
        })
        .await
    }

    async fn insert_one(&self, collection: &str, mut doc: Document) -> StoreResult<ObjectId> {
        let id = ensure_object_id(&mut doc)?;
        let coll = self.collection(collection);
        self.bounded(collection, async { coll.insert_one(doc).await })
            .await?;
        debug!(collection, %id, "Inserted document");
        Ok(id)
    }

    async fn insert_many(
        &self,
        collection: &str,
        mut docs: Vec<Document>,
    ) -> StoreResult<Vec<ObjectId>> {
        if docs.is_empty() {
            return Ok(Vec::new());
        }
        let ids = docs
            .iter_mut()
            .map(ensure_object_id)
            .collect::<StoreResult<Vec<_>>>()?;
        let coll = self.collection(collection);
        self.bounded(collection, async { coll.insert_many(docs).await })
            .await?;
        debug!(collection, count = ids.len(), "Inserted documents");
        Ok(ids)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> StoreResult<UpdateOutcome> {
        let coll = self.collection(collection);
        let result = self
            .bounded(collection, async { coll.update_one(filter, update).await })
            .await?;
        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> StoreResult<UpdateOutcome> {
        let coll = self.collection(collection);
        let result = self
            .bounded(collection, async { coll.update_many(filter, update).await })
            .await?;
        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> StoreResult<u64> {
        let coll = self.collection(collection);
        let result = self
            .bounded(collection, async { coll.delete_one(filter).await })
            .await?;
        Ok(result.deleted_count)
    }

    async fn delete_many(&self, collection: &str, filter: Document) -> StoreResult<u64> {
        let coll = self.collection(collection);
        let result = self
            .bounded(collection, async { coll.delete_many(filter).await })
            .await?;
        Ok(result.deleted_count)
    }

    async fn count_documents(&self, collection: &str, filter: Document) -> StoreResult<u64> {
        let coll = self.collection(collection);
        self.bounded(collection, async { coll.count_documents(filter).await })
            .await
    }

    async fn aggregate_counts(
        &self,
        collection: &str,
        filter: Document,
        key: GroupKey,
        sort: GroupSort,
        limit: Option<i64>,
    ) -> StoreResult<Vec<GroupCount>> {
        let group_id = match key {
            GroupKey::Field(field) => Bson::String(format!("${field}")),
            GroupKey::Day(field) => Bson::Document(doc! {
                "$dateToString": { "format": "%Y-%m-%d", "date": format!("${field}") }
            }),
        };
        let sort_stage = match sort {
            GroupSort::KeyAscending => doc! { "_id": 1 },
            GroupSort::CountDescending => doc! { "count": -1, "_id": 1 },
        };

        let mut pipeline = vec![
            doc! { "$match": filter },
            doc! { "$group": { "_id": group_id, "count": { "$sum": 1 } } },
            doc! { "$sort": sort_stage },
        ];
        if let Some(limit) = limit {
            pipeline.push(doc! { "$limit": limit });
        }

        let coll = self.collection(collection);
        let rows = self
            .bounded(collection, async {
                let cursor = coll.aggregate(pipeline).await?;
                cursor.try_collect::<Vec<Document>>().await
            })
            .await?;

        Ok(rows
            .iter()
            .map(|row| GroupCount {
                key: row.get("_id").cloned().unwrap_or(Bson::Null),
                count: count_from(row),
            })
            .collect())
    }
}
