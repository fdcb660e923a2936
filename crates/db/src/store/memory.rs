use async_trait::async_trait;
use bson::{oid::ObjectId, Bson, Document};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap, HashSet};

use super::{
    ensure_object_id,
    query::{apply_update, lookup, matches, sort_cmp, sort_documents},
    DocumentStore, FindOptions, GroupCount, GroupKey, GroupSort, StoreError, StoreResult,
    UpdateOutcome,
};

/// In-process [`DocumentStore`].
///
/// Intended for tests and local tooling. Uniqueness is only enforced for
/// `_id`; unique secondary indexes are a MongoDB concern.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    failing_inserts: Mutex<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent insert into `collection` fail with
    /// [`StoreError::Unavailable`] until [`MemoryStore::clear_failures`].
    pub fn fail_inserts(&self, collection: &str) {
        self.failing_inserts.lock().insert(collection.to_string());
    }

    pub fn clear_failures(&self) {
        self.failing_inserts.lock().clear();
    }

    /// Copy of every document currently in `collection`.
    pub fn snapshot(&self, collection: &str) -> Vec<Document> {
        self.collections
            .read()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    fn check_insert(&self, collection: &str) -> StoreResult<()> {
        if self.failing_inserts.lock().contains(collection) {
            return Err(StoreError::Unavailable(format!(
                "injected insert failure on '{collection}'"
            )));
        }
        Ok(())
    }

    fn select(&self, collection: &str, filter: &Document) -> StoreResult<Vec<Document>> {
        let collections = self.collections.read();
        let mut out = Vec::new();
        for doc in collections.get(collection).map(Vec::as_slice).unwrap_or(&[]) {
            if matches(doc, filter)? {
                out.push(doc.clone());
            }
        }
        Ok(out)
    }

    fn update(
        &self,
        collection: &str,
        filter: &Document,
        update: &Document,
        many: bool,
    ) -> StoreResult<UpdateOutcome> {
        let mut collections = self.collections.write();
        let mut outcome = UpdateOutcome::default();
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(outcome);
        };
        for doc in docs.iter_mut() {
            if !matches(doc, filter)? {
                continue;
            }
            let mut candidate = doc.clone();
            let changed = apply_update(&mut candidate, update)?;
            *doc = candidate;
            outcome.matched += 1;
            if changed {
                outcome.modified += 1;
            }
            if !many {
                break;
            }
        }
        Ok(outcome)
    }

    fn delete(&self, collection: &str, filter: &Document, many: bool) -> StoreResult<u64> {
        let mut collections = self.collections.write();
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let mut doomed = Vec::new();
        for (idx, doc) in docs.iter().enumerate() {
            if matches(doc, filter)? {
                doomed.push(idx);
                if !many {
                    break;
                }
            }
        }
        for idx in doomed.iter().rev() {
            docs.remove(*idx);
        }
        Ok(doomed.len() as u64)
    }
}

fn group_value(doc: &Document, key: &GroupKey) -> Bson {
    match key {
        GroupKey::Field(field) => lookup(doc, field).cloned().unwrap_or(Bson::Null),
        GroupKey::Day(field) => match lookup(doc, field) {
            Some(Bson::DateTime(dt)) => {
                Bson::String(dt.to_chrono().format("%Y-%m-%d").to_string())
            }
            _ => Bson::Null,
        },
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
        sort: Option<Document>,
    ) -> StoreResult<Option<Document>> {
        let mut docs = self.select(collection, &filter)?;
        if let Some(sort) = sort {
            sort_documents(&mut docs, &sort);
        }
        Ok(docs.into_iter().next())
    }

    async fn find_many(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> StoreResult<Vec<Document>> {
        let mut docs = self.select(collection, &filter)?;
        if let Some(sort) = options.sort {
            sort_documents(&mut docs, &sort);
        }
        let skip = options.skip.unwrap_or(0) as usize;
        let limit = match options.limit {
            Some(n) if n > 0 => n as usize,
            _ => usize::MAX,
        };
        Ok(docs.into_iter().skip(skip).take(limit).collect())
    }

    async fn insert_one(&self, collection: &str, mut doc: Document) -> StoreResult<ObjectId> {
        self.check_insert(collection)?;
        let id = ensure_object_id(&mut doc)?;
        let mut collections = self.collections.write();
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.iter().any(|d| d.get_object_id("_id").ok() == Some(id)) {
            return Err(StoreError::DuplicateKey(format!("{collection}._id {id}")));
        }
        docs.push(doc);
        Ok(id)
    }

    async fn insert_many(
        &self,
        collection: &str,
        mut docs: Vec<Document>,
    ) -> StoreResult<Vec<ObjectId>> {
        self.check_insert(collection)?;
        let ids = docs
            .iter_mut()
            .map(ensure_object_id)
            .collect::<StoreResult<Vec<_>>>()?;
        let mut collections = self.collections.write();
        let existing = collections.entry(collection.to_string()).or_default();
        for id in &ids {
            if existing.iter().any(|d| d.get_object_id("_id").ok() == Some(*id)) {
                return Err(StoreError::DuplicateKey(format!("{collection}._id {id}")));
            }
        }
        existing.extend(docs);
        Ok(ids)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> StoreResult<UpdateOutcome> {
        self.update(collection, &filter, &update, false)
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> StoreResult<UpdateOutcome> {
        self.update(collection, &filter, &update, true)
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> StoreResult<u64> {
        self.delete(collection, &filter, false)
    }

    async fn delete_many(&self, collection: &str, filter: Document) -> StoreResult<u64> {
        self.delete(collection, &filter, true)
    }

    async fn count_documents(&self, collection: &str, filter: Document) -> StoreResult<u64> {
        Ok(self.select(collection, &filter)?.len() as u64)
    }

    async fn aggregate_counts(
        &self,
        collection: &str,
        filter: Document,
        key: GroupKey,
        sort: GroupSort,
        limit: Option<i64>,
    ) -> StoreResult<Vec<GroupCount>> {
        let docs = self.select(collection, &filter)?;

        // Keyed by the rendered value so heterogenous Bson keys group stably.
        let mut groups: BTreeMap<String, GroupCount> = BTreeMap::new();
        for doc in &docs {
            let value = group_value(doc, &key);
            groups
                .entry(value.to_string())
                .or_insert_with(|| GroupCount {
                    key: value.clone(),
                    count: 0,
                })
                .count += 1;
        }

        let mut rows: Vec<GroupCount> = groups.into_values().collect();
        match sort {
            GroupSort::KeyAscending => rows.sort_by(|a, b| sort_cmp(Some(&a.key), Some(&b.key))),
            GroupSort::CountDescending => rows.sort_by(|a, b| {
                b.count
                    .cmp(&a.count)
                    .then_with(|| sort_cmp(Some(&a.key), Some(&b.key)))
            }),
        }
        if let Some(limit) = limit.filter(|n| *n > 0) {
            rows.truncate(limit as usize);
        }
        Ok(rows)
    }
}
