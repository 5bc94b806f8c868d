//! Atomic-batch key/value document store capability.
//!
//! Items live in partitions (`pk`) ordered by sort key (`sk`). Reads are
//! point or range queries; a batch of reads is served from one consistent
//! view and a batch of writes applies completely or not at all.

use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;
use tokio::sync::RwLock;

/// Per-batch item limit of the underlying store.
pub const DEFAULT_MAX_BATCH_ITEMS: usize = 25;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Deserialization error: {0}")]
    Deserialization(String),
    #[error("Batch of {items} items exceeds the limit of {limit}")]
    BatchTooLarge { items: usize, limit: usize },
}

impl From<rocksdb::Error> for StoreError {
    fn from(e: rocksdb::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

/// A stored item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub pk: String,
    pub sk: String,
    pub value: Vec<u8>,
}

/// Sort-key predicate of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortKeyCondition {
    /// Every item in the partition
    Any,
    Eq(String),
    BeginsWith(String),
    Gte(String),
    /// `prefix <= sk < upper`, with `sk` starting with `prefix`
    Below { prefix: String, upper: String },
}

impl SortKeyCondition {
    pub fn matches(&self, sk: &str) -> bool {
        match self {
            SortKeyCondition::Any => true,
            SortKeyCondition::Eq(key) => sk == key,
            SortKeyCondition::BeginsWith(prefix) => sk.starts_with(prefix.as_str()),
            SortKeyCondition::Gte(key) => sk >= key.as_str(),
            SortKeyCondition::Below { prefix, upper } => {
                sk.starts_with(prefix.as_str()) && sk < upper.as_str()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// A point or range read within one partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub pk: String,
    pub sk: SortKeyCondition,
    pub order: SortOrder,
    pub limit: Option<usize>,
}

impl Query {
    /// Point lookup.
    pub fn get(pk: impl Into<String>, sk: impl Into<String>) -> Self {
        Self {
            pk: pk.into(),
            sk: SortKeyCondition::Eq(sk.into()),
            order: SortOrder::Ascending,
            limit: Some(1),
        }
    }

    pub fn range(pk: impl Into<String>, sk: SortKeyCondition) -> Self {
        Self {
            pk: pk.into(),
            sk,
            order: SortOrder::Ascending,
            limit: None,
        }
    }

    pub fn descending(mut self) -> Self {
        self.order = SortOrder::Descending;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Filter, order and cap a partition scanned in ascending sort-key order.
    pub(crate) fn select<I>(&self, partition: I) -> Vec<Item>
    where
        I: Iterator<Item = (String, Vec<u8>)>,
    {
        let matching = partition.filter(|(sk, _)| self.sk.matches(sk));
        let selected: Vec<(String, Vec<u8>)> = match self.order {
            SortOrder::Ascending => match self.limit {
                Some(limit) => matching.take(limit).collect(),
                None => matching.collect(),
            },
            SortOrder::Descending => {
                let mut all: Vec<_> = matching.collect();
                all.reverse();
                if let Some(limit) = self.limit {
                    all.truncate(limit);
                }
                all
            }
        };

        selected
            .into_iter()
            .map(|(sk, value)| Item {
                pk: self.pk.clone(),
                sk,
                value,
            })
            .collect()
    }
}

/// A mutation inside an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Create or fully replace an item
    Put(Item),
    Delete { pk: String, sk: String },
}

impl WriteOp {
    pub fn delete(pk: impl Into<String>, sk: impl Into<String>) -> Self {
        WriteOp::Delete {
            pk: pk.into(),
            sk: sk.into(),
        }
    }
}

/// Atomic-batch document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Execute reads as one unit. Result slots follow input order.
    async fn batch_read(&self, queries: &[Query]) -> Result<Vec<Vec<Item>>, StoreError>;

    /// Apply every mutation or none.
    async fn batch_write(&self, ops: Vec<WriteOp>) -> Result<(), StoreError>;

    async fn read(&self, query: &Query) -> Result<Vec<Item>, StoreError> {
        let mut results = self.batch_read(std::slice::from_ref(query)).await?;
        Ok(results.pop().unwrap_or_default())
    }

    /// Largest batch [`batch_write`](DocumentStore::batch_write) accepts.
    fn max_batch_items(&self) -> usize {
        DEFAULT_MAX_BATCH_ITEMS
    }
}

/// In-process store: an ordered map behind an async lock.
///
/// A batch holds the write guard for its whole duration, so readers
/// never observe a partially applied batch.
pub struct MemoryStore {
    items: RwLock<BTreeMap<(String, String), Vec<u8>>>,
    max_batch_items: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_batch_limit(DEFAULT_MAX_BATCH_ITEMS)
    }

    pub fn with_batch_limit(max_batch_items: usize) -> Self {
        Self {
            items: RwLock::new(BTreeMap::new()),
            max_batch_items,
        }
    }

    /// Total number of stored items.
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    /// Number of items in one partition.
    pub async fn partition_len(&self, pk: &str) -> usize {
        let items = self.items.read().await;
        items
            .range((pk.to_string(), String::new())..)
            .take_while(|((item_pk, _), _)| item_pk == pk)
            .count()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn batch_read(&self, queries: &[Query]) -> Result<Vec<Vec<Item>>, StoreError> {
        let items = self.items.read().await;
        let results = queries
            .iter()
            .map(|query| {
                let partition = items
                    .range((query.pk.clone(), String::new())..)
                    .take_while(|((pk, _), _)| *pk == query.pk)
                    .map(|((_, sk), value)| (sk.clone(), value.clone()));
                query.select(partition)
            })
            .collect();
        Ok(results)
    }

    fn max_batch_items(&self) -> usize {
        self.max_batch_items
    }

    async fn batch_write(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        if ops.len() > self.max_batch_items {
            return Err(StoreError::BatchTooLarge {
                items: ops.len(),
                limit: self.max_batch_items,
            });
        }

        let mut items = self.items.write().await;
        for op in ops {
            match op {
                WriteOp::Put(item) => {
                    items.insert((item.pk, item.sk), item.value);
                }
                WriteOp::Delete { pk, sk } => {
                    items.remove(&(pk, sk));
                }
            }
        }
        Ok(())
    }
}
