//! Page records on top of a [`DocumentStore`].
//!
//! `RevisionStore` owns the key layout and the JSON encoding of page
//! records. It never decides *what* to write; the lifecycle engine builds
//! the batch and this layer turns it into store operations.

use std::collections::BTreeSet;
use std::sync::Arc;

use pagecraft_core::page::VERSION_WIDTH;
use pagecraft_core::{Page, PageId};

use super::store::{DocumentStore, Item, Query, SortKeyCondition, StoreError, WriteOp};

/// Sort key of the latest pointer.
pub const SK_LATEST: &str = "L";
/// Sort key of the published pointer.
pub const SK_PUBLISHED: &str = "P";
/// Sort-key prefix shared by every revision record.
pub const REVISION_PREFIX: &str = "REV#";

/// Partition and sort key builder for one tenant and locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageKeys {
    prefix: String,
}

impl PageKeys {
    pub fn new(tenant: &str, locale: &str) -> Self {
        Self {
            prefix: format!("T#{tenant}#L#{locale}#PB#"),
        }
    }

    /// Partition holding every record of `pid`.
    pub fn page_pk(&self, pid: &str) -> String {
        format!("{}P#{pid}", self.prefix)
    }

    /// Partition of the published-path index.
    pub fn path_pk(&self) -> String {
        format!("{}PATH", self.prefix)
    }

    pub fn revision_sk(version: u32) -> String {
        format!("{REVISION_PREFIX}{:0width$}", version, width = VERSION_WIDTH)
    }
}

/// The three per-pid records a transition usually needs.
#[derive(Debug, Clone, Default)]
pub struct PageViews {
    pub revision: Option<Page>,
    pub latest: Option<Page>,
    pub published: Option<Page>,
}

/// Typed access to page records of one tenant/locale.
#[derive(Clone)]
pub struct RevisionStore {
    store: Arc<dyn DocumentStore>,
    keys: PageKeys,
}

impl RevisionStore {
    pub fn new(store: Arc<dyn DocumentStore>, keys: PageKeys) -> Self {
        Self { store, keys }
    }

    pub fn keys(&self) -> &PageKeys {
        &self.keys
    }

    // ── Reads ───────────────────────────────────────────────────

    /// Point lookup in a pid partition. Absence is `Ok(None)`.
    pub async fn read_one(&self, pid: &str, sk: &str) -> Result<Option<Page>, StoreError> {
        let items = self.store.read(&Query::get(self.keys.page_pk(pid), sk)).await?;
        first_page(items)
    }

    pub async fn read_revision(&self, id: &PageId) -> Result<Option<Page>, StoreError> {
        self.read_one(&id.pid, &PageKeys::revision_sk(id.version)).await
    }

    pub async fn read_latest(&self, pid: &str) -> Result<Option<Page>, StoreError> {
        self.read_one(pid, SK_LATEST).await
    }

    /// The page currently published at a normalized path.
    pub async fn read_path(&self, path: &str) -> Result<Option<Page>, StoreError> {
        let items = self.store.read(&self.path_query(path)).await?;
        first_page(items)
    }

    /// Revision, latest and (optionally) published pointer in one batch.
    pub async fn load_views(
        &self,
        id: &PageId,
        include_published: bool,
    ) -> Result<PageViews, StoreError> {
        let pk = self.keys.page_pk(&id.pid);
        let mut queries = vec![
            Query::get(pk.clone(), PageKeys::revision_sk(id.version)),
            Query::get(pk.clone(), SK_LATEST),
        ];
        if include_published {
            queries.push(Query::get(pk, SK_PUBLISHED));
        }

        let mut slots = self.batch_read(&queries).await?.into_iter();
        let mut next = || slots.next().and_then(|pages| pages.into_iter().next());
        Ok(PageViews {
            revision: next(),
            latest: next(),
            published: next(),
        })
    }

    /// Execute raw queries as one unit, decoding every item as a page.
    pub async fn batch_read(&self, queries: &[Query]) -> Result<Vec<Vec<Page>>, StoreError> {
        self.store
            .batch_read(queries)
            .await?
            .into_iter()
            .map(|items| items.iter().map(decode_page).collect())
            .collect()
    }

    pub async fn batch_write(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        if ops.is_empty() {
            return Ok(());
        }
        self.store.batch_write(ops).await
    }

    /// Every revision of `pid`, highest version first.
    pub async fn list_revisions(&self, pid: &str) -> Result<Vec<Page>, StoreError> {
        let query = Query::range(
            self.keys.page_pk(pid),
            SortKeyCondition::BeginsWith(REVISION_PREFIX.to_string()),
        )
        .descending();
        let items = self.store.read(&query).await?;
        let mut pages = items.iter().map(decode_page).collect::<Result<Vec<_>, _>>()?;
        pages.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(pages)
    }

    /// Highest revision strictly below `version`.
    pub async fn previous_revision(
        &self,
        pid: &str,
        version: u32,
    ) -> Result<Option<Page>, StoreError> {
        let query = Query::range(
            self.keys.page_pk(pid),
            SortKeyCondition::Below {
                prefix: REVISION_PREFIX.to_string(),
                upper: PageKeys::revision_sk(version),
            },
        )
        .descending()
        .limit(1);
        let items = self.store.read(&query).await?;
        first_page(items)
    }

    pub fn path_query(&self, path: &str) -> Query {
        Query::get(self.keys.path_pk(), path)
    }

    // ── Write operations ────────────────────────────────────────

    pub fn put_revision(&self, page: &Page) -> Result<WriteOp, StoreError> {
        self.put(
            self.keys.page_pk(&page.pid),
            PageKeys::revision_sk(page.version),
            page,
        )
    }

    pub fn put_latest(&self, page: &Page) -> Result<WriteOp, StoreError> {
        self.put(self.keys.page_pk(&page.pid), SK_LATEST.to_string(), page)
    }

    pub fn put_published(&self, page: &Page) -> Result<WriteOp, StoreError> {
        self.put(self.keys.page_pk(&page.pid), SK_PUBLISHED.to_string(), page)
    }

    /// Path-index entry claiming `page.path` for `page`.
    pub fn put_path(&self, page: &Page) -> Result<WriteOp, StoreError> {
        self.put(self.keys.path_pk(), page.path.clone(), page)
    }

    pub fn delete_revision(&self, pid: &str, version: u32) -> WriteOp {
        WriteOp::delete(self.keys.page_pk(pid), PageKeys::revision_sk(version))
    }

    pub fn delete_latest(&self, pid: &str) -> WriteOp {
        WriteOp::delete(self.keys.page_pk(pid), SK_LATEST)
    }

    pub fn delete_published(&self, pid: &str) -> WriteOp {
        WriteOp::delete(self.keys.page_pk(pid), SK_PUBLISHED)
    }

    pub fn delete_path(&self, path: &str) -> WriteOp {
        WriteOp::delete(self.keys.path_pk(), path)
    }

    fn put(&self, pk: String, sk: String, page: &Page) -> Result<WriteOp, StoreError> {
        let value =
            serde_json::to_vec(page).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(WriteOp::Put(Item { pk, sk, value }))
    }

    /// Cursor deleting every record of `pid`, `chunk` items per batch.
    ///
    /// Each record may add one path-index delete to its batch, so `chunk`
    /// is capped at half the store's batch limit.
    pub fn purge(&self, pid: &str, chunk: usize) -> PagePurge {
        let chunk = chunk.min(self.store.max_batch_items() / 2).max(1);
        PagePurge {
            revisions: self.clone(),
            pid: pid.to_string(),
            chunk,
            deleted: 0,
            done: false,
        }
    }
}

fn decode_page(item: &Item) -> Result<Page, StoreError> {
    serde_json::from_slice(&item.value).map_err(|e| {
        StoreError::Deserialization(format!("{}/{}: {e}", item.pk, item.sk))
    })
}

fn first_page(items: Vec<Item>) -> Result<Option<Page>, StoreError> {
    items.first().map(decode_page).transpose()
}

/// Resumable whole-pid deletion.
///
/// Each [`step`](PagePurge::step) deletes up to `chunk` records of the pid
/// partition in one atomic batch, together with any path-index entry
/// those records point at that still belongs to this pid. A purge that
/// stops halfway is finished by running a new one for the same pid.
pub struct PagePurge {
    revisions: RevisionStore,
    pid: String,
    chunk: usize,
    deleted: usize,
    done: bool,
}

impl PagePurge {
    pub fn pid(&self) -> &str {
        &self.pid
    }

    /// Records deleted so far, path-index entries included.
    pub fn deleted(&self) -> usize {
        self.deleted
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Delete the next chunk. Returns the number of records removed;
    /// zero means the partition is empty and the purge is done.
    pub async fn step(&mut self) -> Result<usize, StoreError> {
        if self.done {
            return Ok(0);
        }

        let keys = self.revisions.keys();
        let query = Query::range(keys.page_pk(&self.pid), SortKeyCondition::Any).limit(self.chunk);
        let items = self.revisions.store.read(&query).await?;
        if items.is_empty() {
            self.done = true;
            log::debug!("Purge of page {} finished ({} records)", self.pid, self.deleted);
            return Ok(0);
        }

        let mut paths = BTreeSet::new();
        for item in &items {
            // Undecodable records are still deleted, they just cannot point at a path.
            if let Ok(page) = decode_page(item) {
                paths.insert(page.path);
            }
        }

        let path_queries: Vec<Query> = paths.iter().map(|p| self.revisions.path_query(p)).collect();
        let entries = self.revisions.store.batch_read(&path_queries).await?;

        let mut ops: Vec<WriteOp> = items
            .into_iter()
            .map(|item| WriteOp::Delete {
                pk: item.pk,
                sk: item.sk,
            })
            .collect();
        for (path, slot) in paths.iter().zip(entries) {
            let owned = slot
                .first()
                .and_then(|item| decode_page(item).ok())
                .is_some_and(|entry| entry.pid == self.pid);
            if owned {
                ops.push(self.revisions.delete_path(path));
            }
        }

        let count = ops.len();
        self.revisions.store.batch_write(ops).await?;
        self.deleted += count;
        log::debug!("Purge of page {}: deleted {count} records", self.pid);
        Ok(count)
    }

    /// Step until the partition is empty. Returns the total deleted.
    pub async fn run(&mut self) -> Result<usize, StoreError> {
        while !self.done {
            self.step().await?;
        }
        Ok(self.deleted)
    }
}
