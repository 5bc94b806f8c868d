//! RocksDB-backed document store.
//!
//! Column families:
//! - `pages` — every page record, keyed `<pk>\x1F<sk>`
//!
//! Partitions are contiguous key ranges, so a range query is a single
//! forward iteration from the partition prefix. Write batches map onto
//! RocksDB `WriteBatch`, which is applied atomically.

use async_trait::async_trait;
use rocksdb::{
    BlockBasedOptions, Cache, ColumnFamilyDescriptor, DBCompressionType, DBWithThreadMode,
    Direction, IteratorMode, Options, SingleThreaded, SnapshotWithThreadMode, WriteBatch,
    WriteOptions,
};
use std::path::{Path, PathBuf};

use super::store::{DocumentStore, Item, Query, StoreError, WriteOp, DEFAULT_MAX_BATCH_ITEMS};

const CF_PAGES: &str = "pages";

/// Separates partition and sort key inside a RocksDB key.
const KEY_SEPARATOR: u8 = 0x1F;

type Db = DBWithThreadMode<SingleThreaded>;

/// Store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Database directory path
    pub path: PathBuf,
    /// Block cache size in bytes (default: 128MB)
    pub block_cache_size: usize,
    /// Bloom filter bits per key (default: 10)
    pub bloom_filter_bits: i32,
    /// Enable fsync on every batch (default: false)
    pub sync_writes: bool,
    /// Max open files for RocksDB (default: 512)
    pub max_open_files: i32,
    /// Write buffer size (default: 64MB)
    pub write_buffer_size: usize,
    /// Largest accepted write batch
    pub max_batch_items: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("pagecraft_data"),
            block_cache_size: 128 * 1024 * 1024,
            bloom_filter_bits: 10,
            sync_writes: false,
            max_open_files: 512,
            write_buffer_size: 64 * 1024 * 1024,
            max_batch_items: DEFAULT_MAX_BATCH_ITEMS,
        }
    }
}

impl StoreConfig {
    /// Create config for testing (small caches, temp directory).
    pub fn for_testing(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            block_cache_size: 8 * 1024 * 1024,
            bloom_filter_bits: 10,
            sync_writes: false,
            max_open_files: 64,
            write_buffer_size: 4 * 1024 * 1024,
            max_batch_items: DEFAULT_MAX_BATCH_ITEMS,
        }
    }
}

/// RocksDB document store.
pub struct RocksStore {
    /// RocksDB instance (single-threaded mode, concurrency via tokio)
    db: Db,
    config: StoreConfig,
}

impl RocksStore {
    /// Open the store, creating the database and column family if missing.
    pub fn open(config: StoreConfig) -> Result<Self, StoreError> {
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_max_open_files(config.max_open_files);
        db_opts.set_keep_log_file_num(5);
        db_opts.increase_parallelism(num_cpus());

        let descriptor = ColumnFamilyDescriptor::new(CF_PAGES, Self::cf_options(&config));
        let db = Db::open_cf_descriptors(&db_opts, &config.path, vec![descriptor])?;

        log::info!("Opened page store at {}", config.path.display());
        Ok(Self { db, config })
    }

    fn cf_options(config: &StoreConfig) -> Options {
        let mut opts = Options::default();

        let mut block_opts = BlockBasedOptions::default();
        let cache = Cache::new_lru_cache(config.block_cache_size);
        block_opts.set_block_cache(&cache);
        block_opts.set_bloom_filter(config.bloom_filter_bits as f64, false);
        block_opts.set_block_size(16 * 1024);
        opts.set_block_based_table_factory(&block_opts);

        // Page content is already LZ4-compressed; this covers the JSON envelope.
        opts.set_compression_type(DBCompressionType::Lz4);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_max_write_buffer_number(2);
        opts
    }

    /// Flush memtables to disk.
    pub fn sync(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    fn cf(&self) -> Result<&rocksdb::ColumnFamily, StoreError> {
        self.db
            .cf_handle(CF_PAGES)
            .ok_or_else(|| StoreError::Database(format!("Column family '{CF_PAGES}' not found")))
    }

    fn partition_prefix(pk: &str) -> Vec<u8> {
        let mut prefix = Vec::with_capacity(pk.len() + 1);
        prefix.extend_from_slice(pk.as_bytes());
        prefix.push(KEY_SEPARATOR);
        prefix
    }

    fn item_key(pk: &str, sk: &str) -> Vec<u8> {
        let mut key = Self::partition_prefix(pk);
        key.extend_from_slice(sk.as_bytes());
        key
    }

    fn run_query(
        &self,
        snapshot: &SnapshotWithThreadMode<'_, Db>,
        query: &Query,
    ) -> Result<Vec<Item>, StoreError> {
        let cf = self.cf()?;
        let prefix = Self::partition_prefix(&query.pk);

        let mut partition = Vec::new();
        let iter = snapshot.iterator_cf(&cf, IteratorMode::From(&prefix, Direction::Forward));
        for entry in iter {
            let (key, value) = entry?;
            if !key.starts_with(&prefix) {
                break;
            }
            let sk = String::from_utf8(key[prefix.len()..].to_vec())
                .map_err(|e| StoreError::Deserialization(e.to_string()))?;
            partition.push((sk, value.to_vec()));
        }

        Ok(query.select(partition.into_iter()))
    }
}

#[async_trait]
impl DocumentStore for RocksStore {
    async fn batch_read(&self, queries: &[Query]) -> Result<Vec<Vec<Item>>, StoreError> {
        let snapshot = self.db.snapshot();
        queries
            .iter()
            .map(|query| self.run_query(&snapshot, query))
            .collect()
    }

    fn max_batch_items(&self) -> usize {
        self.config.max_batch_items
    }

    async fn batch_write(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        if ops.len() > self.config.max_batch_items {
            return Err(StoreError::BatchTooLarge {
                items: ops.len(),
                limit: self.config.max_batch_items,
            });
        }

        let cf = self.cf()?;
        let mut batch = WriteBatch::default();
        for op in &ops {
            match op {
                WriteOp::Put(item) => {
                    batch.put_cf(&cf, Self::item_key(&item.pk, &item.sk), &item.value)
                }
                WriteOp::Delete { pk, sk } => batch.delete_cf(&cf, Self::item_key(pk, sk)),
            }
        }

        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(self.config.sync_writes);
        self.db.write_opt(batch, &write_opts)?;
        log::debug!("Applied write batch of {} items", ops.len());
        Ok(())
    }
}

/// Get number of CPU cores for RocksDB parallelism.
fn num_cpus() -> i32 {
    std::thread::available_parallelism()
        .map(|n| n.get() as i32)
        .unwrap_or(4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::store::SortKeyCondition;
    use std::fs;
    use uuid::Uuid;

    /// Create a temp directory for test database.
    fn temp_db_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("pagecraft_test_rocks_{name}_{}", Uuid::new_v4()))
    }

    /// Clean up test database.
    fn cleanup(path: &Path) {
        let _ = fs::remove_dir_all(path);
    }

    fn put(pk: &str, sk: &str, value: &[u8]) -> WriteOp {
        WriteOp::Put(Item {
            pk: pk.into(),
            sk: sk.into(),
            value: value.to_vec(),
        })
    }

    #[tokio::test]
    async fn test_store_open_close() {
        let path = temp_db_path("open_close");
        let store = RocksStore::open(StoreConfig::for_testing(&path)).unwrap();
        assert!(store.path().exists());
        drop(store);
        cleanup(&path);
    }

    #[tokio::test]
    async fn test_partitions_do_not_bleed() {
        let path = temp_db_path("partitions");
        let store = RocksStore::open(StoreConfig::for_testing(&path)).unwrap();

        store
            .batch_write(vec![
                put("P#a", "REV#0001", b"a1"),
                put("P#a", "REV#0002", b"a2"),
                // Shares the "P#a" prefix but is a different partition.
                put("P#ab", "REV#0001", b"ab1"),
            ])
            .await
            .unwrap();

        let items = store
            .read(&Query::range("P#a", SortKeyCondition::BeginsWith("REV#".into())))
            .await
            .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].value, b"a2");

        drop(store);
        cleanup(&path);
    }

    #[tokio::test]
    async fn test_batch_write_and_descending_read() {
        let path = temp_db_path("batch");
        let store = RocksStore::open(StoreConfig::for_testing(&path)).unwrap();

        store
            .batch_write(vec![
                put("P#x", "L", b"latest"),
                put("P#x", "REV#0001", b"r1"),
                put("P#x", "REV#0002", b"r2"),
                put("P#x", "REV#0003", b"r3"),
            ])
            .await
            .unwrap();
        store
            .batch_write(vec![WriteOp::delete("P#x", "REV#0003"), put("P#x", "L", b"r2")])
            .await
            .unwrap();

        let results = store
            .batch_read(&[
                Query::get("P#x", "L"),
                Query::range(
                    "P#x",
                    SortKeyCondition::Below {
                        prefix: "REV#".into(),
                        upper: "REV#0003".into(),
                    },
                )
                .descending()
                .limit(1),
            ])
            .await
            .unwrap();
        assert_eq!(results[0][0].value, b"r2");
        assert_eq!(results[1].len(), 1);
        assert_eq!(results[1][0].sk, "REV#0002");

        drop(store);
        cleanup(&path);
    }

    #[tokio::test]
    async fn test_data_survives_reopen() {
        let path = temp_db_path("reopen");
        let config = StoreConfig::for_testing(path.clone());

        {
            let store = RocksStore::open(config.clone()).unwrap();
            store.batch_write(vec![put("PATH", "/about", b"page")]).await.unwrap();
            store.sync().unwrap();
        }

        {
            let store = RocksStore::open(config).unwrap();
            let items = store.read(&Query::get("PATH", "/about")).await.unwrap();
            assert_eq!(items[0].value, b"page");
        }

        cleanup(&path);
    }

    #[tokio::test]
    async fn test_batch_limit() {
        let path = temp_db_path("limit");
        let mut config = StoreConfig::for_testing(&path);
        config.max_batch_items = 1;
        let store = RocksStore::open(config).unwrap();

        let result = store
            .batch_write(vec![put("a", "1", b"x"), put("a", "2", b"y")])
            .await;
        assert!(matches!(result, Err(StoreError::BatchTooLarge { .. })));
        assert!(store.read(&Query::get("a", "1")).await.unwrap().is_empty());

        drop(store);
        cleanup(&path);
    }

    #[test]
    fn test_store_config_default() {
        let config = StoreConfig::default();
        assert_eq!(config.bloom_filter_bits, 10);
        assert_eq!(config.max_batch_items, DEFAULT_MAX_BATCH_ITEMS);
        assert!(!config.sync_writes);
    }
}
