//! Persistent storage for page revisions.
//!
//! Architecture:
//! ```text
//! ┌──────────────┐   Page records   ┌───────────────┐   batches   ┌──────────────┐
//! │ PageService  │ ───────────────► │ RevisionStore │ ──────────► │ DocumentStore│
//! │ (lifecycle)  │                  │ (keys, JSON)  │             │ Memory/Rocks │
//! └──────────────┘                  └───────────────┘             └──────────────┘
//!
//! partition T#{tenant}#L#{locale}#PB#P#{pid}
//!   ├── L          latest pointer
//!   ├── P          published pointer
//!   ├── REV#0001   revision records
//!   └── REV#0002
//! partition T#{tenant}#L#{locale}#PB#PATH
//!   └── /about     published-path entry
//! ```
//!
//! A page's full state is at most three point reads in one batch, and
//! every transition is written as one atomic batch.

pub mod revisions;
pub mod rocks;
pub mod store;

pub use revisions::{
    PageKeys, PagePurge, PageViews, RevisionStore, REVISION_PREFIX, SK_LATEST, SK_PUBLISHED,
};
pub use rocks::{RocksStore, StoreConfig};
pub use store::{
    DocumentStore, Item, MemoryStore, Query, SortKeyCondition, SortOrder, StoreError, WriteOp,
    DEFAULT_MAX_BATCH_ITEMS,
};
