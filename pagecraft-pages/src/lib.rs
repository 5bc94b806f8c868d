//! # pagecraft-pages — Page lifecycle engine for Pagecraft
//!
//! Drafts, reviews, publishes and deletes versioned page revisions while
//! keeping four denormalized views of each page consistent.
//!
//! ## Architecture
//!
//! ```text
//!                      ┌──────────────────┐
//!   caller ──────────► │   PageService    │ ◄── SecurityContext
//!                      │ (state machine)  │ ◄── Settings / Categories
//!                      └────────┬─────────┘ ──► HookRegistry
//!                               │ ViewChanges   ──► PrerenderSink
//!                 ┌─────────────┴─────────────┐
//!                 ▼                           ▼
//!        ┌────────────────┐          ┌────────────────┐
//!        │ RevisionStore  │          │ SearchProjector│
//!        │ REV / L / P /  │          │ L#pid / P#pid  │
//!        │ PATH (atomic)  │          │ (best effort)  │
//!        └───────┬────────┘          └───────┬────────┘
//!                ▼                           ▼
//!        DocumentStore                 SearchIndex
//!        (Memory / RocksDB)            (Memory)
//! ```
//!
//! ## Modules
//!
//! - [`service`] — `PageService`: create, createFrom, update, delete,
//!   publish, unpublish, review workflow and read accessors
//! - [`storage`] — document store trait, memory and RocksDB backends,
//!   revision key layout and the resumable purge cursor
//! - [`search`] — search documents, projector and in-memory index
//! - [`reconcile`] — one description of a transition's effect on all views
//! - [`security`] — identities, permissions and own-record checks
//! - [`hooks`] — ordered before/after lifecycle callbacks
//! - [`settings`], [`categories`] — site settings and page categories
//! - [`prerender`] — render/flush dispatch to a downstream sink

pub mod categories;
pub mod error;
pub mod hooks;
pub mod prerender;
pub mod reconcile;
pub mod search;
pub mod security;
pub mod service;
pub mod settings;
pub mod storage;

// Re-exports for convenience
pub use categories::{Category, CategoryProvider, StaticCategories, STATIC_CATEGORY};
pub use error::{PageError, PageResult};
pub use hooks::{HookError, HookRegistry, PageEvent, PageHook};
pub use prerender::{PrerenderSink, Prerenderer, RenderArgs};
pub use reconcile::ViewChanges;
pub use search::memory::MemorySearchIndex;
pub use search::{
    DocumentKind, SearchDocument, SearchError, SearchIndex, SearchProjector, SearchQuery,
    SortField, SortSpec, TagFilter, TagRule,
};
pub use security::{Access, Identity, Permission, SecurityContext, StaticSecurity};
pub use service::{
    DeleteOutcome, ListMeta, ListPagesArgs, ListWhere, PageDocument, PageService,
    PageServiceBuilder, PageServiceConfig, PublishedPageArgs,
};
pub use settings::{Settings, SettingsProvider, StaticSettings, HOME_PAGE};
pub use storage::{
    DocumentStore, MemoryStore, PagePurge, RevisionStore, RocksStore, StoreConfig, StoreError,
};
