//! Page lifecycle engine.
//!
//! ```text
//!  command ──► permission gate ──► load views (≤3 reads, one batch)
//!                                        │
//!                                        ▼
//!              before* hooks ◄── transition builds ViewChanges
//!                    │
//!                    ▼
//!              store batch ──► search bulk ──► after* hooks
//! ```
//!
//! The engine is the only writer of revision records, pointers and
//! path-index entries. The search index is pushed to after the store
//! batch commits and is never read back for decisions.

pub mod lifecycle;
pub mod list;
pub mod read;

pub use lifecycle::DeleteOutcome;
pub use list::{ListMeta, ListPagesArgs, ListWhere};
pub use read::{PageDocument, PublishedPageArgs};

use std::sync::Arc;

use pagecraft_core::Page;

use crate::categories::{CategoryProvider, StaticCategories};
use crate::error::PageResult;
use crate::hooks::{HookRegistry, PageEvent, PageHook};
use crate::prerender::{PrerenderSink, Prerenderer};
use crate::reconcile::ViewChanges;
use crate::search::{SearchIndex, SearchProjector};
use crate::security::{
    check_base_permission, check_own_permission, Access, Identity, OwnerField, Permission,
    SecurityContext,
};
use crate::settings::{Settings, SettingsProvider, StaticSettings};
use crate::storage::{DocumentStore, PageKeys, RevisionStore};

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct PageServiceConfig {
    /// Permission name checked for every guarded operation (default: `pb.page`)
    pub permission: String,
    /// Editor stamped on new pages (default: `page-builder`)
    pub editor: String,
    /// Records deleted per batch when purging a whole pid (default: 15)
    pub delete_chunk: usize,
    /// List page size when none is given (default: 10)
    pub default_limit: usize,
    /// Upper bound on list page size (default: 100)
    pub max_limit: usize,
    /// Search index name is `{tenant}-{index_suffix}` (default: `page-builder`)
    pub index_suffix: String,
}

impl Default for PageServiceConfig {
    fn default() -> Self {
        Self {
            permission: "pb.page".to_string(),
            editor: "page-builder".to_string(),
            delete_chunk: 15,
            default_limit: 10,
            max_limit: 100,
            index_suffix: "page-builder".to_string(),
        }
    }
}

impl PageServiceConfig {
    /// Create config for testing (tiny purge chunks).
    pub fn for_testing() -> Self {
        Self {
            delete_chunk: 2,
            ..Self::default()
        }
    }
}

/// Page lifecycle operations for one caller.
#[derive(Clone)]
pub struct PageService {
    store: Arc<dyn DocumentStore>,
    index: Arc<dyn SearchIndex>,
    security: Arc<dyn SecurityContext>,
    categories: Arc<dyn CategoryProvider>,
    settings: Arc<dyn SettingsProvider>,
    hooks: HookRegistry,
    prerenderer: Option<Prerenderer>,
    config: PageServiceConfig,
}

impl PageService {
    pub fn builder(
        store: Arc<dyn DocumentStore>,
        index: Arc<dyn SearchIndex>,
        security: Arc<dyn SecurityContext>,
    ) -> PageServiceBuilder {
        PageServiceBuilder {
            store,
            index,
            security,
            categories: None,
            settings: None,
            hooks: HookRegistry::new(),
            prerender_sink: None,
            config: PageServiceConfig::default(),
        }
    }

    /// Same engine acting for another caller.
    pub fn with_security(&self, security: Arc<dyn SecurityContext>) -> Self {
        Self {
            security,
            ..self.clone()
        }
    }

    // ── Per-call context ────────────────────────────────────────

    pub(crate) fn revisions(&self) -> RevisionStore {
        let keys = PageKeys::new(&self.security.tenant(), &self.security.locale());
        RevisionStore::new(self.store.clone(), keys)
    }

    pub(crate) fn projector(&self) -> SearchProjector {
        let name = format!("{}-{}", self.security.tenant(), self.config.index_suffix);
        SearchProjector::new(self.index.clone(), name)
    }

    pub(crate) fn identity(&self) -> Option<Identity> {
        self.security.identity()
    }

    pub(crate) async fn check(&self, access: Access) -> PageResult<Permission> {
        check_base_permission(self.security.as_ref(), &self.config.permission, access).await
    }

    pub(crate) fn check_own(&self, permission: &Permission, page: &Page) -> PageResult<()> {
        check_own_permission(self.identity().as_ref(), permission, page, OwnerField::OwnedBy)
    }

    pub(crate) async fn current_settings(&self) -> PageResult<Settings> {
        Ok(self.settings.get().await?.unwrap_or_default())
    }

    pub(crate) async fn dispatch(&self, event: PageEvent<'_>) -> PageResult<()> {
        self.hooks.dispatch(event).await
    }

    pub(crate) fn prerenderer(&self) -> Option<&Prerenderer> {
        self.prerenderer.as_ref()
    }

    /// Commit `changes`: one atomic store batch, then one search bulk.
    pub(crate) async fn apply(
        &self,
        revisions: &RevisionStore,
        changes: &ViewChanges,
    ) -> PageResult<()> {
        let ops = changes.store_ops(revisions)?;
        let count = ops.len();
        revisions.batch_write(ops).await?;
        self.projector().bulk(changes.index_ops()).await?;
        log::debug!("Reconciled page {}: {count} store ops", changes.pid());
        Ok(())
    }
}

/// Wires collaborators into a [`PageService`].
pub struct PageServiceBuilder {
    store: Arc<dyn DocumentStore>,
    index: Arc<dyn SearchIndex>,
    security: Arc<dyn SecurityContext>,
    categories: Option<Arc<dyn CategoryProvider>>,
    settings: Option<Arc<dyn SettingsProvider>>,
    hooks: HookRegistry,
    prerender_sink: Option<Arc<dyn PrerenderSink>>,
    config: PageServiceConfig,
}

impl PageServiceBuilder {
    pub fn categories(mut self, categories: Arc<dyn CategoryProvider>) -> Self {
        self.categories = Some(categories);
        self
    }

    pub fn settings(mut self, settings: Arc<dyn SettingsProvider>) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn hook(mut self, hook: Arc<dyn PageHook>) -> Self {
        self.hooks.register(hook);
        self
    }

    pub fn prerender_sink(mut self, sink: Arc<dyn PrerenderSink>) -> Self {
        self.prerender_sink = Some(sink);
        self
    }

    pub fn config(mut self, config: PageServiceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> PageService {
        let settings: Arc<dyn SettingsProvider> = match self.settings {
            Some(settings) => settings,
            None => Arc::new(StaticSettings::default()),
        };
        let categories: Arc<dyn CategoryProvider> = match self.categories {
            Some(categories) => categories,
            None => Arc::new(StaticCategories::default()),
        };
        let prerenderer = self
            .prerender_sink
            .map(|sink| Prerenderer::new(settings.clone(), sink));

        PageService {
            store: self.store,
            index: self.index,
            security: self.security,
            categories,
            settings,
            hooks: self.hooks,
            prerenderer,
            config: self.config,
        }
    }
}
