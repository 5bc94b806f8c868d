//! Search projection of page records.
//!
//! Every pid has at most two search documents:
//!
//! ```text
//! L#{pid}  ── latest revision     (omitted when visibility.list.latest == false)
//! P#{pid}  ── published revision  (omitted when visibility.list.published == false)
//! ```
//!
//! The index is a derived, eventually consistent replica. The store is the
//! source of truth; documents are replaced wholesale on every write.

pub mod memory;

pub use memory::MemorySearchIndex;

use async_trait::async_trait;
use pagecraft_core::{FileRef, Owner, Page, PageStatus};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search index unavailable: {0}")]
    Unavailable(String),
    #[error("Search request rejected: {0}")]
    Rejected(String),
}

/// The two logical documents kept per pid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Latest,
    Published,
}

impl DocumentKind {
    /// Search document id for `pid`.
    pub fn document_id(&self, pid: &str) -> String {
        match self {
            DocumentKind::Latest => format!("L#{pid}"),
            DocumentKind::Published => format!("P#{pid}"),
        }
    }

    /// Whether `page` may appear in listings of this kind.
    pub fn is_listed(&self, page: &Page) -> bool {
        match self {
            DocumentKind::Latest => page.visibility.list.latest,
            DocumentKind::Published => page.visibility.list.published,
        }
    }
}

/// Flattened, content-free view of a page revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchDocument {
    pub tenant: String,
    pub id: String,
    pub pid: String,
    pub editor: String,
    pub locale: String,
    pub created_on: u64,
    pub saved_on: u64,
    pub created_by: Owner,
    pub owned_by: Owner,
    pub category: String,
    pub version: u32,
    pub title: String,
    pub title_lc: String,
    pub path: String,
    pub status: PageStatus,
    pub locked: bool,
    pub published_on: Option<u64>,
    pub tags: Vec<String>,
    pub snippet: Option<String>,
    pub image: Option<FileRef>,
    pub latest: bool,
    pub published: bool,
}

impl SearchDocument {
    pub fn from_page(page: &Page, kind: DocumentKind) -> Self {
        Self {
            tenant: page.tenant.clone(),
            id: page.id.clone(),
            pid: page.pid.clone(),
            editor: page.editor.clone(),
            locale: page.locale.clone(),
            created_on: page.created_on,
            saved_on: page.saved_on,
            created_by: page.created_by.clone(),
            owned_by: page.owned_by.clone(),
            category: page.category.clone(),
            version: page.version,
            title: page.title.clone(),
            title_lc: page.title.to_lowercase(),
            path: page.path.clone(),
            status: page.status,
            locked: page.locked,
            published_on: page.published_on,
            tags: page.tags().to_vec(),
            snippet: page.settings.general.snippet.clone(),
            image: page.settings.general.image.clone(),
            latest: kind == DocumentKind::Latest,
            published: kind == DocumentKind::Published,
        }
    }
}

/// One entry of a bulk request.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexOp {
    /// Create or replace a document
    Index {
        id: String,
        document: Box<SearchDocument>,
    },
    Delete {
        id: String,
    },
}

impl IndexOp {
    pub fn id(&self) -> &str {
        match self {
            IndexOp::Index { id, .. } | IndexOp::Delete { id } => id,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagRule {
    /// Every listed tag must be present
    #[default]
    All,
    Any,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagFilter {
    pub query: Vec<String>,
    pub rule: TagRule,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    CreatedOn,
    SavedOn,
    PublishedOn,
    Title,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SortSpec {
    pub field: SortField,
    pub descending: bool,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            field: SortField::CreatedOn,
            descending: true,
        }
    }
}

/// Filtered, sorted, paginated search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub kind: DocumentKind,
    pub locale: String,
    /// Restrict to documents created by this identity
    pub created_by: Option<String>,
    pub category: Option<String>,
    pub status: Option<PageStatus>,
    pub tags: Option<TagFilter>,
    /// Case-insensitive match on the title
    pub text: Option<String>,
    pub sort: SortSpec,
    pub from: usize,
    pub size: usize,
}

impl SearchQuery {
    pub fn new(kind: DocumentKind, locale: impl Into<String>) -> Self {
        Self {
            kind,
            locale: locale.into(),
            created_by: None,
            category: None,
            status: None,
            tags: None,
            text: None,
            sort: SortSpec::default(),
            from: 0,
            size: 10,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchHits {
    /// Matching documents before pagination
    pub total: usize,
    pub documents: Vec<SearchDocument>,
}

/// External search service.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Apply index/delete operations in submission order.
    async fn bulk(&self, index: &str, ops: Vec<IndexOp>) -> Result<(), SearchError>;

    async fn search(&self, index: &str, query: &SearchQuery) -> Result<SearchHits, SearchError>;

    /// Most frequent tags containing `contains`, at most `size` of them.
    async fn tag_aggregation(
        &self,
        index: &str,
        contains: &str,
        size: usize,
    ) -> Result<Vec<String>, SearchError>;
}

/// Builds visibility-gated operations and pushes them to a [`SearchIndex`].
#[derive(Clone)]
pub struct SearchProjector {
    index: Arc<dyn SearchIndex>,
    name: String,
}

impl SearchProjector {
    /// `name` is the full index name, e.g. `root-page-builder`.
    pub fn new(index: Arc<dyn SearchIndex>, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
        }
    }

    pub fn index_name(&self) -> &str {
        &self.name
    }

    /// Upsert the `kind` document of `page`, or delete it when the page
    /// is hidden from that listing.
    pub fn upsert_op(page: &Page, kind: DocumentKind) -> IndexOp {
        let id = kind.document_id(&page.pid);
        if kind.is_listed(page) {
            IndexOp::Index {
                id,
                document: Box::new(SearchDocument::from_page(page, kind)),
            }
        } else {
            IndexOp::Delete { id }
        }
    }

    pub fn remove_op(pid: &str, kind: DocumentKind) -> IndexOp {
        IndexOp::Delete {
            id: kind.document_id(pid),
        }
    }

    pub async fn bulk(&self, ops: Vec<IndexOp>) -> Result<(), SearchError> {
        if ops.is_empty() {
            return Ok(());
        }
        log::debug!("Search bulk on {}: {} operations", self.name, ops.len());
        self.index.bulk(&self.name, ops).await
    }

    pub async fn search(&self, query: &SearchQuery) -> Result<SearchHits, SearchError> {
        self.index.search(&self.name, query).await
    }

    pub async fn tags(&self, contains: &str, size: usize) -> Result<Vec<String>, SearchError> {
        self.index.tag_aggregation(&self.name, contains, size).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagecraft_core::{content, PageSettings, Visibility};

    fn page() -> Page {
        let owner = Owner {
            id: "u1".into(),
            display_name: "User".into(),
            kind: "admin".into(),
        };
        let mut settings = PageSettings::default();
        settings.general.tags = Some(vec!["news".into()]);
        settings.general.snippet = Some("Hello".into());
        Page {
            id: "a#0002".into(),
            pid: "a".into(),
            version: 2,
            tenant: "root".into(),
            locale: "en-US".into(),
            editor: "page-builder".into(),
            category: "blog".into(),
            title: "Spring Release".into(),
            path: "/blog/spring".into(),
            status: PageStatus::Published,
            locked: true,
            visibility: Visibility::default(),
            owned_by: owner.clone(),
            created_by: owner,
            created_on: 10,
            saved_on: 20,
            published_on: Some(30),
            created_from: Some("a#0001".into()),
            settings,
            content: content::compress(None),
        }
    }

    #[test]
    fn test_document_fields() {
        let doc = SearchDocument::from_page(&page(), DocumentKind::Published);
        assert_eq!(doc.title_lc, "spring release");
        assert_eq!(doc.tags, vec!["news".to_string()]);
        assert_eq!(doc.snippet.as_deref(), Some("Hello"));
        assert!(doc.published && !doc.latest);

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["titleLc"], "spring release");
        assert_eq!(json["status"], "published");
        assert_eq!(json["createdBy"]["type"], "admin");
    }

    #[test]
    fn test_visibility_gates_upserts() {
        let mut page = page();
        let op = SearchProjector::upsert_op(&page, DocumentKind::Latest);
        assert!(matches!(op, IndexOp::Index { ref id, .. } if id == "L#a"));

        page.visibility.list.published = false;
        let op = SearchProjector::upsert_op(&page, DocumentKind::Published);
        assert_eq!(op, IndexOp::Delete { id: "P#a".into() });
        // Direct-read visibility never affects listings.
        page.visibility.get.latest = false;
        let op = SearchProjector::upsert_op(&page, DocumentKind::Latest);
        assert_eq!(op.id(), "L#a");
        assert!(matches!(op, IndexOp::Index { .. }));
    }
}
