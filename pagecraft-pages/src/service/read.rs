//! Read accessors.

use pagecraft_core::{normalize_path, Page, PageId, PageRef, PageStatus, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::list::{ListMeta, ListPagesArgs};
use super::PageService;
use crate::error::{PageError, PageResult};
use crate::search::{DocumentKind, SearchDocument};
use crate::security::Access;
use crate::storage::{PageKeys, Query, SK_PUBLISHED};

const PAGE_NOT_FOUND: &str = "Page not found.";
const TAG_AGGREGATION_SIZE: usize = 10;
const MIN_TAG_QUERY_CHARS: usize = 2;

/// A page with its content decompressed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageDocument {
    pub page: Page,
    pub content: Option<Value>,
}

impl PageDocument {
    pub fn from_page(page: Page) -> PageResult<Self> {
        let content = page.content()?;
        Ok(Self { page, content })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishedPageArgs {
    /// `pid` for the published revision, `pid#0003` for an exact one
    pub id: Option<String>,
    /// Return the revision even if it is not published
    pub preview: bool,
}

impl PublishedPageArgs {
    pub fn id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            preview: false,
        }
    }

    pub fn preview(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            preview: true,
        }
    }
}

impl PageService {
    /// A revision (`pid#0003`) or the latest revision (`pid`).
    pub async fn get(&self, id: &str) -> PageResult<PageDocument> {
        let permission = self.check(Access::Read).await?;
        let reference = PageRef::parse(id)?;

        let revisions = self.revisions();
        let page = match reference.version {
            Some(version) => {
                revisions
                    .read_revision(&PageId::new(reference.pid, version))
                    .await?
            }
            None => revisions.read_latest(&reference.pid).await?,
        };
        let page = page.ok_or_else(|| PageError::not_found(PAGE_NOT_FOUND))?;

        self.check_own(&permission, &page)?;
        PageDocument::from_page(page)
    }

    /// Public read of a published page; no permission check.
    pub async fn get_published_by_id(&self, args: &PublishedPageArgs) -> PageResult<PageDocument> {
        let mut results = self
            .get_published_by_ids(std::slice::from_ref(args))
            .await?;
        results
            .pop()
            .unwrap_or_else(|| Err(PageError::not_found(PAGE_NOT_FOUND)))
    }

    /// Batched [`get_published_by_id`](Self::get_published_by_id): every
    /// request is served from one store batch, each slot fails on its own.
    pub async fn get_published_by_ids(
        &self,
        requests: &[PublishedPageArgs],
    ) -> PageResult<Vec<PageResult<PageDocument>>> {
        let revisions = self.revisions();
        let keys = revisions.keys();

        let mut slots: Vec<Result<usize, PageError>> = Vec::with_capacity(requests.len());
        let mut queries = Vec::new();
        for request in requests {
            let Some(id) = request.id.as_deref().filter(|id| !id.trim().is_empty()) else {
                slots.push(Err(ValidationError::field(
                    "id",
                    "Cannot get published page - \"id\" not provided.",
                )
                .into()));
                continue;
            };
            match PageRef::parse(id) {
                Ok(reference) => {
                    let sk = match reference.version {
                        Some(version) => PageKeys::revision_sk(version),
                        None => SK_PUBLISHED.to_string(),
                    };
                    slots.push(Ok(queries.len()));
                    queries.push(Query::get(keys.page_pk(&reference.pid), sk));
                }
                Err(e) => slots.push(Err(e.into())),
            }
        }

        let mut found = revisions.batch_read(&queries).await?;
        let results = slots
            .into_iter()
            .zip(requests)
            .map(|(slot, request)| {
                let index = slot?;
                let page = found
                    .get_mut(index)
                    .and_then(|pages| pages.pop())
                    .ok_or_else(|| PageError::not_found(PAGE_NOT_FOUND))?;
                if !request.preview && page.status != PageStatus::Published {
                    return Err(PageError::not_found(PAGE_NOT_FOUND));
                }
                PageDocument::from_page(page)
            })
            .collect();
        Ok(results)
    }

    /// The page published at `path`. `/` resolves through the home page setting.
    pub async fn get_published_by_path(&self, path: &str) -> PageResult<PageDocument> {
        if path.trim().is_empty() {
            return Err(ValidationError::field(
                "path",
                "Cannot get published page - \"path\" not provided.",
            )
            .into());
        }

        let normalized = normalize_path(path);
        if normalized == "/" {
            let settings = self.current_settings().await?;
            let home = settings
                .home_page()
                .ok_or_else(|| PageError::not_found(PAGE_NOT_FOUND))?;
            return self.get_published_by_id(&PublishedPageArgs::id(home)).await;
        }

        let page = self
            .revisions()
            .read_path(&normalized)
            .await?
            .ok_or_else(|| PageError::not_found(PAGE_NOT_FOUND))?;
        PageDocument::from_page(page)
    }

    /// Latest revisions visible in listings, for the caller's locale.
    pub async fn list_latest(
        &self,
        args: &ListPagesArgs,
    ) -> PageResult<(Vec<SearchDocument>, ListMeta)> {
        let permission = self.check(Access::Read).await?;
        let mut query = args.to_query(
            DocumentKind::Latest,
            &self.security.locale(),
            self.config.default_limit,
            self.config.max_limit,
        );
        if permission.own {
            let identity = self
                .identity()
                .ok_or_else(|| PageError::not_authorized("no identity"))?;
            query.created_by = Some(identity.id);
        }
        self.list(args, &query).await
    }

    /// Published revisions visible in listings; no permission check.
    pub async fn list_published(
        &self,
        args: &ListPagesArgs,
    ) -> PageResult<(Vec<SearchDocument>, ListMeta)> {
        let query = args.to_query(
            DocumentKind::Published,
            &self.security.locale(),
            self.config.default_limit,
            self.config.max_limit,
        );
        self.list(args, &query).await
    }

    async fn list(
        &self,
        args: &ListPagesArgs,
        query: &crate::search::SearchQuery,
    ) -> PageResult<(Vec<SearchDocument>, ListMeta)> {
        let (page, limit) = args.window(self.config.default_limit, self.config.max_limit);
        let hits = self.projector().search(query).await?;
        Ok((hits.documents, ListMeta::new(page, limit, hits.total)))
    }

    /// Tags containing `query`. Search failures yield an empty list.
    pub async fn list_tags(&self, query: &str) -> PageResult<Vec<String>> {
        if query.chars().count() < MIN_TAG_QUERY_CHARS {
            return Err(ValidationError::field(
                "search.query",
                "Please provide at least two characters.",
            )
            .into());
        }

        match self.projector().tags(query, TAG_AGGREGATION_SIZE).await {
            Ok(tags) => Ok(tags),
            Err(e) => {
                log::warn!("Tag aggregation failed, returning no tags: {e}");
                Ok(Vec::new())
            }
        }
    }

    /// Every revision of the page, highest version first.
    pub async fn list_page_revisions(&self, id: &str) -> PageResult<Vec<Page>> {
        self.check(Access::Read).await?;
        let reference = PageRef::parse(id)?;
        Ok(self.revisions().list_revisions(&reference.pid).await?)
    }
}
