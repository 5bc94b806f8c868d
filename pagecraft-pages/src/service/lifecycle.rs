//! State-changing transitions.
//!
//! Per-revision state machine:
//!
//! ```text
//!            requestReview             publish
//!   draft ─────────────────► reviewRequested ──────────► published
//!     ▲  ▲                        │                        │   ▲
//!     │  └──── requestChanges ◄───┘ (changesRequested)     │   │ publish
//!     │                                            unpublish   │
//!  createFrom                                              ▼   │
//!  (new version)                                       unpublished
//! ```
//!
//! Any non-published revision may be published directly; review is a
//! workflow convenience, not a gate.

use pagecraft_core::path;
use pagecraft_core::{
    now_millis, CompressedContent, Page, PageId, PageSettings, PageStatus, PageUpdate,
    ValidationError, Visibility, MAX_VERSION,
};
use serde::Serialize;
use uuid::Uuid;

use super::PageService;
use crate::categories::STATIC_CATEGORY;
use crate::error::{
    PageError, PageResult, CODE_CHANGES_NOT_UNDER_REVIEW, CODE_CHANGES_ON_OWN_REVISION,
    CODE_NOT_PUBLISHED, CODE_REVIEW_NOT_ALLOWED, CODE_SPECIAL_PAGE,
};
use crate::hooks::PageEvent;
use crate::prerender::RenderArgs;
use crate::reconcile::ViewChanges;
use crate::search::{DocumentKind, SearchProjector};
use crate::security::{Access, Identity};

const UNTITLED: &str = "Untitled";

/// Result of [`PageService::delete`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub deleted: Page,
    /// Set when the deleted revision was the latest one
    pub new_latest: Option<Page>,
}

fn page_not_found(id: &str) -> PageError {
    PageError::not_found(format!("Page \"{id}\" not found."))
}

fn is_same(candidate: Option<&Page>, page: &Page) -> bool {
    candidate.is_some_and(|c| c.id == page.id)
}

impl PageService {
    fn require_identity(&self) -> PageResult<Identity> {
        self.identity()
            .ok_or_else(|| PageError::not_authorized("no identity"))
    }

    /// Fails when the pid is bound to a special page such as `home`.
    async fn ensure_not_special(&self, page: &Page, action: &str) -> PageResult<()> {
        let settings = self.current_settings().await?;
        match settings.special_page_key(&page.pid) {
            Some(key) => Err(PageError::conflict(
                CODE_SPECIAL_PAGE,
                format!("Cannot {action} page because it's set as {key}."),
            )),
            None => Ok(()),
        }
    }

    /// New page (version 1, draft) in the category `category_slug`.
    pub async fn create(&self, category_slug: &str) -> PageResult<Page> {
        self.check(Access::Write).await?;

        let category = self.categories.get(category_slug).await?.ok_or_else(|| {
            PageError::not_found(format!("Category with slug \"{category_slug}\" not found."))
        })?;
        let identity = self.require_identity()?;

        let unique = Uuid::new_v4().simple().to_string();
        let slug = format!("untitled-{}", &unique[..12]);
        let page_path = if category.slug == STATIC_CATEGORY {
            path::normalize(&slug)
        } else {
            path::join(&category.url, &slug)
        };

        let settings = PageSettings::with_layout(category.layout.clone());
        PageUpdate {
            title: Some(UNTITLED.to_string()),
            path: Some(page_path.clone()),
            category: Some(category.slug.clone()),
            settings: Some(settings.clone()),
            ..PageUpdate::default()
        }
        .validate()?;

        let pid = Uuid::new_v4().simple().to_string();
        let now = now_millis();
        let owner = identity.owner();
        let page = Page {
            id: PageId::new(pid.clone(), 1).to_string(),
            pid,
            version: 1,
            tenant: self.security.tenant(),
            locale: self.security.locale(),
            editor: self.config.editor.clone(),
            category: category.slug,
            title: UNTITLED.to_string(),
            path: page_path,
            status: PageStatus::Draft,
            locked: false,
            visibility: Visibility::default(),
            owned_by: owner.clone(),
            created_by: owner,
            created_on: now,
            saved_on: now,
            published_on: None,
            created_from: None,
            settings,
            content: CompressedContent::default(),
        };

        self.dispatch(PageEvent::BeforeCreate { page: &page }).await?;
        let changes = ViewChanges::new(&page.pid)
            .put_revision(page.clone())
            .set_latest(page.clone());
        self.apply(&self.revisions(), &changes).await?;
        self.dispatch(PageEvent::AfterCreate { page: &page }).await?;

        log::info!("Created page {} at {}", page.id, page.path);
        Ok(page)
    }

    /// New draft revision cloned from `from`, numbered after the latest one.
    pub async fn create_from(&self, from: &str) -> PageResult<Page> {
        let permission = self.check(Access::Write).await?;
        let from_id = PageId::parse(from)?;

        let revisions = self.revisions();
        let views = revisions.load_views(&from_id, false).await?;
        let source = views.revision.ok_or_else(|| page_not_found(from))?;
        self.check_own(&permission, &source)?;
        let latest = views.latest.ok_or_else(|| page_not_found(from))?;
        let identity = self.require_identity()?;

        if latest.version >= MAX_VERSION {
            return Err(ValidationError::field(
                "version",
                format!(
                    "Page \"{}\" has reached the limit of {MAX_VERSION} revisions.",
                    latest.pid
                ),
            )
            .into());
        }
        let version = latest.version + 1;
        let id = PageId::new(source.pid.clone(), version).to_string();
        let created_from = Some(source.id.clone());
        let now = now_millis();
        let page = Page {
            id,
            version,
            status: PageStatus::Draft,
            locked: false,
            published_on: None,
            created_from,
            created_on: now,
            saved_on: now,
            created_by: identity.owner(),
            ..source
        };

        self.dispatch(PageEvent::BeforeCreate { page: &page }).await?;
        let changes = ViewChanges::new(&page.pid)
            .put_revision(page.clone())
            .set_latest(page.clone());
        self.apply(&revisions, &changes).await?;
        self.dispatch(PageEvent::AfterCreate { page: &page }).await?;

        log::info!("Created revision {} from {from}", page.id);
        Ok(page)
    }

    /// Edit an unlocked revision.
    pub async fn update(&self, id: &str, patch: &PageUpdate) -> PageResult<Page> {
        let permission = self.check(Access::Write).await?;
        let page_id = PageId::parse(id)?;

        let revisions = self.revisions();
        let views = revisions.load_views(&page_id, false).await?;
        let existing = views.revision.ok_or_else(|| page_not_found(id))?;
        if existing.locked {
            return Err(PageError::Locked(
                "Cannot update page because it's locked.".to_string(),
            ));
        }
        self.check_own(&permission, &existing)?;

        let mut page = existing.clone();
        patch.apply(&mut page)?;

        self.dispatch(PageEvent::BeforeUpdate {
            existing: &existing,
            page: &page,
        })
        .await?;
        let mut changes = ViewChanges::new(&page.pid).put_revision(page.clone());
        if is_same(views.latest.as_ref(), &page) {
            changes = changes.set_latest(page.clone());
        }
        self.apply(&revisions, &changes).await?;
        self.dispatch(PageEvent::AfterUpdate {
            existing: &existing,
            page: &page,
        })
        .await?;

        log::info!("Updated page {}", page.id);
        Ok(page)
    }

    /// Delete one revision, or the whole page when `id` is version 1.
    pub async fn delete(&self, id: &str) -> PageResult<DeleteOutcome> {
        let permission = self.check(Access::Delete).await?;
        let page_id = PageId::parse(id)?;

        let revisions = self.revisions();
        let views = revisions.load_views(&page_id, true).await?;
        let page = views.revision.ok_or_else(|| page_not_found(id))?;
        self.check_own(&permission, &page)?;
        self.ensure_not_special(&page, "delete").await?;

        let latest = views.latest;
        let published = views.published;
        self.dispatch(PageEvent::BeforeDelete {
            page: &page,
            latest: latest.as_ref(),
            published: published.as_ref(),
        })
        .await?;

        let new_latest = if page.version == 1 {
            let mut purge = revisions.purge(&page.pid, self.config.delete_chunk);
            let deleted = purge.run().await?;
            self.projector()
                .bulk(vec![
                    SearchProjector::remove_op(&page.pid, DocumentKind::Latest),
                    SearchProjector::remove_op(&page.pid, DocumentKind::Published),
                ])
                .await?;
            log::info!("Deleted page {} ({deleted} records)", page.pid);
            None
        } else {
            let mut changes = ViewChanges::new(&page.pid).delete_revision(page.version);
            if let Some(current) = published.as_ref().filter(|p| p.id == page.id) {
                changes = changes.clear_published().release_path(current.path.clone());
            }

            let mut new_latest = None;
            if is_same(latest.as_ref(), &page) {
                match revisions.previous_revision(&page.pid, page.version).await? {
                    Some(previous) => {
                        changes = changes.set_latest(previous.clone());
                        new_latest = Some(previous);
                    }
                    None => changes = changes.clear_latest(),
                }
            }

            self.apply(&revisions, &changes).await?;
            log::info!("Deleted revision {}", page.id);
            new_latest
        };

        self.dispatch(PageEvent::AfterDelete {
            page: &page,
            latest: latest.as_ref(),
            published: published.as_ref(),
        })
        .await?;

        Ok(DeleteOutcome {
            deleted: page,
            new_latest,
        })
    }

    /// Make `id` the live revision of its page and claim its path.
    pub async fn publish(&self, id: &str) -> PageResult<Page> {
        let permission = self.check(Access::Publish).await?;
        let page_id = PageId::parse(id)?;

        let revisions = self.revisions();
        let views = revisions.load_views(&page_id, true).await?;
        let existing = views.revision.ok_or_else(|| page_not_found(id))?;
        self.check_own(&permission, &existing)?;
        if existing.is_published() {
            return Err(PageError::not_found(format!(
                "Page \"{id}\" is already published."
            )));
        }

        let latest = views.latest;
        let published = views.published;
        let occupant = revisions.read_path(&existing.path).await?;

        self.dispatch(PageEvent::BeforePublish {
            page: &existing,
            latest: latest.as_ref(),
            published: published.as_ref(),
        })
        .await?;

        if let Some(occupant) = occupant.filter(|o| o.pid != existing.pid) {
            log::info!(
                "Path {} is held by page {}, unpublishing it first",
                existing.path,
                occupant.id
            );
            self.unpublish(&occupant.id).await?;
        }

        let mut page = existing;
        page.status = PageStatus::Published;
        page.locked = true;
        page.published_on = Some(now_millis());

        let mut changes = ViewChanges::new(&page.pid).put_revision(page.clone());
        if is_same(latest.as_ref(), &page) {
            changes = changes.set_latest(page.clone());
        }
        if let Some(previous) = published.as_ref().filter(|p| p.id != page.id) {
            let mut demoted = previous.clone();
            demoted.status = PageStatus::Unpublished;
            if is_same(latest.as_ref(), &demoted) {
                changes = changes.set_latest(demoted.clone());
            }
            changes = changes.put_revision(demoted);
        }
        let release = published.as_ref().map(|p| p.path.clone());
        changes = changes
            .set_published(page.clone())
            .claim_path(page.clone(), release);

        self.apply(&revisions, &changes).await?;
        self.dispatch(PageEvent::AfterPublish {
            page: &page,
            latest: latest.as_ref(),
            published: published.as_ref(),
        })
        .await?;

        log::info!("Published page {} at {}", page.id, page.path);
        self.notify_prerender(&page.path, false).await;
        Ok(page)
    }

    /// Withdraw the live revision `id`.
    pub async fn unpublish(&self, id: &str) -> PageResult<Page> {
        let permission = self.check(Access::Unpublish).await?;
        let page_id = PageId::parse(id)?;

        let revisions = self.revisions();
        let views = revisions.load_views(&page_id, true).await?;
        let existing = views.revision.ok_or_else(|| page_not_found(id))?;
        self.check_own(&permission, &existing)?;

        let Some(published) = views.published.filter(|p| p.id == existing.id) else {
            return Err(PageError::conflict(
                CODE_NOT_PUBLISHED,
                format!("Page \"{id}\" is not published."),
            ));
        };
        self.ensure_not_special(&existing, "unpublish").await?;

        self.dispatch(PageEvent::BeforeUnpublish { page: &existing })
            .await?;

        let mut page = existing;
        page.status = PageStatus::Unpublished;

        let mut changes = ViewChanges::new(&page.pid)
            .put_revision(page.clone())
            .clear_published()
            .release_path(published.path.clone());
        if is_same(views.latest.as_ref(), &page) {
            changes = changes.set_latest(page.clone());
        }

        self.apply(&revisions, &changes).await?;
        self.dispatch(PageEvent::AfterUnpublish { page: &page }).await?;

        log::info!("Unpublished page {} from {}", page.id, published.path);
        self.notify_prerender(&published.path, true).await;
        Ok(page)
    }

    /// Lock a draft (or sent-back) revision for review.
    pub async fn request_review(&self, id: &str) -> PageResult<Page> {
        let permission = self.check(Access::RequestReview).await?;
        let page_id = PageId::parse(id)?;

        let revisions = self.revisions();
        let views = revisions.load_views(&page_id, false).await?;
        let existing = views.revision.ok_or_else(|| page_not_found(id))?;
        if !matches!(
            existing.status,
            PageStatus::Draft | PageStatus::ChangesRequested
        ) {
            return Err(PageError::conflict(
                CODE_REVIEW_NOT_ALLOWED,
                "Cannot request review - page is not a draft nor a change request has been issued.",
            ));
        }
        self.check_own(&permission, &existing)?;

        self.dispatch(PageEvent::BeforeRequestReview { page: &existing })
            .await?;
        let mut page = existing;
        page.status = PageStatus::ReviewRequested;
        page.locked = true;

        let mut changes = ViewChanges::new(&page.pid).put_revision(page.clone());
        if is_same(views.latest.as_ref(), &page) {
            changes = changes.set_latest(page.clone());
        }
        self.apply(&revisions, &changes).await?;
        self.dispatch(PageEvent::AfterRequestReview { page: &page })
            .await?;

        log::info!("Review requested for page {}", page.id);
        Ok(page)
    }

    /// Send a revision under review back to its author.
    pub async fn request_changes(&self, id: &str) -> PageResult<Page> {
        let permission = self.check(Access::RequestChanges).await?;
        let page_id = PageId::parse(id)?;

        let revisions = self.revisions();
        let views = revisions.load_views(&page_id, false).await?;
        let existing = views.revision.ok_or_else(|| page_not_found(id))?;
        if existing.status != PageStatus::ReviewRequested {
            return Err(PageError::conflict(
                CODE_CHANGES_NOT_UNDER_REVIEW,
                "Cannot request changes on a page that's not under review.",
            ));
        }
        let identity = self.identity();
        if identity
            .as_ref()
            .is_some_and(|i| i.id == existing.created_by.id)
        {
            return Err(PageError::conflict(
                CODE_CHANGES_ON_OWN_REVISION,
                "Cannot request changes on page revision you created.",
            ));
        }
        self.check_own(&permission, &existing)?;

        self.dispatch(PageEvent::BeforeRequestChanges { page: &existing })
            .await?;
        let mut page = existing;
        page.status = PageStatus::ChangesRequested;
        page.locked = false;

        let mut changes = ViewChanges::new(&page.pid).put_revision(page.clone());
        if is_same(views.latest.as_ref(), &page) {
            changes = changes.set_latest(page.clone());
        }
        self.apply(&revisions, &changes).await?;
        self.dispatch(PageEvent::AfterRequestChanges { page: &page })
            .await?;

        log::info!("Changes requested for page {}", page.id);
        Ok(page)
    }

    // ── Prerendering ────────────────────────────────────────────

    /// Render paths and queue tags. No-op without a prerender sink.
    pub async fn render(&self, args: &RenderArgs) -> PageResult<()> {
        match self.prerenderer() {
            Some(prerenderer) => prerenderer.render(&self.security.tenant(), args).await,
            None => Ok(()),
        }
    }

    /// Flush paths and queue tags. No-op without a prerender sink.
    pub async fn flush(&self, args: &RenderArgs) -> PageResult<()> {
        match self.prerenderer() {
            Some(prerenderer) => prerenderer.flush(&self.security.tenant(), args).await,
            None => Ok(()),
        }
    }

    async fn notify_prerender(&self, path: &str, flush: bool) {
        let args = RenderArgs::for_path(path);
        let result = if flush {
            self.flush(&args).await
        } else {
            self.render(&args).await
        };
        if let Err(e) = result {
            log::warn!("Prerendering of {path} failed: {e}");
        }
    }
}
