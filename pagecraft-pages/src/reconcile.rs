//! View reconciliation.
//!
//! Every transition describes its effect on the four per-pid views as a
//! [`ViewChanges`]. The same value produces both the atomic store batch
//! and the search bulk request, so the two can never disagree about
//! what changed.
//!
//! ```text
//!                 ┌─► store ops   (REV#…, L, P, PATH)  ── one atomic batch
//! ViewChanges ────┤
//!                 └─► index ops   (L#pid, P#pid)       ── one bulk request
//! ```

use pagecraft_core::Page;

use crate::search::{DocumentKind, IndexOp, SearchProjector};
use crate::storage::{RevisionStore, StoreError, WriteOp};

/// What happens to the latest or published pointer.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Pointer {
    #[default]
    Keep,
    Set(Page),
    Clear,
}

/// What happens to the published-path index entry of this pid.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PathChange {
    #[default]
    Keep,
    /// Point `page.path` at `page`, first releasing `release` if it differs
    Claim { page: Page, release: Option<String> },
    Release(String),
}

/// Pending changes to one pid's views.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewChanges {
    pid: String,
    revisions: Vec<Page>,
    deleted_revisions: Vec<u32>,
    latest: Pointer,
    published: Pointer,
    path: PathChange,
}

impl ViewChanges {
    pub fn new(pid: impl Into<String>) -> Self {
        Self {
            pid: pid.into(),
            revisions: Vec::new(),
            deleted_revisions: Vec::new(),
            latest: Pointer::Keep,
            published: Pointer::Keep,
            path: PathChange::Keep,
        }
    }

    pub fn pid(&self) -> &str {
        &self.pid
    }

    /// Write a revision record.
    pub fn put_revision(mut self, page: Page) -> Self {
        self.revisions.push(page);
        self
    }

    pub fn delete_revision(mut self, version: u32) -> Self {
        self.deleted_revisions.push(version);
        self
    }

    pub fn set_latest(mut self, page: Page) -> Self {
        self.latest = Pointer::Set(page);
        self
    }

    pub fn clear_latest(mut self) -> Self {
        self.latest = Pointer::Clear;
        self
    }

    pub fn set_published(mut self, page: Page) -> Self {
        self.published = Pointer::Set(page);
        self
    }

    pub fn clear_published(mut self) -> Self {
        self.published = Pointer::Clear;
        self
    }

    pub fn claim_path(mut self, page: Page, release: Option<String>) -> Self {
        self.path = PathChange::Claim { page, release };
        self
    }

    pub fn release_path(mut self, path: impl Into<String>) -> Self {
        self.path = PathChange::Release(path.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
            && self.deleted_revisions.is_empty()
            && self.latest == Pointer::Keep
            && self.published == Pointer::Keep
            && self.path == PathChange::Keep
    }

    /// The atomic store batch.
    pub fn store_ops(&self, revisions: &RevisionStore) -> Result<Vec<WriteOp>, StoreError> {
        let mut ops = Vec::new();

        for page in &self.revisions {
            ops.push(revisions.put_revision(page)?);
        }
        for version in &self.deleted_revisions {
            ops.push(revisions.delete_revision(&self.pid, *version));
        }

        match &self.latest {
            Pointer::Keep => {}
            Pointer::Set(page) => ops.push(revisions.put_latest(page)?),
            Pointer::Clear => ops.push(revisions.delete_latest(&self.pid)),
        }
        match &self.published {
            Pointer::Keep => {}
            Pointer::Set(page) => ops.push(revisions.put_published(page)?),
            Pointer::Clear => ops.push(revisions.delete_published(&self.pid)),
        }

        match &self.path {
            PathChange::Keep => {}
            PathChange::Claim { page, release } => {
                if let Some(previous) = release.as_deref().filter(|p| *p != page.path) {
                    ops.push(revisions.delete_path(previous));
                }
                ops.push(revisions.put_path(page)?);
            }
            PathChange::Release(path) => ops.push(revisions.delete_path(path)),
        }

        Ok(ops)
    }

    /// The search bulk request, gated by list visibility.
    pub fn index_ops(&self) -> Vec<IndexOp> {
        let mut ops = Vec::new();
        for (pointer, kind) in [
            (&self.latest, DocumentKind::Latest),
            (&self.published, DocumentKind::Published),
        ] {
            match pointer {
                Pointer::Keep => {}
                Pointer::Set(page) => ops.push(SearchProjector::upsert_op(page, kind)),
                Pointer::Clear => ops.push(SearchProjector::remove_op(&self.pid, kind)),
            }
        }
        ops
    }
}
