//! Lifecycle hook callbacks.
//!
//! Hooks run in registration order immediately around the persistence
//! step of each transition. The first failing hook stops the chain; a
//! failing `before*` hook aborts the transition before anything is written.

use async_trait::async_trait;
use pagecraft_core::Page;
use std::fmt;
use std::sync::Arc;

use crate::error::{PageError, PageResult};

pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// A lifecycle point with the records involved.
#[derive(Debug, Clone, Copy)]
pub enum PageEvent<'a> {
    BeforeCreate {
        page: &'a Page,
    },
    AfterCreate {
        page: &'a Page,
    },
    BeforeUpdate {
        existing: &'a Page,
        page: &'a Page,
    },
    AfterUpdate {
        existing: &'a Page,
        page: &'a Page,
    },
    BeforeDelete {
        page: &'a Page,
        latest: Option<&'a Page>,
        published: Option<&'a Page>,
    },
    AfterDelete {
        page: &'a Page,
        latest: Option<&'a Page>,
        published: Option<&'a Page>,
    },
    BeforePublish {
        page: &'a Page,
        latest: Option<&'a Page>,
        published: Option<&'a Page>,
    },
    AfterPublish {
        page: &'a Page,
        latest: Option<&'a Page>,
        published: Option<&'a Page>,
    },
    BeforeUnpublish {
        page: &'a Page,
    },
    AfterUnpublish {
        page: &'a Page,
    },
    BeforeRequestReview {
        page: &'a Page,
    },
    AfterRequestReview {
        page: &'a Page,
    },
    BeforeRequestChanges {
        page: &'a Page,
    },
    AfterRequestChanges {
        page: &'a Page,
    },
}

impl PageEvent<'_> {
    /// Name of the lifecycle point, e.g. `beforePublish`.
    pub fn point(&self) -> &'static str {
        match self {
            PageEvent::BeforeCreate { .. } => "beforeCreate",
            PageEvent::AfterCreate { .. } => "afterCreate",
            PageEvent::BeforeUpdate { .. } => "beforeUpdate",
            PageEvent::AfterUpdate { .. } => "afterUpdate",
            PageEvent::BeforeDelete { .. } => "beforeDelete",
            PageEvent::AfterDelete { .. } => "afterDelete",
            PageEvent::BeforePublish { .. } => "beforePublish",
            PageEvent::AfterPublish { .. } => "afterPublish",
            PageEvent::BeforeUnpublish { .. } => "beforeUnpublish",
            PageEvent::AfterUnpublish { .. } => "afterUnpublish",
            PageEvent::BeforeRequestReview { .. } => "beforeRequestReview",
            PageEvent::AfterRequestReview { .. } => "afterRequestReview",
            PageEvent::BeforeRequestChanges { .. } => "beforeRequestChanges",
            PageEvent::AfterRequestChanges { .. } => "afterRequestChanges",
        }
    }

    /// The revision the transition acts on.
    pub fn page(&self) -> &Page {
        match *self {
            PageEvent::BeforeCreate { page }
            | PageEvent::AfterCreate { page }
            | PageEvent::BeforeUpdate { page, .. }
            | PageEvent::AfterUpdate { page, .. }
            | PageEvent::BeforeDelete { page, .. }
            | PageEvent::AfterDelete { page, .. }
            | PageEvent::BeforePublish { page, .. }
            | PageEvent::AfterPublish { page, .. }
            | PageEvent::BeforeUnpublish { page }
            | PageEvent::AfterUnpublish { page }
            | PageEvent::BeforeRequestReview { page }
            | PageEvent::AfterRequestReview { page }
            | PageEvent::BeforeRequestChanges { page }
            | PageEvent::AfterRequestChanges { page } => page,
        }
    }
}

/// A named callback registered against lifecycle points.
#[async_trait]
pub trait PageHook: Send + Sync {
    fn name(&self) -> &str;

    /// Called for every lifecycle point; ignore the ones you don't need.
    async fn on_event(&self, event: &PageEvent<'_>) -> Result<(), HookError>;
}

/// Ordered hook list.
#[derive(Default, Clone)]
pub struct HookRegistry {
    hooks: Vec<Arc<dyn PageHook>>,
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.hooks.iter().map(|h| h.name()).collect();
        f.debug_struct("HookRegistry").field("hooks", &names).finish()
    }
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, hook: Arc<dyn PageHook>) {
        self.hooks.push(hook);
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run every hook in order, stopping at the first failure.
    pub async fn dispatch(&self, event: PageEvent<'_>) -> PageResult<()> {
        for hook in &self.hooks {
            if let Err(e) = hook.on_event(&event).await {
                log::warn!(
                    "Hook {} failed at {} for page {}: {e}",
                    hook.name(),
                    event.point(),
                    event.page().id
                );
                return Err(PageError::hook(hook.name(), e.to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagecraft_core::{content, Owner, PageSettings, PageStatus, Visibility};
    use std::sync::Mutex;

    struct Recorder {
        name: String,
        seen: Arc<Mutex<Vec<String>>>,
        fail_on: Option<&'static str>,
    }

    #[async_trait]
    impl PageHook for Recorder {
        fn name(&self) -> &str {
            &self.name
        }

        async fn on_event(&self, event: &PageEvent<'_>) -> Result<(), HookError> {
            self.seen
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.name, event.point()));
            if self.fail_on == Some(event.point()) {
                return Err("rejected".into());
            }
            Ok(())
        }
    }

    fn page() -> Page {
        let owner = Owner {
            id: "u1".into(),
            display_name: "User".into(),
            kind: "admin".into(),
        };
        Page {
            id: "a#0001".into(),
            pid: "a".into(),
            version: 1,
            tenant: "root".into(),
            locale: "en-US".into(),
            editor: "page-builder".into(),
            category: "static".into(),
            title: "A".into(),
            path: "/a".into(),
            status: PageStatus::Draft,
            locked: false,
            visibility: Visibility::default(),
            owned_by: owner.clone(),
            created_by: owner,
            created_on: 1,
            saved_on: 1,
            published_on: None,
            created_from: None,
            settings: PageSettings::default(),
            content: content::compress(None),
        }
    }

    #[tokio::test]
    async fn test_dispatch_order_and_abort() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HookRegistry::new();
        for (name, fail_on) in [("first", None), ("second", Some("beforePublish")), ("third", None)] {
            registry.register(Arc::new(Recorder {
                name: name.into(),
                seen: seen.clone(),
                fail_on,
            }));
        }

        let page = page();
        registry.dispatch(PageEvent::AfterCreate { page: &page }).await.unwrap();
        let err = registry
            .dispatch(PageEvent::BeforePublish {
                page: &page,
                latest: Some(&page),
                published: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Hook \"second\" failed: rejected");

        let seen = seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                "first:afterCreate",
                "second:afterCreate",
                "third:afterCreate",
                "first:beforePublish",
                "second:beforePublish",
            ]
        );
    }
}
