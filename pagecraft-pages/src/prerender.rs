//! Prerendering dispatch.
//!
//! Turns "these paths/tags changed" into render or flush jobs for an
//! external prerendering service. Dispatch is fire-and-forget: sink
//! failures are logged, never returned to the lifecycle operation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::PageResult;
use crate::settings::SettingsProvider;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathTarget {
    pub path: String,
    /// Overrides merged over the generated configuration
    pub configuration: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagTarget {
    pub tag: Value,
    pub configuration: Value,
}

/// Paths and tags to render or flush.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderArgs {
    pub paths: Vec<PathTarget>,
    pub tags: Vec<TagTarget>,
}

impl RenderArgs {
    /// A single path with no configuration overrides.
    pub fn for_path(path: impl Into<String>) -> Self {
        Self {
            paths: vec![PathTarget {
                path: path.into(),
                configuration: Value::Null,
            }],
            tags: Vec::new(),
        }
    }
}

/// Render or flush of one URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderJob {
    pub url: String,
    pub configuration: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueAction {
    Render,
    Flush,
}

/// Deferred tag job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueJob {
    pub action: QueueAction,
    pub tag: Value,
    pub configuration: Value,
}

/// External prerendering service.
#[async_trait]
pub trait PrerenderSink: Send + Sync {
    async fn render(&self, jobs: Vec<RenderJob>) -> PageResult<()>;
    async fn flush(&self, jobs: Vec<RenderJob>) -> PageResult<()>;
    async fn enqueue(&self, jobs: Vec<QueueJob>) -> PageResult<()>;
}

/// Deep-merge `overlay` into `base`. Objects merge key by key; anything
/// else in `overlay` (except `null`) replaces the base value.
pub fn merge_json(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                merge_json(base.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
        (_, Value::Null) => {}
        (base, overlay) => *base = overlay.clone(),
    }
}

fn merged(mut base: Value, overlay: &Value) -> Value {
    merge_json(&mut base, overlay);
    base
}

fn first_set(current: &Option<String>, fallback: &Option<String>) -> Option<String> {
    [current, fallback]
        .into_iter()
        .flatten()
        .find(|v| !v.is_empty())
        .cloned()
}

struct Resolved {
    app_url: Option<String>,
    storage_name: Option<String>,
    meta: Value,
}

/// Builds jobs from settings and hands them to a [`PrerenderSink`].
#[derive(Clone)]
pub struct Prerenderer {
    settings: Arc<dyn SettingsProvider>,
    sink: Arc<dyn PrerenderSink>,
}

impl Prerenderer {
    pub fn new(settings: Arc<dyn SettingsProvider>, sink: Arc<dyn PrerenderSink>) -> Self {
        Self { settings, sink }
    }

    async fn resolve(&self) -> PageResult<Resolved> {
        let current = self.settings.get().await?.unwrap_or_default();
        let defaults = self.settings.get_default().await?.unwrap_or_default();
        Ok(Resolved {
            app_url: first_set(&current.prerendering.app.url, &defaults.prerendering.app.url),
            storage_name: first_set(
                &current.prerendering.storage.name,
                &defaults.prerendering.storage.name,
            ),
            meta: merged(defaults.prerendering.meta, &current.prerendering.meta),
        })
    }

    fn db_config(tenant: &str) -> Value {
        json!({ "db": { "namespace": format!("T#{tenant}") } })
    }

    /// Render `args.paths` now and queue `args.tags`. Skipped unless both
    /// the app URL and the storage name are configured.
    pub async fn render(&self, tenant: &str, args: &RenderArgs) -> PageResult<()> {
        let resolved = self.resolve().await?;
        let (Some(app_url), Some(storage_name)) = (resolved.app_url, resolved.storage_name) else {
            log::debug!("Prerendering not configured, skipping render");
            return Ok(());
        };

        if !args.paths.is_empty() {
            let jobs = args
                .paths
                .iter()
                .map(|target| {
                    let mut base = json!({
                        "meta": resolved.meta,
                        "storage": {
                            "folder": target.path.trim_start_matches('/'),
                            "name": storage_name,
                        },
                    });
                    merge_json(&mut base, &Self::db_config(tenant));
                    RenderJob {
                        url: format!("{app_url}{}", target.path),
                        configuration: merged(base, &target.configuration),
                    }
                })
                .collect();
            self.dispatch("render", self.sink.render(jobs).await);
        }

        if !args.tags.is_empty() {
            let jobs = self.tag_jobs(QueueAction::Render, tenant, &args.tags);
            self.dispatch("render queue", self.sink.enqueue(jobs).await);
        }
        Ok(())
    }

    /// Flush `args.paths` now and queue `args.tags`. Skipped unless the
    /// storage name is configured.
    pub async fn flush(&self, tenant: &str, args: &RenderArgs) -> PageResult<()> {
        let resolved = self.resolve().await?;
        if resolved.storage_name.is_none() {
            log::debug!("Prerendering storage not configured, skipping flush");
            return Ok(());
        }
        let app_url = resolved.app_url.unwrap_or_default();

        if !args.paths.is_empty() {
            let jobs = args
                .paths
                .iter()
                .map(|target| RenderJob {
                    url: format!("{app_url}{}", target.path),
                    configuration: merged(Self::db_config(tenant), &target.configuration),
                })
                .collect();
            self.dispatch("flush", self.sink.flush(jobs).await);
        }

        if !args.tags.is_empty() {
            let jobs = self.tag_jobs(QueueAction::Flush, tenant, &args.tags);
            self.dispatch("flush queue", self.sink.enqueue(jobs).await);
        }
        Ok(())
    }

    fn tag_jobs(&self, action: QueueAction, tenant: &str, tags: &[TagTarget]) -> Vec<QueueJob> {
        tags.iter()
            .map(|target| QueueJob {
                action,
                tag: target.tag.clone(),
                configuration: merged(Self::db_config(tenant), &target.configuration),
            })
            .collect()
    }

    fn dispatch(&self, what: &str, result: PageResult<()>) {
        if let Err(e) = result {
            log::warn!("Prerendering {what} dispatch failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PageError;
    use crate::settings::{Settings, StaticSettings};
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        rendered: Mutex<Vec<RenderJob>>,
        flushed: Mutex<Vec<RenderJob>>,
        queued: Mutex<Vec<QueueJob>>,
        fail: bool,
    }

    #[async_trait]
    impl PrerenderSink for RecordingSink {
        async fn render(&self, jobs: Vec<RenderJob>) -> PageResult<()> {
            if self.fail {
                return Err(PageError::hook("prerender", "offline"));
            }
            self.rendered.lock().await.extend(jobs);
            Ok(())
        }

        async fn flush(&self, jobs: Vec<RenderJob>) -> PageResult<()> {
            self.flushed.lock().await.extend(jobs);
            Ok(())
        }

        async fn enqueue(&self, jobs: Vec<QueueJob>) -> PageResult<()> {
            self.queued.lock().await.extend(jobs);
            Ok(())
        }
    }

    fn settings(url: Option<&str>, storage: Option<&str>, meta: Value) -> Settings {
        let mut settings = Settings::default();
        settings.prerendering.app.url = url.map(String::from);
        settings.prerendering.storage.name = storage.map(String::from);
        settings.prerendering.meta = meta;
        settings
    }

    fn args() -> RenderArgs {
        RenderArgs {
            paths: vec![PathTarget {
                path: "/about".into(),
                configuration: json!({"meta": {"priority": 1}}),
            }],
            tags: vec![TagTarget {
                tag: json!({"key": "pb-menu", "value": "main"}),
                configuration: Value::Null,
            }],
        }
    }

    #[test]
    fn test_merge_json() {
        let mut base = json!({"a": {"b": 1, "c": 2}, "d": [1]});
        merge_json(&mut base, &json!({"a": {"c": 3, "e": 4}, "d": [2], "f": null}));
        assert_eq!(base, json!({"a": {"b": 1, "c": 3, "e": 4}, "d": [2], "f": null}));
    }

    #[tokio::test]
    async fn test_render_uses_current_then_default_settings() {
        let current = settings(None, Some("bucket"), json!({"lang": "en"}));
        let defaults = settings(Some("https://site"), Some("default-bucket"), json!({"x": 1}));
        let sink = Arc::new(RecordingSink::default());
        let prerenderer = Prerenderer::new(
            Arc::new(StaticSettings::new(Some(current), Some(defaults))),
            sink.clone(),
        );

        prerenderer.render("root", &args()).await.unwrap();

        let rendered = sink.rendered.lock().await;
        assert_eq!(rendered.len(), 1);
        assert_eq!(rendered[0].url, "https://site/about");
        assert_eq!(
            rendered[0].configuration,
            json!({
                "meta": {"x": 1, "lang": "en", "priority": 1},
                "storage": {"folder": "about", "name": "bucket"},
                "db": {"namespace": "T#root"},
            })
        );
        let queued = sink.queued.lock().await;
        assert_eq!(queued[0].action, QueueAction::Render);
        assert_eq!(queued[0].configuration, json!({"db": {"namespace": "T#root"}}));
    }

    #[tokio::test]
    async fn test_render_skipped_without_app_url() {
        let sink = Arc::new(RecordingSink::default());
        let prerenderer = Prerenderer::new(
            Arc::new(StaticSettings::new(Some(settings(None, Some("bucket"), Value::Null)), None)),
            sink.clone(),
        );
        prerenderer.render("root", &args()).await.unwrap();
        assert!(sink.rendered.lock().await.is_empty());

        // Flush only needs the storage name.
        prerenderer.flush("root", &args()).await.unwrap();
        let flushed = sink.flushed.lock().await;
        assert_eq!(flushed[0].url, "/about");
        assert_eq!(sink.queued.lock().await[0].action, QueueAction::Flush);
    }

    #[tokio::test]
    async fn test_sink_failure_is_not_propagated() {
        let sink = Arc::new(RecordingSink {
            fail: true,
            ..RecordingSink::default()
        });
        let prerenderer = Prerenderer::new(
            Arc::new(StaticSettings::new(
                Some(settings(Some("https://site"), Some("bucket"), Value::Null)),
                None,
            )),
            sink,
        );
        assert!(prerenderer.render("root", &args()).await.is_ok());
    }
}
