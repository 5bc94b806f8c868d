//! Site-wide page-builder settings collaborator.
//!
//! Two things matter to the lifecycle engine: special-page bindings
//! (`home`, `notFound`, ... → pid) and prerendering configuration.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::PageResult;

/// Special-page key of the home page.
pub const HOME_PAGE: &str = "home";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrerenderingSettings {
    pub app: AppSettings,
    pub storage: StorageSettings,
    /// Free-form metadata merged into every render job
    pub meta: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Special-page key → pid
    pub pages: BTreeMap<String, String>,
    pub prerendering: PrerenderingSettings,
}

impl Settings {
    /// The special-page key `pid` is bound to, if any.
    pub fn special_page_key(&self, pid: &str) -> Option<&str> {
        self.pages
            .iter()
            .find(|(_, bound)| bound.as_str() == pid)
            .map(|(key, _)| key.as_str())
    }

    pub fn home_page(&self) -> Option<&str> {
        self.pages.get(HOME_PAGE).map(String::as_str)
    }
}

/// Current and default settings of the caller's tenant.
#[async_trait]
pub trait SettingsProvider: Send + Sync {
    async fn get(&self) -> PageResult<Option<Settings>>;
    async fn get_default(&self) -> PageResult<Option<Settings>>;
}

/// Settings held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticSettings {
    current: Option<Settings>,
    defaults: Option<Settings>,
}

impl StaticSettings {
    pub fn new(current: Option<Settings>, defaults: Option<Settings>) -> Self {
        Self { current, defaults }
    }
}

#[async_trait]
impl SettingsProvider for StaticSettings {
    async fn get(&self) -> PageResult<Option<Settings>> {
        Ok(self.current.clone())
    }

    async fn get_default(&self) -> PageResult<Option<Settings>> {
        Ok(self.defaults.clone())
    }
}
