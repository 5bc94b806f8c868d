//! Page categories: each carries the URL prefix and layout new pages inherit.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::PageResult;

/// Category whose pages live directly under `/`.
pub const STATIC_CATEGORY: &str = "static";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub slug: String,
    pub name: String,
    pub url: String,
    pub layout: Option<String>,
}

impl Category {
    pub fn new(slug: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            name: name.into(),
            url: url.into(),
            layout: None,
        }
    }

    pub fn with_layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = Some(layout.into());
        self
    }
}

#[async_trait]
pub trait CategoryProvider: Send + Sync {
    async fn get(&self, slug: &str) -> PageResult<Option<Category>>;
}

/// Fixed category set. `Default` holds only the `static` category.
#[derive(Debug, Clone)]
pub struct StaticCategories {
    categories: HashMap<String, Category>,
}

impl Default for StaticCategories {
    fn default() -> Self {
        Self::empty().with(Category::new(STATIC_CATEGORY, "Static", "/static/").with_layout("static"))
    }
}

impl StaticCategories {
    pub fn empty() -> Self {
        Self {
            categories: HashMap::new(),
        }
    }

    pub fn with(mut self, category: Category) -> Self {
        self.categories.insert(category.slug.clone(), category);
        self
    }
}

#[async_trait]
impl CategoryProvider for StaticCategories {
    async fn get(&self, slug: &str) -> PageResult<Option<Category>> {
        Ok(self.categories.get(slug).cloned())
    }
}
