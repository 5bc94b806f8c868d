//! Page settings: general, social, seo and an open `advanced` map.
//!
//! Every field is optional so the same structure doubles as a patch;
//! [`PageSettings::merge`] overlays the fields a patch sets.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::update::ValidationError;

pub const MAX_SNIPPET_CHARS: usize = 500;
pub const MAX_TAGS: usize = 30;
pub const MAX_TAG_CHARS: usize = 50;
pub const MAX_META_TITLE_CHARS: usize = 150;
pub const MAX_META_DESCRIPTION_CHARS: usize = 500;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub id: String,
    pub src: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaTag {
    pub property: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    pub snippet: Option<String>,
    pub tags: Option<Vec<String>>,
    pub layout: Option<String>,
    pub image: Option<FileRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialSettings {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<FileRef>,
    pub meta: Option<Vec<MetaTag>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeoSettings {
    pub title: Option<String>,
    pub description: Option<String>,
    pub meta: Option<Vec<MetaTag>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSettings {
    pub general: GeneralSettings,
    pub social: SocialSettings,
    pub seo: SeoSettings,
    pub advanced: BTreeMap<String, Value>,
}

fn overlay<T: Clone>(target: &mut Option<T>, patch: &Option<T>) {
    if let Some(value) = patch {
        *target = Some(value.clone());
    }
}

impl PageSettings {
    /// Settings for a freshly created page in a category with `layout`.
    pub fn with_layout(layout: Option<String>) -> Self {
        let mut settings = Self::default();
        settings.general.layout = layout;
        settings
    }

    /// Overlay every field `patch` sets onto `self`.
    pub fn merge(&mut self, patch: &PageSettings) {
        let general = &patch.general;
        overlay(&mut self.general.snippet, &general.snippet);
        overlay(&mut self.general.tags, &general.tags);
        overlay(&mut self.general.layout, &general.layout);
        overlay(&mut self.general.image, &general.image);

        let social = &patch.social;
        overlay(&mut self.social.title, &social.title);
        overlay(&mut self.social.description, &social.description);
        overlay(&mut self.social.image, &social.image);
        overlay(&mut self.social.meta, &social.meta);

        let seo = &patch.seo;
        overlay(&mut self.seo.title, &seo.title);
        overlay(&mut self.seo.description, &seo.description);
        overlay(&mut self.seo.meta, &seo.meta);

        for (key, value) in &patch.advanced {
            self.advanced.insert(key.clone(), value.clone());
        }
    }

    /// Collect every invalid field path.
    pub fn invalid_fields(&self) -> Vec<String> {
        let mut invalid = Vec::new();

        if too_long(&self.general.snippet, MAX_SNIPPET_CHARS) {
            invalid.push("settings.general.snippet".to_string());
        }
        if let Some(tags) = &self.general.tags {
            if tags.len() > MAX_TAGS
                || tags
                    .iter()
                    .any(|t| t.trim().is_empty() || t.chars().count() > MAX_TAG_CHARS)
            {
                invalid.push("settings.general.tags".to_string());
            }
        }
        if too_long(&self.social.title, MAX_META_TITLE_CHARS) {
            invalid.push("settings.social.title".to_string());
        }
        if too_long(&self.social.description, MAX_META_DESCRIPTION_CHARS) {
            invalid.push("settings.social.description".to_string());
        }
        if too_long(&self.seo.title, MAX_META_TITLE_CHARS) {
            invalid.push("settings.seo.title".to_string());
        }
        if too_long(&self.seo.description, MAX_META_DESCRIPTION_CHARS) {
            invalid.push("settings.seo.description".to_string());
        }
        for (section, meta) in [("social", &self.social.meta), ("seo", &self.seo.meta)] {
            if let Some(meta) = meta {
                if meta.iter().any(|m| m.property.trim().is_empty()) {
                    invalid.push(format!("settings.{section}.meta"));
                }
            }
        }

        invalid
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        ValidationError::from_fields(self.invalid_fields())
    }
}

fn too_long(value: &Option<String>, max: usize) -> bool {
    value.as_ref().is_some_and(|v| v.chars().count() > max)
}
