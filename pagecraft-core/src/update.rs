//! Validated page patches.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::content;
use crate::page::{now_millis, Page, Visibility};
use crate::path;
use crate::settings::PageSettings;

pub const MAX_TITLE_CHARS: usize = 150;
pub const MIN_PATH_CHARS: usize = 2;

/// A payload failed validation. `invalid_fields` lists dotted field paths.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
    pub invalid_fields: Vec<String>,
}

impl ValidationError {
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            invalid_fields: vec![field.into()],
        }
    }

    /// `Ok(())` when `fields` is empty, otherwise an error naming them.
    pub fn from_fields(fields: Vec<String>) -> Result<(), Self> {
        if fields.is_empty() {
            return Ok(());
        }
        Err(Self {
            message: format!("Validation failed: {}.", fields.join(", ")),
            invalid_fields: fields,
        })
    }
}

/// Fields a caller may change through the ordinary edit path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageUpdate {
    pub title: Option<String>,
    pub path: Option<String>,
    pub category: Option<String>,
    pub content: Option<Value>,
    pub visibility: Option<Visibility>,
    pub settings: Option<PageSettings>,
}

impl PageUpdate {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn invalid_fields(&self) -> Vec<String> {
        let mut invalid = Vec::new();

        if let Some(title) = &self.title {
            let chars = title.trim().chars().count();
            if chars == 0 || chars > MAX_TITLE_CHARS {
                invalid.push("title".to_string());
            }
        }
        if let Some(raw) = &self.path {
            if path::normalize(raw).len() < MIN_PATH_CHARS {
                invalid.push("path".to_string());
            }
        }
        if let Some(category) = &self.category {
            if category.trim().is_empty() {
                invalid.push("category".to_string());
            }
        }
        if let Some(settings) = &self.settings {
            invalid.extend(settings.invalid_fields());
        }

        invalid
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        ValidationError::from_fields(self.invalid_fields())
    }

    /// Validate and apply onto `page`: normalizes the path, merges settings,
    /// re-compresses content and bumps `saved_on`.
    pub fn apply(&self, page: &mut Page) -> Result<(), ValidationError> {
        self.validate()?;

        let mut settings = page.settings.clone();
        if let Some(patch) = &self.settings {
            settings.merge(patch);
            settings.validate()?;
        }

        if let Some(title) = &self.title {
            page.title = title.trim().to_string();
        }
        if let Some(raw) = &self.path {
            page.path = path::normalize(raw);
        }
        if let Some(category) = &self.category {
            page.category = category.clone();
        }
        if let Some(visibility) = self.visibility {
            page.visibility = visibility;
        }
        if let Some(value) = &self.content {
            page.content = content::compress(Some(value));
        }
        page.settings = settings;
        page.saved_on = now_millis();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{Owner, PageStatus};
    use serde_json::json;

    fn sample_page() -> Page {
        let owner = Owner {
            id: "u1".into(),
            display_name: "User".into(),
            kind: "admin".into(),
        };
        Page {
            id: "p#0001".into(),
            pid: "p".into(),
            version: 1,
            tenant: "root".into(),
            locale: "en-US".into(),
            editor: "page-builder".into(),
            category: "static".into(),
            title: "Untitled".into(),
            path: "/untitled".into(),
            status: PageStatus::Draft,
            locked: false,
            visibility: Visibility::default(),
            owned_by: owner.clone(),
            created_by: owner,
            created_on: 1,
            saved_on: 1,
            published_on: None,
            created_from: None,
            settings: PageSettings::with_layout(Some("static".into())),
            content: content::compress(None),
        }
    }

    #[test]
    fn test_apply_changes_only_given_fields() {
        let mut page = sample_page();
        let mut settings = PageSettings::default();
        settings.general.snippet = Some("hello".into());
        let update = PageUpdate {
            title: Some("  Welcome ".into()),
            path: Some("welcome/".into()),
            content: Some(json!({"elements": []})),
            settings: Some(settings),
            ..PageUpdate::default()
        };

        update.apply(&mut page).unwrap();
        assert_eq!(page.title, "Welcome");
        assert_eq!(page.path, "/welcome");
        assert_eq!(page.category, "static");
        assert_eq!(page.settings.general.layout.as_deref(), Some("static"));
        assert_eq!(page.settings.general.snippet.as_deref(), Some("hello"));
        assert_eq!(page.content().unwrap(), Some(json!({"elements": []})));
        assert!(page.saved_on > 1);
    }

    #[test]
    fn test_invalid_update_lists_fields() {
        let mut page = sample_page();
        let before = page.clone();
        let update = PageUpdate {
            title: Some("".into()),
            path: Some("/".into()),
            ..PageUpdate::default()
        };

        let err = update.apply(&mut page).unwrap_err();
        assert_eq!(err.invalid_fields, vec!["title".to_string(), "path".to_string()]);
        assert!(err.to_string().contains("title, path"));
        assert_eq!(page, before);
    }

    #[test]
    fn test_title_length_limit() {
        assert!(PageUpdate::title("x".repeat(MAX_TITLE_CHARS)).validate().is_ok());
        assert!(PageUpdate::title("x".repeat(MAX_TITLE_CHARS + 1)).validate().is_err());
    }
}
