//! Page revisions and their identifiers.
//!
//! A page is addressed externally as `pid#version` with the version
//! zero-padded to four digits (`8f2c…#0004`). The pid is shared by every
//! revision of the same logical page.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

use crate::content::{CodecError, CompressedContent};
use crate::settings::PageSettings;
use crate::update::ValidationError;

/// Width of the zero-padded version in page ids and sort keys.
pub const VERSION_WIDTH: usize = 4;

/// Highest version that still fits [`VERSION_WIDTH`] digits.
pub const MAX_VERSION: u32 = 9999;

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Per-revision workflow status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PageStatus {
    /// Editable, not under review
    Draft,
    /// Locked, awaiting a reviewer
    ReviewRequested,
    /// Unlocked, sent back by a reviewer
    ChangesRequested,
    /// Live
    Published,
    /// Was live, now withdrawn
    Unpublished,
}

impl PageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageStatus::Draft => "draft",
            PageStatus::ReviewRequested => "reviewRequested",
            PageStatus::ChangesRequested => "changesRequested",
            PageStatus::Published => "published",
            PageStatus::Unpublished => "unpublished",
        }
    }

    /// Parse the wire name of a status.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(PageStatus::Draft),
            "reviewRequested" => Some(PageStatus::ReviewRequested),
            "changesRequested" => Some(PageStatus::ChangesRequested),
            "published" => Some(PageStatus::Published),
            "unpublished" => Some(PageStatus::Unpublished),
            _ => None,
        }
    }
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pair of latest/published flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilityFlags {
    pub latest: bool,
    pub published: bool,
}

impl Default for VisibilityFlags {
    fn default() -> Self {
        Self {
            latest: true,
            published: true,
        }
    }
}

/// Controls inclusion in search listings (`list`) and direct reads (`get`).
///
/// Store presence is never affected by visibility; only the search
/// projection is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Visibility {
    pub list: VisibilityFlags,
    pub get: VisibilityFlags,
}

/// Owner or creator of a revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    pub id: String,
    pub display_name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Fully qualified revision id: `pid#0004`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId {
    pub pid: String,
    pub version: u32,
}

impl PageId {
    pub fn new(pid: impl Into<String>, version: u32) -> Self {
        Self {
            pid: pid.into(),
            version,
        }
    }

    /// Parse `pid#version`. The version part is mandatory.
    pub fn parse(id: &str) -> Result<Self, ValidationError> {
        let reference = PageRef::parse(id)?;
        match reference.version {
            Some(version) => Ok(Self::new(reference.pid, version)),
            None => Err(ValidationError::field(
                "id",
                format!("Page id \"{id}\" is missing a version."),
            )),
        }
    }

    /// Zero-padded version, e.g. `0004`.
    pub fn padded_version(&self) -> String {
        format!("{:0width$}", self.version, width = VERSION_WIDTH)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.pid, self.padded_version())
    }
}

/// A page reference with an optional version (`pid` or `pid#0004`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRef {
    pub pid: String,
    pub version: Option<u32>,
}

impl PageRef {
    pub fn parse(id: &str) -> Result<Self, ValidationError> {
        let id = id.trim();
        let (pid, version) = match id.split_once('#') {
            Some((pid, version)) => (pid, Some(version)),
            None => (id, None),
        };

        if pid.is_empty() {
            return Err(ValidationError::field("id", "Page id must not be empty."));
        }

        let version = match version {
            None => None,
            Some(raw) => {
                let parsed = raw
                    .parse::<u32>()
                    .ok()
                    .filter(|v| *v > 0 && raw.bytes().all(|b| b.is_ascii_digit()));
                match parsed {
                    Some(v) => Some(v),
                    None => {
                        return Err(ValidationError::field(
                            "id",
                            format!("Invalid page version \"{raw}\"."),
                        ))
                    }
                }
            }
        };

        Ok(Self {
            pid: pid.to_string(),
            version,
        })
    }
}

/// One versioned snapshot of a page.
///
/// The same structure is stored for the revision record, the latest
/// pointer, the published pointer and the published-path entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: String,
    pub pid: String,
    pub version: u32,
    pub tenant: String,
    pub locale: String,
    pub editor: String,
    pub category: String,
    pub title: String,
    pub path: String,
    pub status: PageStatus,
    pub locked: bool,
    #[serde(default)]
    pub visibility: Visibility,
    pub owned_by: Owner,
    pub created_by: Owner,
    pub created_on: u64,
    pub saved_on: u64,
    pub published_on: Option<u64>,
    pub created_from: Option<String>,
    #[serde(default)]
    pub settings: PageSettings,
    #[serde(default)]
    pub content: CompressedContent,
}

impl Page {
    pub fn page_id(&self) -> PageId {
        PageId::new(self.pid.clone(), self.version)
    }

    pub fn is_published(&self) -> bool {
        self.status == PageStatus::Published
    }

    /// Decompressed page content, `None` for the empty placeholder.
    pub fn content(&self) -> Result<Option<serde_json::Value>, CodecError> {
        self.content.extract()
    }

    pub fn tags(&self) -> &[String] {
        self.settings.general.tags.as_deref().unwrap_or_default()
    }
}
