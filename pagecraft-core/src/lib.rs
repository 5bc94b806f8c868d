//! # pagecraft-core — Page revision model for Pagecraft
//!
//! Pure data types shared by the storage, search and lifecycle layers.
//! Nothing in this crate performs I/O.
//!
//! ## Modules
//!
//! - [`page`] — `Page`, `PageId`, `PageStatus`, visibility and ownership
//! - [`path`] — URL path canonicalization
//! - [`content`] — LZ4 content codec (`{compression, content}` blobs)
//! - [`settings`] — general/social/seo/advanced page settings
//! - [`update`] — validated page patches
//!
//! ## Identity
//!
//! ```text
//! pid ── stable across revisions
//!  │
//!  ├── pid#0001   (first revision)
//!  ├── pid#0002   (createFrom 0001)
//!  └── pid#0003   ...
//! ```

pub mod content;
pub mod page;
pub mod path;
pub mod settings;
pub mod update;

pub use content::{CodecError, CompressedContent, COMPRESSION_LZ4};
pub use page::{
    now_millis, Owner, Page, PageId, PageRef, PageStatus, Visibility, VisibilityFlags, MAX_VERSION,
};
pub use path::normalize as normalize_path;
pub use settings::{
    FileRef, GeneralSettings, MetaTag, PageSettings, SeoSettings, SocialSettings,
};
pub use update::{PageUpdate, ValidationError};
