//! Lifecycle error type.
//!
//! Every variant maps to a stable machine-readable code via
//! [`PageError::code`]; `Display` is the human-readable message.

use pagecraft_core::{CodecError, ValidationError};
use thiserror::Error;

use crate::search::SearchError;
use crate::storage::StoreError;

pub const CODE_CHANGES_ON_OWN_REVISION: &str = "REQUESTED_CHANGES_ON_PAGE_REVISION_YOU_CREATED";
pub const CODE_CHANGES_NOT_UNDER_REVIEW: &str =
    "REQUESTED_CHANGES_ON_PAGE_REVISION_NOT_UNDER_REVIEW";
pub const CODE_REVIEW_NOT_ALLOWED: &str = "REQUEST_REVIEW_NOT_ALLOWED";
pub const CODE_NOT_PUBLISHED: &str = "PAGE_NOT_PUBLISHED";
pub const CODE_SPECIAL_PAGE: &str = "SPECIAL_PAGE";

#[derive(Debug, Error)]
pub enum PageError {
    #[error("{0}")]
    NotFound(String),
    #[error("Not authorized: {0}")]
    NotAuthorized(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    Locked(String),
    #[error("{message}")]
    Conflict { code: &'static str, message: String },
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error("Hook \"{hook}\" failed: {message}")]
    Hook { hook: String, message: String },
}

impl PageError {
    pub fn not_found(message: impl Into<String>) -> Self {
        PageError::NotFound(message.into())
    }

    pub fn not_authorized(message: impl Into<String>) -> Self {
        PageError::NotAuthorized(message.into())
    }

    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        PageError::Conflict {
            code,
            message: message.into(),
        }
    }

    pub fn hook(hook: impl Into<String>, message: impl Into<String>) -> Self {
        PageError::Hook {
            hook: hook.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            PageError::NotFound(_) => "NOT_FOUND",
            PageError::NotAuthorized(_) => "NOT_AUTHORIZED",
            PageError::Validation(_) => "VALIDATION_FAILED",
            PageError::Locked(_) => "LOCKED",
            PageError::Conflict { code, .. } => code,
            PageError::Codec(_) => "CODEC_ERROR",
            PageError::Store(_) => "STORE_ERROR",
            PageError::Search(_) => "SEARCH_ERROR",
            PageError::Hook { .. } => "HOOK_ERROR",
        }
    }
}

pub type PageResult<T> = Result<T, PageError>;
