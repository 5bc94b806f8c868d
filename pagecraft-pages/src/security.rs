//! Identity & permission gate.
//!
//! A permission is looked up by name (`pb.page`) from the caller's
//! security context. Access letters:
//!
//! ```text
//! rwd  r = read   w = write   d = delete
//! pw   p = publish   u = unpublish   r = request review   c = request changes
//! ```
//!
//! A permission without an `rwd`/`pw` string grants every letter of that
//! class. `own: true` limits the caller to records they own.

use async_trait::async_trait;
use pagecraft_core::{Owner, Page};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{PageError, PageResult};

/// The caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub display_name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Identity {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            kind: kind.into(),
        }
    }

    /// Owner record stamped on pages this identity creates.
    pub fn owner(&self) -> Owner {
        Owner {
            id: self.id.clone(),
            display_name: self.display_name.clone(),
            kind: self.kind.clone(),
        }
    }
}

/// A permission granted to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Permission {
    pub name: String,
    /// Restricted to records the caller owns
    pub own: bool,
    pub rwd: Option<String>,
    pub pw: Option<String>,
}

impl Permission {
    /// Every letter of both classes.
    pub fn full(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn allows(&self, access: Access) -> bool {
        let granted = match access.class() {
            AccessClass::Rwd => &self.rwd,
            AccessClass::Pw => &self.pw,
        };
        match granted {
            None => true,
            Some(letters) => letters.contains(access.letter()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AccessClass {
    Rwd,
    Pw,
}

/// What an operation needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    Delete,
    Publish,
    Unpublish,
    RequestReview,
    RequestChanges,
}

impl Access {
    fn class(&self) -> AccessClass {
        match self {
            Access::Read | Access::Write | Access::Delete => AccessClass::Rwd,
            _ => AccessClass::Pw,
        }
    }

    pub fn letter(&self) -> char {
        match self {
            Access::Read => 'r',
            Access::Write => 'w',
            Access::Delete => 'd',
            Access::Publish => 'p',
            Access::Unpublish => 'u',
            Access::RequestReview => 'r',
            Access::RequestChanges => 'c',
        }
    }
}

/// Which owner field an own-only permission is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerField {
    OwnedBy,
    CreatedBy,
}

/// Per-request security capability.
#[async_trait]
pub trait SecurityContext: Send + Sync {
    fn identity(&self) -> Option<Identity>;
    fn tenant(&self) -> String;
    fn locale(&self) -> String;
    /// The caller's permission with `name`, if any.
    async fn permission(&self, name: &str) -> Option<Permission>;
}

/// Fails with `NotAuthorized` unless the caller holds `name` with `access`.
pub async fn check_base_permission(
    security: &dyn SecurityContext,
    name: &str,
    access: Access,
) -> PageResult<Permission> {
    let Some(permission) = security.permission(name).await else {
        return Err(PageError::not_authorized(format!("missing permission \"{name}\"")));
    };
    if !permission.allows(access) {
        return Err(PageError::not_authorized(format!(
            "permission \"{name}\" does not grant \"{}\"",
            access.letter()
        )));
    }
    Ok(permission)
}

/// For own-only permissions, fails unless `page` belongs to `identity`.
pub fn check_own_permission(
    identity: Option<&Identity>,
    permission: &Permission,
    page: &Page,
    field: OwnerField,
) -> PageResult<()> {
    if !permission.own {
        return Ok(());
    }
    let owner = match field {
        OwnerField::OwnedBy => &page.owned_by,
        OwnerField::CreatedBy => &page.created_by,
    };
    match identity {
        Some(identity) if identity.id == owner.id => Ok(()),
        _ => Err(PageError::not_authorized(format!(
            "page \"{}\" belongs to another user",
            page.id
        ))),
    }
}

/// Fixed identity and permission set.
///
/// Lookup falls back from the exact name to `{prefix}.*` and then `*`.
#[derive(Debug, Clone)]
pub struct StaticSecurity {
    identity: Option<Identity>,
    tenant: String,
    locale: String,
    permissions: HashMap<String, Permission>,
}

impl StaticSecurity {
    pub fn new(identity: Option<Identity>, tenant: impl Into<String>, locale: impl Into<String>) -> Self {
        Self {
            identity,
            tenant: tenant.into(),
            locale: locale.into(),
            permissions: HashMap::new(),
        }
    }

    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permissions.insert(permission.name.clone(), permission);
        self
    }

    /// Full access to everything.
    pub fn full_access(identity: Identity, tenant: impl Into<String>, locale: impl Into<String>) -> Self {
        Self::new(Some(identity), tenant, locale).with_permission(Permission::full("*"))
    }
}

#[async_trait]
impl SecurityContext for StaticSecurity {
    fn identity(&self) -> Option<Identity> {
        self.identity.clone()
    }

    fn tenant(&self) -> String {
        self.tenant.clone()
    }

    fn locale(&self) -> String {
        self.locale.clone()
    }

    async fn permission(&self, name: &str) -> Option<Permission> {
        if let Some(permission) = self.permissions.get(name) {
            return Some(permission.clone());
        }
        let wildcard = name
            .split_once('.')
            .and_then(|(prefix, _)| self.permissions.get(&format!("{prefix}.*")));
        wildcard.or_else(|| self.permissions.get("*")).cloned()
    }
}
