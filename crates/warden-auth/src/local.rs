//! Local permission callbacks
//!
//! The flat path does not compile rules. It asks an application callback
//! instead, in one of two shapes:
//!
//! - [`PermissionLookup`] returns the permissions a principal holds and
//!   leaves combinator evaluation to the authorizer.
//! - [`PermissionCheck`] receives the whole request and decides itself,
//!   optionally returning claims.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use warden_rbac::{Claims, DecisionRequest, PermissionSet, PrincipalId};

/// Error returned by an application callback.
pub type LookupError = Box<dyn std::error::Error + Send + Sync>;

/// Callback returning the permissions a principal holds.
#[async_trait]
pub trait PermissionLookup: Send + Sync {
    /// Permissions held by `principal`. Unknown principals hold none.
    async fn held_permissions(&self, principal: PrincipalId) -> Result<PermissionSet, LookupError>;
}

/// Outcome of a [`PermissionCheck`].
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    /// Permitted, optionally with data about the principal.
    Granted(Option<Claims>),
    /// Not permitted.
    Denied,
}

/// Callback deciding a request on its own.
#[async_trait]
pub trait PermissionCheck: Send + Sync {
    /// Decide `request` for `principal`.
    async fn check(
        &self,
        principal: PrincipalId,
        request: &DecisionRequest,
    ) -> Result<CheckOutcome, LookupError>;
}

/// The callback a local strategy delegates to.
#[derive(Clone)]
pub enum LocalStrategy {
    /// Held-permissions lookup; combinators are applied by the authorizer.
    Lookup(Arc<dyn PermissionLookup>),
    /// Self-deciding check.
    Check(Arc<dyn PermissionCheck>),
}

impl std::fmt::Debug for LocalStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocalStrategy::Lookup(_) => f.write_str("LocalStrategy::Lookup"),
            LocalStrategy::Check(_) => f.write_str("LocalStrategy::Check"),
        }
    }
}

/// [`PermissionLookup`] over a fixed principal → permissions table.
///
/// # Example
///
/// ```
/// use warden_auth::StaticPermissions;
///
/// let table = StaticPermissions::new()
///     .with_principal(0, ["users:create", "users:remove"])
///     .with_principal(1, ["users:read"]);
/// assert_eq!(table.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticPermissions {
    table: HashMap<PrincipalId, PermissionSet>,
}

impl StaticPermissions {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a principal with its permissions.
    pub fn with_principal<I, S>(mut self, principal: i64, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set = permissions
            .into_iter()
            .map(|p| warden_rbac::Permission::new(p.as_ref()))
            .collect();
        self.table.insert(PrincipalId(principal), set);
        self
    }

    /// Number of principals in the table.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[async_trait]
impl PermissionLookup for StaticPermissions {
    async fn held_permissions(&self, principal: PrincipalId) -> Result<PermissionSet, LookupError> {
        Ok(self.table.get(&principal).cloned().unwrap_or_default())
    }
}
