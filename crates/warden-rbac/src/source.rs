//! Data source contracts
//!
//! The engine does not persist roles, users or permissions. It consumes
//! them through these two async traits; storage backends implement them.

use async_trait::async_trait;

use crate::request::PrincipalId;

/// Error returned by a source implementation.
pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for source operations.
pub type SourceResult<T> = Result<T, SourceError>;

/// Access to roles and their permissions.
///
/// `Role` and `Permission` are the backend's own record types; the engine
/// only ever asks the source to resolve names and ids from them.
#[async_trait]
pub trait RolesSource: Send + Sync {
    /// Backend role record.
    type Role: Send + Sync;

    /// Backend permission record.
    type Permission: Send + Sync;

    /// Find a role by its id.
    async fn find_by_id(&self, id: u64) -> SourceResult<Option<Self::Role>>;

    /// Find a role by its name.
    async fn find_by_name(&self, name: &str) -> SourceResult<Option<Self::Role>>;

    /// Get a role's name.
    async fn get_role_name(&self, role: &Self::Role) -> SourceResult<String>;

    /// Get a role's id.
    async fn get_role_id(&self, role: &Self::Role) -> SourceResult<u64>;

    /// Get the permissions of every role with the given name.
    async fn get_role_permissions_by_role_name(
        &self,
        name: &str,
    ) -> SourceResult<Vec<Self::Permission>>;

    /// Get the permissions of the role with the given id.
    async fn get_role_permissions_by_role_id(&self, id: u64) -> SourceResult<Vec<Self::Permission>>;

    /// Find the roles granting a permission (by permission name).
    async fn find_roles_by_permission(&self, permission: &str) -> SourceResult<Vec<Self::Role>>;

    /// Get a permission's name. Empty names are ignored by the compiler.
    async fn get_permission_name(&self, permission: &Self::Permission) -> SourceResult<String>;

    /// Get a permission's id.
    async fn get_permission_id(&self, permission: &Self::Permission) -> SourceResult<u64>;

    /// Enumerate every role in the system.
    async fn find_all_roles(&self) -> SourceResult<Vec<Self::Role>>;
}

/// Access to principals and the roles assigned to them.
#[async_trait]
pub trait UsersSource: Send + Sync {
    /// Backend user record.
    type User: Send + Sync;

    /// Role reference type, shared with the [`RolesSource`] that names it.
    type Role: Send + Sync;

    /// Find a user by id.
    async fn find_user_by_id(&self, id: PrincipalId) -> SourceResult<Option<Self::User>>;

    /// Get the roles assigned to a user. Unknown users have no roles.
    async fn get_user_roles_by_user_id(&self, id: PrincipalId) -> SourceResult<Vec<Self::Role>>;
}
