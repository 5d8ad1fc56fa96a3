//! In-memory roles and users sources.
//!
//! Suitable for tests and small single-process deployments. Backed by
//! `tokio::sync::RwLock` so roles can be added while an engine is live.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::request::PrincipalId;
use crate::roles::Role;
use crate::source::{RolesSource, SourceResult, UsersSource};

/// A permission record as handed out by [`MemoryRolesSource`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRecord {
    /// Permission ID (stable per distinct name within the source)
    pub id: u64,
    /// Permission name
    pub name: String,
}

/// A user record as handed out by [`MemoryUsersSource`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// User ID
    pub id: PrincipalId,
    /// Optional email, informational only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Assigned roles
    #[serde(default)]
    pub roles: Vec<Role>,
}

impl UserRecord {
    /// Creates a user with the given roles.
    pub fn new(id: i64, roles: Vec<Role>) -> Self {
        Self {
            id: PrincipalId(id),
            email: None,
            roles,
        }
    }
}

/// In-memory [`RolesSource`].
#[derive(Debug, Clone, Default)]
pub struct MemoryRolesSource {
    roles: Arc<RwLock<Vec<Role>>>,
}

impl MemoryRolesSource {
    /// Create a source over the given roles.
    pub fn new(roles: Vec<Role>) -> Self {
        Self {
            roles: Arc::new(RwLock::new(roles)),
        }
    }

    /// Add a role. Takes effect on the next compilation pass.
    pub async fn add_role(&self, role: Role) {
        self.roles.write().await.push(role);
    }

    /// Snapshot of all roles.
    pub async fn roles(&self) -> Vec<Role> {
        self.roles.read().await.clone()
    }

    fn records(roles: &[Role], role: &Role) -> Vec<PermissionRecord> {
        role.permissions
            .iter()
            .map(|perm| PermissionRecord {
                id: Self::permission_id(roles, perm.as_str()),
                name: perm.to_string(),
            })
            .collect()
    }

    /// Ids are assigned by first appearance of a name across all roles.
    fn permission_id(roles: &[Role], name: &str) -> u64 {
        let mut seen: Vec<&str> = Vec::new();
        for perm in roles.iter().flat_map(|r| r.permissions.iter()) {
            if !seen.contains(&perm.as_str()) {
                seen.push(perm.as_str());
            }
            if perm.as_str() == name {
                break;
            }
        }
        seen.len() as u64
    }
}

#[async_trait]
impl RolesSource for MemoryRolesSource {
    type Role = Role;
    type Permission = PermissionRecord;

    async fn find_by_id(&self, id: u64) -> SourceResult<Option<Role>> {
        Ok(self.roles.read().await.iter().find(|r| r.id == id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> SourceResult<Option<Role>> {
        Ok(self.roles.read().await.iter().find(|r| r.name == name).cloned())
    }

    async fn get_role_name(&self, role: &Role) -> SourceResult<String> {
        Ok(role.name.clone())
    }

    async fn get_role_id(&self, role: &Role) -> SourceResult<u64> {
        Ok(role.id)
    }

    async fn get_role_permissions_by_role_name(&self, name: &str) -> SourceResult<Vec<PermissionRecord>> {
        let roles = self.roles.read().await;
        Ok(roles
            .iter()
            .filter(|r| r.name == name)
            .flat_map(|r| Self::records(&roles, r))
            .collect())
    }

    async fn get_role_permissions_by_role_id(&self, id: u64) -> SourceResult<Vec<PermissionRecord>> {
        let roles = self.roles.read().await;
        match roles.iter().find(|r| r.id == id) {
            Some(role) => Ok(Self::records(&roles, role)),
            None => Err(format!("role {id} not found").into()),
        }
    }

    async fn find_roles_by_permission(&self, permission: &str) -> SourceResult<Vec<Role>> {
        let wanted = crate::permissions::Permission::new(permission);
        Ok(self
            .roles
            .read()
            .await
            .iter()
            .filter(|r| r.permissions.has(&wanted))
            .cloned()
            .collect())
    }

    async fn get_permission_name(&self, permission: &PermissionRecord) -> SourceResult<String> {
        Ok(permission.name.clone())
    }

    async fn get_permission_id(&self, permission: &PermissionRecord) -> SourceResult<u64> {
        Ok(permission.id)
    }

    async fn find_all_roles(&self) -> SourceResult<Vec<Role>> {
        Ok(self.roles.read().await.clone())
    }
}

/// In-memory [`UsersSource`].
#[derive(Debug, Clone, Default)]
pub struct MemoryUsersSource {
    users: Arc<RwLock<Vec<UserRecord>>>,
}

impl MemoryUsersSource {
    /// Create a source over the given users.
    pub fn new(users: Vec<UserRecord>) -> Self {
        Self {
            users: Arc::new(RwLock::new(users)),
        }
    }

    /// Add or replace a user.
    pub async fn upsert_user(&self, user: UserRecord) {
        let mut users = self.users.write().await;
        users.retain(|u| u.id != user.id);
        users.push(user);
    }
}

#[async_trait]
impl UsersSource for MemoryUsersSource {
    type User = UserRecord;
    type Role = Role;

    async fn find_user_by_id(&self, id: PrincipalId) -> SourceResult<Option<UserRecord>> {
        Ok(self.users.read().await.iter().find(|u| u.id == id).cloned())
    }

    async fn get_user_roles_by_user_id(&self, id: PrincipalId) -> SourceResult<Vec<Role>> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.id == id)
            .map(|u| u.roles.clone())
            .unwrap_or_default())
    }
}
