//! Compiled-rule decision engine
//!
//! An [`RbacEngine`] owns its rule index and its source handles. The index
//! is swapped atomically after each compilation pass; decisions always read
//! a complete snapshot.

use futures::future::try_join_all;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument};

use crate::compiler::RuleCompiler;
use crate::config::{DenyMode, EngineConfig, MissingRulePolicy};
use crate::error::{RbacError, RbacResult};
use crate::permissions::{Permission, PermissionSet};
use crate::request::PrincipalId;
use crate::roles::PermissionsGroup;
use crate::rules::RuleIndex;
use crate::source::{RolesSource, UsersSource};

/// Decision engine over rules compiled from a roles source.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use warden_rbac::{
///     EngineConfig, MemoryRolesSource, MemoryUsersSource, PermissionSet, PrincipalId,
///     RbacEngine, Role, UserRecord,
/// };
///
/// # async fn example() -> warden_rbac::RbacResult<()> {
/// let editor = Role::new(1, "editor").with_permissions(["update"]);
/// let roles = MemoryRolesSource::new(vec![editor.clone()]);
/// let users = MemoryUsersSource::new(vec![UserRecord::new(1, vec![editor])]);
///
/// let engine = RbacEngine::new(Arc::new(roles), Arc::new(users), EngineConfig::default());
/// engine.initialize().await?;
///
/// let wanted = PermissionSet::from_strings(&["update"]);
/// assert!(engine.permit(PrincipalId(1), Some(&wanted), None).await?);
/// # Ok(())
/// # }
/// ```
pub struct RbacEngine<R, U>
where
    R: RolesSource,
    U: UsersSource<Role = R::Role>,
{
    roles: Arc<R>,
    users: Arc<U>,
    config: EngineConfig,
    /// `None` until the first compilation pass completes
    index: RwLock<Option<Arc<RuleIndex>>>,
    /// Serialises compilation passes
    compile_lock: Mutex<()>,
}

impl<R, U> std::fmt::Debug for RbacEngine<R, U>
where
    R: RolesSource,
    U: UsersSource<Role = R::Role>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RbacEngine")
            .field("config", &self.config)
            .finish()
    }
}

impl<R, U> RbacEngine<R, U>
where
    R: RolesSource,
    U: UsersSource<Role = R::Role>,
{
    /// Create an engine. No rules exist until [`initialize`](Self::initialize)
    /// or [`compile`](Self::compile) completes.
    pub fn new(roles: Arc<R>, users: Arc<U>, config: EngineConfig) -> Self {
        Self {
            roles,
            users,
            config,
            index: RwLock::new(None),
            compile_lock: Mutex::new(()),
        }
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Compile the configured default group with the configured mode.
    pub async fn initialize(&self) -> RbacResult<Arc<RuleIndex>> {
        let group = self.config.group.clone();
        self.compile(&group, self.config.conjunction).await
    }

    /// Run a compilation pass for `group` and publish the resulting index.
    ///
    /// Passes are serialised: each one starts from the index published by
    /// the previous pass, so concurrent calls cannot drop each other's rules.
    #[instrument(skip(self), fields(group = %group))]
    pub async fn compile(&self, group: &PermissionsGroup, conjunction: bool) -> RbacResult<Arc<RuleIndex>> {
        let _pass = self.compile_lock.lock().await;
        let base = self.index.read().await.clone();

        let compiler = RuleCompiler::new(self.roles.as_ref())
            .group(group.clone())
            .conjunction(conjunction);
        let next = match base {
            Some(base) => compiler.compile_into(&base).await?,
            None => compiler.compile().await?,
        };

        let next = Arc::new(next);
        *self.index.write().await = Some(Arc::clone(&next));

        info!(
            revision = next.revision(),
            rules = next.len(),
            "Published rule index"
        );
        Ok(next)
    }

    /// Current rule index snapshot.
    ///
    /// # Errors
    ///
    /// [`RbacError::NotReady`] until the first compilation pass completes
    pub async fn rules(&self) -> RbacResult<Arc<RuleIndex>> {
        self.index.read().await.clone().ok_or(RbacError::NotReady)
    }

    /// Check whether a compiled index has been published.
    pub async fn is_ready(&self) -> bool {
        self.index.read().await.is_some()
    }

    /// Decide whether `principal` is permitted any of `permissions`.
    ///
    /// - Absent or empty permissions resolve to `false` without any lookup.
    /// - Each of the principal's roles is looked up as `group:roleName`
    ///   (the configured group when `group` is `None`). A rule permits when
    ///   any requested permission is in its target.
    /// - A role without a rule follows [`MissingRulePolicy`].
    ///
    /// Returns `true` on the first satisfied role, `false` once every role
    /// has been tried.
    #[instrument(skip(self, permissions, group), fields(principal = %principal))]
    pub async fn permit(
        &self,
        principal: PrincipalId,
        permissions: Option<&PermissionSet>,
        group: Option<&PermissionsGroup>,
    ) -> RbacResult<bool> {
        let requested = match permissions {
            Some(p) if !p.is_empty() => p,
            _ => {
                debug!("No permissions requested, not permitted");
                return Ok(false);
            }
        };

        let index = self.rules().await?;
        let group = group.unwrap_or(&self.config.group);

        let roles = self
            .users
            .get_user_roles_by_user_id(principal)
            .await
            .map_err(|e| RbacError::source_failure("get_user_roles_by_user_id", e))?;

        let roles_source = self.roles.as_ref();
        let role_names = try_join_all(roles.iter().map(|role| async move {
            roles_source
                .get_role_name(role)
                .await
                .map_err(|e| RbacError::source_failure("get_role_name", e))
        }))
        .await?;

        for role_name in &role_names {
            match index.rule_for(group, role_name) {
                Some(rule) => {
                    if rule.permits_any(requested) {
                        debug!(rule = rule.key(), "Rule permits request");
                        return Ok(true);
                    }
                }
                None => match self.config.missing_rule {
                    MissingRulePolicy::Permit => {
                        debug!(role = %role_name, "No rule for role, permitting by policy");
                        return Ok(true);
                    }
                    MissingRulePolicy::Deny => {
                        debug!(role = %role_name, "No rule for role, skipping");
                    }
                },
            }
        }

        debug!(roles = role_names.len(), "No role permits request");
        Ok(false)
    }

    /// [`permit`](Self::permit) for permissions given as untyped JSON.
    ///
    /// # Errors
    ///
    /// [`RbacError::Validation`] when `permissions` is present but not an
    /// array of strings
    pub async fn permit_value(
        &self,
        principal: PrincipalId,
        permissions: Option<&Value>,
        group: Option<&PermissionsGroup>,
    ) -> RbacResult<bool> {
        let set = match permissions {
            None | Some(Value::Null) => None,
            Some(value) => Some(permission_list(value)?),
        };
        self.permit(principal, set.as_ref(), group).await
    }

    /// [`deny`](Self::deny) for permissions given as untyped JSON.
    pub async fn deny_value(
        &self,
        principal: PrincipalId,
        permissions: Option<&Value>,
        group: Option<&PermissionsGroup>,
    ) -> RbacResult<bool> {
        let set = match permissions {
            None | Some(Value::Null) => None,
            Some(value) => Some(permission_list(value)?),
        };
        self.deny(principal, set.as_ref(), group).await
    }

    /// Deny decision, derived from [`permit`](Self::permit) per [`DenyMode`].
    pub async fn deny(
        &self,
        principal: PrincipalId,
        permissions: Option<&PermissionSet>,
        group: Option<&PermissionsGroup>,
    ) -> RbacResult<bool> {
        let permitted = self.permit(principal, permissions, group).await?;
        Ok(match self.config.deny_mode {
            DenyMode::MirrorPermit => permitted,
            DenyMode::Complement => !permitted,
        })
    }
}

fn permission_list(value: &Value) -> RbacResult<PermissionSet> {
    let items = value.as_array().ok_or_else(|| {
        RbacError::Validation("permissions must be an array of strings".to_string())
    })?;
    items
        .iter()
        .map(|item| {
            item.as_str().map(Permission::new).ok_or_else(|| {
                RbacError::Validation("permissions must be an array of strings".to_string())
            })
        })
        .collect()
}
