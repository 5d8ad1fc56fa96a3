//! Rule compilation
//!
//! Drains a [`RolesSource`] and turns its roles into a [`RuleIndex`].
//! Every lookup of a pass is awaited through `try_join_all`, so the index
//! is returned only once every role and permission has resolved.

use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::{RbacError, RbacResult};
use crate::permissions::{Permission, PermissionSet};
use crate::roles::PermissionsGroup;
use crate::rules::{PermissionAtom, RuleIndex};
use crate::source::RolesSource;

/// Compiles roles from a source into rules of one permission group.
///
/// # Example
///
/// ```rust,no_run
/// use warden_rbac::{MemoryRolesSource, PermissionsGroup, Role, RuleCompiler};
///
/// # async fn example() -> warden_rbac::RbacResult<()> {
/// let source = MemoryRolesSource::new(vec![
///     Role::new(1, "editor").with_permissions(["update", "read"]),
/// ]);
/// let index = RuleCompiler::new(&source).compile().await?;
/// assert!(index.contains_key("DEFAULT:editor"));
/// # Ok(())
/// # }
/// ```
pub struct RuleCompiler<'a, R: RolesSource + ?Sized> {
    source: &'a R,
    group: PermissionsGroup,
    conjunction: bool,
}

impl<'a, R: RolesSource + ?Sized> RuleCompiler<'a, R> {
    /// Compiler for the default group, without conjunction.
    pub fn new(source: &'a R) -> Self {
        Self {
            source,
            group: PermissionsGroup::default(),
            conjunction: false,
        }
    }

    /// Set the permission group rule keys are scoped to.
    pub fn group(mut self, group: PermissionsGroup) -> Self {
        self.group = group;
        self
    }

    /// Aggregate the group's permissions into one shared set.
    ///
    /// Under conjunction every role of the group is granted the union of
    /// all the group's permissions, not just its own.
    pub fn conjunction(mut self, conjunction: bool) -> Self {
        self.conjunction = conjunction;
        self
    }

    /// Compile into a fresh index.
    pub async fn compile(&self) -> RbacResult<RuleIndex> {
        self.compile_into(&RuleIndex::new()).await
    }

    /// Compile on top of an existing index.
    ///
    /// Keys already present keep their atoms and only gain the ones that
    /// are structurally new. `base` itself is left untouched; the result is
    /// the next revision.
    #[instrument(skip(self, base), fields(group = %self.group, conjunction = self.conjunction))]
    pub async fn compile_into(&self, base: &RuleIndex) -> RbacResult<RuleIndex> {
        let roles = self
            .source
            .find_all_roles()
            .await
            .map_err(|e| RbacError::source_failure("find_all_roles", e))?;

        let source = self.source;
        let names = try_join_all(roles.iter().map(|role| async move {
            source
                .get_role_name(role)
                .await
                .map_err(|e| RbacError::source_failure("get_role_name", e))
        }))
        .await?;

        // Roles sharing a name are compiled once: the by-name lookup already
        // returns the permissions of all of them.
        let mut unique: Vec<String> = Vec::with_capacity(names.len());
        for name in names {
            if name.is_empty() {
                return Err(RbacError::Validation(
                    "role names must be non-empty strings".to_string(),
                ));
            }
            if !unique.contains(&name) {
                unique.push(name);
            }
        }

        let resolved = try_join_all(unique.into_iter().map(|name| self.resolve_role(name))).await?;

        let mut index = base.next_revision();
        let mut added = 0;

        if self.conjunction {
            let mut shared = PermissionSet::new();
            for (_, permissions) in &resolved {
                shared.merge(permissions);
            }
            let shared = Arc::new(shared);

            for (name, _) in &resolved {
                let key = self.group.rule_key(name);
                let atom = PermissionAtom::Conjunction {
                    rule_key: key.clone(),
                    permissions: Arc::clone(&shared),
                };
                added += index.upsert(key, vec![atom]);
            }
        } else {
            for (name, permissions) in resolved {
                let key = self.group.rule_key(&name);
                let atoms = permissions
                    .into_iter()
                    .map(|permission| PermissionAtom::Single {
                        rule_key: key.clone(),
                        permission,
                    })
                    .collect();
                added += index.upsert(key, atoms);
            }
        }

        debug!(
            revision = index.revision(),
            rules = index.len(),
            atoms_added = added,
            "Compiled rule index"
        );

        Ok(index)
    }

    /// Resolve a role's permission names, lower-cased and deduplicated.
    async fn resolve_role(&self, name: String) -> RbacResult<(String, PermissionSet)> {
        let permissions = self
            .source
            .get_role_permissions_by_role_name(&name)
            .await
            .map_err(|e| RbacError::source_failure("get_role_permissions_by_role_name", e))?;

        let source = self.source;
        let permission_names = try_join_all(permissions.iter().map(|perm| async move {
            source
                .get_permission_name(perm)
                .await
                .map_err(|e| RbacError::source_failure("get_permission_name", e))
        }))
        .await?;

        let mut set = PermissionSet::new();
        for permission_name in permission_names.iter().filter(|n| !n.is_empty()) {
            set.add(Permission::new(permission_name));
        }

        Ok((name, set))
    }
}
