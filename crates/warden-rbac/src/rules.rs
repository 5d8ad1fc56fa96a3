//! # Rules
//!
//! Compiled rules and the index they live in. A rule is keyed by
//! `group:roleName` and targets the permissions the role grants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::permissions::{Permission, PermissionSet};
use crate::roles::PermissionsGroup;

/// Effect of a matching rule. Deny decisions are derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    /// Access is granted when the rule matches.
    #[default]
    Permit,
}

impl Effect {
    /// Get the string representation of the effect.
    pub fn as_str(&self) -> &'static str {
        match self {
            Effect::Permit => "permit",
        }
    }
}

/// One entry of a rule's target, tagged with the rule key that owns it.
#[derive(Debug, Clone)]
pub enum PermissionAtom {
    /// A single permission scoped to one role.
    Single {
        /// Owning rule key
        rule_key: String,
        /// Granted permission
        permission: Permission,
    },

    /// The aggregated permission set shared by every role of a group
    /// compiled in conjunction mode.
    Conjunction {
        /// Owning rule key
        rule_key: String,
        /// Shared aggregated set (the same allocation for every role in the group)
        permissions: Arc<PermissionSet>,
    },
}

impl PermissionAtom {
    /// Rule key the atom is tagged with.
    pub fn rule_key(&self) -> &str {
        match self {
            PermissionAtom::Single { rule_key, .. } | PermissionAtom::Conjunction { rule_key, .. } => {
                rule_key
            }
        }
    }

    /// Check whether this atom grants `permission`.
    pub fn grants(&self, permission: &Permission) -> bool {
        match self {
            PermissionAtom::Single { permission: p, .. } => p == permission,
            PermissionAtom::Conjunction { permissions, .. } => permissions.has(permission),
        }
    }

    /// Structural equality: same rule key and same value.
    pub fn same_as(&self, other: &PermissionAtom) -> bool {
        match (self, other) {
            (
                PermissionAtom::Single { rule_key: a, permission: pa },
                PermissionAtom::Single { rule_key: b, permission: pb },
            ) => a == b && pa == pb,
            (
                PermissionAtom::Conjunction { rule_key: a, permissions: sa },
                PermissionAtom::Conjunction { rule_key: b, permissions: sb },
            ) => a == b && (Arc::ptr_eq(sa, sb) || sa.same_members(sb)),
            _ => false,
        }
    }
}

/// A compiled rule.
#[derive(Debug, Clone)]
pub struct Rule {
    key: String,
    target: Vec<PermissionAtom>,
    effect: Effect,
}

impl Rule {
    /// Create a permit rule with the given target.
    pub fn new(key: impl Into<String>, target: Vec<PermissionAtom>) -> Self {
        Self {
            key: key.into(),
            target,
            effect: Effect::Permit,
        }
    }

    /// Rule key (`group:roleName`).
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Target atoms in insertion order.
    pub fn target(&self) -> &[PermissionAtom] {
        &self.target
    }

    /// Rule effect.
    pub fn effect(&self) -> Effect {
        self.effect
    }

    /// Check whether any requested permission is granted by the target.
    pub fn permits_any(&self, requested: &PermissionSet) -> bool {
        requested
            .iter()
            .any(|perm| self.target.iter().any(|atom| atom.grants(perm)))
    }

    /// Flatten the target into the set of granted permissions.
    pub fn permissions(&self) -> PermissionSet {
        let mut set = PermissionSet::new();
        for atom in &self.target {
            match atom {
                PermissionAtom::Single { permission, .. } => {
                    set.add(permission.clone());
                }
                PermissionAtom::Conjunction { permissions, .. } => set.merge(permissions),
            }
        }
        set
    }

    /// Append the atoms that are not structurally present yet.
    ///
    /// # Returns
    ///
    /// The number of atoms appended
    pub fn append(&mut self, atoms: impl IntoIterator<Item = PermissionAtom>) -> usize {
        let mut added = 0;
        for atom in atoms {
            if !self.target.iter().any(|existing| existing.same_as(&atom)) {
                self.target.push(atom);
                added += 1;
            }
        }
        added
    }
}

/// Immutable-after-build mapping from rule key to rule.
///
/// A new index is produced by every compilation pass; readers hold an
/// `Arc<RuleIndex>` snapshot and never observe a partial build.
#[derive(Debug, Clone)]
pub struct RuleIndex {
    rules: BTreeMap<String, Rule>,
    revision: u64,
    compiled_at: DateTime<Utc>,
}

impl Default for RuleIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleIndex {
    /// Create an empty index at revision 0.
    pub fn new() -> Self {
        Self {
            rules: BTreeMap::new(),
            revision: 0,
            compiled_at: Utc::now(),
        }
    }

    /// Look up a rule by key.
    pub fn get(&self, key: &str) -> Option<&Rule> {
        self.rules.get(key)
    }

    /// Look up the rule for a role within a group.
    pub fn rule_for(&self, group: &PermissionsGroup, role_name: &str) -> Option<&Rule> {
        self.rules.get(&group.rule_key(role_name))
    }

    /// Check whether a rule exists for `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.rules.contains_key(key)
    }

    /// Iterate over rules ordered by key.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Rule)> {
        self.rules.iter()
    }

    /// Rule keys ordered lexicographically.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.rules.keys()
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if the index holds no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Compilation pass that produced this index (0 for an empty index).
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// When this index was produced.
    pub fn compiled_at(&self) -> DateTime<Utc> {
        self.compiled_at
    }

    /// Insert a new rule, or append new atoms to the existing one.
    ///
    /// Returns the number of atoms that were added.
    pub(crate) fn upsert(&mut self, key: String, atoms: Vec<PermissionAtom>) -> usize {
        match self.rules.get_mut(&key) {
            Some(rule) => rule.append(atoms),
            None => {
                let mut rule = Rule::new(key.clone(), Vec::with_capacity(atoms.len()));
                let added = rule.append(atoms);
                self.rules.insert(key, rule);
                added
            }
        }
    }

    /// Start the next revision from this one (copy-on-write).
    pub(crate) fn next_revision(&self) -> Self {
        Self {
            rules: self.rules.clone(),
            revision: self.revision + 1,
            compiled_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(key: &str, name: &str) -> PermissionAtom {
        PermissionAtom::Single {
            rule_key: key.to_string(),
            permission: Permission::new(name),
        }
    }

    #[test]
    fn test_rule_append_skips_structural_duplicates() {
        let mut rule = Rule::new("DEFAULT:admin", vec![single("DEFAULT:admin", "read")]);
        let added = rule.append(vec![
            single("DEFAULT:admin", "READ"),
            single("DEFAULT:admin", "write"),
        ]);
        assert_eq!(added, 1);
        assert_eq!(rule.target().len(), 2);
        assert_eq!(rule.effect().as_str(), "permit");
    }

    #[test]
    fn test_rule_permits_any() {
        let rule = Rule::new("DEFAULT:admin", vec![single("DEFAULT:admin", "update")]);
        assert!(rule.permits_any(&PermissionSet::from_strings(&["read", "Update"])));
        assert!(!rule.permits_any(&PermissionSet::from_strings(&["read"])));
    }

    #[test]
    fn test_conjunction_atoms_compare_by_members() {
        let a = PermissionAtom::Conjunction {
            rule_key: "G:r".to_string(),
            permissions: Arc::new(PermissionSet::from_strings(&["a", "b"])),
        };
        let b = PermissionAtom::Conjunction {
            rule_key: "G:r".to_string(),
            permissions: Arc::new(PermissionSet::from_strings(&["b", "a"])),
        };
        assert!(a.same_as(&b));
        assert!(!a.same_as(&single("G:r", "a")));
    }

    #[test]
    fn test_index_upsert_and_revision() {
        let index = RuleIndex::new();
        let mut next = index.next_revision();
        assert_eq!(next.upsert("DEFAULT:r".to_string(), vec![single("DEFAULT:r", "x")]), 1);
        assert_eq!(next.upsert("DEFAULT:r".to_string(), vec![single("DEFAULT:r", "x")]), 0);

        assert_eq!(next.revision(), 1);
        assert!(index.is_empty());
        assert!(next.contains_key("DEFAULT:r"));
        assert!(next
            .rule_for(&PermissionsGroup::default(), "r")
            .is_some());
    }
}
