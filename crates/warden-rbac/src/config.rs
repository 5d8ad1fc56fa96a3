//! Engine configuration.
//!
//! Controls the default permission group, the compilation mode and the
//! two decision policies that have a legacy default. Configuration can be
//! built in code or loaded from environment variables.

use serde::{Deserialize, Serialize};

use crate::error::{RbacError, RbacResult};
use crate::roles::PermissionsGroup;

/// What a role with no compiled rule means for a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingRulePolicy {
    /// No rule configured means no restriction: permit immediately.
    #[default]
    Permit,
    /// Skip the role; it cannot satisfy the request.
    Deny,
}

impl MissingRulePolicy {
    /// Parse from string representation (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "permit" | "allow" => Some(Self::Permit),
            "deny" => Some(Self::Deny),
            _ => None,
        }
    }
}

/// How `deny()` relates to `permit()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyMode {
    /// `deny` returns the same value as `permit`: true when the principal
    /// holds one of the listed permissions (deny-list middleware semantics).
    #[default]
    MirrorPermit,
    /// `deny` is the logical complement of `permit`.
    Complement,
}

impl DenyMode {
    /// Parse from string representation (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "mirror" | "mirror_permit" => Some(Self::MirrorPermit),
            "complement" | "negate" => Some(Self::Complement),
            _ => None,
        }
    }
}

/// Configuration for an [`RbacEngine`](crate::engine::RbacEngine).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Group used when a call does not name one.
    #[serde(default)]
    pub group: PermissionsGroup,

    /// Compile the default group in conjunction mode.
    #[serde(default)]
    pub conjunction: bool,

    /// Decision for roles without a rule.
    #[serde(default)]
    pub missing_rule: MissingRulePolicy,

    /// Relation between `deny` and `permit`.
    #[serde(default)]
    pub deny_mode: DenyMode,
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `WARDEN_PERMISSIONS_GROUP`: default group (default: `DEFAULT`)
    /// - `WARDEN_CONJUNCTION`: `true`/`1` or `false`/`0` (default: false)
    /// - `WARDEN_MISSING_RULE`: `permit` or `deny` (default: permit)
    /// - `WARDEN_DENY_MODE`: `mirror` or `complement` (default: mirror)
    ///
    /// # Errors
    ///
    /// Returns [`RbacError::Validation`] when a variable is set to an
    /// unrecognised value; a typo must not silently pick a default.
    pub fn from_env() -> RbacResult<Self> {
        let default = Self::default();

        let group = match std::env::var("WARDEN_PERMISSIONS_GROUP") {
            Ok(name) => PermissionsGroup::parse(name)?,
            Err(_) => default.group,
        };

        let conjunction = match std::env::var("WARDEN_CONJUNCTION") {
            Ok(s) => parse_flag(&s).ok_or_else(|| {
                RbacError::Validation(format!("WARDEN_CONJUNCTION: expected a boolean, got `{s}`"))
            })?,
            Err(_) => default.conjunction,
        };

        let missing_rule = match std::env::var("WARDEN_MISSING_RULE") {
            Ok(s) => MissingRulePolicy::parse(&s).ok_or_else(|| {
                RbacError::Validation(format!("WARDEN_MISSING_RULE: unknown policy `{s}`"))
            })?,
            Err(_) => default.missing_rule,
        };

        let deny_mode = match std::env::var("WARDEN_DENY_MODE") {
            Ok(s) => DenyMode::parse(&s).ok_or_else(|| {
                RbacError::Validation(format!("WARDEN_DENY_MODE: unknown mode `{s}`"))
            })?,
            Err(_) => default.deny_mode,
        };

        Ok(Self {
            group,
            conjunction,
            missing_rule,
            deny_mode,
        })
    }

    /// Set the default group.
    pub fn with_group(mut self, group: PermissionsGroup) -> Self {
        self.group = group;
        self
    }

    /// Enable or disable conjunction mode.
    pub fn with_conjunction(mut self, conjunction: bool) -> Self {
        self.conjunction = conjunction;
        self
    }

    /// Set the missing-rule policy.
    pub fn with_missing_rule(mut self, policy: MissingRulePolicy) -> Self {
        self.missing_rule = policy;
        self
    }

    /// Set the deny mode.
    pub fn with_deny_mode(mut self, mode: DenyMode) -> Self {
        self.deny_mode = mode;
        self
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}
