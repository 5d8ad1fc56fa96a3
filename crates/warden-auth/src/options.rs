//! Authorizer options.
//!
//! [`AuthorizerOptions`] are fixed when an authorizer is built;
//! [`CallOptions`] are given per call and overlay them, defaults first.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use warden_remote::RemoteConfig;

use crate::combinator::AndSemantics;
use crate::error::{AuthzError, AuthzResult};
use crate::local::{LocalStrategy, PermissionCheck, PermissionLookup};

/// Where decisions are made.
#[derive(Debug, Clone)]
pub enum Strategy {
    /// An application callback decides.
    Local(LocalStrategy),
    /// A remote authority decides.
    Remote(RemoteConfig),
}

/// Options an authorizer is built from.
#[derive(Debug, Clone, Default)]
pub struct AuthorizerOptions {
    /// Decision strategy. Required.
    pub strategy: Option<Strategy>,

    /// Meaning of the `AND` combinator on the local lookup path.
    pub and_semantics: AndSemantics,
}

impl AuthorizerOptions {
    /// Options deciding through a held-permissions lookup.
    pub fn lookup(lookup: Arc<dyn PermissionLookup>) -> Self {
        Self {
            strategy: Some(Strategy::Local(LocalStrategy::Lookup(lookup))),
            ..Self::default()
        }
    }

    /// Options deciding through a self-deciding check.
    pub fn check(check: Arc<dyn PermissionCheck>) -> Self {
        Self {
            strategy: Some(Strategy::Local(LocalStrategy::Check(check))),
            ..Self::default()
        }
    }

    /// Options delegating to a remote authority.
    pub fn remote(config: RemoteConfig) -> Self {
        Self {
            strategy: Some(Strategy::Remote(config)),
            ..Self::default()
        }
    }

    /// Load remote options from environment variables.
    ///
    /// Environment variables:
    /// - `WARDEN_REMOTE_URL`, `WARDEN_REMOTE_TIMEOUT_MS`,
    ///   `WARDEN_REMOTE_VERIFY_TLS`: see [`RemoteConfig::from_env`]
    /// - `WARDEN_AND_SEMANTICS`: `exact` or `superset` (default: exact)
    ///
    /// Without `WARDEN_REMOTE_URL` no strategy is set; a local callback has
    /// to be supplied in code.
    pub fn from_env() -> AuthzResult<Self> {
        let remote = RemoteConfig::from_env()?;
        let strategy = remote.is_configured().then_some(Strategy::Remote(remote));

        let and_semantics = match std::env::var("WARDEN_AND_SEMANTICS") {
            Ok(s) => AndSemantics::parse(&s).ok_or_else(|| {
                AuthzError::Configuration(format!("WARDEN_AND_SEMANTICS: unknown value `{s}`"))
            })?,
            Err(_) => AndSemantics::default(),
        };

        Ok(Self {
            strategy,
            and_semantics,
        })
    }

    /// Set the `AND` semantics.
    pub fn with_and_semantics(mut self, and_semantics: AndSemantics) -> Self {
        self.and_semantics = and_semantics;
        self
    }
}

/// Per-call overrides.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Strategy for this call only.
    pub strategy: Option<Strategy>,

    /// Headers for a remote call, lower-cased; they win over configured ones.
    pub headers: BTreeMap<String, String>,

    /// Timeout for a remote call.
    pub timeout: Option<Duration>,

    /// `AND` semantics for this call.
    pub and_semantics: Option<AndSemantics>,
}

impl CallOptions {
    /// Empty overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header.
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Set the remote timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Use another strategy for this call.
    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Use other `AND` semantics for this call.
    pub fn and_semantics(mut self, and_semantics: AndSemantics) -> Self {
        self.and_semantics = Some(and_semantics);
        self
    }

    /// Overlay `overrides` on these options: set values in `overrides` win,
    /// headers are merged.
    pub fn merged(&self, overrides: &CallOptions) -> CallOptions {
        let mut headers = self.headers.clone();
        headers.extend(
            overrides
                .headers
                .iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v.clone())),
        );

        CallOptions {
            strategy: overrides.strategy.clone().or_else(|| self.strategy.clone()),
            headers,
            timeout: overrides.timeout.or(self.timeout),
            and_semantics: overrides.and_semantics.or(self.and_semantics),
        }
    }
}
