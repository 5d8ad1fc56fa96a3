//! Authorizers
//!
//! [`Authorizer`] decides requests with one configured strategy.
//! [`TenantAuthorizer`] picks an authorizer by principal type.
//!
//! Principal ids and requests are validated before any callback runs or
//! any request is sent.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use warden_rbac::{Claims, Combinator, DecisionRequest, PermissionSet, PrincipalId};
use warden_remote::{RemoteAuthorizer, RemoteCall, RemoteConfig};

use crate::combinator::{evaluate, AndSemantics};
use crate::error::{AuthzError, AuthzResult};
use crate::local::{CheckOutcome, LocalStrategy};
use crate::options::{AuthorizerOptions, CallOptions, Strategy};

/// A granted request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grant {
    /// Principal the request was granted for.
    pub principal: PrincipalId,
    /// Permissions that were requested.
    pub permissions: PermissionSet,
    /// Data returned by the deciding strategy, if any.
    pub claims: Option<Claims>,
}

/// A strategy ready to serve requests.
#[derive(Debug, Clone)]
enum Resolved {
    Local(LocalStrategy),
    Remote(RemoteAuthorizer),
}

impl Resolved {
    fn build(strategy: &Strategy) -> AuthzResult<Self> {
        match strategy {
            Strategy::Local(local) => Ok(Resolved::Local(local.clone())),
            Strategy::Remote(config) => {
                if !config.is_configured() {
                    return Err(AuthzError::Configuration(
                        "remote strategy requires an absolute http(s) url".to_string(),
                    ));
                }
                Ok(Resolved::Remote(RemoteAuthorizer::new(config.clone())?))
            }
        }
    }
}

/// Decides requests with one strategy.
///
/// # Example
///
/// ```rust,no_run
/// use serde_json::json;
/// use std::sync::Arc;
/// use warden_auth::{Authorizer, AuthorizerOptions, CallOptions, StaticPermissions};
///
/// # async fn example() -> warden_auth::AuthzResult<()> {
/// let table = StaticPermissions::new().with_principal(1, ["users:read"]);
/// let authorizer = Authorizer::new(AuthorizerOptions::lookup(Arc::new(table)))?;
///
/// let grant = authorizer
///     .authorize(&json!(1), &json!(["users:read"]), None, &CallOptions::new())
///     .await?;
/// assert_eq!(grant.principal.0, 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Authorizer {
    strategy: Resolved,
    and_semantics: AndSemantics,
    /// Clients built for per-call remote overrides, reused across calls.
    remote_overrides: Arc<Mutex<HashMap<RemoteConfig, RemoteAuthorizer>>>,
}

impl Authorizer {
    /// Build an authorizer.
    ///
    /// # Errors
    ///
    /// [`AuthzError::Configuration`] when no strategy is set or the remote
    /// endpoint is missing or not an absolute `http(s)` URL.
    pub fn new(options: AuthorizerOptions) -> AuthzResult<Self> {
        let strategy = options.strategy.as_ref().ok_or_else(|| {
            AuthzError::Configuration(
                "a local permission callback or a remote url is required".to_string(),
            )
        })?;

        Ok(Self {
            strategy: Resolved::build(strategy)?,
            and_semantics: options.and_semantics,
            remote_overrides: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Check whether decisions are delegated to a remote authority.
    pub fn is_remote(&self) -> bool {
        matches!(self.strategy, Resolved::Remote(_))
    }

    /// Decide a request given as untyped input.
    ///
    /// `principal` must be a number or a numeric string; `permissions` a
    /// string or an array of strings.
    ///
    /// # Errors
    ///
    /// - validation errors, before any callback or request
    /// - [`AuthzError::PermissionDenied`] / [`AuthzError::RemoteDenied`] on denial
    /// - callback, transport and configuration failures otherwise
    pub async fn authorize(
        &self,
        principal: &Value,
        permissions: &Value,
        combinator: Option<Combinator>,
        call: &CallOptions,
    ) -> AuthzResult<Grant> {
        let principal = PrincipalId::from_value(principal)?;
        let request = DecisionRequest::from_value(permissions, combinator)?;
        self.authorize_request(principal, &request, call).await
    }

    /// Decide a validated request.
    #[instrument(
        skip(self, request, call),
        fields(principal = %principal, check_type = ?request.combinator())
    )]
    pub async fn authorize_request(
        &self,
        principal: PrincipalId,
        request: &DecisionRequest,
        call: &CallOptions,
    ) -> AuthzResult<Grant> {
        let overridden;
        let strategy = match &call.strategy {
            Some(strategy) => {
                overridden = self.resolve_override(strategy).await?;
                &overridden
            }
            None => &self.strategy,
        };

        let claims = match strategy {
            Resolved::Local(LocalStrategy::Lookup(lookup)) => {
                let held = lookup.held_permissions(principal).await.map_err(|e| {
                    warn!("Permission lookup failed: {}", e);
                    AuthzError::Lookup {
                        principal,
                        message: e.to_string(),
                    }
                })?;

                let and_semantics = call.and_semantics.unwrap_or(self.and_semantics);
                if !evaluate(request, &held, and_semantics) {
                    debug!(held = held.len(), "Held permissions do not satisfy request");
                    return Err(AuthzError::PermissionDenied);
                }
                None
            }
            Resolved::Local(LocalStrategy::Check(check)) => {
                let outcome = check.check(principal, request).await.map_err(|e| {
                    warn!("Permission check failed: {}", e);
                    AuthzError::Lookup {
                        principal,
                        message: e.to_string(),
                    }
                })?;

                match outcome {
                    CheckOutcome::Granted(claims) => claims,
                    CheckOutcome::Denied => {
                        debug!("Permission check denied request");
                        return Err(AuthzError::PermissionDenied);
                    }
                }
            }
            Resolved::Remote(remote) => {
                let remote_call = RemoteCall {
                    headers: call.headers.clone(),
                    timeout: call.timeout,
                };
                remote.authorize(request, &remote_call).await?
            }
        };

        debug!("Request granted");
        Ok(Grant {
            principal,
            permissions: request.permissions().clone(),
            claims,
        })
    }

    /// Resolve a per-call strategy.
    ///
    /// A remote override reuses the configured client when the endpoint
    /// matches, and otherwise a client cached by configuration, so its
    /// connection pool survives across calls.
    async fn resolve_override(&self, strategy: &Strategy) -> AuthzResult<Resolved> {
        let config = match strategy {
            Strategy::Local(local) => return Ok(Resolved::Local(local.clone())),
            Strategy::Remote(config) => config,
        };

        if let Resolved::Remote(remote) = &self.strategy {
            if remote.config() == config {
                return Ok(Resolved::Remote(remote.clone()));
            }
        }

        let mut cache = self.remote_overrides.lock().await;
        if let Some(remote) = cache.get(config) {
            return Ok(Resolved::Remote(remote.clone()));
        }

        let resolved = Resolved::build(strategy)?;
        if let Resolved::Remote(remote) = &resolved {
            debug!("Caching client for remote override");
            cache.insert(config.clone(), remote.clone());
        }
        Ok(resolved)
    }

    #[cfg(test)]
    async fn cached_overrides(&self) -> usize {
        self.remote_overrides.lock().await.len()
    }
}

/// Picks an [`Authorizer`] by principal type.
///
/// # Example
///
/// ```rust,no_run
/// use serde_json::json;
/// use std::sync::Arc;
/// use warden_auth::{AuthorizerOptions, CallOptions, StaticPermissions, TenantAuthorizer};
/// use warden_remote::RemoteConfig;
///
/// # async fn example() -> warden_auth::AuthzResult<()> {
/// let tenants = TenantAuthorizer::builder()
///     .principal_type("user", AuthorizerOptions::lookup(Arc::new(StaticPermissions::new())))
///     .principal_type("app", AuthorizerOptions::remote(RemoteConfig::new("https://auth.example.com")))
///     .build()?;
///
/// let result = tenants
///     .authorize(&json!(7), "app", &json!(["apps:read"]), None, &CallOptions::new())
///     .await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TenantAuthorizer {
    tenants: HashMap<String, Authorizer>,
}

/// Builder for [`TenantAuthorizer`].
#[derive(Debug, Default)]
pub struct TenantAuthorizerBuilder {
    options: Vec<(String, AuthorizerOptions)>,
}

impl TenantAuthorizerBuilder {
    /// Configure a principal type.
    pub fn principal_type(mut self, name: impl Into<String>, options: AuthorizerOptions) -> Self {
        self.options.push((name.into(), options));
        self
    }

    /// Validate every principal type's configuration and build.
    ///
    /// # Errors
    ///
    /// [`AuthzError::Configuration`] naming the first invalid principal type.
    pub fn build(self) -> AuthzResult<TenantAuthorizer> {
        if self.options.is_empty() {
            return Err(AuthzError::Configuration(
                "at least one principal type must be configured".to_string(),
            ));
        }

        let mut tenants = HashMap::with_capacity(self.options.len());
        for (name, options) in self.options {
            let authorizer = Authorizer::new(options).map_err(|e| match e {
                AuthzError::Configuration(message) => {
                    AuthzError::Configuration(format!("principal type `{name}`: {message}"))
                }
                other => other,
            })?;
            tenants.insert(name, authorizer);
        }
        Ok(TenantAuthorizer { tenants })
    }
}

impl TenantAuthorizer {
    /// Start building a tenant authorizer.
    pub fn builder() -> TenantAuthorizerBuilder {
        TenantAuthorizerBuilder::default()
    }

    /// Authorizer configured for a principal type.
    pub fn get(&self, principal_type: &str) -> Option<&Authorizer> {
        self.tenants.get(principal_type)
    }

    /// Configured principal types.
    pub fn principal_types(&self) -> impl Iterator<Item = &str> {
        self.tenants.keys().map(String::as_str)
    }

    /// Decide a request for a principal of the given type.
    ///
    /// # Errors
    ///
    /// As [`Authorizer::authorize`], plus [`AuthzError::UnknownPrincipalType`]
    /// when `principal_type` is not configured.
    pub async fn authorize(
        &self,
        principal: &Value,
        principal_type: &str,
        permissions: &Value,
        combinator: Option<Combinator>,
        call: &CallOptions,
    ) -> AuthzResult<Grant> {
        let principal = PrincipalId::from_value(principal)?;
        let request = DecisionRequest::from_value(permissions, combinator)?;

        let authorizer = self
            .tenants
            .get(principal_type)
            .ok_or_else(|| AuthzError::UnknownPrincipalType(principal_type.to_string()))?;

        authorizer.authorize_request(principal, &request, call).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::StaticPermissions;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_remote_override_client_is_reused() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/authorize"))
            .respond_with(ResponseTemplate::new(200))
            .expect(3)
            .mount(&server)
            .await;

        let authorizer =
            Authorizer::new(AuthorizerOptions::lookup(Arc::new(StaticPermissions::new()))).unwrap();
        let remote = RemoteConfig::new(format!("{}/authorize", server.uri()));
        let call = CallOptions::new().strategy(Strategy::Remote(remote));
        let request = DecisionRequest::new(["users:read"], None).unwrap();

        for _ in 0..3 {
            authorizer
                .authorize_request(PrincipalId(1), &request, &call)
                .await
                .unwrap();
        }
        assert_eq!(authorizer.cached_overrides().await, 1);
    }

    #[tokio::test]
    async fn test_override_matching_configured_endpoint_uses_configured_client() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let remote = RemoteConfig::new(server.uri());
        let authorizer = Authorizer::new(AuthorizerOptions::remote(remote.clone())).unwrap();
        let call = CallOptions::new().strategy(Strategy::Remote(remote));
        let request = DecisionRequest::new(["users:read"], None).unwrap();

        authorizer
            .authorize_request(PrincipalId(1), &request, &call)
            .await
            .unwrap();
        assert_eq!(authorizer.cached_overrides().await, 0);
    }

    #[tokio::test]
    async fn test_invalid_override_is_a_configuration_error() {
        let authorizer =
            Authorizer::new(AuthorizerOptions::lookup(Arc::new(StaticPermissions::new()))).unwrap();
        let call = CallOptions::new().strategy(Strategy::Remote(RemoteConfig::default()));
        let request = DecisionRequest::new(["users:read"], None).unwrap();

        let err = authorizer
            .authorize_request(PrincipalId(1), &request, &call)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::Configuration(_)));
        assert_eq!(authorizer.cached_overrides().await, 0);
    }
}
