//! Request guards
//!
//! Framework-agnostic guards that sit where a web framework's middleware
//! would. A guard reads the principal from a [`RequestContext`], asks for
//! a decision and either lets the request through or returns a
//! [`GuardRejection`] the framework turns into a response.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use warden_rbac::{Claims, Combinator, DecisionRequest, PermissionSet, PrincipalId};

use crate::authorizer::{Authorizer, Grant, TenantAuthorizer};
use crate::error::{AuthzError, AuthzResult};
use crate::options::CallOptions;

/// Default path of the principal id in the request context.
pub const DEFAULT_ID_PATH: &str = "user.id";

/// Default path of the principal type in the request context.
pub const DEFAULT_TYPE_PATH: &str = "user.type";

/// The parts of an inbound request a guard looks at.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    /// Request data holding the principal, e.g. `{"user": {"id": 1}}`.
    pub principal: Value,

    /// Inbound headers, names lower-cased.
    pub headers: BTreeMap<String, String>,

    /// Permissions granted by the last successful guard.
    pub granted: Option<PermissionSet>,
}

impl RequestContext {
    /// Context over the given request data.
    pub fn new(principal: Value) -> Self {
        Self {
            principal,
            ..Self::default()
        }
    }

    /// Add an inbound header.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Get an inbound header (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Value at a dotted path such as `user.id`.
    pub fn value_at(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(&self.principal, |value, key| value.get(key))
    }

    /// Merge claims into the object at a dotted path (`""` is the root).
    fn merge_at(&mut self, path: &str, claims: &Claims) {
        let pointer: String = path
            .split('.')
            .filter(|key| !key.is_empty())
            .map(|key| format!("/{key}"))
            .collect();
        match self.principal.pointer_mut(&pointer) {
            Some(Value::Object(map)) => map.extend(claims.clone()),
            _ => debug!("No principal object at `{}`, claims not merged", path),
        }
    }
}

/// Reads the principal from a request context.
pub trait PrincipalExtractor: Send + Sync {
    /// Principal id, as found in the request.
    fn principal_id(&self, ctx: &RequestContext) -> Option<Value>;

    /// Principal type, for multi-tenant decisions.
    fn principal_type(&self, ctx: &RequestContext) -> Option<String>;

    /// Dotted path of the object claims are merged into.
    fn principal_path(&self) -> &str;
}

/// [`PrincipalExtractor`] reading dotted field paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPathExtractor {
    id_path: String,
    type_path: String,
}

impl Default for FieldPathExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_ID_PATH, DEFAULT_TYPE_PATH)
    }
}

impl FieldPathExtractor {
    /// Extractor for the given id and type paths.
    pub fn new(id_path: impl Into<String>, type_path: impl Into<String>) -> Self {
        Self {
            id_path: id_path.into(),
            type_path: type_path.into(),
        }
    }
}

impl PrincipalExtractor for FieldPathExtractor {
    fn principal_id(&self, ctx: &RequestContext) -> Option<Value> {
        ctx.value_at(&self.id_path).filter(|v| !v.is_null()).cloned()
    }

    fn principal_type(&self, ctx: &RequestContext) -> Option<String> {
        ctx.value_at(&self.type_path)
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    fn principal_path(&self) -> &str {
        self.id_path
            .rsplit_once('.')
            .map(|(parent, _)| parent)
            .unwrap_or("")
    }
}

/// Something that can decide a request for a guard.
#[async_trait]
pub trait DecisionService: Send + Sync {
    /// Decide `request` for the principal.
    async fn decide(
        &self,
        principal: &Value,
        principal_type: Option<&str>,
        request: &DecisionRequest,
        call: &CallOptions,
    ) -> AuthzResult<Grant>;
}

#[async_trait]
impl DecisionService for Authorizer {
    async fn decide(
        &self,
        principal: &Value,
        _principal_type: Option<&str>,
        request: &DecisionRequest,
        call: &CallOptions,
    ) -> AuthzResult<Grant> {
        let principal = PrincipalId::from_value(principal)?;
        self.authorize_request(principal, request, call).await
    }
}

#[async_trait]
impl DecisionService for TenantAuthorizer {
    async fn decide(
        &self,
        principal: &Value,
        principal_type: Option<&str>,
        request: &DecisionRequest,
        call: &CallOptions,
    ) -> AuthzResult<Grant> {
        let principal = PrincipalId::from_value(principal)?;
        let principal_type = principal_type.unwrap_or_default();
        let authorizer = self
            .get(principal_type)
            .ok_or_else(|| AuthzError::UnknownPrincipalType(principal_type.to_string()))?;
        authorizer.authorize_request(principal, request, call).await
    }
}

/// Why a guard stopped a request.
#[derive(Debug, Error)]
pub enum GuardRejection {
    /// Denied by the decision service (HTTP 401).
    #[error("{message}")]
    Unauthorized {
        /// Message from the decision service
        message: String,
    },

    /// Denied by a compiled-rule guard (HTTP 403).
    #[error("{message}")]
    Forbidden {
        /// Application error code
        code: u32,
        /// Error message
        message: String,
    },

    /// Verification request refused (HTTP 403); the body carries a
    /// negative verdict.
    #[error("{message}")]
    Unverified {
        /// Application error code
        code: u32,
        /// Error message
        message: String,
    },

    /// No decision could be made.
    #[error(transparent)]
    Error(#[from] AuthzError),
}

impl GuardRejection {
    /// Compiled-rule denial.
    pub fn forbidden() -> Self {
        GuardRejection::Forbidden {
            code: 1100,
            message: "Permission to resource denied".to_string(),
        }
    }

    /// Get HTTP status code for this rejection.
    pub fn status_code(&self) -> u16 {
        match self {
            GuardRejection::Unauthorized { .. } => 401,
            GuardRejection::Forbidden { .. } | GuardRejection::Unverified { .. } => 403,
            GuardRejection::Error(err) => err.status_code(),
        }
    }

    /// JSON body for the response.
    pub fn body(&self) -> Value {
        match self {
            GuardRejection::Unauthorized { message } => json!({
                "error": "UNAUTHORIZED",
                "message": message,
            }),
            GuardRejection::Forbidden { code, message } => json!({
                "errorCode": code,
                "error": message,
            }),
            GuardRejection::Unverified { code, message } => json!({
                "errorCode": code,
                "requestedActionResult": false,
                "error": message,
            }),
            GuardRejection::Error(err) => json!({
                "error": err.error_code(),
                "message": err.to_string(),
            }),
        }
    }
}

/// Options for an [`AuthorizationGuard`].
#[derive(Clone)]
pub struct GuardOptions {
    /// Reads the principal from the request.
    pub extractor: Arc<dyn PrincipalExtractor>,

    /// Whether to read a principal type (multi-tenant services).
    pub with_principal_type: bool,

    /// Call options overlaid on every decision.
    pub call: CallOptions,
}

impl Default for GuardOptions {
    fn default() -> Self {
        Self {
            extractor: Arc::new(FieldPathExtractor::default()),
            with_principal_type: false,
            call: CallOptions::default(),
        }
    }
}

impl std::fmt::Debug for GuardOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardOptions")
            .field("with_principal_type", &self.with_principal_type)
            .field("call", &self.call)
            .finish()
    }
}

impl GuardOptions {
    /// Read the principal id and type from custom dotted paths.
    pub fn paths(id_path: impl Into<String>, type_path: impl Into<String>) -> Self {
        Self {
            extractor: Arc::new(FieldPathExtractor::new(id_path, type_path)),
            ..Self::default()
        }
    }

    /// Also read the principal type.
    pub fn with_principal_type(mut self) -> Self {
        self.with_principal_type = true;
        self
    }

    /// Use a custom extractor.
    pub fn with_extractor(mut self, extractor: Arc<dyn PrincipalExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Overlay call options on every decision.
    pub fn with_call(mut self, call: CallOptions) -> Self {
        self.call = call;
        self
    }
}

/// Guard requiring a decision service to grant a fixed request.
///
/// # Example
///
/// ```rust,no_run
/// use serde_json::json;
/// use std::sync::Arc;
/// use warden_auth::{
///     AuthorizationGuard, Authorizer, AuthorizerOptions, GuardOptions, RequestContext,
///     StaticPermissions,
/// };
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let table = StaticPermissions::new().with_principal(1, ["users:read"]);
/// let authorizer = Authorizer::new(AuthorizerOptions::lookup(Arc::new(table)))?;
/// let guard = AuthorizationGuard::new(Arc::new(authorizer), ["users:read"], None, GuardOptions::default())?;
///
/// let mut ctx = RequestContext::new(json!({"user": {"id": 1}}));
/// guard.check(&mut ctx).await?;
/// # Ok(())
/// # }
/// ```
pub struct AuthorizationGuard<S: DecisionService + ?Sized> {
    service: Arc<S>,
    request: DecisionRequest,
    options: GuardOptions,
}

impl<S: DecisionService + ?Sized> AuthorizationGuard<S> {
    /// Build a guard. The request is validated here, not per call.
    pub fn new<I, P>(
        service: Arc<S>,
        permissions: I,
        combinator: Option<Combinator>,
        options: GuardOptions,
    ) -> AuthzResult<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        let request = DecisionRequest::new(permissions, combinator)?;
        Ok(Self {
            service,
            request,
            options,
        })
    }

    /// The request this guard asks for.
    pub fn request(&self) -> &DecisionRequest {
        &self.request
    }

    /// Check a request.
    ///
    /// On grant, claims are merged into the principal object and the
    /// granted permissions are recorded on the context.
    pub async fn check(&self, ctx: &mut RequestContext) -> Result<Grant, GuardRejection> {
        let extractor = &self.options.extractor;
        let principal = extractor.principal_id(ctx).unwrap_or(Value::Null);
        let principal_type = if self.options.with_principal_type {
            extractor.principal_type(ctx)
        } else {
            None
        };

        let mut inbound = CallOptions::new();
        if let Some(token) = ctx.header("authorization") {
            inbound = inbound.header("authorization", token);
        }
        let call = inbound.merged(&self.options.call);

        let grant = self
            .service
            .decide(&principal, principal_type.as_deref(), &self.request, &call)
            .await
            .map_err(|err| {
                if err.is_denial() {
                    debug!("Guard rejected request: {}", err);
                    GuardRejection::Unauthorized {
                        message: err.to_string(),
                    }
                } else {
                    GuardRejection::Error(err)
                }
            })?;

        if let Some(claims) = &grant.claims {
            ctx.merge_at(extractor.principal_path(), claims);
        }
        ctx.granted = Some(grant.permissions.clone());
        Ok(grant)
    }
}
