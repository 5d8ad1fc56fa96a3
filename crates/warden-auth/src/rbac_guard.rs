//! Compiled-rule guards
//!
//! Guards over an [`RbacEngine`]: `allow` lets a request through when the
//! principal is permitted one of the listed permissions, `deny` stops it
//! when [`RbacEngine::deny`] says so. In remote mode the decision is asked
//! of another service, whose [`RbacVerifier`] answers it.

use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, instrument};
use warden_rbac::{
    Permission, PermissionSet, PermissionsGroup, PrincipalId, RbacEngine, RolesSource, UsersSource,
};
use warden_remote::{RemoteAuthorizer, RemoteCall, RemoteConfig, VerifyEnvelope, VerifyRequest, ENVELOPE_KEY};

use crate::error::{AuthzError, AuthzResult};
use crate::guard::{GuardRejection, RequestContext, DEFAULT_ID_PATH};

/// What a compiled-rule guard does with a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RbacAction {
    /// Continue only when permitted.
    Allow,
    /// Reject when the deny decision holds.
    Deny,
}

impl RbacAction {
    /// Parse from string representation (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "allow" => Some(Self::Allow),
            "deny" => Some(Self::Deny),
            _ => None,
        }
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            RbacAction::Allow => "allow",
            RbacAction::Deny => "deny",
        }
    }
}

/// Guard over compiled rules.
///
/// # Example
///
/// ```rust,no_run
/// use serde_json::json;
/// use std::sync::Arc;
/// use warden_auth::{RbacGuard, RequestContext};
/// use warden_rbac::{EngineConfig, MemoryRolesSource, MemoryUsersSource, RbacEngine};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = Arc::new(RbacEngine::new(
///     Arc::new(MemoryRolesSource::default()),
///     Arc::new(MemoryUsersSource::default()),
///     EngineConfig::default(),
/// ));
/// engine.initialize().await?;
///
/// let guard = RbacGuard::allow(engine, ["update"], None);
/// let result = guard.check(&RequestContext::new(json!({"user": {"id": 1}}))).await;
/// # Ok(())
/// # }
/// ```
pub struct RbacGuard<R, U>
where
    R: RolesSource,
    U: UsersSource<Role = R::Role>,
{
    engine: Arc<RbacEngine<R, U>>,
    permissions: PermissionSet,
    group: Option<PermissionsGroup>,
    action: RbacAction,
    id_path: String,
    remote: Option<RemoteAuthorizer>,
}

impl<R, U> RbacGuard<R, U>
where
    R: RolesSource,
    U: UsersSource<Role = R::Role>,
{
    /// Guard continuing only when the principal is permitted.
    pub fn allow<I, S>(engine: Arc<RbacEngine<R, U>>, permissions: I, group: Option<PermissionsGroup>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(engine, permissions, group, RbacAction::Allow)
    }

    /// Guard rejecting when the deny decision holds.
    pub fn deny<I, S>(engine: Arc<RbacEngine<R, U>>, permissions: I, group: Option<PermissionsGroup>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(engine, permissions, group, RbacAction::Deny)
    }

    fn new<I, S>(
        engine: Arc<RbacEngine<R, U>>,
        permissions: I,
        group: Option<PermissionsGroup>,
        action: RbacAction,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            engine,
            permissions: permissions.into_iter().map(|p| Permission::new(p.as_ref())).collect(),
            group,
            action,
            id_path: DEFAULT_ID_PATH.to_string(),
            remote: None,
        }
    }

    /// Read the principal id from another dotted path.
    pub fn with_id_path(mut self, id_path: impl Into<String>) -> Self {
        self.id_path = id_path.into();
        self
    }

    /// Ask a remote rules service instead of the local engine.
    ///
    /// # Errors
    ///
    /// [`AuthzError::Configuration`] when the endpoint is missing or invalid.
    pub fn with_remote(self, config: RemoteConfig) -> AuthzResult<Self> {
        if !config.is_configured() {
            return Err(AuthzError::Configuration(
                "remote compiled-rule guard requires an absolute http(s) url".to_string(),
            ));
        }
        Ok(self.with_remote_authorizer(RemoteAuthorizer::new(config)?))
    }

    /// Ask a remote rules service through an existing client.
    pub fn with_remote_authorizer(mut self, remote: RemoteAuthorizer) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Check whether decisions are asked of a remote service.
    pub fn is_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Check a request.
    ///
    /// Locally, a missing principal id is rejected as
    /// [`GuardRejection::Forbidden`]. Remotely, the principal object is sent
    /// as is and the remote verdict decides.
    #[instrument(skip(self, ctx), fields(action = self.action.as_str(), remote = self.remote.is_some()))]
    pub async fn check(&self, ctx: &RequestContext) -> Result<(), GuardRejection> {
        if let Some(remote) = &self.remote {
            return self.check_remote(remote, ctx).await;
        }

        let principal = match ctx.value_at(&self.id_path) {
            None | Some(Value::Null) => {
                debug!("No principal in request");
                return Err(GuardRejection::forbidden());
            }
            Some(value) => PrincipalId::from_value(value).map_err(AuthzError::from)?,
        };

        let group = self.group.as_ref();
        let rejected = match self.action {
            RbacAction::Allow => !self
                .engine
                .permit(principal, Some(&self.permissions), group)
                .await
                .map_err(AuthzError::from)?,
            RbacAction::Deny => self
                .engine
                .deny(principal, Some(&self.permissions), group)
                .await
                .map_err(AuthzError::from)?,
        };

        if rejected {
            debug!(principal = %principal, "Compiled rules rejected request");
            return Err(GuardRejection::forbidden());
        }
        Ok(())
    }

    async fn check_remote(&self, remote: &RemoteAuthorizer, ctx: &RequestContext) -> Result<(), GuardRejection> {
        let envelope = VerifyEnvelope::from(VerifyRequest {
            permissions: self.permissions.clone(),
            permissions_group: self.group.as_ref().map(|g| g.as_str().to_string()),
            requested_action: self.action.as_str().to_string(),
            user: self.principal_object(ctx),
        });

        let mut call = RemoteCall::new();
        if let Some(authorization) = ctx.header("authorization") {
            call = call.authorization(authorization);
        }

        let verdict = remote.verify(&envelope, &call).await.map_err(AuthzError::from)?;
        let rejected = match self.action {
            RbacAction::Allow => !verdict,
            RbacAction::Deny => verdict,
        };

        if rejected {
            debug!("Remote rules service rejected request");
            return Err(GuardRejection::forbidden());
        }
        Ok(())
    }

    /// The object holding the principal id, e.g. `user` for `user.id`.
    fn principal_object(&self, ctx: &RequestContext) -> Value {
        match self.id_path.rsplit_once('.') {
            Some((parent, _)) => ctx.value_at(parent).cloned().unwrap_or(Value::Null),
            None => ctx.principal.clone(),
        }
    }
}

/// Answers decision requests on behalf of remote guards.
///
/// Expects a body of the form:
///
/// ```json
/// {"c8rbac": {
///   "permissions": ["user_admin", "create_user"],
///   "requestedAction": "allow",
///   "permissionsGroup": "DEFAULT",
///   "user": {"id": 1}
/// }}
/// ```
///
/// and answers `{"requestedActionResult": <bool>}`. A body without the
/// envelope or without permissions is refused with a negative verdict.
pub struct RbacVerifier<R, U>
where
    R: RolesSource,
    U: UsersSource<Role = R::Role>,
{
    engine: Arc<RbacEngine<R, U>>,
}

impl<R, U> RbacVerifier<R, U>
where
    R: RolesSource,
    U: UsersSource<Role = R::Role>,
{
    /// Verifier over an engine.
    pub fn new(engine: Arc<RbacEngine<R, U>>) -> Self {
        Self { engine }
    }

    /// Decide a verification request body.
    pub async fn verify(&self, body: &Value) -> Result<Value, GuardRejection> {
        let body = match body.get(ENVELOPE_KEY) {
            Some(envelope) if !envelope.is_null() => envelope,
            _ => {
                return Err(GuardRejection::Unverified {
                    code: 1101,
                    message: format!(
                        "Permission to resource denied. Could not find object \"{ENVELOPE_KEY}\" on req.body"
                    ),
                })
            }
        };

        let permissions = match body.get("permissions") {
            Some(value) if !value.is_null() => value,
            _ => {
                return Err(GuardRejection::Unverified {
                    code: 1103,
                    message: "Permissions not provided for the requested RBAC action".to_string(),
                })
            }
        };

        let action = match body.get("requestedAction").and_then(Value::as_str) {
            None => RbacAction::Allow,
            Some(s) => RbacAction::parse(s).ok_or_else(|| GuardRejection::Forbidden {
                code: 1102,
                message: "Invalid Rbac action. The Rbac action must be one of the following values: allow, deny"
                    .to_string(),
            })?,
        };

        let group = body
            .get("permissionsGroup")
            .and_then(Value::as_str)
            .map(PermissionsGroup::parse)
            .transpose()
            .map_err(AuthzError::from)?;

        let principal = body
            .pointer("/user/id")
            .map(PrincipalId::from_value)
            .transpose()
            .map_err(AuthzError::from)?
            .ok_or_else(|| AuthzError::Validation("user.id is required".to_string()))?;

        let result = match action {
            RbacAction::Allow => self.engine.permit_value(principal, Some(permissions), group.as_ref()).await,
            RbacAction::Deny => self.engine.deny_value(principal, Some(permissions), group.as_ref()).await,
        }
        .map_err(AuthzError::from)?;

        Ok(json!({ "requestedActionResult": result }))
    }
}
