//! Tests for local, remote and multi-tenant authorization.
//!
//! Local decisions use a fixed permissions table:
//! principal 0 holds `users:create` and `users:remove`, principal 1 holds
//! `users:read`. Remote decisions run against a wiremock authority.

use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use warden_auth::{
    AndSemantics, Authorizer, AuthorizerOptions, AuthzError, CallOptions, CheckOutcome,
    LookupError, PermissionCheck, PermissionLookup, StaticPermissions, Strategy, TenantAuthorizer,
};
use warden_rbac::{Combinator, DecisionRequest, PermissionSet, PrincipalId};
use warden_remote::RemoteConfig;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Permissions table that counts lookups.
struct CountingLookup {
    table: StaticPermissions,
    calls: AtomicUsize,
}

impl CountingLookup {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            table: StaticPermissions::new()
                .with_principal(0, ["users:create", "users:remove"])
                .with_principal(1, ["users:read"]),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionLookup for CountingLookup {
    async fn held_permissions(&self, principal: PrincipalId) -> Result<PermissionSet, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.table.held_permissions(principal).await
    }
}

struct FailingLookup;

#[async_trait]
impl PermissionLookup for FailingLookup {
    async fn held_permissions(&self, _principal: PrincipalId) -> Result<PermissionSet, LookupError> {
        Err("permissions store unavailable".into())
    }
}

/// Grants `users:read` with claims about the principal, denies everything else.
struct ReadOnlyCheck;

#[async_trait]
impl PermissionCheck for ReadOnlyCheck {
    async fn check(
        &self,
        principal: PrincipalId,
        request: &DecisionRequest,
    ) -> Result<CheckOutcome, LookupError> {
        let read_only = request.permissions().iter().all(|p| p.as_str() == "users:read");
        if !read_only {
            return Ok(CheckOutcome::Denied);
        }
        let mut claims = warden_rbac::Claims::new();
        claims.insert("id".to_string(), json!(principal.0));
        Ok(CheckOutcome::Granted(Some(claims)))
    }
}

fn local(lookup: Arc<CountingLookup>) -> Authorizer {
    Authorizer::new(AuthorizerOptions::lookup(lookup)).unwrap()
}

fn call() -> CallOptions {
    CallOptions::new()
}

#[tokio::test]
async fn test_single_permission_granted_and_denied() {
    let authorizer = local(CountingLookup::new());

    let grant = authorizer
        .authorize(&json!(1), &json!("users:read"), None, &call())
        .await
        .unwrap();
    assert_eq!(grant.principal, PrincipalId(1));
    assert!(grant.claims.is_none());

    let err = authorizer
        .authorize(&json!(1), &json!(["users:create"]), None, &call())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::PermissionDenied));
    assert_eq!(err.status_code(), 401);
}

#[tokio::test]
async fn test_unset_combinator_requires_every_permission() {
    let authorizer = local(CountingLookup::new());
    let err = authorizer
        .authorize(&json!(1), &json!(["users:read", "users:create"]), None, &call())
        .await
        .unwrap_err();
    assert!(err.is_denial());
}

#[tokio::test]
async fn test_or_combinator() {
    let authorizer = local(CountingLookup::new());
    let permissions = json!(["users:read", "users:create"]);

    authorizer
        .authorize(&json!(1), &permissions, Some(Combinator::Or), &call())
        .await
        .unwrap();

    let err = authorizer
        .authorize(&json!(1), &json!(["users:create", "users:remove"]), Some(Combinator::Or), &call())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::PermissionDenied));
}

#[tokio::test]
async fn test_and_combinator_semantics() {
    let authorizer = local(CountingLookup::new());

    authorizer
        .authorize(&json!(0), &json!(["users:remove", "users:create"]), Some(Combinator::And), &call())
        .await
        .unwrap();

    // Exact: a held set with more members than requested does not match
    let err = authorizer
        .authorize(&json!(0), &json!(["users:create", "users:read"]), Some(Combinator::And), &call())
        .await
        .unwrap_err();
    assert!(err.is_denial());

    let superset = Authorizer::new(
        AuthorizerOptions::lookup(Arc::new(
            StaticPermissions::new().with_principal(0, ["users:create", "users:remove", "users:read"]),
        ))
        .with_and_semantics(AndSemantics::Superset),
    )
    .unwrap();
    superset
        .authorize(&json!(0), &json!(["users:create", "users:remove"]), Some(Combinator::And), &call())
        .await
        .unwrap();

    // Per-call override back to exact
    let err = superset
        .authorize(
            &json!(0),
            &json!(["users:create", "users:remove"]),
            Some(Combinator::And),
            &CallOptions::new().and_semantics(AndSemantics::Exact),
        )
        .await
        .unwrap_err();
    assert!(err.is_denial());
}

#[tokio::test]
async fn test_non_numeric_principal_fails_before_lookup() {
    let lookup = CountingLookup::new();
    let authorizer = local(Arc::clone(&lookup));

    let err = authorizer
        .authorize(&json!("Not a Number"), &json!(["users:read"]), None, &call())
        .await
        .unwrap_err();

    assert!(matches!(err, AuthzError::InvalidIdentifier(_)));
    assert!(err.is_validation());
    assert_eq!(lookup.calls(), 0);
}

#[tokio::test]
async fn test_numeric_string_principal_is_accepted() {
    let authorizer = local(CountingLookup::new());
    let grant = authorizer
        .authorize(&json!("1"), &json!(["users:read"]), None, &call())
        .await
        .unwrap();
    assert_eq!(grant.principal, PrincipalId(1));
}

#[tokio::test]
async fn test_combinator_with_one_permission_fails_before_lookup() {
    let lookup = CountingLookup::new();
    let authorizer = local(Arc::clone(&lookup));

    let err = authorizer
        .authorize(&json!(1), &json!(["users:read"]), Some(Combinator::Or), &call())
        .await
        .unwrap_err();

    assert!(matches!(err, AuthzError::InvalidCombinatorCombination { count: 1, .. }));
    assert_eq!(lookup.calls(), 0);
}

#[tokio::test]
async fn test_invalid_permissions_value() {
    let authorizer = local(CountingLookup::new());
    for permissions in [json!(42), json!([]), json!([1, 2]), json!(null)] {
        let err = authorizer
            .authorize(&json!(1), &permissions, None, &call())
            .await
            .unwrap_err();
        assert!(err.is_validation(), "{permissions} should be rejected, got {err:?}");
    }
}

#[tokio::test]
async fn test_lookup_failure_propagates_with_context() {
    let authorizer = Authorizer::new(AuthorizerOptions::lookup(Arc::new(FailingLookup))).unwrap();
    let err = authorizer
        .authorize(&json!(3), &json!(["users:read"]), None, &call())
        .await
        .unwrap_err();

    match err {
        AuthzError::Lookup { principal, message } => {
            assert_eq!(principal, PrincipalId(3));
            assert_eq!(message, "permissions store unavailable");
        }
        other => panic!("expected lookup error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_check_strategy_returns_claims() {
    let authorizer = Authorizer::new(AuthorizerOptions::check(Arc::new(ReadOnlyCheck))).unwrap();

    let grant = authorizer
        .authorize(&json!(5), &json!(["users:read"]), None, &call())
        .await
        .unwrap();
    assert_eq!(grant.claims.unwrap().get("id"), Some(&json!(5)));

    let err = authorizer
        .authorize(&json!(5), &json!(["users:remove"]), None, &call())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::PermissionDenied));
}

#[test]
fn test_configuration_is_validated_at_build() {
    let err = Authorizer::new(AuthorizerOptions::default()).unwrap_err();
    assert!(matches!(err, AuthzError::Configuration(_)));

    let err = Authorizer::new(AuthorizerOptions::remote(RemoteConfig::default())).unwrap_err();
    assert!(matches!(err, AuthzError::Configuration(_)));

    let err = Authorizer::new(AuthorizerOptions::remote(RemoteConfig::new("ftp://auth"))).unwrap_err();
    assert!(matches!(err, AuthzError::Configuration(_)));
}

#[test]
fn test_malformed_remote_url_fails_at_build() {
    let config = RemoteConfig::new("http://exa mple.com/authorize");
    let err = Authorizer::new(AuthorizerOptions::remote(config)).unwrap_err();
    assert!(matches!(err, AuthzError::Configuration(_)));
    assert_eq!(err.status_code(), 500);
}

#[tokio::test]
async fn test_remote_receives_permissions_as_written() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/authorize"))
        .and(body_json(json!({"permissions": ["Users:Read", "Reports:Export"], "checkType": "OR"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let authorizer = Authorizer::new(AuthorizerOptions::remote(RemoteConfig::new(format!(
        "{}/authorize",
        server.uri()
    ))))
    .unwrap();

    authorizer
        .authorize(
            &json!(1),
            &json!(["Users:Read", "Reports:Export"]),
            Some(Combinator::Or),
            &CallOptions::new(),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_remote_grant_returns_claims() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/authorize"))
        .and(body_json(json!({"permissions": ["users:read"], "checkType": null})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1000})))
        .expect(1)
        .mount(&server)
        .await;

    let authorizer = Authorizer::new(AuthorizerOptions::remote(RemoteConfig::new(format!(
        "{}/authorize",
        server.uri()
    ))))
    .unwrap();
    assert!(authorizer.is_remote());

    let grant = authorizer
        .authorize(&json!(1), &json!(["users:read"]), None, &call())
        .await
        .unwrap();
    assert_eq!(grant.claims.unwrap().get("id"), Some(&json!(1000)));
}

#[tokio::test]
async fn test_remote_denial_keeps_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let authorizer = Authorizer::new(AuthorizerOptions::remote(RemoteConfig::new(server.uri()))).unwrap();
    let err = authorizer
        .authorize(&json!(1), &json!(["users:read"]), None, &call())
        .await
        .unwrap_err();

    match err {
        AuthzError::RemoteDenied {
            status,
            status_text,
            ..
        } => {
            assert_eq!(status, 401);
            assert_eq!(status_text, "Unauthorized");
        }
        other => panic!("expected remote denial, got {other:?}"),
    }
}

#[tokio::test]
async fn test_call_strategy_overrides_default() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(header("authorization", "Bearer override"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let lookup = CountingLookup::new();
    let authorizer = local(Arc::clone(&lookup));
    let overrides = CallOptions::new()
        .strategy(Strategy::Remote(RemoteConfig::new(server.uri())))
        .header("Authorization", "Bearer override");

    // Principal 1 lacks users:remove locally; the remote authority grants it
    authorizer
        .authorize(&json!(1), &json!(["users:remove"]), None, &overrides)
        .await
        .unwrap();
    assert_eq!(lookup.calls(), 0);
}

fn tenants(remote_url: String) -> TenantAuthorizer {
    TenantAuthorizer::builder()
        .principal_type("user", AuthorizerOptions::lookup(CountingLookup::new()))
        .principal_type("app", AuthorizerOptions::remote(RemoteConfig::new(remote_url)))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_tenant_dispatches_by_principal_type() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"app": "billing"})))
        .expect(1)
        .mount(&server)
        .await;

    let tenants = tenants(server.uri());

    let grant = tenants
        .authorize(&json!(1), "user", &json!(["users:read"]), None, &call())
        .await
        .unwrap();
    assert!(grant.claims.is_none());

    let grant = tenants
        .authorize(&json!(9), "app", &json!(["apps:read"]), None, &call())
        .await
        .unwrap();
    assert_eq!(grant.claims.unwrap().get("app"), Some(&json!("billing")));
}

#[tokio::test]
async fn test_tenant_unknown_principal_type() {
    let tenants = tenants("http://localhost:1".to_string());
    let err = tenants
        .authorize(&json!(1), "robot", &json!(["users:read"]), None, &call())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::UnknownPrincipalType(ref t) if t == "robot"));
    assert_eq!(err.status_code(), 400);
}

#[tokio::test]
async fn test_tenant_validates_principal_before_dispatch() {
    let tenants = tenants("http://localhost:1".to_string());
    let err = tenants
        .authorize(&json!("Not a Number"), "app", &json!(["users:read"]), None, &call())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::InvalidIdentifier(_)));
}

#[test]
fn test_tenant_configuration_errors_name_the_type() {
    let err = TenantAuthorizer::builder()
        .principal_type("user", AuthorizerOptions::lookup(CountingLookup::new()))
        .principal_type("app", AuthorizerOptions::remote(RemoteConfig::new("auth.internal")))
        .build()
        .unwrap_err();

    match err {
        AuthzError::Configuration(message) => assert!(message.contains("`app`"), "{message}"),
        other => panic!("expected configuration error, got {other:?}"),
    }

    assert!(TenantAuthorizer::builder().build().is_err());
}
