//! # Warden Authorization
//!
//! This crate turns permission checks into decisions for the services
//! that need them.
//!
//! ## Overview
//!
//! The warden-auth crate handles:
//! - **Local decisions**: Application callbacks returning held permissions or deciding outright
//! - **Remote decisions**: Delegation to an HTTP authority via `warden-remote`
//! - **Multi-tenant**: One configuration per principal type
//! - **Guards**: Framework-agnostic request guards for both paths and for compiled rules,
//!   local or verified by a remote rules service
//! - **Errors**: One taxonomy with HTTP status and error code mapping
//!
//! ## Combinators
//!
//! ```text
//! unset, 1 permission   -> held contains it
//! unset, N permissions  -> every requested permission is held
//! OR                    -> any requested permission is held
//! AND                   -> held set equals the requested set (or contains it, see AndSemantics)
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use serde_json::json;
//! use std::sync::Arc;
//! use warden_auth::{Authorizer, AuthorizerOptions, AuthzError, CallOptions, StaticPermissions};
//! use warden_rbac::Combinator;
//!
//! # async fn example() -> warden_auth::AuthzResult<()> {
//! let table = StaticPermissions::new()
//!     .with_principal(0, ["users:create", "users:remove"])
//!     .with_principal(1, ["users:read"]);
//! let authorizer = Authorizer::new(AuthorizerOptions::lookup(Arc::new(table)))?;
//!
//! // Any of the two
//! authorizer
//!     .authorize(&json!(1), &json!(["users:read", "users:create"]), Some(Combinator::Or), &CallOptions::new())
//!     .await?;
//!
//! // Both, without a combinator
//! let denied = authorizer
//!     .authorize(&json!(1), &json!(["users:read", "users:create"]), None, &CallOptions::new())
//!     .await;
//! assert!(matches!(denied, Err(AuthzError::PermissionDenied)));
//! # Ok(())
//! # }
//! ```

pub mod authorizer;
pub mod combinator;
pub mod error;
pub mod guard;
pub mod local;
pub mod options;
pub mod rbac_guard;

// Re-export main types for convenience
pub use authorizer::{Authorizer, Grant, TenantAuthorizer, TenantAuthorizerBuilder};
pub use combinator::{evaluate, AndSemantics};
pub use error::{AuthzError, AuthzResult};
pub use guard::{
    AuthorizationGuard, DecisionService, FieldPathExtractor, GuardOptions, GuardRejection,
    PrincipalExtractor, RequestContext, DEFAULT_ID_PATH, DEFAULT_TYPE_PATH,
};
pub use local::{CheckOutcome, LocalStrategy, LookupError, PermissionCheck, PermissionLookup, StaticPermissions};
pub use options::{AuthorizerOptions, CallOptions, Strategy};
pub use rbac_guard::{RbacAction, RbacGuard, RbacVerifier};
