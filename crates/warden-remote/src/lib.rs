//! # Warden Remote (Delegated Authorization)
//!
//! HTTP client that delegates a decision to a remote authority.
//!
//! ## Wire Protocol
//!
//! ```text
//! POST <url>
//! authorization: <forwarded verbatim, only when supplied>
//! content-type: application/json
//!
//! {"permissions": ["users:read"], "checkType": null | "OR" | "AND"}
//!
//! 2xx      -> granted; a JSON object body is returned as claims
//! non-2xx  -> denied; status and status text are exposed
//! ```
//!
//! Compiled-rule guards in remote mode send a `c8rbac` envelope instead
//! (see [`verdict`]) and read `{"requestedActionResult": bool}` back.
//!
//! Timeouts and connection failures are reported separately from denials
//! and are never retried.

pub mod client;
pub mod config;
pub mod error;
pub mod verdict;
pub mod wire;

pub use client::{RemoteAuthorizer, RemoteCall};
pub use config::{validate_url, ConfigError, RemoteConfig};
pub use error::{RemoteError, RemoteResult};
pub use verdict::{Verdict, VerifyEnvelope, VerifyRequest, ENVELOPE_KEY, VERDICT_KEY};
pub use wire::RemoteDecisionBody;
