//! Wire format of compiled-rule verification.
//!
//! A compiled-rule guard in remote mode asks another service, one that owns
//! the rules, whether the requested action holds:
//!
//! ```json
//! {"c8rbac": {
//!   "permissions": ["update"],
//!   "permissionsGroup": "DEFAULT",
//!   "requestedAction": "allow",
//!   "user": {"id": 1}
//! }}
//! ```
//!
//! and is answered with `{"requestedActionResult": true}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use warden_rbac::PermissionSet;

/// Key of the envelope object in a verification body.
pub const ENVELOPE_KEY: &str = "c8rbac";

/// Key of the verdict in a verification answer.
pub const VERDICT_KEY: &str = "requestedActionResult";

/// Verification request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyEnvelope {
    /// The request itself.
    pub c8rbac: VerifyRequest,
}

/// Action the remote service is asked to decide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    /// Permissions guarding the resource, as the guard spells them.
    pub permissions: PermissionSet,

    /// Group the permissions belong to; the service default when absent.
    #[serde(default)]
    pub permissions_group: Option<String>,

    /// `allow` or `deny`.
    pub requested_action: String,

    /// Principal object of the inbound request.
    #[serde(default)]
    pub user: Value,
}

impl From<VerifyRequest> for VerifyEnvelope {
    fn from(c8rbac: VerifyRequest) -> Self {
        Self { c8rbac }
    }
}

/// Verification answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Whether the requested action holds.
    #[serde(rename = "requestedActionResult")]
    pub requested_action_result: bool,
}
