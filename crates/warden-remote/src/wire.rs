//! Wire format of the remote authorization request.

use serde::{Deserialize, Serialize};
use warden_rbac::{Combinator, DecisionRequest, PermissionSet};

/// JSON body POSTed to the remote authority.
///
/// ```json
/// {"permissions": ["users:read"], "checkType": null}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteDecisionBody {
    /// Requested permissions, in request order and as the caller spelled them.
    pub permissions: PermissionSet,

    /// Combinator, `null` when unset.
    #[serde(rename = "checkType")]
    pub check_type: Option<Combinator>,
}

impl From<&DecisionRequest> for RemoteDecisionBody {
    fn from(request: &DecisionRequest) -> Self {
        Self {
            permissions: request.permissions().clone(),
            check_type: request.combinator(),
        }
    }
}
