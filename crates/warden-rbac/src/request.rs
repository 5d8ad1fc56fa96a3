//! # Decision requests
//!
//! Transient per-call types: the principal being checked, the combinator,
//! the validated request and the claims a remote authority may return.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::{RbacError, RbacResult};
use crate::permissions::{Permission, PermissionSet};

/// Data about a principal returned by a remote authority on grant.
pub type Claims = serde_json::Map<String, Value>;

/// Numeric principal identifier.
///
/// Identifiers arrive from request contexts as JSON numbers or strings, so
/// parsing accepts both as long as the value is an integer.
///
/// # Example
///
/// ```
/// use warden_rbac::PrincipalId;
///
/// assert_eq!("42".parse::<PrincipalId>().unwrap(), PrincipalId(42));
/// assert!("Not a Number".parse::<PrincipalId>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(pub i64);

impl PrincipalId {
    /// Convert an untyped JSON value into a principal id.
    ///
    /// # Errors
    ///
    /// Returns [`RbacError::InvalidIdentifier`] for anything that is not an
    /// integral number or a string holding one.
    pub fn from_value(value: &Value) -> RbacResult<Self> {
        match value {
            Value::Number(n) => {
                if let Some(id) = n.as_i64() {
                    return Ok(Self(id));
                }
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(Self(f as i64)),
                    _ => Err(RbacError::InvalidIdentifier(n.to_string())),
                }
            }
            Value::String(s) => s.parse(),
            other => Err(RbacError::InvalidIdentifier(other.to_string())),
        }
    }
}

impl FromStr for PrincipalId {
    type Err = RbacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(Self)
            .map_err(|_| RbacError::InvalidIdentifier(s.to_string()))
    }
}

impl From<i64> for PrincipalId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Logical mode for evaluating several requested permissions.
///
/// Absence of a combinator (`Option::None`) is the "single / unset" mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Combinator {
    /// At least one requested permission must be held.
    #[serde(rename = "OR")]
    Or,
    /// The held permissions must match the requested ones.
    #[serde(rename = "AND")]
    And,
}

impl Combinator {
    /// Wire representation (`"OR"` / `"AND"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Combinator::Or => "OR",
            Combinator::And => "AND",
        }
    }

    /// Parse a combinator (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "OR" => Some(Self::Or),
            "AND" => Some(Self::And),
            _ => None,
        }
    }
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated decision request: what to check, and how to combine it.
///
/// # Example
///
/// ```
/// use warden_rbac::{Combinator, DecisionRequest};
///
/// let req = DecisionRequest::new(["users:read", "users:create"], Some(Combinator::Or)).unwrap();
/// assert_eq!(req.permissions().len(), 2);
///
/// // OR/AND need at least two distinct permissions
/// assert!(DecisionRequest::new(["users:read"], Some(Combinator::And)).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecisionRequest {
    permissions: PermissionSet,
    combinator: Option<Combinator>,
}

impl DecisionRequest {
    /// Build a request from permission names.
    ///
    /// # Errors
    ///
    /// - [`RbacError::Validation`] when no permission (or an empty name) is given
    /// - [`RbacError::InvalidCombinatorCombination`] when OR/AND get fewer
    ///   than two distinct permissions
    pub fn new<I, S>(permissions: I, combinator: Option<Combinator>) -> RbacResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = PermissionSet::new();
        for name in permissions {
            let perm = Permission::new(name.as_ref());
            if perm.is_empty() {
                return Err(RbacError::Validation(
                    "permission names must not be empty".to_string(),
                ));
            }
            set.add(perm);
        }
        Self::from_set(set, combinator)
    }

    /// Build a request from an already collected permission set.
    pub fn from_set(permissions: PermissionSet, combinator: Option<Combinator>) -> RbacResult<Self> {
        if permissions.is_empty() {
            return Err(RbacError::Validation(
                "permissions must be a non-empty list of strings".to_string(),
            ));
        }
        if let Some(c) = combinator {
            if permissions.len() < 2 {
                return Err(RbacError::InvalidCombinatorCombination {
                    combinator: c.to_string(),
                    count: permissions.len(),
                });
            }
        }
        Ok(Self {
            permissions,
            combinator,
        })
    }

    /// Build a request from untyped JSON: a string or an array of strings.
    pub fn from_value(value: &Value, combinator: Option<Combinator>) -> RbacResult<Self> {
        match value {
            Value::String(s) => Self::new([s.as_str()], combinator),
            Value::Array(items) => {
                let names = items
                    .iter()
                    .map(|item| {
                        item.as_str().ok_or_else(|| {
                            RbacError::Validation(
                                "permissions must be a string or an array of strings".to_string(),
                            )
                        })
                    })
                    .collect::<RbacResult<Vec<&str>>>()?;
                Self::new(names, combinator)
            }
            _ => Err(RbacError::Validation(
                "permissions must be a string or an array of strings".to_string(),
            )),
        }
    }

    /// Requested permissions in request order.
    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    /// Requested combinator, `None` when unset.
    pub fn combinator(&self) -> Option<Combinator> {
        self.combinator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_principal_id_from_value() {
        assert_eq!(PrincipalId::from_value(&json!(1)).unwrap(), PrincipalId(1));
        assert_eq!(PrincipalId::from_value(&json!("7")).unwrap(), PrincipalId(7));
        assert_eq!(PrincipalId::from_value(&json!(3.0)).unwrap(), PrincipalId(3));
        assert!(PrincipalId::from_value(&json!(3.5)).is_err());
        assert!(PrincipalId::from_value(&json!(null)).is_err());
        assert!(matches!(
            PrincipalId::from_value(&json!("Not a Number")),
            Err(RbacError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_combinator_wire_format() {
        assert_eq!(serde_json::to_string(&Combinator::Or).unwrap(), "\"OR\"");
        assert_eq!(Combinator::parse("and"), Some(Combinator::And));
        assert_eq!(Combinator::parse("xor"), None);
    }

    #[test]
    fn test_request_validation() {
        assert!(DecisionRequest::new(Vec::<String>::new(), None).is_err());
        assert!(DecisionRequest::new([""], None).is_err());

        let err = DecisionRequest::new(["read", "READ"], Some(Combinator::Or)).unwrap_err();
        assert!(matches!(
            err,
            RbacError::InvalidCombinatorCombination { count: 1, .. }
        ));

        // Unset combinator accepts several permissions
        let req = DecisionRequest::new(["read", "write"], None).unwrap();
        assert_eq!(req.combinator(), None);
        assert_eq!(req.permissions().len(), 2);
    }

    #[test]
    fn test_request_from_value() {
        let req = DecisionRequest::from_value(&json!("users:read"), None).unwrap();
        assert_eq!(req.permissions().len(), 1);

        let req = DecisionRequest::from_value(&json!(["a", "b"]), Some(Combinator::And)).unwrap();
        assert_eq!(req.combinator(), Some(Combinator::And));

        assert!(DecisionRequest::from_value(&json!([1, 2]), None).is_err());
        assert!(DecisionRequest::from_value(&json!({"a": 1}), None).is_err());
    }
}
