//! Combinator evaluation for the flat path.
//!
//! Compares the permissions a principal holds with the permissions a
//! request asks for:
//!
//! | combinator | requested | permitted when |
//! |---|---|---|
//! | unset | 1 | held contains it |
//! | unset | N | every requested permission is held |
//! | `OR` | ≥ 2 | at least one requested permission is held |
//! | `AND` | ≥ 2 | held equals requested ([`AndSemantics::Exact`]) or contains it ([`AndSemantics::Superset`]) |

use serde::{Deserialize, Serialize};
use warden_rbac::{Combinator, DecisionRequest, PermissionSet};

/// Meaning of the `AND` combinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AndSemantics {
    /// The held set must equal the requested set (order-insensitive).
    #[default]
    Exact,
    /// The held set must contain every requested permission.
    Superset,
}

impl AndSemantics {
    /// Parse from string representation (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "exact" => Some(Self::Exact),
            "superset" => Some(Self::Superset),
            _ => None,
        }
    }
}

/// Decide a request against a principal's held permissions.
pub fn evaluate(request: &DecisionRequest, held: &PermissionSet, and: AndSemantics) -> bool {
    let requested = request.permissions();
    match request.combinator() {
        None => held.intersection_len(requested) == requested.len(),
        Some(Combinator::Or) => held.contains_any(requested),
        Some(Combinator::And) => match and {
            AndSemantics::Exact => held.same_members(requested),
            AndSemantics::Superset => held.contains_all(requested),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn held(names: &[&str]) -> PermissionSet {
        PermissionSet::from_strings(names)
    }

    fn request(names: &[&str], combinator: Option<Combinator>) -> DecisionRequest {
        DecisionRequest::new(names.iter().copied(), combinator).unwrap()
    }

    #[test]
    fn test_single_permission() {
        let held = held(&["users:read"]);
        assert!(evaluate(&request(&["users:read"], None), &held, AndSemantics::Exact));
        assert!(evaluate(&request(&["USERS:READ"], None), &held, AndSemantics::Exact));
        assert!(!evaluate(&request(&["users:create"], None), &held, AndSemantics::Exact));
    }

    #[test]
    fn test_unset_combinator_needs_every_permission() {
        let held = held(&["users:read", "users:create", "users:remove"]);
        assert!(evaluate(
            &request(&["users:read", "users:create"], None),
            &held,
            AndSemantics::Exact
        ));
        assert!(!evaluate(
            &request(&["users:read", "users:update"], None),
            &held,
            AndSemantics::Exact
        ));
    }

    #[test]
    fn test_or_needs_any_permission() {
        let held = held(&["users:read"]);
        let req = request(&["users:create", "users:read"], Some(Combinator::Or));
        assert!(evaluate(&req, &held, AndSemantics::Exact));

        let req = request(&["users:create", "users:remove"], Some(Combinator::Or));
        assert!(!evaluate(&req, &held, AndSemantics::Exact));
    }

    #[test]
    fn test_and_exact_is_order_insensitive_equality() {
        let req = request(&["users:create", "users:remove"], Some(Combinator::And));
        assert!(evaluate(&req, &held(&["users:remove", "users:create"]), AndSemantics::Exact));
        assert!(!evaluate(
            &req,
            &held(&["users:remove", "users:create", "users:read"]),
            AndSemantics::Exact
        ));
        assert!(!evaluate(&req, &held(&["users:create"]), AndSemantics::Exact));
    }

    #[test]
    fn test_and_superset() {
        let req = request(&["users:create", "users:remove"], Some(Combinator::And));
        assert!(evaluate(
            &req,
            &held(&["users:remove", "users:create", "users:read"]),
            AndSemantics::Superset
        ));
        assert!(!evaluate(&req, &held(&["users:create"]), AndSemantics::Superset));
    }

    #[test]
    fn test_and_semantics_parse() {
        assert_eq!(AndSemantics::parse("Superset"), Some(AndSemantics::Superset));
        assert_eq!(AndSemantics::parse("all"), None);
    }
}
