//! Role and ownership checks
//!
//! Every mutating endpoint, web or API, asks [`authorize`] before touching
//! data. Admins pass everything. Teachers pass the teacher gate, and when a
//! resource owner is supplied they must be that owner. Readers only pass
//! the authenticated gate.

use crate::models::{Role, User};
use crate::services::error::{ServiceError, ServiceResult, MSG_UNAUTHORIZED};

/// The authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requester {
    pub id: i64,
    pub role: Role,
}

impl Requester {
    pub fn new(id: i64, role: Role) -> Self {
        Self { id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&User> for Requester {
    fn from(user: &User) -> Self {
        Self::new(user.id, user.role)
    }
}

/// Minimum role an operation requires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Authenticated,
    Teacher,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The role does not pass the gate
    Role,
    /// A teacher acting on somebody else's resource
    Ownership,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }

    /// Turn a denial into `Forbidden`. Ownership denials carry
    /// `ownership_message`, role denials the generic one.
    pub fn or_forbidden(self, ownership_message: &str) -> ServiceResult<()> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(DenyReason::Ownership) => {
                Err(ServiceError::forbidden(ownership_message))
            }
            Decision::Deny(DenyReason::Role) => Err(ServiceError::forbidden(MSG_UNAUTHORIZED)),
        }
    }
}

fn passes_gate(role: Role, gate: Gate) -> bool {
    match gate {
        Gate::Authenticated => true,
        Gate::Teacher => matches!(role, Role::Teacher | Role::Admin),
        Gate::Admin => role == Role::Admin,
    }
}

/// Decide whether `requester` may pass `gate`, and, when `owner_id` is
/// given, act on a resource owned by that user.
pub fn authorize(requester: Requester, gate: Gate, owner_id: Option<i64>) -> Decision {
    if !passes_gate(requester.role, gate) {
        return Decision::Deny(DenyReason::Role);
    }
    match (requester.role, owner_id) {
        (Role::Admin, _) | (_, None) => Decision::Allow,
        (_, Some(owner)) if owner == requester.id => Decision::Allow,
        _ => Decision::Deny(DenyReason::Ownership),
    }
}

/// Parse an id submitted as text (form field, path segment). Surrounding
/// whitespace is ignored; anything else that is not an integer is `None`.
pub fn parse_id(raw: &str) -> Option<i64> {
    raw.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn role_strategy() -> impl Strategy<Value = Role> {
        prop_oneof![Just(Role::Reader), Just(Role::Teacher), Just(Role::Admin)]
    }

    fn gate_strategy() -> impl Strategy<Value = Gate> {
        prop_oneof![Just(Gate::Authenticated), Just(Gate::Teacher), Just(Gate::Admin)]
    }

    #[test]
    fn test_teacher_can_act_on_own_resource() {
        let teacher = Requester::new(5, Role::Teacher);
        assert_eq!(authorize(teacher, Gate::Teacher, Some(5)), Decision::Allow);
        assert_eq!(
            authorize(teacher, Gate::Teacher, Some(6)),
            Decision::Deny(DenyReason::Ownership)
        );
    }

    #[test]
    fn test_teacher_fails_admin_gate() {
        let teacher = Requester::new(5, Role::Teacher);
        assert_eq!(
            authorize(teacher, Gate::Admin, None),
            Decision::Deny(DenyReason::Role)
        );
    }

    #[test]
    fn test_reader_fails_teacher_gate_even_as_owner() {
        let reader = Requester::new(1, Role::Reader);
        assert_eq!(authorize(reader, Gate::Authenticated, None), Decision::Allow);
        assert_eq!(
            authorize(reader, Gate::Teacher, Some(1)),
            Decision::Deny(DenyReason::Role)
        );
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("42"), Some(42));
        assert_eq!(parse_id(" 7 "), Some(7));
        assert_eq!(parse_id("7a"), None);
        assert_eq!(parse_id(""), None);
    }

    proptest! {
        #[test]
        fn admin_always_allowed(id in any::<i64>(), gate in gate_strategy(), owner in proptest::option::of(any::<i64>())) {
            let admin = Requester::new(id, Role::Admin);
            prop_assert_eq!(authorize(admin, gate, owner), Decision::Allow);
        }

        #[test]
        fn teacher_on_foreign_resource_denied(id in any::<i64>(), owner in any::<i64>()) {
            prop_assume!(id != owner);
            let teacher = Requester::new(id, Role::Teacher);
            prop_assert!(!authorize(teacher, Gate::Teacher, Some(owner)).is_allowed());
        }

        #[test]
        fn reader_never_passes_role_gates(id in any::<i64>(), owner in proptest::option::of(any::<i64>())) {
            let reader = Requester::new(id, Role::Reader);
            prop_assert_eq!(authorize(reader, Gate::Teacher, owner), Decision::Deny(DenyReason::Role));
            prop_assert_eq!(authorize(reader, Gate::Admin, owner), Decision::Deny(DenyReason::Role));
        }

        #[test]
        fn ownership_never_matters_without_owner(id in any::<i64>(), role in role_strategy(), gate in gate_strategy()) {
            let requester = Requester::new(id, role);
            let decision = authorize(requester, gate, None);
            prop_assert_eq!(decision.is_allowed(), passes_gate(role, gate));
        }

        #[test]
        fn parse_id_roundtrips_integers(id in any::<i64>()) {
            prop_assert_eq!(parse_id(&id.to_string()), Some(id));
        }
    }
}
