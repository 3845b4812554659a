//! Role-based access gate.
//!
//! The single enforcement point in front of every protected operation:
//! nothing reads or writes clinical data until the gate returns
//! `Allow`. The caller's role is always re-resolved from the profile
//! store at the moment of authorization — a role carried in client
//! state is never trusted.

use rusqlite::Connection;

use crate::db::repository::get_profile;
use crate::identity::IdentityProvider;
use crate::models::enums::Role;

/// The resolved caller, threaded explicitly through every protected
/// operation instead of being read from ambient session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    pub user_id: String,
    pub role: Role,
}

/// Why the gate denied access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    /// No authenticated identity.
    Unauthenticated,
    /// The profile store failed — distinct from "no such profile".
    ProfileLookupFailed,
    /// Profile missing, or its role is outside the allowed set.
    RoleNotPermitted,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::ProfileLookupFailed => "profile_lookup_failed",
            Self::RoleNotPermitted => "role_not_permitted",
        }
    }
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of an authorization check. Until the check resolves, callers
/// show a neutral "checking access" state — never protected content and
/// never a pre-rendered denial. Every `Deny` sends the caller back to
/// the unauthenticated entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow(CallerContext),
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow(_))
    }
}

/// Decide whether the current caller may proceed with an operation
/// restricted to `allowed` roles. Pure decision: no side effects and no
/// protected reads.
pub fn authorize(
    conn: &Connection,
    identity: &dyn IdentityProvider,
    allowed: &[Role],
) -> Decision {
    let Some(user) = identity.current_user() else {
        return Decision::Deny(DenyReason::Unauthenticated);
    };

    let profile = match get_profile(conn, &user.user_id) {
        Ok(profile) => profile,
        Err(e) => {
            // A store failure says nothing about the caller's role;
            // deny without concluding the profile is missing.
            tracing::warn!(user_id = %user.user_id, error = %e, "profile lookup failed");
            return Decision::Deny(DenyReason::ProfileLookupFailed);
        }
    };

    match profile {
        Some(p) if allowed.contains(&p.role) => Decision::Allow(CallerContext {
            user_id: user.user_id,
            role: p.role,
        }),
        _ => Decision::Deny(DenyReason::RoleNotPermitted),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::testutil::{seed_user, test_db};
    use crate::identity::{AuthError, AuthenticatedUser};

    struct StubIdentity(Option<AuthenticatedUser>);

    impl StubIdentity {
        fn signed_in(user_id: &str) -> Self {
            Self(Some(AuthenticatedUser {
                user_id: user_id.to_string(),
                email: "someone@clinic.test".into(),
            }))
        }

        fn anonymous() -> Self {
            Self(None)
        }
    }

    impl IdentityProvider for StubIdentity {
        fn current_user(&self) -> Option<AuthenticatedUser> {
            self.0.clone()
        }

        fn sign_in(&mut self, _: &str, _: &str) -> Result<AuthenticatedUser, AuthError> {
            Err(AuthError::InvalidCredentials)
        }

        fn sign_out(&mut self) {
            self.0 = None;
        }
    }

    #[test]
    fn unauthenticated_caller_is_denied() {
        let conn = test_db();
        let decision = authorize(&conn, &StubIdentity::anonymous(), &[Role::Doctor]);
        assert_eq!(decision, Decision::Deny(DenyReason::Unauthenticated));
    }

    #[test]
    fn missing_profile_is_role_not_permitted() {
        let conn = test_db();
        let decision = authorize(&conn, &StubIdentity::signed_in("ghost"), &[Role::Doctor]);
        assert_eq!(decision, Decision::Deny(DenyReason::RoleNotPermitted));
    }

    #[test]
    fn role_outside_allowed_set_is_denied() {
        let conn = test_db();
        let nurse = seed_user(&conn, Role::Nurse, "Ngaire");

        for allowed in [&[Role::Doctor][..], &[Role::Pharmacist][..], &[Role::Patient][..]] {
            let decision = authorize(&conn, &StubIdentity::signed_in(&nurse), allowed);
            assert_eq!(decision, Decision::Deny(DenyReason::RoleNotPermitted));
        }
    }

    #[test]
    fn allowed_role_yields_caller_context() {
        let conn = test_db();
        let doctor = seed_user(&conn, Role::Doctor, "Dr. Grey");

        let decision = authorize(&conn, &StubIdentity::signed_in(&doctor), &[Role::Doctor]);
        match decision {
            Decision::Allow(ctx) => {
                assert_eq!(ctx.user_id, doctor);
                assert_eq!(ctx.role, Role::Doctor);
            }
            other => panic!("expected Allow, got {other:?}"),
        }
    }

    #[test]
    fn store_failure_is_distinct_from_missing_profile() {
        // No schema: the profile lookup itself errors.
        let conn = Connection::open_in_memory().unwrap();
        let decision = authorize(&conn, &StubIdentity::signed_in("user-1"), &[Role::Doctor]);
        assert_eq!(decision, Decision::Deny(DenyReason::ProfileLookupFailed));
    }

    #[test]
    fn multi_role_gates_admit_each_member() {
        let conn = test_db();
        let doctor = seed_user(&conn, Role::Doctor, "Dr. Grey");
        let pharmacist = seed_user(&conn, Role::Pharmacist, "Phil");
        let allowed = [Role::Doctor, Role::Pharmacist];

        assert!(authorize(&conn, &StubIdentity::signed_in(&doctor), &allowed).is_allowed());
        assert!(authorize(&conn, &StubIdentity::signed_in(&pharmacist), &allowed).is_allowed());
    }

    #[test]
    fn deny_reasons_have_stable_names() {
        assert_eq!(DenyReason::Unauthenticated.as_str(), "unauthenticated");
        assert_eq!(DenyReason::ProfileLookupFailed.as_str(), "profile_lookup_failed");
        assert_eq!(DenyReason::RoleNotPermitted.as_str(), "role_not_permitted");
    }
}
