//! Role and ownership policy, evaluated uniformly by every handler.
//!
//! One capability instead of inline checks copied per route: the rules that
//! decide who may touch a patient row live here, so view/update/archive
//! cannot drift apart. Default-deny.

use uuid::Uuid;

use crate::models::Role;

/// What the actor is trying to do to a patient record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatientAction {
    View,
    Update,
    Archive,
}

impl PatientAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Update => "update",
            Self::Archive => "archive",
        }
    }
}

/// Why access was granted or denied, for the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessReason {
    /// Admins bypass the ownership filter.
    AdminOverride,
    /// Actor registered this patient.
    RecordOwner,
    /// No matching rule.
    Denied,
}

/// Result of an authorization check.
#[derive(Debug, Clone, Copy)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: AccessReason,
}

/// Decide whether `actor` may perform `action` on a patient row owned by
/// `created_by`. The same rule applies to every action: admin, or record
/// owner. Archive gets no special carve-out.
pub fn patient_access(
    role: Role,
    actor_id: &Uuid,
    created_by: Option<&Uuid>,
    action: PatientAction,
) -> AccessDecision {
    if role == Role::Admin {
        return AccessDecision {
            allowed: true,
            reason: AccessReason::AdminOverride,
        };
    }
    if created_by == Some(actor_id) {
        return AccessDecision {
            allowed: true,
            reason: AccessReason::RecordOwner,
        };
    }
    tracing::debug!(
        action = action.as_str(),
        actor = %actor_id,
        "patient access denied"
    );
    AccessDecision {
        allowed: false,
        reason: AccessReason::Denied,
    }
}

/// Patient registration is a doctor/staff activity; admins administer
/// accounts but do not register patients.
pub fn can_register_patients(role: Role) -> bool {
    matches!(role, Role::Doctor | Role::Staff)
}

pub fn is_admin(role: Role) -> bool {
    role == Role::Admin
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_bypasses_ownership() {
        let actor = Uuid::new_v4();
        let owner = Uuid::new_v4();
        let decision = patient_access(Role::Admin, &actor, Some(&owner), PatientAction::View);
        assert!(decision.allowed);
        assert_eq!(decision.reason, AccessReason::AdminOverride);
    }

    #[test]
    fn owner_allowed_non_owner_denied() {
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();

        let own = patient_access(Role::Doctor, &owner, Some(&owner), PatientAction::Update);
        assert!(own.allowed);
        assert_eq!(own.reason, AccessReason::RecordOwner);

        let other = patient_access(Role::Doctor, &stranger, Some(&owner), PatientAction::Update);
        assert!(!other.allowed);
    }

    #[test]
    fn archive_follows_the_same_rule() {
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        assert!(!patient_access(Role::Staff, &stranger, Some(&owner), PatientAction::Archive).allowed);
        assert!(patient_access(Role::Staff, &owner, Some(&owner), PatientAction::Archive).allowed);
    }

    #[test]
    fn orphaned_rows_are_admin_only() {
        // created_by is NULL after the creating user was deleted
        let actor = Uuid::new_v4();
        assert!(!patient_access(Role::Doctor, &actor, None, PatientAction::View).allowed);
        assert!(patient_access(Role::Admin, &actor, None, PatientAction::View).allowed);
    }

    #[test]
    fn only_doctor_and_staff_register() {
        assert!(can_register_patients(Role::Doctor));
        assert!(can_register_patients(Role::Staff));
        assert!(!can_register_patients(Role::Admin));
    }
}
