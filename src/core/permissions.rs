use uuid::Uuid;

use crate::core::error::AppError;
use crate::shared::models::MemberRole;

/// Stateless role policy, evaluated per request. Rule table:
///
/// | role    | read            | write                    | stage backward | org settings |
/// |---------|-----------------|--------------------------|----------------|--------------|
/// | owner   | all             | all                      | yes            | yes + delete |
/// | admin   | all             | all                      | yes            | yes          |
/// | manager | all             | all contacts/deals/tasks | no             | no           |
/// | member  | own (filtered)  | own records only         | no             | no           |
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionPolicy;

impl PermissionPolicy {
    /// Lists are implicitly restricted to the caller's own records for the
    /// member role; every other role sees the whole organization.
    pub fn list_owner_filter(&self, role: MemberRole, user_id: Uuid) -> Option<Uuid> {
        if role == MemberRole::Member {
            Some(user_id)
        } else {
            None
        }
    }

    pub fn can_view_all_resources(&self, role: MemberRole) -> bool {
        role >= MemberRole::Manager
    }

    pub fn can_modify_resource(
        &self,
        user_id: Uuid,
        resource_owner_id: Uuid,
        role: MemberRole,
    ) -> bool {
        role >= MemberRole::Manager || user_id == resource_owner_id
    }

    /// Modify/delete gate for contacts, deals and tasks. The message never
    /// says whether role or ownership was the blocker.
    pub fn check_resource_ownership(
        &self,
        user_id: Uuid,
        resource_owner_id: Uuid,
        role: MemberRole,
        resource: &str,
    ) -> Result<(), AppError> {
        if self.can_modify_resource(user_id, resource_owner_id, role) {
            Ok(())
        } else {
            Err(AppError::authorization(format!(
                "You don't have permission to modify this {}",
                resource.to_lowercase()
            )))
        }
    }

    /// Backward stage moves are reserved for admins and owners, with no
    /// exception for a member who owns the deal.
    pub fn can_move_stage_backward(&self, role: MemberRole) -> bool {
        role >= MemberRole::Admin
    }

    pub fn can_manage_members(&self, role: MemberRole) -> bool {
        role >= MemberRole::Admin
    }

    pub fn can_update_organization(&self, role: MemberRole) -> bool {
        role >= MemberRole::Admin
    }

    pub fn can_delete_organization(&self, role: MemberRole) -> bool {
        role == MemberRole::Owner
    }

    pub fn check_minimum_role(
        &self,
        role: MemberRole,
        required: MemberRole,
    ) -> Result<(), AppError> {
        if role >= required {
            Ok(())
        } else {
            Err(AppError::authorization(format!(
                "Requires {required} role or higher"
            )))
        }
    }

    /// Role-change rules: only owners change roles, and the owner role is
    /// never assigned or removed this way.
    pub fn check_member_role_change(
        &self,
        actor_role: MemberRole,
        target_role: MemberRole,
        new_role: MemberRole,
    ) -> Result<(), AppError> {
        if actor_role != MemberRole::Owner {
            return Err(AppError::authorization(
                "Only organization owners can change member roles",
            ));
        }
        if target_role == MemberRole::Owner {
            return Err(AppError::authorization(
                "Cannot change the owner role; transfer ownership instead",
            ));
        }
        if new_role == MemberRole::Owner {
            return Err(AppError::authorization(
                "Cannot promote to owner; transfer ownership instead",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY: PermissionPolicy = PermissionPolicy;

    #[test]
    fn member_lists_are_owner_filtered() {
        let user = Uuid::new_v4();
        assert_eq!(POLICY.list_owner_filter(MemberRole::Member, user), Some(user));
        assert_eq!(POLICY.list_owner_filter(MemberRole::Manager, user), None);
        assert_eq!(POLICY.list_owner_filter(MemberRole::Admin, user), None);
        assert_eq!(POLICY.list_owner_filter(MemberRole::Owner, user), None);
    }

    #[test]
    fn member_writes_only_own_records() {
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();
        assert!(POLICY.can_modify_resource(user, user, MemberRole::Member));
        assert!(!POLICY.can_modify_resource(user, other, MemberRole::Member));
    }

    #[test]
    fn manager_writes_any_record() {
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();
        assert!(POLICY.can_modify_resource(user, other, MemberRole::Manager));
        assert!(POLICY.can_modify_resource(user, other, MemberRole::Admin));
        assert!(POLICY.can_modify_resource(user, other, MemberRole::Owner));
    }

    #[test]
    fn backward_stage_is_admin_or_owner_only() {
        assert!(!POLICY.can_move_stage_backward(MemberRole::Member));
        assert!(!POLICY.can_move_stage_backward(MemberRole::Manager));
        assert!(POLICY.can_move_stage_backward(MemberRole::Admin));
        assert!(POLICY.can_move_stage_backward(MemberRole::Owner));
    }

    #[test]
    fn org_deletion_is_owner_only() {
        assert!(!POLICY.can_delete_organization(MemberRole::Admin));
        assert!(POLICY.can_delete_organization(MemberRole::Owner));
    }

    #[test]
    fn ownership_failure_is_an_authorization_error() {
        let err = POLICY
            .check_resource_ownership(Uuid::new_v4(), Uuid::new_v4(), MemberRole::Member, "Deal")
            .unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));
    }

    #[test]
    fn role_changes_are_owner_gated() {
        assert!(POLICY
            .check_member_role_change(MemberRole::Admin, MemberRole::Member, MemberRole::Manager)
            .is_err());
        assert!(POLICY
            .check_member_role_change(MemberRole::Owner, MemberRole::Owner, MemberRole::Admin)
            .is_err());
        assert!(POLICY
            .check_member_role_change(MemberRole::Owner, MemberRole::Member, MemberRole::Owner)
            .is_err());
        assert!(POLICY
            .check_member_role_change(MemberRole::Owner, MemberRole::Member, MemberRole::Manager)
            .is_ok());
    }
}
