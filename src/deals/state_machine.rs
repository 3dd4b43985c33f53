use crate::core::error::AppError;
use crate::core::permissions::PermissionPolicy;
use crate::shared::models::{DealStage, DealStatus, MemberRole};

/// Transition rules for deal status and stage. Status moves monotonically
/// toward a terminal state; stage moves freely forward and only
/// privileged roles may move it back.
pub struct DealStateMachine;

impl DealStateMachine {
    pub fn allowed_status_targets(from: DealStatus) -> &'static [DealStatus] {
        match from {
            DealStatus::New => &[DealStatus::InProgress, DealStatus::Won, DealStatus::Lost],
            DealStatus::InProgress => &[DealStatus::Won, DealStatus::Lost],
            DealStatus::Won | DealStatus::Lost => &[],
        }
    }

    pub fn validate_status_transition(
        from: DealStatus,
        to: DealStatus,
    ) -> Result<(), AppError> {
        if from == to {
            return Ok(());
        }
        if from.is_terminal() {
            return Err(AppError::validation(format!(
                "Cannot change status from terminal state '{from}'"
            )));
        }
        if Self::allowed_status_targets(from).contains(&to) {
            Ok(())
        } else {
            Err(AppError::validation(format!(
                "Invalid status transition from '{from}' to '{to}'"
            )))
        }
    }

    pub fn is_backward(from: DealStage, to: DealStage) -> bool {
        to.order() < from.order()
    }

    /// Stage forced by a status change in the same update, if any.
    pub fn forced_stage(status: DealStatus) -> Option<DealStage> {
        status.is_terminal().then_some(DealStage::Closed)
    }

    /// Forward moves (including skips) are open to every role. Backward
    /// moves out of an open stage need admin/owner; `closed` cannot be
    /// reopened by anyone.
    pub fn validate_stage_transition(
        from: DealStage,
        to: DealStage,
        role: MemberRole,
        policy: &PermissionPolicy,
    ) -> Result<(), AppError> {
        if from == to {
            return Ok(());
        }
        if Self::is_backward(from, to) {
            if from == DealStage::Closed {
                return Err(AppError::validation(format!(
                    "Invalid stage transition from '{from}' to '{to}'"
                )));
            }
            if !policy.can_move_stage_backward(role) {
                return Err(AppError::authorization(
                    "Only admins and owners can move deal stage backward",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY: PermissionPolicy = PermissionPolicy;

    #[test]
    fn new_deal_can_progress_or_close() {
        for to in [DealStatus::InProgress, DealStatus::Won, DealStatus::Lost] {
            assert!(DealStateMachine::validate_status_transition(DealStatus::New, to).is_ok());
        }
        assert!(
            DealStateMachine::validate_status_transition(DealStatus::InProgress, DealStatus::Won)
                .is_ok()
        );
        assert!(
            DealStateMachine::validate_status_transition(DealStatus::InProgress, DealStatus::Lost)
                .is_ok()
        );
    }

    #[test]
    fn terminal_statuses_are_final() {
        for from in [DealStatus::Won, DealStatus::Lost] {
            for to in [DealStatus::New, DealStatus::InProgress, DealStatus::Won] {
                if from == to {
                    continue;
                }
                let err =
                    DealStateMachine::validate_status_transition(from, to).unwrap_err();
                assert!(matches!(err, AppError::Validation { .. }));
            }
        }
    }

    #[test]
    fn status_cannot_move_back_to_new() {
        let err = DealStateMachine::validate_status_transition(
            DealStatus::InProgress,
            DealStatus::New,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[test]
    fn same_status_is_a_no_op() {
        assert!(DealStateMachine::validate_status_transition(
            DealStatus::Won,
            DealStatus::Won
        )
        .is_ok());
    }

    #[test]
    fn forward_stage_moves_allow_skips_for_everyone() {
        assert!(DealStateMachine::validate_stage_transition(
            DealStage::Qualification,
            DealStage::Negotiation,
            MemberRole::Member,
            &POLICY,
        )
        .is_ok());
        assert!(DealStateMachine::validate_stage_transition(
            DealStage::Proposal,
            DealStage::Closed,
            MemberRole::Member,
            &POLICY,
        )
        .is_ok());
    }

    #[test]
    fn backward_stage_requires_admin_or_owner() {
        for role in [MemberRole::Member, MemberRole::Manager] {
            let err = DealStateMachine::validate_stage_transition(
                DealStage::Negotiation,
                DealStage::Proposal,
                role,
                &POLICY,
            )
            .unwrap_err();
            assert!(matches!(err, AppError::Authorization(_)));
        }
        for role in [MemberRole::Admin, MemberRole::Owner] {
            assert!(DealStateMachine::validate_stage_transition(
                DealStage::Negotiation,
                DealStage::Proposal,
                role,
                &POLICY,
            )
            .is_ok());
        }
    }

    // Owning the deal grants a member no stage-rollback exception: the
    // check is role-only by construction, so ownership never enters it.
    #[test]
    fn backward_stage_denied_for_member_regardless_of_ownership() {
        let err = DealStateMachine::validate_stage_transition(
            DealStage::Proposal,
            DealStage::Qualification,
            MemberRole::Member,
            &POLICY,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));
    }

    #[test]
    fn closed_stage_cannot_be_reopened_even_by_owner() {
        let err = DealStateMachine::validate_stage_transition(
            DealStage::Closed,
            DealStage::Negotiation,
            MemberRole::Owner,
            &POLICY,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[test]
    fn terminal_status_forces_closed_stage() {
        assert_eq!(
            DealStateMachine::forced_stage(DealStatus::Won),
            Some(DealStage::Closed)
        );
        assert_eq!(
            DealStateMachine::forced_stage(DealStatus::Lost),
            Some(DealStage::Closed)
        );
        assert_eq!(DealStateMachine::forced_stage(DealStatus::InProgress), None);
        assert_eq!(DealStateMachine::forced_stage(DealStatus::New), None);
    }
}
