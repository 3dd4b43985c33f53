use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::auth::repository as user_repo;
use crate::core::context::OrgContext;
use crate::core::error::AppError;
use crate::orgs::repository as org_repo;
use crate::shared::models::{MemberRole, Organization, OrganizationMember};
use crate::shared::state::AppState;

#[derive(Debug, Default)]
pub struct OrganizationChanges {
    pub name: Option<String>,
    pub default_currency: Option<String>,
}

/// The path organization must be the one the request is scoped to; a
/// foreign id looks exactly like a missing organization.
fn check_scope(ctx: &OrgContext, organization_id: Uuid) -> Result<(), AppError> {
    if ctx.organization_id != organization_id {
        return Err(AppError::not_found("Organization", organization_id));
    }
    Ok(())
}

pub fn get_organization(
    state: &AppState,
    ctx: &OrgContext,
    organization_id: Uuid,
) -> Result<Organization, AppError> {
    check_scope(ctx, organization_id)?;
    let mut conn = state.conn.get()?;
    org_repo::find_organization(&mut conn, organization_id)?
        .ok_or_else(|| AppError::not_found("Organization", organization_id))
}

pub fn update_organization(
    state: &AppState,
    ctx: &OrgContext,
    organization_id: Uuid,
    changes: OrganizationChanges,
) -> Result<Organization, AppError> {
    check_scope(ctx, organization_id)?;
    if !state.policy.can_update_organization(ctx.role) {
        return Err(AppError::authorization(
            "Only admins and owners can update organization settings",
        ));
    }
    if let Some(name) = &changes.name {
        if name.trim().is_empty() || name.len() > 255 {
            return Err(AppError::validation_field(
                "Name must be between 1 and 255 characters",
                "name",
            ));
        }
    }
    let currency = match changes.default_currency {
        Some(code) => {
            let code = code.to_uppercase();
            if !state.config.is_supported_currency(&code) {
                return Err(AppError::validation_field(
                    format!("Currency '{code}' is not supported"),
                    "default_currency",
                ));
            }
            Some(code)
        }
        None => None,
    };

    let mut conn = state.conn.get()?;
    conn.transaction::<Organization, AppError, _>(|conn| {
        let organization = org_repo::find_organization(conn, organization_id)?
            .ok_or_else(|| AppError::not_found("Organization", organization_id))?;

        let final_name = changes.name.unwrap_or_else(|| organization.name.clone());
        let final_currency = currency.or_else(|| organization.default_currency.clone());

        let updated = org_repo::update_organization(
            conn,
            organization_id,
            &final_name,
            final_currency.as_deref(),
        )?;
        Ok(updated)
    })
}

pub fn delete_organization(
    state: &AppState,
    ctx: &OrgContext,
    organization_id: Uuid,
) -> Result<(), AppError> {
    check_scope(ctx, organization_id)?;
    if !state.policy.can_delete_organization(ctx.role) {
        return Err(AppError::authorization(
            "Only the organization owner can delete the organization",
        ));
    }
    let mut conn = state.conn.get()?;
    org_repo::delete_organization(&mut conn, organization_id)?;
    Ok(())
}

pub fn list_members(
    state: &AppState,
    ctx: &OrgContext,
    organization_id: Uuid,
) -> Result<Vec<(OrganizationMember, (Uuid, String, String))>, AppError> {
    check_scope(ctx, organization_id)?;
    let mut conn = state.conn.get()?;
    Ok(org_repo::members_with_users(&mut conn, organization_id)?)
}

pub fn add_member(
    state: &AppState,
    ctx: &OrgContext,
    organization_id: Uuid,
    user_email: &str,
    role: MemberRole,
) -> Result<(OrganizationMember, (Uuid, String, String)), AppError> {
    check_scope(ctx, organization_id)?;
    if !state.policy.can_manage_members(ctx.role) {
        return Err(AppError::authorization(
            "Only admins and owners can manage members",
        ));
    }
    if role == MemberRole::Owner && ctx.role != MemberRole::Owner {
        return Err(AppError::authorization(
            "Only the organization owner can grant the owner role",
        ));
    }

    let mut conn = state.conn.get()?;
    conn.transaction::<(OrganizationMember, (Uuid, String, String)), AppError, _>(|conn| {
        let user = user_repo::find_by_email(conn, user_email)?
            .ok_or_else(|| AppError::not_found("User", user_email))?;

        if org_repo::find_membership(conn, organization_id, user.id)?.is_some() {
            return Err(AppError::conflict(format!(
                "User '{user_email}' is already a member of this organization"
            )));
        }

        let member = OrganizationMember {
            id: Uuid::new_v4(),
            organization_id,
            user_id: user.id,
            role: role.as_str().to_string(),
            created_at: Utc::now(),
        };
        org_repo::insert_member(conn, &member)?;

        Ok((member, (user.id, user.email, user.name)))
    })
}

pub fn remove_member(
    state: &AppState,
    ctx: &OrgContext,
    organization_id: Uuid,
    user_id: Uuid,
) -> Result<(), AppError> {
    check_scope(ctx, organization_id)?;
    if !state.policy.can_manage_members(ctx.role) {
        return Err(AppError::authorization(
            "Only admins and owners can manage members",
        ));
    }

    let mut conn = state.conn.get()?;
    conn.transaction::<(), AppError, _>(|conn| {
        let membership = org_repo::find_membership(conn, organization_id, user_id)?
            .ok_or_else(|| AppError::not_found("Member", user_id))?;

        if membership.member_role() == MemberRole::Owner {
            if ctx.role != MemberRole::Owner {
                return Err(AppError::authorization(
                    "Only the organization owner can remove an owner",
                ));
            }
            let owners = org_repo::count_members_with_role(
                conn,
                organization_id,
                MemberRole::Owner.as_str(),
            )?;
            if owners <= 1 {
                return Err(AppError::conflict(
                    "Cannot remove the last owner of the organization",
                ));
            }
        }

        org_repo::delete_member(conn, membership.id)?;
        Ok(())
    })
}

pub fn change_member_role(
    state: &AppState,
    ctx: &OrgContext,
    organization_id: Uuid,
    user_id: Uuid,
    new_role: MemberRole,
) -> Result<(OrganizationMember, (Uuid, String, String)), AppError> {
    check_scope(ctx, organization_id)?;

    let mut conn = state.conn.get()?;
    conn.transaction::<(OrganizationMember, (Uuid, String, String)), AppError, _>(|conn| {
        let membership = org_repo::find_membership(conn, organization_id, user_id)?
            .ok_or_else(|| AppError::not_found("Member", user_id))?;

        state
            .policy
            .check_member_role_change(ctx.role, membership.member_role(), new_role)?;

        let updated = org_repo::update_member_role(conn, membership.id, new_role.as_str())?;

        let user = user_repo::find_by_id(conn, user_id)?
            .ok_or_else(|| AppError::not_found("User", user_id))?;

        Ok((updated, (user.id, user.email, user.name)))
    })
}
