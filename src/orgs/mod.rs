pub mod repository;
pub mod service;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::core::context::{CurrentUser, OrgContext};
use crate::core::error::AppError;
use crate::shared::models::{MemberRole, Organization, OrganizationMember};
use crate::shared::state::AppState;

#[derive(Debug, Serialize)]
pub struct OrganizationWithRole {
    pub id: Uuid,
    pub name: String,
    pub default_currency: Option<String>,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
}

impl OrganizationWithRole {
    pub fn from_membership(member: &OrganizationMember, organization: &Organization) -> Self {
        Self {
            id: organization.id,
            name: organization.name.clone(),
            default_currency: organization.default_currency.clone(),
            role: member.member_role(),
            joined_at: member.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserWithRole {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
}

fn user_with_role(member: &OrganizationMember, user: &(Uuid, String, String)) -> UserWithRole {
    UserWithRole {
        id: user.0,
        email: user.1.clone(),
        name: user.2.clone(),
        role: member.member_role(),
        joined_at: member.created_at,
    }
}

#[derive(Debug, Serialize)]
pub struct MemberListResponse {
    pub members: Vec<UserWithRole>,
    pub total: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrganizationRequest {
    pub name: Option<String>,
    pub default_currency: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub user_email: String,
    pub role: MemberRole,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMemberRoleRequest {
    pub role: MemberRole,
}

pub async fn get_my_organizations(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<Vec<OrganizationWithRole>>, AppError> {
    let mut conn = state.conn.get()?;
    let memberships = repository::user_memberships(&mut conn, user.id)?;
    Ok(Json(
        memberships
            .iter()
            .map(|(member, organization)| {
                OrganizationWithRole::from_membership(member, organization)
            })
            .collect(),
    ))
}

pub async fn get_organization(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Path(org_id): Path<Uuid>,
) -> Result<Json<Organization>, AppError> {
    let organization = service::get_organization(&state, &ctx, org_id)?;
    Ok(Json(organization))
}

pub async fn update_organization(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Path(org_id): Path<Uuid>,
    Json(req): Json<UpdateOrganizationRequest>,
) -> Result<Json<Organization>, AppError> {
    let organization = service::update_organization(
        &state,
        &ctx,
        org_id,
        service::OrganizationChanges {
            name: req.name,
            default_currency: req.default_currency,
        },
    )?;
    Ok(Json(organization))
}

pub async fn delete_organization(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Path(org_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    service::delete_organization(&state, &ctx, org_id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_members(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Path(org_id): Path<Uuid>,
) -> Result<Json<MemberListResponse>, AppError> {
    let members = service::list_members(&state, &ctx, org_id)?;
    let total = members.len() as i64;
    Ok(Json(MemberListResponse {
        members: members
            .iter()
            .map(|(member, user)| user_with_role(member, user))
            .collect(),
        total,
    }))
}

pub async fn add_member(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Path(org_id): Path<Uuid>,
    Json(req): Json<AddMemberRequest>,
) -> Result<(StatusCode, Json<UserWithRole>), AppError> {
    let (member, user) = service::add_member(&state, &ctx, org_id, &req.user_email, req.role)?;
    Ok((StatusCode::CREATED, Json(user_with_role(&member, &user))))
}

pub async fn remove_member(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Path((org_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    service::remove_member(&state, &ctx, org_id, user_id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_member_role(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Path((org_id, user_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateMemberRoleRequest>,
) -> Result<Json<UserWithRole>, AppError> {
    let (member, user) = service::change_member_role(&state, &ctx, org_id, user_id, req.role)?;
    Ok(Json(user_with_role(&member, &user)))
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route("/organizations/me", get(get_my_organizations))
        .route(
            "/organizations/:org_id",
            get(get_organization)
                .patch(update_organization)
                .delete(delete_organization),
        )
        .route(
            "/organizations/:org_id/members",
            get(list_members).post(add_member),
        )
        .route(
            "/organizations/:org_id/members/:user_id",
            axum::routing::delete(remove_member),
        )
        .route(
            "/organizations/:org_id/members/:user_id/role",
            axum::routing::patch(update_member_role),
        )
}
