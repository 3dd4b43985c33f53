use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use diesel::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::error::AppError;
use crate::security::jwt::extract_bearer_token;
use crate::shared::models::MemberRole;
use crate::shared::schema::{organization_members, users};
use crate::shared::state::AppState;

pub const ORGANIZATION_HEADER: &str = "x-organization-id";

/// Authenticated caller, resolved from the bearer access token.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

/// Authenticated caller plus the organization scope of the request,
/// resolved from the `X-Organization-Id` header. Membership is re-checked
/// on every request; a missing membership fails closed.
#[derive(Debug, Clone)]
pub struct OrgContext {
    pub user: CurrentUser,
    pub organization_id: Uuid,
    pub role: MemberRole,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::authentication("Authentication required"))?;

        let token = extract_bearer_token(header)
            .ok_or_else(|| AppError::authentication("Authentication required"))?;

        let claims = state
            .jwt
            .validate_access_token(token)
            .map_err(|_| AppError::authentication("Invalid or expired token"))?;
        let user_id = claims
            .user_id()
            .map_err(|_| AppError::authentication("Invalid or expired token"))?;

        let mut conn = state.conn.get()?;
        let user = users::table
            .filter(users::id.eq(user_id))
            .select((users::id, users::email, users::name))
            .first::<(Uuid, String, String)>(&mut conn)
            .optional()?
            .ok_or_else(|| AppError::authentication("Invalid or expired token"))?;

        Ok(CurrentUser {
            id: user.0,
            email: user.1,
            name: user.2,
        })
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for OrgContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;

        let raw = parts
            .headers
            .get(ORGANIZATION_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::authentication("X-Organization-Id header is required"))?;
        let organization_id = Uuid::parse_str(raw)
            .map_err(|_| AppError::authentication("Invalid X-Organization-Id format"))?;

        let mut conn = state.conn.get()?;
        let role: Option<String> = organization_members::table
            .filter(organization_members::organization_id.eq(organization_id))
            .filter(organization_members::user_id.eq(user.id))
            .select(organization_members::role)
            .first(&mut conn)
            .optional()?;

        let role = role
            .ok_or_else(|| {
                AppError::authorization(format!(
                    "Access denied to organization '{organization_id}'"
                ))
            })?
            .parse::<MemberRole>()
            .map_err(|_| {
                AppError::authorization(format!(
                    "Access denied to organization '{organization_id}'"
                ))
            })?;

        Ok(OrgContext {
            user,
            organization_id,
            role,
        })
    }
}
