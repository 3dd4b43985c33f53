use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::auth::repository as user_repo;
use crate::core::error::AppError;
use crate::orgs::repository as org_repo;
use crate::security::jwt::TokenPair;
use crate::security::password::{hash_password, verify_password};
use crate::shared::models::{MemberRole, Organization, OrganizationMember, User};
use crate::shared::state::AppState;

#[derive(Debug)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub name: String,
    pub organization_name: String,
}

fn validate_registration(input: &Registration) -> Result<(), AppError> {
    let email = input.email.trim();
    if email.is_empty() || email.len() > 255 || !email.contains('@') {
        return Err(AppError::validation_field("Invalid email address", "email"));
    }
    if input.password.len() < 8 {
        return Err(AppError::validation_field(
            "Password must be at least 8 characters",
            "password",
        ));
    }
    if input.name.trim().is_empty() || input.name.len() > 255 {
        return Err(AppError::validation_field(
            "Name must be between 1 and 255 characters",
            "name",
        ));
    }
    if input.organization_name.trim().is_empty() || input.organization_name.len() > 255 {
        return Err(AppError::validation_field(
            "Organization name must be between 1 and 255 characters",
            "organization_name",
        ));
    }
    Ok(())
}

/// Creates the user, their organization and the owner membership in one
/// transaction; none of the three exists without the others.
pub fn register_user(
    state: &AppState,
    input: Registration,
) -> Result<(User, Organization, TokenPair), AppError> {
    validate_registration(&input)?;
    let email = input.email.trim().to_lowercase();

    let password_hash = hash_password(&input.password)?;

    let mut conn = state.conn.get()?;
    let (user, organization) = conn.transaction::<(User, Organization), AppError, _>(|conn| {
        if user_repo::email_exists(conn, &email)? {
            return Err(AppError::conflict(format!(
                "User with email '{email}' already exists"
            )));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email,
            password_hash,
            name: input.name.trim().to_string(),
            created_at: now,
        };
        user_repo::insert(conn, &user)?;

        let organization = Organization {
            id: Uuid::new_v4(),
            name: input.organization_name.trim().to_string(),
            default_currency: Some(state.config.default_currency.clone()),
            created_at: now,
        };
        org_repo::insert_organization(conn, &organization)?;

        let membership = OrganizationMember {
            id: Uuid::new_v4(),
            organization_id: organization.id,
            user_id: user.id,
            role: MemberRole::Owner.as_str().to_string(),
            created_at: now,
        };
        org_repo::insert_member(conn, &membership)?;

        Ok((user, organization))
    })?;

    let tokens = state
        .jwt
        .generate_token_pair(user.id, Some(user.email.clone()))?;

    Ok((user, organization, tokens))
}

pub fn login_user(
    state: &AppState,
    email: &str,
    password: &str,
) -> Result<(User, Vec<(OrganizationMember, Organization)>, TokenPair), AppError> {
    let email = email.trim().to_lowercase();

    let mut conn = state.conn.get()?;
    let user = user_repo::find_by_email(&mut conn, &email)?
        .ok_or_else(|| AppError::authentication("Invalid email or password"))?;

    if !verify_password(password, &user.password_hash)? {
        return Err(AppError::authentication("Invalid email or password"));
    }

    let memberships = org_repo::user_memberships(&mut conn, user.id)?;
    let tokens = state
        .jwt
        .generate_token_pair(user.id, Some(user.email.clone()))?;

    Ok((user, memberships, tokens))
}

/// Issues a fresh token pair from a valid refresh token. The user row is
/// re-checked so tokens for deleted accounts stop working here.
pub fn refresh_tokens(state: &AppState, refresh_token: &str) -> Result<TokenPair, AppError> {
    let claims = state
        .jwt
        .validate_refresh_token(refresh_token)
        .map_err(|_| AppError::authentication("Invalid or expired token"))?;
    let user_id = claims
        .user_id()
        .map_err(|_| AppError::authentication("Invalid or expired token"))?;

    let mut conn = state.conn.get()?;
    let user = user_repo::find_by_id(&mut conn, user_id)?
        .ok_or_else(|| AppError::authentication("User not found"))?;

    Ok(state
        .jwt
        .generate_token_pair(user.id, Some(user.email))?)
}
