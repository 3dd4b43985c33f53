pub mod repository;
pub mod service;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::core::error::AppError;
use crate::orgs::OrganizationWithRole;
use crate::security::jwt::TokenPair;
use crate::shared::models::{Organization, User};
use crate::shared::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub organization_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: UserResponse,
    pub organization: Organization,
    pub tokens: TokenPair,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: UserResponse,
    pub organizations: Vec<OrganizationWithRole>,
    pub tokens: TokenPair,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let (user, organization, tokens) = service::register_user(
        &state,
        service::Registration {
            email: req.email,
            password: req.password,
            name: req.name,
            organization_name: req.organization_name,
        },
    )?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: UserResponse::from(&user),
            organization,
            tokens,
        }),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let (user, memberships, tokens) = service::login_user(&state, &req.email, &req.password)?;

    Ok(Json(LoginResponse {
        user: UserResponse::from(&user),
        organizations: memberships
            .iter()
            .map(|(member, organization)| {
                OrganizationWithRole::from_membership(member, organization)
            })
            .collect(),
        tokens,
    }))
}

pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<TokenPair>, AppError> {
    let tokens = service::refresh_tokens(&state, &req.refresh_token)?;
    Ok(Json(tokens))
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}
