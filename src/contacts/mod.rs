pub mod repository;
pub mod service;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::contacts::repository::ContactFilter;
use crate::core::context::OrgContext;
use crate::core::error::AppError;
use crate::shared::utils::page_params;
use crate::shared::models::{Contact, Paginated};
use crate::shared::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateContactRequest {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateContactRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ContactListQuery {
    pub search: Option<String>,
    pub owner_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn list_contacts(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Query(query): Query<ContactListQuery>,
) -> Result<Json<Paginated<Contact>>, AppError> {
    let owner_id = state
        .policy
        .list_owner_filter(ctx.role, ctx.user.id)
        .or(query.owner_id);
    let filter = ContactFilter {
        search: query.search,
        owner_id,
    };
    let (limit, offset) = page_params(query.limit, query.offset);

    let mut conn = state.conn.get()?;
    let items = repository::search(&mut conn, ctx.organization_id, &filter, limit, offset)?;
    let total = repository::count(&mut conn, ctx.organization_id, &filter)?;

    Ok(Json(Paginated::new(items, total, limit, offset)))
}

pub async fn create_contact(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Json(req): Json<CreateContactRequest>,
) -> Result<(StatusCode, Json<Contact>), AppError> {
    let contact = service::create_contact(
        &state,
        &ctx,
        service::NewContact {
            name: req.name,
            email: req.email,
            phone: req.phone,
        },
    )?;
    Ok((StatusCode::CREATED, Json(contact)))
}

pub async fn get_contact(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Path(contact_id): Path<Uuid>,
) -> Result<Json<Contact>, AppError> {
    let mut conn = state.conn.get()?;
    let contact = repository::find_for_org(&mut conn, ctx.organization_id, contact_id)?
        .ok_or_else(|| AppError::not_found("Contact", contact_id))?;
    Ok(Json(contact))
}

pub async fn update_contact(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Path(contact_id): Path<Uuid>,
    Json(req): Json<UpdateContactRequest>,
) -> Result<Json<Contact>, AppError> {
    let contact = service::update_contact(
        &state,
        &ctx,
        contact_id,
        service::ContactChanges {
            name: req.name,
            email: req.email,
            phone: req.phone,
        },
    )?;
    Ok(Json(contact))
}

pub async fn delete_contact(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Path(contact_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    service::delete_contact(&state, &ctx, contact_id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route("/contacts", get(list_contacts).post(create_contact))
        .route(
            "/contacts/:id",
            get(get_contact).patch(update_contact).delete(delete_contact),
        )
}
