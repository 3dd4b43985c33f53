pub mod repository;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::context::OrgContext;
use crate::core::error::AppError;
use crate::shared::utils::page_params;
use crate::deals::repository as deal_repo;
use crate::shared::models::{Activity, ActivityKind, ActivityPayload, Paginated};
use crate::shared::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TimelineQuery {
    #[serde(alias = "type")]
    pub kind: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub text: String,
}

pub async fn get_deal_timeline(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Path(deal_id): Path<Uuid>,
    Query(query): Query<TimelineQuery>,
) -> Result<Json<Paginated<Activity>>, AppError> {
    let kind = match &query.kind {
        None => None,
        Some(raw) => {
            let kind: ActivityKind = raw.parse().map_err(|_| {
                AppError::validation_field(format!("Invalid activity kind '{raw}'"), "kind")
            })?;
            Some(kind.as_str())
        }
    };
    let (limit, offset) = page_params(query.limit, query.offset);

    let mut conn = state.conn.get()?;
    let deal = deal_repo::find_for_org(&mut conn, ctx.organization_id, deal_id)?
        .ok_or_else(|| AppError::not_found("Deal", deal_id))?;

    let items = repository::timeline(&mut conn, deal.id, kind, limit, offset)?;
    let total = repository::count(&mut conn, deal.id, kind)?;

    Ok(Json(Paginated::new(items, total, limit, offset)))
}

/// Manual timeline writes are restricted to comments; every other kind is
/// emitted by the services as a side effect of mutations.
pub async fn add_comment(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Path(deal_id): Path<Uuid>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Activity>), AppError> {
    if req.text.trim().is_empty() {
        return Err(AppError::validation_field("Comment text is required", "text"));
    }

    let mut conn = state.conn.get()?;
    let activity = conn.transaction::<Activity, AppError, _>(|conn| {
        let deal = deal_repo::find_for_org(conn, ctx.organization_id, deal_id)?
            .ok_or_else(|| AppError::not_found("Deal", deal_id))?;

        let activity = repository::append(
            conn,
            deal.id,
            Some(ctx.user.id),
            &ActivityPayload::Comment { text: req.text },
        )?;
        Ok(activity)
    })?;

    Ok((StatusCode::CREATED, Json(activity)))
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new().route(
        "/deals/:id/activities",
        get(get_deal_timeline).post(add_comment),
    )
}
