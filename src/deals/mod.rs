pub mod repository;
pub mod service;
pub mod state_machine;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use bigdecimal::BigDecimal;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::context::OrgContext;
use crate::core::error::AppError;
use crate::deals::repository::{DealFilter, DealSort};
use crate::shared::models::{Deal, DealStage, DealStatus, Paginated};
use crate::shared::state::AppState;
use crate::shared::utils::page_params;

#[derive(Debug, Deserialize)]
pub struct CreateDealRequest {
    pub contact_id: Uuid,
    pub title: String,
    pub amount: Option<BigDecimal>,
    pub currency: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDealRequest {
    pub title: Option<String>,
    pub amount: Option<BigDecimal>,
    pub currency: Option<String>,
    pub status: Option<DealStatus>,
    pub stage: Option<DealStage>,
}

#[derive(Debug, Deserialize)]
pub struct DealListQuery {
    pub search: Option<String>,
    /// Comma-separated status set, e.g. `status=new,in_progress`.
    pub status: Option<String>,
    pub stage: Option<String>,
    pub owner_id: Option<Uuid>,
    pub contact_id: Option<Uuid>,
    pub amount_min: Option<String>,
    pub amount_max: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

fn parse_amount(raw: &Option<String>, field: &str) -> Result<Option<BigDecimal>, AppError> {
    match raw {
        None => Ok(None),
        Some(value) => BigDecimal::from_str(value)
            .map(Some)
            .map_err(|_| AppError::validation_field(format!("Invalid amount '{value}'"), field)),
    }
}

fn build_filter(
    ctx: &OrgContext,
    state: &AppState,
    query: &DealListQuery,
) -> Result<DealFilter, AppError> {
    let mut statuses = Vec::new();
    if let Some(raw) = &query.status {
        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let status: DealStatus = part
                .parse()
                .map_err(|_| AppError::validation_field(format!("Invalid status '{part}'"), "status"))?;
            statuses.push(status.as_str().to_string());
        }
    }
    let stage = match &query.stage {
        None => None,
        Some(raw) => {
            let stage: DealStage = raw
                .parse()
                .map_err(|_| AppError::validation_field(format!("Invalid stage '{raw}'"), "stage"))?;
            Some(stage.as_str().to_string())
        }
    };

    // Members only ever see their own deals, whatever owner filter they send.
    let owner_id = state
        .policy
        .list_owner_filter(ctx.role, ctx.user.id)
        .or(query.owner_id);

    Ok(DealFilter {
        search: query.search.clone(),
        statuses,
        stage,
        owner_id,
        contact_id: query.contact_id,
        amount_min: parse_amount(&query.amount_min, "amount_min")?,
        amount_max: parse_amount(&query.amount_max, "amount_max")?,
    })
}

pub async fn list_deals(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Query(query): Query<DealListQuery>,
) -> Result<Json<Paginated<Deal>>, AppError> {
    let filter = build_filter(&ctx, &state, &query)?;
    let (limit, offset) = page_params(query.limit, query.offset);
    let sort = DealSort::parse(query.sort_by.as_deref());
    let descending = !matches!(query.order.as_deref(), Some("asc"));

    let mut conn = state.conn.get()?;
    let items = repository::search(
        &mut conn,
        ctx.organization_id,
        &filter,
        sort,
        descending,
        limit,
        offset,
    )?;
    let total = repository::count(&mut conn, ctx.organization_id, &filter)?;

    Ok(Json(Paginated::new(items, total, limit, offset)))
}

pub async fn create_deal(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Json(req): Json<CreateDealRequest>,
) -> Result<(StatusCode, Json<Deal>), AppError> {
    let deal = service::create_deal(
        &state,
        &ctx,
        service::NewDeal {
            contact_id: req.contact_id,
            title: req.title,
            amount: req.amount,
            currency: req.currency,
        },
    )?;
    Ok((StatusCode::CREATED, Json(deal)))
}

pub async fn get_deal(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Path(deal_id): Path<Uuid>,
) -> Result<Json<Deal>, AppError> {
    let mut conn = state.conn.get()?;
    let deal = repository::find_for_org(&mut conn, ctx.organization_id, deal_id)?
        .ok_or_else(|| AppError::not_found("Deal", deal_id))?;
    Ok(Json(deal))
}

pub async fn update_deal(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Path(deal_id): Path<Uuid>,
    Json(req): Json<UpdateDealRequest>,
) -> Result<Json<Deal>, AppError> {
    let deal = service::update_deal(
        &state,
        &ctx,
        deal_id,
        service::DealChanges {
            title: req.title,
            amount: req.amount,
            currency: req.currency,
            status: req.status,
            stage: req.stage,
        },
    )?;
    Ok(Json(deal))
}

pub async fn delete_deal(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Path(deal_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    service::delete_deal(&state, &ctx, deal_id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route("/deals", get(list_deals).post(create_deal))
        .route(
            "/deals/:id",
            get(get_deal).patch(update_deal).delete(delete_deal),
        )
}
