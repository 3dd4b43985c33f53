pub mod repository;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::{Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::context::OrgContext;
use crate::core::error::AppError;
use crate::shared::models::{DealStage, DealStatus};
use crate::shared::state::AppState;

#[derive(Debug, Serialize)]
pub struct StatusBreakdown {
    pub status: DealStatus,
    pub count: i64,
    pub total_amount: f64,
    pub average_amount: f64,
}

#[derive(Debug, Serialize)]
pub struct DealsSummary {
    pub total_deals: i64,
    pub total_value: f64,
    pub average_deal_value: f64,
    pub by_status: Vec<StatusBreakdown>,
    pub new_deals_last_30_days: i64,
    pub win_rate: f64,
}

#[derive(Debug, Serialize)]
pub struct FunnelCell {
    pub stage: DealStage,
    pub status: DealStatus,
    pub count: i64,
    pub total_amount: f64,
}

#[derive(Debug, Serialize)]
pub struct FunnelStage {
    pub stage: DealStage,
    pub active_count: i64,
    pub active_amount: f64,
    pub conversion_rate: f64,
}

#[derive(Debug, Serialize)]
pub struct Funnel {
    pub cells: Vec<FunnelCell>,
    pub stages: Vec<FunnelStage>,
}

fn to_f64(value: Option<BigDecimal>) -> f64 {
    value.and_then(|v| v.to_f64()).unwrap_or(0.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn compute_summary(
    conn: &mut diesel::PgConnection,
    organization_id: Uuid,
) -> Result<DealsSummary, AppError> {
    let (total_deals, total_value, average_value) = repository::totals(conn, organization_id)?;
    let rows = repository::summary_by_status(conn, organization_id)?;
    let new_deals_last_30_days =
        repository::created_since(conn, organization_id, Utc::now() - Duration::days(30))?;

    let mut by_status = Vec::with_capacity(rows.len());
    let mut won_count = 0i64;
    let mut lost_count = 0i64;
    for (status, count, total, average) in rows {
        let status: DealStatus = status
            .parse()
            .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))?;
        match status {
            DealStatus::Won => won_count = count,
            DealStatus::Lost => lost_count = count,
            _ => {}
        }
        by_status.push(StatusBreakdown {
            status,
            count,
            total_amount: round2(to_f64(total)),
            average_amount: round2(to_f64(average)),
        });
    }

    let closed = won_count + lost_count;
    let win_rate = if closed > 0 {
        round2(won_count as f64 / closed as f64 * 100.0)
    } else {
        0.0
    };

    Ok(DealsSummary {
        total_deals,
        total_value: round2(to_f64(total_value)),
        average_deal_value: round2(to_f64(average_value)),
        by_status,
        new_deals_last_30_days,
        win_rate,
    })
}

fn compute_funnel(
    conn: &mut diesel::PgConnection,
    organization_id: Uuid,
) -> Result<Funnel, AppError> {
    let rows = repository::summary_by_stage_status(conn, organization_id)?;

    let mut cells = Vec::with_capacity(rows.len());
    for (stage, status, count, total) in rows {
        let stage: DealStage = stage
            .parse()
            .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))?;
        let status: DealStatus = status
            .parse()
            .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))?;
        cells.push(FunnelCell {
            stage,
            status,
            count,
            total_amount: round2(to_f64(total)),
        });
    }

    Ok(Funnel {
        stages: conversion_by_stage(&cells),
        cells,
    })
}

/// Per-stage conversion over the canonical stage ordering. "Active"
/// excludes lost deals; the first stage is pinned at 100%.
fn conversion_by_stage(cells: &[FunnelCell]) -> Vec<FunnelStage> {
    let mut stages = Vec::with_capacity(4);
    let mut previous_active: Option<i64> = None;

    for stage in DealStage::all_in_order() {
        let mut active_count = 0i64;
        let mut active_amount = 0.0f64;
        for cell in cells.iter().filter(|cell| cell.stage == stage) {
            if cell.status != DealStatus::Lost {
                active_count += cell.count;
                active_amount += cell.total_amount;
            }
        }

        let conversion_rate = match previous_active {
            None => 100.0,
            Some(prev) if prev > 0 => round2(active_count as f64 / prev as f64 * 100.0),
            Some(_) => 0.0,
        };
        previous_active = Some(active_count);

        stages.push(FunnelStage {
            stage,
            active_count,
            active_amount: round2(active_amount),
            conversion_rate,
        });
    }
    stages
}

pub async fn get_deals_summary(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
) -> Result<Json<serde_json::Value>, AppError> {
    let cache_key = format!("analytics:summary:{}", ctx.organization_id);
    if let Some(cached) = state.analytics_cache.get(&cache_key).await {
        return Ok(Json(cached));
    }

    let mut conn = state.conn.get()?;
    let summary = compute_summary(&mut conn, ctx.organization_id)?;
    let value = serde_json::to_value(&summary).map_err(anyhow::Error::from)?;
    state.analytics_cache.insert(cache_key, value.clone()).await;

    Ok(Json(value))
}

pub async fn get_deals_funnel(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
) -> Result<Json<serde_json::Value>, AppError> {
    let cache_key = format!("analytics:funnel:{}", ctx.organization_id);
    if let Some(cached) = state.analytics_cache.get(&cache_key).await {
        return Ok(Json(cached));
    }

    let mut conn = state.conn.get()?;
    let funnel = compute_funnel(&mut conn, ctx.organization_id)?;
    let value = serde_json::to_value(&funnel).map_err(anyhow::Error::from)?;
    state.analytics_cache.insert(cache_key, value.clone()).await;

    Ok(Json(value))
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route("/analytics/deals/summary", get(get_deals_summary))
        .route("/analytics/deals/funnel", get(get_deals_funnel))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(stage: DealStage, status: DealStatus, count: i64, amount: f64) -> FunnelCell {
        FunnelCell {
            stage,
            status,
            count,
            total_amount: amount,
        }
    }

    #[test]
    fn first_stage_is_pinned_at_full_conversion() {
        let cells = vec![cell(DealStage::Qualification, DealStatus::New, 10, 1000.0)];
        let stages = conversion_by_stage(&cells);
        assert_eq!(stages[0].conversion_rate, 100.0);
        assert_eq!(stages[0].active_count, 10);
    }

    #[test]
    fn lost_deals_are_excluded_from_active_counts() {
        let cells = vec![
            cell(DealStage::Qualification, DealStatus::New, 8, 800.0),
            cell(DealStage::Qualification, DealStatus::Lost, 2, 200.0),
            cell(DealStage::Proposal, DealStatus::InProgress, 4, 400.0),
        ];
        let stages = conversion_by_stage(&cells);
        assert_eq!(stages[0].active_count, 8);
        assert_eq!(stages[1].active_count, 4);
        assert_eq!(stages[1].conversion_rate, 50.0);
    }

    #[test]
    fn empty_previous_stage_yields_zero_conversion() {
        let cells = vec![cell(DealStage::Proposal, DealStatus::New, 3, 300.0)];
        let stages = conversion_by_stage(&cells);
        assert_eq!(stages[0].active_count, 0);
        assert_eq!(stages[1].conversion_rate, 0.0);
    }

    #[test]
    fn won_deals_stay_active_in_the_closed_stage() {
        let cells = vec![
            cell(DealStage::Qualification, DealStatus::New, 4, 400.0),
            cell(DealStage::Closed, DealStatus::Won, 2, 2000.0),
            cell(DealStage::Closed, DealStatus::Lost, 2, 100.0),
        ];
        let stages = conversion_by_stage(&cells);
        let closed = stages
            .iter()
            .find(|s| s.stage == DealStage::Closed)
            .unwrap();
        assert_eq!(closed.active_count, 2);
        assert_eq!(closed.active_amount, 2000.0);
    }
}
