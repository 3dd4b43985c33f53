pub mod repository;
pub mod service;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::core::context::OrgContext;
use crate::core::error::AppError;
use crate::shared::utils::page_params;
use crate::shared::models::{Paginated, Task};
use crate::shared::state::AppState;
use crate::tasks::repository::TaskFilter;

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub deal_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct TaskListQuery {
    pub deal_id: Option<Uuid>,
    #[serde(default)]
    pub open_only: bool,
    pub due_after: Option<NaiveDate>,
    pub due_before: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct OverdueCount {
    pub deal_id: Uuid,
    pub overdue_count: i64,
}

fn member_filter(state: &AppState, ctx: &OrgContext) -> Option<Uuid> {
    state.policy.list_owner_filter(ctx.role, ctx.user.id)
}

pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Query(query): Query<TaskListQuery>,
) -> Result<Json<Paginated<Task>>, AppError> {
    let filter = TaskFilter {
        deal_id: query.deal_id,
        open_only: query.open_only,
        due_after: query.due_after,
        due_before: query.due_before,
        deal_owner_id: member_filter(&state, &ctx),
    };
    let (limit, offset) = page_params(query.limit, query.offset);

    let mut conn = state.conn.get()?;
    let items = repository::search(&mut conn, ctx.organization_id, &filter, limit, offset)?;
    let total = repository::count(&mut conn, ctx.organization_id, &filter)?;

    Ok(Json(Paginated::new(items, total, limit, offset)))
}

pub async fn create_task(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Json(req): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), AppError> {
    let task = service::create_task(
        &state,
        &ctx,
        service::NewTask {
            deal_id: req.deal_id,
            title: req.title,
            description: req.description,
            due_date: req.due_date,
        },
    )?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_task(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Path(task_id): Path<Uuid>,
) -> Result<Json<Task>, AppError> {
    let mut conn = state.conn.get()?;
    let (task, _deal) = repository::find_with_deal(&mut conn, ctx.organization_id, task_id)?
        .ok_or_else(|| AppError::not_found("Task", task_id))?;
    Ok(Json(task))
}

pub async fn update_task(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Path(task_id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<Task>, AppError> {
    let task = service::update_task(
        &state,
        &ctx,
        task_id,
        service::TaskChanges {
            title: req.title,
            description: req.description,
            due_date: req.due_date,
        },
    )?;
    Ok(Json(task))
}

pub async fn mark_task_done(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Path(task_id): Path<Uuid>,
) -> Result<Json<Task>, AppError> {
    let task = service::set_task_done(&state, &ctx, task_id, true)?;
    Ok(Json(task))
}

pub async fn mark_task_undone(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Path(task_id): Path<Uuid>,
) -> Result<Json<Task>, AppError> {
    let task = service::set_task_done(&state, &ctx, task_id, false)?;
    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Path(task_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    service::delete_task(&state, &ctx, task_id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn overdue_count(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
) -> Result<Json<Vec<OverdueCount>>, AppError> {
    let mut conn = state.conn.get()?;
    let rows = repository::overdue_count_by_deal(
        &mut conn,
        ctx.organization_id,
        Utc::now().date_naive(),
        member_filter(&state, &ctx),
    )?;
    Ok(Json(
        rows.into_iter()
            .map(|(deal_id, overdue_count)| OverdueCount {
                deal_id,
                overdue_count,
            })
            .collect(),
    ))
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/overdue/count", get(overdue_count))
        .route(
            "/tasks/:id",
            get(get_task).patch(update_task).delete(delete_task),
        )
        .route("/tasks/:id/done", post(mark_task_done))
        .route("/tasks/:id/undone", post(mark_task_undone))
}
