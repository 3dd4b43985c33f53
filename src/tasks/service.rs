use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::activities::repository as activity_repo;
use crate::core::context::OrgContext;
use crate::core::error::AppError;
use crate::deals::repository as deal_repo;
use crate::shared::models::{ActivityPayload, Task};
use crate::shared::state::AppState;
use crate::tasks::repository as task_repo;

#[derive(Debug)]
pub struct NewTask {
    pub deal_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
}

fn validate_title(title: &str) -> Result<(), AppError> {
    if title.trim().is_empty() || title.len() > 255 {
        return Err(AppError::validation_field(
            "Title must be between 1 and 255 characters",
            "title",
        ));
    }
    Ok(())
}

/// Comparison uses the server's current date, never a client-supplied now.
fn validate_due_date(due_date: NaiveDate) -> Result<(), AppError> {
    if due_date < Utc::now().date_naive() {
        return Err(AppError::validation_field(
            "Due date cannot be in the past",
            "due_date",
        ));
    }
    Ok(())
}

pub fn create_task(state: &AppState, ctx: &OrgContext, input: NewTask) -> Result<Task, AppError> {
    validate_title(&input.title)?;
    if let Some(due_date) = input.due_date {
        validate_due_date(due_date)?;
    }

    let mut conn = state.conn.get()?;
    conn.transaction::<Task, AppError, _>(|conn| {
        let deal = deal_repo::find_for_org(conn, ctx.organization_id, input.deal_id)?
            .ok_or_else(|| AppError::not_found("Deal", input.deal_id))?;

        state
            .policy
            .check_resource_ownership(ctx.user.id, deal.owner_id, ctx.role, "Task")?;

        let task = Task {
            id: Uuid::new_v4(),
            deal_id: deal.id,
            title: input.title,
            description: input.description,
            due_date: input.due_date,
            is_done: false,
            created_at: Utc::now(),
        };
        task_repo::insert(conn, &task)?;

        activity_repo::append(
            conn,
            deal.id,
            Some(ctx.user.id),
            &ActivityPayload::TaskCreated {
                task_id: task.id,
                title: task.title.clone(),
                due_date: task.due_date,
            },
        )?;

        Ok(task)
    })
}

pub fn update_task(
    state: &AppState,
    ctx: &OrgContext,
    task_id: Uuid,
    changes: TaskChanges,
) -> Result<Task, AppError> {
    if let Some(title) = &changes.title {
        validate_title(title)?;
    }
    if let Some(due_date) = changes.due_date {
        validate_due_date(due_date)?;
    }

    let mut conn = state.conn.get()?;
    conn.transaction::<Task, AppError, _>(|conn| {
        let (task, deal) = task_repo::find_with_deal(conn, ctx.organization_id, task_id)?
            .ok_or_else(|| AppError::not_found("Task", task_id))?;

        state
            .policy
            .check_resource_ownership(ctx.user.id, deal.owner_id, ctx.role, "Task")?;

        let final_title = changes.title.unwrap_or_else(|| task.title.clone());
        let final_description = changes.description.or_else(|| task.description.clone());
        let final_due_date = changes.due_date.or(task.due_date);

        let updated = task_repo::update_fields(
            conn,
            task.id,
            &final_title,
            final_description.as_deref(),
            final_due_date,
        )?;
        Ok(updated)
    })
}

pub fn set_task_done(
    state: &AppState,
    ctx: &OrgContext,
    task_id: Uuid,
    is_done: bool,
) -> Result<Task, AppError> {
    let mut conn = state.conn.get()?;
    conn.transaction::<Task, AppError, _>(|conn| {
        let (task, deal) = task_repo::find_with_deal(conn, ctx.organization_id, task_id)?
            .ok_or_else(|| AppError::not_found("Task", task_id))?;

        state
            .policy
            .check_resource_ownership(ctx.user.id, deal.owner_id, ctx.role, "Task")?;

        // Idempotent toggle: no write, no activity.
        if task.is_done == is_done {
            return Ok(task);
        }

        let updated = task_repo::set_done(conn, task.id, is_done)?;

        let message = if is_done {
            format!("Task \"{}\" marked as done", task.title)
        } else {
            format!("Task \"{}\" marked as not done", task.title)
        };
        activity_repo::append(
            conn,
            deal.id,
            Some(ctx.user.id),
            &ActivityPayload::System { message },
        )?;

        Ok(updated)
    })
}

pub fn delete_task(state: &AppState, ctx: &OrgContext, task_id: Uuid) -> Result<(), AppError> {
    let mut conn = state.conn.get()?;
    conn.transaction::<(), AppError, _>(|conn| {
        let (task, deal) = task_repo::find_with_deal(conn, ctx.organization_id, task_id)?
            .ok_or_else(|| AppError::not_found("Task", task_id))?;

        state
            .policy
            .check_resource_ownership(ctx.user.id, deal.owner_id, ctx.role, "Task")?;

        task_repo::delete(conn, task.id)?;

        activity_repo::append(
            conn,
            deal.id,
            Some(ctx.user.id),
            &ActivityPayload::System {
                message: format!("Task \"{}\" deleted", task.title),
            },
        )?;

        Ok(())
    })
}
