use chrono::NaiveDate;
use diesel::prelude::*;
use uuid::Uuid;

use crate::shared::models::{Deal, Task};
use crate::shared::schema::{deals, tasks};

#[derive(Debug, Default, Clone)]
pub struct TaskFilter {
    pub deal_id: Option<Uuid>,
    pub open_only: bool,
    pub due_after: Option<NaiveDate>,
    pub due_before: Option<NaiveDate>,
    /// Member-role ownership filter, applied to the owning deal.
    pub deal_owner_id: Option<Uuid>,
}

macro_rules! filtered_tasks {
    ($organization_id:expr, $filter:expr, $select:expr) => {{
        let mut query = tasks::table
            .inner_join(deals::table)
            .filter(deals::organization_id.eq($organization_id))
            .select($select)
            .into_boxed();
        if let Some(deal_id) = $filter.deal_id {
            query = query.filter(tasks::deal_id.eq(deal_id));
        }
        if $filter.open_only {
            query = query.filter(tasks::is_done.eq(false));
        }
        if let Some(after) = $filter.due_after {
            query = query.filter(tasks::due_date.ge(after));
        }
        if let Some(before) = $filter.due_before {
            query = query.filter(tasks::due_date.le(before));
        }
        if let Some(owner_id) = $filter.deal_owner_id {
            query = query.filter(deals::owner_id.eq(owner_id));
        }
        query
    }};
}

pub fn search(
    conn: &mut PgConnection,
    organization_id: Uuid,
    filter: &TaskFilter,
    limit: i64,
    offset: i64,
) -> QueryResult<Vec<Task>> {
    filtered_tasks!(organization_id, filter, Task::as_select())
        .order(tasks::created_at.desc())
        .limit(limit)
        .offset(offset)
        .load(conn)
}

pub fn count(
    conn: &mut PgConnection,
    organization_id: Uuid,
    filter: &TaskFilter,
) -> QueryResult<i64> {
    filtered_tasks!(organization_id, filter, diesel::dsl::count_star()).get_result(conn)
}

/// Task together with its owning deal, both proven to live in the caller's
/// organization. One explicit join, no lazy traversal.
pub fn find_with_deal(
    conn: &mut PgConnection,
    organization_id: Uuid,
    task_id: Uuid,
) -> QueryResult<Option<(Task, Deal)>> {
    tasks::table
        .inner_join(deals::table)
        .filter(deals::organization_id.eq(organization_id))
        .filter(tasks::id.eq(task_id))
        .select((Task::as_select(), Deal::as_select()))
        .first(conn)
        .optional()
}

pub fn insert(conn: &mut PgConnection, task: &Task) -> QueryResult<usize> {
    diesel::insert_into(tasks::table).values(task).execute(conn)
}

pub fn update_fields(
    conn: &mut PgConnection,
    task_id: Uuid,
    title: &str,
    description: Option<&str>,
    due_date: Option<NaiveDate>,
) -> QueryResult<Task> {
    diesel::update(tasks::table.filter(tasks::id.eq(task_id)))
        .set((
            tasks::title.eq(title),
            tasks::description.eq(description),
            tasks::due_date.eq(due_date),
        ))
        .get_result(conn)
}

pub fn set_done(conn: &mut PgConnection, task_id: Uuid, is_done: bool) -> QueryResult<Task> {
    diesel::update(tasks::table.filter(tasks::id.eq(task_id)))
        .set(tasks::is_done.eq(is_done))
        .get_result(conn)
}

pub fn delete(conn: &mut PgConnection, task_id: Uuid) -> QueryResult<usize> {
    diesel::delete(tasks::table.filter(tasks::id.eq(task_id))).execute(conn)
}

/// Open tasks past their due date, grouped per deal.
pub fn overdue_count_by_deal(
    conn: &mut PgConnection,
    organization_id: Uuid,
    today: NaiveDate,
    deal_owner_id: Option<Uuid>,
) -> QueryResult<Vec<(Uuid, i64)>> {
    let mut query = tasks::table
        .inner_join(deals::table)
        .filter(deals::organization_id.eq(organization_id))
        .filter(tasks::is_done.eq(false))
        .filter(tasks::due_date.lt(today))
        .group_by(tasks::deal_id)
        .select((tasks::deal_id, diesel::dsl::count_star()))
        .into_boxed();
    if let Some(owner_id) = deal_owner_id {
        query = query.filter(deals::owner_id.eq(owner_id));
    }
    query.load(conn)
}
