use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::shared::models::{Activity, ActivityPayload};
use crate::shared::schema::activities;

/// Appends one timeline entry. Activities are never updated or deleted;
/// this is the only write path.
pub fn append(
    conn: &mut PgConnection,
    deal_id: Uuid,
    author_id: Option<Uuid>,
    payload: &ActivityPayload,
) -> QueryResult<Activity> {
    let activity = Activity {
        id: Uuid::new_v4(),
        deal_id,
        author_id,
        kind: payload.kind().as_str().to_string(),
        payload: payload.to_json(),
        created_at: Utc::now(),
    };
    diesel::insert_into(activities::table)
        .values(&activity)
        .execute(conn)?;
    Ok(activity)
}

pub fn timeline(
    conn: &mut PgConnection,
    deal_id: Uuid,
    kind: Option<&str>,
    limit: i64,
    offset: i64,
) -> QueryResult<Vec<Activity>> {
    let mut query = activities::table
        .filter(activities::deal_id.eq(deal_id))
        .select(Activity::as_select())
        .into_boxed();
    if let Some(kind) = kind {
        query = query.filter(activities::kind.eq(kind.to_string()));
    }
    query
        .order(activities::created_at.desc())
        .limit(limit)
        .offset(offset)
        .load(conn)
}

pub fn count(conn: &mut PgConnection, deal_id: Uuid, kind: Option<&str>) -> QueryResult<i64> {
    let mut query = activities::table
        .filter(activities::deal_id.eq(deal_id))
        .select(diesel::dsl::count_star())
        .into_boxed();
    if let Some(kind) = kind {
        query = query.filter(activities::kind.eq(kind.to_string()));
    }
    query.get_result(conn)
}
