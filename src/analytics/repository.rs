use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::dsl::{avg, count_star, sum};
use diesel::prelude::*;
use uuid::Uuid;

use crate::shared::schema::deals;

pub type StatusRow = (String, i64, Option<BigDecimal>, Option<BigDecimal>);
pub type StageStatusRow = (String, String, i64, Option<BigDecimal>);

pub fn totals(
    conn: &mut PgConnection,
    organization_id: Uuid,
) -> QueryResult<(i64, Option<BigDecimal>, Option<BigDecimal>)> {
    deals::table
        .filter(deals::organization_id.eq(organization_id))
        .select((count_star(), sum(deals::amount), avg(deals::amount)))
        .get_result(conn)
}

pub fn summary_by_status(
    conn: &mut PgConnection,
    organization_id: Uuid,
) -> QueryResult<Vec<StatusRow>> {
    deals::table
        .filter(deals::organization_id.eq(organization_id))
        .group_by(deals::status)
        .select((
            deals::status,
            count_star(),
            sum(deals::amount),
            avg(deals::amount),
        ))
        .load(conn)
}

pub fn summary_by_stage_status(
    conn: &mut PgConnection,
    organization_id: Uuid,
) -> QueryResult<Vec<StageStatusRow>> {
    deals::table
        .filter(deals::organization_id.eq(organization_id))
        .group_by((deals::stage, deals::status))
        .select((
            deals::stage,
            deals::status,
            count_star(),
            sum(deals::amount),
        ))
        .load(conn)
}

pub fn created_since(
    conn: &mut PgConnection,
    organization_id: Uuid,
    cutoff: DateTime<Utc>,
) -> QueryResult<i64> {
    deals::table
        .filter(deals::organization_id.eq(organization_id))
        .filter(deals::created_at.ge(cutoff))
        .count()
        .get_result(conn)
}
