use bigdecimal::BigDecimal;
use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::shared::models::Deal;
use crate::shared::schema::deals;

#[derive(Debug, Default, Clone)]
pub struct DealFilter {
    pub search: Option<String>,
    pub statuses: Vec<String>,
    pub stage: Option<String>,
    pub owner_id: Option<Uuid>,
    pub contact_id: Option<Uuid>,
    pub amount_min: Option<BigDecimal>,
    pub amount_max: Option<BigDecimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DealSort {
    CreatedAt,
    UpdatedAt,
    Amount,
    Title,
}

impl DealSort {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("amount") => Self::Amount,
            Some("title") => Self::Title,
            Some("updated_at") => Self::UpdatedAt,
            _ => Self::CreatedAt,
        }
    }
}

macro_rules! filtered_deals {
    ($organization_id:expr, $filter:expr, $select:expr) => {{
        let mut query = deals::table
            .filter(deals::organization_id.eq($organization_id))
            .select($select)
            .into_boxed();
        if let Some(search) = &$filter.search {
            query = query.filter(deals::title.ilike(format!("%{search}%")));
        }
        if !$filter.statuses.is_empty() {
            query = query.filter(deals::status.eq_any($filter.statuses.clone()));
        }
        if let Some(stage) = &$filter.stage {
            query = query.filter(deals::stage.eq(stage.clone()));
        }
        if let Some(owner_id) = $filter.owner_id {
            query = query.filter(deals::owner_id.eq(owner_id));
        }
        if let Some(contact_id) = $filter.contact_id {
            query = query.filter(deals::contact_id.eq(contact_id));
        }
        if let Some(min) = &$filter.amount_min {
            query = query.filter(deals::amount.ge(min.clone()));
        }
        if let Some(max) = &$filter.amount_max {
            query = query.filter(deals::amount.le(max.clone()));
        }
        query
    }};
}

pub fn search(
    conn: &mut PgConnection,
    organization_id: Uuid,
    filter: &DealFilter,
    sort: DealSort,
    descending: bool,
    limit: i64,
    offset: i64,
) -> QueryResult<Vec<Deal>> {
    let query = filtered_deals!(organization_id, filter, Deal::as_select());
    let query = match (sort, descending) {
        (DealSort::CreatedAt, true) => query.order(deals::created_at.desc()),
        (DealSort::CreatedAt, false) => query.order(deals::created_at.asc()),
        (DealSort::UpdatedAt, true) => query.order(deals::updated_at.desc()),
        (DealSort::UpdatedAt, false) => query.order(deals::updated_at.asc()),
        (DealSort::Amount, true) => query.order(deals::amount.desc()),
        (DealSort::Amount, false) => query.order(deals::amount.asc()),
        (DealSort::Title, true) => query.order(deals::title.desc()),
        (DealSort::Title, false) => query.order(deals::title.asc()),
    };
    query.limit(limit).offset(offset).load(conn)
}

pub fn count(
    conn: &mut PgConnection,
    organization_id: Uuid,
    filter: &DealFilter,
) -> QueryResult<i64> {
    filtered_deals!(organization_id, filter, diesel::dsl::count_star()).get_result(conn)
}

pub fn find_for_org(
    conn: &mut PgConnection,
    organization_id: Uuid,
    deal_id: Uuid,
) -> QueryResult<Option<Deal>> {
    deals::table
        .filter(deals::organization_id.eq(organization_id))
        .filter(deals::id.eq(deal_id))
        .select(Deal::as_select())
        .first(conn)
        .optional()
}

pub fn insert(conn: &mut PgConnection, deal: &Deal) -> QueryResult<usize> {
    diesel::insert_into(deals::table).values(deal).execute(conn)
}

/// Writes the full resolved field set; callers compute final values from
/// the loaded row before calling.
pub fn update_fields(
    conn: &mut PgConnection,
    deal_id: Uuid,
    title: &str,
    amount: &BigDecimal,
    currency: &str,
    status: &str,
    stage: &str,
) -> QueryResult<Deal> {
    diesel::update(deals::table.filter(deals::id.eq(deal_id)))
        .set((
            deals::title.eq(title),
            deals::amount.eq(amount),
            deals::currency.eq(currency),
            deals::status.eq(status),
            deals::stage.eq(stage),
            deals::updated_at.eq(Utc::now()),
        ))
        .get_result(conn)
}

pub fn delete(conn: &mut PgConnection, deal_id: Uuid) -> QueryResult<usize> {
    diesel::delete(deals::table.filter(deals::id.eq(deal_id))).execute(conn)
}

pub fn count_by_contact(conn: &mut PgConnection, contact_id: Uuid) -> QueryResult<i64> {
    deals::table
        .filter(deals::contact_id.eq(contact_id))
        .count()
        .get_result(conn)
}
