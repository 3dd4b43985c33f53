use diesel::prelude::*;
use uuid::Uuid;

use crate::shared::models::Contact;
use crate::shared::schema::contacts;

#[derive(Debug, Default, Clone)]
pub struct ContactFilter {
    pub search: Option<String>,
    pub owner_id: Option<Uuid>,
}

macro_rules! filtered_contacts {
    ($organization_id:expr, $filter:expr, $select:expr) => {{
        let mut query = contacts::table
            .filter(contacts::organization_id.eq($organization_id))
            .select($select)
            .into_boxed();
        if let Some(owner_id) = $filter.owner_id {
            query = query.filter(contacts::owner_id.eq(owner_id));
        }
        if let Some(search) = &$filter.search {
            let pattern = format!("%{search}%");
            query = query.filter(
                contacts::name
                    .ilike(pattern.clone())
                    .or(contacts::email.ilike(pattern.clone()))
                    .or(contacts::phone.ilike(pattern)),
            );
        }
        query
    }};
}

pub fn search(
    conn: &mut PgConnection,
    organization_id: Uuid,
    filter: &ContactFilter,
    limit: i64,
    offset: i64,
) -> QueryResult<Vec<Contact>> {
    filtered_contacts!(organization_id, filter, Contact::as_select())
        .order(contacts::created_at.desc())
        .limit(limit)
        .offset(offset)
        .load(conn)
}

pub fn count(
    conn: &mut PgConnection,
    organization_id: Uuid,
    filter: &ContactFilter,
) -> QueryResult<i64> {
    filtered_contacts!(organization_id, filter, diesel::dsl::count_star()).get_result(conn)
}

pub fn find_for_org(
    conn: &mut PgConnection,
    organization_id: Uuid,
    contact_id: Uuid,
) -> QueryResult<Option<Contact>> {
    contacts::table
        .filter(contacts::organization_id.eq(organization_id))
        .filter(contacts::id.eq(contact_id))
        .select(Contact::as_select())
        .first(conn)
        .optional()
}

pub fn email_exists_in_org(
    conn: &mut PgConnection,
    organization_id: Uuid,
    email: &str,
    exclude_id: Option<Uuid>,
) -> QueryResult<bool> {
    let mut query = contacts::table
        .filter(contacts::organization_id.eq(organization_id))
        .filter(contacts::email.eq(email.to_string()))
        .select(diesel::dsl::count_star())
        .into_boxed();
    if let Some(exclude_id) = exclude_id {
        query = query.filter(contacts::id.ne(exclude_id));
    }
    let found: i64 = query.get_result(conn)?;
    Ok(found > 0)
}

pub fn insert(conn: &mut PgConnection, contact: &Contact) -> QueryResult<usize> {
    diesel::insert_into(contacts::table)
        .values(contact)
        .execute(conn)
}

pub fn update_fields(
    conn: &mut PgConnection,
    contact_id: Uuid,
    name: &str,
    email: Option<&str>,
    phone: Option<&str>,
) -> QueryResult<Contact> {
    diesel::update(contacts::table.filter(contacts::id.eq(contact_id)))
        .set((
            contacts::name.eq(name),
            contacts::email.eq(email),
            contacts::phone.eq(phone),
        ))
        .get_result(conn)
}

pub fn delete(conn: &mut PgConnection, contact_id: Uuid) -> QueryResult<usize> {
    diesel::delete(contacts::table.filter(contacts::id.eq(contact_id))).execute(conn)
}
