use diesel::prelude::*;
use uuid::Uuid;

use crate::shared::models::{Organization, OrganizationMember};
use crate::shared::schema::{organization_members, organizations, users};

pub fn insert_organization(
    conn: &mut PgConnection,
    organization: &Organization,
) -> QueryResult<usize> {
    diesel::insert_into(organizations::table)
        .values(organization)
        .execute(conn)
}

pub fn find_organization(
    conn: &mut PgConnection,
    organization_id: Uuid,
) -> QueryResult<Option<Organization>> {
    organizations::table
        .filter(organizations::id.eq(organization_id))
        .select(Organization::as_select())
        .first(conn)
        .optional()
}

pub fn update_organization(
    conn: &mut PgConnection,
    organization_id: Uuid,
    name: &str,
    default_currency: Option<&str>,
) -> QueryResult<Organization> {
    diesel::update(organizations::table.filter(organizations::id.eq(organization_id)))
        .set((
            organizations::name.eq(name),
            organizations::default_currency.eq(default_currency),
        ))
        .get_result(conn)
}

pub fn delete_organization(conn: &mut PgConnection, organization_id: Uuid) -> QueryResult<usize> {
    diesel::delete(organizations::table.filter(organizations::id.eq(organization_id)))
        .execute(conn)
}

/// All memberships of one user together with the organizations they grant.
pub fn user_memberships(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> QueryResult<Vec<(OrganizationMember, Organization)>> {
    organization_members::table
        .inner_join(organizations::table)
        .filter(organization_members::user_id.eq(user_id))
        .order(organization_members::created_at.asc())
        .select((
            OrganizationMember::as_select(),
            Organization::as_select(),
        ))
        .load(conn)
}

pub fn find_membership(
    conn: &mut PgConnection,
    organization_id: Uuid,
    user_id: Uuid,
) -> QueryResult<Option<OrganizationMember>> {
    organization_members::table
        .filter(organization_members::organization_id.eq(organization_id))
        .filter(organization_members::user_id.eq(user_id))
        .select(OrganizationMember::as_select())
        .first(conn)
        .optional()
}

pub fn insert_member(conn: &mut PgConnection, member: &OrganizationMember) -> QueryResult<usize> {
    diesel::insert_into(organization_members::table)
        .values(member)
        .execute(conn)
}

pub fn delete_member(conn: &mut PgConnection, membership_id: Uuid) -> QueryResult<usize> {
    diesel::delete(
        organization_members::table.filter(organization_members::id.eq(membership_id)),
    )
    .execute(conn)
}

pub fn update_member_role(
    conn: &mut PgConnection,
    membership_id: Uuid,
    role: &str,
) -> QueryResult<OrganizationMember> {
    diesel::update(organization_members::table.filter(organization_members::id.eq(membership_id)))
        .set(organization_members::role.eq(role))
        .get_result(conn)
}

pub fn count_members_with_role(
    conn: &mut PgConnection,
    organization_id: Uuid,
    role: &str,
) -> QueryResult<i64> {
    organization_members::table
        .filter(organization_members::organization_id.eq(organization_id))
        .filter(organization_members::role.eq(role.to_string()))
        .count()
        .get_result(conn)
}

/// Memberships of an organization plus (id, email, name) of each user.
pub fn members_with_users(
    conn: &mut PgConnection,
    organization_id: Uuid,
) -> QueryResult<Vec<(OrganizationMember, (Uuid, String, String))>> {
    organization_members::table
        .inner_join(users::table)
        .filter(organization_members::organization_id.eq(organization_id))
        .order(organization_members::created_at.asc())
        .select((
            OrganizationMember::as_select(),
            (users::id, users::email, users::name),
        ))
        .load(conn)
}
