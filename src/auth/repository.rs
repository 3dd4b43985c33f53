use diesel::prelude::*;
use uuid::Uuid;

use crate::shared::models::User;
use crate::shared::schema::users;

pub fn email_exists(conn: &mut PgConnection, email: &str) -> QueryResult<bool> {
    let found: i64 = users::table
        .filter(users::email.eq(email.to_string()))
        .count()
        .get_result(conn)?;
    Ok(found > 0)
}

pub fn find_by_email(conn: &mut PgConnection, email: &str) -> QueryResult<Option<User>> {
    users::table
        .filter(users::email.eq(email.to_string()))
        .select(User::as_select())
        .first(conn)
        .optional()
}

pub fn find_by_id(conn: &mut PgConnection, user_id: Uuid) -> QueryResult<Option<User>> {
    users::table
        .filter(users::id.eq(user_id))
        .select(User::as_select())
        .first(conn)
        .optional()
}

pub fn insert(conn: &mut PgConnection, user: &User) -> QueryResult<usize> {
    diesel::insert_into(users::table).values(user).execute(conn)
}
