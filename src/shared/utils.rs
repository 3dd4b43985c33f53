use anyhow::{Context, Result};
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::PgConnection;

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

pub fn create_conn(database_url: &str) -> Result<DbPool> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Pool::builder()
        .build(manager)
        .with_context(|| "failed to create database pool")
}

/// Clamps caller-supplied paging to sane bounds (limit 1..=500, default 100).
pub fn page_params(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    let limit = limit.unwrap_or(100).clamp(1, 500);
    let offset = offset.unwrap_or(0).max(0);
    (limit, offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_params_defaults_and_bounds() {
        assert_eq!(page_params(None, None), (100, 0));
        assert_eq!(page_params(Some(1000), Some(-5)), (500, 0));
        assert_eq!(page_params(Some(0), Some(20)), (1, 20));
        assert_eq!(page_params(Some(50), Some(10)), (50, 10));
    }
}
