use crate::config::AppConfig;
use crate::core::cache::TtlCache;
use crate::core::permissions::PermissionPolicy;
use crate::security::jwt::{JwtConfig, JwtManager};
use crate::shared::utils::DbPool;
use anyhow::Result;

/// Shared application state. Wiring is resolved once at startup; handlers
/// receive it as `State<Arc<AppState>>`.
pub struct AppState {
    pub conn: DbPool,
    pub config: AppConfig,
    pub jwt: JwtManager,
    pub policy: PermissionPolicy,
    pub analytics_cache: TtlCache<serde_json::Value>,
}

impl AppState {
    pub fn new(config: AppConfig, conn: DbPool) -> Result<Self> {
        let jwt = JwtManager::new(
            JwtConfig {
                access_token_expiry_minutes: config.jwt.access_token_expire_minutes,
                refresh_token_expiry_days: config.jwt.refresh_token_expire_days,
                ..JwtConfig::default()
            },
            &config.jwt.secret,
        )?;
        let analytics_cache = TtlCache::new(config.cache.max_size, config.cache.ttl_seconds);
        Ok(Self {
            conn,
            config,
            jwt,
            policy: PermissionPolicy,
            analytics_cache,
        })
    }
}
