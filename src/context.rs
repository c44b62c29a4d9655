/// Application context and dependency injection
use crate::{
    admin::AdminRoleManager,
    config::ServerConfig,
    db,
    error::AppResult,
    events::ScheduleStore,
    recovery::RecoveryTokenManager,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub schedule_store: Arc<ScheduleStore>,
    pub token_manager: Arc<RecoveryTokenManager>,
    pub role_manager: Arc<AdminRoleManager>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> AppResult<Self> {
        config.validate()?;

        if !config.storage.data_directory.exists() {
            tokio::fs::create_dir_all(&config.storage.data_directory).await?;
        }

        let pool = db::create_pool(&config.storage.db_path, db::DatabaseOptions::default()).await?;
        db::run_migrations(&pool).await?;
        db::test_connection(&pool).await?;

        let schedule_store = Arc::new(ScheduleStore::new(pool.clone()));
        let token_manager = Arc::new(RecoveryTokenManager::new(pool.clone()));
        let role_manager = Arc::new(AdminRoleManager::new(pool.clone()));

        if config.recovery.admin_api_key.is_none() {
            tracing::warn!("SCANBASE_ADMIN_API_KEY not set; token administration endpoints disabled");
        }

        Ok(Self {
            config: Arc::new(config),
            db: pool,
            schedule_store,
            token_manager,
            role_manager,
        })
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
