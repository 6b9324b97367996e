use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use sea_orm_migration::MigratorTrait;
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use crate::entities::security_events::Model as SecurityEventRecord;
pub use repositories::account::AccountRepository;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    /// Opens the pool against `db_url`, creating the sqlite file when it
    /// does not exist yet, and brings the schema up to date.
    pub async fn connect(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        ensure_sqlite_file(db_url).await?;

        let mut options = ConnectOptions::new(db_url);
        options
            .max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(options).await?;
        migrator::Migrator::up(&conn, None).await?;

        info!(
            pool_min = min_connections,
            pool_max = max_connections,
            "Database connected, migrations applied"
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let select_one = Statement::from_string(self.conn.get_database_backend(), "SELECT 1");
        self.conn.query_one(select_one).await?;
        Ok(())
    }

    #[must_use]
    pub fn account_repo(&self) -> repositories::account::AccountRepository {
        repositories::account::AccountRepository::new(self.conn.clone())
    }

    fn security_event_repo(&self) -> repositories::security_event::SecurityEventRepository {
        repositories::security_event::SecurityEventRepository::new(self.conn.clone())
    }

    pub async fn count_accounts(&self) -> Result<u64> {
        use crate::services::directory::AccountDirectory;

        Ok(self.account_repo().count().await?)
    }

    pub async fn add_security_event(
        &self,
        kind: &str,
        severity: &str,
        message: &str,
        details: Option<String>,
    ) -> Result<()> {
        self.security_event_repo()
            .record(kind, severity, message, details)
            .await
    }

    pub async fn get_security_events(
        &self,
        page: u64,
        per_page: u64,
        severity: Option<&str>,
        kind: Option<&str>,
    ) -> Result<(Vec<SecurityEventRecord>, u64)> {
        self.security_event_repo()
            .page(page, per_page, severity, kind)
            .await
    }

    pub async fn prune_security_events(&self, older_than_days: i64) -> Result<u64> {
        self.security_event_repo().prune(older_than_days).await
    }
}

/// In-memory databases need no file; for file-backed urls the parent
/// directory and an empty database file must exist before sqlx opens it.
async fn ensure_sqlite_file(db_url: &str) -> Result<()> {
    let path = db_url.trim_start_matches("sqlite:");
    if path.starts_with(":memory:") {
        return Ok(());
    }

    if let Some(parent) = Path::new(path).parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }
    if !Path::new(path).exists() {
        std::fs::File::create(path)?;
    }
    Ok(())
}
