use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Once;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use sqlx::any::{AnyConnectOptions, AnyPoolOptions};
use sqlx::{migrate::Migrator, AnyPool, ConnectOptions};

static INSTALL_DRIVERS: Once = Once::new();

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const MAX_CONNECTIONS: u32 = 10;
/// How long a SQLite writer waits on a locked database before failing.
const SQLITE_BUSY_TIMEOUT_MS: u32 = 5_000;

#[derive(Clone)]
pub struct Database {
    pool: AnyPool,
}

impl Database {
    /// Open a pool on `database_url`, or on `teledeck.db` in the per-user data directory.
    pub async fn connect(database_url: Option<&str>) -> Result<Self> {
        INSTALL_DRIVERS.call_once(sqlx::any::install_default_drivers);

        let url = match database_url {
            Some(u) if !u.trim().is_empty() => u.to_string(),
            _ => default_sqlite_url()?,
        };
        let is_sqlite = url.starts_with("sqlite:");

        let opts = AnyConnectOptions::from_str(&url)
            .with_context(|| format!("invalid database URL: {url}"))?
            .disable_statement_logging();

        let pool = AnyPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .after_connect(move |conn, _meta| {
                Box::pin(async move {
                    if is_sqlite {
                        sqlx::query(&format!("PRAGMA busy_timeout = {SQLITE_BUSY_TIMEOUT_MS}")).execute(&mut *conn).await?;
                    }
                    Ok(())
                })
            })
            .connect_with(opts)
            .await
            .with_context(|| format!("failed to connect to database: {url}"))?;

        tracing::debug!(%url, "database connected");
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<()> {
        let Err(e) = MIGRATOR.run(&self.pool).await else {
            return Ok(());
        };
        let msg = e.to_string();
        let out_of_sync = msg.contains("was previously applied but has been modified")
            || msg.contains("UNIQUE constraint failed: _sqlx_migrations.version");
        if !out_of_sync {
            return Err(e).context("running migrations");
        }
        // Migrations only use IF NOT EXISTS, so they can be replayed.
        tracing::warn!(error = %msg, "migration ledger out of sync; resetting");
        sqlx::query("DELETE FROM _sqlx_migrations").execute(&self.pool).await.context("resetting migration ledger")?;
        MIGRATOR.run(&self.pool).await.context("running migrations after ledger reset")
    }

    pub fn pool(&self) -> &AnyPool { &self.pool }

    /// Compact the database file. Failures are logged, not returned.
    pub async fn vacuum(&self) -> Result<()> {
        if let Err(e) = sqlx::query("VACUUM").execute(&self.pool).await {
            tracing::warn!(error = %e, "vacuum failed");
        }
        Ok(())
    }
}

pub fn default_data_dir() -> Result<PathBuf> {
    let proj = ProjectDirs::from("dev", "teledeck", "teledeck").context("unable to determine data directory")?;
    Ok(proj.data_dir().to_path_buf())
}

fn default_sqlite_url() -> Result<String> {
    let dir = default_data_dir()?;
    std::fs::create_dir_all(&dir).with_context(|| format!("creating data dir: {}", dir.display()))?;
    Ok(sqlite_url_for(&dir.join("teledeck.db")))
}

/// `sqlite://` URL that creates the file on first open.
pub fn sqlite_url_for(path: &Path) -> String {
    let path_str = path.to_string_lossy().replace(' ', "%20");
    format!("sqlite://{path_str}?mode=rwc")
}
