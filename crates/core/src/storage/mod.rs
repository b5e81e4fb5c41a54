pub mod seed;

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

pub async fn connect(url: &str) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)
        .with_context(|| format!("invalid LOCAL_STORE_URL: {url}"))?
        .create_if_missing(true);

    let mut opts = SqlitePoolOptions::new().max_connections(5);
    if url.contains(":memory:") {
        // Every connection to an in-memory database is a separate database; keep exactly one.
        opts = opts
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }

    opts.connect_with(options)
        .await
        .with_context(|| format!("connect local store failed: {url}"))
}

pub async fn migrate(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("sqlx migrations failed")?;
    Ok(())
}
