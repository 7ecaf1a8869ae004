mod counters;
mod follow;
mod like;
mod tweet;
mod user;

pub use follow::*;
pub use like::*;
pub use tweet::*;
pub use user::*;

use std::{str::FromStr, sync::Arc, time::Duration};

use icu_collator::{Collator, CollatorOptions, Strength};
use icu_provider::DataLocale;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Executor, SqlitePool,
};

/// Name of the collation that orders text the way people read names:
/// case and accents are ignored, so "émile" sorts next to "Emile".
pub const LOCALE_COLLATION: &str = "locale";

fn locale_collator() -> Result<Collator, sqlx::Error> {
    let mut options = CollatorOptions::new();
    options.strength = Some(Strength::Primary);

    // The root collation order, which English uses unchanged.
    Collator::try_new(&DataLocale::default(), options)
        .map_err(|err| sqlx::Error::Configuration(err.to_string().into()))
}

pub async fn connect(url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let collator = Arc::new(locale_collator()?);

    let options = SqliteConnectOptions::from_str(url)?
        .collation(LOCALE_COLLATION, move |left, right| collator.compare(left, right))
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    // Every connection to an in-memory database gets its own empty database,
    // so those pools keep exactly one connection open for their whole life.
    let in_memory = url.contains(":memory:") || url.contains("mode=memory");
    let pool = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(max_connections)
    };

    pool.connect_with(options).await
}

pub async fn prepare_db(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    pool.execute(include_str!("sql/schema.sql")).await?;
    Ok(())
}
