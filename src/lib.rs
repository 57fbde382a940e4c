pub mod config;
pub mod db;
pub mod error;
pub mod import;

#[cfg_attr(not(test), allow(dead_code))]
pub mod test_support;

use crate::config::LoadSettings;
use crate::db::SqlDatabase;
use crate::error::LoadResult;
use crate::import::{BulkLoader, CsvSource, LoadStats};
use env_logger::Env;
use std::sync::Once;

static LOGGER: Once = Once::new();

/// Install the process logger; `RUST_LOG` overrides the default filter.
pub fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(Env::default().default_filter_or("info,sqlx=warn")).init();
    });
}

/// Open the source, connect to the database and run one load to completion.
pub async fn run(settings: LoadSettings) -> LoadResult<LoadStats> {
    let source = CsvSource::open(&settings.file, settings.delimiter)?;
    let db = SqlDatabase::connect(&settings.database_url, settings.concurrency).await?;

    let loader = BulkLoader::new(db.clone(), settings);
    let stats = loader.run(source).await?;

    db.close().await;
    Ok(stats)
}
