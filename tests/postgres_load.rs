use clap::Parser;
use csv_bulkload::config::{Args, LoadSettings};
use std::io::Write;
use tempfile::NamedTempFile;
use uuid::Uuid;

/// Loads a small file into a live PostgreSQL database.
///
/// Skipped unless `TEST_DATABASE_URL` points at a server the test may
/// create and drop tables in.
#[tokio::test]
async fn loads_rows_into_postgres_and_ignores_conflicts() {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("skipping postgres load test: TEST_DATABASE_URL not set");
        return;
    };

    sqlx::any::install_default_drivers();
    let pool = sqlx::any::AnyPoolOptions::new()
        .max_connections(1)
        .connect(&url)
        .await
        .expect("connect to test database");

    let table = format!("bulkload_{}", Uuid::new_v4().simple());
    sqlx::query(&format!(
        "CREATE TABLE {table} (id TEXT PRIMARY KEY, name TEXT NOT NULL)"
    ))
    .execute(&pool)
    .await
    .expect("create table");

    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(b"id,name,note\n1,x,a\n2,y,b\n2,dup,c\n3,z,d\n")
        .expect("write csv");
    file.flush().expect("flush csv");

    let settings = LoadSettings::from_args(&Args::parse_from([
        "csv-bulkload",
        "--table",
        table.as_str(),
        "--file",
        file.path().to_str().expect("utf-8 path"),
        "--db",
        url.as_str(),
        "--batch-size",
        "2",
        "--concurrency",
        "2",
        "--ignore-columns",
        "note",
    ]))
    .expect("valid settings");

    let stats = csv_bulkload::run(settings).await.expect("load succeeds");
    assert_eq!(stats.batches_completed, 2);
    assert_eq!(stats.batches_failed, 0);
    assert_eq!(stats.rows_inserted, 3, "conflicting id 2 is ignored");

    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(&pool)
        .await
        .expect("count rows");
    assert_eq!(count, 3);

    sqlx::query(&format!("DROP TABLE {table}"))
        .execute(&pool)
        .await
        .expect("drop table");
}
