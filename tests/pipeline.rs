use std::io::Write;
use std::time::Duration;

use clap::Parser;
use csv_bulkload::config::{Args, LoadSettings};
use csv_bulkload::import::{BulkLoader, CsvSource};
use csv_bulkload::test_support::RecordingDatabase;
use tempfile::NamedTempFile;

fn csv_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write csv");
    file.flush().expect("flush csv");
    file
}

fn settings_for(file: &NamedTempFile, extra: &[&str]) -> LoadSettings {
    let path = file.path().to_str().expect("utf-8 temp path").to_string();
    let mut argv = vec![
        "csv-bulkload".to_string(),
        "--table".to_string(),
        "t".to_string(),
        "--file".to_string(),
        path,
        "--db".to_string(),
        "mysql://root@localhost/test".to_string(),
    ];
    argv.extend(extra.iter().map(|s| s.to_string()));
    LoadSettings::from_args(&Args::parse_from(argv)).expect("valid settings")
}

async fn load(
    db: &RecordingDatabase,
    settings: LoadSettings,
) -> csv_bulkload::error::LoadResult<csv_bulkload::import::LoadStats> {
    let source = CsvSource::open(&settings.file, settings.delimiter)?;
    BulkLoader::new(db.clone(), settings).run(source).await
}

#[tokio::test]
async fn two_rows_become_one_statement() {
    let file = csv_file("id,name\n1,x\n2,y\n");
    let settings = settings_for(&file, &["--batch-size", "2", "--concurrency", "1"]);
    let db = RecordingDatabase::new();

    let stats = load(&db, settings).await.expect("load succeeds");

    let executed = db.executed();
    assert_eq!(executed.len(), 1);
    assert_eq!(
        executed[0].sql,
        "INSERT IGNORE INTO t (id, name) VALUES (?, ?), (?, ?)"
    );
    assert_eq!(executed[0].args, vec!["1", "x", "2", "y"]);
    assert_eq!(stats.batches_completed, 1);
}

#[tokio::test]
async fn ignore_and_remap_shape_the_statement() {
    let file = csv_file("id,nm,note\n1,x,z\n2,y,w\n");
    let settings = settings_for(
        &file,
        &[
            "--batch-size",
            "10",
            "--ignore-columns",
            "note",
            "--remap-columns",
            "nm=name",
        ],
    );
    let db = RecordingDatabase::new();

    load(&db, settings).await.expect("load succeeds");

    let executed = db.executed();
    assert_eq!(
        executed[0].sql,
        "INSERT IGNORE INTO t (id, name) VALUES (?, ?), (?, ?)"
    );
    assert_eq!(executed[0].args, vec!["1", "x", "2", "y"]);
}

#[tokio::test]
async fn squash_is_scoped_to_each_batch() {
    // The duplicate "1" rows straddle the batch boundary and both survive.
    let file = csv_file("id\n1\n2\n1\n1\n");
    let settings = settings_for(&file, &["--batch-size", "3", "--squash-all-dups-per-batch"]);
    let db = RecordingDatabase::new();

    let stats = load(&db, settings).await.expect("load succeeds");

    let args: Vec<Vec<String>> = db.executed().into_iter().map(|s| s.args).collect();
    assert!(args.contains(&vec!["1".to_string(), "2".to_string()]));
    assert!(args.contains(&vec!["1".to_string()]));
    assert_eq!(stats.rows_squashed, 1);
}

#[tokio::test]
async fn semicolon_delimited_source() {
    let file = csv_file("id;name\n1;x\n");
    let settings = settings_for(&file, &["--delim", ";"]);
    let db = RecordingDatabase::new();

    load(&db, settings).await.expect("load succeeds");
    assert_eq!(db.executed()[0].args, vec!["1", "x"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn in_flight_statements_stay_within_concurrency() {
    let mut contents = String::from("id,name\n");
    for i in 0..60 {
        contents.push_str(&format!("{i},row{i}\n"));
    }
    let file = csv_file(&contents);
    let settings = settings_for(&file, &["--batch-size", "2", "--concurrency", "3"]);
    let db = RecordingDatabase::new().with_latency(Duration::from_millis(10));

    let stats = load(&db, settings).await.expect("load succeeds");

    assert_eq!(stats.batches_completed, 30);
    assert_eq!(stats.rows_inserted, 60);
    assert_eq!(db.prepared_count(), 30);
    assert!(db.peak_concurrency() <= 3, "peak {}", db.peak_concurrency());
    assert!(db.peak_concurrency() >= 2, "workers never overlapped");
}

#[tokio::test]
async fn failed_batches_are_counted_and_run_completes() {
    let file = csv_file("id\n1\n2\n3\n4\n");
    let settings = settings_for(&file, &["--concurrency", "2"]);
    let db = RecordingDatabase::new().fail_execute_when_arg("3");

    let stats = load(&db, settings).await.expect("load succeeds");

    assert_eq!(stats.batches_completed, 4);
    assert_eq!(stats.batches_failed, 1);
    assert_eq!(stats.rows_inserted, 3);
    assert_eq!(db.failed().len(), 1);
}

#[tokio::test]
async fn missing_source_file_is_fatal() {
    let file = csv_file("id\n1\n");
    let mut settings = settings_for(&file, &[]);
    settings.file = file.path().with_extension("missing");

    let err = CsvSource::open(&settings.file, settings.delimiter).err();
    assert!(matches!(
        err,
        Some(csv_bulkload::error::LoadError::OpenSource { .. })
    ));
}
