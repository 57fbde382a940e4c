//! Bounded-concurrency bulk insert pipeline.
//!
//! This module turns a delimited source into parameterized INSERT statements
//! and drives them into the database with at most `concurrency` statements
//! in flight:
//!
//! 1. **Reading** (`reader`) - Decodes records on a blocking thread, header first
//! 2. **Columns** (`columns`) - Applies ignore/remap rules to the header and rows
//! 3. **Squashing** (`dedup`) - Drops duplicate rows within a batch
//! 4. **Statements** (`statement`) - Builds one INSERT and its arguments per batch
//! 5. **Admission** (`governor`) - Bounds in-flight workers and owns the run counters
//! 6. **Workers** (`worker`) - Prepare and execute one batch each
//! 7. **Coordination** (`coordinator`) - Runs the loop, drains workers, reports totals
//!
//! # Architecture
//!
//! Reading and statement building happen on one sequence, in input order.
//! Workers finish in any order. Release of a slot and every counter update
//! go through a single accounting task, so nothing else mutates shared
//! state. A separate task logs progress every status interval.
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use csv_bulkload::db::SqlDatabase;
//! use csv_bulkload::import::{BulkLoader, CsvSource};
//!
//! let db = SqlDatabase::connect(&settings.database_url, settings.concurrency).await?;
//! let source = CsvSource::open(&settings.file, settings.delimiter)?;
//! let stats = BulkLoader::new(db, settings).run(source).await?;
//!
//! println!("{stats}");
//! ```

pub mod columns;
pub mod coordinator;
pub mod dedup;
pub mod governor;
pub mod reader;
pub mod statement;
pub mod stats;
pub mod status;
pub mod worker;

// Re-export main types
pub use coordinator::BulkLoader;
pub use reader::{CsvSource, Row};
pub use stats::LoadStats;
