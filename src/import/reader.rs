//! Delimited-text input, grouped into fixed-size batches.
//!
//! Decoding is strictly sequential, so it runs on one blocking thread and
//! hands the header, then finished batches, to the driver through a channel
//! with room for a single item. While the driver waits for a connection slot
//! the reader can be at most one batch ahead.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{LoadError, LoadResult};

/// One decoded record: its fields in source order plus the line it started on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub line: u64,
    pub fields: Vec<String>,
}

impl Row {
    pub fn new(line: u64, fields: Vec<String>) -> Self {
        Self { line, fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Record decoder over any byte source.
pub struct CsvSource<R: Read> {
    reader: csv::Reader<R>,
    record: csv::StringRecord,
}

impl CsvSource<File> {
    pub fn open(path: &Path, delimiter: u8) -> LoadResult<Self> {
        let file = File::open(path).map_err(|source| LoadError::OpenSource {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_reader(file, delimiter))
    }
}

impl<R: Read> CsvSource<R> {
    pub fn from_reader(input: R, delimiter: u8) -> Self {
        // Row widths are checked against the header later, so the decoder
        // must not reject uneven records itself.
        let reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(input);

        Self {
            reader,
            record: csv::StringRecord::new(),
        }
    }

    /// Next record, `None` at clean end of input.
    pub fn next_row(&mut self) -> LoadResult<Option<Row>> {
        if !self.reader.read_record(&mut self.record)? {
            return Ok(None);
        }

        let line = self.record.position().map(|pos| pos.line()).unwrap_or(0);
        let fields = self.record.iter().map(str::to_string).collect();
        Ok(Some(Row::new(line, fields)))
    }

    /// Up to `size` consecutive records. An empty batch means end of input.
    pub fn next_batch(&mut self, size: usize) -> LoadResult<Vec<Row>> {
        let mut batch = Vec::with_capacity(size);
        while batch.len() < size {
            match self.next_row()? {
                Some(row) => batch.push(row),
                None => break,
            }
        }
        Ok(batch)
    }
}

/// What the batch reader hands to the driver.
#[derive(Debug)]
pub enum Input {
    /// The first record of the source, sent once before any batch.
    Header(Row),
    /// Up to `batch_size` data records, never empty.
    Batch(Vec<Row>),
}

/// Decode `source` on a blocking thread: the header first, then data
/// batches of `batch_size`.
///
/// The channel closes after the last non-empty batch. A decode error is
/// delivered as the final item.
pub fn spawn_batch_reader<R>(
    mut source: CsvSource<R>,
    batch_size: usize,
) -> (mpsc::Receiver<LoadResult<Input>>, JoinHandle<()>)
where
    R: Read + Send + 'static,
{
    let (tx, rx) = mpsc::channel(1);

    let handle = tokio::task::spawn_blocking(move || {
        let header = match source.next_row() {
            Ok(Some(header)) => Ok(Input::Header(header)),
            Ok(None) => return,
            Err(err) => Err(err),
        };
        let mut failed = header.is_err();
        if tx.blocking_send(header).is_err() || failed {
            return;
        }

        while !failed {
            let batch = match source.next_batch(batch_size) {
                Ok(batch) if batch.is_empty() => break,
                Ok(batch) => Ok(Input::Batch(batch)),
                Err(err) => Err(err),
            };

            failed = batch.is_err();
            if tx.blocking_send(batch).is_err() {
                log::trace!("batch reader stopped: driver went away");
                break;
            }
        }
    });

    (rx, handle)
}
