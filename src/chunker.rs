use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use csv::{ReaderBuilder, StringRecord};
use tracing::warn;

use crate::{
    error::{ImportError, ImportResult},
    models::{FilmRow, REQUIRED_COLUMNS},
};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum MalformedRowPolicy {
    #[default]
    Skip,
    Abort,
}

#[derive(Clone, Debug)]
pub struct Row {
    /// 1-based line in the source file, header included.
    pub line: u64,
    pub record: StringRecord,
}

impl Row {
    pub fn parse(&self, headers: &StringRecord) -> ImportResult<FilmRow> {
        self.record.deserialize(Some(headers)).map_err(|err| ImportError::MalformedRow {
            line: self.line,
            reason: err.to_string(),
        })
    }
}

#[derive(Clone, Debug)]
pub struct RowBatch {
    /// 1-based batch number.
    pub index: u64,
    pub rows: Vec<Row>,
}

impl RowBatch {
    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Streaming batch reader for the input CSV. The file is read once, front
/// to back; the header is parsed up front and kept apart from the data rows,
/// and each call to `next` materializes at most `batch_size` records.
pub struct LineChunker {
    reader: csv::Reader<File>,
    headers: StringRecord,
    batch_size: usize,
    policy: MalformedRowPolicy,
    limit: Option<u64>,
    yielded: u64,
    malformed: u64,
    batches: u64,
    done: bool,
}

impl LineChunker {
    pub fn open(path: &Path, batch_size: usize, policy: MalformedRowPolicy) -> ImportResult<Self> {
        let file = File::open(path).map_err(|err| ImportError::io(path, err))?;
        let mut reader = ReaderBuilder::new().flexible(true).from_reader(file);

        let headers = reader.headers()?.clone();
        for column in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == column) {
                return Err(ImportError::MissingColumn(column));
            }
        }

        Ok(Self {
            reader,
            headers,
            batch_size: batch_size.max(1),
            policy,
            limit: None,
            yielded: 0,
            malformed: 0,
            batches: 0,
            done: false,
        })
    }

    /// Stop after `limit` data rows.
    pub fn with_row_limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit;
        self
    }

    pub fn headers(&self) -> &StringRecord {
        &self.headers
    }

    pub fn malformed(&self) -> u64 {
        self.malformed
    }

    fn reject(&mut self, line: u64, reason: String) -> ImportResult<()> {
        match self.policy {
            MalformedRowPolicy::Skip => {
                self.malformed += 1;
                warn!(line, %reason, "skipping malformed row");
                Ok(())
            },
            MalformedRowPolicy::Abort => Err(ImportError::MalformedRow { line, reason }),
        }
    }

    fn limit_reached(&self) -> bool {
        self.limit.is_some_and(|limit| self.yielded >= limit)
    }
}

impl Iterator for LineChunker {
    type Item = ImportResult<RowBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut rows = Vec::with_capacity(self.batch_size);
        while rows.len() < self.batch_size {
            if self.limit_reached() {
                self.done = true;
                break;
            }

            let mut record = StringRecord::new();
            match self.reader.read_record(&mut record) {
                Ok(true) => {},
                Ok(false) => {
                    self.done = true;
                    break;
                },
                Err(err) if matches!(err.kind(), csv::ErrorKind::Utf8 { .. }) => {
                    let line = err.position().map_or(0, |p| p.line());
                    if let Err(err) = self.reject(line, err.to_string()) {
                        self.done = true;
                        return Some(Err(err));
                    }
                    continue;
                },
                Err(err) => {
                    self.done = true;
                    return Some(Err(err.into()));
                },
            }

            let line = record.position().map_or(0, |p| p.line());
            if record.len() != self.headers.len() {
                let reason =
                    format!("expected {} columns, found {}", self.headers.len(), record.len());
                if let Err(err) = self.reject(line, reason) {
                    self.done = true;
                    return Some(Err(err));
                }
                continue;
            }

            self.yielded += 1;
            rows.push(Row { line, record });
        }

        if rows.is_empty() {
            return None;
        }

        self.batches += 1;
        Some(Ok(RowBatch { index: self.batches, rows }))
    }
}

/// Number of data lines after the header, used to size progress output.
/// Quoted fields with embedded newlines make this an upper bound.
pub fn count_data_lines(path: &Path) -> ImportResult<u64> {
    let file = File::open(path).map_err(|err| ImportError::io(path, err))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();
    let mut lines = 0u64;
    loop {
        buf.clear();
        let read = reader.read_until(b'\n', &mut buf).map_err(|err| ImportError::io(path, err))?;
        if read == 0 {
            break;
        }
        if buf.iter().any(|b| !b.is_ascii_whitespace()) {
            lines += 1;
        }
    }
    Ok(lines.saturating_sub(1))
}
