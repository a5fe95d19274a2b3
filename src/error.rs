use std::path::PathBuf;

use crate::importer::ImportState;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("header is missing required column `{0}`")]
    MissingColumn(&'static str),

    #[error("malformed row at line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },

    #[error("unparseable date {value:?}")]
    DateParse { value: String },

    #[error("datastore: {0}")]
    Datastore(#[from] sea_orm::DbErr),

    #[error("interrupted")]
    Interrupted,
}

impl ImportError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    /// Recoverable errors are counted and logged; the run continues.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::MalformedRow { .. } | Self::DateParse { .. })
    }
}

pub type ImportResult<T> = Result<T, ImportError>;

/// Terminal outcome of a run that reached the `Failed` state.
#[derive(Debug, thiserror::Error)]
#[error(
    "import failed while {state}{}: {source}",
    describe_origin(*line, imdb_title_id.as_deref(), name.as_deref())
)]
pub struct ImportFailure {
    pub state: ImportState,
    pub line: Option<u64>,
    pub imdb_title_id: Option<String>,
    /// Actor or director being resolved when the failure happened.
    pub name: Option<String>,
    #[source]
    pub source: ImportError,
}

impl ImportFailure {
    pub fn new(state: ImportState, source: ImportError) -> Self {
        Self { state, line: None, imdb_title_id: None, name: None, source }
    }

    pub fn at_row(mut self, line: u64, imdb_title_id: Option<&str>) -> Self {
        self.line = Some(line);
        self.imdb_title_id = imdb_title_id.filter(|id| !id.is_empty()).map(str::to_owned);
        self
    }

    pub fn at_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_owned());
        self
    }
}

fn describe_origin(line: Option<u64>, imdb_title_id: Option<&str>, name: Option<&str>) -> String {
    let mut parts = Vec::new();
    if let Some(line) = line {
        parts.push(format!("line {line}"));
    }
    if let Some(id) = imdb_title_id {
        parts.push(id.to_owned());
    }
    if let Some(name) = name {
        parts.push(format!("name {name:?}"));
    }
    if parts.is_empty() { String::new() } else { format!(" ({})", parts.join(", ")) }
}
