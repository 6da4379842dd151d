use std::path::PathBuf;

/// Failures reading the corpus. Fatal at startup: no partial corpus is served.
#[derive(Debug, thiserror::Error)]
pub enum CorpusLoadError {
    #[error("failed to read corpus at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV corpus at {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("malformed JSON corpus at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("corpus at {path} has no `title` column")]
    MissingTitleColumn { path: PathBuf },

    #[error("unsupported corpus format for {path} (expected .csv or .json)")]
    UnsupportedFormat { path: PathBuf },

    #[error("invalid id {value:?} on row {row}")]
    InvalidId { row: usize, value: String },

    #[error("duplicate item id {id} on row {row}")]
    DuplicateId { row: usize, id: u64 },
}

/// Faults inside the similarity index. Only ever observed by the facade.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    #[error("row {index} is out of range for an index of {len} rows")]
    OutOfRange { index: usize, len: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("number of recommendations must be at least 1")]
    InvalidCount,

    #[error("internal fault while answering query: {0}")]
    InternalFault(String),
}

impl From<IndexError> for QueryError {
    fn from(err: IndexError) -> Self {
        QueryError::InternalFault(err.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Corpus(#[from] CorpusLoadError),

    #[error("model snapshot error: {0}")]
    Snapshot(String),

    #[error("build task failed: {0}")]
    Task(String),
}
