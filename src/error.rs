use std::path::PathBuf;
use thiserror::Error;

/// Fatal input problems. Any of these stops the run before rendering.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Input workbook not found: {path:?}")]
    SourceMissing { path: PathBuf },

    #[error("Sheet '{sheet}' not found in workbook (available: {})", available.join(", "))]
    SheetMissing { sheet: String, available: Vec<String> },

    #[error("Workbook {path:?} contains no sheets")]
    EmptyWorkbook { path: PathBuf },

    #[error("Failed to read workbook {path:?}: {source}")]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error(
        "Missing one or more required columns in '{sheet}' sheet: {required:?} (missing: {missing:?})"
    )]
    MissingColumns {
        sheet: String,
        required: Vec<String>,
        missing: Vec<String>,
    },

    #[error("Sheet '{sheet}' needs at least {needed} columns, found {found}")]
    TooFewColumns {
        sheet: String,
        needed: usize,
        found: usize,
    },
}

pub type DataResult<T> = Result<T, DataError>;

/// Failures while turning prepared layers into the HTML document.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Failed to serialize map layers: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to write {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
