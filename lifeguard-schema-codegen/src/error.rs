//! Error types for codegen

use lifeguard_schema::SchemaError;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    /// Existing source could not be parsed; callers may fall back to a replace
    #[error("existing source does not parse at {line}:{column}: {message}")]
    SourceParse {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("no `LifeModel` struct with table_name = \"{table}\" found in existing source")]
    CodeRegionNotFound { table: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("generation failed: {0}")]
    Generation(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl CodegenError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CodegenError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<syn::Error> for CodegenError {
    fn from(err: syn::Error) -> Self {
        let start = err.span().start();
        CodegenError::SourceParse {
            line: start.line,
            column: start.column,
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CodegenError>;
