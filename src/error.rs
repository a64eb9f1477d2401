use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal compile failures. Everything else in LACON degrades to literal
/// passthrough or a best-effort parse; only these abort the compile.
#[derive(Error, Debug, Diagnostic)]
pub enum LaconError {
    #[error("Circular import detected: {}", path.display())]
    #[diagnostic(
        code(lacon::circular_import),
        help("This file is already being compiled further up the import chain: {cycle}")
    )]
    CircularImport { path: PathBuf, cycle: String },

    #[error("File not found: {}", path.display())]
    #[diagnostic(
        code(lacon::file_not_found),
        help("The import path is resolved against the importing file's directory.")
    )]
    FileNotFound { path: PathBuf },

    #[error("Failed to read {}", path.display())]
    #[diagnostic(code(lacon::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize compiled document")]
    #[diagnostic(code(lacon::serialize))]
    Serialize(#[from] serde_json::Error),
}
