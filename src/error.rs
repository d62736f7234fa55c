//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce `ImageminError` enum per categorizzare tutti gli errori possibili
//! - Fornisce messaggi di errore leggibili, con suggerimenti di rimedio
//! - Integra con `thiserror` per automatic error conversion
//!
//! ## Categorie di errori:
//! - **Configuration**: plugin sconosciuto, tool mancante, opzioni invalide
//! - **Input**: nessun input, nessun file valido
//! - **Routing**: più file verso una destinazione singola (stdout o file),
//!   stdin verso una directory, due sorgenti con lo stesso path di output
//! - **Transform**: il backend rifiuta i byte, errori di I/O su un singolo file
//!
//! ## Politica:
//! - Gli errori Configuration e Routing sono sempre fatali e vengono rilevati
//!   prima di qualsiasi trasformazione
//! - Gli errori Transform sono isolati per file in modalità batch
//!
//! ## Esempio:
//! ```ignore
//! if !registry.contains(name) {
//!     return Err(ImageminError::UnknownPlugin { name, remediation });
//! }
//! ```

use std::path::PathBuf;

/// Custom error types for image minification
#[derive(thiserror::Error, Debug)]
pub enum ImageminError {
    #[error("Unknown plugin: {name}\n\n{remediation}")]
    UnknownPlugin { name: String, remediation: String },

    #[error("Plugin `{plugin}` needs `{tool}`, which was not found.\n\nYou can install it with:\n\n  $ {install}")]
    MissingTool {
        plugin: String,
        tool: String,
        install: String,
    },

    #[error("Invalid options for plugin `{plugin}`: {reason}")]
    InvalidOptions { plugin: String, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Specify at least one file path")]
    NoInput,

    #[error("No input received on stdin")]
    EmptyStdin,

    #[error("No input files")]
    NoInputFiles,

    #[error("Cannot write multiple files to stdout, specify `--out-dir`")]
    MultipleToStdout { count: usize },

    #[error("Cannot write multiple files to `{}`, specify `--out-dir`", path.display())]
    MultipleToFile { path: PathBuf, count: usize },

    #[error("Cannot write stdin to a directory, use `--out-file` or redirect stdout")]
    StdinToDirectory,

    #[error(
        "`{}` and `{}` would both be written to `{}`",
        first.display(),
        second.display(),
        destination.display()
    )]
    DestinationConflict {
        destination: PathBuf,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("{plugin} failed: {reason}")]
    Transform { plugin: String, reason: String },

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{failed} of {total} images failed to minify")]
    BatchFailed { failed: usize, total: usize },
}

/// Coarse classification used when deciding whether a failure can be isolated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Routing,
    Transform,
}

impl ImageminError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnknownPlugin { .. }
            | Self::MissingTool { .. }
            | Self::InvalidOptions { .. }
            | Self::Config(_) => ErrorCategory::Configuration,
            Self::NoInput | Self::EmptyStdin | Self::NoInputFiles => ErrorCategory::Input,
            Self::MultipleToStdout { .. }
            | Self::MultipleToFile { .. }
            | Self::StdinToDirectory
            | Self::DestinationConflict { .. } => ErrorCategory::Routing,
            Self::Transform { .. }
            | Self::Read { .. }
            | Self::Write { .. }
            | Self::Io(_)
            | Self::BatchFailed { .. } => ErrorCategory::Transform,
        }
    }

    pub(crate) fn invalid_options(plugin: &str, reason: impl Into<String>) -> Self {
        Self::InvalidOptions {
            plugin: plugin.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn transform(plugin: &str, reason: impl Into<String>) -> Self {
        Self::Transform {
            plugin: plugin.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = ImageminError> = std::result::Result<T, E>;
