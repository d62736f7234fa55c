//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config`, costruita una sola volta in `main` e poi
//!   passata per riferimento a ogni componente
//! - Valida i parametri (workers, destinazioni in conflitto)
//! - Carica la configurazione da file JSON o da `--options`
//! - Normalizza i flag `--plugin.<nome>.<chiave>=<valore>` in `--plugin=<nome>.<chiave>=<valore>`
//!
//! ## Parametri di configurazione:
//! - `inputs`: path o glob da minificare (vuoto = stdin)
//! - `plugins`: plugin richiesti, con opzioni (vuoto = default)
//! - `out_dir`: directory di output (modalità batch)
//! - `out_file`: file di output singolo
//! - `recursive`: scende nelle sottodirectory
//! - `verbose`: report per file con percentuale risparmiata
//! - `workers`: numero di worker paralleli (default: numero di CPU)
//!
//! ## Esempio:
//! ```ignore
//! let config = Config {
//!     out_dir: Some(PathBuf::from("build")),
//!     recursive: true,
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use crate::plugin::TransformSpec;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Configuration for a minification run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Input paths or glob patterns; empty means stdin
    #[serde(skip)]
    pub inputs: Vec<PathBuf>,
    /// Requested plugins, in the order given
    pub plugins: Vec<TransformSpec>,
    /// Output directory for batch mode
    pub out_dir: Option<PathBuf>,
    /// Explicit single output file
    pub out_file: Option<PathBuf>,
    /// Walk directory inputs recursively
    pub recursive: bool,
    /// Report per-file savings
    pub verbose: bool,
    /// Number of parallel workers; `None` means one per CPU
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            plugins: Vec::new(),
            out_dir: None,
            out_file: None,
            recursive: false,
            verbose: false,
            workers: None,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.workers == Some(0) {
            return Err(anyhow::anyhow!("Number of workers must be greater than 0"));
        }

        if self.out_dir.is_some() && self.out_file.is_some() {
            return Err(anyhow::anyhow!("`--out-dir` and `--out-file` cannot be used together"));
        }

        if let Some(ref out_dir) = self.out_dir {
            if out_dir.exists() && !out_dir.is_dir() {
                return Err(anyhow::anyhow!("Output path is not a directory: {}", out_dir.display()));
            }
        }

        if let Some(ref out_file) = self.out_file {
            if out_file.is_dir() {
                return Err(anyhow::anyhow!("Output file is a directory: {}", out_file.display()));
            }
        }

        Ok(())
    }

    /// Effective worker count
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get)
    }

    /// Lay `other` over `self`: plugins are appended, set values replace
    pub fn overlay(&mut self, other: Config) {
        self.plugins.extend(other.plugins);
        if other.out_dir.is_some() {
            self.out_dir = other.out_dir;
        }
        if other.out_file.is_some() {
            self.out_file = other.out_file;
        }
        if other.workers.is_some() {
            self.workers = other.workers;
        }
        self.recursive |= other.recursive;
        self.verbose |= other.verbose;
    }

    /// Parse the inline JSON accepted by `--options`
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            anyhow::anyhow!(
                "`--options` should be valid JSON ({}).\n\nExample: --options='{{\"plugins\": [[\"webp\", {{\"quality\": 95}}]]}}'",
                e
            )
        })
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config {}: {}", path.display(), e))?;
        Ok(config)
    }
}

/// Rewrite `--plugin.<name>[.<key>[=<value>]]` into `--plugin=<name>[.<key>[=<value>]]`
///
/// clap cannot declare dynamic dotted flags, so they are folded into the
/// repeatable `--plugin` option while keeping their position among the other
/// plugin flags.
pub fn normalize_plugin_flags<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut seen_separator = false;

    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            if seen_separator {
                return arg;
            }
            if arg == "--" {
                seen_separator = true;
                return arg;
            }

            let rewritten = arg
                .to_str()
                .and_then(|text| text.strip_prefix("--plugin."))
                .filter(|rest| !rest.is_empty())
                .map(|rest| OsString::from(format!("--plugin={}", rest)));
            rewritten.unwrap_or(arg)
        })
        .collect()
}
