//! # Imagemin Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per i test
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tipi di errore custom e relativa categoria
//! - `format`: Riconoscimento del formato immagine dai byte
//! - `plugin`: Registry dei plugin, catena di trasformazioni, backend esterni
//! - `platform`: Ricerca dei tool esterni (PATH / `IMAGEMIN_TOOLS_DIR`)
//! - `file_manager`: Operazioni sui file e discovery immagini
//! - `optimizer`: Classificazione input ed esecuzione del batch
//! - `report`: Output su stdout/stderr
//! - `progress`: Spinner per la modalità batch
//!
//! ## Utilizzo:
//! ```ignore
//! use imagemin_cli::{BatchRunner, Config, InputClassifier, PluginRegistry, Reporter};
//!
//! let config = Config::default();
//! let chain = PluginRegistry::with_builtins().resolve(&config.plugins)?;
//! let plan = InputClassifier::new(&config).classify(false)?;
//! let runner = BatchRunner::new(Arc::new(chain), &config);
//! runner.run(plan, &mut Reporter::stdio(config.verbose)).await?;
//! ```

pub mod config;
pub mod error;
pub mod file_manager;
pub mod format;
pub mod optimizer;
pub mod platform;
pub mod plugin;
pub mod progress;
pub mod report;

pub use config::Config;
pub use error::{ErrorCategory, ImageminError};
pub use format::ImageKind;
pub use optimizer::{BatchRunner, InputClassifier};
pub use plugin::{PluginRegistry, Transform, TransformChain, TransformSpec};
pub use report::{Reporter, RunSummary};
