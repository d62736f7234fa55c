//! # Optimizer Module
//!
//! Separa le responsabilità della pipeline in sottomoduli:
//! - `classifier`: sorgenti e destinazione a partire dagli argomenti
//! - `runner`: orchestratore (modalità singola e batch)
//! - `task`: worker per un singolo elemento
//! - `path_resolver`: logica di calcolo path centralizzata

pub mod classifier;
pub mod path_resolver;
pub mod runner;
pub mod task;

pub use classifier::{DestinationSpec, InputClassifier, Plan, SourceItem};
pub use path_resolver::PathResolver;
pub use runner::BatchRunner;
pub use task::{ItemTask, Optimized};
