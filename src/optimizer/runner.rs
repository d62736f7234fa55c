//! # Batch Runner
//!
//! Orchestratore principale: esegue la catena su ogni sorgente e instrada il
//! risultato secondo la destinazione.
//!
//! ## Flusso:
//! 1. **Routing check**: stdout o file singolo accettano una sola sorgente;
//!    il controllo avviene dopo l'espansione e prima di qualsiasi lettura
//! 2. **Modalità singola**: un errore è l'errore dell'intero run
//! 3. **Modalità directory**: worker pool limitato da un semaforo; un file
//!    corrotto viene registrato e il batch continua
//! 4. **Report**: riepilogo su stdout, dettagli ed errori su stderr
//!
//! ## Gestione concorrenza:
//! - Semaforo con `workers` permessi
//! - Ogni task possiede i propri byte; condivide solo `Arc<TransformChain>`
//! - I risultati vengono raccolti nell'ordine di enumerazione

use super::classifier::{DestinationSpec, Plan, SourceItem};
use super::path_resolver::DestinationClaims;
use super::task::ItemTask;
use crate::config::Config;
use crate::error::{ImageminError, Result};
use crate::file_manager::FileManager;
use crate::plugin::TransformChain;
use crate::progress::Spinner;
use crate::report::{Reporter, RunResult, RunSummary};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info};

/// Executes a `Plan` with a resolved chain
pub struct BatchRunner {
    task: ItemTask,
    workers: usize,
    show_progress: bool,
}

impl BatchRunner {
    pub fn new(chain: Arc<TransformChain>, config: &Config) -> Self {
        Self {
            task: ItemTask::new(chain),
            workers: config.worker_count().max(1),
            show_progress: false,
        }
    }

    /// Show a stderr spinner during directory batches
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub async fn run<O, E>(&self, plan: Plan, reporter: &mut Reporter<O, E>) -> Result<RunSummary>
    where
        O: Write,
        E: Write,
    {
        let Plan {
            sources,
            destination,
        } = plan;

        match destination {
            DestinationSpec::Stdout => {
                let item = Self::single_source(sources, |count| ImageminError::MultipleToStdout { count })?;
                self.run_to_stdout(item, reporter).await
            }
            DestinationSpec::SingleFile(path) => {
                let item = Self::single_source(sources, |count| ImageminError::MultipleToFile {
                    path: path.clone(),
                    count,
                })?;
                self.run_to_file(item, &path, reporter).await
            }
            DestinationSpec::Directory { root, .. } => self.run_batch(sources, &root, reporter).await,
        }
    }

    fn single_source<F>(mut sources: Vec<SourceItem>, too_many: F) -> Result<SourceItem>
    where
        F: FnOnce(usize) -> ImageminError,
    {
        match sources.len() {
            0 => Err(ImageminError::NoInputFiles),
            1 => Ok(sources.remove(0)),
            count => Err(too_many(count)),
        }
    }

    async fn run_to_stdout<O: Write, E: Write>(
        &self,
        item: SourceItem,
        reporter: &mut Reporter<O, E>,
    ) -> Result<RunSummary> {
        let optimized = self.task.optimize(&item).await?;
        reporter.write_payload(&optimized.output)?;

        let result = RunResult::ok(
            item.display_path(),
            None,
            optimized.original_size,
            optimized.output.len() as u64,
        );
        reporter.report_single(&result)?;
        Ok(Self::summary_of(vec![result]))
    }

    async fn run_to_file<O: Write, E: Write>(
        &self,
        item: SourceItem,
        path: &Path,
        reporter: &mut Reporter<O, E>,
    ) -> Result<RunSummary> {
        let optimized = self.task.optimize(&item).await?;
        FileManager::write(path, &optimized.output).await?;
        info!("Wrote {}", path.display());

        let result = RunResult::ok(
            item.display_path(),
            Some(path.to_path_buf()),
            optimized.original_size,
            optimized.output.len() as u64,
        );
        reporter.report_single(&result)?;
        Ok(Self::summary_of(vec![result]))
    }

    async fn run_batch<O: Write, E: Write>(
        &self,
        sources: Vec<SourceItem>,
        root: &Path,
        reporter: &mut Reporter<O, E>,
    ) -> Result<RunSummary> {
        if sources.is_empty() {
            return Err(ImageminError::NoInputFiles);
        }

        tokio::fs::create_dir_all(root)
            .await
            .map_err(|source| ImageminError::Write {
                path: root.to_path_buf(),
                source,
            })?;

        info!("Minifying {} image(s) into {} with {} worker(s)", sources.len(), root.display(), self.workers);

        let spinner = if self.show_progress {
            Spinner::start("Minifying images", sources.len())
        } else {
            Spinner::hidden()
        };

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let claims = DestinationClaims::new();
        let mut handles = Vec::with_capacity(sources.len());

        for item in sources {
            let task = self.task.clone();
            let semaphore = Arc::clone(&semaphore);
            let claims = claims.clone();
            let root: PathBuf = root.to_path_buf();
            let progress = spinner.handle();

            handles.push(tokio::spawn(async move {
                let source = item.display_path();
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => task.process_into_directory(item, &root, &claims).await,
                    Err(e) => RunResult::failed(source, 0, e.to_string()),
                };
                progress.inc(1);
                result
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in futures::future::join_all(handles).await {
            match handle {
                Ok(result) => results.push(result),
                Err(e) => results.push(RunResult::failed(PathBuf::from("<task>"), 0, e.to_string())),
            }
        }
        spinner.finish();

        let summary = Self::summary_of(results);
        reporter.set_display_root(root);
        reporter.report_batch(&summary)?;

        debug!("Batch finished: {} ok, {} failed", summary.count, summary.failures);
        if summary.failures > 0 {
            return Err(ImageminError::BatchFailed {
                failed: summary.failures,
                total: summary.total(),
            });
        }

        Ok(summary)
    }

    fn summary_of(results: Vec<RunResult>) -> RunSummary {
        let mut summary = RunSummary::new();
        for result in results {
            summary.push(result);
        }
        summary
    }
}
