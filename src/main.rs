//! # Imagemin - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing` (su stderr)
//! - Costruzione della configurazione: file, `--options`, flag CLI
//! - Risoluzione dei plugin prima di qualsiasi operazione sui file
//! - Avvio del runner e propagazione dell'errore come exit code
//!
//! ## Esempio di utilizzo:
//! ```bash
//! imagemin images/* --out-dir=build
//! imagemin foo.png > foo-optimized.png
//! cat foo.png | imagemin --plugin.pngquant.quality=0.5 > out.png
//! ```

use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use imagemin_cli::config::normalize_plugin_flags;
use imagemin_cli::report::Reporter;
use imagemin_cli::{BatchRunner, Config, ImageminError, InputClassifier, PluginRegistry, TransformSpec};

#[derive(Parser)]
#[command(name = "imagemin")]
#[command(about = "Minify images seamlessly")]
struct Args {
    /// Files, directories or glob patterns to minify (stdin when omitted)
    inputs: Vec<PathBuf>,

    /// Plugin to use, optionally with an option: `name` or `name.key=value`
    #[arg(short, long = "plugin", value_name = "NAME[.KEY=VALUE]")]
    plugins: Vec<String>,

    /// Output directory
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Output file for a single input
    #[arg(long, conflicts_with = "out_dir")]
    out_file: Option<PathBuf>,

    /// Walk directories recursively
    #[arg(short, long)]
    recursive: bool,

    /// Report the savings of each file
    #[arg(short, long)]
    verbose: bool,

    /// Number of parallel workers (default: number of CPUs)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Inline JSON configuration, e.g. '{"plugins": [["webp", {"quality": 95}]]}'
    #[arg(long, value_name = "JSON")]
    options: Option<String>,

    /// JSON configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

impl Args {
    /// Layer the configuration: file, then `--options`, then flags
    async fn into_config(self) -> Result<Config> {
        let mut config = match self.config {
            Some(ref path) => Config::from_file(path).await?,
            None => Config::default(),
        };

        if let Some(ref json) = self.options {
            config.overlay(Config::from_json(json)?);
        }

        let plugins = self
            .plugins
            .iter()
            .map(|raw| TransformSpec::parse_flag(raw))
            .collect::<Result<Vec<_>, _>>()?;

        config.overlay(Config {
            inputs: Vec::new(),
            plugins,
            out_dir: self.out_dir,
            out_file: self.out_file,
            recursive: self.recursive,
            verbose: self.verbose,
            workers: self.workers,
        });
        config.inputs = self.inputs;

        config.validate()?;
        Ok(config)
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(args: Args) -> Result<()> {
    let config = args.into_config().await?;
    debug!("Configuration: {}", serde_json::to_string(&config)?);

    // Unknown plugins must fail before any input is touched
    let chain = PluginRegistry::with_builtins().resolve(&config.plugins)?;
    if chain.is_empty() {
        warn!("No optimizers available; output is unchanged");
    } else {
        info!("Using {} plugin(s): {:?}", chain.len(), chain);
    }

    let plan = InputClassifier::new(&config).classify(std::io::stdin().is_terminal())?;

    let runner = BatchRunner::new(Arc::new(chain), &config).with_progress(true);
    let mut reporter = Reporter::stdio(config.verbose);
    runner.run(plan, &mut reporter).await?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_from(normalize_plugin_flags(std::env::args_os()));
    init_logging(args.verbose);

    let result = run(args).await;
    if let Err(ref e) = result {
        if let Some(err) = e.downcast_ref::<ImageminError>() {
            debug!("Run failed ({:?} error)", err.category());
        }
    }

    result
}
