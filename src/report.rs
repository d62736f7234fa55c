//! # Result Reporting Module
//!
//! Trasforma i risultati del runner nell'output osservabile.
//!
//! ## Canali:
//! - **stdout**: solo i byte ottimizzati (modalità singola) oppure la riga di
//!   riepilogo "`N` images minified" (modalità batch)
//! - **stderr**: righe verbose per file, totale risparmiato, elenco errori
//!
//! ## Statistiche tracciate:
//! - **count**: file scritti con successo
//! - **total_original / total_output**: byte prima e dopo
//! - **failures**: file falliti con il motivo

use crate::file_manager::FileManager;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Outcome of one source item
#[derive(Debug, Clone, PartialEq)]
pub enum ItemStatus {
    Ok,
    Failed(String),
}

/// Per-item record produced by the runner
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Source path, or `<stdin>`
    pub source: PathBuf,
    /// Where the bytes were written; `None` for stdout
    pub destination: Option<PathBuf>,
    pub original_size: u64,
    pub output_size: u64,
    pub status: ItemStatus,
}

impl RunResult {
    pub fn ok(source: PathBuf, destination: Option<PathBuf>, original_size: u64, output_size: u64) -> Self {
        Self {
            source,
            destination,
            original_size,
            output_size,
            status: ItemStatus::Ok,
        }
    }

    pub fn failed(source: PathBuf, original_size: u64, reason: String) -> Self {
        Self {
            source,
            destination: None,
            original_size,
            output_size: 0,
            status: ItemStatus::Failed(reason),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ItemStatus::Ok
    }

    /// Percentage saved, rounded to a whole number
    pub fn saved_percent(&self) -> i64 {
        FileManager::calculate_reduction(self.original_size, self.output_size).round() as i64
    }
}

/// Aggregate over a run
#[derive(Debug, Default)]
pub struct RunSummary {
    pub count: usize,
    pub total_original: u64,
    pub total_output: u64,
    pub failures: usize,
    pub results: Vec<RunResult>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: RunResult) {
        match result.status {
            ItemStatus::Ok => {
                self.count += 1;
                self.total_original += result.original_size;
                self.total_output += result.output_size;
            }
            ItemStatus::Failed(_) => self.failures += 1,
        }
        self.results.push(result);
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn bytes_saved(&self) -> u64 {
        self.total_original.saturating_sub(self.total_output)
    }

    pub fn format_summary(&self) -> String {
        let noun = if self.count == 1 { "image" } else { "images" };
        format!("{} {} minified", self.count, noun)
    }

    pub fn format_savings(&self) -> String {
        format!(
            "Total saved: {} ({:.0}%)",
            FileManager::format_size(self.bytes_saved()),
            FileManager::calculate_reduction(self.total_original, self.total_output)
        )
    }
}

/// Writes results to an output and an error stream
pub struct Reporter<O: Write, E: Write> {
    out: O,
    err: E,
    verbose: bool,
    /// Root that destination paths are shown relative to
    display_root: Option<PathBuf>,
}

impl Reporter<io::Stdout, io::Stderr> {
    pub fn stdio(verbose: bool) -> Self {
        Self::new(io::stdout(), io::stderr(), verbose)
    }
}

impl<O: Write, E: Write> Reporter<O, E> {
    pub fn new(out: O, err: E, verbose: bool) -> Self {
        Self {
            out,
            err,
            verbose,
            display_root: None,
        }
    }

    pub fn set_display_root(&mut self, root: &Path) {
        self.display_root = Some(root.to_path_buf());
    }

    /// Optimized bytes, nothing else, on the output stream
    pub fn write_payload(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.out.write_all(bytes)?;
        self.out.flush()
    }

    /// Report for a single stdout/file item
    pub fn report_single(&mut self, result: &RunResult) -> io::Result<()> {
        if self.verbose {
            let line = self.format_item(result);
            writeln!(self.err, "{}", line)?;
        }
        Ok(())
    }

    /// Report for a directory batch
    pub fn report_batch(&mut self, summary: &RunSummary) -> io::Result<()> {
        for result in &summary.results {
            match result.status {
                ItemStatus::Ok if self.verbose => {
                    let line = self.format_item(result);
                    writeln!(self.err, "{}", line)?;
                }
                ItemStatus::Failed(ref reason) => {
                    writeln!(self.err, "{}: {}", result.source.display(), reason)?;
                }
                _ => {}
            }
        }

        if self.verbose && summary.count > 0 {
            writeln!(self.err, "{}", summary.format_savings())?;
        }

        writeln!(self.out, "{}", summary.format_summary())?;
        self.out.flush()
    }

    pub fn format_item(&self, result: &RunResult) -> String {
        let shown = result
            .destination
            .as_deref()
            .map(|dest| {
                self.display_root
                    .as_deref()
                    .and_then(|root| dest.strip_prefix(root).ok())
                    .unwrap_or(dest)
                    .to_path_buf()
            })
            .unwrap_or_else(|| result.source.clone());

        format!(
            "{}: {} -> {} (saved {}%)",
            shown.display(),
            FileManager::format_size(result.original_size),
            FileManager::format_size(result.output_size),
            result.saved_percent()
        )
    }

    pub fn into_parts(self) -> (O, E) {
        (self.out, self.err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary_with(results: Vec<RunResult>) -> RunSummary {
        let mut summary = RunSummary::new();
        for result in results {
            summary.push(result);
        }
        summary
    }

    #[test]
    fn test_summary_counts_only_successes() {
        let summary = summary_with(vec![
            RunResult::ok("a.png".into(), Some("build/a.png".into()), 100, 60),
            RunResult::failed("b.png".into(), 50, "corrupt".into()),
            RunResult::ok("c.png".into(), Some("build/c.png".into()), 100, 100),
        ]);

        assert_eq!(summary.count, 2);
        assert_eq!(summary.failures, 1);
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.total_original, 200);
        assert_eq!(summary.bytes_saved(), 40);
        assert_eq!(summary.format_summary(), "2 images minified");
    }

    #[test]
    fn test_singular_summary() {
        let summary = summary_with(vec![RunResult::ok("a.png".into(), None, 10, 5)]);
        assert_eq!(summary.format_summary(), "1 image minified");
    }

    #[test]
    fn test_saved_percent_rounds() {
        let result = RunResult::ok("a.png".into(), None, 3, 2);
        assert_eq!(result.saved_percent(), 33);
        let result = RunResult::ok("a.png".into(), None, 8, 3);
        assert_eq!(result.saved_percent(), 63);
    }

    #[test]
    fn test_batch_report_streams() {
        let summary = summary_with(vec![
            RunResult::ok("img/a.png".into(), Some("build/icons/a.png".into()), 200, 100),
            RunResult::failed("img/b.png".into(), 10, "png-only failed: bad data".into()),
        ]);

        let mut reporter = Reporter::new(Vec::new(), Vec::new(), true);
        reporter.set_display_root(Path::new("build"));
        reporter.report_batch(&summary).unwrap();
        let (out, err) = reporter.into_parts();
        let out = String::from_utf8(out).unwrap();
        let err = String::from_utf8(err).unwrap();

        assert_eq!(out, "1 image minified\n");
        assert!(err.contains("icons/a.png: 200 B -> 100 B (saved 50%)"));
        assert!(err.contains("img/b.png: png-only failed: bad data"));
        assert!(err.contains("Total saved: 100 B (50%)"));
    }

    #[test]
    fn test_quiet_batch_lists_only_failures() {
        let summary = summary_with(vec![
            RunResult::ok("a.png".into(), Some("build/a.png".into()), 200, 100),
            RunResult::failed("b.png".into(), 10, "broken".into()),
        ]);

        let mut reporter = Reporter::new(Vec::new(), Vec::new(), false);
        reporter.report_batch(&summary).unwrap();
        let (_, err) = reporter.into_parts();
        let err = String::from_utf8(err).unwrap();

        assert_eq!(err, "b.png: broken\n");
    }

    #[test]
    fn test_payload_is_exclusive() {
        let mut reporter = Reporter::new(Vec::new(), Vec::new(), true);
        reporter.write_payload(b"\x89PNG").unwrap();
        reporter
            .report_single(&RunResult::ok("<stdin>".into(), None, 10, 4))
            .unwrap();
        let (out, err) = reporter.into_parts();

        assert_eq!(out, b"\x89PNG");
        assert_eq!(String::from_utf8(err).unwrap(), "<stdin>: 10 B -> 4 B (saved 60%)\n");
    }
}
