//! # External Tool Transform
//!
//! Esegue un tool a riga di comando come trasformazione byte → byte.
//!
//! ## Modalità di I/O:
//! - **Pipe**: input su stdin, output letto da stdout (gifsicle, jpegtran, svgo, ...)
//! - **Files**: input scritto in un file temporaneo, output letto dal file che il
//!   tool produce (optipng, cwebp, oxipng). Gli argomenti `{input}` e `{output}`
//!   vengono sostituiti con i path temporanei.

use super::Transform;
use crate::error::{ImageminError, Result};
use crate::format::ImageKind;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

pub const INPUT_PLACEHOLDER: &str = "{input}";
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// How bytes reach the tool and come back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolIo {
    Pipe,
    /// `output_ext` forces the output file extension (e.g. `webp`);
    /// `None` reuses the input's extension
    Files { output_ext: Option<&'static str> },
}

/// A transform backed by an external executable
#[derive(Debug, Clone)]
pub struct ToolTransform {
    name: String,
    program: PathBuf,
    args: Vec<String>,
    accepts: Vec<ImageKind>,
    io: ToolIo,
    converts: bool,
}

impl ToolTransform {
    pub fn new(
        name: impl Into<String>,
        program: PathBuf,
        args: Vec<String>,
        accepts: Vec<ImageKind>,
        io: ToolIo,
    ) -> Self {
        Self {
            name: name.into(),
            program,
            args,
            accepts,
            io,
            converts: false,
        }
    }

    pub fn converting(mut self) -> Self {
        self.converts = true;
        self
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    async fn run_piped(&self, input: &[u8]) -> Result<Vec<u8>> {
        debug!("Running {} {:?}", self.program.display(), self.args);
        let start_time = std::time::Instant::now();

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ImageminError::transform(&self.name, format!("failed to start: {}", e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ImageminError::transform(&self.name, "stdin unavailable"))?;

        let feed = async move {
            let written = stdin.write_all(input).await;
            drop(stdin);
            written
        };
        let (written, output) = tokio::join!(feed, child.wait_with_output());
        let output = output?;

        if let Err(e) = written {
            // The tool may exit before reading everything; its status says what happened.
            debug!("{} closed stdin early: {}", self.name, e);
        }

        if !output.status.success() {
            warn!("{} failed after {:?}", self.name, start_time.elapsed());
            return Err(self.failure(&output.status, &output.stderr));
        }

        debug!("{} completed in {:?}", self.name, start_time.elapsed());
        Ok(output.stdout)
    }

    async fn run_with_files(&self, input: &[u8], output_ext: Option<&'static str>) -> Result<Vec<u8>> {
        let workdir = tempfile::TempDir::new()?;
        let input_ext = ImageKind::detect(input).extension().unwrap_or("bin");
        let input_path = workdir.path().join(format!("input.{}", input_ext));
        let output_path = workdir
            .path()
            .join(format!("output.{}", output_ext.unwrap_or(input_ext)));

        tokio::fs::write(&input_path, input).await?;

        let args: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                arg.replace(INPUT_PLACEHOLDER, &input_path.to_string_lossy())
                    .replace(OUTPUT_PLACEHOLDER, &output_path.to_string_lossy())
            })
            .collect();

        debug!("Running {} {:?}", self.program.display(), args);
        let start_time = std::time::Instant::now();

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ImageminError::transform(&self.name, format!("failed to start: {}", e)))?;

        if !output.status.success() {
            warn!("{} failed after {:?}", self.name, start_time.elapsed());
            return Err(self.failure(&output.status, &output.stderr));
        }

        let bytes = tokio::fs::read(&output_path).await.map_err(|e| {
            ImageminError::transform(&self.name, format!("no output file produced: {}", e))
        })?;

        debug!("{} completed in {:?}", self.name, start_time.elapsed());
        Ok(bytes)
    }

    fn failure(&self, status: &std::process::ExitStatus, stderr: &[u8]) -> ImageminError {
        let stderr = String::from_utf8_lossy(stderr);
        let reason = match stderr.trim() {
            "" => format!("exited with {}", status),
            message => message.lines().take(5).collect::<Vec<_>>().join("\n"),
        };
        ImageminError::transform(&self.name, reason)
    }
}

#[async_trait]
impl Transform for ToolTransform {
    fn name(&self) -> &str {
        &self.name
    }

    fn accepts(&self, kind: ImageKind) -> bool {
        self.accepts.contains(&kind)
    }

    fn converts_format(&self) -> bool {
        self.converts
    }

    async fn apply(&self, input: &[u8]) -> Result<Vec<u8>> {
        match self.io {
            ToolIo::Pipe => self.run_piped(input).await,
            ToolIo::Files { output_ext } => self.run_with_files(input, output_ext).await,
        }
    }
}
