//! # Item Task Module
//!
//! Worker per l'ottimizzazione di un singolo `SourceItem`: carica i byte,
//! applica la catena e, in modalità directory, scrive il risultato.
//! Separato dal runner per poterlo eseguire su task tokio indipendenti.

use super::classifier::SourceItem;
use super::path_resolver::{DestinationClaims, PathResolver};
use crate::error::{ImageminError, Result};
use crate::file_manager::FileManager;
use crate::format::ImageKind;
use crate::plugin::TransformChain;
use crate::report::RunResult;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{debug, error};

/// Bytes before and after the chain
#[derive(Debug)]
pub struct Optimized {
    pub original_size: u64,
    pub input_kind: ImageKind,
    pub output: Vec<u8>,
}

/// Runs the chain over one item
#[derive(Clone)]
pub struct ItemTask {
    chain: Arc<TransformChain>,
}

impl ItemTask {
    pub fn new(chain: Arc<TransformChain>) -> Self {
        Self { chain }
    }

    /// Materialize an item's bytes
    pub async fn load(item: &SourceItem) -> Result<Vec<u8>> {
        match item {
            SourceItem::Buffer(bytes) => Ok(bytes.clone()),
            SourceItem::File { path, .. } => FileManager::read(path).await,
            SourceItem::Stdin => {
                let mut buffer = Vec::new();
                tokio::io::stdin().read_to_end(&mut buffer).await?;
                if buffer.is_empty() {
                    return Err(ImageminError::EmptyStdin);
                }
                Ok(buffer)
            }
        }
    }

    /// Load the item and run the chain over it
    pub async fn optimize(&self, item: &SourceItem) -> Result<Optimized> {
        let input = Self::load(item).await?;
        let original_size = input.len() as u64;
        let input_kind = ImageKind::detect(&input);

        debug!(
            "Optimizing {} ({:?}, {} bytes)",
            item.display_path().display(),
            input_kind,
            original_size
        );

        let output = self.chain.apply(input).await?;
        Ok(Optimized {
            original_size,
            input_kind,
            output,
        })
    }

    /// Batch-mode processing: never fails, the outcome is in the `RunResult`
    pub async fn process_into_directory(
        &self,
        item: SourceItem,
        root: &Path,
        claims: &DestinationClaims,
    ) -> RunResult {
        let source = item.display_path();
        let relative = match item {
            SourceItem::File { ref relative, .. } => relative.clone(),
            _ => PathBuf::from("stdin"),
        };

        match self.write_into_directory(&item, root, &relative, claims).await {
            Ok((destination, optimized)) => RunResult::ok(
                source,
                Some(destination),
                optimized.original_size,
                optimized.output.len() as u64,
            ),
            Err((original_size, e)) => {
                error!("Failed to minify {}: {}", source.display(), e);
                RunResult::failed(source, original_size, e.to_string())
            }
        }
    }

    async fn write_into_directory(
        &self,
        item: &SourceItem,
        root: &Path,
        relative: &Path,
        claims: &DestinationClaims,
    ) -> std::result::Result<(PathBuf, Optimized), (u64, ImageminError)> {
        let optimized = self.optimize(item).await.map_err(|e| (0, e))?;
        let destination = PathResolver::get_output_path(root, relative, optimized.input_kind, &optimized.output);

        claims
            .claim(&destination, &item.display_path())
            .map_err(|e| (optimized.original_size, e))?;

        FileManager::write(&destination, &optimized.output)
            .await
            .map_err(|e| (optimized.original_size, e))?;

        debug!("Wrote {}", destination.display());
        Ok((destination, optimized))
    }
}
