//! # Path Resolution Module
//!
//! Centralizza il calcolo dei path di output in modalità directory: il path
//! relativo della sorgente viene riprodotto sotto la root di output, e
//! l'estensione cambia solo se la catena ha cambiato formato (es. conversione WebP).

use crate::error::{ImageminError, Result};
use crate::format::ImageKind;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Utility per calcolare i path di output in modo centralizzato
pub struct PathResolver;

impl PathResolver {
    /// Output path for a source with the given relative path
    ///
    /// `input_kind` is the kind detected before the chain ran; `output` is
    /// what the chain produced.
    pub fn get_output_path(root: &Path, relative: &Path, input_kind: ImageKind, output: &[u8]) -> PathBuf {
        let mut target = root.join(relative);
        let output_kind = ImageKind::detect(output);

        if output_kind != ImageKind::Unknown
            && output_kind != input_kind
            && output_kind != ImageKind::from_path(relative)
        {
            if let Some(ext) = output_kind.extension() {
                target.set_extension(ext);
                debug!("Output format changed to {:?}: {}", output_kind, target.display());
            }
        }

        target
    }
}

/// Output paths already taken during a batch
///
/// The classifier rejects duplicate relative paths up front, but a format
/// conversion can still map two sources (`a.png`, `a.jpg`) onto one name.
/// The first source to claim a path keeps it.
#[derive(Debug, Clone, Default)]
pub struct DestinationClaims {
    claimed: Arc<Mutex<HashMap<PathBuf, PathBuf>>>,
}

impl DestinationClaims {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `destination` for `source`
    pub fn claim(&self, destination: &Path, source: &Path) -> Result<()> {
        let mut claimed = self.claimed.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        match claimed.get(destination) {
            Some(owner) if owner.as_path() != source => Err(ImageminError::DestinationConflict {
                destination: destination.to_path_buf(),
                first: owner.clone(),
                second: source.to_path_buf(),
            }),
            Some(_) => Ok(()),
            None => {
                claimed.insert(destination.to_path_buf(), source.to_path_buf());
                Ok(())
            }
        }
    }
}
