//! # Plugin Module
//!
//! Ogni plugin è una trasformazione byte → byte fornita da un backend esterno.
//!
//! ## Sottomoduli:
//! - `spec`: richieste di plugin (`TransformSpec`) e merge delle opzioni
//! - `registry`: mappa nome → factory, risoluzione della catena
//! - `tool`: trasformazione generica basata su un tool a riga di comando
//! - `builtin`: factory per i backend predefiniti (gifsicle, jpegtran, ...)
//!
//! ## Catena:
//! I plugin vengono applicati in sequenza: ogni trasformazione riceve l'output
//! della precedente. Un plugin che non gestisce il formato corrente viene
//! saltato.

pub mod builtin;
pub mod registry;
pub mod spec;
pub mod tool;

pub use registry::{PluginRegistry, TransformFactory, DEFAULT_PLUGINS};
pub use spec::{merge_specs, OptionReader, PluginOptions, TransformSpec};
pub use tool::{ToolIo, ToolTransform};

use crate::error::{ImageminError, Result};
use crate::format::ImageKind;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// A resolved, runnable optimization step
#[async_trait]
pub trait Transform: Send + Sync {
    /// Plugin name, used in logs and error messages
    fn name(&self) -> &str;

    /// Whether this transform handles input of the given kind
    fn accepts(&self, kind: ImageKind) -> bool;

    /// Transforms that change the image format are exempt from the size guard
    fn converts_format(&self) -> bool {
        false
    }

    async fn apply(&self, input: &[u8]) -> Result<Vec<u8>>;
}

/// Ordered sequence of transforms applied left to right
#[derive(Clone, Default)]
pub struct TransformChain {
    transforms: Vec<Arc<dyn Transform>>,
}

impl TransformChain {
    pub fn new(transforms: Vec<Arc<dyn Transform>>) -> Self {
        Self { transforms }
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.transforms.iter().map(|t| t.name()).collect()
    }

    /// Run every transform in order over `input`
    pub async fn apply(&self, input: Vec<u8>) -> Result<Vec<u8>> {
        let mut current = input;

        for transform in &self.transforms {
            let kind = ImageKind::detect(&current);
            if !transform.accepts(kind) {
                debug!("{} skipped ({:?} input)", transform.name(), kind);
                continue;
            }

            let output = transform.apply(&current).await?;

            if output.is_empty() && !current.is_empty() {
                return Err(ImageminError::transform(transform.name(), "produced no output"));
            }

            if output.len() > current.len() && !transform.converts_format() {
                debug!(
                    "{} grew input from {} to {} bytes, keeping input",
                    transform.name(),
                    current.len(),
                    output.len()
                );
                continue;
            }

            current = output;
        }

        Ok(current)
    }
}

impl std::fmt::Debug for TransformChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-process transforms for exercising the pipeline without external tools

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Strips ASCII spaces; rejects input that starts with `CORRUPT`
    pub struct Squeeze {
        pub name: String,
        pub calls: Arc<AtomicUsize>,
    }

    impl Squeeze {
        pub fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl Transform for Squeeze {
        fn name(&self) -> &str {
            &self.name
        }

        fn accepts(&self, _kind: ImageKind) -> bool {
            true
        }

        async fn apply(&self, input: &[u8]) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if input.starts_with(b"CORRUPT") {
                return Err(ImageminError::transform(&self.name, "corrupt image data"));
            }
            Ok(input.iter().copied().filter(|b| *b != b' ').collect())
        }
    }

    /// Appends bytes; used to check the growth guard
    pub struct Bloat;

    #[async_trait]
    impl Transform for Bloat {
        fn name(&self) -> &str {
            "bloat"
        }

        fn accepts(&self, _kind: ImageKind) -> bool {
            true
        }

        async fn apply(&self, input: &[u8]) -> Result<Vec<u8>> {
            let mut out = input.to_vec();
            out.extend_from_slice(b"padding");
            Ok(out)
        }
    }

    /// Only accepts PNG input and records that it ran
    pub struct PngOnly {
        pub calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Transform for PngOnly {
        fn name(&self) -> &str {
            "png-only"
        }

        fn accepts(&self, kind: ImageKind) -> bool {
            kind == ImageKind::Png
        }

        async fn apply(&self, input: &[u8]) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(input.to_vec())
        }
    }

    /// Returns nothing
    pub struct Blank;

    #[async_trait]
    impl Transform for Blank {
        fn name(&self) -> &str {
            "blank"
        }

        fn accepts(&self, _kind: ImageKind) -> bool {
            true
        }

        async fn apply(&self, _input: &[u8]) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }
    }
}
