//! # Input Classifier
//!
//! Decide, dagli argomenti posizionali e dai flag, l'insieme delle sorgenti e la
//! destinazione. Tutta l'espansione delle directory avviene qui, prima di
//! qualsiasi trasformazione, così la scelta singolo/multiplo è deterministica.
//!
//! ## Regole:
//! 1. Nessun argomento + stdin interattivo → errore "Specify at least one file path"
//! 2. Nessun argomento + stdin in pipe → sorgente stdin, destinazione stdout
//!    (o `--out-file`)
//! 3. File regolare → passa invariato
//! 4. Directory → espansa nei file immagine (ricorsiva solo con `--recursive`)
//! 5. Glob non espanso dalla shell → espanso con `glob`
//! 6. Path inesistente → warning, escluso; insieme vuoto → "No input files"
//! 7. Stdin non può andare in una directory; due sorgenti con lo stesso path
//!    di output sono un errore di routing

use crate::config::Config;
use crate::error::{ImageminError, Result};
use crate::file_manager::FileManager;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One unit of work
#[derive(Debug, Clone, PartialEq)]
pub enum SourceItem {
    /// Bytes already in memory
    Buffer(Vec<u8>),
    /// Read all of stdin when the item runs
    Stdin,
    /// A regular file; `relative` is its path under an output directory
    File { path: PathBuf, relative: PathBuf },
}

impl SourceItem {
    pub fn file(path: impl Into<PathBuf>, relative: impl Into<PathBuf>) -> Self {
        Self::File {
            path: path.into(),
            relative: relative.into(),
        }
    }

    /// Path used in reports
    pub fn display_path(&self) -> PathBuf {
        match self {
            Self::File { path, .. } => path.clone(),
            Self::Buffer(_) | Self::Stdin => PathBuf::from("<stdin>"),
        }
    }
}

/// Where results go
#[derive(Debug, Clone, PartialEq)]
pub enum DestinationSpec {
    Stdout,
    SingleFile(PathBuf),
    Directory { root: PathBuf, recursive: bool },
}

/// Sources plus destination, fixed before any work starts
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub sources: Vec<SourceItem>,
    pub destination: DestinationSpec,
}

/// Turns raw inputs into a `Plan`
pub struct InputClassifier<'a> {
    config: &'a Config,
}

impl<'a> InputClassifier<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    pub fn classify(&self, stdin_is_terminal: bool) -> Result<Plan> {
        let destination = self.destination();

        if self.config.inputs.is_empty() {
            if stdin_is_terminal {
                return Err(ImageminError::NoInput);
            }
            if let DestinationSpec::Directory { .. } = destination {
                return Err(ImageminError::StdinToDirectory);
            }
            return Ok(Plan {
                sources: vec![SourceItem::Stdin],
                destination,
            });
        }

        let mut sources = Vec::new();
        for input in &self.config.inputs {
            self.collect(input, &mut sources)?;
        }

        if sources.is_empty() {
            return Err(ImageminError::NoInputFiles);
        }

        if let DestinationSpec::Directory { ref root, .. } = destination {
            sources = Self::check_destinations(sources, root)?;
        }

        debug!("Classified {} source(s) for {:?}", sources.len(), destination);
        Ok(Plan {
            sources,
            destination,
        })
    }

    fn destination(&self) -> DestinationSpec {
        match (&self.config.out_dir, &self.config.out_file) {
            (Some(root), _) => DestinationSpec::Directory {
                root: root.clone(),
                recursive: self.config.recursive,
            },
            (None, Some(file)) => DestinationSpec::SingleFile(file.clone()),
            (None, None) => DestinationSpec::Stdout,
        }
    }

    fn collect(&self, input: &Path, sources: &mut Vec<SourceItem>) -> Result<()> {
        if input.is_file() {
            sources.push(Self::single_file(input));
            return Ok(());
        }

        if input.is_dir() {
            for (path, relative) in FileManager::expand_directory(input, self.config.recursive)? {
                sources.push(SourceItem::File { path, relative });
            }
            return Ok(());
        }

        let pattern = input.to_string_lossy();
        if is_glob(&pattern) {
            let matches = expand_glob(&pattern);
            if matches.is_empty() {
                warn!("`{}` does not match any file", pattern);
            }
            for path in matches {
                if path.is_dir() {
                    for (path, relative) in FileManager::expand_directory(&path, self.config.recursive)? {
                        sources.push(SourceItem::File { path, relative });
                    }
                } else {
                    sources.push(Self::single_file(&path));
                }
            }
            return Ok(());
        }

        warn!("`{}` does not exist", input.display());
        Ok(())
    }

    /// Drop repeated sources and reject two sources mapping to one output path
    fn check_destinations(sources: Vec<SourceItem>, root: &Path) -> Result<Vec<SourceItem>> {
        let mut owners: HashMap<PathBuf, PathBuf> = HashMap::new();
        let mut unique = Vec::with_capacity(sources.len());

        for item in sources {
            if let SourceItem::File { ref path, ref relative } = item {
                match owners.get(relative) {
                    Some(owner) if owner == path => {
                        debug!("Skipping repeated input {}", path.display());
                        continue;
                    }
                    Some(owner) => {
                        return Err(ImageminError::DestinationConflict {
                            destination: root.join(relative),
                            first: owner.clone(),
                            second: path.clone(),
                        });
                    }
                    None => {
                        owners.insert(relative.clone(), path.clone());
                    }
                }
            }
            unique.push(item);
        }

        Ok(unique)
    }

    fn single_file(path: &Path) -> SourceItem {
        let relative = path
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| path.to_path_buf());
        SourceItem::file(path, relative)
    }
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

fn expand_glob(pattern: &str) -> Vec<PathBuf> {
    match glob::glob(pattern) {
        Ok(paths) => paths
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!("Cannot read {}: {}", e.path().display(), e.error());
                    None
                }
            })
            .collect(),
        Err(e) => {
            warn!("Invalid glob `{}`: {}", pattern, e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) -> PathBuf {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"data").unwrap();
        path
    }

    fn config_for(inputs: Vec<PathBuf>) -> Config {
        Config {
            inputs,
            workers: Some(1),
            ..Default::default()
        }
    }

    #[test]
    fn test_no_args_on_terminal_fails() {
        let config = config_for(vec![]);
        let err = InputClassifier::new(&config).classify(true).unwrap_err();
        assert!(matches!(err, ImageminError::NoInput));
        assert_eq!(err.to_string(), "Specify at least one file path");
    }

    #[test]
    fn test_no_args_reads_stdin() {
        let config = config_for(vec![]);
        let plan = InputClassifier::new(&config).classify(false).unwrap();
        assert_eq!(plan.sources, vec![SourceItem::Stdin]);
        assert_eq!(plan.destination, DestinationSpec::Stdout);
    }

    #[test]
    fn test_stdin_cannot_target_directory() {
        let mut config = config_for(vec![]);
        config.out_dir = Some(PathBuf::from("build"));
        let err = InputClassifier::new(&config).classify(false).unwrap_err();
        assert!(matches!(err, ImageminError::StdinToDirectory));

        let mut config = config_for(vec![]);
        config.out_file = Some(PathBuf::from("min.png"));
        let plan = InputClassifier::new(&config).classify(false).unwrap();
        assert_eq!(plan.sources, vec![SourceItem::Stdin]);
        assert_eq!(plan.destination, DestinationSpec::SingleFile(PathBuf::from("min.png")));
    }

    #[test]
    fn test_same_named_files_conflict_in_directory_mode() {
        let dir = TempDir::new().unwrap();
        let first = touch(dir.path(), "a/x.png");
        let second = touch(dir.path(), "b/x.png");

        let mut config = config_for(vec![first.clone(), second.clone()]);
        config.out_dir = Some(dir.path().join("build"));
        let err = InputClassifier::new(&config).classify(true).unwrap_err();

        match err {
            ImageminError::DestinationConflict {
                destination,
                first: kept,
                second: rejected,
            } => {
                assert_eq!(destination, dir.path().join("build/x.png"));
                assert_eq!(kept, first);
                assert_eq!(rejected, second);
            }
            other => panic!("expected DestinationConflict, got {:?}", other),
        }
    }

    #[test]
    fn test_repeated_file_is_listed_once() {
        let dir = TempDir::new().unwrap();
        let file = touch(dir.path(), "a.png");

        let mut config = config_for(vec![file.clone(), file, dir.path().to_path_buf()]);
        config.out_dir = Some(dir.path().join("build"));
        let plan = InputClassifier::new(&config).classify(true).unwrap();
        assert_eq!(plan.sources.len(), 1);
    }

    #[test]
    fn test_file_passes_through_with_name_as_relative() {
        let dir = TempDir::new().unwrap();
        let file = touch(dir.path(), "nested/photo.jpg");

        let config = config_for(vec![file.clone()]);
        let plan = InputClassifier::new(&config).classify(true).unwrap();
        assert_eq!(plan.sources, vec![SourceItem::file(file, "photo.jpg")]);
    }

    #[test]
    fn test_explicit_file_is_not_filtered_by_extension() {
        let dir = TempDir::new().unwrap();
        let file = touch(dir.path(), "image.bin");

        let config = config_for(vec![file]);
        let plan = InputClassifier::new(&config).classify(true).unwrap();
        assert_eq!(plan.sources.len(), 1);
    }

    #[test]
    fn test_directory_expansion_respects_recursive_flag() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.png");
        touch(dir.path(), "sub/b.png");

        let mut config = config_for(vec![dir.path().to_path_buf()]);
        config.out_dir = Some(dir.path().join("build"));
        let plan = InputClassifier::new(&config).classify(true).unwrap();
        assert_eq!(plan.sources.len(), 1);

        config.recursive = true;
        let plan = InputClassifier::new(&config).classify(true).unwrap();
        let relatives: Vec<PathBuf> = plan
            .sources
            .iter()
            .map(|s| match s {
                SourceItem::File { relative, .. } => relative.clone(),
                other => panic!("unexpected source {:?}", other),
            })
            .collect();
        assert_eq!(relatives, vec![PathBuf::from("a.png"), PathBuf::from("sub/b.png")]);
        assert_eq!(
            plan.destination,
            DestinationSpec::Directory {
                root: dir.path().join("build"),
                recursive: true
            }
        );
    }

    #[test]
    fn test_missing_path_is_skipped() {
        let dir = TempDir::new().unwrap();
        let file = touch(dir.path(), "a.png");

        let config = config_for(vec![dir.path().join("ghost.png"), file]);
        let plan = InputClassifier::new(&config).classify(true).unwrap();
        assert_eq!(plan.sources.len(), 1);
    }

    #[test]
    fn test_only_missing_paths_is_no_input_files() {
        let dir = TempDir::new().unwrap();
        let config = config_for(vec![dir.path().join("ghost.png")]);
        let err = InputClassifier::new(&config).classify(true).unwrap_err();
        assert!(matches!(err, ImageminError::NoInputFiles));
    }

    #[test]
    fn test_empty_directory_is_no_input_files() {
        let dir = TempDir::new().unwrap();
        let config = config_for(vec![dir.path().to_path_buf()]);
        let err = InputClassifier::new(&config).classify(true).unwrap_err();
        assert!(matches!(err, ImageminError::NoInputFiles));
    }

    #[test]
    fn test_glob_expansion() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.png");
        touch(dir.path(), "b.png");
        touch(dir.path(), "c.gif");

        let pattern = dir.path().join("*.png");
        let config = config_for(vec![pattern]);
        let plan = InputClassifier::new(&config).classify(true).unwrap();
        assert_eq!(plan.sources.len(), 2);
    }

    #[test]
    fn test_single_file_destination() {
        let dir = TempDir::new().unwrap();
        let file = touch(dir.path(), "a.png");

        let mut config = config_for(vec![file]);
        config.out_file = Some(dir.path().join("out.png"));
        let plan = InputClassifier::new(&config).classify(true).unwrap();
        assert_eq!(plan.destination, DestinationSpec::SingleFile(dir.path().join("out.png")));
    }
}
