//! # File Management Module
//!
//! Questo modulo gestisce tutte le operazioni sui file e la discovery delle immagini.
//!
//! ## Responsabilità:
//! - Espansione di directory (ricorsiva o solo primo livello) in file immagine
//! - Lettura e scrittura dei file, con creazione delle directory parent
//! - Utilità per calcoli dimensioni e percentuali
//! - Formattazione human-readable delle dimensioni
//!
//! ## Formati supportati nella discovery:
//! - PNG, JPG/JPEG, GIF, SVG, WebP
//!
//! I file passati esplicitamente come argomento non vengono filtrati per
//! estensione: solo il contenuto delle directory lo è.
//!
//! ## Esempio:
//! ```ignore
//! let files = FileManager::expand_directory(Path::new("images"), true)?;
//! for (path, relative) in files {
//!     let bytes = FileManager::read(&path).await?;
//! }
//! ```

use crate::error::{ImageminError, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use walkdir::WalkDir;

/// Manages file operations and discovery
pub struct FileManager;

impl FileManager {
    /// Find all supported images in a directory
    ///
    /// Returns `(path, relative)` pairs, where `relative` is the path below
    /// `dir`. Entries are sorted by name so runs are reproducible.
    pub fn expand_directory(dir: &Path, recursive: bool) -> Result<Vec<(PathBuf, PathBuf)>> {
        let mut walker = WalkDir::new(dir).sort_by_file_name();
        if !recursive {
            walker = walker.max_depth(1);
        }

        let mut files = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(dir).to_path_buf();
                ImageminError::Read {
                    path,
                    source: e.into(),
                }
            })?;

            if entry.file_type().is_dir() {
                if !recursive && entry.depth() == 1 {
                    debug!("Skipping subdirectory {} (not recursive)", entry.path().display());
                }
                continue;
            }

            let path = entry.path();
            if !Self::is_supported_format(path) {
                debug!("Skipping unsupported file {}", path.display());
                continue;
            }

            let relative = path.strip_prefix(dir).unwrap_or(path).to_path_buf();
            files.push((path.to_path_buf(), relative));
        }

        Ok(files)
    }

    /// Check if a file format is supported
    pub fn is_supported_format(path: &Path) -> bool {
        if let Some(ext) = path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            matches!(ext_lower.as_str(), "png" | "jpg" | "jpeg" | "gif" | "svg" | "webp")
        } else {
            false
        }
    }

    pub async fn read(path: &Path) -> Result<Vec<u8>> {
        fs::read(path).await.map_err(|source| ImageminError::Read {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write `bytes` to `path`, creating parent directories as needed
    pub async fn write(path: &Path, bytes: &[u8]) -> Result<()> {
        Self::ensure_parent_dirs(path).await?;
        fs::write(path, bytes).await.map_err(|source| ImageminError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Crea le directory parent se necessario
    pub async fn ensure_parent_dirs(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|source| ImageminError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }

    /// Calculate percentage reduction
    pub fn calculate_reduction(original_size: u64, new_size: u64) -> f64 {
        if original_size == 0 {
            0.0
        } else {
            ((original_size as f64 - new_size as f64) / original_size as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"data").unwrap();
    }

    #[test]
    fn test_expand_directory_flat() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "b.png");
        touch(dir.path(), "a.JPG");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), "sub/c.png");

        let files = FileManager::expand_directory(dir.path(), false).unwrap();
        let relative: Vec<PathBuf> = files.into_iter().map(|(_, rel)| rel).collect();
        assert_eq!(relative, vec![PathBuf::from("a.JPG"), PathBuf::from("b.png")]);
    }

    #[test]
    fn test_expand_directory_recursive() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.png");
        touch(dir.path(), "sub/b.png");
        touch(dir.path(), "sub/deeper/c.svg");

        let files = FileManager::expand_directory(dir.path(), true).unwrap();
        let relative: Vec<PathBuf> = files.iter().map(|(_, rel)| rel.clone()).collect();
        assert_eq!(
            relative,
            vec![
                PathBuf::from("a.png"),
                PathBuf::from("sub/b.png"),
                PathBuf::from("sub/deeper/c.svg"),
            ]
        );
        assert!(files.iter().all(|(path, _)| path.starts_with(dir.path())));
    }

    #[tokio::test]
    async fn test_write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("x/y/z.png");

        FileManager::write(&target, b"bytes").await.unwrap();
        assert_eq!(FileManager::read(&target).await.unwrap(), b"bytes");
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let err = FileManager::read(Path::new("/definitely/not/here.png")).await.unwrap_err();
        assert!(matches!(err, ImageminError::Read { .. }));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(FileManager::format_size(512), "512 B");
        assert_eq!(FileManager::format_size(2048), "2.00 KB");
        assert_eq!(FileManager::format_size(3 * 1024 * 1024), "3.00 MB");
    }

    #[test]
    fn test_calculate_reduction() {
        assert_eq!(FileManager::calculate_reduction(0, 0), 0.0);
        assert_eq!(FileManager::calculate_reduction(200, 150), 25.0);
    }
}
