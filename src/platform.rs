//! # Platform-specific utilities
//!
//! Questo modulo centralizza la ricerca dei tool esterni usati dai plugin
//! (gifsicle, jpegtran, optipng, svgo, ...). Cerca prima nella directory
//! indicata da `IMAGEMIN_TOOLS_DIR`, poi nel `PATH` di sistema.

use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable that points at a directory of bundled tools
pub const TOOLS_DIR_ENV: &str = "IMAGEMIN_TOOLS_DIR";

/// Locates external optimization tools
#[derive(Debug, Clone, Default)]
pub struct ToolLocator {
    /// Directory searched before `PATH`
    tools_dir: Option<PathBuf>,
    /// Directories from `PATH`
    search_path: Vec<PathBuf>,
}

impl ToolLocator {
    /// Build a locator from `IMAGEMIN_TOOLS_DIR` and `PATH`
    pub fn from_env() -> Self {
        let tools_dir = env::var_os(TOOLS_DIR_ENV)
            .map(PathBuf::from)
            .filter(|dir| dir.is_dir());
        let search_path = env::var_os("PATH")
            .map(|path| env::split_paths(&path).collect())
            .unwrap_or_default();

        if let Some(ref dir) = tools_dir {
            debug!("Using tools directory from {}: {}", TOOLS_DIR_ENV, dir.display());
        }

        Self {
            tools_dir,
            search_path,
        }
    }

    /// Locator that only searches the given directories
    pub fn with_search_path(dirs: Vec<PathBuf>) -> Self {
        Self {
            tools_dir: None,
            search_path: dirs,
        }
    }

    /// Resolve the path to a specific tool
    pub fn resolve(&self, tool_name: &str) -> Option<PathBuf> {
        let file_name = executable_name(tool_name);

        let found = self
            .tools_dir
            .iter()
            .chain(self.search_path.iter())
            .map(|dir| dir.join(&file_name))
            .find(|candidate| is_executable(candidate));

        match found {
            Some(ref path) => debug!("Resolved tool {} -> {}", tool_name, path.display()),
            None => debug!("Tool not found: {}", tool_name),
        }
        found
    }
}

/// Installation hint shown when a tool is missing
pub fn install_hint(tool_name: &str) -> String {
    if cfg!(target_os = "macos") {
        return match tool_name {
            "svgo" => "npm install -g svgo".to_string(),
            "cwebp" => "brew install webp".to_string(),
            "jpegtran" => "brew install jpeg-turbo".to_string(),
            "cjpeg" => "brew install mozjpeg".to_string(),
            _ => format!("brew install {}", tool_name),
        };
    }

    match tool_name {
        "svgo" => "npm install -g svgo".to_string(),
        "cwebp" => "sudo apt-get install webp".to_string(),
        "jpegtran" => "sudo apt-get install libjpeg-turbo-progs".to_string(),
        "cjpeg" => "sudo apt-get install libjpeg-turbo-progs  # or build mozjpeg".to_string(),
        "oxipng" => "cargo install oxipng".to_string(),
        _ => format!("sudo apt-get install {}", tool_name),
    }
}

fn executable_name(tool_name: &str) -> String {
    if cfg!(windows) {
        format!("{}.exe", tool_name)
    } else {
        tool_name.to_string()
    }
}

fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        path.metadata()
            .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }

    #[cfg(not(unix))]
    {
        path.is_file()
    }
}
