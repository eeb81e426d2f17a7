use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub project_root: PathBuf,
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl AppPaths {
    /// Resolves paths from `RAG_ROOT` / `RAG_DATA_DIR`, falling back to the
    /// current directory and `<root>/data`.
    pub fn new() -> Self {
        let project_root = discover_project_root();
        let data_dir = env::var("RAG_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| project_root.join("data"));
        Self::with_dirs(project_root, data_dir)
    }

    pub fn with_dirs(project_root: PathBuf, data_dir: PathBuf) -> Self {
        let log_dir = project_root.join("logs");
        let _ = fs::create_dir_all(&log_dir);

        AppPaths {
            project_root,
            data_dir,
            log_dir,
        }
    }

    pub fn from_root(project_root: &Path) -> Self {
        Self::with_dirs(project_root.to_path_buf(), project_root.join("data"))
    }

    pub fn default_index_dir(&self) -> PathBuf {
        self.data_dir.join(".index")
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn discover_project_root() -> PathBuf {
    if let Ok(root) = env::var("RAG_ROOT") {
        return PathBuf::from(root);
    }

    env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
