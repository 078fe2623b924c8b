//! Filesystem layout resolved from the environment at startup.

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Root of everything the app writes.
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    /// Human-editable JSON documents.
    pub documents_store_dir: PathBuf,
    /// Used when the user has not picked a documents directory.
    pub default_documents_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_data_dir(kibitz_data_dir(), default_documents_dir())
    }

    pub fn from_data_dir(data_dir: PathBuf, default_documents_dir: Option<PathBuf>) -> Self {
        Self {
            db_path: data_dir.join("kibitz.db"),
            documents_store_dir: data_dir.join("documents"),
            default_documents_dir: default_documents_dir
                .unwrap_or_else(|| data_dir.join("library")),
            data_dir,
        }
    }

    pub fn ensure_dirs(&self) -> Result<(), String> {
        for dir in [&self.data_dir, &self.documents_store_dir] {
            std::fs::create_dir_all(dir)
                .map_err(|e| format!("failed to create directory {}: {e}", dir.display()))?;
        }
        Ok(())
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn kibitz_data_dir() -> PathBuf {
    if let Some(path) = non_empty_env("KIBITZ_DATA_DIR") {
        return PathBuf::from(path);
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(app_data) = non_empty_env("APPDATA") {
            return PathBuf::from(app_data).join("Kibitz");
        }
    }

    if let Some(home) = non_empty_env("HOME") {
        return PathBuf::from(home).join(".kibitz");
    }

    if let Some(home) = non_empty_env("USERPROFILE") {
        return PathBuf::from(home).join(".kibitz");
    }

    PathBuf::from(".kibitz")
}

fn default_documents_dir() -> Option<PathBuf> {
    let home = non_empty_env("HOME").or_else(|| non_empty_env("USERPROFILE"))?;
    Some(PathBuf::from(home).join("Documents").join("Kibitz"))
}
