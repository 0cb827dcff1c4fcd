//! Photo inventory sources

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Anything that can list the photos of a show
#[async_trait]
pub trait PhotoSource: Send + Sync {
    /// List photo names in show order
    async fn scan(&self) -> Result<Vec<String>>;

    /// Human-readable description for logs
    fn describe(&self) -> String;
}

/// Photos are the non-directory entries of one directory, sorted by name
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    /// Source listing `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory being listed
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn unreadable(&self, source: std::io::Error) -> Error {
        Error::DirectoryUnreadable {
            path: self.dir.clone(),
            source,
        }
    }
}

#[async_trait]
impl PhotoSource for DirectorySource {
    async fn scan(&self) -> Result<Vec<String>> {
        let meta = tokio::fs::metadata(&self.dir)
            .await
            .map_err(|e| self.unreadable(e))?;

        // A plain file where the directory should be is an empty show
        if !meta.is_dir() {
            return Ok(Vec::new());
        }

        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| self.unreadable(e))?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| self.unreadable(e))? {
            let file_type = entry.file_type().await.map_err(|e| self.unreadable(e))?;
            if file_type.is_dir() {
                continue;
            }
            names.push(entry.file_name().to_string_lossy().into_owned());
        }

        names.sort();
        Ok(names)
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}
