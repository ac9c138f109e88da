//! On-disk storage of raw price tables, laid out as `<root>/<category>/<symbol>.csv`.

use crate::core::error::TrendError;
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SeriesStore {
    root: PathBuf,
}

impl SeriesStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn category_dir(&self, category: &str) -> PathBuf {
        self.root.join(category)
    }

    pub fn path_for(&self, category: &str, symbol: &str) -> PathBuf {
        self.category_dir(category).join(format!("{symbol}.csv"))
    }

    /// Writes a raw table, replacing any previous one. The category directory
    /// must already exist.
    pub fn write(&self, category: &str, symbol: &str, data: &[u8]) -> Result<PathBuf, TrendError> {
        let dir = self.category_dir(category);
        if !dir.is_dir() {
            return Err(TrendError::Storage {
                path: dir,
                reason: "category directory does not exist".to_string(),
            });
        }

        let path = self.path_for(category, symbol);
        fs::write(&path, data).map_err(|e| TrendError::Storage {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        debug!("Wrote {} bytes to {}", data.len(), path.display());
        Ok(path)
    }

    pub fn open(&self, category: &str, symbol: &str) -> Result<(File, PathBuf), TrendError> {
        let path = self.path_for(category, symbol);
        match File::open(&path) {
            Ok(file) => Ok((file, path)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(TrendError::NotFound { path }),
            Err(e) => Err(TrendError::Storage {
                reason: e.to_string(),
                path,
            }),
        }
    }

    /// Creates the directory for each category. Only used by `setup`; the
    /// pipeline itself never creates directories.
    pub fn create_category_dirs<'a, I>(&self, categories: I) -> Result<Vec<PathBuf>, TrendError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut created = Vec::new();
        for category in categories {
            let dir = self.category_dir(category);
            fs::create_dir_all(&dir).map_err(|e| TrendError::Storage {
                path: dir.clone(),
                reason: e.to_string(),
            })?;
            created.push(dir);
        }
        Ok(created)
    }
}
