use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{Result, SqllessError};

use super::{QueryStore, SavedQuery};

/// Saved queries kept in one JSON file mapping names to queries.
///
/// The whole file is rewritten after every change.
#[derive(Debug)]
pub struct FileQueryStore {
    path: PathBuf,
    entries: BTreeMap<String, SavedQuery>,
}

impl FileQueryStore {
    /// Open the store at `path`; a missing file starts an empty store.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            if contents.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&contents).map_err(|e| {
                    SqllessError::Store(format!("failed to parse {}: {e}", path.display()))
                })?
            }
        } else {
            BTreeMap::new()
        };
        tracing::debug!(path = %path.display(), queries = entries.len(), "opened query file");
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let contents = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}

#[async_trait]
impl QueryStore for FileQueryStore {
    async fn save(&mut self, name: &str, query: &SavedQuery) -> Result<()> {
        self.entries.insert(name.to_string(), query.clone());
        self.flush()
    }

    async fn load(&self, name: &str) -> Result<Option<SavedQuery>> {
        Ok(self.entries.get(name).cloned())
    }

    async fn list(&self) -> Result<Vec<String>> {
        Ok(self.entries.keys().cloned().collect())
    }

    async fn delete(&mut self, name: &str) -> Result<()> {
        if self.entries.remove(name).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}
