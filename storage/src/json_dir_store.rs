//! Directory of JSON documents, one file per id plus a single index file.

use errors::StorageError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::Write;
use std::path::{Path, PathBuf};
use utils::file_stem_for_id;

/// File name of the index document; never treated as a record.
pub const INDEX_FILE: &str = "defaults.json";

#[derive(Debug, Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    /// Opens `dir`, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| io_error(&dir, &e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem_for_id(id)))
    }

    pub fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    pub fn save<T: Serialize>(&self, id: &str, document: &T) -> Result<PathBuf, StorageError> {
        let path = self.path_for(id);
        self.write_atomic(&path, document)?;
        tracing::debug!("Saved {} to {}", id, path.display());
        Ok(path)
    }

    /// Returns whether a file was deleted.
    pub fn delete(&self, id: &str) -> Result<bool, StorageError> {
        let path = self.path_for(id);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error(&path, &e)),
        }
    }

    pub fn save_index<T: Serialize>(&self, index: &T) -> Result<(), StorageError> {
        self.write_atomic(&self.index_path(), index)
    }

    /// Missing or unreadable index yields `T::default()`, the latter with a
    /// warning.
    pub fn load_index<T: DeserializeOwned + Default>(&self) -> T {
        let path = self.index_path();
        if !path.exists() {
            return T::default();
        }
        match read_document(&path) {
            Ok(index) => index,
            Err(e) => {
                tracing::warn!("Ignoring unreadable index: {}", e);
                T::default()
            }
        }
    }

    /// Every `*.json` document except the index, in file name order.
    ///
    /// Unparseable files are logged and skipped.
    pub fn load_all<T: DeserializeOwned>(&self) -> Result<Vec<(PathBuf, T)>, StorageError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| io_error(&self.dir, &e))?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path.extension().and_then(|e| e.to_str()) == Some("json")
                    && path.file_name().and_then(|n| n.to_str()) != Some(INDEX_FILE)
            })
            .collect();
        paths.sort();

        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            match read_document(&path) {
                Ok(document) => documents.push((path, document)),
                Err(e) => tracing::warn!("Skipping unreadable document: {}", e),
            }
        }
        Ok(documents)
    }

    fn write_atomic<T: Serialize>(&self, path: &Path, document: &T) -> Result<(), StorageError> {
        let body = serde_json::to_vec_pretty(document).map_err(|e| StorageError::Malformed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(|e| io_error(path, &e))?;
        tmp.write_all(&body).map_err(|e| io_error(path, &e))?;
        tmp.persist(path).map_err(|e| io_error(path, &e.error))?;
        Ok(())
    }
}

fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T, StorageError> {
    let body = std::fs::read(path).map_err(|e| io_error(path, &e))?;
    serde_json::from_slice(&body).map_err(|e| StorageError::Malformed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn io_error(path: &Path, err: &std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::BTreeMap;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Doc {
        id: String,
        n: u32,
    }

    #[test]
    fn test_save_load_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirStore::open(dir.path().join("registry")).unwrap();

        store.save("b-doc", &Doc { id: "b-doc".into(), n: 2 }).unwrap();
        store.save("a-doc", &Doc { id: "a-doc".into(), n: 1 }).unwrap();

        let loaded: Vec<Doc> = store.load_all().unwrap().into_iter().map(|(_, d)| d).collect();
        assert_eq!(
            loaded,
            vec![Doc { id: "a-doc".into(), n: 1 }, Doc { id: "b-doc".into(), n: 2 }]
        );

        assert!(store.delete("a-doc").unwrap());
        assert!(!store.delete("a-doc").unwrap());
        assert_eq!(store.load_all::<Doc>().unwrap().len(), 1);
    }

    #[test]
    fn test_index_is_not_a_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirStore::open(dir.path()).unwrap();
        let index = BTreeMap::from([("general".to_string(), "a-doc".to_string())]);
        store.save_index(&index).unwrap();
        store.save("a-doc", &Doc { id: "a-doc".into(), n: 1 }).unwrap();

        assert_eq!(store.load_all::<Doc>().unwrap().len(), 1);
        assert_eq!(store.load_index::<BTreeMap<String, String>>(), index);
    }

    #[test]
    fn test_malformed_files_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirStore::open(dir.path()).unwrap();
        std::fs::write(dir.path().join("broken.json"), "{oops").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        std::fs::write(dir.path().join(INDEX_FILE), "[not a map").unwrap();
        store.save("ok", &Doc { id: "ok".into(), n: 0 }).unwrap();

        assert_eq!(store.load_all::<Doc>().unwrap().len(), 1);
        assert!(store.load_index::<BTreeMap<String, String>>().is_empty());
    }

    #[test]
    fn test_unsafe_ids_get_safe_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirStore::open(dir.path()).unwrap();
        let path = store
            .save("gemini-models/gemini-2.5-flash", &Doc { id: "x".into(), n: 0 })
            .unwrap();
        assert_eq!(path.parent(), Some(dir.path()));
        assert!(path.file_name().unwrap().to_str().unwrap().starts_with("gemini-models_gemini-2.5-flash-"));
    }
}
