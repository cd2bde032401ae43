use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use super::ServiceError;

/// A whole-file JSON document, read and rewritten on every call.
///
/// There is no locking: two writers racing on the same file can lose an
/// update. Callers accept that.
#[derive(Debug)]
pub(crate) struct JsonFile<T> {
    path: PathBuf,
    _doc: PhantomData<fn() -> T>,
}

impl<T> JsonFile<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    /// Creates the parent directory and an empty document if the file is missing.
    pub(crate) fn open(path: impl Into<PathBuf>) -> Result<Self, ServiceError> {
        let file = Self {
            path: path.into(),
            _doc: PhantomData,
        };
        if let Some(parent) = file.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        if !file.path.exists() {
            file.write(&T::default())?;
        }
        Ok(file)
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// An empty file reads as the default document.
    pub(crate) fn read(&self) -> Result<T, ServiceError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
            Err(e) => return Err(e.into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(T::default());
        }
        serde_json::from_slice(&bytes).map_err(|source| ServiceError::Corrupt {
            file: self.path.display().to_string(),
            source,
        })
    }

    pub(crate) fn write(&self, doc: &T) -> Result<(), ServiceError> {
        let bytes = serde_json::to_vec_pretty(doc).map_err(|source| ServiceError::Corrupt {
            file: self.path.display().to_string(),
            source,
        })?;
        std::fs::write(&self.path, bytes)?;
        Ok(())
    }

    /// Read, let `f` mutate, write back only when `f` asks for it.
    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut T) -> (R, bool)) -> Result<R, ServiceError> {
        let mut doc = self.read()?;
        let (result, dirty) = f(&mut doc);
        if dirty {
            self.write(&doc)?;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn open_creates_an_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let file: JsonFile<BTreeMap<String, u32>> =
            JsonFile::open(dir.path().join("nested").join("doc.json")).unwrap();
        assert!(file.path().exists());
        assert!(file.read().unwrap().is_empty());
    }

    #[test]
    fn update_only_writes_when_dirty() {
        let dir = tempfile::tempdir().unwrap();
        let file: JsonFile<BTreeMap<String, u32>> = JsonFile::open(dir.path().join("doc.json")).unwrap();
        file.update(|doc| {
            doc.insert("a".into(), 1);
            ((), false)
        })
        .unwrap();
        assert!(file.read().unwrap().is_empty());
        file.update(|doc| {
            doc.insert("a".into(), 1);
            ((), true)
        })
        .unwrap();
        assert_eq!(file.read().unwrap().get("a"), Some(&1));
    }

    #[test]
    fn garbage_is_reported_as_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        std::fs::write(&path, "{not json").unwrap();
        let file: JsonFile<BTreeMap<String, u32>> = JsonFile::open(&path).unwrap();
        assert!(matches!(file.read(), Err(ServiceError::Corrupt { .. })));
    }
}
