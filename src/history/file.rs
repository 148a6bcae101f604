use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;

use crate::history::{ BlobStore, StoreError };

/// One `<key>.json` file per blob under a data directory.
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid =
            !key.is_empty() &&
            key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir).await?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).await?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn set_get_delete() {
        let temp = tempdir().expect("tempdir");
        let store = FileBlobStore::new(temp.path().join("nested"));

        assert_eq!(store.get("cached-models").await.unwrap(), None);
        store.set("cached-models", "[1]").await.unwrap();
        store.set("cached-models", "[2]").await.unwrap();
        assert_eq!(store.get("cached-models").await.unwrap().as_deref(), Some("[2]"));
        assert!(temp.path().join("nested").join("cached-models.json").exists());

        store.delete("cached-models").await.unwrap();
        store.delete("cached-models").await.unwrap();
        assert_eq!(store.get("cached-models").await.unwrap(), None);
    }

    #[tokio::test]
    async fn failed_rename_leaves_no_temp_file() {
        let temp = tempdir().expect("tempdir");
        let store = FileBlobStore::new(temp.path().to_path_buf());
        // A non-empty directory at the target path makes the rename fail.
        let target = temp.path().join("cached-models.json");
        std::fs::create_dir(&target).expect("blocking dir");
        std::fs::write(target.join("keep"), "x").expect("blocking file");

        assert!(matches!(store.set("cached-models", "[1]").await, Err(StoreError::Io(_))));
        assert!(!temp.path().join("cached-models.json.tmp").exists());
    }

    #[tokio::test]
    async fn rejects_path_like_keys() {
        let temp = tempdir().expect("tempdir");
        let store = FileBlobStore::new(temp.path().to_path_buf());
        assert!(matches!(store.get("../etc/passwd").await, Err(StoreError::InvalidKey(_))));
        assert!(matches!(store.set("", "x").await, Err(StoreError::InvalidKey(_))));
    }
}
