use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};
use uuid::Uuid;

use crate::error::{AppError, Result};

/// Allowed project file extensions
const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "ppt", "pptx", "xls", "xlsx", "txt", "zip"];

/// Maximum project file size (50 MB)
pub const MAX_FILE_SIZE: usize = 50 * 1024 * 1024;

/// A readable stored object.
pub struct StoredObject {
    pub size: u64,
    pub reader: Box<dyn AsyncRead + Send + Unpin>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, data: &[u8]) -> Result<()>;
    async fn get(&self, key: &str) -> Result<StoredObject>;
    async fn delete(&self, key: &str) -> Result<()>;
    /// Keys under `prefix`, sorted.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Rejects keys that could escape the store root.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || key.starts_with('/') || key.contains('\\') {
        return Err(AppError::BadRequest(format!("Invalid object key: {}", key)));
    }
    let ok = Path::new(key)
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if !ok {
        return Err(AppError::BadRequest(format!("Invalid object key: {}", key)));
    }
    Ok(())
}

/// Builds the storage key for an uploaded project file, checking the
/// extension and size on the way.
pub fn project_file_key(project_id: Uuid, filename: &str, size: usize) -> Result<String> {
    if size == 0 {
        return Err(AppError::Validation("File is empty".to_string()));
    }
    if size > MAX_FILE_SIZE {
        return Err(AppError::Validation("File too large (max 50 MB)".to_string()));
    }

    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .ok_or_else(|| AppError::Validation("Invalid filename".to_string()))?;

    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(AppError::Validation(format!(
            "Invalid file type. Allowed: {}",
            ALLOWED_EXTENSIONS.join(", ")
        )));
    }

    Ok(format!("projects/{}/{}.{}", project_id, Uuid::new_v4(), extension))
}

/// Stores objects as files beneath a root directory.
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::Internal(format!("Failed to create storage directory: {}", e))
            })?;
        }

        let mut file = fs::File::create(&path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create file: {}", e)))?;
        file.write_all(data)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to write file: {}", e)))?;
        file.flush()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to write file: {}", e)))?;

        tracing::debug!(key, bytes = data.len(), "Stored object");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<StoredObject> {
        let path = self.path_for(key)?;
        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::NotFound("File not found".to_string()))
            }
            Err(e) => return Err(AppError::Internal(format!("Failed to open file: {}", e))),
        };
        let size = file
            .metadata()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to stat file: {}", e)))?
            .len();

        Ok(StoredObject {
            size,
            reader: Box::new(file),
        })
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Internal(format!("Failed to delete file: {}", e))),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(AppError::Internal(format!("Failed to list storage: {}", e))),
            };

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| AppError::Internal(format!("Failed to list storage: {}", e)))?
            {
                let path = entry.path();
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| AppError::Internal(format!("Failed to list storage: {}", e)))?;
                if file_type.is_dir() {
                    pending.push(path);
                } else if let Ok(relative) = path.strip_prefix(&self.root) {
                    let key = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/");
                    if key.starts_with(prefix) {
                        keys.push(key);
                    }
                }
            }
        }

        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("scholarmart-store-{}", Uuid::new_v4()))
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("projects/a/b.pdf").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("projects/../../etc/passwd").is_err());
        assert!(validate_key("./projects/a.pdf").is_err());
        assert!(validate_key("projects\\a.pdf").is_err());
    }

    #[test]
    fn test_project_file_key() {
        let project_id = Uuid::new_v4();
        let key = project_file_key(project_id, "Thesis.PDF", 1024).unwrap();
        assert!(key.starts_with(&format!("projects/{}/", project_id)));
        assert!(key.ends_with(".pdf"));

        assert!(project_file_key(project_id, "malware.exe", 1024).is_err());
        assert!(project_file_key(project_id, "noextension", 1024).is_err());
        assert!(project_file_key(project_id, "big.pdf", MAX_FILE_SIZE + 1).is_err());
        assert!(project_file_key(project_id, "empty.pdf", 0).is_err());
    }

    #[tokio::test]
    async fn test_put_get_list_delete() {
        let root = temp_root();
        let store = LocalObjectStore::new(&root);

        store.put("projects/p1/a.pdf", b"first").await.unwrap();
        store.put("projects/p2/b.pdf", b"second").await.unwrap();

        let mut object = store.get("projects/p1/a.pdf").await.unwrap();
        assert_eq!(object.size, 5);
        let mut contents = String::new();
        object.reader.read_to_string(&mut contents).await.unwrap();
        assert_eq!(contents, "first");

        assert_eq!(store.list("projects/").await.unwrap().len(), 2);
        assert_eq!(store.list("projects/p1/").await.unwrap(), vec!["projects/p1/a.pdf"]);

        store.delete("projects/p1/a.pdf").await.unwrap();
        store.delete("projects/p1/a.pdf").await.unwrap();
        assert!(matches!(
            store.get("projects/p1/a.pdf").await,
            Err(AppError::NotFound(_))
        ));

        let _ = std::fs::remove_dir_all(root);
    }
}
