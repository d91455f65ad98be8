//! Local filesystem storage backend.

use crate::error::{StorageError, StorageResult};
use crate::traits::{ByteStream, FileStore, ObjectMeta};
use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::instrument;
use uuid::Uuid;

/// Prefix of in-flight temp files. Never a valid key because keys cannot start with a dot.
const TEMP_PREFIX: &str = ".tmp.";

/// Chunk size for streaming reads.
const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// Flat directory of uploaded files.
pub struct FilesystemBackend {
    root: PathBuf,
}

impl FilesystemBackend {
    /// Create a new filesystem backend, creating the root if needed.
    pub async fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        ensure_dir(&root).await?;
        Ok(Self { root })
    }

    /// Storage root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the full path for a key, with path traversal protection.
    ///
    /// Runs `key_path_sync` on the blocking pool since it canonicalizes paths.
    async fn key_path(&self, key: &str) -> StorageResult<PathBuf> {
        let root = self.root.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || Self::key_path_sync(&root, &key))
            .await
            .map_err(|e| {
                StorageError::Io(std::io::Error::other(format!("spawn_blocking failed: {e}")))
            })?
    }

    /// Validate that `key` names a single file directly under `root`.
    ///
    /// Rejects separators, `.`/`..`, hidden names and symlinks resolving outside the root.
    fn key_path_sync(root: &Path, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty()
            || key.starts_with('.')
            || key.contains('/')
            || key.contains('\\')
            || key.contains('\0')
        {
            return Err(StorageError::InvalidKey(format!(
                "not a plain file name: {key}"
            )));
        }

        let mut components = Path::new(key).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {}
            _ => {
                return Err(StorageError::InvalidKey(format!(
                    "contains unsafe path component: {key}"
                )));
            }
        }

        let path = root.join(key);

        // An existing entry may be a symlink planted inside the root.
        match std::fs::symlink_metadata(&path) {
            Ok(meta) => {
                let root_canonical = root.canonicalize().map_err(|e| {
                    StorageError::Io(std::io::Error::new(
                        e.kind(),
                        format!("failed to canonicalize root: {e}"),
                    ))
                })?;
                let canonical = path.canonicalize().map_err(|e| {
                    if meta.file_type().is_symlink() {
                        StorageError::InvalidKey(format!(
                            "symlink target missing or invalid: {key}"
                        ))
                    } else {
                        StorageError::Io(std::io::Error::new(
                            e.kind(),
                            format!("failed to canonicalize path: {e}"),
                        ))
                    }
                })?;

                if !canonical.starts_with(&root_canonical) {
                    return Err(StorageError::InvalidKey(format!(
                        "resolved path escapes storage root: {key}"
                    )));
                }
                Ok(path)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(path),
            Err(err) => Err(StorageError::Io(std::io::Error::new(
                err.kind(),
                format!("failed to stat path: {err}"),
            ))),
        }
    }

    async fn write_temp(&self, data: &[u8]) -> StorageResult<PathBuf> {
        let temp_path = self.root.join(format!("{TEMP_PREFIX}{}", Uuid::new_v4()));
        let result = async {
            let mut file = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&temp_path)
                .await?;
            file.write_all(data).await?;
            file.sync_all().await?;
            Ok::<_, std::io::Error>(())
        }
        .await;

        if let Err(e) = result {
            let _ = fs::remove_file(&temp_path).await;
            return Err(StorageError::Io(e));
        }
        Ok(temp_path)
    }
}

/// Create a directory tree, treating a concurrent creation as success.
async fn ensure_dir(path: &Path) -> StorageResult<()> {
    match fs::create_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        Err(e) => Err(StorageError::Io(e)),
    }
}

fn map_not_found(key: &str) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |e| {
        if e.kind() == ErrorKind::NotFound {
            StorageError::NotFound(key.to_string())
        } else {
            StorageError::Io(e)
        }
    }
}

#[async_trait]
impl FileStore for FilesystemBackend {
    #[instrument(skip(self, data), fields(backend = "filesystem", size = data.len()))]
    async fn save(&self, key: &str, data: Bytes) -> StorageResult<()> {
        let path = self.key_path(key).await?;
        // The root may have been removed since startup.
        ensure_dir(&self.root).await?;

        // Write to a unique temp file, fsync, then hard-link into place.
        // Linking fails if the target exists, which gives create-new semantics
        // without exposing a partially written file.
        let temp_path = self.write_temp(&data).await?;
        let linked = fs::hard_link(&temp_path, &path).await;
        let _ = fs::remove_file(&temp_path).await;

        match linked {
            Ok(()) => {
                tracing::debug!(key = %key, "File saved");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(StorageError::AlreadyExists(key.to_string()))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn get_stream(&self, key: &str) -> StorageResult<ByteStream> {
        let path = self.key_path(key).await?;
        let file = fs::File::open(&path).await.map_err(map_not_found(key))?;
        // Directories open fine on unix; only regular files are served.
        if !file.metadata().await?.is_file() {
            return Err(StorageError::NotFound(key.to_string()));
        }

        let stream = ReaderStream::with_capacity(file, STREAM_CHUNK_SIZE).map_err(StorageError::Io);
        Ok(Box::pin(stream))
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn delete(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_path(key).await?;
        match fs::symlink_metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Ok(false),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(StorageError::Io(e)),
        }

        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            // Lost a race with another delete.
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn list(&self) -> StorageResult<Vec<ObjectMeta>> {
        let mut results = Vec::new();
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(results),
            Err(e) => return Err(StorageError::Io(e)),
        };

        while let Some(entry) = entries.next_entry().await? {
            // file_type() does not follow symlinks, so links are skipped here.
            let file_type = entry.file_type().await?;
            if !file_type.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name.starts_with(TEMP_PREFIX) {
                continue;
            }

            let metadata = match entry.metadata().await {
                Ok(m) => m,
                // Deleted between read_dir and stat.
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(StorageError::Io(e)),
            };

            results.push(ObjectMeta {
                key: name,
                size: metadata.len(),
                last_modified: metadata.modified().ok().map(|t| t.into()),
            });
        }

        Ok(results)
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn health_check(&self) -> StorageResult<()> {
        let metadata = fs::metadata(&self.root).await.map_err(|e| {
            StorageError::Io(std::io::Error::new(
                e.kind(),
                format!("storage root not accessible: {e}"),
            ))
        })?;

        if !metadata.is_dir() {
            return Err(StorageError::Io(std::io::Error::new(
                ErrorKind::NotADirectory,
                format!("storage root is not a directory: {:?}", self.root),
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    async fn read_all(backend: &FilesystemBackend, key: &str) -> Bytes {
        let chunks: Vec<Bytes> = backend
            .get_stream(key)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        Bytes::from(chunks.concat())
    }

    #[tokio::test]
    async fn test_save_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path()).await.unwrap();

        let data = Bytes::from("hello world");
        backend.save("abc.txt", data.clone()).await.unwrap();

        assert_eq!(read_all(&backend, "abc.txt").await, data);
        assert_eq!(std::fs::read(dir.path().join("abc.txt")).unwrap(), b"hello world");
    }

    #[tokio::test]
    async fn test_save_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path()).await.unwrap();

        backend.save("taken.png", Bytes::from("first")).await.unwrap();
        let result = backend.save("taken.png", Bytes::from("second")).await;
        assert!(matches!(result, Err(StorageError::AlreadyExists(_))));

        assert_eq!(read_all(&backend, "taken.png").await, Bytes::from("first"));
    }

    #[tokio::test]
    async fn test_save_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path()).await.unwrap();

        backend.save("one.txt", Bytes::from("1")).await.unwrap();
        let _ = backend.save("one.txt", Bytes::from("2")).await;

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["one.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_save_recreates_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("uploads");
        let backend = FilesystemBackend::new(&root).await.unwrap();

        std::fs::remove_dir(&root).unwrap();
        backend.save("again.txt", Bytes::from("x")).await.unwrap();
        assert!(root.join("again.txt").is_file());
    }

    #[tokio::test]
    async fn test_new_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("uploads");

        let (a, b) = tokio::join!(FilesystemBackend::new(&root), FilesystemBackend::new(&root));
        assert!(a.is_ok());
        assert!(b.is_ok());
        assert!(FilesystemBackend::new(&root).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_reports_existence() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path()).await.unwrap();

        backend.save("gone.gif", Bytes::from("gif")).await.unwrap();
        assert!(backend.delete("gone.gif").await.unwrap());
        assert!(!dir.path().join("gone.gif").exists());
        assert!(!backend.delete("gone.gif").await.unwrap());
        assert!(!backend.delete("never-existed.gif").await.unwrap());
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path()).await.unwrap();

        let result = backend.get_stream("missing.png").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_get_stream_reads_in_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path()).await.unwrap();

        let data: Vec<u8> = (0..STREAM_CHUNK_SIZE * 3 + 17).map(|i| i as u8).collect();
        backend.save("big.bin", Bytes::from(data.clone())).await.unwrap();

        let chunks: Vec<Bytes> = backend
            .get_stream("big.bin")
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.len() <= STREAM_CHUNK_SIZE));
        assert_eq!(chunks.concat(), data);
    }

    #[tokio::test]
    async fn test_list_skips_temp_files_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path()).await.unwrap();

        backend.save("a.txt", Bytes::from("aaa")).await.unwrap();
        backend.save("b.png", Bytes::from("bb")).await.unwrap();
        std::fs::write(dir.path().join(".tmp.leftover"), b"partial").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let mut listed = backend.list().await.unwrap();
        listed.sort_by(|a, b| a.key.cmp(&b.key));

        let keys: Vec<_> = listed.iter().map(|m| m.key.as_str()).collect();
        assert_eq!(keys, vec!["a.txt", "b.png"]);
        assert_eq!(listed[0].size, 3);
        assert!(listed[0].last_modified.is_some());
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path()).await.unwrap();

        for key in [
            "../escape",
            "/absolute/path",
            "foo/../bar",
            "nested/key",
            "..",
            ".",
            ".hidden",
            "back\\slash",
            "",
        ] {
            assert!(
                matches!(
                    backend.save(key, Bytes::from("x")).await,
                    Err(StorageError::InvalidKey(_))
                ),
                "key should be rejected: {key:?}"
            );
            assert!(backend.delete(key).await.is_err(), "delete accepted {key:?}");
            assert!(backend.get_stream(key).await.is_err(), "read accepted {key:?}");
        }

        assert!(!backend.delete("valid-key.png").await.unwrap());
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_symlink_traversal_rejected() {
        use std::os::unix::fs::symlink;

        let dir = tempfile::tempdir().unwrap();
        let outside_dir = tempfile::tempdir().unwrap();

        let outside_file = outside_dir.path().join("secret.txt");
        std::fs::write(&outside_file, "secret data").unwrap();

        let backend = FilesystemBackend::new(dir.path()).await.unwrap();
        symlink(&outside_file, dir.path().join("malicious_link")).unwrap();

        match backend.get_stream("malicious_link").await {
            Err(StorageError::InvalidKey(msg)) => assert!(
                msg.contains("escapes storage root"),
                "error should mention escaping root: {msg}"
            ),
            Err(other) => panic!("expected InvalidKey error, got: {other:?}"),
            Ok(_) => panic!("expected InvalidKey error, got a stream"),
        }

        assert!(backend.delete("malicious_link").await.is_err());
        assert!(outside_file.exists(), "file outside root must survive");

        let listed = backend.list().await.unwrap();
        assert!(listed.is_empty(), "symlinks should not be listed");
    }

    #[tokio::test]
    async fn test_health_check() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("uploads");
        let backend = FilesystemBackend::new(&root).await.unwrap();
        assert!(backend.health_check().await.is_ok());

        std::fs::remove_dir(&root).unwrap();
        assert!(backend.health_check().await.is_err());
    }
}
