use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};

/// Filesystem-backed scratch storage for transient per-request files.
///
/// Both directories are owned by this service; callers never build scratch
/// paths themselves. Every path embeds the request id, so concurrent uploads
/// of identically-named files cannot collide.
pub struct ScratchStorage {
    upload_dir: PathBuf,
    output_dir: PathBuf,
}

impl ScratchStorage {
    pub fn new(upload_dir: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            upload_dir,
            output_dir,
        }
    }

    pub async fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.upload_dir)
            .await
            .with_context(|| format!("creating upload dir {}", self.upload_dir.display()))?;
        fs::create_dir_all(&self.output_dir)
            .await
            .with_context(|| format!("creating output dir {}", self.output_dir.display()))?;
        Ok(())
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn upload_path(&self, request_id: &str, filename: &str) -> PathBuf {
        self.upload_dir.join(format!("{}_{}", request_id, filename))
    }

    pub fn output_path(&self, request_id: &str, filename: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_unlocked_{}", request_id, filename))
    }

    /// Stream an upload to `dest`, returning the number of bytes written.
    pub async fn stage_upload<R>(&self, dest: &Path, reader: &mut R) -> Result<u64>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let mut file = fs::File::create(dest)
            .await
            .with_context(|| format!("creating scratch file {}", dest.display()))?;
        let bytes = tokio::io::copy(reader, &mut file)
            .await
            .with_context(|| format!("writing scratch file {}", dest.display()))?;
        file.flush().await?;
        Ok(bytes)
    }

    /// Remove a scratch file. Missing files are fine; any other fault is
    /// logged and swallowed so cleanup can never mask a response.
    pub async fn remove(&self, path: &Path) {
        match fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!("Failed to remove scratch file {}: {}", path.display(), e);
            }
        }
    }

    /// Delete every scratch file last modified before `cutoff`. Returns the
    /// number of files removed.
    pub async fn sweep_older_than(&self, cutoff: DateTime<Utc>) -> usize {
        let mut removed = 0;
        for dir in [&self.upload_dir, &self.output_dir] {
            let mut entries = match fs::read_dir(dir).await {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!("Failed to read scratch dir {}: {}", dir.display(), e);
                    continue;
                }
            };

            while let Ok(Some(entry)) = entries.next_entry().await {
                let modified = match entry.metadata().await.and_then(|m| m.modified()) {
                    Ok(modified) => modified,
                    Err(_) => continue,
                };
                if DateTime::<Utc>::from(modified) < cutoff {
                    self.remove(&entry.path()).await;
                    removed += 1;
                }
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage_in(dir: &Path) -> ScratchStorage {
        ScratchStorage::new(dir.join("uploads"), dir.join("outputs"))
    }

    #[test]
    fn test_paths_embed_request_id() {
        let storage = storage_in(Path::new("/scratch"));
        assert_eq!(
            storage.upload_path("req-1", "doc.pdf"),
            Path::new("/scratch/uploads/req-1_doc.pdf")
        );
        assert_eq!(
            storage.output_path("req-1", "doc.pdf"),
            Path::new("/scratch/outputs/req-1_unlocked_doc.pdf")
        );
    }

    #[tokio::test]
    async fn test_stage_and_remove() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = storage_in(tmp.path());
        storage.ensure_dirs().await.unwrap();

        let dest = storage.upload_path("req-2", "doc.pdf");
        let mut reader = &b"%PDF-1.5 fake"[..];
        let bytes = storage.stage_upload(&dest, &mut reader).await.unwrap();
        assert_eq!(bytes, 13);
        assert!(dest.exists());

        storage.remove(&dest).await;
        assert!(!dest.exists());

        // removing again is a silent no-op
        storage.remove(&dest).await;
    }

    #[tokio::test]
    async fn test_sweep_only_removes_stale_files() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = storage_in(tmp.path());
        storage.ensure_dirs().await.unwrap();

        let stale = storage.upload_path("req-3", "old.pdf");
        let fresh = storage.output_path("req-3", "new.pdf");
        fs::write(&stale, b"old").await.unwrap();
        fs::write(&fresh, b"new").await.unwrap();

        // Files were just written, so a cutoff in the future catches both and
        // a cutoff in the past catches neither.
        let removed = storage
            .sweep_older_than(Utc::now() - chrono::Duration::hours(1))
            .await;
        assert_eq!(removed, 0);
        assert!(stale.exists() && fresh.exists());

        let removed = storage
            .sweep_older_than(Utc::now() + chrono::Duration::hours(1))
            .await;
        assert_eq!(removed, 2);
        assert!(!stale.exists() && !fresh.exists());
    }
}
