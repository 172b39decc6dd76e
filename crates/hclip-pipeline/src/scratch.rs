//! Per-request scratch namespaces.
//!
//! Layout under the scratch root:
//!
//! ```text
//! <root>/<request_id>/                      rendered clips (kept until evicted)
//! <root>/<request_id>/.source-XXXXXX/       downloaded media (removed when the request ends)
//! ```

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tempfile::TempDir;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{PipelineError, PipelineResult};

/// Root directory that owns one namespace per request.
#[derive(Debug, Clone)]
pub struct ScratchSpace {
    root: PathBuf,
}

impl ScratchSpace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Allocate a fresh namespace for one request.
    pub async fn create_request(&self) -> PipelineResult<RequestScratch> {
        let request_id = Uuid::new_v4();
        let dir = self.root.join(request_id.to_string());
        tokio::fs::create_dir_all(&dir).await?;

        let source = tempfile::Builder::new()
            .prefix(".source-")
            .tempdir_in(&dir)?;

        debug!(request_id = %request_id, dir = %dir.display(), "Allocated request scratch");

        Ok(RequestScratch {
            request_id,
            dir,
            source: Some(source),
        })
    }

    /// Resolve a retrievable artifact path from its two path segments.
    ///
    /// Both segments must be plain names: the request id a UUID and the file
    /// name free of separators and leading dots. Existence is not checked.
    pub fn resolve_artifact(&self, request_id: &str, filename: &str) -> PipelineResult<PathBuf> {
        let request_id = Uuid::parse_str(request_id)
            .map_err(|_| PipelineError::invalid_request("Invalid request id"))?;

        if !is_plain_file_name(filename) {
            return Err(PipelineError::invalid_request("Invalid file name"));
        }

        Ok(self.root.join(request_id.to_string()).join(filename))
    }

    /// Check that the root exists (creating it if needed) and accepts writes.
    pub async fn check_writable(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        let probe = self.root.join(format!(".probe-{}", Uuid::new_v4()));
        tokio::fs::write(&probe, b"ok").await?;
        tokio::fs::remove_file(&probe).await
    }

    /// Delete request namespaces whose modification time is older than `ttl`.
    ///
    /// Entries that are not request namespaces are left alone. Returns the
    /// number of namespaces removed.
    pub async fn sweep_expired(&self, ttl: Duration) -> std::io::Result<usize> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };

        let now = SystemTime::now();
        let mut removed = 0;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let is_namespace = name
                .to_str()
                .map(|n| Uuid::parse_str(n).is_ok())
                .unwrap_or(false);
            if !is_namespace {
                continue;
            }

            let metadata = match entry.metadata().await {
                Ok(m) if m.is_dir() => m,
                _ => continue,
            };

            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or_default();

            if age <= ttl {
                continue;
            }

            match tokio::fs::remove_dir_all(entry.path()).await {
                Ok(()) => {
                    debug!(path = %entry.path().display(), age_secs = age.as_secs(), "Evicted request scratch");
                    removed += 1;
                }
                Err(e) => warn!(path = %entry.path().display(), "Failed to evict request scratch: {}", e),
            }
        }

        Ok(removed)
    }
}

/// Scratch namespace owned by a single request.
#[derive(Debug)]
pub struct RequestScratch {
    request_id: Uuid,
    dir: PathBuf,
    source: Option<TempDir>,
}

impl RequestScratch {
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Directory that holds rendered clips.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Temporary directory for downloaded source media.
    pub fn source_dir(&self) -> &Path {
        self.source
            .as_ref()
            .map(TempDir::path)
            .unwrap_or(self.dir.as_path())
    }

    /// Absolute path of an artifact in this namespace.
    pub fn artifact_path(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    /// Artifact name relative to the scratch root: `<request_id>/<filename>`.
    pub fn artifact_name(&self, filename: &str) -> String {
        format!("{}/{}", self.request_id, filename)
    }

    /// Remove the source media, keeping rendered clips.
    ///
    /// The recursive delete runs on the blocking pool.
    pub async fn release_source(&mut self) {
        let Some(source) = self.source.take() else {
            return;
        };
        let path = source.path().to_path_buf();

        match tokio::task::spawn_blocking(move || source.close()).await {
            Ok(Ok(())) => debug!(path = %path.display(), "Released source scratch"),
            Ok(Err(e)) => warn!(path = %path.display(), "Failed to remove source scratch: {}", e),
            Err(e) => warn!(path = %path.display(), "Source cleanup task failed: {}", e),
        }
    }

    /// Remove the whole namespace, used when the request produced nothing to keep.
    pub async fn discard(mut self) {
        self.release_source().await;
        if let Err(e) = tokio::fs::remove_dir_all(&self.dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(dir = %self.dir.display(), "Failed to remove request scratch: {}", e);
            }
        }
    }
}

impl Drop for RequestScratch {
    fn drop(&mut self) {
        let Some(source) = self.source.take() else {
            return;
        };
        // Outside a runtime the TempDir is dropped (and deleted) in place
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn_blocking(move || drop(source));
        }
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 255
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_request_namespaces_are_isolated() {
        let root = tempfile::tempdir().unwrap();
        let scratch = ScratchSpace::new(root.path());

        let a = scratch.create_request().await.unwrap();
        let b = scratch.create_request().await.unwrap();

        assert_ne!(a.request_id(), b.request_id());
        assert_ne!(a.dir(), b.dir());
        assert!(a.source_dir().starts_with(a.dir()));
        assert!(a.source_dir().exists());
    }

    #[tokio::test]
    async fn test_release_source_keeps_clips() {
        let root = tempfile::tempdir().unwrap();
        let scratch = ScratchSpace::new(root.path());
        let mut request = scratch.create_request().await.unwrap();

        let clip = request.artifact_path("abc_clip_1.mp4");
        std::fs::write(&clip, b"clip").unwrap();
        let source = request.source_dir().to_path_buf();
        std::fs::write(source.join("abc.mp4"), b"video").unwrap();

        request.release_source().await;

        assert!(!source.exists());
        assert!(clip.exists());
        assert_eq!(
            request.artifact_name("abc_clip_1.mp4"),
            format!("{}/abc_clip_1.mp4", request.request_id())
        );
    }

    #[tokio::test]
    async fn test_drop_releases_source_off_runtime_thread() {
        let root = tempfile::tempdir().unwrap();
        let scratch = ScratchSpace::new(root.path());
        let request = scratch.create_request().await.unwrap();
        let dir = request.dir().to_path_buf();
        let source = request.source_dir().to_path_buf();
        std::fs::write(source.join("abc.mp4"), b"video").unwrap();

        drop(request);

        for _ in 0..100 {
            if !source.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!source.exists());
        assert!(dir.exists());
    }

    #[test]
    fn test_drop_outside_runtime_releases_source() {
        let root = tempfile::tempdir().unwrap();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let request = runtime
            .block_on(ScratchSpace::new(root.path()).create_request())
            .unwrap();
        let source = request.source_dir().to_path_buf();
        drop(runtime);

        drop(request);
        assert!(!source.exists());
    }

    #[tokio::test]
    async fn test_discard_removes_namespace() {
        let root = tempfile::tempdir().unwrap();
        let scratch = ScratchSpace::new(root.path());
        let request = scratch.create_request().await.unwrap();
        let dir = request.dir().to_path_buf();

        request.discard().await;
        assert!(!dir.exists());
    }

    #[test]
    fn test_resolve_artifact_rejects_traversal() {
        let scratch = ScratchSpace::new("/tmp/hclip");
        let id = Uuid::new_v4().to_string();

        assert!(scratch.resolve_artifact(&id, "abc_clip_1.mp4").is_ok());
        assert!(scratch.resolve_artifact(&id, "..").is_err());
        assert!(scratch.resolve_artifact(&id, ".source-x").is_err());
        assert!(scratch.resolve_artifact(&id, "a/b.mp4").is_err());
        assert!(scratch.resolve_artifact("not-a-uuid", "abc_clip_1.mp4").is_err());
    }

    #[tokio::test]
    async fn test_sweep_expired() {
        let root = tempfile::tempdir().unwrap();
        let scratch = ScratchSpace::new(root.path());
        let mut request = scratch.create_request().await.unwrap();
        request.release_source().await;
        let dir = request.dir().to_path_buf();
        drop(request);

        std::fs::create_dir(root.path().join("unrelated")).unwrap();

        // Fresh namespace survives a generous TTL
        assert_eq!(scratch.sweep_expired(Duration::from_secs(3600)).await.unwrap(), 0);
        assert!(dir.exists());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(scratch.sweep_expired(Duration::ZERO).await.unwrap(), 1);
        assert!(!dir.exists());
        assert!(root.path().join("unrelated").exists());
    }

    #[tokio::test]
    async fn test_sweep_missing_root() {
        let scratch = ScratchSpace::new("/nonexistent/hclip-scratch-root");
        assert_eq!(scratch.sweep_expired(Duration::ZERO).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_check_writable() {
        let root = tempfile::tempdir().unwrap();
        let scratch = ScratchSpace::new(root.path().join("nested"));
        assert!(scratch.check_writable().await.is_ok());
    }
}
