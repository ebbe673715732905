//! Delivering finished outputs.
//!
//! An [`ExportSink`] is the platform's "save" action: given bytes and a file
//! name it puts them somewhere the user can reach. Sinks are assumed to have
//! an implicit rate limit, so every call goes through an [`ExportThrottle`]
//! that keeps consecutive invocations at least one cooldown apart, whichever
//! path (auto-export or export-all) issued them.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Export rejected: {0}")]
    Rejected(String),
}

/// Platform save mechanism.
pub trait ExportSink: Send + Sync {
    fn export(&self, bytes: &[u8], file_name: &str) -> Result<(), ExportError>;
}

/// Writes outputs into a directory, created on first use.
///
/// Existing files are never overwritten: a clash gets a ` (1)`, ` (2)`, …
/// suffix before the extension, like a browser download.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

/// First path in `dir` named like `file_name` that does not exist yet.
fn unique_path(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }
    let (stem, ext) = match file_name.rfind('.') {
        Some(dot) if dot > 0 => (&file_name[..dot], &file_name[dot..]),
        _ => (file_name, ""),
    };
    (1..)
        .map(|n| dir.join(format!("{stem} ({n}){ext}")))
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

impl ExportSink for DirectorySink {
    fn export(&self, bytes: &[u8], file_name: &str) -> Result<(), ExportError> {
        if file_name.is_empty() || file_name.contains(['/', '\\']) {
            return Err(ExportError::Rejected(format!(
                "invalid file name {file_name:?}"
            )));
        }
        std::fs::create_dir_all(&self.dir)?;
        let path = unique_path(&self.dir, file_name);
        std::fs::write(&path, bytes)?;
        debug!("Wrote {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }
}

/// Serializes sink calls and spaces them at least `cooldown` apart.
pub struct ExportThrottle {
    sink: Arc<dyn ExportSink>,
    cooldown: Duration,
    last: Mutex<Option<Instant>>,
}

impl ExportThrottle {
    pub fn new(sink: Arc<dyn ExportSink>, cooldown: Duration) -> Self {
        Self {
            sink,
            cooldown,
            last: Mutex::new(None),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Export through the sink once the previous call is a cooldown behind.
    ///
    /// The sink runs on a blocking thread.
    pub async fn export(&self, bytes: Arc<[u8]>, file_name: String) -> Result<(), ExportError> {
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            tokio::time::sleep_until(previous + self.cooldown).await;
        }

        let sink = Arc::clone(&self.sink);
        let result = tokio::task::spawn_blocking(move || sink.export(&bytes, &file_name))
            .await
            .unwrap_or_else(|e| Err(ExportError::Rejected(format!("export task failed: {e}"))));

        *last = Some(Instant::now());
        result
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    /// Sink that records every call and when it happened.
    #[derive(Default)]
    pub struct RecordingSink {
        pub calls: StdMutex<Vec<(String, usize, std::time::Instant)>>,
        pub reject: bool,
    }

    impl RecordingSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn rejecting() -> Self {
            Self {
                reject: true,
                ..Self::default()
            }
        }

        pub fn names(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|(name, _, _)| name.clone())
                .collect()
        }

        pub fn times(&self) -> Vec<std::time::Instant> {
            self.calls.lock().unwrap().iter().map(|(_, _, t)| *t).collect()
        }
    }

    impl ExportSink for RecordingSink {
        fn export(&self, bytes: &[u8], file_name: &str) -> Result<(), ExportError> {
            if self.reject {
                return Err(ExportError::Rejected("sink is closed".into()));
            }
            self.calls.lock().unwrap().push((
                file_name.to_string(),
                bytes.len(),
                std::time::Instant::now(),
            ));
            Ok(())
        }
    }

    #[test]
    fn directory_sink_creates_dir_and_writes() {
        let tmp = tempfile::TempDir::new().unwrap();
        let sink = DirectorySink::new(tmp.path().join("out"));
        sink.export(b"abc", "a.webp").unwrap();
        assert_eq!(std::fs::read(tmp.path().join("out/a.webp")).unwrap(), b"abc");
    }

    #[test]
    fn directory_sink_never_overwrites() {
        let tmp = tempfile::TempDir::new().unwrap();
        let sink = DirectorySink::new(tmp.path());
        sink.export(b"1", "a.webp").unwrap();
        sink.export(b"2", "a.webp").unwrap();
        sink.export(b"3", "a.webp").unwrap();
        assert_eq!(std::fs::read(tmp.path().join("a.webp")).unwrap(), b"1");
        assert_eq!(std::fs::read(tmp.path().join("a (1).webp")).unwrap(), b"2");
        assert_eq!(std::fs::read(tmp.path().join("a (2).webp")).unwrap(), b"3");
    }

    #[test]
    fn directory_sink_rejects_path_traversal() {
        let tmp = tempfile::TempDir::new().unwrap();
        let sink = DirectorySink::new(tmp.path());
        assert!(matches!(
            sink.export(b"x", "../escape.png"),
            Err(ExportError::Rejected(_))
        ));
        assert!(matches!(sink.export(b"x", ""), Err(ExportError::Rejected(_))));
    }

    #[tokio::test]
    async fn throttle_spaces_consecutive_exports() {
        let sink = Arc::new(RecordingSink::new());
        let throttle = ExportThrottle::new(sink.clone(), Duration::from_millis(60));

        for name in ["a", "b", "c"] {
            throttle.export(Arc::from(&b"x"[..]), name.into()).await.unwrap();
        }

        let times = sink.times();
        assert_eq!(sink.names(), vec!["a", "b", "c"]);
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(55));
        }
    }

    #[tokio::test]
    async fn throttle_first_export_is_immediate() {
        let sink = Arc::new(RecordingSink::new());
        let throttle = ExportThrottle::new(sink.clone(), Duration::from_secs(30));
        let started = std::time::Instant::now();
        throttle.export(Arc::from(&b"x"[..]), "a".into()).await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn throttle_propagates_sink_errors() {
        let throttle =
            ExportThrottle::new(Arc::new(RecordingSink::rejecting()), Duration::ZERO);
        let result = throttle.export(Arc::from(&b"x"[..]), "a".into()).await;
        assert!(matches!(result, Err(ExportError::Rejected(_))));
    }
}
