use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::GalleryError;
use crate::mapping::thumbnail_name;

const QUEUE_CAPACITY: usize = 100;

/// Grabs a single still frame from a video file.
#[async_trait]
pub trait FrameExtractor: Send + Sync {
    async fn extract(&self, src: &Path, out: &Path) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FfmpegExtractor {
    binary: String,
}

impl FfmpegExtractor {
    pub fn new(binary: impl Into<String>) -> Self { Self { binary: binary.into() } }

    async fn run(&self, src: &Path, out: &Path, seek: Option<&str>) -> Result<()> {
        let mut cmd = tokio::process::Command::new(&self.binary);
        cmd.args(["-y", "-loglevel", "error"]);
        if let Some(s) = seek { cmd.args(["-ss", s]); }
        cmd.arg("-i").arg(src).args(["-frames:v", "1", "-vf", "scale=320:-1"]).arg(out);
        let output = cmd.output().await.with_context(|| format!("spawning {}", self.binary))?;
        if !output.status.success() {
            bail!("{} exited with {}: {}", self.binary, output.status, String::from_utf8_lossy(&output.stderr).trim());
        }
        Ok(())
    }
}

#[async_trait]
impl FrameExtractor for FfmpegExtractor {
    async fn extract(&self, src: &Path, out: &Path) -> Result<()> {
        // Clips shorter than the seek offset produce no frame; retry from the start.
        match self.run(src, out, Some("1")).await {
            Ok(()) if tokio::fs::try_exists(out).await.unwrap_or(false) => Ok(()),
            _ => self.run(src, out, None).await,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailResult {
    pub media_item_id: String,
    /// Thumbnail file name on success, error text otherwise.
    pub outcome: Result<String, String>,
}

struct Job {
    media_item_id: String,
    src: PathBuf,
}

/// Fixed pool of workers behind a bounded queue. Requests for an item already being
/// processed are absorbed by the in-flight set.
pub struct Thumbnailer {
    out_dir: PathBuf,
    tx: mpsc::Sender<Job>,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl Thumbnailer {
    /// Spawn `workers` tasks on the current runtime. Results arrive on the returned receiver.
    pub fn start(out_dir: impl Into<PathBuf>, workers: usize, extractor: Arc<dyn FrameExtractor>) -> (Self, mpsc::Receiver<ThumbnailResult>) {
        let out_dir = out_dir.into();
        let (tx, rx) = mpsc::channel::<Job>(QUEUE_CAPACITY);
        let (res_tx, res_rx) = mpsc::channel::<ThumbnailResult>(QUEUE_CAPACITY);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let in_flight: Arc<Mutex<HashSet<String>>> = Arc::default();

        for worker in 0..workers.max(1) {
            let rx = rx.clone();
            let res_tx = res_tx.clone();
            let in_flight = in_flight.clone();
            let extractor = extractor.clone();
            let out_dir = out_dir.clone();
            tokio::spawn(async move {
                loop {
                    let job = { rx.lock().await.recv().await };
                    let Some(job) = job else { break };
                    let name = thumbnail_name(&job.media_item_id);
                    let out = out_dir.join(&name);
                    let outcome = match tokio::fs::create_dir_all(&out_dir).await {
                        Ok(()) => extractor.extract(&job.src, &out).await.map(|_| name).map_err(|e| format!("{e:#}")),
                        Err(e) => Err(format!("creating {}: {e}", out_dir.display())),
                    };
                    if let Err(e) = &outcome {
                        tracing::warn!(worker, id = %job.media_item_id, error = %e, "thumbnail generation failed");
                    }
                    lock(&in_flight).remove(&job.media_item_id);
                    // Receiver gone means shutdown; nothing left to report to.
                    let _ = res_tx.send(ThumbnailResult { media_item_id: job.media_item_id, outcome }).await;
                }
                tracing::debug!(worker, "thumbnail worker stopped");
            });
        }

        (Self { out_dir, tx, in_flight }, res_rx)
    }

    pub fn out_dir(&self) -> &Path { &self.out_dir }

    pub fn is_in_flight(&self, media_item_id: &str) -> bool { lock(&self.in_flight).contains(media_item_id) }

    /// Queue generation for an item. Already in flight counts as success.
    pub fn request(&self, media_item_id: &str, src: PathBuf) -> Result<(), GalleryError> {
        let mut in_flight = lock(&self.in_flight);
        if in_flight.contains(media_item_id) {
            return Ok(());
        }
        let job = Job { media_item_id: media_item_id.to_string(), src };
        self.tx.try_send(job).map_err(|_| GalleryError::QueueFull)?;
        in_flight.insert(media_item_id.to_string());
        Ok(())
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> { m.lock().unwrap_or_else(|e| e.into_inner()) }

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FakeExtractor {
        calls: AtomicUsize,
        gate: tokio::sync::Notify,
    }

    #[async_trait]
    impl FrameExtractor for FakeExtractor {
        async fn extract(&self, src: &Path, out: &Path) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            if src.ends_with("broken.mp4") { bail!("no video stream"); }
            tokio::fs::write(out, b"jpeg").await?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn duplicate_requests_run_once() {
        let tmp = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeExtractor { calls: AtomicUsize::new(0), gate: tokio::sync::Notify::new() });
        let (tn, mut results) = Thumbnailer::start(tmp.path(), 2, fake.clone());

        tn.request("v1", PathBuf::from("clip.mp4")).unwrap();
        tn.request("v1", PathBuf::from("clip.mp4")).unwrap();
        assert!(tn.is_in_flight("v1"));

        fake.gate.notify_one();
        let res = tokio::time::timeout(Duration::from_secs(5), results.recv()).await.unwrap().unwrap();
        assert_eq!(res, ThumbnailResult { media_item_id: "v1".into(), outcome: Ok("v1.jpg".into()) });
        assert_eq!(fake.calls.load(Ordering::SeqCst), 1);
        assert!(!tn.is_in_flight("v1"));
        assert!(tmp.path().join("v1.jpg").exists());
    }

    #[tokio::test]
    async fn failures_are_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeExtractor { calls: AtomicUsize::new(0), gate: tokio::sync::Notify::new() });
        let (tn, mut results) = Thumbnailer::start(tmp.path(), 1, fake.clone());
        tn.request("v2", PathBuf::from("broken.mp4")).unwrap();
        fake.gate.notify_one();
        let res = tokio::time::timeout(Duration::from_secs(5), results.recv()).await.unwrap().unwrap();
        assert!(res.outcome.is_err());
        assert!(!tn.is_in_flight("v2"));
    }
}
