//! In-memory render job registry.
//!
//! Each job owns a `watch` channel: the renderer holds the sender, the
//! registry keeps a receiver so pollers can read the latest snapshot of that
//! job alone. Finished jobs are pruned after a retention period.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use slidecast_models::{JobId, RenderProgress, RenderStatus};
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};

/// Shortest interval between prune passes.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

struct JobEntry {
    topic: String,
    progress: watch::Receiver<RenderProgress>,
    output: Option<PathBuf>,
    downloaded: bool,
    created_at: DateTime<Utc>,
}

impl JobEntry {
    fn snapshot(&self) -> RenderProgress {
        self.progress.borrow().clone()
    }

    /// Terminal, or abandoned by its renderer.
    fn is_finished(&self) -> bool {
        self.snapshot().status.is_terminal() || self.progress.has_changed().is_err()
    }
}

#[derive(Default)]
struct Jobs {
    entries: HashMap<JobId, JobEntry>,
    latest: Option<JobId>,
}

/// Public view of one job.
#[derive(Debug, Clone, Serialize)]
pub struct JobView {
    pub job_id: JobId,
    pub progress: f64,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub download_ready: bool,
    pub created_at: DateTime<Utc>,
}

/// Outcome of claiming a job's video.
#[derive(Debug, PartialEq)]
pub enum OutputClaim {
    /// The video, and the topic it was made from
    Ready { path: PathBuf, topic: String },
    /// Job exists but has not finished successfully
    NotReady(RenderStatus),
    /// Video was already handed out
    AlreadyDownloaded,
    /// No such job
    UnknownJob,
}

/// Registry of render jobs keyed by [`JobId`].
#[derive(Default)]
pub struct JobRegistry {
    jobs: RwLock<Jobs>,
}

impl JobRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new job and return its progress sender.
    ///
    /// The new job becomes the latest one reported by [`Self::latest`].
    pub async fn register(&self, topic: &str) -> (JobId, watch::Sender<RenderProgress>) {
        let job_id = JobId::new();
        let (tx, rx) = watch::channel(RenderProgress::default());

        let mut jobs = self.jobs.write().await;
        jobs.entries.insert(
            job_id.clone(),
            JobEntry {
                topic: topic.to_string(),
                progress: rx,
                output: None,
                downloaded: false,
                created_at: Utc::now(),
            },
        );
        jobs.latest = Some(job_id.clone());

        debug!(job_id = %job_id, "Registered job");
        (job_id, tx)
    }

    /// Progress snapshot of one job.
    pub async fn snapshot(&self, job_id: &JobId) -> Option<RenderProgress> {
        self.jobs.read().await.entries.get(job_id).map(JobEntry::snapshot)
    }

    /// Most recently registered job and its snapshot.
    pub async fn latest(&self) -> Option<(JobId, RenderProgress)> {
        let jobs = self.jobs.read().await;
        let job_id = jobs.latest.as_ref()?;
        let entry = jobs.entries.get(job_id)?;
        Some((job_id.clone(), entry.snapshot()))
    }

    /// Full view of one job.
    pub async fn view(&self, job_id: &JobId) -> Option<JobView> {
        let jobs = self.jobs.read().await;
        let entry = jobs.entries.get(job_id)?;
        let progress = entry.snapshot();

        Some(JobView {
            job_id: job_id.clone(),
            progress: progress.value,
            status: progress.status_text(),
            error: progress.error,
            download_ready: entry.output.is_some(),
            created_at: entry.created_at,
        })
    }

    /// Record the finished video of a job.
    pub async fn set_output(&self, job_id: &JobId, path: PathBuf) {
        let mut jobs = self.jobs.write().await;
        match jobs.entries.get_mut(job_id) {
            Some(entry) => entry.output = Some(path),
            None => warn!(job_id = %job_id, "Output recorded for unknown job"),
        }
    }

    /// Hand out a job's video. Each video can be claimed once.
    pub async fn claim_output(&self, job_id: &JobId) -> OutputClaim {
        let mut jobs = self.jobs.write().await;
        let Some(entry) = jobs.entries.get_mut(job_id) else {
            return OutputClaim::UnknownJob;
        };

        match entry.output.take() {
            Some(path) => {
                entry.downloaded = true;
                OutputClaim::Ready {
                    path,
                    topic: entry.topic.clone(),
                }
            }
            None if entry.downloaded => OutputClaim::AlreadyDownloaded,
            None => OutputClaim::NotReady(entry.snapshot().status),
        }
    }

    /// Number of tracked jobs.
    pub async fn len(&self) -> usize {
        self.jobs.read().await.entries.len()
    }

    /// Whether no jobs are tracked.
    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.entries.is_empty()
    }

    /// Drop finished jobs older than `retention`, deleting unclaimed videos.
    ///
    /// Jobs still rendering are kept regardless of age; a job whose progress
    /// sender is gone counts as finished. Returns the number of jobs removed.
    pub async fn prune(&self, retention: Duration) -> usize {
        let Some(cutoff) = chrono::Duration::from_std(retention)
            .ok()
            .and_then(|r| Utc::now().checked_sub_signed(r))
        else {
            return 0;
        };

        let removed: Vec<(JobId, Option<PathBuf>)> = {
            let mut jobs = self.jobs.write().await;
            let expired: Vec<JobId> = jobs
                .entries
                .iter()
                .filter(|(_, e)| e.created_at <= cutoff && e.is_finished())
                .map(|(id, _)| id.clone())
                .collect();

            let removed = expired
                .into_iter()
                .filter_map(|id| jobs.entries.remove(&id).map(|e| (id, e.output)))
                .collect::<Vec<_>>();

            if let Some(latest) = jobs.latest.clone() {
                if !jobs.entries.contains_key(&latest) {
                    jobs.latest = None;
                }
            }

            removed
        };

        for (job_id, output) in &removed {
            if let Some(path) = output {
                match tokio::fs::remove_file(path).await {
                    Ok(()) => debug!(job_id = %job_id, "Deleted unclaimed video"),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => warn!(job_id = %job_id, "Failed to delete {}: {}", path.display(), e),
                }
            }
        }

        removed.len()
    }

    /// Start the background prune loop.
    pub fn spawn_sweeper(self: Arc<Self>, retention: Duration) -> JoinHandle<()> {
        let every = (retention / 4).max(MIN_SWEEP_INTERVAL);
        info!("Starting job sweeper (retention: {:?}, interval: {:?})", retention, every);

        tokio::spawn(async move {
            let mut ticker = interval(every);
            loop {
                ticker.tick().await;
                let pruned = self.prune(retention).await;
                if pruned > 0 {
                    info!(pruned, "Pruned finished jobs");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_register_and_snapshot() {
        let registry = JobRegistry::new();
        assert!(registry.latest().await.is_none());

        let (job_id, tx) = registry.register("tides").await;
        tx.send_modify(|p| p.start());
        tx.send_modify(|p| p.section(1, 4));

        let snapshot = registry.snapshot(&job_id).await.unwrap();
        assert_eq!(snapshot.value, 25.0);
        assert_eq!(snapshot.status_text(), "Processing section 2/4");

        let (latest_id, _) = registry.latest().await.unwrap();
        assert_eq!(latest_id, job_id);
    }

    #[tokio::test]
    async fn test_jobs_are_isolated() {
        let registry = JobRegistry::new();
        let (first, tx1) = registry.register("a").await;
        let (second, tx2) = registry.register("b").await;

        tx1.send_modify(|p| p.complete());
        tx2.send_modify(|p| p.fail("boom"));

        assert_eq!(registry.snapshot(&first).await.unwrap().status, RenderStatus::Complete);
        assert_eq!(registry.snapshot(&second).await.unwrap().status, RenderStatus::Error);
        assert_eq!(registry.latest().await.unwrap().0, second);
    }

    #[tokio::test]
    async fn test_snapshot_survives_sender_drop() {
        let registry = JobRegistry::new();
        let (job_id, tx) = registry.register("x").await;
        tx.send_modify(|p| p.complete());
        drop(tx);

        assert_eq!(registry.snapshot(&job_id).await.unwrap().value, 100.0);
    }

    #[tokio::test]
    async fn test_claim_output_once() {
        let registry = JobRegistry::new();
        let (job_id, tx) = registry.register("rivers").await;

        assert_eq!(
            registry.claim_output(&job_id).await,
            OutputClaim::NotReady(RenderStatus::Idle)
        );

        tx.send_modify(|p| p.complete());
        registry.set_output(&job_id, PathBuf::from("/tmp/v.mp4")).await;
        assert!(registry.view(&job_id).await.unwrap().download_ready);

        assert_eq!(
            registry.claim_output(&job_id).await,
            OutputClaim::Ready {
                path: PathBuf::from("/tmp/v.mp4"),
                topic: "rivers".to_string()
            }
        );
        assert_eq!(registry.claim_output(&job_id).await, OutputClaim::AlreadyDownloaded);
        assert_eq!(
            registry.claim_output(&JobId::from("missing")).await,
            OutputClaim::UnknownJob
        );
    }

    #[tokio::test]
    async fn test_prune_removes_finished_jobs_and_files() {
        let dir = TempDir::new().unwrap();
        let video = dir.path().join("done.mp4");
        std::fs::write(&video, b"video").unwrap();

        let registry = JobRegistry::new();
        let (done, tx_done) = registry.register("done").await;
        tx_done.send_modify(|p| p.complete());
        registry.set_output(&done, video.clone()).await;

        let (running, tx_running) = registry.register("running").await;
        tx_running.send_modify(|p| p.section(0, 2));

        assert_eq!(registry.prune(Duration::ZERO).await, 1);
        assert!(registry.snapshot(&done).await.is_none());
        assert!(registry.snapshot(&running).await.is_some());
        assert!(!video.exists());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_prune_removes_abandoned_jobs() {
        let registry = JobRegistry::new();
        let (abandoned, tx) = registry.register("abandoned").await;
        tx.send_modify(|p| p.section(0, 3));
        drop(tx);

        let (_running, _tx_running) = registry.register("running").await;

        assert_eq!(registry.prune(Duration::ZERO).await, 1);
        assert!(registry.snapshot(&abandoned).await.is_none());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_prune_keeps_recent_jobs() {
        let registry = JobRegistry::new();
        let (_, tx) = registry.register("recent").await;
        tx.send_modify(|p| p.complete());

        assert_eq!(registry.prune(Duration::from_secs(3600)).await, 0);
        assert!(!registry.is_empty().await);
        assert!(registry.latest().await.is_some());
    }
}
