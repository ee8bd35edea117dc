use crate::bitmap::Bitmap;
use crate::config::DownloaderConfig;
use crate::error::{PanoramaError, PanoramaResult};
use crate::format::PixelFormat;
use crate::listener::DownloadListener;
use crate::source::{ImageSource, SourceOrigin};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub source: ImageSource,
    pub format: PixelFormat,
}

/// Asynchronous image fetcher. Implementations must not block the caller; the result is reported
/// exactly once through the listener, from whatever thread finished the work.
pub trait ImageDownloader {
    fn fetch(&self, request: FetchRequest, listener: DownloadListener);
}

struct FetchJob {
    request: FetchRequest,
    listener: DownloadListener,
}

#[derive(Debug, Clone)]
struct FetchSettings {
    asset_root: Option<PathBuf>,
    max_dimension: u32,
}

/// Worker pool that reads images from the local filesystem and decodes them off the UI context.
pub struct FileDownloader {
    senders: Vec<mpsc::SyncSender<FetchJob>>,
    next_sender: AtomicUsize,
}

impl FileDownloader {
    pub fn new(config: &DownloaderConfig) -> Result<Self> {
        let settings =
            Arc::new(FetchSettings { asset_root: config.asset_root.clone(), max_dimension: config.max_dimension });
        let worker_count = config.worker_count();
        let mut senders = Vec::with_capacity(worker_count);
        for index in 0..worker_count {
            let (tx, rx) = mpsc::sync_channel::<FetchJob>(config.queue_depth.max(1));
            let settings = Arc::clone(&settings);
            thread::Builder::new()
                .name(format!("panorama-fetch-{index}"))
                .spawn(move || {
                    while let Ok(job) = rx.recv() {
                        run_fetch_job(job, &settings);
                    }
                })
                .with_context(|| format!("spawning panorama fetch worker {index}"))?;
            senders.push(tx);
        }
        log::debug!("[downloader] started {worker_count} fetch worker(s)");
        Ok(Self { senders, next_sender: AtomicUsize::new(0) })
    }

    pub fn worker_count(&self) -> usize {
        self.senders.len()
    }
}

impl ImageDownloader for FileDownloader {
    /// Hands the fetch to the next worker with queue space. When every queue is full the listener
    /// is failed right away instead of blocking the UI context.
    fn fetch(&self, request: FetchRequest, listener: DownloadListener) {
        let workers = self.senders.len();
        let mut job = FetchJob { request, listener };
        let first = self.next_sender.fetch_add(1, AtomicOrdering::Relaxed) % workers.max(1);
        for sender in self.senders.iter().cycle().skip(first).take(workers) {
            job = match sender.try_send(job) {
                Ok(()) => return,
                Err(mpsc::TrySendError::Full(job)) => job,
                Err(mpsc::TrySendError::Disconnected(job)) => {
                    log::warn!("[downloader] fetch worker exited; trying the next one");
                    job
                }
            };
        }
        log::warn!(
            "[downloader] all {workers} fetch queue(s) saturated; rejecting fetch {}",
            job.listener.token().id()
        );
        job.listener.failed("image fetch queue is full");
    }
}

fn run_fetch_job(job: FetchJob, settings: &FetchSettings) {
    let FetchJob { request, listener } = job;
    if !listener.is_valid() {
        log::debug!("[downloader] skipping cancelled fetch {}", listener.token().id());
        return;
    }
    match load_bitmap(&request, settings) {
        Ok(bitmap) => listener.completed(bitmap),
        Err(err) => listener.failed(err.to_string()),
    }
}

fn load_bitmap(request: &FetchRequest, settings: &FetchSettings) -> PanoramaResult<Bitmap> {
    let path = match request.source.origin()? {
        SourceOrigin::File(path) => resolve_path(settings.asset_root.as_deref(), path),
        SourceOrigin::Remote(url) => return Err(PanoramaError::UnsupportedSource(url)),
    };
    let bytes = fs::read(&path).map_err(|source| PanoramaError::Io { path: path.clone(), source })?;
    Bitmap::decode(&bytes, request.format, settings.max_dimension)
}

fn resolve_path(root: Option<&Path>, path: PathBuf) -> PathBuf {
    match root {
        Some(root) if path.is_relative() => root.join(path),
        _ => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::UiQueue;
    use crate::listener::ListenerToken;
    use crate::node::PanoramaNode;

    fn request(uri: &str) -> FetchRequest {
        FetchRequest { source: ImageSource::from_uri(uri), format: PixelFormat::Rgba8 }
    }

    fn pool(senders: Vec<mpsc::SyncSender<FetchJob>>) -> FileDownloader {
        FileDownloader { senders, next_sender: AtomicUsize::new(0) }
    }

    #[test]
    fn saturated_queues_fail_the_listener_immediately() {
        let (tx, rx) = mpsc::sync_channel(1);
        let downloader = pool(vec![tx]);
        let queue: UiQueue<PanoramaNode> = UiQueue::new();

        downloader.fetch(request("a.png"), DownloadListener::new(ListenerToken::new(), queue.sender()));
        assert!(queue.drain().is_empty());

        downloader.fetch(request("b.png"), DownloadListener::new(ListenerToken::new(), queue.sender()));
        assert_eq!(queue.drain().len(), 1, "rejected fetch should post its failure");

        let queued = rx.try_recv().expect("first fetch queued");
        assert_eq!(queued.request.source.uri(), Some("a.png"));
        queued.listener.failed("test teardown");
    }

    #[test]
    fn exited_workers_are_skipped() {
        let (dead_tx, dead_rx) = mpsc::sync_channel(1);
        let (live_tx, live_rx) = mpsc::sync_channel(1);
        drop(dead_rx);
        let downloader = pool(vec![dead_tx, live_tx]);
        let queue: UiQueue<PanoramaNode> = UiQueue::new();

        downloader.fetch(request("sky.png"), DownloadListener::new(ListenerToken::new(), queue.sender()));

        assert!(queue.drain().is_empty());
        let queued = live_rx.try_recv().expect("fetch routed to the live worker");
        assert_eq!(queued.request.source.uri(), Some("sky.png"));
        queued.listener.failed("test teardown");
    }

    #[test]
    fn relative_paths_resolve_against_asset_root() {
        let root = Path::new("/srv/assets");
        assert_eq!(resolve_path(Some(root), PathBuf::from("sky.png")), PathBuf::from("/srv/assets/sky.png"));
        assert_eq!(resolve_path(Some(root), PathBuf::from("/abs/sky.png")), PathBuf::from("/abs/sky.png"));
        assert_eq!(resolve_path(None, PathBuf::from("sky.png")), PathBuf::from("sky.png"));
    }

    #[test]
    fn remote_sources_are_rejected() {
        let request =
            FetchRequest { source: ImageSource::from_uri("https://example.com/sky.jpg"), format: PixelFormat::Rgba8 };
        let settings = FetchSettings { asset_root: None, max_dimension: 64 };
        let err = load_bitmap(&request, &settings).unwrap_err();
        assert!(matches!(err, PanoramaError::UnsupportedSource(_)));
    }

    #[test]
    fn missing_files_report_the_path() {
        let request =
            FetchRequest { source: ImageSource::from_uri("does/not/exist.png"), format: PixelFormat::Rgba8 };
        let settings = FetchSettings { asset_root: None, max_dimension: 64 };
        let err = load_bitmap(&request, &settings).unwrap_err();
        assert!(err.to_string().contains("does/not/exist.png"), "unexpected error: {err}");
    }
}
