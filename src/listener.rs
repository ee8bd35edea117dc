use crate::bitmap::Bitmap;
use crate::dispatch::UiSender;
use crate::node::PanoramaNode;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_TOKEN_ID: AtomicU64 = AtomicU64::new(1);

/// Validity flag shared between a node and the fetch it started.
///
/// Starts valid; `invalidate` is terminal. Once invalidated, completion and failure signals for the
/// fetch are dropped without touching the node.
#[derive(Debug, Clone)]
pub struct ListenerToken {
    id: u64,
    valid: Arc<AtomicBool>,
}

impl ListenerToken {
    pub fn new() -> Self {
        Self { id: NEXT_TOKEN_ID.fetch_add(1, Ordering::Relaxed), valid: Arc::new(AtomicBool::new(true)) }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    pub fn invalidate(&self) {
        self.valid.store(false, Ordering::Release);
    }
}

impl Default for ListenerToken {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for ListenerToken {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ListenerToken {}

/// One-shot callback handed to the downloader for a single fetch.
///
/// Both callbacks consume the listener. They may be called from any thread; the actual state change
/// is posted to the node's UI queue and runs on the next `pump`. A listener dropped without either
/// callback (worker panic, downloader discarding the job) reports the fetch as abandoned.
pub struct DownloadListener {
    token: ListenerToken,
    sender: UiSender<PanoramaNode>,
    settled: bool,
}

pub const ABANDONED_MESSAGE: &str = "image fetch abandoned";

impl DownloadListener {
    pub(crate) fn new(token: ListenerToken, sender: UiSender<PanoramaNode>) -> Self {
        Self { token, sender, settled: false }
    }

    pub fn token(&self) -> &ListenerToken {
        &self.token
    }

    pub fn is_valid(&self) -> bool {
        self.token.is_valid()
    }

    pub fn completed(mut self, bitmap: Bitmap) {
        self.settled = true;
        if !self.token.is_valid() {
            log::debug!("[panorama] dropping stale completion for fetch {}", self.token.id());
            return;
        }
        let token = self.token.clone();
        let posted = self.sender.submit(move |node: &mut PanoramaNode| node.finish_download(&token, bitmap));
        if !posted {
            log::debug!("[panorama] node dropped before fetch {} completed", self.token.id());
        }
    }

    pub fn failed(mut self, message: impl Into<String>) {
        self.settled = true;
        self.post_failure(message.into());
    }

    fn post_failure(&self, message: String) {
        if !self.token.is_valid() {
            log::debug!("[panorama] dropping stale failure for fetch {}", self.token.id());
            return;
        }
        let token = self.token.clone();
        let posted = self.sender.submit(move |node: &mut PanoramaNode| node.fail_download(&token, message));
        if !posted {
            log::debug!("[panorama] node dropped before fetch {} failed", self.token.id());
        }
    }
}

impl Drop for DownloadListener {
    fn drop(&mut self) {
        if self.settled || !self.token.is_valid() {
            return;
        }
        log::warn!("[panorama] fetch {} dropped without a result", self.token.id());
        self.post_failure(ABANDONED_MESSAGE.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_start_valid_and_invalidate_idempotently() {
        let token = ListenerToken::new();
        assert!(token.is_valid());
        token.invalidate();
        token.invalidate();
        assert!(!token.is_valid());
    }

    #[test]
    fn clones_share_validity() {
        let token = ListenerToken::new();
        let remote = token.clone();
        token.invalidate();
        assert!(!remote.is_valid());
        assert_eq!(token, remote);
    }

    #[test]
    fn fresh_tokens_are_distinct() {
        assert_ne!(ListenerToken::new(), ListenerToken::new());
    }
}
