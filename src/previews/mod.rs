//! Background loading of raw image bytes for the visible search results
//!
//! The UI shows thumbnails next to each result. Producing them is the UI's job; this
//! module only fetches the file contents, in result order, on a worker thread that the
//! caller can cancel when a new keystroke makes the request stale.
//!
//! Cancellation is cooperative: the worker checks the [`CancellationToken`] before each
//! image, so the image in flight always completes. Everything loaded before the cancel
//! stays in the cache and is reused by the next request (at-least-once per image).

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::repository::Repository;
use crate::search::SearchEngine;

/// Files larger than this (in bytes) are not previewed
pub const PREVIEW_SIZE_LIMIT: u64 = 250_000;

/// Shared flag telling a preview worker to stop before its next image
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// One image to preview
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewRequest {
    pub image_id: i32,
    pub path: PathBuf,
}

impl PreviewRequest {
    /// Requests for the engine's visible results, best first.
    ///
    /// Results whose directory is no longer referenced cannot be located and are left out.
    pub fn for_results(engine: &SearchEngine, repo: &Repository) -> Vec<Self> {
        engine
            .result_images(repo)
            .into_iter()
            .filter_map(|img| {
                engine.resolve_full_path(repo, img).map(|path| Self { image_id: img.id, path })
            })
            .collect()
    }
}

/// What one [`PreviewLoader::load`] pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    pub already_cached: usize,
    pub skipped: usize,
    pub cancelled: bool,
}

/// A preview pass running on a worker thread
pub struct PreviewJob {
    token: CancellationToken,
    handle: JoinHandle<LoadReport>,
}

impl PreviewJob {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Wait for the worker to finish (or notice cancellation)
    pub fn join(self) -> LoadReport {
        match self.handle.join() {
            Ok(report) => report,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

/// Cache of raw image bytes keyed by image ID
#[derive(Debug, Clone)]
pub struct PreviewLoader {
    cache: Arc<Mutex<HashMap<i32, Arc<Vec<u8>>>>>,
    size_limit: u64,
}

impl Default for PreviewLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewLoader {
    pub fn new() -> Self {
        Self::with_size_limit(PREVIEW_SIZE_LIMIT)
    }

    pub fn with_size_limit(size_limit: u64) -> Self {
        Self { cache: Arc::new(Mutex::new(HashMap::new())), size_limit }
    }

    /// Load every request in order on the current thread, stopping early once `token`
    /// is cancelled.
    ///
    /// Missing files, unreadable files and files over the size limit are skipped.
    pub fn load(&self, requests: &[PreviewRequest], token: &CancellationToken) -> LoadReport {
        let mut report = LoadReport::default();

        for request in requests {
            if token.is_cancelled() {
                report.cancelled = true;
                break;
            }

            if self.cache.lock().contains_key(&request.image_id) {
                report.already_cached += 1;
                continue;
            }

            match self.read_preview(request) {
                Some(bytes) => {
                    self.cache.lock().insert(request.image_id, Arc::new(bytes));
                    report.loaded += 1;
                }
                None => report.skipped += 1,
            }
        }

        debug!(
            loaded = report.loaded,
            cached = report.already_cached,
            skipped = report.skipped,
            cancelled = report.cancelled,
            "preview pass finished"
        );
        report
    }

    /// Run [`load`](Self::load) on a new worker thread
    pub fn spawn(&self, requests: Vec<PreviewRequest>) -> PreviewJob {
        let token = CancellationToken::new();
        let loader = self.clone();
        let worker_token = token.clone();
        let handle = thread::spawn(move || loader.load(&requests, &worker_token));
        PreviewJob { token, handle }
    }

    pub fn get(&self, image_id: i32) -> Option<Arc<Vec<u8>>> {
        self.cache.lock().get(&image_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached preview (e.g. after a rescan changed the files)
    pub fn clear(&self) {
        self.cache.lock().clear();
    }

    fn read_preview(&self, request: &PreviewRequest) -> Option<Vec<u8>> {
        let metadata = match fs::metadata(&request.path) {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return None,
            Err(e) => {
                debug!(path = %request.path.display(), error = %e, "preview file unavailable");
                return None;
            }
        };

        if metadata.len() > self.size_limit {
            debug!(path = %request.path.display(), size = metadata.len(), "preview file too large");
            return None;
        }

        match fs::read(&request.path) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(path = %request.path.display(), error = %e, "failed to read preview");
                None
            }
        }
    }
}
