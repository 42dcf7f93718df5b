//! Trailing-edge debounce for layout recomputation.
//!
//! Every `trigger` supersedes the one before it. A task runs only if no newer
//! trigger arrived during its quiet window, so a burst of edits produces one
//! measurement pass for the settled state instead of one per keystroke.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

#[derive(Clone)]
pub struct Debouncer {
    quiet: Duration,
    latest: Arc<AtomicU64>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            latest: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Schedules `task` to run after the quiet window unless superseded.
    ///
    /// The returned handle resolves to `true` if the task ran.
    pub fn trigger<F>(&self, task: F) -> JoinHandle<bool>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let ticket = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let latest = self.latest.clone();
        let quiet = self.quiet;

        tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            if latest.load(Ordering::SeqCst) != ticket {
                return false;
            }
            task.await;
            true
        })
    }
}
