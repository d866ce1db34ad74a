//! Progress bar utilities for displaying render status

use kdam::{Animation, Bar, BarExt};
use std::sync::{Arc, Mutex};

// Progress bar type alias
pub type ProgressBar = Arc<Mutex<Bar>>;

/// Create a percentage bar over `total` items.
pub fn create_progress_bar(total: usize, desc: &'static str) -> ProgressBar {
    let bar = Arc::new(Mutex::new(kdam::tqdm!(
        total = total,
        desc = desc,
        animation = Animation::Classic,
        unit = " parts"
    )));
    refresh_bar(&bar);
    bar
}

/// Force a refresh of the bar (so it shows 0/N before the first job lands).
pub fn refresh_bar(pb: &ProgressBar) {
    if let Ok(mut bar) = pb.try_lock() {
        let _ = bar.refresh();
    }
}

/// Advance the bar by `n`. Render workers call this once per finished job, so the lock is
/// taken blocking: skipping an update would leave the bar short.
pub fn update_progress_bar(pb: &ProgressBar, n: usize) {
    if let Ok(mut bar) = pb.lock() {
        let _ = bar.update(n);
    }
}
