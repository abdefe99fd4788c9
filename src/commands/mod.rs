mod cache;
mod capture;
mod responsive;

use std::io::IsTerminal;

use pagecap_lib::{ProgressEvent, ProgressReporter};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

use crate::formatting::render_progress;

pub use cache::run_cache;
pub use capture::run_capture;
pub use responsive::run_responsive;

/// Reporter whose events are echoed to stderr until it is dropped.
fn stderr_progress() -> (ProgressReporter, JoinHandle<()>) {
    let (reporter, rx) = ProgressReporter::channel();
    let task = tokio::spawn(drain(rx, std::io::stderr().is_terminal()));
    (reporter, task)
}

async fn drain(mut rx: UnboundedReceiver<ProgressEvent>, colorize: bool) {
    while let Some(event) = rx.recv().await {
        render_progress(&event, colorize);
    }
}
