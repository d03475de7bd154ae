//! Progress events emitted by long-running pipeline stages
//!
//! Library code never draws progress bars itself; it sends events over an
//! optional channel and the binary renders them.

use tokio::sync::mpsc;

/// A progress update from the crawler or the image extraction loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A stage started with a known amount of work
    Started {
        /// Human readable stage name
        stage: &'static str,
        /// Expected number of steps
        total: u64,
    },

    /// The crawler accepted an HTML page
    PageCrawled(String),

    /// The extractor finished with a page
    PageProcessed(String),

    /// A stage finished
    Finished {
        /// Human readable stage name
        stage: &'static str,
    },
}

/// Sending half handed to pipeline stages
pub type ProgressSender = mpsc::Sender<ProgressEvent>;

/// Send an event if a channel is attached, ignoring a closed receiver
pub(crate) async fn report(progress: Option<&ProgressSender>, event: ProgressEvent) {
    if let Some(sender) = progress {
        let _ = sender.send(event).await;
    }
}
