//! Per-URL crawl state
//!
//! Every URL the frontier learns about moves through [`PageState`]:
//! `Queued(normal|priority) -> Fetching -> {RecordedDocument | RecordedWebpage | Failed}`,
//! or straight from `Queued` to `SkippedRobots` / `DepthExceeded`. Terminal
//! states count as visited.

mod page_state;

pub use page_state::{PageState, QueueKind};
