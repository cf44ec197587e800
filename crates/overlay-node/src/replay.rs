//! Historical backfill
//!
//! Reads tagged transactions from a JSON-lines file (one `TaggedTransaction`
//! per line, blank lines and `#` comments ignored) and submits them in
//! historical mode, so nothing is broadcast again.

use crate::error::{NodeError, NodeResult};
use overlay_engine::OverlayEngineApi;
use overlay_types::{SubmitMode, TaggedTransaction};
use std::path::Path;
use tracing::{info, warn};

/// Outcome of a backfill run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Submissions that committed (already-applied ones included).
    pub applied: usize,
    /// Submissions the engine rejected.
    pub failed: usize,
}

/// Parse a JSON-lines submission file.
pub fn read_submissions(path: &Path) -> NodeResult<Vec<TaggedTransaction>> {
    let contents = std::fs::read_to_string(path).map_err(|source| NodeError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|source| NodeError::Json {
                path: path.to_path_buf(),
                line: index + 1,
                source,
            })
        })
        .collect()
}

/// Submit every entry in order. Engine rejections are logged and counted;
/// they do not stop the backfill.
pub async fn replay<E>(engine: &E, submissions: Vec<TaggedTransaction>) -> ReplaySummary
where
    E: OverlayEngineApi + ?Sized,
{
    let mut summary = ReplaySummary::default();

    for (position, tagged) in submissions.into_iter().enumerate() {
        match engine.submit(tagged, SubmitMode::Historical, None).await {
            Ok(_) => summary.applied += 1,
            Err(e) => {
                warn!(position, error = %e, "Backfill submission rejected");
                summary.failed += 1;
            }
        }
    }

    info!(
        applied = summary.applied,
        failed = summary.failed,
        "Backfill complete"
    );
    summary
}
