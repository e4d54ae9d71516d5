#![forbid(unsafe_code)]

//! Video statistics, fetched in id batches.

use tracing::{debug, info};

use crate::error::Result;
use crate::table::Table;
use crate::youtube::{MAX_PAGE_SIZE, VideoApi};

/// Fetches every id in batches of [`MAX_PAGE_SIZE`] and concatenates all
/// returned items into one table. Rows follow batch order, then response
/// order. The first failing batch aborts the whole fetch.
pub fn fetch_video_stats(api: &impl VideoApi, video_ids: &[String]) -> Result<Table> {
    let mut table = Table::new();
    for (batch, chunk) in video_ids.chunks(MAX_PAGE_SIZE).enumerate() {
        let items = api.list_videos(chunk)?;
        debug!(
            batch,
            requested = chunk.len(),
            returned = items.len(),
            "fetched video batch"
        );
        for item in &items {
            table.push_resource(item);
        }
    }
    info!(
        requested = video_ids.len(),
        rows = table.len(),
        "fetched video stats"
    );
    Ok(table)
}
