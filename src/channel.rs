#![forbid(unsafe_code)]

//! Channel metadata lookup.

use serde_json::Value;
use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::table::Table;
use crate::youtube::VideoApi;

/// Normalized column holding the channel's uploads playlist id.
pub const UPLOADS_COLUMN: &str = "related_playlists_uploads";

/// One channel row plus the playlist id that drives the video stages.
#[derive(Debug, Clone)]
pub struct ChannelStats {
    pub channel_id: String,
    pub table: Table,
    pub uploads_list_id: String,
}

/// Fetches `channel_id` with every facet and extracts its uploads list.
pub fn fetch_channel(api: &impl VideoApi, channel_id: &str) -> Result<ChannelStats> {
    let channel_id = channel_id.trim();
    if channel_id.is_empty() {
        return Err(PipelineError::InvalidInput(
            "channel id must not be empty".into(),
        ));
    }

    let items = api.list_channels(&[channel_id.to_string()])?;
    let Some(first) = items.first() else {
        return Err(PipelineError::NotFound {
            resource: "channel",
            id: channel_id.to_string(),
        });
    };
    if items.len() > 1 {
        warn!(
            channel_id,
            returned = items.len(),
            "channel lookup returned more than one item; using the first"
        );
    }

    let table = Table::from_resources(std::iter::once(first));
    let uploads_list_id = match table.get(0, UPLOADS_COLUMN) {
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        _ => {
            return Err(PipelineError::malformed(
                "channels",
                format!("channel '{channel_id}' has no {UPLOADS_COLUMN} field"),
            ));
        }
    };

    info!(channel_id, uploads_list_id = %uploads_list_id, "fetched channel");
    Ok(ChannelStats {
        channel_id: channel_id.to_string(),
        table,
        uploads_list_id,
    })
}
