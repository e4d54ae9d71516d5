#![forbid(unsafe_code)]

//! Walks a playlist to the end and collects its video ids.

use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::youtube::{MAX_PAGE_SIZE, VideoApi};

/// Returns every video id in `playlist_id`, in the order the API emits them.
///
/// Pages are requested one after another, each with the cursor from the
/// previous response, until a response arrives without one. `max_pages`
/// bounds the walk; `None` follows cursors for as long as the API hands them
/// out.
pub fn list_video_ids(
    api: &impl VideoApi,
    playlist_id: &str,
    max_pages: Option<usize>,
) -> Result<Vec<String>> {
    let mut video_ids = Vec::new();
    let mut page_token: Option<String> = None;
    let mut pages = 0usize;

    loop {
        if let Some(limit) = max_pages.filter(|&limit| pages >= limit) {
            return Err(PipelineError::PageLimitExceeded {
                playlist_id: playlist_id.to_string(),
                max_pages: limit,
            });
        }

        let page = api.list_playlist_items(playlist_id, MAX_PAGE_SIZE, page_token.as_deref())?;
        pages += 1;

        for item in &page.items {
            let video_id = item
                .pointer("/contentDetails/videoId")
                .and_then(|value| value.as_str())
                .ok_or_else(|| {
                    PipelineError::malformed(
                        "playlistItems",
                        format!("item without contentDetails.videoId in playlist '{playlist_id}'"),
                    )
                })?;
            video_ids.push(video_id.to_string());
        }
        debug!(
            playlist_id,
            page = pages,
            items = page.items.len(),
            "fetched playlist page"
        );

        match page.next_page_token {
            Some(token) if !token.is_empty() => page_token = Some(token),
            _ => break,
        }
    }

    info!(playlist_id, pages, videos = video_ids.len(), "listed playlist");
    Ok(video_ids)
}
