//! In-memory stand-in for the Data API used by the unit tests.

use std::cell::RefCell;
use std::collections::HashMap;

use serde_json::{Value, json};

use crate::error::{PipelineError, Result};
use crate::youtube::{PlaylistItemsPage, VideoApi};

enum PlaylistFixture {
    Ids(Vec<String>),
    Raw(Vec<Value>),
}

/// Serves canned channels (matched on `id`; resources without one always
/// match), paginates playlists by `page-N` cursors and echoes
/// one video row per requested id. Every request is recorded.
#[derive(Default)]
pub struct FakeApi {
    channels: Vec<Value>,
    playlists: HashMap<String, PlaylistFixture>,
    endless: bool,
    fail_channels: bool,
    fail_playlists: bool,
    fail_videos_after: Option<usize>,
    channel_log: RefCell<Vec<Vec<String>>>,
    playlist_log: RefCell<Vec<(String, usize, Option<String>)>>,
    video_log: RefCell<Vec<Vec<String>>>,
}

impl FakeApi {
    pub fn with_channel(mut self, channel: Value) -> Self {
        self.channels.push(channel);
        self
    }

    pub fn with_playlist(mut self, playlist_id: &str, ids: Vec<String>) -> Self {
        self.playlists
            .insert(playlist_id.to_string(), PlaylistFixture::Ids(ids));
        self
    }

    /// A single page made of exactly these items.
    pub fn with_raw_playlist_page(mut self, playlist_id: &str, items: Vec<Value>) -> Self {
        self.playlists
            .insert(playlist_id.to_string(), PlaylistFixture::Raw(items));
        self
    }

    /// Always hand out a continuation cursor, even past the last item.
    pub fn endless_cursor(mut self) -> Self {
        self.endless = true;
        self
    }

    pub fn failing_channels(mut self) -> Self {
        self.fail_channels = true;
        self
    }

    pub fn failing_playlists(mut self) -> Self {
        self.fail_playlists = true;
        self
    }

    /// Let `ok` video batches succeed, then fail every later one.
    pub fn failing_videos_after(mut self, ok: usize) -> Self {
        self.fail_videos_after = Some(ok);
        self
    }

    pub fn channel_requests(&self) -> Vec<Vec<String>> {
        self.channel_log.borrow().clone()
    }

    pub fn playlist_requests(&self) -> Vec<(String, usize, Option<String>)> {
        self.playlist_log.borrow().clone()
    }

    pub fn video_requests(&self) -> Vec<Vec<String>> {
        self.video_log.borrow().clone()
    }
}

fn page_index(token: Option<&str>) -> usize {
    token
        .and_then(|token| token.strip_prefix("page-"))
        .and_then(|index| index.parse().ok())
        .unwrap_or(0)
}

impl VideoApi for FakeApi {
    fn list_channels(&self, ids: &[String]) -> Result<Vec<Value>> {
        self.channel_log.borrow_mut().push(ids.to_vec());
        if self.fail_channels {
            return Err(PipelineError::transport("channels", Some(500), "backend error"));
        }
        Ok(self
            .channels
            .iter()
            .filter(|channel| {
                channel["id"]
                    .as_str()
                    .is_none_or(|id| ids.iter().any(|wanted| wanted == id))
            })
            .cloned()
            .collect())
    }

    fn list_playlist_items(
        &self,
        playlist_id: &str,
        page_size: usize,
        page_token: Option<&str>,
    ) -> Result<PlaylistItemsPage> {
        self.playlist_log.borrow_mut().push((
            playlist_id.to_string(),
            page_size,
            page_token.map(str::to_string),
        ));
        if self.fail_playlists {
            return Err(PipelineError::transport("playlistItems", None, "connection reset"));
        }

        let index = page_index(page_token);
        let (items, more) = match self.playlists.get(playlist_id) {
            Some(PlaylistFixture::Raw(items)) => (items.clone(), false),
            Some(PlaylistFixture::Ids(ids)) => {
                let start = (index * page_size).min(ids.len());
                let end = ((index + 1) * page_size).min(ids.len());
                let items = ids[start..end]
                    .iter()
                    .map(|id| {
                        json!({
                            "kind": "youtube#playlistItem",
                            "snippet": {"title": format!("Video {id}")},
                            "contentDetails": {"videoId": id}
                        })
                    })
                    .collect();
                (items, end < ids.len())
            }
            None => (Vec::new(), false),
        };

        Ok(PlaylistItemsPage {
            items,
            next_page_token: (more || self.endless).then(|| format!("page-{}", index + 1)),
        })
    }

    fn list_videos(&self, ids: &[String]) -> Result<Vec<Value>> {
        let mut log = self.video_log.borrow_mut();
        log.push(ids.to_vec());
        if self.fail_videos_after.is_some_and(|ok| log.len() > ok) {
            return Err(PipelineError::transport("videos", Some(403), "quotaExceeded"));
        }
        Ok(ids.iter().map(|id| video_resource(id)).collect())
    }
}

pub fn channel_resource(id: &str, uploads: &str) -> Value {
    json!({
        "kind": "youtube#channel",
        "id": id,
        "snippet": {
            "title": format!("Channel {id}"),
            "description": "About this channel",
            "publishedAt": "2015-03-01T00:00:00Z"
        },
        "contentDetails": {
            "relatedPlaylists": {"likes": "", "uploads": uploads}
        },
        "statistics": {
            "viewCount": "1000",
            "subscriberCount": "100",
            "hiddenSubscriberCount": false,
            "videoCount": "3"
        }
    })
}

pub fn video_resource(id: &str) -> Value {
    json!({
        "id": id,
        "snippet": {"title": format!("Video {id}"), "publishedAt": "2024-01-01T00:00:00Z"},
        "contentDetails": {"duration": "PT4M13S"},
        "statistics": {"viewCount": "42", "likeCount": "7"}
    })
}

pub fn numbered_ids(count: usize) -> Vec<String> {
    (0..count).map(|index| format!("vid-{index:03}")).collect()
}
