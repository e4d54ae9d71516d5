#![forbid(unsafe_code)]

//! Thin client for the three YouTube Data API v3 list endpoints the pipeline
//! needs. Responses are kept as raw JSON resources; flattening happens later
//! in [`crate::table`].

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{PipelineError, Result};

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Largest `maxResults` / id count a single list request accepts.
pub const MAX_PAGE_SIZE: usize = 50;

pub const CHANNEL_PARTS: &str = "snippet,contentDetails,statistics";
pub const PLAYLIST_ITEM_PARTS: &str = "snippet,contentDetails";
pub const VIDEO_PARTS: &str = "snippet,contentDetails,statistics";

/// One page of `playlistItems.list`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemsPage {
    #[serde(default)]
    pub items: Vec<Value>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Body shared by `channels.list` and `videos.list`.
#[derive(Debug, Deserialize)]
struct ResourceList {
    #[serde(default)]
    items: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// The video-platform operations the pipeline depends on. Calls block until
/// the full response is available.
pub trait VideoApi {
    fn list_channels(&self, ids: &[String]) -> Result<Vec<Value>>;

    fn list_playlist_items(
        &self,
        playlist_id: &str,
        page_size: usize,
        page_token: Option<&str>,
    ) -> Result<PlaylistItemsPage>;

    fn list_videos(&self, ids: &[String]) -> Result<Vec<Value>>;
}

impl<T: VideoApi + ?Sized> VideoApi for &T {
    fn list_channels(&self, ids: &[String]) -> Result<Vec<Value>> {
        (**self).list_channels(ids)
    }

    fn list_playlist_items(
        &self,
        playlist_id: &str,
        page_size: usize,
        page_token: Option<&str>,
    ) -> Result<PlaylistItemsPage> {
        (**self).list_playlist_items(playlist_id, page_size, page_token)
    }

    fn list_videos(&self, ids: &[String]) -> Result<Vec<Value>> {
        (**self).list_videos(ids)
    }
}

/// Credentials and endpoint for [`HttpVideoApi`].
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl ApiSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Blocking HTTP implementation backed by a shared `ureq` agent.
pub struct HttpVideoApi {
    agent: ureq::Agent,
    settings: ApiSettings,
}

impl HttpVideoApi {
    pub fn new(settings: ApiSettings) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(settings.timeout)
            .build();
        Self { agent, settings }
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.settings.base_url.trim_end_matches('/'),
            endpoint
        )
    }

    fn get<T>(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let mut request = self.agent.get(&self.endpoint_url(endpoint));
        for (key, value) in query {
            request = request.query(key, value);
        }
        request = request.query("key", &self.settings.api_key);
        debug!(endpoint, ?query, "requesting");

        let response = match request.call() {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_string().unwrap_or_default();
                return Err(PipelineError::transport(
                    endpoint,
                    Some(code),
                    api_error_message(code, &body),
                ));
            }
            Err(ureq::Error::Transport(err)) => {
                return Err(PipelineError::transport(endpoint, None, err.to_string()));
            }
        };

        response
            .into_json::<T>()
            .map_err(|err| PipelineError::malformed(endpoint, err.to_string()))
    }
}

/// Prefers the API's `error.message`, falling back to the raw status.
fn api_error_message(code: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) if !envelope.error.message.is_empty() => {
            format!("HTTP {code}: {}", envelope.error.message)
        }
        _ => format!("HTTP {code}"),
    }
}

impl VideoApi for HttpVideoApi {
    fn list_channels(&self, ids: &[String]) -> Result<Vec<Value>> {
        let ids = ids.join(",");
        let list: ResourceList =
            self.get("channels", &[("part", CHANNEL_PARTS), ("id", ids.as_str())])?;
        Ok(list.items)
    }

    fn list_playlist_items(
        &self,
        playlist_id: &str,
        page_size: usize,
        page_token: Option<&str>,
    ) -> Result<PlaylistItemsPage> {
        let page_size = page_size.to_string();
        let mut query = vec![
            ("part", PLAYLIST_ITEM_PARTS),
            ("playlistId", playlist_id),
            ("maxResults", page_size.as_str()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }
        self.get("playlistItems", &query)
    }

    fn list_videos(&self, ids: &[String]) -> Result<Vec<Value>> {
        let ids = ids.join(",");
        let list: ResourceList =
            self.get("videos", &[("part", VIDEO_PARTS), ("id", ids.as_str())])?;
        Ok(list.items)
    }
}
