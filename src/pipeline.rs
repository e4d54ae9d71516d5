#![forbid(unsafe_code)]

//! Channel → uploads playlist → video ids → video stats, for one channel or a
//! list of them.

use tracing::info;

use crate::channel::fetch_channel;
use crate::error::Result;
use crate::playlist::list_video_ids;
use crate::table::Table;
use crate::videos::fetch_video_stats;
use crate::youtube::VideoApi;

/// The two tables a run produces.
#[derive(Debug, Clone, Default)]
pub struct ChannelTables {
    pub channels: Table,
    pub videos: Table,
}

impl ChannelTables {
    /// Appends the rows of `other` to both tables.
    pub fn extend(&mut self, other: ChannelTables) {
        self.channels.concat(other.channels);
        self.videos.concat(other.videos);
    }
}

pub struct ChannelPipeline<A> {
    api: A,
    max_pages: Option<usize>,
}

impl<A: VideoApi> ChannelPipeline<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            max_pages: None,
        }
    }

    /// Caps how many playlist pages a single channel may take.
    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn run(&self, channel_id: &str) -> Result<ChannelTables> {
        let channel = fetch_channel(&self.api, channel_id)?;
        let video_ids = list_video_ids(&self.api, &channel.uploads_list_id, self.max_pages)?;
        let videos = fetch_video_stats(&self.api, &video_ids)?;
        info!(
            channel_id = %channel.channel_id,
            videos = videos.len(),
            "channel complete"
        );
        Ok(ChannelTables {
            channels: channel.table,
            videos,
        })
    }

    /// Runs every channel in order and concatenates the results. The first
    /// failure aborts the whole run.
    pub fn collect<S: AsRef<str>>(&self, channel_ids: &[S]) -> Result<ChannelTables> {
        let mut tables = ChannelTables::default();
        for channel_id in channel_ids {
            tables.extend(self.run(channel_id.as_ref())?);
        }
        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::testing::{FakeApi, channel_resource, numbered_ids, video_resource};
    use serde_json::json;

    #[test]
    fn end_to_end_single_channel() {
        let api = FakeApi::default()
            .with_channel(channel_resource("UCa", "UUa"))
            .with_channel(channel_resource("UCa", "UUignored"))
            .with_playlist("UUa", numbered_ids(3));
        let pipeline = ChannelPipeline::new(&api);

        let tables = pipeline.run("UCa").unwrap();

        assert_eq!(tables.channels.len(), 1);
        assert_eq!(tables.videos.len(), 3);
        assert_eq!(
            tables.channels.columns(),
            &[
                "kind",
                "id",
                "title",
                "description",
                "published_at",
                "related_playlists_likes",
                "related_playlists_uploads",
                "view_count",
                "subscriber_count",
                "hidden_subscriber_count",
                "video_count"
            ]
        );
        assert_eq!(
            tables.videos.columns(),
            &["id", "title", "published_at", "duration", "view_count", "like_count"]
        );
        assert_eq!(tables.videos.get(2, "id"), Some(&json!("vid-002")));
        assert_eq!(api.playlist_requests().len(), 1);
        assert_eq!(api.video_requests(), vec![numbered_ids(3)]);
    }

    #[test]
    fn collect_concatenates_channels_in_order() {
        let api = FakeApi::default()
            .with_channel(channel_resource("UCa", "UUa"))
            .with_channel(channel_resource("UCb", "UUb"))
            .with_playlist("UUa", vec!["a1".into(), "a2".into()])
            .with_playlist("UUb", vec!["b1".into()]);

        let tables = ChannelPipeline::new(&api).collect(&["UCa", "UCb"]).unwrap();

        let channel_ids = tables.channels.column_values("id");
        assert_eq!(channel_ids, vec![&json!("UCa"), &json!("UCb")]);
        let video_ids = tables.videos.column_values("id");
        assert_eq!(video_ids, vec![&json!("a1"), &json!("a2"), &json!("b1")]);
    }

    #[test]
    fn missing_channel_aborts_the_run() {
        let api = FakeApi::default()
            .with_channel(channel_resource("UCa", "UUa"))
            .with_playlist("UUa", numbered_ids(2));

        let err = ChannelPipeline::new(&api)
            .collect(&["UCa", "UCgone"])
            .unwrap_err();

        assert!(matches!(err, PipelineError::NotFound { .. }));
        assert_eq!(api.channel_requests().len(), 2);
    }

    #[test]
    fn channel_without_videos_yields_empty_video_table() {
        let api = FakeApi::default().with_channel(channel_resource("UCa", "UUempty"));
        let tables = ChannelPipeline::new(&api).run("UCa").unwrap();
        assert_eq!(tables.channels.len(), 1);
        assert!(tables.videos.is_empty());
        assert!(api.video_requests().is_empty());
    }

    #[test]
    fn page_cap_is_forwarded_to_the_lister() {
        let api = FakeApi::default()
            .with_channel(channel_resource("UCa", "UUa"))
            .with_playlist("UUa", numbered_ids(10))
            .endless_cursor();
        let err = ChannelPipeline::new(&api)
            .with_max_pages(Some(2))
            .run("UCa")
            .unwrap_err();
        assert!(matches!(err, PipelineError::PageLimitExceeded { .. }));
    }

    #[test]
    fn rows_keep_every_video_field() {
        let api = FakeApi::default()
            .with_channel(channel_resource("UCa", "UUa"))
            .with_playlist("UUa", vec!["x".into()]);
        let tables = ChannelPipeline::new(&api).run("UCa").unwrap();
        let expected = crate::table::Table::from_resources(&[video_resource("x")]);
        assert_eq!(tables.videos, expected);
    }
}
