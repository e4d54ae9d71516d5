#![forbid(unsafe_code)]

//! Pulls channel and video statistics from the YouTube Data API into flat,
//! warehouse-ready tables.

pub mod channel;
pub mod config;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod playlist;
pub mod table;
pub mod videos;
pub mod warehouse;
pub mod youtube;

#[cfg(test)]
mod testing;

pub use error::{PipelineError, Result};
pub use pipeline::{ChannelPipeline, ChannelTables};
pub use table::Table;
