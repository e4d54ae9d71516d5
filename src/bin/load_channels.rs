#![forbid(unsafe_code)]

//! Fetches channel and video statistics for every configured channel and
//! loads them into the `channels` and `videos` tables of the warehouse.
//!
//! Channels come from the `[channels]` table of the channels file unless ids
//! are passed on the command line. Credentials and the warehouse location are
//! read from `.env` / the environment (see `tubestats_tools::config`).

use anyhow::{Context, Result, bail};
use clap::Parser;
use clap::builder::RangedU64ValueParser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tubestats_tools::config::{ConfigOverrides, LoaderConfig, load_channels, resolve_config};
use tubestats_tools::pipeline::{ChannelPipeline, ChannelTables};
use tubestats_tools::warehouse::{Destination, LoadOptions, LoadSummary, Warehouse, WriteMode};
use tubestats_tools::youtube::{ApiSettings, HttpVideoApi};

const CHANNELS_TABLE: &str = "channels";
const VIDEOS_TABLE: &str = "videos";
const PREVIEW_ROWS: usize = 5;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "load_channels",
    about = "Load YouTube channel and video statistics into the warehouse"
)]
struct LoaderArgs {
    /// Env file holding YOUTUBE_API_KEY and the warehouse settings.
    #[arg(long)]
    env_file: Option<PathBuf>,
    #[arg(long)]
    channels_file: Option<PathBuf>,
    /// Local path or libsql:// / https:// URL.
    #[arg(long)]
    warehouse_url: Option<String>,
    #[arg(long)]
    dataset: Option<String>,
    /// Append to the tables instead of replacing them.
    #[arg(long)]
    append: bool,
    /// Give up on a playlist after this many pages.
    #[arg(long, value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
    max_pages: Option<usize>,
    /// Fetch and preview, but skip the warehouse load.
    #[arg(long)]
    dry_run: bool,
    /// Channel ids to load instead of the channels file.
    channel_ids: Vec<String>,
}

impl LoaderArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            channels_file: self.channels_file.clone(),
            warehouse_url: self.warehouse_url.clone(),
            dataset: self.dataset.clone(),
            max_pages: self.max_pages,
            env_path: self.env_file.clone(),
        }
    }

    fn write_mode(&self) -> WriteMode {
        if self.append {
            WriteMode::Append
        } else {
            WriteMode::Truncate
        }
    }
}

/// Command-line ids win; otherwise every id from the channels file.
fn resolve_channel_ids(args: &LoaderArgs, config: &LoaderConfig) -> Result<Vec<String>> {
    let ids: Vec<String> = if args.channel_ids.is_empty() {
        load_channels(&config.channels_file)?
            .into_iter()
            .map(|entry| entry.id)
            .collect()
    } else {
        args.channel_ids
            .iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect()
    };
    if ids.is_empty() {
        bail!(
            "no channels to load: pass channel ids or list them under [channels] in {}",
            config.channels_file.display()
        );
    }
    Ok(ids)
}

async fn load_tables(
    warehouse: &Warehouse,
    tables: &ChannelTables,
    dataset: &str,
    write_mode: WriteMode,
) -> Result<Vec<LoadSummary>> {
    let options = LoadOptions {
        write_mode,
        schema: None,
    };
    let mut summaries = Vec::new();
    for (name, table) in [(CHANNELS_TABLE, &tables.channels), (VIDEOS_TABLE, &tables.videos)] {
        let destination = Destination::new(dataset, name);
        let summary = warehouse
            .load_table(table, &destination, &options)
            .await
            .with_context(|| format!("loading {destination}"))?;
        summaries.push(summary);
    }
    Ok(summaries)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = LoaderArgs::parse();
    let config = resolve_config(args.overrides())?;
    let channel_ids = resolve_channel_ids(&args, &config)?;

    println!("===================================");
    println!("YouTube Channel Stats Loader");
    println!("===================================");
    println!("Channels: {}", channel_ids.len());
    println!("Warehouse: {}", config.warehouse_url);
    println!("Dataset: {}", config.dataset);
    println!();

    let api = HttpVideoApi::new(
        ApiSettings::new(config.api_key.clone()).with_base_url(config.api_base.clone()),
    );
    let pipeline = ChannelPipeline::new(api).with_max_pages(config.max_pages);
    let tables = tokio::task::spawn_blocking(move || pipeline.collect(channel_ids.as_slice()))
        .await
        .context("fetch task panicked")??;

    println!("{}", tables.channels.preview(PREVIEW_ROWS));
    println!();
    println!("{}", tables.videos.preview(PREVIEW_ROWS));
    println!();

    if args.dry_run {
        println!("Dry run: skipping warehouse load");
        return Ok(());
    }

    let warehouse = Warehouse::open(
        &config.warehouse_url,
        config.warehouse_auth_token.as_deref(),
    )
    .await
    .with_context(|| format!("opening warehouse {}", config.warehouse_url))?;
    let summaries = load_tables(&warehouse, &tables, &config.dataset, args.write_mode()).await?;

    println!("===================================");
    println!("Load complete!");
    println!("===================================");
    for summary in summaries {
        println!(
            "{}: {} rows, {} columns",
            summary.destination, summary.rows, summary.columns
        );
    }
    Ok(())
}
