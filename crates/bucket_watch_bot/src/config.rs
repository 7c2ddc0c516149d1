use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser, ValueEnum};

use crate::adapters::discord::DEFAULT_DISCORD_API_BASE;
use crate::adapters::state_store::JsonFileStateStore;
use crate::handlers::tick::TickConfig;
use crate::runtime::contract::{
    DEFAULT_KNOWN_KEYS_FILE, DEFAULT_NOTIFICATION_IDS_FILE, DEFAULT_POLL_INTERVAL_SECS,
};
use crate::runtime::download_url::{DownloadUrlBuilder, DownloadUrlError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Parser, Clone, PartialEq, Eq)]
#[command(
    name = "bucket_watcher",
    about = "Announce new bucket objects in a Discord channel",
    long_about = "Polls an S3-compatible bucket on a fixed interval, posts an embed for every\n\
                  new object, and deletes the embed again when the object disappears."
)]
pub struct WatcherArgs {
    /// Discord bot token
    #[arg(long, env = "DISCORD_BOT_TOKEN", hide_env_values = true)]
    pub discord_token: String,
    /// Channel that receives announcements
    #[arg(long, env = "DISCORD_CHANNEL_ID")]
    pub discord_channel_id: u64,
    /// Discord REST API base URL
    #[arg(long, env = "DISCORD_API_BASE", default_value = DEFAULT_DISCORD_API_BASE)]
    pub discord_api_base: String,
    /// S3-compatible endpoint, also used to build download links
    #[arg(long, env = "S3_ENDPOINT")]
    pub s3_endpoint: String,
    /// Bucket to watch
    #[arg(long, env = "S3_BUCKET_NAME")]
    pub s3_bucket: String,
    /// Signing region for the S3 client
    #[arg(long, env = "S3_REGION", default_value = "us-east-1")]
    pub s3_region: String,
    /// Extra path segment placed before the bucket in download links
    #[arg(long, env = "S3_DOWNLOAD_SEGMENT")]
    pub download_segment: Option<String>,
    /// Seconds between bucket listings
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
    pub poll_interval_secs: u64,
    /// JSON array of keys already announced
    #[arg(long, env = "KNOWN_KEYS_FILE", default_value = DEFAULT_KNOWN_KEYS_FILE)]
    pub known_keys_file: PathBuf,
    /// JSON object mapping keys to announcement message ids
    #[arg(long, env = "MESSAGE_IDS_FILE", default_value = DEFAULT_NOTIFICATION_IDS_FILE)]
    pub message_ids_file: PathBuf,
    /// Delete announcements for objects that disappear from the bucket
    #[arg(
        long,
        env = "TRACK_DELETIONS",
        default_value_t = true,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub track_deletions: bool,
    /// Log line format
    #[arg(value_enum, long, env = "LOG_FORMAT", default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl fmt::Debug for WatcherArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatcherArgs")
            .field("discord_token", &"<redacted>")
            .field("discord_channel_id", &self.discord_channel_id)
            .field("discord_api_base", &self.discord_api_base)
            .field("s3_endpoint", &self.s3_endpoint)
            .field("s3_bucket", &self.s3_bucket)
            .field("s3_region", &self.s3_region)
            .field("download_segment", &self.download_segment)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("known_keys_file", &self.known_keys_file)
            .field("message_ids_file", &self.message_ids_file)
            .field("track_deletions", &self.track_deletions)
            .field("log_format", &self.log_format)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("discord token cannot be empty")]
    EmptyToken,
    #[error("discord channel id must be a non-zero snowflake")]
    InvalidChannelId,
    #[error("poll interval must be at least one second")]
    ZeroPollInterval,
    #[error(transparent)]
    DownloadUrl(#[from] DownloadUrlError),
}

/// Validated, immutable settings for one watcher process.
#[derive(Clone, PartialEq, Eq)]
pub struct WatcherConfig {
    pub discord_token: String,
    pub discord_channel_id: u64,
    pub discord_api_base: String,
    pub s3_endpoint: String,
    pub s3_bucket: String,
    pub s3_region: String,
    pub download_urls: DownloadUrlBuilder,
    pub poll_interval: Duration,
    pub known_keys_file: PathBuf,
    pub message_ids_file: PathBuf,
    pub track_deletions: bool,
    pub log_format: LogFormat,
}

impl WatcherConfig {
    pub fn from_args(args: WatcherArgs) -> Result<Self, ConfigError> {
        let discord_token = args.discord_token.trim().to_string();
        if discord_token.is_empty() {
            return Err(ConfigError::EmptyToken);
        }
        if args.discord_channel_id == 0 {
            return Err(ConfigError::InvalidChannelId);
        }
        if args.poll_interval_secs == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }

        let download_segment = args
            .download_segment
            .as_deref()
            .map(str::trim)
            .filter(|segment| !segment.is_empty());
        let download_urls =
            DownloadUrlBuilder::new(&args.s3_endpoint, download_segment, &args.s3_bucket)?;

        Ok(Self {
            discord_token,
            discord_channel_id: args.discord_channel_id,
            discord_api_base: args.discord_api_base,
            s3_endpoint: args.s3_endpoint.trim().to_string(),
            s3_bucket: args.s3_bucket.trim().to_string(),
            s3_region: args.s3_region,
            download_urls,
            poll_interval: Duration::from_secs(args.poll_interval_secs),
            known_keys_file: args.known_keys_file,
            message_ids_file: args.message_ids_file,
            track_deletions: args.track_deletions,
            log_format: args.log_format,
        })
    }

    pub fn tick_config(&self) -> TickConfig {
        TickConfig {
            download_urls: self.download_urls.clone(),
            track_deletions: self.track_deletions,
        }
    }

    /// The id file is only used when deletions are tracked.
    pub fn state_store(&self) -> JsonFileStateStore {
        JsonFileStateStore::new(
            self.known_keys_file.clone(),
            self.track_deletions.then(|| self.message_ids_file.clone()),
        )
    }
}

impl fmt::Debug for WatcherConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatcherConfig")
            .field("discord_channel_id", &self.discord_channel_id)
            .field("discord_api_base", &self.discord_api_base)
            .field("s3_endpoint", &self.s3_endpoint)
            .field("s3_bucket", &self.s3_bucket)
            .field("poll_interval", &self.poll_interval)
            .field("known_keys_file", &self.known_keys_file)
            .field("message_ids_file", &self.message_ids_file)
            .field("track_deletions", &self.track_deletions)
            .finish_non_exhaustive()
    }
}
