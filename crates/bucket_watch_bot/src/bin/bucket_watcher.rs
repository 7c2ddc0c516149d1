use anyhow::Context;
use bucket_watch_bot::adapters::discord::DiscordNotifier;
use bucket_watch_bot::adapters::s3_listing::S3BucketLister;
use bucket_watch_bot::config::{WatcherArgs, WatcherConfig};
use bucket_watch_bot::handlers::poller::{IntervalTicker, Poller};
use bucket_watch_bot::logging::init_logging;
use bucket_watch_bot::runtime::clock::SystemClock;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = WatcherConfig::from_args(WatcherArgs::parse()).context("invalid configuration")?;
    init_logging(config.log_format).context("failed to initialize logging")?;

    let notifier = DiscordNotifier::new(
        &config.discord_api_base,
        &config.discord_token,
        config.discord_channel_id,
    )
    .context("failed to build Discord client")?;
    let identity = notifier.verify_access().await.context(
        "Discord authentication failed; check DISCORD_BOT_TOKEN and DISCORD_CHANNEL_ID",
    )?;
    tracing::info!(
        component = "startup",
        event = "discord_ready",
        bot_user = %identity.username,
        channel_id = config.discord_channel_id,
        "logged in to Discord"
    );

    let lister =
        S3BucketLister::connect(config.s3_bucket.clone(), &config.s3_endpoint, &config.s3_region)
            .await;
    lister.verify_access().await.context(
        "storage authentication failed; check AWS credentials, S3_ENDPOINT and S3_BUCKET_NAME",
    )?;
    tracing::info!(
        component = "startup",
        event = "bucket_ready",
        bucket = %config.s3_bucket,
        endpoint = %config.s3_endpoint,
        "bucket is reachable"
    );

    let mut poller = Poller::new(
        config.tick_config(),
        lister,
        notifier,
        config.state_store(),
        SystemClock,
    )
    .with_context(|| {
        format!(
            "failed to load state from '{}'",
            config.known_keys_file.display()
        )
    })?;

    tracing::info!(
        component = "startup",
        event = "polling_started",
        interval_secs = config.poll_interval.as_secs(),
        track_deletions = config.track_deletions,
        "watching bucket"
    );
    let mut ticker = IntervalTicker::new(config.poll_interval);
    poller.run(&mut ticker, shutdown_signal()).await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(
            component = "startup",
            event = "signal_handler_failed",
            error = %error,
            "ctrl-c handling unavailable; stop the process to exit"
        );
        std::future::pending::<()>().await;
    }
}
