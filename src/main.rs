use ::serenity::all::ClientBuilder;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use songbird::SerenityInit;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use melody::commands::{
    general::{help::*, ping::*},
    music::{
        audio_sources::youtube::YtDlpResolver,
        pause::*, play::*, queue::*, resume::*, skip::*, stop::*,
        utils::{
            announcer::DiscordAnnouncer, music_manager::MusicManager,
            scheduler::PlaybackScheduler, voice::SongbirdConnector,
        },
    },
};
use melody::config::BotConfig;
use melody::{Data, Error, HTTP_CLIENT, events};

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize logging with debug level for our crate
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("melody=debug,warn")),
        )
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .with_target(true)
        .with_ansi(true)
        .pretty()
        .init();

    dotenv().ok();

    let config = BotConfig::from_env()?;
    info!(
        "Loaded configuration: connect timeout {}s, yt-dlp at {}",
        config.connect_timeout.as_secs(),
        config.ytdlp_path
    );

    let intents =
        serenity::GatewayIntents::non_privileged() | serenity::GatewayIntents::GUILD_VOICE_STATES;

    let commands = vec![
        // General commands
        help(),
        ping(),
        // Music commands
        play(),
        pause(),
        resume(),
        skip(),
        stop(),
        queue(),
    ];

    let connect_timeout = config.connect_timeout;
    let ytdlp_path = config.ytdlp_path.clone();
    let queue_display_limit = config.queue_display_limit;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands,
            event_handler: |ctx, event, framework, data| {
                Box::pin(events::event_handler(ctx, event, framework, data))
            },
            on_error: |error| Box::pin(events::on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                let songbird = MusicManager::get_songbird(ctx).await?;
                let announcer = Arc::new(DiscordAnnouncer::new(
                    ctx.http.clone(),
                    ctx.cache.clone(),
                ));

                let (scheduler, playback_events) = PlaybackScheduler::new(
                    Arc::new(YtDlpResolver::new(ytdlp_path)),
                    Arc::new(SongbirdConnector::new(songbird, HTTP_CLIENT.clone())),
                    announcer.clone(),
                    connect_timeout,
                );
                scheduler.spawn_event_loop(playback_events);

                Ok(Data {
                    scheduler,
                    announcer,
                    queue_display_limit,
                })
            })
        });

    let mut client = ClientBuilder::new(&config.discord_token, intents)
        .framework(framework.build())
        .register_songbird()
        .await?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutting down");
                shard_manager.shutdown_all().await;
            }
            Err(e) => warn!("Could not listen for Ctrl+C: {}", e),
        }
    });

    client.start().await.map_err(Into::into)
}
