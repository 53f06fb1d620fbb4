//! idle-rpg-bot - Telegram front end for the Idle RPG backend
//!
//! Users play through inline menus in Telegram. Every action becomes a JSON
//! command on a RabbitMQ queue; backend replies arrive asynchronously on two
//! response queues and are routed back to the user.

mod bridge;
mod common;
mod config;
mod conversation;
mod locale;
mod telegram;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use teloxide::Bot;
use tokio::signal;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use bridge::protocol::{Command, CommandKind, Queue};
use bridge::seed;
use bridge::{
    AmqpBroker, DictionaryCache, Dispatcher, ResponseConsumer, ResponseHandler, SessionRegistry,
};
use common::ChatSender;
use config::{env::get_config_path, load_and_validate};
use conversation::Conversation;
use locale::{CatalogSet, JsonFileStore, LocaleResolver, LocaleStore};
use telegram::{build_dispatcher, TelegramChat};

/// How long consumers get to finish the current message on shutdown.
const CONSUMER_STOP_TIMEOUT: Duration = Duration::from_secs(10);
/// How often test user creation checks whether the class list has arrived.
const CLASS_LIST_POLL: Duration = Duration::from_secs(1);

#[derive(Parser)]
#[command(name = "idle-rpg-bot", version)]
#[command(about = "Telegram front end for the Idle RPG backend", long_about = None)]
struct Cli {
    /// Path to config file [default: $IDLE_RPG_BOT_CONFIG or idle-rpg-bot.conf]
    #[arg(long, short = 'c', visible_alias = "cfg", global = true)]
    config: Option<String>,

    /// Number of test users of each class created once the class list arrives
    #[arg(long = "test-users", visible_alias = "test_users", value_name = "N")]
    test_users: Option<usize>,

    /// Seconds to wait before starting, so the broker can come up
    #[arg(long, value_name = "SECONDS")]
    delay: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print an encrypted value for `bot.token` or `queue.password`
    EncryptSecret {
        /// Plain text secret
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(get_config_path);

    if let Some(Commands::EncryptSecret { value }) = cli.command {
        return encrypt_secret(&config_path, &value);
    }

    info!("idle-rpg-bot v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Some(delay) = cli.delay {
        info!("Waiting {} seconds before starting...", delay);
        tokio::time::sleep(Duration::from_secs(delay)).await;
    }

    // Load configuration
    info!("Loading configuration from {}...", config_path);

    let config = load_and_validate(&config_path).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        error!("Please ensure {} exists and is properly formatted.", config_path);
        error!("See idle-rpg-bot.conf.example for reference.");
        e
    })?;

    info!("Configuration loaded successfully");
    info!("  Bot: {}", config.bot.name);
    info!("  Broker: {}:{}", config.queue.host, config.queue.port);
    info!("  Admins: {}", config.bot.admins.len());
    info!("  Translations: {}", config.locale.dir.display());

    // ============================================================
    // Shared state
    // ============================================================
    let catalogs = CatalogSet::load_dir(&config.locale.dir, &config.locale.default)?;
    info!("Loaded {} locales", catalogs.len());

    let store = Arc::new(JsonFileStore::new(&config.locale.store_path));
    let assignments = store.load_all().await?;
    let locales = Arc::new(
        LocaleResolver::new(catalogs, assignments, &config.locale.default, store)
            .with_catalog_dir(&config.locale.dir),
    );

    let admins = config.admin_set();
    let sessions = Arc::new(SessionRegistry::new());
    let dictionary = Arc::new(DictionaryCache::new());

    let bot = Bot::new(config.bot.token.clone());
    let chat: Arc<dyn ChatSender> = Arc::new(TelegramChat::new(bot.clone()));

    let broker = Arc::new(AmqpBroker::new(&config.queue));
    let dispatcher = Arc::new(Dispatcher::new(broker.clone(), admins.clone()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ============================================================
    // Ask the backend for the class list
    // ============================================================
    match dispatcher
        .publish(Command::system(CommandKind::GetClassList), true)
        .await
    {
        Ok(_) => info!("Asked server for class list"),
        Err(e) => warn!("Class list request failed, will retry on first use: {}", e),
    }

    // ============================================================
    // Spawn response consumers
    // ============================================================
    let handler = Arc::new(ResponseHandler::new(
        dictionary.clone(),
        sessions.clone(),
        locales.clone(),
        chat.clone(),
        admins.clone(),
    ));

    let consumers: Vec<_> = [Queue::Dictionary, Queue::Responses]
        .into_iter()
        .map(|queue| {
            let consumer = ResponseConsumer::new(
                queue,
                broker.clone(),
                handler.clone(),
                &config.queue,
                shutdown_rx.clone(),
            );
            tokio::spawn(consumer.run())
        })
        .collect();

    // ============================================================
    // Test users
    // ============================================================
    let seed_task = cli.test_users.map(|per_class| {
        let dispatcher = dispatcher.clone();
        let dictionary = dictionary.clone();
        let mut shutdown_rx = shutdown_rx.clone();
        tokio::spawn(async move {
            if seed::wait_for_classes(&dictionary, CLASS_LIST_POLL, &mut shutdown_rx).await {
                seed::create_test_users(&dispatcher, &dictionary, per_class).await;
            }
        })
    });

    // ============================================================
    // Periodic translation reload
    // ============================================================
    let reload_task = config.locale.reload_interval().map(|interval| {
        let locales = locales.clone();
        let mut shutdown_rx = shutdown_rx.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let locales = locales.clone();
                        match tokio::task::spawn_blocking(move || locales.reload_catalogs()).await {
                            Ok(Ok(count)) => info!("Reloaded {} locales", count),
                            Ok(Err(e)) => error!("Translation reload failed: {}", e),
                            Err(e) => error!("Translation reload task panicked: {}", e),
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("Translation reload task stopped");
        })
    });

    // ============================================================
    // Start Telegram
    // ============================================================
    let conversation = Arc::new(Conversation::new(
        sessions,
        locales,
        dictionary,
        dispatcher,
        chat,
        admins,
        shutdown_tx.clone(),
    ));

    let mut telegram = build_dispatcher(bot, conversation);
    let telegram_token = telegram.shutdown_token();
    let mut telegram_task = tokio::spawn(async move {
        telegram.dispatch().await;
    });
    info!("Bot is running");

    // ============================================================
    // Wait for shutdown
    // ============================================================
    let mut bot_shutdown_rx = shutdown_rx.clone();
    tokio::select! {
        biased;
        _ = shutdown_signal() => info!("Shutdown signal received"),
        _ = bot_shutdown_rx.wait_for(|stop| *stop) => info!("Shutdown requested from the admin menu"),
        _ = &mut telegram_task => warn!("Telegram dispatcher exited"),
    }

    if let Err(e) = shutdown_tx.send(true) {
        debug!("Shutdown channel closed: {}", e);
    }

    match telegram_token.shutdown() {
        Ok(stopped) => {
            stopped.await;
            info!("Telegram dispatcher stopped");
        }
        Err(e) => debug!("Telegram dispatcher was not running: {}", e),
    }

    for consumer in consumers {
        match tokio::time::timeout(CONSUMER_STOP_TIMEOUT, consumer).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Consumer task panicked: {}", e),
            Err(_) => warn!("Consumer did not stop in time"),
        }
    }
    for task in [reload_task, seed_task].into_iter().flatten() {
        task.abort();
    }

    info!("Exiting...");
    Ok(())
}

/// Print an encrypted config value for `bot.token` or `queue.password`.
fn encrypt_secret(config_path: &str, value: &str) -> Result<()> {
    let config = config::load_config(config_path)?;
    let config = config::env::apply_env_overrides(config);
    let encrypted = config::secret::encrypt_secret(value, &config.bot.name, config.queue.port)?;
    println!("{}", encrypted);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
