use dotenvy::dotenv;
use fruitstand::bot::handlers::{self, BotIdentity};
use fruitstand::bot::UserLocks;
use fruitstand::config::{get_user_lock_max_capacity, get_user_lock_ttl, Settings};
use fruitstand::greeting::{GreetingEngine, ReplySet};
use fruitstand::storage::GreetingStore;
use regex::Regex;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use tracing::{error, info};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Regex patterns for redacting the bot token from log output
struct RedactionPatterns {
    token_in_url: Regex,
    token_bare: Regex,
    token_prefixed: Regex,
}

impl RedactionPatterns {
    /// Initialize all regex patterns
    ///
    /// # Errors
    ///
    /// Returns an error if any regex pattern is invalid
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            token_in_url: Regex::new(r"(https?://[^/]+/bot)([0-9]+:[A-Za-z0-9_-]+)(/['\s]*)")?,
            token_bare: Regex::new(r"([0-9]{8,10}:[A-Za-z0-9_-]{35})")?,
            token_prefixed: Regex::new(r"(bot[0-9]{8,10}:)[A-Za-z0-9_-]+")?,
        })
    }

    fn redact(&self, input: &str) -> String {
        let mut output = input.to_string();
        output = self
            .token_in_url
            .replace_all(&output, "$1[TELEGRAM_TOKEN]$3")
            .to_string();
        output = self
            .token_bare
            .replace_all(&output, "[TELEGRAM_TOKEN]")
            .to_string();
        output = self
            .token_prefixed
            .replace_all(&output, "$1[TELEGRAM_TOKEN]")
            .to_string();
        output
    }
}

struct RedactingWriter<W: Write> {
    inner: W,
    patterns: Arc<RedactionPatterns>,
}

impl<W: Write> RedactingWriter<W> {
    const fn new(inner: W, patterns: Arc<RedactionPatterns>) -> Self {
        Self { inner, patterns }
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        let redacted = self.patterns.redact(&s);
        self.inner.write_all(redacted.as_bytes())?;
        // We return the original buffer length to satisfy the contract,
        // even if the redacted string length differs.
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct RedactingMakeWriter<F> {
    make_inner: F,
    patterns: Arc<RedactionPatterns>,
}

impl<F> RedactingMakeWriter<F> {
    const fn new(make_inner: F, patterns: Arc<RedactionPatterns>) -> Self {
        Self {
            make_inner,
            patterns,
        }
    }
}

impl<'a, F, W> tracing_subscriber::fmt::MakeWriter<'a> for RedactingMakeWriter<F>
where
    F: Fn() -> W + 'static,
    W: Write,
{
    type Writer = RedactingWriter<W>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter::new((self.make_inner)(), self.patterns.clone())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenv().ok();

    // Initialize redaction patterns early (before logging)
    let patterns = Arc::new(RedactionPatterns::new().map_err(|e| {
        eprintln!("Failed to compile regex patterns: {e}");
        e
    })?);

    // Setup logging with redaction
    init_logging(patterns);

    info!("Starting fruitstand greeting bot...");

    // Load settings
    let settings = init_settings();

    // Load the response pools
    let replies = init_replies(&settings);

    // Initialize storage
    let store = init_store(&settings).await;

    // Build the greeting engine
    let engine = Arc::new(GreetingEngine::new(replies));

    // Initialize per-user locks
    let locks = init_user_locks();

    // Initialize Bot
    let bot = Bot::new(settings.telegram_token.clone());

    // Resolve who we are, for mention detection
    let identity = init_identity(&bot).await;

    // Setup handlers
    let handler = setup_handler();

    info!("Bot is running...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![engine, store, locks, identity])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

fn init_logging(patterns: Arc<RedactionPatterns>) {
    let make_writer = RedactingMakeWriter::new(io::stderr, patterns);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer))
        .init();
}

fn init_settings() -> Arc<Settings> {
    match Settings::new() {
        Ok(s) => {
            info!("Configuration loaded successfully.");
            Arc::new(s)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_replies(settings: &Settings) -> ReplySet {
    match ReplySet::load(Path::new(&settings.responses_dir)) {
        Ok(replies) => {
            info!("Response pools loaded from {}.", settings.responses_dir);
            replies
        }
        Err(e) => {
            error!("Failed to load response pools: {}", e);
            std::process::exit(1);
        }
    }
}

async fn init_store(settings: &Settings) -> Arc<GreetingStore> {
    match GreetingStore::open(Path::new(&settings.database_path)).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("Failed to open greeting store: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_user_locks() -> Arc<UserLocks> {
    let ttl = get_user_lock_ttl();
    let max_capacity = get_user_lock_max_capacity();

    info!(
        "Initializing UserLocks (ttl: {}s, max_capacity: {})",
        ttl, max_capacity
    );

    Arc::new(UserLocks::new(ttl, max_capacity))
}

async fn init_identity(bot: &Bot) -> Arc<BotIdentity> {
    match bot.get_me().await {
        Ok(me) => {
            info!("Logged in as {}", me.username());
            Arc::new(BotIdentity {
                username: me.username().to_string(),
            })
        }
        Err(e) => {
            error!("Failed to resolve bot identity: {}", e);
            std::process::exit(1);
        }
    }
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(
            Update::filter_message()
                .filter(|msg: Message| msg.text().is_some())
                .endpoint(handle_text_message),
        )
        .branch(
            // Everything else is attachment-only traffic
            Update::filter_message().endpoint(handle_media_message),
        )
}

async fn handle_text_message(
    bot: Bot,
    msg: Message,
    engine: Arc<GreetingEngine>,
    store: Arc<GreetingStore>,
    locks: Arc<UserLocks>,
    identity: Arc<BotIdentity>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = handlers::handle_text(bot, msg, engine, store, locks, identity).await {
        error!("Text handler error: {}", e);
    }
    respond(())
}

async fn handle_media_message(msg: Message) -> Result<(), teloxide::RequestError> {
    if let Err(e) = handlers::handle_media(msg).await {
        error!("Media handler error: {}", e);
    }
    respond(())
}
