//! Message handlers: the bridge between Telegram updates and the greeting
//! engine.
//!
//! Each handler classifies the update, runs the pure engine decision under
//! the author's lock, and performs the two side effects (send, persist).
//! Errors never escape: a failed message is logged with enough context to
//! diagnose and the dispatch loop moves on.

use crate::bot::resilient::send_message_resilient;
use crate::bot::user_locks::UserLocks;
use crate::config::STORAGE_OP_TIMEOUT_SECS;
use crate::greeting::{personalize, GreetingEngine};
use crate::storage::{GreetingStore, StorageError};
use crate::utils::truncate_str;
use anyhow::Result;
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use tracing::{debug, error, info};

/// Identity of the running bot, resolved once at startup via `get_me`.
pub struct BotIdentity {
    /// The bot's username, without the leading `@`.
    pub username: String,
}

/// Extracts a display name for logging and reply personalization.
fn get_user_name(msg: &Message) -> String {
    if let Some(ref user) = msg.from {
        if let Some(ref username) = user.username {
            return username.clone();
        }
        // first_name is String, not Option<String>
        if !user.first_name.is_empty() {
            return user.first_name.clone();
        }
    }
    "Unknown".to_string()
}

/// Extracts the author's user ID, or 0 when the update has no author.
#[must_use]
pub fn get_user_id_safe(msg: &Message) -> i64 {
    msg.from.as_ref().map_or(0, |u| u.id.0.cast_signed())
}

/// True when `text` contains the bot's `@username`, case-insensitively.
fn mentions_bot(text: &str, bot_username: &str) -> bool {
    text.to_lowercase()
        .contains(&format!("@{}", bot_username.to_lowercase()))
}

/// Runs a storage call under the configured time budget so a wedged database
/// cannot stall message handling.
async fn bounded<T>(
    operation: impl Future<Output = Result<T, StorageError>>,
) -> Result<T, StorageError> {
    bounded_with(Duration::from_secs(STORAGE_OP_TIMEOUT_SECS), operation).await
}

async fn bounded_with<T>(
    limit: Duration,
    operation: impl Future<Output = Result<T, StorageError>>,
) -> Result<T, StorageError> {
    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => Err(StorageError::Timeout),
    }
}

/// Handles a text message: classify, decide, reply, persist.
///
/// The whole read-decide-send-persist sequence runs under the author's lock
/// so two quick messages from the same user observe each other's effects.
/// The record is only written after the reply went out: a failed send
/// leaves the stored state untouched and the next message recomputes the
/// same decision.
///
/// # Errors
///
/// Infallible in practice; storage and transport failures are logged and
/// swallowed here so no single message can take down the dispatch loop.
pub async fn handle_text(
    bot: Bot,
    msg: Message,
    engine: Arc<GreetingEngine>,
    store: Arc<GreetingStore>,
    locks: Arc<UserLocks>,
    identity: Arc<BotIdentity>,
) -> Result<()> {
    let Some(author) = msg.from.as_ref() else {
        debug!("Ignoring message without an author (channel or service message).");
        return Ok(());
    };
    if author.is_bot {
        debug!("Ignoring message from bot {}.", author.first_name);
        return Ok(());
    }

    let Some(text) = msg.text().map(ToOwned::to_owned) else {
        return Ok(());
    };
    if text.is_empty() {
        return Ok(());
    }

    let user_id = get_user_id_safe(&msg);
    let user_name = get_user_name(&msg);
    info!(
        "Message from user {} ({}): '{}'",
        user_id,
        user_name,
        truncate_str(&text, 100)
    );

    let mentioned = mentions_bot(&text, &identity.username);
    let now_ms = Utc::now().timestamp_millis();

    // Serialize per user; other users proceed concurrently.
    let _guard = locks.acquire(user_id).await;

    let record = match bounded(store.get(user_id)).await {
        Ok(record) => record,
        Err(e) => {
            error!(
                "Storage read failed for user {} (text '{}'): {}",
                user_id,
                truncate_str(&text, 50),
                e
            );
            return Ok(());
        }
    };

    let decision = engine.handle(user_id, &text, mentioned, now_ms, record.as_ref());

    if let Some(reply) = decision.reply.as_deref() {
        let outgoing = personalize(reply, &user_name);
        if let Err(e) = send_message_resilient(&bot, msg.chat.id, &outgoing).await {
            error!("Failed to send reply to user {}: {}", user_id, e);
            return Ok(());
        }
        info!(
            "Replied to user {} ({}): '{}'",
            user_id,
            user_name,
            truncate_str(&outgoing, 100)
        );
    }

    if let Some(update) = decision.update {
        if let Err(e) = bounded(store.upsert(&update)).await {
            // The reply already went out; the user can still progress on
            // their next message because it recomputes from the stored state.
            error!(
                "Storage write failed for user {} (text '{}'): {}",
                user_id,
                truncate_str(&text, 50),
                e
            );
        }
    }

    Ok(())
}

/// Handles a message with no text content (photo, sticker, voice, ...).
/// Logged and dropped; attachments are not greetings.
///
/// # Errors
///
/// Infallible; present for signature symmetry with the other handlers.
pub async fn handle_media(msg: Message) -> Result<()> {
    let Some(author) = msg.from.as_ref() else {
        return Ok(());
    };
    if author.is_bot {
        return Ok(());
    }

    info!(
        "Message without text from user {} ({}): {}.",
        get_user_id_safe(&msg),
        get_user_name(&msg),
        media_kind(&msg)
    );
    Ok(())
}

fn media_kind(msg: &Message) -> &'static str {
    if msg.photo().is_some() {
        "photo"
    } else if msg.sticker().is_some() {
        "sticker"
    } else if msg.document().is_some() {
        "document"
    } else if msg.voice().is_some() {
        "voice message"
    } else if msg.video().is_some() {
        "video"
    } else {
        "non-text content"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mention_detection_is_case_insensitive() {
        assert!(mentions_bot("gm @FruitBot", "fruitbot"));
        assert!(mentions_bot("@fruitbot gm", "FruitBot"));
        assert!(!mentions_bot("gm everyone", "fruitbot"));
    }

    #[test]
    fn test_mention_detection_matches_anywhere_in_the_text() {
        assert!(mentions_bot("morning @fruitbot, nice stand", "fruitbot"));
    }

    #[tokio::test]
    async fn test_bounded_passes_results_through() {
        let ok = bounded(async { Ok::<_, StorageError>(5) }).await;
        assert_eq!(ok.ok(), Some(5));
    }

    #[tokio::test]
    async fn test_bounded_times_out_stuck_operations() {
        let stuck = bounded_with(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, StorageError>(())
        })
        .await;
        assert!(matches!(stuck, Err(StorageError::Timeout)));
    }
}
