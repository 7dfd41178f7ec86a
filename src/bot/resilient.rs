//! Resilient messaging with automatic retry for Telegram API operations.
//!
//! Greeting replies are plain text and fire-and-forget, so the only wrapper
//! needed here is a send that retries transient network failures with
//! exponential backoff before giving up.
//!
//! # Usage
//!
//! ```ignore
//! use fruitstand::bot::resilient::send_message_resilient;
//!
//! // Send with automatic retry
//! let msg = send_message_resilient(&bot, chat_id, "GM!").await?;
//! ```

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{ChatId, Message};

/// Send a message with automatic retry on network failures.
///
/// Uses [`crate::utils::retry_transport_operation`] with exponential backoff
/// to handle transient network errors.
///
/// # Arguments
///
/// * `bot` - The Telegram bot instance
/// * `chat_id` - Target chat ID
/// * `text` - Message text to send
///
/// # Returns
///
/// The sent [`Message`] on success, or an error after all retries are
/// exhausted.
///
/// # Errors
///
/// Returns the last send error once the retry budget is spent.
pub async fn send_message_resilient(
    bot: &Bot,
    chat_id: ChatId,
    text: impl Into<String>,
) -> Result<Message> {
    let text = text.into();
    crate::utils::retry_transport_operation(|| async {
        bot.send_message(chat_id, text.clone())
            .await
            .map_err(|e| anyhow::anyhow!("Telegram send error: {e}"))
    })
    .await
}
