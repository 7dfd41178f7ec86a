//! Per-user persisted greeting state.

/// Conversation progress within a single greeting window.
///
/// Stages only move forward while a window is open; an elapsed window resets
/// the user to `Fresh`. "Never greeted" is represented by the absence of a
/// record, not by a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    /// The user's greeting opened (or reopened) their window.
    Fresh = 1,
    /// The user followed up with a greeting that addressed the bot directly.
    Affirmed = 2,
    /// The conversation for this window is spent; further greetings are ignored.
    Exhausted = 3,
}

impl Stage {
    /// Integer form stored in the `users` table.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self as i64
    }

    /// Parses the stored integer form. Returns `None` for values that do not
    /// name a stage, so corrupted rows surface as errors instead of silently
    /// mapping to some stage.
    #[must_use]
    pub const fn from_i64(value: i64) -> Option<Self> {
        match value {
            1 => Some(Self::Fresh),
            2 => Some(Self::Affirmed),
            3 => Some(Self::Exhausted),
            _ => None,
        }
    }
}

/// Greeting state for one user, as stored in the `users` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GreetingRecord {
    /// Telegram user ID; the storage key.
    pub user_id: i64,
    /// Epoch milliseconds of the last accepted fresh greeting. Follow-up
    /// stages do not touch this, so the window is anchored to the greeting
    /// that opened it.
    pub last_greeted_at: i64,
    /// Progress within the current greeting window.
    pub stage: Stage,
}

impl GreetingRecord {
    /// Copy of this record with only the stage advanced.
    #[must_use]
    pub fn with_stage(&self, stage: Stage) -> Self {
        Self { stage, ..*self }
    }
}
