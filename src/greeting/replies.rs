//! Loading of the canned reply pools.
//!
//! Each pool is a JSON array of strings in its own file under the responses
//! directory. All pools are read once at startup; a missing file, bad JSON,
//! an empty array or a blank entry is a configuration error and aborts
//! startup rather than surfacing mid-conversation.

use crate::greeting::pool::{PoolError, ResponsePool};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Errors raised while loading the response pool sources.
#[derive(Error, Debug)]
pub enum ReplyError {
    /// A pool file was missing or unreadable.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path of the offending file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A pool file did not hold a JSON array of strings.
    #[error("invalid JSON in {path}: {source}")]
    Json {
        /// Path of the offending file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
    /// A pool parsed fine but is unusable (empty, or has a blank entry).
    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// The five response pools the greeting engine selects from.
#[derive(Debug)]
pub struct ReplySet {
    /// Openers for the first greeting of a window. May carry the `{user}`
    /// address token.
    pub(crate) fresh: ResponsePool,
    /// Pointed remarks for the third greeting round.
    pub(crate) repeat: ResponsePool,
    /// Short acknowledgements for a greeting that addresses the bot.
    pub(crate) affirmation: ResponsePool,
    /// First halves of the bot's day story.
    pub(crate) day_opener: ResponsePool,
    /// Second halves of the bot's day story.
    pub(crate) day_closer: ResponsePool,
}

impl ReplySet {
    /// Assembles a reply set from already-built pools.
    #[must_use]
    pub fn new(
        fresh: ResponsePool,
        repeat: ResponsePool,
        affirmation: ResponsePool,
        day_opener: ResponsePool,
        day_closer: ResponsePool,
    ) -> Self {
        Self {
            fresh,
            repeat,
            affirmation,
            day_opener,
            day_closer,
        }
    }

    /// Loads all pools from `dir`, one `<name>.json` file per pool.
    ///
    /// # Errors
    ///
    /// Returns a `ReplyError` if any source file is missing, unreadable, not
    /// a JSON array of strings, empty, or contains a blank entry.
    pub fn load(dir: &Path) -> Result<Self, ReplyError> {
        Ok(Self {
            fresh: load_pool(dir, "fresh")?,
            repeat: load_pool(dir, "repeat")?,
            affirmation: load_pool(dir, "affirmation")?,
            day_opener: load_pool(dir, "day_opener")?,
            day_closer: load_pool(dir, "day_closer")?,
        })
    }
}

fn load_pool(dir: &Path, name: &'static str) -> Result<ResponsePool, ReplyError> {
    let path = dir.join(format!("{name}.json"));
    let raw = fs::read_to_string(&path).map_err(|source| ReplyError::Io {
        path: path.clone(),
        source,
    })?;
    let entries: Vec<String> =
        serde_json::from_str(&raw).map_err(|source| ReplyError::Json { path, source })?;
    let pool = ResponsePool::new(name, entries)?;
    info!("Loaded {} replies for pool `{}`.", pool.len(), pool.name());
    Ok(pool)
}
