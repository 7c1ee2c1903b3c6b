// src/relay/mod.rs
//! Relay decision logic: whether an inbound payload is forwarded, and what
//! text goes out.
//!
//! Both directions share one [`ContentTracker`], so a post relayed one way
//! is recognised if the other platform echoes it back.

mod note_to_tweet;
mod tweet_to_note;

pub use note_to_tweet::{canonical_note_text, RESHARE_PREFIX};
pub use tweet_to_note::canonical_tweet_text;

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

use crate::config::ConfigError;
use crate::notify::{NotePoster, PostError, TweetPoster};
use crate::tracker::ContentTracker;

/// Native retweet text shape (`RT @user: ...`).
static RE_RETWEET: Lazy<Regex> = Lazy::new(|| Regex::new(r"^RT\s*@").expect("retweet regex"));
/// Reshare marker produced by this relay (`RN [at]user[at]host ...`).
static RE_RESHARE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^RN\s*\[at\]").expect("reshare regex"));

pub fn is_native_retweet(text: &str) -> bool {
    RE_RETWEET.is_match(text)
}

pub fn is_reshare_marker(text: &str) -> bool {
    RE_RESHARE.is_match(text)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    NoteToTweet,
    TweetToNote,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::NoteToTweet => "note2tweet",
            Direction::TweetToNote => "tweet2note",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deliberate, non-error reasons not to forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// Text already came from the other platform through this relay.
    LoopPattern,
    NotPublic,
    Duplicate,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::LoopPattern => "loop-pattern",
            SkipReason::NotPublic => "not-public",
            SkipReason::Duplicate => "duplicate",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Posted downstream with `media` attachments.
    Forwarded { media: usize },
    Skipped(SkipReason),
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("malformed {direction} payload: {source}")]
    Decode {
        direction: Direction,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("downstream post failed: {0}")]
    Downstream(#[source] PostError),
}

impl RelayError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::Decode { .. } => "decode",
            RelayError::Config(_) => "config",
            RelayError::Downstream(_) => "downstream",
        }
    }
}

impl From<PostError> for RelayError {
    fn from(e: PostError) -> Self {
        match e {
            PostError::Config(c) => RelayError::Config(c),
            other => RelayError::Downstream(other),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RelaySettings {
    /// Host used in the reshare marker when a renote's author is local.
    pub default_host: Option<String>,
}

/// Both relay directions over one shared tracker.
pub struct Relay {
    tracker: Arc<ContentTracker>,
    tweets: Arc<dyn TweetPoster>,
    notes: Arc<dyn NotePoster>,
    settings: RelaySettings,
}

impl Relay {
    pub fn new(
        tracker: Arc<ContentTracker>,
        tweets: Arc<dyn TweetPoster>,
        notes: Arc<dyn NotePoster>,
        settings: RelaySettings,
    ) -> Self {
        Self {
            tracker,
            tweets,
            notes,
            settings,
        }
    }

    pub fn tracker(&self) -> &Arc<ContentTracker> {
        &self.tracker
    }

    pub fn settings(&self) -> &RelaySettings {
        &self.settings
    }

    /// Claim `text` in the tracker; a lost claim is a duplicate skip.
    fn claim(&self, direction: Direction, text: &str) -> Option<RelayOutcome> {
        if self.tracker.check_and_mark(text) {
            return None;
        }
        crate::metrics::record_duplicate_hit();
        crate::metrics::record_skip(direction, SkipReason::Duplicate);
        Some(RelayOutcome::Skipped(SkipReason::Duplicate))
    }

    fn fail(direction: Direction, err: RelayError) -> RelayError {
        crate::metrics::record_failure(direction);
        tracing::error!(%direction, kind = err.kind(), error = %err, "relay failed");
        err
    }
}
