//! Outbound posters: the destination-platform calls the relay depends on.
//!
//! The relay only cares whether a post succeeded; transports live in the
//! submodules.

pub mod ifttt;
pub mod misskey;
pub mod oauth;
pub mod twitter;

use std::sync::Arc;
use std::time::Duration;

use crate::config::ConfigError;

pub use ifttt::IftttTweetPoster;
pub use misskey::MisskeyNotePoster;
pub use twitter::{TwitterMediaPoster, MAX_MEDIA};

/// Per-call timeout shared by every outbound client.
pub const OUTBOUND_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum PostError {
    #[error("missing configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} responded with status {status}")]
    Status { service: &'static str, status: u16 },

    #[error("invalid media URL {url}: {reason}")]
    InvalidMediaUrl { url: String, reason: String },

    #[error("unexpected response from {service}: {detail}")]
    Decode { service: &'static str, detail: String },
}

/// Destination for note → tweet.
#[async_trait::async_trait]
pub trait TweetPoster: Send + Sync {
    /// Fails fast when the text path lacks credentials.
    fn ensure_text_ready(&self) -> Result<(), ConfigError>;

    /// Fails fast when the media path lacks credentials.
    fn ensure_media_ready(&self) -> Result<(), ConfigError>;

    async fn post_text(&self, text: &str) -> Result<(), PostError>;

    /// `image_urls` is already capped by the caller; implementations must
    /// still never upload more than [`MAX_MEDIA`].
    async fn post_with_media(&self, text: &str, image_urls: &[String]) -> Result<(), PostError>;
}

/// Destination for tweet → note.
#[async_trait::async_trait]
pub trait NotePoster: Send + Sync {
    fn ensure_ready(&self) -> Result<(), ConfigError>;

    async fn create_note(&self, text: &str) -> Result<(), PostError>;
}

/// Text tweets through IFTTT, media tweets through the Twitter API.
pub struct CombinedTweetPoster {
    text: IftttTweetPoster,
    media: TwitterMediaPoster,
}

impl CombinedTweetPoster {
    pub fn new(text: IftttTweetPoster, media: TwitterMediaPoster) -> Self {
        Self { text, media }
    }

    pub fn into_arc(self) -> Arc<dyn TweetPoster> {
        Arc::new(self)
    }
}

#[async_trait::async_trait]
impl TweetPoster for CombinedTweetPoster {
    fn ensure_text_ready(&self) -> Result<(), ConfigError> {
        self.text.ensure_ready()
    }

    fn ensure_media_ready(&self) -> Result<(), ConfigError> {
        self.media.ensure_ready()
    }

    async fn post_text(&self, text: &str) -> Result<(), PostError> {
        self.text.post(text).await
    }

    async fn post_with_media(&self, text: &str, image_urls: &[String]) -> Result<(), PostError> {
        self.media.post(text, image_urls).await
    }
}

/// Shared HTTP client for outbound calls; every request is bounded by
/// [`OUTBOUND_TIMEOUT`].
pub fn http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().timeout(OUTBOUND_TIMEOUT).build()
}

/// Newlines escaped and capped, for log previews.
pub(crate) fn preview(text: &str, max: usize) -> String {
    crate::normalize::truncate_chars(&text.replace('\n', "\\n"), max)
}
