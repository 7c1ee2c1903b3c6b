// src/payload/tweet.rs
use serde::Deserialize;

/// IFTTT applet body: `{"body": {"tweet": {"text", "url"}}}`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct InboundTweet {
    body: TweetBody,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
struct TweetBody {
    tweet: TweetFields,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
struct TweetFields {
    #[serde(default)]
    text: String,
    #[serde(default)]
    url: String,
}

impl InboundTweet {
    pub fn from_slice(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }

    pub fn text(&self) -> &str {
        &self.body.tweet.text
    }

    /// Canonical status URL.
    pub fn url(&self) -> &str {
        &self.body.tweet.url
    }
}
