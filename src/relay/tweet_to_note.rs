// src/relay/tweet_to_note.rs
use tracing::info;

use super::{is_native_retweet, is_reshare_marker, Direction, Relay, RelayError, RelayOutcome, SkipReason};
use crate::notify::preview;
use crate::payload::InboundTweet;

/// Text posted as a note for `tweet`. Native retweets carry no body of their
/// own, so the status URL is appended.
pub fn canonical_tweet_text(tweet: &InboundTweet) -> String {
    let text = tweet.text();
    if is_native_retweet(text) {
        format!("{text}\n\n{}", tweet.url())
    } else {
        text.to_string()
    }
}

impl Relay {
    /// Relay one IFTTT tweet webhook body to the note side.
    pub async fn tweet_to_note(&self, data: &[u8]) -> Result<RelayOutcome, RelayError> {
        let direction = Direction::TweetToNote;
        crate::metrics::record_attempt(direction);

        let tweet = InboundTweet::from_slice(data).map_err(|source| {
            Self::fail(direction, RelayError::Decode { direction, source })
        })?;

        let text = canonical_tweet_text(&tweet);

        if is_reshare_marker(&text) {
            info!(text_preview = %preview(&text, 50), "skipping reshare-marker tweet");
            crate::metrics::record_skip(direction, SkipReason::LoopPattern);
            return Ok(RelayOutcome::Skipped(SkipReason::LoopPattern));
        }

        self.notes
            .ensure_ready()
            .map_err(|e| Self::fail(direction, e.into()))?;

        if let Some(skip) = self.claim(direction, &text) {
            info!(tweet_url = tweet.url(), "tweet already processed, skipping");
            return Ok(skip);
        }

        // The claim is kept on failure, same as the other direction.
        self.notes
            .create_note(&text)
            .await
            .map_err(|e| Self::fail(direction, e.into()))?;

        info!(
            text_preview = %preview(&text, 100),
            tweet_url = tweet.url(),
            "forwarded tweet as note"
        );
        crate::metrics::record_success(direction);
        Ok(RelayOutcome::Forwarded { media: 0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retweet_gets_status_url() {
        let t = InboundTweet::from_slice(
            br#"{"body":{"tweet":{"text":"RT @bob: hi","url":"https://twitter.com/bob/status/9"}}}"#,
        )
        .unwrap();
        assert_eq!(canonical_tweet_text(&t), "RT @bob: hi\n\nhttps://twitter.com/bob/status/9");
    }

    #[test]
    fn plain_tweet_unchanged() {
        let t = InboundTweet::from_slice(br#"{"body":{"tweet":{"text":"hello","url":"u"}}}"#).unwrap();
        assert_eq!(canonical_tweet_text(&t), "hello");
    }
}
