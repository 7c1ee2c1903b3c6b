// src/relay/note_to_tweet.rs
use tracing::info;

use super::{is_native_retweet, Direction, Relay, RelayError, RelayOutcome, SkipReason};
use crate::notify::{preview, MAX_MEDIA};
use crate::payload::{InboundNote, Visibility};

/// Leading marker of a synthesized reshare.
pub const RESHARE_PREFIX: &str = "RN [at]";

const MASK_GLYPH: char = '○';

/// Text that represents `note` on the tweet side.
///
/// - CW set: the warning, one mask glyph per body character, and a permalink.
/// - No body, no files, a renote: a reshare marker naming the renote author.
/// - Otherwise the body as-is.
pub fn canonical_note_text(note: &InboundNote, default_host: Option<&str>) -> String {
    let body = note.body_text();

    if let Some(cw) = note.cw() {
        let mask = MASK_GLYPH.to_string().repeat(body.chars().count());
        return format!("{cw}\n{mask}\n{}", note.permalink());
    }

    if body.is_empty() && note.files().is_empty() {
        if let Some(renote) = note.renote() {
            let host = renote
                .user
                .host
                .as_deref()
                .filter(|h| !h.is_empty())
                .or(default_host)
                .unwrap_or_default();
            let uri = match renote.uri.as_deref().filter(|u| !u.is_empty()) {
                Some(u) => u.to_string(),
                None => format!("{}/notes/{}", note.server().trim_end_matches('/'), renote.id),
            };
            return format!(
                "{RESHARE_PREFIX}{}[at]{}\n\n{}\n\n{}",
                renote.user.username,
                host,
                renote.text.as_deref().unwrap_or_default(),
                uri
            );
        }
    }

    body.to_string()
}

impl Relay {
    /// Relay one Misskey note webhook body to the tweet side.
    pub async fn note_to_tweet(&self, data: &[u8]) -> Result<RelayOutcome, RelayError> {
        let direction = Direction::NoteToTweet;
        crate::metrics::record_attempt(direction);

        let note = InboundNote::from_slice(data).map_err(|source| {
            Self::fail(direction, RelayError::Decode { direction, source })
        })?;

        let text = canonical_note_text(&note, self.settings.default_host.as_deref());

        if is_native_retweet(&text) {
            info!(note_id = note.id(), text_preview = %preview(&text, 50), "skipping retweet-shaped note");
            crate::metrics::record_skip(direction, SkipReason::LoopPattern);
            return Ok(RelayOutcome::Skipped(SkipReason::LoopPattern));
        }

        if note.visibility() != Visibility::Public {
            info!(
                note_id = note.id(),
                visibility = note.visibility().as_str(),
                "note is not public, skipping"
            );
            crate::metrics::record_skip(direction, SkipReason::NotPublic);
            return Ok(RelayOutcome::Skipped(SkipReason::NotPublic));
        }

        let mut images = note.image_urls();
        images.truncate(MAX_MEDIA);

        let ready = if images.is_empty() {
            self.tweets.ensure_text_ready()
        } else {
            self.tweets.ensure_media_ready()
        };
        ready.map_err(|e| Self::fail(direction, e.into()))?;

        if let Some(skip) = self.claim(direction, &text) {
            info!(note_id = note.id(), "note already processed, skipping");
            return Ok(skip);
        }

        let posted = if images.is_empty() {
            self.tweets.post_text(&text).await
        } else {
            self.tweets.post_with_media(&text, &images).await
        };
        // The claim is kept on failure: a redelivered webhook must not post twice.
        posted.map_err(|e| Self::fail(direction, e.into()))?;

        info!(
            note_id = note.id(),
            text_preview = %preview(&text, 100),
            has_media = !images.is_empty(),
            media_count = images.len(),
            "posted note as tweet"
        );
        crate::metrics::record_success(direction);
        Ok(RelayOutcome::Forwarded {
            media: images.len(),
        })
    }
}
