// tests/relay_note_to_tweet.rs
mod common;

use std::sync::atomic::Ordering;

use common::*;
use note_tweet_connector::{RelayError, RelayOutcome, SkipReason};
use serde_json::json;

#[tokio::test]
async fn public_text_note_is_posted_once() {
    let h = harness();
    let body = note_payload(json!({ "text": "Hello from Misskey" }));

    let out = h.relay.note_to_tweet(&body).await.unwrap();
    assert_eq!(out, RelayOutcome::Forwarded { media: 0 });
    assert_eq!(h.tweets.last_text().as_deref(), Some("Hello from Misskey"));

    let again = h.relay.note_to_tweet(&body).await.unwrap();
    assert_eq!(again, RelayOutcome::Skipped(SkipReason::Duplicate));
    assert_eq!(h.tweets.calls(), 1);
}

#[tokio::test]
async fn non_public_note_does_not_consume_a_slot() {
    let h = harness();
    let text = "Visibility gate check";

    for visibility in ["home", "followers", "specified"] {
        let out = h
            .relay
            .note_to_tweet(&note_payload(json!({ "text": text, "visibility": visibility })))
            .await
            .unwrap();
        assert_eq!(out, RelayOutcome::Skipped(SkipReason::NotPublic));
    }
    assert!(!h.tracker.is_marked(text));

    let out = h
        .relay
        .note_to_tweet(&note_payload(json!({ "text": text })))
        .await
        .unwrap();
    assert_eq!(out, RelayOutcome::Forwarded { media: 0 });
    assert_eq!(h.tweets.calls(), 1);
}

#[tokio::test]
async fn null_visibility_is_treated_as_not_public() {
    let h = harness();
    let out = h
        .relay
        .note_to_tweet(&note_payload(json!({ "text": "who can see this", "visibility": null })))
        .await
        .unwrap();
    assert_eq!(out, RelayOutcome::Skipped(SkipReason::NotPublic));
    assert!(!h.tracker.is_marked("who can see this"));
}

#[tokio::test]
async fn retweet_shaped_note_is_skipped_without_marking() {
    let h = harness();
    let out = h
        .relay
        .note_to_tweet(&note_payload(json!({ "text": "RT @someone: copied" })))
        .await
        .unwrap();
    assert_eq!(out, RelayOutcome::Skipped(SkipReason::LoopPattern));
    assert!(h.tracker.is_empty());
    assert_eq!(h.tweets.calls(), 0);
}

#[tokio::test]
async fn images_are_capped_at_four() {
    let h = harness();
    let files: Vec<_> = (0..7).map(image).collect();
    let out = h
        .relay
        .note_to_tweet(&note_payload(json!({ "text": "album", "files": files })))
        .await
        .unwrap();

    assert_eq!(out, RelayOutcome::Forwarded { media: 4 });
    let posts = h.tweets.media_posts.lock().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].1.len(), 4);
    assert_eq!(posts[0].1[0], "https://media.misskey.example/0.png");
}

#[tokio::test]
async fn non_image_files_go_through_text_path() {
    let h = harness();
    let files = json!([{ "url": "https://media.misskey.example/a.mp4", "type": "video/mp4" }]);
    let out = h
        .relay
        .note_to_tweet(&note_payload(json!({ "text": "clip", "files": files })))
        .await
        .unwrap();
    assert_eq!(out, RelayOutcome::Forwarded { media: 0 });
    assert_eq!(h.tweets.text_count(), 1);
    assert_eq!(h.tweets.media_count(), 0);
}

#[tokio::test]
async fn cw_note_is_masked() {
    let h = harness();
    h.relay
        .note_to_tweet(&note_payload(json!({ "id": "abc", "cw": "spoiler", "text": "secret" })))
        .await
        .unwrap();
    assert_eq!(
        h.tweets.last_text().as_deref(),
        Some("spoiler\n○○○○○○\nhttps://misskey.example/notes/abc")
    );
}

#[tokio::test]
async fn renote_becomes_reshare_marker() {
    let h = harness();
    let renote = json!({
        "id": "r1",
        "uri": null,
        "text": "original words",
        "user": { "host": null, "username": "alice" }
    });
    h.relay
        .note_to_tweet(&note_payload(json!({ "text": null, "renote": renote })))
        .await
        .unwrap();
    assert_eq!(
        h.tweets.last_text().as_deref(),
        Some("RN [at]alice[at]misskey.example\n\noriginal words\n\nhttps://misskey.example/notes/r1")
    );
}

#[tokio::test]
async fn failed_post_keeps_the_claim() {
    let h = harness_with(RecordingTweetPoster::failing(), RecordingNotePoster::default());
    let body = note_payload(json!({ "text": "will fail downstream" }));

    let err = h.relay.note_to_tweet(&body).await.unwrap_err();
    assert!(matches!(err, RelayError::Downstream(_)));
    assert!(h.tracker.is_marked("will fail downstream"));

    h.tweets.fail.store(false, Ordering::SeqCst);
    let out = h.relay.note_to_tweet(&body).await.unwrap();
    assert_eq!(out, RelayOutcome::Skipped(SkipReason::Duplicate));
    assert_eq!(h.tweets.calls(), 1);
}

#[tokio::test]
async fn missing_credentials_fail_before_claiming() {
    let tweets = RecordingTweetPoster::default();
    tweets.text_unconfigured.store(true, Ordering::SeqCst);
    let h = harness_with(tweets, RecordingNotePoster::default());

    let err = h
        .relay
        .note_to_tweet(&note_payload(json!({ "text": "no creds yet" })))
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::Config(_)));
    assert!(!h.tracker.is_marked("no creds yet"));
    assert_eq!(h.tweets.calls(), 0);
}

#[tokio::test]
async fn malformed_payload_is_a_decode_error() {
    let h = harness();
    let err = h.relay.note_to_tweet(b"{not json").await.unwrap_err();
    assert_eq!(err.kind(), "decode");

    let err = h.relay.note_to_tweet(br#"{"server":"s"}"#).await.unwrap_err();
    assert_eq!(err.kind(), "decode");
    assert!(h.tracker.is_empty());
}
