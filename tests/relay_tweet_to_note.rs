// tests/relay_tweet_to_note.rs
mod common;

use std::sync::atomic::Ordering;

use common::*;
use note_tweet_connector::{RelayError, RelayOutcome, SkipReason};

const STATUS_URL: &str = "https://twitter.com/someone/status/1";

#[tokio::test]
async fn plain_tweet_becomes_note() {
    let h = harness();
    let out = h
        .relay
        .tweet_to_note(&tweet_payload("Hello from Twitter", STATUS_URL))
        .await
        .unwrap();
    assert_eq!(out, RelayOutcome::Forwarded { media: 0 });
    assert_eq!(h.notes.last().as_deref(), Some("Hello from Twitter"));
}

#[tokio::test]
async fn native_retweet_gets_status_url() {
    let h = harness();
    h.relay
        .tweet_to_note(&tweet_payload("RT @bob: worth reading", STATUS_URL))
        .await
        .unwrap();
    assert_eq!(
        h.notes.last().as_deref(),
        Some("RT @bob: worth reading\n\nhttps://twitter.com/someone/status/1")
    );
}

#[tokio::test]
async fn reshare_marker_is_never_posted_back() {
    let h = harness();
    let out = h
        .relay
        .tweet_to_note(&tweet_payload(
            "RN [at]alice[at]misskey.example\n\nhi\n\nhttps://misskey.example/notes/1",
            STATUS_URL,
        ))
        .await
        .unwrap();
    assert_eq!(out, RelayOutcome::Skipped(SkipReason::LoopPattern));
    assert_eq!(h.notes.count(), 0);
    assert!(h.tracker.is_empty());
}

#[tokio::test]
async fn repeated_tweet_is_duplicate() {
    let h = harness();
    let body = tweet_payload("once only", STATUS_URL);
    h.relay.tweet_to_note(&body).await.unwrap();
    let out = h.relay.tweet_to_note(&body).await.unwrap();
    assert_eq!(out, RelayOutcome::Skipped(SkipReason::Duplicate));
    assert_eq!(h.notes.count(), 1);
}

#[tokio::test]
async fn unconfigured_misskey_is_config_error() {
    let notes = RecordingNotePoster::default();
    notes.unconfigured.store(true, Ordering::SeqCst);
    let h = harness_with(RecordingTweetPoster::default(), notes);

    let err = h
        .relay
        .tweet_to_note(&tweet_payload("text", STATUS_URL))
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::Config(_)));
    assert!(h.tracker.is_empty());
}

#[tokio::test]
async fn failed_note_keeps_the_claim() {
    let notes = RecordingNotePoster::default();
    notes.fail.store(true, Ordering::SeqCst);
    let h = harness_with(RecordingTweetPoster::default(), notes);
    let body = tweet_payload("misskey is down", STATUS_URL);

    assert!(h.relay.tweet_to_note(&body).await.is_err());
    h.notes.fail.store(false, Ordering::SeqCst);
    assert_eq!(
        h.relay.tweet_to_note(&body).await.unwrap(),
        RelayOutcome::Skipped(SkipReason::Duplicate)
    );
}

#[tokio::test]
async fn fixtures_decode_and_relay() {
    let h = harness();

    let note = include_bytes!("fixtures/misskey_note.json");
    assert_eq!(
        h.relay.note_to_tweet(note).await.unwrap(),
        RelayOutcome::Skipped(SkipReason::NotPublic)
    );

    let tweet = include_bytes!("fixtures/ifttt_tweet.json");
    assert_eq!(
        h.relay.tweet_to_note(tweet).await.unwrap(),
        RelayOutcome::Skipped(SkipReason::LoopPattern)
    );
}
