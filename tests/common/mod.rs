// tests/common/mod.rs
//
// Recording posters and payload builders shared by the integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};

use note_tweet_connector::config::ConfigError;
use note_tweet_connector::notify::{NotePoster, PostError, TweetPoster};
use note_tweet_connector::{ContentTracker, Relay, RelaySettings};

pub const DEFAULT_HOST: &str = "misskey.example";

/// Tweet-side poster that records every call.
#[derive(Default)]
pub struct RecordingTweetPoster {
    pub texts: Mutex<Vec<String>>,
    pub media_posts: Mutex<Vec<(String, Vec<String>)>>,
    pub fail: AtomicBool,
    pub text_unconfigured: AtomicBool,
    pub delay: Mutex<Option<Duration>>,
}

impl RecordingTweetPoster {
    pub fn failing() -> Self {
        let p = Self::default();
        p.fail.store(true, Ordering::SeqCst);
        p
    }

    pub fn text_count(&self) -> usize {
        self.texts.lock().unwrap().len()
    }

    pub fn media_count(&self) -> usize {
        self.media_posts.lock().unwrap().len()
    }

    pub fn calls(&self) -> usize {
        self.text_count() + self.media_count()
    }

    pub fn last_text(&self) -> Option<String> {
        self.texts.lock().unwrap().last().cloned()
    }

    fn outcome(&self) -> Result<(), PostError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(PostError::Status {
                service: "mock",
                status: 503,
            })
        } else {
            Ok(())
        }
    }

    async fn maybe_delay(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
    }
}

#[async_trait::async_trait]
impl TweetPoster for RecordingTweetPoster {
    fn ensure_text_ready(&self) -> Result<(), ConfigError> {
        if self.text_unconfigured.load(Ordering::SeqCst) {
            Err(ConfigError::Missing("IFTTT_KEY"))
        } else {
            Ok(())
        }
    }

    fn ensure_media_ready(&self) -> Result<(), ConfigError> {
        Ok(())
    }

    async fn post_text(&self, text: &str) -> Result<(), PostError> {
        self.maybe_delay().await;
        self.texts.lock().unwrap().push(text.to_string());
        self.outcome()
    }

    async fn post_with_media(&self, text: &str, image_urls: &[String]) -> Result<(), PostError> {
        self.maybe_delay().await;
        self.media_posts
            .lock()
            .unwrap()
            .push((text.to_string(), image_urls.to_vec()));
        self.outcome()
    }
}

/// Note-side poster that records every call.
#[derive(Default)]
pub struct RecordingNotePoster {
    pub notes: Mutex<Vec<String>>,
    pub fail: AtomicBool,
    pub unconfigured: AtomicBool,
}

impl RecordingNotePoster {
    pub fn count(&self) -> usize {
        self.notes.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<String> {
        self.notes.lock().unwrap().last().cloned()
    }
}

#[async_trait::async_trait]
impl NotePoster for RecordingNotePoster {
    fn ensure_ready(&self) -> Result<(), ConfigError> {
        if self.unconfigured.load(Ordering::SeqCst) {
            Err(ConfigError::Missing("MISSKEY_TOKEN"))
        } else {
            Ok(())
        }
    }

    async fn create_note(&self, text: &str) -> Result<(), PostError> {
        self.notes.lock().unwrap().push(text.to_string());
        if self.fail.load(Ordering::SeqCst) {
            Err(PostError::Status {
                service: "mock",
                status: 500,
            })
        } else {
            Ok(())
        }
    }
}

pub struct Harness {
    pub relay: Arc<Relay>,
    pub tweets: Arc<RecordingTweetPoster>,
    pub notes: Arc<RecordingNotePoster>,
    pub tracker: Arc<ContentTracker>,
}

pub fn harness_with(tweets: RecordingTweetPoster, notes: RecordingNotePoster) -> Harness {
    let tracker = Arc::new(ContentTracker::new(Duration::from_secs(3600)));
    let tweets = Arc::new(tweets);
    let notes = Arc::new(notes);
    let relay = Relay::new(
        tracker.clone(),
        tweets.clone() as Arc<dyn TweetPoster>,
        notes.clone() as Arc<dyn NotePoster>,
        RelaySettings {
            default_host: Some(DEFAULT_HOST.to_string()),
        },
    );
    Harness {
        relay: Arc::new(relay),
        tweets,
        notes,
        tracker,
    }
}

pub fn harness() -> Harness {
    harness_with(RecordingTweetPoster::default(), RecordingNotePoster::default())
}

/// Misskey note webhook body. `note` fields are merged over defaults.
pub fn note_payload(note: Value) -> Vec<u8> {
    let mut base = json!({
        "id": "dummy-note-1",
        "visibility": "public",
        "localOnly": false,
        "text": "This is a test note",
        "cw": null,
        "files": []
    });
    if let (Some(b), Some(extra)) = (base.as_object_mut(), note.as_object()) {
        for (k, v) in extra {
            b.insert(k.clone(), v.clone());
        }
    }
    serde_json::to_vec(&json!({
        "server": "https://misskey.example",
        "body": { "note": base }
    }))
    .unwrap()
}

pub fn image(n: usize) -> Value {
    json!({ "url": format!("https://media.misskey.example/{n}.png"), "type": "image/png" })
}

/// IFTTT tweet webhook body.
pub fn tweet_payload(text: &str, url: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({ "body": { "tweet": { "text": text, "url": url } } })).unwrap()
}
