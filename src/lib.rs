// src/lib.rs
// Public library surface for integration tests and the binary.

pub mod api;
pub mod config;
pub mod metrics;
pub mod normalize;
pub mod notify;
pub mod payload;
pub mod relay;
pub mod tracker;

use std::sync::Arc;

pub use crate::api::{router, AppState};
pub use crate::relay::{Direction, Relay, RelayError, RelayOutcome, RelaySettings, SkipReason};
pub use crate::tracker::ContentTracker;

use crate::config::{Credentials, HookSecrets};
use crate::notify::{
    http_client, CombinedTweetPoster, IftttTweetPoster, MisskeyNotePoster, TwitterMediaPoster,
};

/// Wire the production posters around `tracker`. The Misskey host doubles as
/// the default host for local renote authors.
pub fn relay_from_credentials(
    creds: Credentials,
    tracker: Arc<ContentTracker>,
) -> Result<(Relay, HookSecrets), reqwest::Error> {
    let client = http_client()?;
    let settings = RelaySettings {
        default_host: creds.misskey.host.clone(),
    };

    let tweets = CombinedTweetPoster::new(
        IftttTweetPoster::new(creds.ifttt, client.clone()),
        TwitterMediaPoster::new(creds.twitter, client.clone()),
    )
    .into_arc();
    let notes = Arc::new(MisskeyNotePoster::new(creds.misskey, client));

    Ok((Relay::new(tracker, tweets, notes, settings), creds.hooks))
}
