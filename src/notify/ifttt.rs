use reqwest::Client;
use secrecy::ExposeSecret;
use tracing::info;

use super::{preview, PostError};
use crate::config::credentials::IftttCredentials;
use crate::config::ConfigError;

const IFTTT_BASE: &str = "https://maker.ifttt.com";

/// Posts text-only tweets by triggering an IFTTT Maker applet.
pub struct IftttTweetPoster {
    creds: IftttCredentials,
    base_url: String,
    client: Client,
}

impl IftttTweetPoster {
    pub fn new(creds: IftttCredentials, client: Client) -> Self {
        Self {
            creds,
            base_url: IFTTT_BASE.to_string(),
            client,
        }
    }

    /// Point at a different Maker endpoint (tests, proxies).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn ensure_ready(&self) -> Result<(), ConfigError> {
        self.endpoint().map(|_| ())
    }

    fn endpoint(&self) -> Result<String, ConfigError> {
        let event = self
            .creds
            .event
            .as_deref()
            .ok_or(ConfigError::Missing("IFTTT_EVENT"))?;
        let key = self
            .creds
            .key
            .as_ref()
            .ok_or(ConfigError::Missing("IFTTT_KEY"))?;
        Ok(format!(
            "{}/trigger/{}/with/key/{}",
            self.base_url,
            event,
            key.expose_secret()
        ))
    }

    pub async fn post(&self, text: &str) -> Result<(), PostError> {
        let endpoint = self.endpoint()?;
        let body = serde_json::json!({ "value1": text });

        // The endpoint carries the key; keep it out of error text.
        let rsp = self
            .client
            .post(&endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| PostError::Http(e.without_url()))?;
        if !rsp.status().is_success() {
            return Err(PostError::Status {
                service: "ifttt",
                status: rsp.status().as_u16(),
            });
        }

        info!(
            text_preview = %preview(text, 100),
            event = self.creds.event.as_deref().unwrap_or_default(),
            "posted tweet via IFTTT"
        );
        Ok(())
    }
}
