use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Serialize;
use tracing::debug;

use super::{NotePoster, PostError};
use crate::config::credentials::MisskeyCredentials;
use crate::config::ConfigError;

/// Creates notes through the Misskey HTTP API.
pub struct MisskeyNotePoster {
    creds: MisskeyCredentials,
    scheme: &'static str,
    client: Client,
}

#[derive(Serialize)]
struct CreateNote<'a> {
    i: &'a str,
    text: &'a str,
}

impl MisskeyNotePoster {
    pub fn new(creds: MisskeyCredentials, client: Client) -> Self {
        Self {
            creds,
            scheme: "https",
            client,
        }
    }

    /// Talk plain HTTP to the host; only for local test servers.
    pub fn insecure_http(mut self) -> Self {
        self.scheme = "http";
        self
    }

    fn target(&self) -> Result<(String, &str), ConfigError> {
        let host = self
            .creds
            .host
            .as_deref()
            .ok_or(ConfigError::Missing("MISSKEY_HOST"))?;
        let token = self
            .creds
            .token
            .as_ref()
            .ok_or(ConfigError::Missing("MISSKEY_TOKEN"))?;
        let endpoint = format!("{}://{}/api/notes/create", self.scheme, host);
        Ok((endpoint, token.expose_secret()))
    }
}

#[async_trait::async_trait]
impl NotePoster for MisskeyNotePoster {
    fn ensure_ready(&self) -> Result<(), ConfigError> {
        self.target().map(|_| ())
    }

    async fn create_note(&self, text: &str) -> Result<(), PostError> {
        let (endpoint, token) = self.target()?;

        let rsp = self
            .client
            .post(&endpoint)
            .json(&CreateNote { i: token, text })
            .send()
            .await?;

        let status = rsp.status();
        if !status.is_success() {
            tracing::error!(status = status.as_u16(), endpoint = %endpoint, "note creation rejected");
            return Err(PostError::Status {
                service: "misskey",
                status: status.as_u16(),
            });
        }

        debug!(endpoint = %endpoint, status = status.as_u16(), "posted note to Misskey");
        Ok(())
    }
}
