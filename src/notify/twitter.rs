use reqwest::multipart::{Form, Part};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{error, info};

use super::oauth::authorization_header;
use super::{preview, PostError};
use crate::config::credentials::TwitterCredentials;
use crate::config::ConfigError;

pub const UPLOAD_MEDIA_ENDPOINT: &str = "https://upload.twitter.com/1.1/media/upload.json";
pub const MANAGE_TWEET_ENDPOINT: &str = "https://api.twitter.com/2/tweets";

/// Platform limit on attachments per tweet.
pub const MAX_MEDIA: usize = 4;

#[derive(Deserialize)]
struct UploadMediaResponse {
    media_id_string: String,
}

/// Posts tweets with images through the Twitter API (OAuth 1.0a user context).
pub struct TwitterMediaPoster {
    creds: TwitterCredentials,
    upload_url: String,
    tweet_url: String,
    allow_http_media: bool,
    client: Client,
}

impl TwitterMediaPoster {
    pub fn new(creds: TwitterCredentials, client: Client) -> Self {
        Self {
            creds,
            upload_url: UPLOAD_MEDIA_ENDPOINT.to_string(),
            tweet_url: MANAGE_TWEET_ENDPOINT.to_string(),
            allow_http_media: false,
            client,
        }
    }

    /// Override both API endpoints (tests, proxies).
    pub fn with_endpoints(mut self, upload: impl Into<String>, tweet: impl Into<String>) -> Self {
        self.upload_url = upload.into();
        self.tweet_url = tweet.into();
        self
    }

    /// Accept plain-HTTP media URLs; only for local test servers.
    pub fn allow_http_media(mut self) -> Self {
        self.allow_http_media = true;
        self
    }

    pub fn ensure_ready(&self) -> Result<(), ConfigError> {
        self.creds.oauth_keys()?;
        self.media_host().map(|_| ())
    }

    fn media_host(&self) -> Result<&str, ConfigError> {
        self.creds
            .media_host
            .as_deref()
            .ok_or(ConfigError::Missing("MISSKEY_MEDIA_HOST"))
    }

    /// Only media on the configured host is fetched.
    pub fn validate_media_url(&self, file_url: &str) -> Result<Url, PostError> {
        let invalid = |reason: String| PostError::InvalidMediaUrl {
            url: file_url.to_string(),
            reason,
        };

        let parsed = Url::parse(file_url).map_err(|e| invalid(e.to_string()))?;
        let scheme_ok = parsed.scheme() == "https" || (self.allow_http_media && parsed.scheme() == "http");
        if !scheme_ok {
            return Err(invalid("only HTTPS URLs are allowed".into()));
        }

        let expected = self.media_host()?;
        let host = match (parsed.host_str(), parsed.port()) {
            (Some(h), Some(p)) => format!("{h}:{p}"),
            (Some(h), None) => h.to_string(),
            (None, _) => return Err(invalid("missing host".into())),
        };
        if !host.eq_ignore_ascii_case(expected) {
            return Err(invalid(format!("host {host:?} is not allowed (expected {expected:?})")));
        }
        Ok(parsed)
    }

    async fn upload_from_url(&self, file_url: &str) -> Result<String, PostError> {
        let url = self.validate_media_url(file_url)?;
        let keys = self.creds.oauth_keys()?;

        let bytes = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let form = Form::new().part("media", Part::bytes(bytes.to_vec()).file_name("image"));
        let auth = authorization_header(&keys, "POST", &self.upload_url, &[]);

        let rsp = self
            .client
            .post(&self.upload_url)
            .header(reqwest::header::AUTHORIZATION, auth)
            .multipart(form)
            .send()
            .await?;
        if !rsp.status().is_success() {
            return Err(PostError::Status {
                service: "twitter-upload",
                status: rsp.status().as_u16(),
            });
        }

        let parsed: UploadMediaResponse = rsp.json().await.map_err(|e| PostError::Decode {
            service: "twitter-upload",
            detail: e.to_string(),
        })?;
        Ok(parsed.media_id_string)
    }

    pub async fn post(&self, text: &str, image_urls: &[String]) -> Result<(), PostError> {
        self.ensure_ready()?;

        let mut media_ids = Vec::with_capacity(MAX_MEDIA);
        for file_url in image_urls.iter().take(MAX_MEDIA) {
            let id = self.upload_from_url(file_url).await.inspect_err(|e| {
                error!(url = %file_url, error = %e, "media upload failed");
            })?;
            media_ids.push(id);
        }

        let mut body = serde_json::json!({ "text": text });
        if !media_ids.is_empty() {
            body["media"] = serde_json::json!({ "media_ids": media_ids });
        }

        let keys = self.creds.oauth_keys()?;
        let auth = authorization_header(&keys, "POST", &self.tweet_url, &[]);
        let rsp = self
            .client
            .post(&self.tweet_url)
            .header(reqwest::header::AUTHORIZATION, auth)
            .json(&body)
            .send()
            .await?;
        if !rsp.status().is_success() {
            return Err(PostError::Status {
                service: "twitter",
                status: rsp.status().as_u16(),
            });
        }

        info!(
            text_preview = %preview(text, 100),
            media_count = media_ids.len(),
            "posted tweet with media"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poster(media_host: Option<&str>) -> TwitterMediaPoster {
        TwitterMediaPoster::new(
            TwitterCredentials {
                media_host: media_host.map(str::to_string),
                ..Default::default()
            },
            Client::new(),
        )
    }

    #[test]
    fn media_url_must_be_https_on_media_host() {
        let p = poster(Some("media.misskey.example"));
        assert!(p.validate_media_url("https://media.misskey.example/a.png").is_ok());
        assert!(p.validate_media_url("https://MEDIA.misskey.example/a.png").is_ok());
        assert!(p.validate_media_url("http://media.misskey.example/a.png").is_err());
        assert!(p.validate_media_url("https://169.254.169.254/latest").is_err());
        assert!(p.validate_media_url("not a url").is_err());
    }

    #[test]
    fn missing_media_host_is_config_error() {
        let p = poster(None);
        assert!(matches!(
            p.validate_media_url("https://media.misskey.example/a.png"),
            Err(PostError::Config(ConfigError::Missing("MISSKEY_MEDIA_HOST")))
        ));
    }

    #[test]
    fn not_ready_without_oauth_keys() {
        let p = poster(Some("media.misskey.example"));
        assert_eq!(p.ensure_ready(), Err(ConfigError::Missing("API_KEY")));
    }
}
