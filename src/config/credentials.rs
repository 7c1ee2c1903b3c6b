// src/config/credentials.rs
use secrecy::{ExposeSecret, SecretString};

use super::{env_nonempty, ConfigError};

fn secret(key: &str) -> Option<SecretString> {
    env_nonempty(key).map(SecretString::from)
}

/// Shared secrets expected on inbound hook requests.
#[derive(Debug, Default)]
pub struct HookSecrets {
    pub misskey: Option<SecretString>,
    pub ifttt: Option<SecretString>,
}

impl HookSecrets {
    pub fn from_env() -> Self {
        Self {
            misskey: secret("MISSKEY_HOOK_SECRET"),
            ifttt: secret("IFTTT_HOOK_SECRET"),
        }
    }
}

/// Misskey API access for note creation.
#[derive(Debug, Default)]
pub struct MisskeyCredentials {
    pub host: Option<String>,
    pub token: Option<SecretString>,
}

/// IFTTT Maker webhook used for text-only tweets.
#[derive(Debug, Default)]
pub struct IftttCredentials {
    pub event: Option<String>,
    pub key: Option<SecretString>,
}

/// OAuth 1.0a user-context keys for the Twitter API.
#[derive(Debug, Default)]
pub struct TwitterCredentials {
    pub api_key: Option<SecretString>,
    pub api_key_secret: Option<SecretString>,
    pub access_token: Option<SecretString>,
    pub access_token_secret: Option<SecretString>,
    /// Only media from this host is fetched for upload.
    pub media_host: Option<String>,
}

/// Borrowed, fully-present OAuth keys.
pub struct OAuthKeys<'a> {
    pub consumer_key: &'a str,
    pub consumer_secret: &'a str,
    pub token: &'a str,
    pub token_secret: &'a str,
}

impl TwitterCredentials {
    pub fn oauth_keys(&self) -> Result<OAuthKeys<'_>, ConfigError> {
        fn get<'a>(s: &'a Option<SecretString>, name: &'static str) -> Result<&'a str, ConfigError> {
            s.as_ref()
                .map(|v| v.expose_secret())
                .ok_or(ConfigError::Missing(name))
        }
        Ok(OAuthKeys {
            consumer_key: get(&self.api_key, "API_KEY")?,
            consumer_secret: get(&self.api_key_secret, "API_KEY_SECRET")?,
            token: get(&self.access_token, "ACCESS_TOKEN")?,
            token_secret: get(&self.access_token_secret, "ACCESS_TOKEN_SECRET")?,
        })
    }
}

/// Everything secret the process reads from its environment. Missing values
/// are not a startup failure; the path that needs them reports a
/// [`ConfigError`].
#[derive(Debug, Default)]
pub struct Credentials {
    pub hooks: HookSecrets,
    pub misskey: MisskeyCredentials,
    pub ifttt: IftttCredentials,
    pub twitter: TwitterCredentials,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self {
            hooks: HookSecrets::from_env(),
            misskey: MisskeyCredentials {
                host: env_nonempty("MISSKEY_HOST"),
                token: secret("MISSKEY_TOKEN"),
            },
            ifttt: IftttCredentials {
                event: env_nonempty("IFTTT_EVENT"),
                key: secret("IFTTT_KEY"),
            },
            twitter: TwitterCredentials {
                api_key: secret("API_KEY"),
                api_key_secret: secret("API_KEY_SECRET"),
                access_token: secret("ACCESS_TOKEN"),
                access_token_secret: secret("ACCESS_TOKEN_SECRET"),
                media_host: env_nonempty("MISSKEY_MEDIA_HOST"),
            },
        }
    }
}
