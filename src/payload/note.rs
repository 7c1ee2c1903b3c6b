// src/payload/note.rs
use serde::{Deserialize, Deserializer};

/// Misskey note visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Home,
    Followers,
    Specified,
    #[default]
    #[serde(other)]
    Other,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Home => "home",
            Visibility::Followers => "followers",
            Visibility::Specified => "specified",
            Visibility::Other => "other",
        }
    }
}

/// Attached drive file; only `url` and MIME `type` matter here.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct DriveFile {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(rename = "type", default)]
    pub mime: Option<String>,
}

impl DriveFile {
    pub fn is_image(&self) -> bool {
        self.mime.as_deref().is_some_and(|m| m.contains("image"))
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct RenoteUser {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub username: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Renote {
    #[serde(default, deserialize_with = "null_default")]
    pub id: String,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub user: RenoteUser,
}

/// Misskey `note` webhook body.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct InboundNote {
    #[serde(default)]
    server: String,
    body: NoteBody,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
struct NoteBody {
    note: NoteFields,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
struct NoteFields {
    #[serde(default, deserialize_with = "null_default")]
    id: String,
    #[serde(default, deserialize_with = "null_default")]
    visibility: Visibility,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    cw: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    files: Vec<DriveFile>,
    #[serde(default)]
    renote: Option<Renote>,
}

/// Explicit `null` reads as the zero value, same as a missing key.
fn null_default<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

impl InboundNote {
    pub fn from_slice(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }

    /// Origin server URL, e.g. `https://misskey.example`.
    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn id(&self) -> &str {
        &self.body.note.id
    }

    pub fn visibility(&self) -> Visibility {
        self.body.note.visibility
    }

    /// Body text; `null`, `""` and the literal `"null"` all read as empty.
    pub fn body_text(&self) -> &str {
        match self.body.note.text.as_deref() {
            None | Some("null") => "",
            Some(t) => t,
        }
    }

    /// Content warning, if non-empty.
    pub fn cw(&self) -> Option<&str> {
        self.body.note.cw.as_deref().filter(|c| !c.is_empty())
    }

    pub fn files(&self) -> &[DriveFile] {
        &self.body.note.files
    }

    pub fn renote(&self) -> Option<&Renote> {
        self.body.note.renote.as_ref()
    }

    /// Link back to this note on its origin server.
    pub fn permalink(&self) -> String {
        format!("{}/notes/{}", self.server.trim_end_matches('/'), self.id())
    }

    /// URLs of image attachments, in payload order.
    pub fn image_urls(&self) -> Vec<String> {
        self.files()
            .iter()
            .filter(|f| f.is_image())
            .filter_map(|f| f.url.clone())
            .collect()
    }
}
