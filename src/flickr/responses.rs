//! Typed views of the Flickr REST responses this tool consumes.
//!
//! Every response is checked for `stat` first, then decoded into the struct
//! for that method. Anything that does not match fails here with
//! [`FlickrError::Decode`] instead of surfacing as a missing key later.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::error::FlickrError;

/// Flickr sends some counters as numbers and some as strings depending on the
/// method (and sometimes on the day).
fn lenient_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrString {
        Num(u32),
        Str(String),
    }

    match NumOrString::deserialize(deserializer)? {
        NumOrString::Num(n) => Ok(n),
        NumOrString::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Flickr ids are strings, but guard against a numeric id sneaking through.
fn lenient_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string id, got {other}"
        ))),
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    stat: String,
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

/// Check the `stat` envelope and decode the payload into `T`.
pub(crate) fn decode<T>(value: Value) -> Result<T, FlickrError>
where
    T: for<'de> Deserialize<'de>,
{
    let envelope: Envelope = serde_json::from_value(value.clone())
        .map_err(|e| FlickrError::Decode(format!("missing stat: {e}")))?;
    if envelope.stat != "ok" {
        return Err(FlickrError::Api {
            code: envelope.code.unwrap_or_default(),
            message: envelope
                .message
                .unwrap_or_else(|| format!("request failed with stat '{}'", envelope.stat)),
        });
    }
    serde_json::from_value(value).map_err(|e| FlickrError::Decode(e.to_string()))
}

/// Response of `flickr.photos.search`.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub photos: PhotosPage,
}

#[derive(Debug, Deserialize)]
pub struct PhotosPage {
    #[serde(deserialize_with = "lenient_u32")]
    pub pages: u32,
    #[serde(default)]
    pub photo: Vec<PhotoRef>,
}

#[derive(Debug, Deserialize)]
pub struct PhotoRef {
    #[serde(deserialize_with = "lenient_id")]
    pub id: String,
}

/// Response of `flickr.photosets.getList`.
#[derive(Debug, Deserialize)]
pub struct PhotosetListResponse {
    pub photosets: PhotosetsPage,
}

#[derive(Debug, Deserialize)]
pub struct PhotosetsPage {
    #[serde(deserialize_with = "lenient_u32")]
    pub pages: u32,
    #[serde(default)]
    pub photoset: Vec<PhotosetSummary>,
}

#[derive(Debug, Deserialize)]
pub struct PhotosetSummary {
    #[serde(deserialize_with = "lenient_id")]
    pub id: String,
    pub title: Content,
}

/// Flickr wraps free text as `{"_content": "..."}`.
#[derive(Debug, Deserialize)]
pub struct Content {
    #[serde(rename = "_content", default)]
    pub content: String,
}

/// Response of `flickr.photosets.create`.
#[derive(Debug, Deserialize)]
pub struct CreatePhotosetResponse {
    pub photoset: CreatedPhotoset,
}

#[derive(Debug, Deserialize)]
pub struct CreatedPhotoset {
    #[serde(deserialize_with = "lenient_id")]
    pub id: String,
}

/// Body of methods that only report success (`editMeta`, `editPhotos`, `addPhoto`).
#[derive(Debug, Deserialize)]
pub struct EmptyResponse {}
