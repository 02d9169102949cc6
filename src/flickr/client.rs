use std::time::Duration;

use reqwest::header::{HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::error::FlickrError;
use super::oauth::{encode_pairs, sign_request, ConsumerKey};
use super::responses::{
    decode, CreatePhotosetResponse, EmptyResponse, PhotosetListResponse, SearchResponse,
};
use super::{AlbumPage, AlbumSummary, FlickrApi, PhotoPage};

const REST_ENDPOINT: &str = "https://api.flickr.com/services/rest";
const DEFAULT_USER_AGENT: &str = concat!("flickr-curate/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verb {
    Get,
    Post,
}

impl Verb {
    fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
        }
    }
}

/// Authenticated Flickr session: consumer key plus an access token with
/// write permission.
#[derive(Clone)]
pub struct FlickrClient {
    http: Client,
    consumer: ConsumerKey,
    token: String,
    token_secret: String,
}

impl std::fmt::Debug for FlickrClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlickrClient")
            .field("consumer", &self.consumer)
            .field("token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl FlickrClient {
    pub fn new(
        consumer: ConsumerKey,
        token: impl Into<String>,
        token_secret: impl Into<String>,
    ) -> Result<Self, FlickrError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            consumer,
            token: token.into(),
            token_secret: token_secret.into(),
        })
    }

    /// Signed REST call. Read methods go out as GET, write methods as a POST
    /// form body.
    async fn call<T>(
        &self,
        verb: Verb,
        method: &str,
        args: &[(&str, &str)],
    ) -> Result<T, FlickrError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let mut params: Vec<(String, String)> = vec![
            ("method".into(), method.into()),
            ("format".into(), "json".into()),
            ("nojsoncallback".into(), "1".into()),
        ];
        params.extend(args.iter().map(|(k, v)| (k.to_string(), v.to_string())));

        let signed = sign_request(
            verb.as_str(),
            REST_ENDPOINT,
            &self.consumer,
            Some((self.token.as_str(), self.token_secret.as_str())),
            params,
        )?;
        let encoded = encode_pairs(&signed);

        debug!(method, verb = verb.as_str(), "Flickr API call");
        let request = match verb {
            Verb::Get => self.http.get(format!("{REST_ENDPOINT}?{encoded}")),
            Verb::Post => self
                .http
                .post(REST_ENDPOINT)
                .header(
                    CONTENT_TYPE,
                    HeaderValue::from_static("application/x-www-form-urlencoded"),
                )
                .body(encoded),
        };
        let response = request
            .header(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT))
            .send()
            .await?
            .error_for_status()?;
        let value: Value = response.json().await?;
        decode(value)
    }
}

#[async_trait::async_trait]
impl FlickrApi for FlickrClient {
    async fn search_interesting(
        &self,
        user_id: &str,
        page: u32,
        per_page: u32,
    ) -> Result<PhotoPage, FlickrError> {
        let page = page.to_string();
        let per_page = per_page.to_string();
        let resp: SearchResponse = self
            .call(
                Verb::Get,
                "flickr.photos.search",
                &[
                    ("user_id", user_id),
                    ("sort", "interestingness-desc"),
                    ("per_page", per_page.as_str()),
                    ("page", page.as_str()),
                ],
            )
            .await?;
        Ok(PhotoPage {
            photo_ids: resp.photos.photo.into_iter().map(|p| p.id).collect(),
            pages: resp.photos.pages,
        })
    }

    async fn list_albums(
        &self,
        user_id: &str,
        page: u32,
        per_page: u32,
    ) -> Result<AlbumPage, FlickrError> {
        let page = page.to_string();
        let per_page = per_page.to_string();
        let resp: PhotosetListResponse = self
            .call(
                Verb::Get,
                "flickr.photosets.getList",
                &[
                    ("user_id", user_id),
                    ("per_page", per_page.as_str()),
                    ("page", page.as_str()),
                ],
            )
            .await?;
        Ok(AlbumPage {
            albums: resp
                .photosets
                .photoset
                .into_iter()
                .map(|ps| AlbumSummary {
                    id: ps.id,
                    title: ps.title.content,
                })
                .collect(),
            pages: resp.photosets.pages,
        })
    }

    async fn create_album(
        &self,
        title: &str,
        description: &str,
        primary_photo_id: &str,
    ) -> Result<String, FlickrError> {
        let resp: CreatePhotosetResponse = self
            .call(
                Verb::Post,
                "flickr.photosets.create",
                &[
                    ("title", title),
                    ("description", description),
                    ("primary_photo_id", primary_photo_id),
                ],
            )
            .await?;
        Ok(resp.photoset.id)
    }

    async fn edit_album_meta(
        &self,
        album_id: &str,
        title: &str,
        description: &str,
    ) -> Result<(), FlickrError> {
        let _: EmptyResponse = self
            .call(
                Verb::Post,
                "flickr.photosets.editMeta",
                &[
                    ("photoset_id", album_id),
                    ("title", title),
                    ("description", description),
                ],
            )
            .await?;
        Ok(())
    }

    async fn replace_album_photos(
        &self,
        album_id: &str,
        primary_photo_id: &str,
        photo_ids: &[String],
    ) -> Result<(), FlickrError> {
        let joined = photo_ids.join(",");
        let _: EmptyResponse = self
            .call(
                Verb::Post,
                "flickr.photosets.editPhotos",
                &[
                    ("photoset_id", album_id),
                    ("primary_photo_id", primary_photo_id),
                    ("photo_ids", joined.as_str()),
                ],
            )
            .await?;
        Ok(())
    }

    async fn add_photo_to_album(
        &self,
        album_id: &str,
        photo_id: &str,
    ) -> Result<(), FlickrError> {
        let _: EmptyResponse = self
            .call(
                Verb::Post,
                "flickr.photosets.addPhoto",
                &[("photoset_id", album_id), ("photo_id", photo_id)],
            )
            .await?;
        Ok(())
    }
}
