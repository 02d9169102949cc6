//! Flickr REST client: the remote collaborator the album sync drives.
//!
//! [`FlickrApi`] is the seam between the sync logic and the network. The real
//! implementation is [`FlickrClient`]; tests use an in-memory fake.

mod client;
pub mod error;
#[cfg(test)]
pub(crate) mod fake;
pub mod oauth;
pub mod responses;

pub use client::FlickrClient;
pub use error::FlickrError;

/// One page of `flickr.photos.search` results, ids in server order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoPage {
    pub photo_ids: Vec<String>,
    pub pages: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumSummary {
    pub id: String,
    pub title: String,
}

/// One page of `flickr.photosets.getList`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumPage {
    pub albums: Vec<AlbumSummary>,
    pub pages: u32,
}

/// The subset of the Flickr API used to curate an album.
#[async_trait::async_trait]
pub trait FlickrApi: Send + Sync {
    /// `flickr.photos.search` for `user_id`, sorted by `interestingness-desc`.
    async fn search_interesting(
        &self,
        user_id: &str,
        page: u32,
        per_page: u32,
    ) -> Result<PhotoPage, FlickrError>;

    /// `flickr.photosets.getList`.
    async fn list_albums(
        &self,
        user_id: &str,
        page: u32,
        per_page: u32,
    ) -> Result<AlbumPage, FlickrError>;

    /// `flickr.photosets.create`; returns the new album id.
    async fn create_album(
        &self,
        title: &str,
        description: &str,
        primary_photo_id: &str,
    ) -> Result<String, FlickrError>;

    /// `flickr.photosets.editMeta`.
    async fn edit_album_meta(
        &self,
        album_id: &str,
        title: &str,
        description: &str,
    ) -> Result<(), FlickrError>;

    /// `flickr.photosets.editPhotos`: replaces the whole membership.
    async fn replace_album_photos(
        &self,
        album_id: &str,
        primary_photo_id: &str,
        photo_ids: &[String],
    ) -> Result<(), FlickrError>;

    /// `flickr.photosets.addPhoto`.
    async fn add_photo_to_album(&self, album_id: &str, photo_id: &str)
        -> Result<(), FlickrError>;
}
