use crate::flickr::{AlbumSummary, FlickrApi, FlickrError};
use crate::report::Reporter;
use crate::retry::{retry_with_backoff, RetryConfig};

use super::collector::PAGE_SIZE;

/// Find the id of the first album whose title equals `name` exactly.
///
/// Matching is case-sensitive and stops at the first hit in listing order.
pub async fn resolve_album_name(
    api: &dyn FlickrApi,
    user_id: &str,
    name: &str,
    retry: &RetryConfig,
    reporter: &dyn Reporter,
) -> Result<Option<String>, FlickrError> {
    let mut page = 1;
    loop {
        let result = retry_with_backoff(retry, reporter, || {
            api.list_albums(user_id, page, PAGE_SIZE)
        })
        .await?;

        if let Some(album) = result.albums.iter().find(|a| a.title == name) {
            return Ok(Some(album.id.clone()));
        }
        if result.albums.is_empty() || page >= result.pages {
            return Ok(None);
        }
        page += 1;
    }
}

/// Every album of the account, in listing order.
pub async fn list_all_albums(
    api: &dyn FlickrApi,
    user_id: &str,
    retry: &RetryConfig,
    reporter: &dyn Reporter,
) -> Result<Vec<AlbumSummary>, FlickrError> {
    let mut albums = Vec::new();
    let mut page = 1;
    loop {
        let result = retry_with_backoff(retry, reporter, || {
            api.list_albums(user_id, page, PAGE_SIZE)
        })
        .await?;
        let empty = result.albums.is_empty();
        albums.extend(result.albums);
        if empty || page >= result.pages {
            return Ok(albums);
        }
        page += 1;
    }
}
