//! Album creation and update.
//!
//! Membership is written in one `editPhotos` call when possible. If that bulk
//! call fails, photos are added one at a time and per-photo failures are
//! collected instead of aborting the batch.

use std::fmt::Display;
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};

use crate::flickr::FlickrApi;
use crate::report::Reporter;
use crate::retry::{retry_with_backoff, RetryConfig};

use super::SyncError;

/// `%Z` renders the offset's name: `UTC` for [`chrono::Utc`], but a numeric
/// offset such as `+02:00` for [`Local`], which carries no zone abbreviation.
const LAST_UPDATED_FORMAT: &str = "%B %d, %Y at %I:%M %p %Z";

/// Pacing and progress cadence for the one-by-one fallback.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Pause between two consecutive add calls.
    pub item_pause: Duration,
    /// Emit a progress line every this many items (and on the last one).
    pub progress_every: usize,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            item_pause: Duration::from_millis(100),
            progress_every: 50,
        }
    }
}

/// Tally of the one-by-one fallback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOutcome {
    pub added: usize,
    pub failed: usize,
    /// `(photo id, error message)` in the order the failures happened.
    pub failures: Vec<(String, String)>,
}

/// Result of creating a new album.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedAlbum {
    pub album_id: String,
    /// Present only when the bulk call failed and the fallback ran.
    pub fallback: Option<WriteOutcome>,
}

/// `description` followed by a blank line and a "Last updated" stamp.
pub fn with_last_updated<Tz>(description: &str, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!(
        "{description}\n\nLast updated: {}",
        now.format(LAST_UPDATED_FORMAT)
    )
}

pub struct AlbumWriter<'a> {
    api: &'a dyn FlickrApi,
    retry: &'a RetryConfig,
    options: &'a WriteOptions,
    reporter: &'a dyn Reporter,
}

impl<'a> AlbumWriter<'a> {
    pub fn new(
        api: &'a dyn FlickrApi,
        retry: &'a RetryConfig,
        options: &'a WriteOptions,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            api,
            retry,
            options,
            reporter,
        }
    }

    /// Create an album whose cover is `photo_ids[0]`, then fill it.
    pub async fn create(
        &self,
        title: &str,
        description: &str,
        photo_ids: &[String],
    ) -> Result<CreatedAlbum, SyncError> {
        let primary = photo_ids.first().ok_or(SyncError::EmptyPhotoList)?;

        self.reporter.emit(&format!(
            "Creating photoset '{title}' with {} photos...",
            photo_ids.len()
        ));
        let album_id = retry_with_backoff(self.retry, self.reporter, || {
            self.api.create_album(title, description, primary)
        })
        .await?;
        self.reporter
            .emit(&format!("Photoset created with ID: {album_id}"));
        tracing::info!(album_id = %album_id, "Created photoset");

        self.reporter.emit("Attempting bulk add via editPhotos...");
        let fallback = self
            .bulk_or_fallback(
                &album_id,
                photo_ids,
                "All photos added successfully via editPhotos.",
            )
            .await;

        Ok(CreatedAlbum { album_id, fallback })
    }

    /// Overwrite title and description of an existing album and replace its
    /// membership with `photo_ids`.
    ///
    /// If the bulk replace fails, the fallback only adds photos; anything
    /// already in the album stays there.
    pub async fn update(
        &self,
        album_id: &str,
        title: &str,
        description: &str,
        photo_ids: &[String],
    ) -> Result<Option<WriteOutcome>, SyncError> {
        if photo_ids.is_empty() {
            return Err(SyncError::EmptyPhotoList);
        }

        self.reporter.emit(&format!(
            "Updating photoset '{album_id}' with {} photos...",
            photo_ids.len()
        ));
        let description = with_last_updated(description, &Local::now());

        self.reporter
            .emit("Updating photoset title and description...");
        retry_with_backoff(self.retry, self.reporter, || {
            self.api.edit_album_meta(album_id, title, &description)
        })
        .await?;

        self.reporter.emit("Replacing photos via editPhotos...");
        Ok(self
            .bulk_or_fallback(
                album_id,
                photo_ids,
                "All photos replaced successfully via editPhotos.",
            )
            .await)
    }

    async fn bulk_or_fallback(
        &self,
        album_id: &str,
        photo_ids: &[String],
        success_line: &str,
    ) -> Option<WriteOutcome> {
        let primary = &photo_ids[0];
        let bulk = retry_with_backoff(self.retry, self.reporter, || {
            self.api.replace_album_photos(album_id, primary, photo_ids)
        })
        .await;

        match bulk {
            Ok(()) => {
                self.reporter.emit(success_line);
                None
            }
            Err(e) => {
                tracing::warn!(album_id, error = %e, "Bulk editPhotos failed");
                self.reporter.emit(&format!(
                    "editPhotos failed ({e}), falling back to addPhoto loop..."
                ));
                Some(self.add_individually(album_id, &photo_ids[1..]).await)
            }
        }
    }

    /// Add photos one by one. The primary photo is already a member and must
    /// not be in `remaining`.
    async fn add_individually(&self, album_id: &str, remaining: &[String]) -> WriteOutcome {
        let mut outcome = WriteOutcome::default();
        let total = remaining.len();
        let every = self.options.progress_every.max(1);

        for (index, photo_id) in remaining.iter().enumerate() {
            let position = index + 1;
            let result = retry_with_backoff(self.retry, self.reporter, || {
                self.api.add_photo_to_album(album_id, photo_id)
            })
            .await;

            match result {
                Ok(()) => outcome.added += 1,
                Err(e) => {
                    tracing::debug!(photo_id = %photo_id, error = %e, "addPhoto failed");
                    outcome.failed += 1;
                    outcome.failures.push((photo_id.clone(), e.to_string()));
                }
            }

            if position % every == 0 || position == total {
                self.reporter.emit(&format!(
                    "  Progress: {position}/{total} (added: {}, failed: {})",
                    outcome.added, outcome.failed
                ));
            }

            if position < total {
                tokio::time::sleep(self.options.item_pause).await;
            }
        }

        if outcome.failures.is_empty() {
            self.reporter
                .emit("All photos added successfully via addPhoto loop.");
        } else {
            self.reporter.emit("");
            self.reporter
                .emit(&format!("Failed to add {} photo(s):", outcome.failed));
            for (photo_id, err) in &outcome.failures {
                self.reporter.emit(&format!("  Photo {photo_id}: {err}"));
            }
        }

        outcome
    }
}
