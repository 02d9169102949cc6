//! The album sync: collect the most interesting photos, resolve the target
//! album and write it.

pub mod collector;
pub mod resolver;
pub mod writer;

use thiserror::Error;

use crate::flickr::{FlickrApi, FlickrError};
use crate::report::{Reporter, DONE_MARKER, ERROR_MARKER};
use crate::retry::RetryConfig;

pub use writer::{AlbumWriter, WriteOptions, WriteOutcome};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Remote(#[from] FlickrError),

    #[error("Photoset '{0}' not found")]
    AlbumNotFound(String),

    #[error("Cannot write an album without photos")]
    EmptyPhotoList,
}

/// Which album receives the photos.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlbumTarget {
    New,
    ById(String),
    ByName(String),
}

impl AlbumTarget {
    /// Build a target from the optional id and name inputs. An id wins over a
    /// name; blank values count as absent.
    pub fn from_inputs(id: Option<&str>, name: Option<&str>) -> Self {
        fn present(v: Option<&str>) -> Option<&str> {
            v.map(str::trim).filter(|v| !v.is_empty())
        }
        match (present(id), present(name)) {
            (Some(id), _) => Self::ById(id.to_string()),
            (None, Some(name)) => Self::ByName(name.to_string()),
            (None, None) => Self::New,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncRequest {
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub count: u32,
    pub target: AlbumTarget,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub retry: RetryConfig,
    pub write: WriteOptions,
    /// Cap on the ids listed by a dry run; `None` lists all of them.
    pub dry_run_preview: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    NothingToDo,
    DryRun {
        photo_ids: Vec<String>,
        album_id: Option<String>,
    },
    Written {
        album_id: String,
        url: String,
        fallback: Option<WriteOutcome>,
    },
}

/// Public page of an album. `@` in the NSID is percent-encoded.
pub fn album_url(user_id: &str, album_id: &str) -> String {
    format!(
        "https://www.flickr.com/photos/{}/sets/{album_id}",
        user_id.replace('@', "%40")
    )
}

pub async fn run_album_sync(
    api: &dyn FlickrApi,
    request: &SyncRequest,
    options: &SyncOptions,
    reporter: &dyn Reporter,
) -> Result<SyncOutcome, SyncError> {
    let retry = &options.retry;
    tracing::info!(
        count = request.count,
        album = ?request.target,
        dry_run = request.dry_run,
        "Starting album sync"
    );

    reporter.emit(&format!(
        "Fetching top {} most interesting photos...",
        request.count
    ));
    let photo_ids =
        collector::collect_interesting(api, &request.user_id, request.count, retry, reporter)
            .await?;

    if photo_ids.is_empty() {
        reporter.emit("No photos found. Nothing to do.");
        return Ok(SyncOutcome::NothingToDo);
    }

    let album_id = match &request.target {
        AlbumTarget::New => None,
        AlbumTarget::ById(id) => Some(id.clone()),
        AlbumTarget::ByName(name) => {
            reporter.emit(&format!("Looking up photoset '{name}'..."));
            let id = resolver::resolve_album_name(api, &request.user_id, name, retry, reporter)
                .await?
                .ok_or_else(|| SyncError::AlbumNotFound(name.clone()))?;
            reporter.emit(&format!("Found photoset '{name}' with ID: {id}"));
            Some(id)
        }
    };

    if request.dry_run {
        report_dry_run(&photo_ids, album_id.as_deref(), options.dry_run_preview, reporter);
        return Ok(SyncOutcome::DryRun {
            photo_ids,
            album_id,
        });
    }

    let writer = AlbumWriter::new(api, retry, &options.write, reporter);
    let (album_id, fallback) = match album_id {
        Some(id) => {
            let fallback = writer
                .update(&id, &request.title, &request.description, &photo_ids)
                .await?;
            (id, fallback)
        }
        None => {
            let created = writer
                .create(&request.title, &request.description, &photo_ids)
                .await?;
            (created.album_id, created.fallback)
        }
    };

    let url = album_url(&request.user_id, &album_id);
    reporter.emit("");
    reporter.emit("Done! View your photoset at:");
    reporter.emit(&format!("  {url}"));
    tracing::info!(album_id = %album_id, "Album sync finished");
    Ok(SyncOutcome::Written {
        album_id,
        url,
        fallback,
    })
}

fn report_dry_run(
    photo_ids: &[String],
    album_id: Option<&str>,
    preview: Option<usize>,
    reporter: &dyn Reporter,
) {
    match album_id {
        Some(id) => reporter.emit(&format!(
            "[DRY RUN] Would update photoset {id} with {} photos:",
            photo_ids.len()
        )),
        None => reporter.emit(&format!(
            "[DRY RUN] Would create a new photoset with {} photos:",
            photo_ids.len()
        )),
    }
    let shown = preview.unwrap_or(photo_ids.len()).min(photo_ids.len());
    for id in &photo_ids[..shown] {
        reporter.emit(&format!("  {id}"));
    }
    if shown < photo_ids.len() {
        reporter.emit(&format!("  ... and {} more", photo_ids.len() - shown));
    }
}

/// Run the sync and finish the stream with a sentinel line.
///
/// Errors are reported, not returned; the outcome is handed back for callers
/// that want it.
pub async fn run_reported(
    api: &dyn FlickrApi,
    request: &SyncRequest,
    options: &SyncOptions,
    reporter: &dyn Reporter,
) -> Option<SyncOutcome> {
    match run_album_sync(api, request, options, reporter).await {
        Ok(outcome) => {
            reporter.emit(DONE_MARKER);
            Some(outcome)
        }
        Err(e) => {
            tracing::error!(error = %e, "Album sync failed");
            reporter.emit("");
            reporter.emit(&format!("Error: {e}"));
            reporter.emit(ERROR_MARKER);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flickr::fake::FakeFlickr;
    use crate::report::RecordingReporter;

    fn request(count: u32, target: AlbumTarget) -> SyncRequest {
        SyncRequest {
            user_id: "12345@N01".to_string(),
            title: "Top".to_string(),
            description: "Best.".to_string(),
            count,
            target,
            dry_run: false,
        }
    }

    #[test]
    fn test_album_url_escapes_at_sign() {
        assert_eq!(
            album_url("12345@N01", "720"),
            "https://www.flickr.com/photos/12345%40N01/sets/720"
        );
    }

    #[test]
    fn test_target_from_inputs() {
        assert_eq!(AlbumTarget::from_inputs(None, None), AlbumTarget::New);
        assert_eq!(AlbumTarget::from_inputs(Some("  "), Some("")), AlbumTarget::New);
        assert_eq!(
            AlbumTarget::from_inputs(None, Some("Best")),
            AlbumTarget::ByName("Best".into())
        );
        assert_eq!(
            AlbumTarget::from_inputs(Some("9"), Some("Best")),
            AlbumTarget::ById("9".into())
        );
        assert_eq!(
            AlbumTarget::from_inputs(Some(" 72157 "), None),
            AlbumTarget::ById("72157".into())
        );
    }

    #[tokio::test]
    async fn test_new_album_with_successful_bulk() {
        let api = FakeFlickr::with_photos(5);
        let reporter = RecordingReporter::default();
        let outcome = run_reported(
            &api,
            &request(3, AlbumTarget::New),
            &SyncOptions::default(),
            &reporter,
        )
        .await
        .unwrap();

        let SyncOutcome::Written {
            album_id, fallback, ..
        } = outcome
        else {
            panic!("expected a written album, got {outcome:?}");
        };
        assert_eq!(fallback, None);
        assert_eq!(api.members(&album_id), ["p1", "p2", "p3"]);
        assert_eq!(
            api.calls(),
            [
                "search:1".to_string(),
                "create:p1".to_string(),
                format!("replace:{album_id}:p1:3"),
            ]
        );
        let lines = reporter.lines();
        assert_eq!(lines.last().map(String::as_str), Some(DONE_MARKER));
        assert!(lines.contains(&"Done! View your photoset at:".to_string()));
        assert!(lines
            .iter()
            .any(|l| l.starts_with("  https://www.flickr.com/photos/12345%40N01/sets/")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_album_with_bulk_failure_and_one_bad_photo() {
        let api = FakeFlickr::with_photos(5)
            .failing_bulk()
            .failing_add("p3", "rate limited");
        let reporter = RecordingReporter::default();
        let outcome = run_reported(
            &api,
            &request(3, AlbumTarget::New),
            &SyncOptions::default(),
            &reporter,
        )
        .await
        .unwrap();

        let SyncOutcome::Written { fallback, .. } = outcome else {
            panic!("expected a written album");
        };
        assert_eq!(
            fallback,
            Some(WriteOutcome {
                added: 1,
                failed: 1,
                failures: vec![("p3".to_string(), "rate limited".to_string())],
            })
        );
        assert!(reporter.contains("  Photo p3: rate limited"));
        assert_eq!(reporter.lines().last().map(String::as_str), Some(DONE_MARKER));
    }

    #[tokio::test]
    async fn test_no_photos_is_a_successful_no_op() {
        let api = FakeFlickr::with_photos(0);
        let reporter = RecordingReporter::default();
        let outcome = run_reported(
            &api,
            &request(10, AlbumTarget::New),
            &SyncOptions::default(),
            &reporter,
        )
        .await;

        assert_eq!(outcome, Some(SyncOutcome::NothingToDo));
        assert_eq!(api.calls(), ["search:1"]);
        let lines = reporter.lines();
        assert!(lines.contains(&"No photos found. Nothing to do.".to_string()));
        assert_eq!(lines.last().map(String::as_str), Some(DONE_MARKER));
    }

    #[tokio::test]
    async fn test_update_by_name() {
        let api = FakeFlickr::with_photos(4).with_album("88", "Top", &["old"]);
        let reporter = RecordingReporter::default();
        let outcome = run_album_sync(
            &api,
            &request(2, AlbumTarget::ByName("Top".into())),
            &SyncOptions::default(),
            &reporter,
        )
        .await
        .unwrap();

        assert!(matches!(outcome, SyncOutcome::Written { ref album_id, .. } if album_id == "88"));
        assert_eq!(api.members("88"), ["p1", "p2"]);
        assert!(reporter.contains("Found photoset 'Top' with ID: 88"));
    }

    #[tokio::test]
    async fn test_unknown_album_name_is_fatal_and_writes_nothing() {
        let api = FakeFlickr::with_photos(4).with_album("88", "Top", &[]);
        let reporter = RecordingReporter::default();
        let outcome = run_reported(
            &api,
            &request(2, AlbumTarget::ByName("top".into())),
            &SyncOptions::default(),
            &reporter,
        )
        .await;

        assert_eq!(outcome, None);
        assert!(api
            .calls()
            .iter()
            .all(|c| c.starts_with("search:") || c.starts_with("list_albums:")));
        let lines = reporter.lines();
        let n = lines.len();
        assert_eq!(
            &lines[n - 3..],
            ["", "Error: Photoset 'top' not found", ERROR_MARKER]
        );
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let api = FakeFlickr::with_photos(30);
        let reporter = RecordingReporter::default();
        let mut req = request(25, AlbumTarget::New);
        req.dry_run = true;
        let options = SyncOptions {
            dry_run_preview: Some(20),
            ..Default::default()
        };
        let outcome = run_album_sync(&api, &req, &options, &reporter).await.unwrap();

        let SyncOutcome::DryRun {
            photo_ids,
            album_id,
        } = outcome
        else {
            panic!("expected a dry run");
        };
        assert_eq!(photo_ids.len(), 25);
        assert_eq!(album_id, None);
        assert_eq!(api.calls(), ["search:1"]);
        assert!(reporter.contains("[DRY RUN] Would create a new photoset with 25 photos:"));
        assert!(reporter.contains("  p20"));
        assert!(!reporter.lines().contains(&"  p21".to_string()));
        assert!(reporter.contains("  ... and 5 more"));
    }

    #[tokio::test]
    async fn test_dry_run_still_resolves_name() {
        let api = FakeFlickr::with_photos(2).with_album("5", "Top", &[]);
        let reporter = RecordingReporter::default();
        let mut req = request(2, AlbumTarget::ByName("Top".into()));
        req.dry_run = true;
        let outcome = run_album_sync(&api, &req, &SyncOptions::default(), &reporter)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            SyncOutcome::DryRun {
                photo_ids: vec!["p1".into(), "p2".into()],
                album_id: Some("5".into()),
            }
        );
        assert!(reporter.contains("[DRY RUN] Would update photoset 5 with 2 photos:"));
        assert!(!reporter.contains("more"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_failure_reports_error_marker() {
        let api = FakeFlickr::with_photos(3).failing_search(3);
        let reporter = RecordingReporter::default();
        let outcome = run_reported(
            &api,
            &request(3, AlbumTarget::New),
            &SyncOptions::default(),
            &reporter,
        )
        .await;

        assert_eq!(outcome, None);
        assert!(reporter.contains("Error: search unavailable"));
        assert_eq!(reporter.lines().last().map(String::as_str), Some(ERROR_MARKER));
    }
}
