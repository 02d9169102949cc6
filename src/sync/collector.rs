use crate::flickr::{FlickrApi, FlickrError};
use crate::report::Reporter;
use crate::retry::{retry_with_backoff, RetryConfig};

/// Largest page Flickr serves for search and photoset listings.
pub const PAGE_SIZE: u32 = 500;

/// Fetch up to `count` of the account's photo ids, most interesting first.
///
/// Stops early on an empty page or when the server runs out of pages. A page
/// that still fails after retries aborts the whole collection.
pub async fn collect_interesting(
    api: &dyn FlickrApi,
    user_id: &str,
    count: u32,
    retry: &RetryConfig,
    reporter: &dyn Reporter,
) -> Result<Vec<String>, FlickrError> {
    let total_pages = count.div_ceil(PAGE_SIZE);
    let mut photo_ids: Vec<String> = Vec::new();

    for page in 1..=total_pages {
        reporter.emit(&format!("Fetching page {page}/{total_pages}..."));
        let result = retry_with_backoff(retry, reporter, || {
            api.search_interesting(user_id, page, PAGE_SIZE)
        })
        .await?;

        if result.photo_ids.is_empty() {
            tracing::debug!(page, "Empty search page, stopping");
            break;
        }
        photo_ids.extend(result.photo_ids);
        if result.pages <= page {
            break;
        }
    }

    photo_ids.truncate(count as usize);
    reporter.emit(&format!("Found {} interesting photos.", photo_ids.len()));
    Ok(photo_ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flickr::fake::FakeFlickr;
    use crate::report::RecordingReporter;

    async fn collect(api: &FakeFlickr, count: u32) -> Result<Vec<String>, FlickrError> {
        let reporter = RecordingReporter::default();
        collect_interesting(api, "12@N01", count, &RetryConfig::default(), &reporter).await
    }

    #[tokio::test]
    async fn test_truncates_to_requested_count() {
        let api = FakeFlickr::with_photos(5);
        let ids = collect(&api, 3).await.unwrap();
        assert_eq!(ids, ["p1", "p2", "p3"]);
        assert_eq!(api.calls(), ["search:1"]);
    }

    #[tokio::test]
    async fn test_order_preserved_across_pages() {
        let api = FakeFlickr::with_photos(1100);
        let ids = collect(&api, 1200).await.unwrap();
        assert_eq!(ids.len(), 1100);
        let expected: Vec<String> = (1..=1100).map(|i| format!("p{i}")).collect();
        assert_eq!(ids, expected);
        assert_eq!(api.calls(), ["search:1", "search:2", "search:3"]);
    }

    #[tokio::test]
    async fn test_stops_when_server_reports_last_page() {
        let api = FakeFlickr::with_photos(700);
        let ids = collect(&api, 1000).await.unwrap();
        assert_eq!(ids.len(), 700);
        assert_eq!(api.calls(), ["search:1", "search:2"]);
    }

    #[tokio::test]
    async fn test_empty_page_stops_collection_immediately() {
        // Server claims 4 pages but only has data for one.
        let api = FakeFlickr::with_photos(500).reporting_pages(4);
        let ids = collect(&api, 2000).await.unwrap();
        assert_eq!(ids.len(), 500);
        assert_eq!(api.calls(), ["search:1", "search:2"]);
    }

    #[tokio::test]
    async fn test_empty_account() {
        let api = FakeFlickr::with_photos(0);
        let reporter = RecordingReporter::default();
        let ids = collect_interesting(&api, "u", 10, &RetryConfig::default(), &reporter)
            .await
            .unwrap();
        assert!(ids.is_empty());
        assert_eq!(
            reporter.lines(),
            ["Fetching page 1/1...", "Found 0 interesting photos."]
        );
    }

    #[tokio::test]
    async fn test_progress_line_per_page() {
        let api = FakeFlickr::with_photos(1500);
        let reporter = RecordingReporter::default();
        collect_interesting(&api, "u", 1001, &RetryConfig::default(), &reporter)
            .await
            .unwrap();
        assert_eq!(
            reporter.lines(),
            [
                "Fetching page 1/3...",
                "Fetching page 2/3...",
                "Fetching page 3/3...",
                "Found 1001 interesting photos.",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_page_failure_is_retried() {
        let api = FakeFlickr::with_photos(3).failing_search(2);
        let ids = collect(&api, 3).await.unwrap();
        assert_eq!(ids, ["p1", "p2", "p3"]);
        assert_eq!(api.calls(), ["search:1", "search:1", "search:1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_page_failure_aborts() {
        let api = FakeFlickr::with_photos(3).failing_search(3);
        let err = collect(&api, 3).await.unwrap_err();
        assert_eq!(err.to_string(), "search unavailable");
    }
}
