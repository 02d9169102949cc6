//! In-memory [`FlickrApi`] used by unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use super::{AlbumPage, AlbumSummary, FlickrApi, FlickrError, PhotoPage};

#[derive(Default)]
struct FakeState {
    photos: Vec<String>,
    albums: Vec<AlbumSummary>,
    descriptions: HashMap<String, String>,
    members: HashMap<String, Vec<String>>,
    search_failures_left: u32,
    reported_pages: Option<u32>,
    fail_create: bool,
    fail_bulk: bool,
    add_failures: HashMap<String, String>,
    calls: Vec<String>,
    next_album_id: u64,
}

pub(crate) struct FakeFlickr {
    state: Mutex<FakeState>,
}

fn api_error(message: &str) -> FlickrError {
    FlickrError::Api {
        code: 105,
        message: message.to_string(),
    }
}

impl FakeFlickr {
    /// Account whose photos, ranked by interestingness, are `p1..=pN`.
    pub(crate) fn with_photos(n: usize) -> Self {
        let state = FakeState {
            photos: (1..=n).map(|i| format!("p{i}")).collect(),
            next_album_id: 7000,
            ..Default::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    pub(crate) fn with_album(self, id: &str, title: &str, members: &[&str]) -> Self {
        {
            let mut s = self.state.lock().unwrap();
            s.albums.push(AlbumSummary {
                id: id.to_string(),
                title: title.to_string(),
            });
            s.members.insert(
                id.to_string(),
                members.iter().map(|m| m.to_string()).collect(),
            );
        }
        self
    }

    pub(crate) fn failing_search(self, times: u32) -> Self {
        self.state.lock().unwrap().search_failures_left = times;
        self
    }

    /// Make search claim `pages` pages regardless of how many photos exist.
    pub(crate) fn reporting_pages(self, pages: u32) -> Self {
        self.state.lock().unwrap().reported_pages = Some(pages);
        self
    }

    pub(crate) fn failing_create(self) -> Self {
        self.state.lock().unwrap().fail_create = true;
        self
    }

    pub(crate) fn failing_bulk(self) -> Self {
        self.state.lock().unwrap().fail_bulk = true;
        self
    }

    pub(crate) fn failing_add(self, photo_id: &str, message: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .add_failures
            .insert(photo_id.to_string(), message.to_string());
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub(crate) fn members(&self, album_id: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .members
            .get(album_id)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn description(&self, album_id: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .descriptions
            .get(album_id)
            .cloned()
    }

    pub(crate) fn title(&self, album_id: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .albums
            .iter()
            .find(|a| a.id == album_id)
            .map(|a| a.title.clone())
    }
}

fn page_count(total: usize, per_page: u32) -> u32 {
    let per_page = per_page.max(1) as usize;
    total.div_ceil(per_page) as u32
}

fn page_slice<T: Clone>(items: &[T], page: u32, per_page: u32) -> Vec<T> {
    let start = (page.saturating_sub(1) as usize) * per_page as usize;
    items
        .iter()
        .skip(start)
        .take(per_page as usize)
        .cloned()
        .collect()
}

#[async_trait::async_trait]
impl FlickrApi for FakeFlickr {
    async fn search_interesting(
        &self,
        _user_id: &str,
        page: u32,
        per_page: u32,
    ) -> Result<PhotoPage, FlickrError> {
        let mut s = self.state.lock().unwrap();
        s.calls.push(format!("search:{page}"));
        if s.search_failures_left > 0 {
            s.search_failures_left -= 1;
            return Err(api_error("search unavailable"));
        }
        Ok(PhotoPage {
            photo_ids: page_slice(&s.photos, page, per_page),
            pages: s
                .reported_pages
                .unwrap_or_else(|| page_count(s.photos.len(), per_page)),
        })
    }

    async fn list_albums(
        &self,
        _user_id: &str,
        page: u32,
        per_page: u32,
    ) -> Result<AlbumPage, FlickrError> {
        let mut s = self.state.lock().unwrap();
        s.calls.push(format!("list_albums:{page}"));
        Ok(AlbumPage {
            albums: page_slice(&s.albums, page, per_page),
            pages: page_count(s.albums.len(), per_page),
        })
    }

    async fn create_album(
        &self,
        title: &str,
        description: &str,
        primary_photo_id: &str,
    ) -> Result<String, FlickrError> {
        let mut s = self.state.lock().unwrap();
        s.calls.push(format!("create:{primary_photo_id}"));
        if s.fail_create {
            return Err(api_error("create refused"));
        }
        s.next_album_id += 1;
        let id = s.next_album_id.to_string();
        s.albums.push(AlbumSummary {
            id: id.clone(),
            title: title.to_string(),
        });
        s.descriptions.insert(id.clone(), description.to_string());
        s.members
            .insert(id.clone(), vec![primary_photo_id.to_string()]);
        Ok(id)
    }

    async fn edit_album_meta(
        &self,
        album_id: &str,
        title: &str,
        description: &str,
    ) -> Result<(), FlickrError> {
        let mut s = self.state.lock().unwrap();
        s.calls.push(format!("edit_meta:{album_id}"));
        let Some(album) = s.albums.iter_mut().find(|a| a.id == album_id) else {
            return Err(api_error("Photoset not found"));
        };
        album.title = title.to_string();
        s.descriptions
            .insert(album_id.to_string(), description.to_string());
        Ok(())
    }

    async fn replace_album_photos(
        &self,
        album_id: &str,
        primary_photo_id: &str,
        photo_ids: &[String],
    ) -> Result<(), FlickrError> {
        let mut s = self.state.lock().unwrap();
        s.calls
            .push(format!("replace:{album_id}:{primary_photo_id}:{}", photo_ids.len()));
        if s.fail_bulk {
            return Err(api_error("too many photos"));
        }
        s.members.insert(album_id.to_string(), photo_ids.to_vec());
        Ok(())
    }

    async fn add_photo_to_album(
        &self,
        album_id: &str,
        photo_id: &str,
    ) -> Result<(), FlickrError> {
        let mut s = self.state.lock().unwrap();
        s.calls.push(format!("add:{photo_id}"));
        if let Some(message) = s.add_failures.get(photo_id).cloned() {
            return Err(api_error(&message));
        }
        let members = s.members.entry(album_id.to_string()).or_default();
        if !members.iter().any(|m| m == photo_id) {
            members.push(photo_id.to_string());
        }
        Ok(())
    }
}
