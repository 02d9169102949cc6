use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlickrError {
    /// Flickr answered with `stat: "fail"`. Displays the server message only,
    /// since that is what gets surfaced in progress lines.
    #[error("{message}")]
    Api { code: i64, message: String },
    #[error("Unexpected response shape: {0}")]
    Decode(String),
    #[error("OAuth error: {0}")]
    OAuth(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
