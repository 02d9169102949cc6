//! Flickr authorization via OAuth 1.0a.
//!
//! An access token comes from one of two places, in priority order:
//! environment variables (for hosted deployments) or the on-disk token cache
//! written by the interactive `auth` command.

pub mod endpoints;
pub mod error;
pub mod flow;
pub mod responses;
pub mod store;

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;

use crate::flickr::oauth::ConsumerKey;
use crate::flickr::FlickrClient;

use self::endpoints::Endpoints;
pub use self::responses::AccessToken;
use self::store::TokenStore;

const AUTH_TIMEOUT_SECS: u64 = 30;

/// Where the active access token was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Environment,
    Cache,
}

/// HTTP client for the token endpoints.
pub fn auth_http_client() -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(AUTH_TIMEOUT_SECS))
        .build()
        .context("Failed to build HTTP client")
}

/// Find an access token without user interaction.
pub async fn resolve_access_token(store: &TokenStore) -> Option<(AccessToken, TokenSource)> {
    resolve_with_lookup(store, |key| std::env::var(key).ok()).await
}

async fn resolve_with_lookup(
    store: &TokenStore,
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<(AccessToken, TokenSource)> {
    if let Some(token) = AccessToken::from_lookup(lookup) {
        tracing::debug!("Using access token from environment");
        return Some((token, TokenSource::Environment));
    }
    store
        .load()
        .await
        .map(|token| (token, TokenSource::Cache))
}

/// Build an API client for `token`.
pub fn client_for(consumer: &ConsumerKey, token: &AccessToken) -> Result<FlickrClient> {
    FlickrClient::new(consumer.clone(), &token.token, &token.token_secret)
        .context("Failed to build Flickr client")
}

/// Run the out-of-band authorization flow on the terminal and cache the
/// resulting token.
pub async fn authenticate_interactive(
    consumer: &ConsumerKey,
    store: &TokenStore,
) -> Result<AccessToken> {
    let endpoints = Endpoints::flickr();
    let http = auth_http_client()?;

    let request = flow::request_token(&http, &endpoints, consumer, flow::OUT_OF_BAND)
        .await
        .context("Failed to obtain a request token")?;

    println!("Open this URL in a browser and authorize the application:");
    println!();
    println!("  {}", endpoints.authorize_url(&request.token, "write"));
    println!();

    let verifier = flow::prompt_verifier().await?;
    let token = flow::access_token(&http, &endpoints, consumer, &request, &verifier)
        .await
        .context("Failed to exchange the verification code for an access token")?;

    store.save(&token).await?;
    tracing::info!(user_nsid = %token.user_nsid, "Authorization completed successfully");
    Ok(token)
}
