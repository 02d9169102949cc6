//! The three-legged OAuth 1.0a token exchange.

use std::io::{self, Write};

use reqwest::Client;

use super::endpoints::Endpoints;
use super::error::AuthError;
use super::responses::{AccessToken, RequestToken};
use crate::flickr::oauth::{encode_pairs, parse_form, sign_request, ConsumerKey};

/// Callback value for flows where the user copies the verifier by hand.
pub const OUT_OF_BAND: &str = "oob";

async fn signed_get(
    http: &Client,
    url: &str,
    consumer: &ConsumerKey,
    token: Option<(&str, &str)>,
    params: Vec<(String, String)>,
) -> Result<String, AuthError> {
    let signed = sign_request("GET", url, consumer, token, params)?;
    tracing::debug!("GET {}", url);
    let response = http
        .get(format!("{url}?{}", encode_pairs(&signed)))
        .send()
        .await?;
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(AuthError::Rejected {
            status: status.as_u16(),
            body: body.trim().to_string(),
        });
    }
    Ok(body)
}

/// Obtain a request token. `callback` is a URL or [`OUT_OF_BAND`].
pub async fn request_token(
    http: &Client,
    endpoints: &Endpoints,
    consumer: &ConsumerKey,
    callback: &str,
) -> Result<RequestToken, AuthError> {
    let body = signed_get(
        http,
        endpoints.request_token,
        consumer,
        None,
        vec![("oauth_callback".into(), callback.into())],
    )
    .await?;
    RequestToken::from_form(parse_form(&body))
}

/// Exchange an authorized request token and its verifier for an access token.
pub async fn access_token(
    http: &Client,
    endpoints: &Endpoints,
    consumer: &ConsumerKey,
    request: &RequestToken,
    verifier: &str,
) -> Result<AccessToken, AuthError> {
    let body = signed_get(
        http,
        endpoints.access_token,
        consumer,
        Some((request.token.as_str(), request.secret.as_str())),
        vec![("oauth_verifier".into(), verifier.into())],
    )
    .await?;
    AccessToken::from_form(parse_form(&body))
}

/// Ask for the verifier code shown by Flickr after the user authorizes.
pub async fn prompt_verifier() -> Result<String, AuthError> {
    let code = tokio::task::spawn_blocking(|| {
        print!("Enter the verification code shown by Flickr: ");
        io::stdout().flush()?;
        let mut code = String::new();
        io::stdin().read_line(&mut code)?;
        Ok::<String, io::Error>(code.trim().to_string())
    })
    .await
    .map_err(io::Error::other)??;

    if code.is_empty() {
        return Err(AuthError::Verification("no verification code entered".into()));
    }
    Ok(code)
}
