//! OAuth 1.0a request signing (HMAC-SHA1), as required by every Flickr API
//! call that needs write permission.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha1::Sha1;

use super::error::FlickrError;

type HmacSha1 = Hmac<Sha1>;

const NONCE_LENGTH: usize = 32;

/// The application's API key and secret.
#[derive(Clone)]
pub struct ConsumerKey {
    pub key: String,
    pub secret: String,
}

impl std::fmt::Debug for ConsumerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsumerKey")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// RFC 3986 percent-encoding (unreserved characters pass through).
pub(crate) fn percent_encode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

/// Build the signature base string: `METHOD&url&sorted-params`.
pub(crate) fn base_string(method: &str, url: &str, params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();
    let joined = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        percent_encode(url),
        percent_encode(&joined)
    )
}

/// HMAC-SHA1 over the base string, keyed by `consumer_secret&token_secret`.
pub(crate) fn signature(
    base: &str,
    consumer_secret: &str,
    token_secret: Option<&str>,
) -> Result<String, FlickrError> {
    let key = format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret.unwrap_or(""))
    );
    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|e| FlickrError::OAuth(e.to_string()))?;
    mac.update(base.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

fn nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LENGTH)
        .map(char::from)
        .collect()
}

/// Add the `oauth_*` protocol parameters to `params` and sign them.
///
/// `token` is `(token, token_secret)`; it is absent only while fetching a
/// request token.
pub(crate) fn sign_request(
    method: &str,
    url: &str,
    consumer: &ConsumerKey,
    token: Option<(&str, &str)>,
    mut params: Vec<(String, String)>,
) -> Result<Vec<(String, String)>, FlickrError> {
    params.push(("oauth_consumer_key".into(), consumer.key.clone()));
    params.push(("oauth_nonce".into(), nonce()));
    params.push((
        "oauth_timestamp".into(),
        chrono::Utc::now().timestamp().to_string(),
    ));
    params.push(("oauth_signature_method".into(), "HMAC-SHA1".into()));
    params.push(("oauth_version".into(), "1.0".into()));
    if let Some((token, _)) = token {
        params.push(("oauth_token".into(), token.to_string()));
    }

    let base = base_string(method, url, &params);
    let sig = signature(&base, &consumer.secret, token.map(|(_, secret)| secret))?;
    params.push(("oauth_signature".into(), sig));
    Ok(params)
}

/// Serialize parameters as a percent-encoded query string / form body.
pub(crate) fn encode_pairs(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Parse the form-encoded bodies returned by the token endpoints.
pub(crate) fn parse_form(body: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(body.trim().as_bytes())
        .into_owned()
        .collect()
}
