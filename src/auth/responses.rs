use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::error::AuthError;

/// Temporary credentials from `request_token`, valid until exchanged.
#[derive(Clone, PartialEq, Eq)]
pub struct RequestToken {
    pub token: String,
    pub secret: String,
}

impl std::fmt::Debug for RequestToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestToken")
            .field("token", &self.token)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Long-lived access token with write permission, plus the identity of the
/// account that granted it. This is also the on-disk token cache format.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub token: String,
    pub token_secret: String,
    pub user_nsid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fullname: Option<String>,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("user_nsid", &self.user_nsid)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

fn take(form: &mut HashMap<String, String>, key: &'static str) -> Result<String, AuthError> {
    form.remove(key)
        .filter(|v| !v.is_empty())
        .ok_or(AuthError::MissingField(key))
}

impl RequestToken {
    /// Parse the form body of a `request_token` response.
    pub fn from_form(mut form: HashMap<String, String>) -> Result<Self, AuthError> {
        if form.get("oauth_callback_confirmed").map(String::as_str) == Some("false") {
            return Err(AuthError::Verification("callback not confirmed".into()));
        }
        Ok(Self {
            token: take(&mut form, "oauth_token")?,
            secret: take(&mut form, "oauth_token_secret")?,
        })
    }
}

impl AccessToken {
    /// Parse the form body of an `access_token` response.
    pub fn from_form(mut form: HashMap<String, String>) -> Result<Self, AuthError> {
        let user_nsid = take(&mut form, "user_nsid")?;
        Ok(Self {
            token: take(&mut form, "oauth_token")?,
            token_secret: take(&mut form, "oauth_token_secret")?,
            user_nsid,
            username: form.remove("username").filter(|v| !v.is_empty()),
            fullname: form.remove("fullname").filter(|v| !v.is_empty()),
        })
    }

    /// Token from `FLICKR_OAUTH_TOKEN`, `FLICKR_OAUTH_TOKEN_SECRET` and
    /// `FLICKR_USER_NSID`. All three must be set and non-empty.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Some(Self {
            token: get("FLICKR_OAUTH_TOKEN")?,
            token_secret: get("FLICKR_OAUTH_TOKEN_SECRET")?,
            user_nsid: get("FLICKR_USER_NSID")?,
            username: None,
            fullname: None,
        })
    }

    /// The three environment lines that recreate this token elsewhere.
    pub fn env_lines(&self) -> String {
        format!(
            "FLICKR_OAUTH_TOKEN={}\nFLICKR_OAUTH_TOKEN_SECRET={}\nFLICKR_USER_NSID={}",
            self.token, self.token_secret, self.user_nsid
        )
    }
}
