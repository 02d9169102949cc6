//! Optional password gate for hosted deployments, with an optional
//! authenticator-app code as second step.

use anyhow::{anyhow, Result};
use axum::extract::{Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use totp_rs::{Algorithm, Secret, TOTP};

use super::AppState;

const AUTH_COOKIE: &str = "app_auth";
/// Marks a browser that passed the password step and still owes a code.
const PENDING_COOKIE: &str = "app_pending";
const TOTP_ISSUER: &str = "Flickr Curate";

/// Credentials from `APP_USERNAME` / `APP_PASSWORD`, the optional
/// `TOTP_SECRET`, and the cookie values issued by the gate. Cookie values
/// change on every start.
pub struct LoginGate {
    username: String,
    password: String,
    totp: Option<TOTP>,
    cookie_token: String,
    pending_token: String,
}

impl std::fmt::Debug for LoginGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginGate")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("totp", &self.totp.is_some())
            .finish_non_exhaustive()
    }
}

/// Outcome of a correct username and password.
#[derive(Debug, PartialEq, Eq)]
enum Step {
    Granted,
    NeedsCode,
}

fn random_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Decode a base32 secret the way authenticator apps show it: any case,
/// spaces and padding allowed. Six digits, 30 s steps, one step of skew.
fn totp_from_secret(secret: &str, account: &str) -> Result<TOTP> {
    let cleaned: String = secret
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '=')
        .collect::<String>()
        .to_uppercase();
    let bytes = Secret::Encoded(cleaned)
        .to_bytes()
        .map_err(|e| anyhow!("TOTP_SECRET is not valid base32: {:?}", e))?;
    if bytes.is_empty() {
        return Err(anyhow!("TOTP_SECRET is empty after decoding"));
    }
    let account = if account.is_empty() { "user" } else { account };
    Ok(TOTP::new_unchecked(
        Algorithm::SHA1,
        6,
        1,
        30,
        bytes,
        Some(TOTP_ISSUER.to_string()),
        account.to_string(),
    ))
}

impl LoginGate {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            totp: None,
            cookie_token: random_token(),
            pending_token: random_token(),
        }
    }

    /// Require an authenticator code after the password.
    pub fn with_totp(mut self, secret: &str) -> Result<Self> {
        self.totp = Some(totp_from_secret(secret, &self.username)?);
        Ok(self)
    }

    /// Enabled only when `APP_PASSWORD` is set and non-empty. A malformed
    /// `TOTP_SECRET` is an error rather than a silently weaker gate.
    pub fn from_env() -> Result<Option<Self>> {
        let Some(password) = std::env::var("APP_PASSWORD")
            .ok()
            .filter(|p| !p.is_empty())
        else {
            return Ok(None);
        };
        let username = std::env::var("APP_USERNAME").unwrap_or_default();
        let gate = Self::new(username, password);
        match std::env::var("TOTP_SECRET").ok().filter(|s| !s.trim().is_empty()) {
            Some(secret) => gate.with_totp(&secret).map(Some),
            None => Ok(Some(gate)),
        }
    }

    pub fn has_totp(&self) -> bool {
        self.totp.is_some()
    }

    fn accepts(&self, jar: &CookieJar) -> bool {
        jar.get(AUTH_COOKIE)
            .is_some_and(|c| c.value() == self.cookie_token)
    }

    fn is_pending(&self, jar: &CookieJar) -> bool {
        jar.get(PENDING_COOKIE)
            .is_some_and(|c| c.value() == self.pending_token)
    }

    fn check(&self, username: &str, password: &str) -> Option<Step> {
        if username != self.username || password != self.password {
            return None;
        }
        Some(if self.totp.is_some() {
            Step::NeedsCode
        } else {
            Step::Granted
        })
    }

    fn check_code(&self, code: &str) -> bool {
        let Some(totp) = &self.totp else {
            return false;
        };
        match totp.check_current(code.trim()) {
            Ok(valid) => valid,
            Err(e) => {
                tracing::warn!("System clock error while checking code: {}", e);
                false
            }
        }
    }

    fn auth_cookie(&self) -> Cookie<'static> {
        Cookie::build((AUTH_COOKIE, self.cookie_token.clone()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .permanent()
            .build()
    }

    fn pending_cookie(&self) -> Cookie<'static> {
        Cookie::build((PENDING_COOKIE, self.pending_token.clone()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .build()
    }
}

fn is_open_path(path: &str) -> bool {
    path == "/login" || path == "/verify" || path.starts_with("/auth/callback")
}

pub async fn require_login(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let Some(gate) = &state.login else {
        return next.run(request).await;
    };
    if is_open_path(request.uri().path()) || gate.accepts(&jar) {
        return next.run(request).await;
    }
    Redirect::to("/login").into_response()
}

#[derive(Debug, Deserialize)]
pub struct ErrorQuery {
    #[serde(default)]
    error: String,
}

fn error_html(error: &str) -> String {
    if error.is_empty() {
        String::new()
    } else {
        format!(r#"<p class="error">{}</p>"#, escape_html(error))
    }
}

fn gate_page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html><head>
<meta charset="utf-8"><meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} - Flickr Curate</title>
<style>
    body {{ font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif;
           background: #2b2b2b; color: #e0e0e0; display: flex; justify-content: center;
           align-items: center; min-height: 100vh; margin: 0; }}
    .login-box {{ background: #3c3c3c; border-radius: 8px; padding: 32px; width: 320px; }}
    input {{ width: 100%; box-sizing: border-box; padding: 8px; margin: 6px 0 14px;
            background: #2b2b2b; color: #e0e0e0; border: 1px solid #555; border-radius: 4px; }}
    input.code {{ font-size: 20px; text-align: center; letter-spacing: 6px; }}
    button {{ width: 100%; padding: 10px; background: #0063dc; color: white; border: 0;
             border-radius: 4px; cursor: pointer; }}
    .error {{ color: #ff6b6b; }}
    .info {{ font-size: 13px; color: #aaa; }}
    .secret {{ font-family: monospace; letter-spacing: 2px; word-break: break-all; }}
    a {{ color: #6a9eda; }}
</style>
</head><body>
<div class="login-box">
{body}
</div>
</body></html>"#
    ))
}

pub async fn login_page(Query(query): Query<ErrorQuery>) -> Html<String> {
    gate_page(
        "Login",
        &format!(
            r#"    <h2>Flickr Curate</h2>
    {}
    <form method="post" action="/login">
        <label>Username<input name="username" autocomplete="username"></label>
        <label>Password<input name="password" type="password" autocomplete="current-password"></label>
        <button type="submit">Log in</button>
    </form>"#,
            error_html(&query.error)
        ),
    )
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    username: String,
    password: String,
}

pub async fn login_submit(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let Some(gate) = &state.login else {
        return Redirect::to("/").into_response();
    };
    match gate.check(&form.username, &form.password) {
        None => {
            tracing::warn!("Failed login attempt for '{}'", form.username);
            Redirect::to("/login?error=Invalid+username+or+password").into_response()
        }
        Some(Step::NeedsCode) => {
            (jar.add(gate.pending_cookie()), Redirect::to("/verify")).into_response()
        }
        Some(Step::Granted) => (jar.add(gate.auth_cookie()), Redirect::to("/")).into_response(),
    }
}

pub async fn verify_page(
    State(state): State<AppState>,
    Query(query): Query<ErrorQuery>,
) -> Response {
    if !state.login.as_ref().is_some_and(|g| g.has_totp()) {
        return Redirect::to("/login").into_response();
    }
    gate_page(
        "Verify",
        &format!(
            r#"    <h2>Verification Code</h2>
    <p class="info">Enter the 6-digit code from your authenticator app.</p>
    {}
    <form method="post" action="/verify">
        <input class="code" name="code" required maxlength="6" pattern="[0-9]{{6}}"
               inputmode="numeric" autocomplete="one-time-code" placeholder="------">
        <button type="submit">Verify</button>
    </form>
    <p class="info"><a href="/login">Back to login</a></p>"#,
            error_html(&query.error)
        ),
    )
    .into_response()
}

#[derive(Debug, Deserialize)]
pub struct VerifyForm {
    code: String,
}

pub async fn verify_submit(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<VerifyForm>,
) -> Response {
    let Some(gate) = state.login.as_deref().filter(|g| g.has_totp()) else {
        return Redirect::to("/login").into_response();
    };
    if !gate.is_pending(&jar) {
        return Redirect::to("/login").into_response();
    }
    if !gate.check_code(&form.code) {
        tracing::warn!("Invalid authenticator code");
        return Redirect::to("/verify?error=Invalid+code.+Please+try+again").into_response();
    }
    let jar = jar
        .remove(Cookie::build(PENDING_COOKIE).path("/"))
        .add(gate.auth_cookie());
    (jar, Redirect::to("/")).into_response()
}

/// Provisioning page for authenticator apps. Sits behind the gate.
pub async fn setup_2fa(State(state): State<AppState>) -> Response {
    let Some(totp) = state.login.as_deref().and_then(|g| g.totp.as_ref()) else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html("<p>TOTP_SECRET not configured.</p>".to_string()),
        )
            .into_response();
    };
    let qr = match totp.get_qr_base64() {
        Ok(png) => format!(r#"<p><img alt="QR code" width="200" height="200" src="data:image/png;base64,{png}"></p>"#),
        Err(e) => {
            tracing::warn!("Cannot render QR code: {}", e);
            String::new()
        }
    };
    gate_page(
        "Setup 2FA",
        &format!(
            r#"    <h2>Setup Two-Factor Authentication</h2>
    <p class="info">Scan this QR code with your authenticator app:</p>
    {qr}
    <p class="info">Or enter this key manually:</p>
    <p class="secret">{}</p>
    <p class="info">{}</p>
    <p class="info"><a href="/">Back to app</a></p>"#,
            escape_html(&totp.get_secret_base32()),
            escape_html(&totp.get_url()),
        ),
    )
    .into_response()
}
