use std::convert::Infallible;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::header::HOST;
use axum::http::HeaderMap;
use axum::response::sse::{Event, Sse};
use axum::response::{Html, IntoResponse, Redirect};
use axum::Json;
use futures_util::stream::{self, Stream};
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;

use super::log_buffer::{Next, Subscription};
use super::{AppState, WebError};
use crate::auth::endpoints::Endpoints;
use crate::auth::error::AuthError;
use crate::auth::{auth_http_client, flow};
use crate::config::{Settings, DEFAULT_COUNT, DEFAULT_DESCRIPTION, DEFAULT_TITLE};
use crate::report::{is_terminal, ChannelReporter, Reporter, ERROR_MARKER};
use crate::sync::{run_reported, AlbumTarget, SyncRequest};

/// Quiet period after which the stream sends a ping event.
const STREAM_IDLE: Duration = Duration::from_secs(25);

const INDEX_HTML: &str = include_str!("index.html");

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    authenticated: bool,
    user_nsid: Option<String>,
    job_running: bool,
    last_run: Option<String>,
}

pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let session = state.session().await;
    Json(StatusResponse {
        authenticated: session.is_some(),
        user_nsid: session.map(|s| s.user_nsid),
        job_running: state.job.is_running(),
        last_run: state.job.last_run(),
    })
}

pub async fn get_settings(State(state): State<AppState>) -> Json<Settings> {
    Json(Settings::load(&state.settings_path).await)
}

pub async fn save_settings(
    State(state): State<AppState>,
    Json(settings): Json<Settings>,
) -> Result<Json<serde_json::Value>, WebError> {
    settings.save(&state.settings_path).await?;
    Ok(Json(json!({ "status": "saved" })))
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

fn default_description() -> String {
    DEFAULT_DESCRIPTION.to_string()
}

fn default_count() -> u32 {
    DEFAULT_COUNT
}

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    #[serde(default = "default_title")]
    title: String,
    #[serde(default = "default_description")]
    description: String,
    #[serde(default = "default_count")]
    count: u32,
    #[serde(default)]
    photoset_name: Option<String>,
    #[serde(default)]
    dry_run: bool,
}

pub async fn run(
    State(state): State<AppState>,
    Json(req): Json<RunRequest>,
) -> Result<Json<serde_json::Value>, WebError> {
    let session = state.session().await.ok_or(WebError::NotAuthenticated)?;
    if req.count == 0 {
        return Err(WebError::InvalidRequest("count must be at least 1".into()));
    }
    let guard = state.job.try_start().ok_or(WebError::JobRunning)?;

    let request = SyncRequest {
        user_id: session.user_nsid.clone(),
        title: req.title,
        description: req.description,
        count: req.count,
        target: AlbumTarget::from_inputs(None, req.photoset_name.as_deref()),
        dry_run: req.dry_run,
    };
    let options = state.sync_options.clone();
    let buffer = state.replace_log();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    state.tracker.spawn(async move {
        while let Some(line) = rx.recv().await {
            buffer.push(line);
        }
    });

    state.tracker.spawn(async move {
        let _guard = guard;
        let reporter = ChannelReporter::new(tx);
        let work = async {
            reporter.emit(if request.dry_run {
                "Starting dry run..."
            } else {
                "Starting operation..."
            });
            reporter.emit(&format!("Authenticated as user: {}", request.user_id));
            run_reported(session.api.as_ref(), &request, &options, &reporter).await;
        };
        if AssertUnwindSafe(work).catch_unwind().await.is_err() {
            tracing::error!("Run worker panicked");
            reporter.emit("");
            reporter.emit("Error: internal failure");
            reporter.emit(ERROR_MARKER);
        }
    });

    Ok(Json(json!({ "status": "started" })))
}

enum StreamState {
    Open(Subscription),
    Closed,
}

pub async fn stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let buffer = state.current_log();
    tracing::debug!(replay = buffer.len(), "Stream subscriber connected");
    let shutdown = state.shutdown.clone();

    let events = stream::unfold(StreamState::Open(buffer.subscribe()), move |st| {
        let shutdown = shutdown.clone();
        async move {
            let StreamState::Open(mut sub) = st else {
                return None;
            };
            let next = tokio::select! {
                _ = shutdown.cancelled() => return None,
                next = sub.next(STREAM_IDLE) => next,
            };
            match next {
                Next::Line(line) => {
                    let state = if is_terminal(&line) {
                        StreamState::Closed
                    } else {
                        StreamState::Open(sub)
                    };
                    Some((Ok(Event::default().event("log").data(line)), state))
                }
                Next::Idle => Some((
                    Ok(Event::default().event("ping").data("keepalive")),
                    StreamState::Open(sub),
                )),
            }
        }
    });

    Sse::new(events)
}

fn base_url(headers: &HeaderMap) -> String {
    let host = headers
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("127.0.0.1:8000");
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("http");
    format!("{scheme}://{host}")
}

pub async fn auth_start(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Redirect, WebError> {
    let consumer = state
        .consumer
        .as_ref()
        .ok_or(WebError::MissingCredentials)?;
    let endpoints = Endpoints::flickr();
    let callback = format!("{}/auth/callback", base_url(&headers));

    let http = auth_http_client()?;
    let request = flow::request_token(&http, &endpoints, consumer, &callback).await?;
    let authorize = endpoints.authorize_url(&request.token, "write");
    state.set_pending_auth(request);
    Ok(Redirect::to(&authorize))
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    oauth_token: String,
    #[serde(default)]
    oauth_verifier: String,
}

pub async fn auth_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<impl IntoResponse, WebError> {
    let request = state.take_pending_auth().ok_or(AuthError::NoPendingFlow)?;
    if params.oauth_verifier.is_empty() {
        return Err(AuthError::Verification("missing verifier".into()).into());
    }
    if !params.oauth_token.is_empty() && params.oauth_token != request.token {
        return Err(AuthError::Verification("token mismatch".into()).into());
    }
    let consumer = state
        .consumer
        .as_ref()
        .ok_or(WebError::MissingCredentials)?;

    let http = auth_http_client()?;
    let token = flow::access_token(
        &http,
        &Endpoints::flickr(),
        consumer,
        &request,
        &params.oauth_verifier,
    )
    .await?;
    if let Err(e) = state.token_store.save(&token).await {
        tracing::warn!("Could not cache access token: {:#}", e);
    }
    let session = state.session_for(&token)?;
    state.install_session(session).await;
    Ok(Redirect::to("/"))
}
