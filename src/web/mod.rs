//! Browser front-end: start runs, watch their progress live.

mod error;
mod handlers;
pub mod job;
pub mod log_buffer;
mod login;

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::auth::responses::RequestToken;
use crate::auth::store::TokenStore;
use crate::auth::{self as flickr_auth, AccessToken};
use crate::config::Config;
use crate::flickr::oauth::ConsumerKey;
use crate::flickr::FlickrApi;
use crate::sync::SyncOptions;

pub use self::error::WebError;
use self::job::JobSlot;
use self::log_buffer::LogBuffer;
use self::login::LoginGate;

/// Ids listed by a dry run before the rest is summarized.
const DRY_RUN_PREVIEW: usize = 20;
/// Best-effort wait for an in-flight run on shutdown.
const WORKER_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// The authorized account the server acts for.
#[derive(Clone)]
pub struct Session {
    pub api: Arc<dyn FlickrApi>,
    pub user_nsid: String,
}

#[derive(Clone)]
pub struct AppState {
    consumer: Option<ConsumerKey>,
    session: Arc<RwLock<Option<Session>>>,
    pending_auth: Arc<Mutex<Option<RequestToken>>>,
    job: Arc<JobSlot>,
    log: Arc<Mutex<Arc<LogBuffer>>>,
    settings_path: PathBuf,
    token_store: TokenStore,
    login: Option<Arc<LoginGate>>,
    sync_options: SyncOptions,
    tracker: TaskTracker,
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: &Config, login: Option<LoginGate>, shutdown: CancellationToken) -> Self {
        Self {
            consumer: config.consumer.clone(),
            session: Arc::new(RwLock::new(None)),
            pending_auth: Arc::new(Mutex::new(None)),
            job: Arc::new(JobSlot::default()),
            log: Arc::new(Mutex::new(Arc::new(LogBuffer::default()))),
            settings_path: config.settings_path(),
            token_store: TokenStore::new(&config.config_dir),
            login: login.map(Arc::new),
            sync_options: SyncOptions {
                dry_run_preview: Some(DRY_RUN_PREVIEW),
                ..Default::default()
            },
            tracker: TaskTracker::new(),
            shutdown,
        }
    }

    pub async fn install_session(&self, session: Session) {
        tracing::info!(user_nsid = %session.user_nsid, "Authenticated");
        *self.session.write().await = Some(session);
    }

    async fn session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    fn session_for(&self, token: &AccessToken) -> Result<Session> {
        let consumer = self
            .consumer
            .as_ref()
            .context("FLICKR_API_KEY and FLICKR_API_SECRET must be set")?;
        Ok(Session {
            api: Arc::new(flickr_auth::client_for(consumer, token)?),
            user_nsid: token.user_nsid.clone(),
        })
    }

    fn current_log(&self) -> Arc<LogBuffer> {
        Arc::clone(&self.log.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn replace_log(&self) -> Arc<LogBuffer> {
        let fresh = Arc::new(LogBuffer::default());
        *self.log.lock().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&fresh);
        fresh
    }

    fn take_pending_auth(&self) -> Option<RequestToken> {
        self.pending_auth
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn set_pending_auth(&self, request: RequestToken) {
        *self
            .pending_auth
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(request);
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/status", get(handlers::status))
        .route(
            "/settings",
            get(handlers::get_settings).post(handlers::save_settings),
        )
        .route("/run", post(handlers::run))
        .route("/stream", get(handlers::stream))
        .route("/auth/start", get(handlers::auth_start))
        .route("/auth/callback", get(handlers::auth_callback))
        .route("/login", get(login::login_page).post(login::login_submit))
        .route("/verify", get(login::verify_page).post(login::verify_submit))
        .route("/setup-2fa", get(login::setup_2fa))
        .layer(from_fn_with_state(state.clone(), login::require_login))
        .with_state(state)
}

pub async fn serve(config: &Config, bind: &str, shutdown: CancellationToken) -> Result<()> {
    let login = LoginGate::from_env()?;
    if let Some(gate) = &login {
        tracing::info!(totp = gate.has_totp(), "Password protection enabled");
    }
    let state = AppState::new(config, login, shutdown.clone());

    match flickr_auth::resolve_access_token(&state.token_store).await {
        Some((token, source)) => {
            tracing::debug!(?source, "Found access token");
            match state.session_for(&token) {
                Ok(session) => state.install_session(session).await,
                Err(e) => tracing::warn!("Cannot use access token: {:#}", e),
            }
        }
        None => tracing::info!("Not authenticated yet, visit /auth/start"),
    }

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state.clone()))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .context("Server error")?;

    state.tracker.close();
    if tokio::time::timeout(WORKER_JOIN_TIMEOUT, state.tracker.wait())
        .await
        .is_err()
    {
        tracing::warn!(
            "Run still in progress after {}s, exiting anyway",
            WORKER_JOIN_TIMEOUT.as_secs()
        );
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::types::LogLevel;

    pub(crate) fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join("flickr-curate-tests")
            .join(format!("{name}-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    pub(crate) fn state(login: Option<LoginGate>) -> AppState {
        let config = Config {
            config_dir: temp_dir("web"),
            consumer: None,
            log_level: LogLevel::Info,
        };
        let mut state = AppState::new(&config, login, CancellationToken::new());
        state.sync_options.write.item_pause = Duration::ZERO;
        state
    }
}
