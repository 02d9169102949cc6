use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::cli::{GlobalArgs, RunArgs};
use crate::flickr::oauth::ConsumerKey;
use crate::retry::RetryConfig;
use crate::sync::{AlbumTarget, SyncRequest};
use crate::types::LogLevel;

pub const DEFAULT_TITLE: &str = "Top 1000 Most Interesting";
pub const DEFAULT_DESCRIPTION: &str = "Auto-generated set of my most interesting photos.";
pub const DEFAULT_COUNT: u32 = 1000;

const SETTINGS_FILE: &str = "settings.json";

/// Process-wide configuration shared by every subcommand.
#[derive(Debug)]
pub struct Config {
    pub config_dir: PathBuf,
    pub consumer: Option<ConsumerKey>,
    pub log_level: LogLevel,
}

pub(crate) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_cli(global: &GlobalArgs) -> Self {
        let consumer = match (
            non_blank(global.api_key.clone()),
            non_blank(global.api_secret.clone()),
        ) {
            (Some(key), Some(secret)) => Some(ConsumerKey { key, secret }),
            _ => None,
        };
        Self {
            config_dir: expand_tilde(&global.config_dir),
            consumer,
            log_level: global.log_level,
        }
    }

    pub fn require_consumer(&self) -> Result<&ConsumerKey> {
        self.consumer.as_ref().context(
            "FLICKR_API_KEY and FLICKR_API_SECRET must be set (flags, environment or .env file)",
        )
    }

    pub fn settings_path(&self) -> PathBuf {
        self.config_dir.join(SETTINGS_FILE)
    }
}

/// User defaults persisted between runs. Every field is optional so partial
/// files written by older versions or by hand still load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photoset_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dark_mode: Option<bool>,
}

impl Settings {
    /// Missing or malformed files yield empty settings.
    pub async fn load(path: &Path) -> Self {
        let contents = match fs::read_to_string(path).await {
            Ok(c) => c,
            Err(_) => {
                tracing::debug!("No settings file at {}", path.display());
                return Self::default();
            }
        };
        serde_json::from_str(&contents).unwrap_or_else(|e| {
            tracing::warn!("Settings file {} is malformed, ignoring: {}", path.display(), e);
            Self::default()
        })
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write settings to {}", path.display()))?;
        tracing::debug!("Saved settings to {}", path.display());
        Ok(())
    }
}

/// Fully resolved parameters of one `run`: command line, then saved settings,
/// then built-in defaults.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub title: String,
    pub description: String,
    pub count: u32,
    pub target: AlbumTarget,
    pub dry_run: bool,
    pub retry: RetryConfig,
    pub watch_with_interval: Option<u64>,
}

impl RunConfig {
    pub fn resolve(args: &RunArgs, settings: &Settings) -> Self {
        let title = non_blank(args.title.clone())
            .or_else(|| non_blank(settings.title.clone()))
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());
        let description = args
            .description
            .clone()
            .or_else(|| settings.description.clone())
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());
        let count = args
            .count
            .or(settings.count.filter(|c| *c > 0))
            .unwrap_or(DEFAULT_COUNT);
        // An explicit id on the command line overrides a saved album name.
        let target = if args.photoset_id.is_some() || args.photoset_name.is_some() {
            AlbumTarget::from_inputs(args.photoset_id.as_deref(), args.photoset_name.as_deref())
        } else {
            AlbumTarget::from_inputs(None, settings.photoset_name.as_deref())
        };

        Self {
            title,
            description,
            count,
            target,
            dry_run: args.dry_run,
            retry: RetryConfig {
                max_attempts: args.max_attempts,
                base_delay_secs: args.retry_delay,
            },
            watch_with_interval: args.watch_with_interval,
        }
    }

    pub fn request(&self, user_id: &str) -> SyncRequest {
        SyncRequest {
            user_id: user_id.to_string(),
            title: self.title.clone(),
            description: self.description.clone(),
            count: self.count,
            target: self.target.clone(),
            dry_run: self.dry_run,
        }
    }

    /// Settings reflecting this run, keeping fields a run does not set.
    pub fn to_settings(&self, previous: &Settings) -> Settings {
        Settings {
            title: Some(self.title.clone()),
            description: Some(self.description.clone()),
            count: Some(self.count),
            photoset_name: match &self.target {
                AlbumTarget::ByName(name) => Some(name.clone()),
                _ => None,
            },
            dark_mode: previous.dark_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join("flickr-curate-tests")
            .join(format!("{name}-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn global(key: Option<&str>, secret: Option<&str>) -> GlobalArgs {
        GlobalArgs {
            api_key: key.map(String::from),
            api_secret: secret.map(String::from),
            config_dir: "~/.flickr-curate".into(),
            log_level: LogLevel::Info,
        }
    }

    fn run_args() -> RunArgs {
        RunArgs {
            max_attempts: 3,
            retry_delay: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_expand_tilde_with_home() {
        let result = expand_tilde("~/Documents");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(result, home.join("Documents"));
        }
    }

    #[test]
    fn test_expand_tilde_no_prefix() {
        assert_eq!(
            expand_tilde("/absolute/path"),
            PathBuf::from("/absolute/path")
        );
        assert_eq!(
            expand_tilde("relative/path"),
            PathBuf::from("relative/path")
        );
    }

    #[test]
    fn test_consumer_requires_both_parts() {
        assert!(Config::from_cli(&global(Some("k"), Some("s"))).consumer.is_some());
        assert!(Config::from_cli(&global(Some("k"), None)).consumer.is_none());
        assert!(Config::from_cli(&global(Some("k"), Some("  "))).consumer.is_none());
        assert!(Config::from_cli(&global(None, None))
            .require_consumer()
            .is_err());
    }

    #[test]
    fn test_config_debug_redacts_secret() {
        let cfg = Config::from_cli(&global(Some("key123"), Some("hunter2")));
        let dbg = format!("{cfg:?}");
        assert!(dbg.contains("key123"));
        assert!(!dbg.contains("hunter2"));
    }

    #[test]
    fn test_run_config_builtin_defaults() {
        let run = RunConfig::resolve(&run_args(), &Settings::default());
        assert_eq!(run.title, DEFAULT_TITLE);
        assert_eq!(run.description, DEFAULT_DESCRIPTION);
        assert_eq!(run.count, DEFAULT_COUNT);
        assert_eq!(run.target, AlbumTarget::New);
    }

    #[test]
    fn test_run_config_settings_then_cli() {
        let settings = Settings {
            title: Some("Saved".into()),
            count: Some(200),
            photoset_name: Some("Saved album".into()),
            ..Default::default()
        };
        let run = RunConfig::resolve(&run_args(), &settings);
        assert_eq!(run.title, "Saved");
        assert_eq!(run.count, 200);
        assert_eq!(run.target, AlbumTarget::ByName("Saved album".into()));

        let args = RunArgs {
            title: Some("Flag".into()),
            count: Some(5),
            photoset_id: Some("77".into()),
            ..run_args()
        };
        let run = RunConfig::resolve(&args, &settings);
        assert_eq!(run.title, "Flag");
        assert_eq!(run.count, 5);
        assert_eq!(run.target, AlbumTarget::ById("77".into()));
    }

    #[test]
    fn test_to_settings_keeps_dark_mode() {
        let previous = Settings {
            dark_mode: Some(true),
            ..Default::default()
        };
        let run = RunConfig::resolve(&run_args(), &previous);
        let saved = run.to_settings(&previous);
        assert_eq!(saved.dark_mode, Some(true));
        assert_eq!(saved.title.as_deref(), Some(DEFAULT_TITLE));
        assert_eq!(saved.photoset_name, None);
    }

    #[tokio::test]
    async fn test_settings_save_then_load() {
        let path = temp_dir("settings").join("nested").join(SETTINGS_FILE);
        let settings = Settings {
            title: Some("T".into()),
            count: Some(10),
            dark_mode: Some(false),
            ..Default::default()
        };
        settings.save(&path).await.unwrap();
        assert_eq!(Settings::load(&path).await, settings);
    }

    #[tokio::test]
    async fn test_settings_missing_or_malformed() {
        let dir = temp_dir("settings-bad");
        assert_eq!(Settings::load(&dir.join("absent.json")).await, Settings::default());
        let path = dir.join(SETTINGS_FILE);
        std::fs::write(&path, "[1, 2").unwrap();
        assert_eq!(Settings::load(&path).await, Settings::default());
    }

    #[test]
    fn test_settings_partial_json() {
        let settings: Settings = serde_json::from_str(r#"{"count": 50}"#).unwrap();
        assert_eq!(settings.count, Some(50));
        assert_eq!(settings.title, None);
    }
}
