use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::responses::AccessToken;

const TOKEN_FILE: &str = "oauth-token.json";

/// On-disk cache of the access token, so `auth` only has to run once.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(config_dir: &Path) -> Self {
        Self {
            path: config_dir.join(TOKEN_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the cached token. A missing or unreadable cache is not an error.
    pub async fn load(&self) -> Option<AccessToken> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No token cache at {}", self.path.display());
                return None;
            }
            Err(e) => {
                tracing::warn!("Failed to read token cache {}: {}", self.path.display(), e);
                return None;
            }
        };
        match serde_json::from_str(&contents) {
            Ok(token) => {
                tracing::debug!("Loaded token cache from {}", self.path.display());
                Some(token)
            }
            Err(e) => {
                tracing::warn!("Token cache corrupt, ignoring: {}", e);
                None
            }
        }
    }

    pub async fn save(&self, token: &AccessToken) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        }
        let json = serde_json::to_string_pretty(token)?;
        let mut file = open_owner_only(&self.path)
            .await
            .with_context(|| format!("Failed to open token cache {}", self.path.display()))?;
        file.write_all(json.as_bytes())
            .await
            .with_context(|| format!("Failed to write token cache to {}", self.path.display()))?;
        file.flush().await?;
        tracing::debug!("Saved token cache to {}", self.path.display());
        Ok(())
    }
}

/// Open for writing with mode 0600, so the token secret is never readable by
/// others, not even between create and write.
async fn open_owner_only(path: &Path) -> std::io::Result<fs::File> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);
    let file = options.open(path).await?;
    #[cfg(unix)]
    {
        // mode() only applies on create; tighten a file left by an older run
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))
            .await?;
    }
    Ok(file)
}
