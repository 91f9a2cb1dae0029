//! CLI configuration: `~/.config/chunkup/config.json`.

use std::path::{Path, PathBuf};

use chunkup_protocol::constants::DEFAULT_CHUNK_SIZE_MB;
use chunkup_upload::UploadSettings;
use serde::{Deserialize, Serialize};

/// Environment variable overriding the stored app password.
pub const PASSWORD_ENV: &str = "CHUNKUP_APP_PASSWORD";

/// Server account and engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CliConfig {
    /// Server base URL, e.g. `https://cloud.example.com`.
    pub url_base: String,
    /// Login name.
    pub user: String,
    /// DAV user id; defaults to `user`.
    pub user_id: String,
    pub app_password: String,
    /// Local session directories; defaults under the config dir.
    pub storage_dir: String,
    /// Session store file; defaults under the config dir.
    pub store_path: String,
    pub chunk_size_mb: u64,
    pub remove_originals: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            url_base: String::new(),
            user: String::new(),
            user_id: String::new(),
            app_password: String::new(),
            storage_dir: String::new(),
            store_path: String::new(),
            chunk_size_mb: DEFAULT_CHUNK_SIZE_MB,
            remove_originals: false,
        }
    }
}

impl CliConfig {
    /// Loads the config file, falling back to defaults when it is missing
    /// or unreadable.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        match serde_json::from_str::<CliConfig>(&content) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config, using defaults"
                );
                Ok(Self::default())
            }
        }
    }

    /// Writes the config as pretty JSON, readable only by the owner.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, &json)?;
        set_permissions_0600(path);
        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Fails unless the server account is configured.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.url_base.is_empty() || self.user.is_empty() {
            anyhow::bail!("server account not configured; run `chunkup init` first");
        }
        Ok(())
    }

    /// Account key: `"<user> <urlBase>"`.
    pub fn account(&self) -> String {
        format!("{} {}", self.user, self.url_base.trim_end_matches('/'))
    }

    pub fn user_id(&self) -> &str {
        if self.user_id.is_empty() {
            &self.user
        } else {
            &self.user_id
        }
    }

    /// App password from the environment, else from the file.
    pub fn password(&self) -> String {
        std::env::var(PASSWORD_ENV).unwrap_or_else(|_| self.app_password.clone())
    }

    pub fn upload_settings(&self) -> UploadSettings {
        UploadSettings {
            remove_originals: self.remove_originals,
            ..UploadSettings::with_chunk_size_mb(self.chunk_size_mb)
        }
    }

    pub fn storage_dir(&self) -> anyhow::Result<PathBuf> {
        if self.storage_dir.is_empty() {
            Ok(config_base_dir()?.join("chunkup").join("uploads"))
        } else {
            Ok(PathBuf::from(&self.storage_dir))
        }
    }

    pub fn store_path(&self) -> anyhow::Result<PathBuf> {
        if self.store_path.is_empty() {
            Ok(config_base_dir()?.join("chunkup").join("sessions.json"))
        } else {
            Ok(PathBuf::from(&self.store_path))
        }
    }
}

/// Default config file location.
pub fn default_config_path() -> anyhow::Result<PathBuf> {
    Ok(config_base_dir()?.join("chunkup").join("config.json"))
}

fn set_permissions_0600(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600));
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
}

fn config_base_dir() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home).join(".config"))
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata))
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home).join("Library").join("Application Support"))
    }
}
