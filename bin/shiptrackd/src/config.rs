use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Server configuration, loaded from a TOML file.
///
/// ```toml
/// listen = "0.0.0.0:8080"
///
/// [storage]
/// data_dir = "/var/lib/shiptrack"
///
/// [auth]
/// admin_token = "..."
///
/// [notify]
/// admin_emails = ["it@example.com"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,

    pub storage: StorageConfig,

    pub auth: AuthConfig,

    #[serde(default)]
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Bearer token for the administrative dashboard routes.
    pub admin_token: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotifyConfig {
    /// Administrator addresses included in every lifecycle notification.
    #[serde(default)]
    pub admin_emails: Vec<String>,
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

impl ServerConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read config {}: {}", path.display(), e))?;
        let config: ServerConfig = toml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("invalid config {}: {}", path.display(), e))?;
        Ok(config)
    }

    /// Resolve a context name to `/etc/shiptrack/<name>.toml`.
    /// A value containing `/` or `.` is treated as a path directly.
    pub fn resolve_path(name_or_path: &str) -> PathBuf {
        if name_or_path.contains('/') || name_or_path.contains('.') {
            PathBuf::from(name_or_path)
        } else {
            PathBuf::from(format!("/etc/shiptrack/{}.toml", name_or_path))
        }
    }

    /// Refuse to start with an unusable configuration.
    pub fn verify(&self) -> anyhow::Result<()> {
        if self.auth.admin_token.is_empty() {
            anyhow::bail!("auth.admin_token is empty in configuration");
        }
        if self.storage.data_dir.is_empty() {
            anyhow::bail!("storage.data_dir is empty in configuration");
        }
        Ok(())
    }
}
