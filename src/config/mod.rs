//! Configuration management using the prefer crate for file discovery.

pub mod browser;
mod capture;
mod settings;
mod site;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use browser::BrowserEngineConfig;
pub use capture::{CaptureOptions, CaptureOverrides};
pub use settings::{Settings, DEFAULT_ARCHIVE_DIR, DEFAULT_DATABASE_FILENAME};
pub use site::{Credentials, SiteProfile, DEFAULT_ORIGIN};

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Archive root directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_dir: Option<String>,
    /// Database file. Relative paths are resolved against the config file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// Forum username. `FORUM_USERNAME` takes priority.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Forum password. `FORUM_PASSWORD` takes priority.
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<SiteProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<BrowserEngineConfig>,
    /// Default capture timings.
    #[serde(default)]
    pub capture: CaptureOverrides,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
    /// Archive directory (`--archive-dir`), overrides config and env.
    pub archive_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Automatically discovers threadvault config files in standard locations.
    pub async fn load() -> Self {
        match prefer::load("threadvault").await {
            Ok(pref_config) => {
                if let Some(path) = pref_config.source_path() {
                    match Self::load_from_path(path).await {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::warn!("Ignoring config file: {}", e);
                            Self::default()
                        }
                    }
                } else {
                    Self::default()
                }
            }
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        let mut config = Self::parse(&contents, ext)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    fn parse(contents: &str, ext: &str) -> Result<Self, String> {
        match ext {
            "toml" => toml::from_str(contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e)),
            "yaml" | "yml" => serde_yaml::from_str(contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e)),
            _ => serde_json::from_str(contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e)),
        }
    }

    /// Get the base directory for resolving relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are resolved against `base_dir`
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref archive_dir) = self.archive_dir {
            settings.archive_dir = self.resolve_path(archive_dir, base_dir);
            settings.database_path = settings.archive_dir.join(DEFAULT_DATABASE_FILENAME);
        }
        if let Some(ref database) = self.database {
            settings.database_path = self.resolve_path(database, base_dir);
        }
        if let Some(ref site) = self.site {
            settings.site = site.clone();
        }
        if let Some(ref browser) = self.browser {
            settings.browser = browser.clone();
            settings.capture.headless = browser.headless;
        }
        settings.capture = self.capture.resolve(&settings.capture);
        if let (Some(user), Some(pass)) = (&self.username, &self.password) {
            settings.credentials = Credentials::new(user.clone(), pass.clone());
        }
    }
}

/// Apply environment overrides on top of file configuration.
///
/// - `ARCHIVE_DIR` - archive root
/// - `DB_PATH` - database file
/// - `FORUM_USERNAME` / `FORUM_PASSWORD` - forum account
fn apply_env_overrides(settings: &mut Settings) {
    if let Ok(dir) = std::env::var("ARCHIVE_DIR") {
        if !dir.is_empty() {
            let dir = PathBuf::from(shellexpand::tilde(&dir).as_ref());
            settings.database_path = dir.join(DEFAULT_DATABASE_FILENAME);
            settings.archive_dir = dir;
        }
    }
    if let Ok(db) = std::env::var("DB_PATH") {
        if !db.is_empty() {
            settings.database_path = PathBuf::from(shellexpand::tilde(&db).as_ref());
        }
    }
    if let Some(credentials) = Credentials::from_env() {
        settings.credentials = Some(credentials);
    }
    settings.browser = settings.browser.clone().with_env_overrides();
}

/// Load settings: config file, then environment, then explicit options.
pub async fn load_settings(options: &LoadOptions) -> Settings {
    let config = match options.config_path {
        Some(ref path) => match Config::load_from_path(path).await {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{}", e);
                Config::default()
            }
        },
        None => Config::load().await,
    };

    let base_dir = config
        .base_dir()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings, &base_dir);
    apply_env_overrides(&mut settings);

    if let Some(ref dir) = options.archive_dir {
        settings.database_path = dir.join(DEFAULT_DATABASE_FILENAME);
        settings.archive_dir = dir.clone();
    }

    if let Some(ref path) = config.source_path {
        tracing::debug!("Loaded config from {}", path.display());
    }

    settings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_relative_paths_against_base_dir() {
        let config = Config::parse(
            "archive_dir = \"vault\"\ndatabase = \"db/records.db\"",
            "toml",
        )
        .unwrap();
        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings, Path::new("/srv/app"));
        assert_eq!(settings.archive_dir, PathBuf::from("/srv/app/vault"));
        assert_eq!(
            settings.database_path,
            PathBuf::from("/srv/app/db/records.db")
        );
    }

    #[test]
    fn test_archive_dir_moves_default_database() {
        let config = Config::parse(r#"{"archive_dir": "/var/vault"}"#, "json").unwrap();
        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings, Path::new("/ignored"));
        assert_eq!(
            settings.database_path,
            PathBuf::from("/var/vault/threadvault.db")
        );
    }

    #[test]
    fn test_capture_defaults_from_yaml() {
        let config = Config::parse("capture:\n  item_delay: 4\n", "yaml").unwrap();
        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings, Path::new("."));
        assert_eq!(settings.capture.item_delay, 4);
        assert_eq!(settings.capture.element_timeout, 10);
    }

    #[test]
    fn test_browser_headless_feeds_capture_default() {
        let config = Config::parse("[browser]\nheadless = false\n", "toml").unwrap();
        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings, Path::new("."));
        assert!(!settings.browser.headless);
        assert!(!settings.capture.headless);
    }

    #[test]
    fn test_credentials_need_both_fields() {
        let config = Config::parse(r#"{"username": "alice"}"#, "json").unwrap();
        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings, Path::new("."));
        assert!(settings.credentials.is_none());
    }

    #[test]
    fn test_password_is_never_serialized() {
        let config = Config {
            username: Some("alice".to_string()),
            password: Some("secret".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("alice"));
        assert!(!json.contains("secret"));
    }

    #[tokio::test]
    async fn test_load_from_path_records_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("threadvault.toml");
        std::fs::write(&path, "archive_dir = \"out\"").unwrap();

        let config = Config::load_from_path(&path).await.unwrap();
        assert_eq!(config.source_path.as_deref(), Some(path.as_path()));
        assert_eq!(config.base_dir().as_deref(), Some(dir.path()));
    }
}
