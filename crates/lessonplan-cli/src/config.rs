//! Configuration file management for lessonplan.
//!
//! Provides a TOML-based config file at `~/.config/lessonplan/config.toml`
//! and a resolution chain: CLI flag > env var > config file > default. The
//! same file is the credential store: the API key lives under
//! `credential.gemini_api_key`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use lessonplan_core::gateway::gemini::DEFAULT_BASE_URL;
use lessonplan_core::gateway::{DEFAULT_TEMPERATURE, ModelTier};

pub const API_KEY_ENV: &str = "LESSONPLAN_API_KEY";
pub const MODEL_ENV: &str = "LESSONPLAN_MODEL";
pub const ENDPOINT_ENV: &str = "LESSONPLAN_GEMINI_ENDPOINT";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<CredentialSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<GenerationSection>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CredentialSection {
    pub gemini_api_key: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GenerationSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelTier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// API root, e.g. a proxy in front of the Gemini endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl ConfigFile {
    /// The stored key, if any and non-blank.
    pub fn api_key(&self) -> Option<&str> {
        self.credential
            .as_ref()
            .map(|c| c.gemini_api_key.trim())
            .filter(|k| !k.is_empty())
    }

    pub fn set_api_key(&mut self, key: &str) {
        self.credential = Some(CredentialSection {
            gemini_api_key: key.trim().to_string(),
        });
    }

    /// Remove the stored key. Returns `true` when there was one.
    pub fn clear_api_key(&mut self) -> bool {
        self.credential.take().is_some()
    }
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the lessonplan config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/lessonplan` or
/// `~/.config/lessonplan`, also on macOS.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("lessonplan");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("lessonplan")
}

/// Return the path to the lessonplan config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load the config file, or an empty config when it does not exist yet.
/// A file that exists but does not parse is an error.
pub fn load_config() -> Result<ConfigFile> {
    load_config_from(&config_path())
}

pub fn load_config_from(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        return Ok(ConfigFile::default());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix.
pub fn save_config(config: &ConfigFile) -> Result<PathBuf> {
    let path = config_path();
    save_config_to(&path, config)?;
    Ok(path)
}

pub fn save_config_to(path: &Path, config: &ConfigFile) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create config directory {}", dir.display()))?;
    }

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    // The file holds the API key: owner read/write only.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Where the resolved API key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Flag,
    Env,
    ConfigFile,
}

impl std::fmt::Display for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Flag => f.write_str("--api-key flag"),
            Self::Env => write!(f, "{API_KEY_ENV} env var"),
            Self::ConfigFile => f.write_str("config file"),
        }
    }
}

/// Fully resolved generation settings, ready for use.
#[derive(Debug)]
pub struct GenerationConfig {
    /// `None` when no key is configured anywhere; the gateway reports it.
    pub api_key: Option<(String, KeySource)>,
    pub model: ModelTier,
    pub temperature: f32,
    pub endpoint: String,
}

impl GenerationConfig {
    /// Resolve settings using the chain: CLI flag > env var > config file > default.
    ///
    /// - API key: `cli_api_key` > `LESSONPLAN_API_KEY` > `credential.gemini_api_key` > none
    /// - Model: `cli_model` > `LESSONPLAN_MODEL` > `generation.model` > `fast`
    /// - Endpoint: `LESSONPLAN_GEMINI_ENDPOINT` > `generation.endpoint` > Gemini API
    /// - Temperature: `generation.temperature` > 0.1
    pub fn resolve(cli_api_key: Option<&str>, cli_model: Option<ModelTier>) -> Result<Self> {
        let file_config = load_config()?;
        Self::resolve_with(&file_config, cli_api_key, cli_model)
    }

    pub fn resolve_with(
        file_config: &ConfigFile,
        cli_api_key: Option<&str>,
        cli_model: Option<ModelTier>,
    ) -> Result<Self> {
        let generation = file_config.generation.as_ref();

        // API key resolution.
        let api_key = if let Some(key) = non_blank(cli_api_key.map(str::to_string)) {
            Some((key, KeySource::Flag))
        } else if let Some(key) = non_blank(std::env::var(API_KEY_ENV).ok()) {
            Some((key, KeySource::Env))
        } else {
            file_config
                .api_key()
                .map(|key| (key.to_string(), KeySource::ConfigFile))
        };

        // Model resolution.
        let model = if let Some(model) = cli_model {
            model
        } else if let Some(raw) = non_blank(std::env::var(MODEL_ENV).ok()) {
            raw.parse()
                .with_context(|| format!("{MODEL_ENV} env var is not a valid model tier"))?
        } else {
            generation.and_then(|g| g.model).unwrap_or_default()
        };

        let endpoint = non_blank(std::env::var(ENDPOINT_ENV).ok())
            .or_else(|| generation.and_then(|g| g.endpoint.clone()))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let temperature = generation
            .and_then(|g| g.temperature)
            .unwrap_or(DEFAULT_TEMPERATURE);

        Ok(Self {
            api_key,
            model,
            temperature,
            endpoint,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        crate::test_util::lock_env()
    }

    fn clear_env() {
        unsafe { std::env::remove_var(API_KEY_ENV) };
        unsafe { std::env::remove_var(MODEL_ENV) };
        unsafe { std::env::remove_var(ENDPOINT_ENV) };
    }

    fn file_with_key(key: &str) -> ConfigFile {
        let mut cfg = ConfigFile::default();
        cfg.set_api_key(key);
        cfg
    }

    #[test]
    fn save_and_load_config_roundtrip() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("lessonplan").join("config.toml");

        let mut original = file_with_key("AIza-test");
        original.generation = Some(GenerationSection {
            model: Some(ModelTier::Smart),
            temperature: Some(0.3),
            endpoint: None,
        });
        save_config_to(&path, &original).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.api_key(), Some("AIza-test"));
        let generation = loaded.generation.unwrap();
        assert_eq!(generation.model, Some(ModelTier::Smart));
        assert_eq!(generation.temperature, Some(0.3));
        assert!(generation.endpoint.is_none());
    }

    #[cfg(unix)]
    #[test]
    fn save_config_sets_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        save_config_to(&path, &file_with_key("k")).unwrap();

        let meta = std::fs::metadata(&path).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let tmp = tempfile::TempDir::new().unwrap();
        let cfg = load_config_from(&tmp.path().join("absent.toml")).unwrap();
        assert!(cfg.credential.is_none());
        assert!(cfg.generation.is_none());
    }

    #[test]
    fn unparsable_file_is_an_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "credential = [").unwrap();
        let err = load_config_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("failed to parse config file"));
    }

    #[test]
    fn model_aliases_parse_from_file() {
        let cfg: ConfigFile = toml::from_str("[generation]\nmodel = \"pro\"\n").unwrap();
        assert_eq!(cfg.generation.unwrap().model, Some(ModelTier::Smart));
    }

    #[test]
    fn clear_api_key_reports_presence() {
        let mut cfg = file_with_key("k");
        assert!(cfg.clear_api_key());
        assert!(!cfg.clear_api_key());
        assert!(cfg.api_key().is_none());
    }

    #[test]
    fn blank_stored_key_counts_as_absent() {
        let cfg = file_with_key("   ");
        assert!(cfg.api_key().is_none());
    }

    #[test]
    fn resolve_with_cli_flag_overrides_all() {
        let _lock = lock_env();
        clear_env();
        unsafe { std::env::set_var(API_KEY_ENV, "env-key") };
        unsafe { std::env::set_var(MODEL_ENV, "fast") };

        let resolved =
            GenerationConfig::resolve_with(&file_with_key("file-key"), Some("cli-key"), Some(ModelTier::Smart))
                .unwrap();
        assert_eq!(resolved.api_key, Some(("cli-key".to_string(), KeySource::Flag)));
        assert_eq!(resolved.model, ModelTier::Smart);

        clear_env();
    }

    #[test]
    fn resolve_with_env_var_overrides_config_file() {
        let _lock = lock_env();
        clear_env();
        unsafe { std::env::set_var(API_KEY_ENV, "env-key") };
        unsafe { std::env::set_var(MODEL_ENV, "pro") };
        unsafe { std::env::set_var(ENDPOINT_ENV, "http://localhost:8080/v1beta") };

        let mut cfg = file_with_key("file-key");
        cfg.generation = Some(GenerationSection {
            model: Some(ModelTier::Fast),
            temperature: None,
            endpoint: Some("http://proxy/v1beta".to_string()),
        });
        let resolved = GenerationConfig::resolve_with(&cfg, None, None).unwrap();
        assert_eq!(resolved.api_key, Some(("env-key".to_string(), KeySource::Env)));
        assert_eq!(resolved.model, ModelTier::Smart);
        assert_eq!(resolved.endpoint, "http://localhost:8080/v1beta");

        clear_env();
    }

    #[test]
    fn resolve_falls_back_to_config_file() {
        let _lock = lock_env();
        clear_env();

        let mut cfg = file_with_key("file-key");
        cfg.generation = Some(GenerationSection {
            model: Some(ModelTier::Smart),
            temperature: Some(0.4),
            endpoint: Some("http://proxy/v1beta".to_string()),
        });
        let resolved = GenerationConfig::resolve_with(&cfg, Some("  "), None).unwrap();
        assert_eq!(
            resolved.api_key,
            Some(("file-key".to_string(), KeySource::ConfigFile))
        );
        assert_eq!(resolved.model, ModelTier::Smart);
        assert_eq!(resolved.endpoint, "http://proxy/v1beta");
        assert!((resolved.temperature - 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn resolve_defaults_when_nothing_set() {
        let _lock = lock_env();
        clear_env();

        let resolved = GenerationConfig::resolve_with(&ConfigFile::default(), None, None).unwrap();
        assert!(resolved.api_key.is_none());
        assert_eq!(resolved.model, ModelTier::Fast);
        assert_eq!(resolved.endpoint, DEFAULT_BASE_URL);
        assert!((resolved.temperature - DEFAULT_TEMPERATURE).abs() < f32::EPSILON);
    }

    #[test]
    fn resolve_rejects_invalid_model_env() {
        let _lock = lock_env();
        clear_env();
        unsafe { std::env::set_var(MODEL_ENV, "ultra") };

        let result = GenerationConfig::resolve_with(&ConfigFile::default(), None, None);
        clear_env();

        let msg = format!("{:#}", result.unwrap_err());
        assert!(msg.contains(MODEL_ENV), "unexpected error: {msg}");
    }

    #[test]
    fn config_path_ends_with_expected_filename() {
        let path = config_path();
        assert!(
            path.ends_with("lessonplan/config.toml"),
            "unexpected config path: {}",
            path.display()
        );
    }
}
