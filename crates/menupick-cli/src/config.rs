// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use menupick_app::{AuthGate, DEFAULT_PAGE_SIZE};
use menupick_tui::UiConfig;
use serde::Deserialize;
use std::env;
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_VERSION: i64 = 1;
const DEFAULT_NOTIFICATION_TIMEOUT: &str = "3s";
const DEFAULT_SPIN_TICK: &str = "50ms";
const DEFAULT_SPIN_DURATION: &str = "1s";
const DEFAULT_REMOTE_TIMEOUT: &str = "10s";
const DEFAULT_USERNAME: &str = "admin";
const DEFAULT_LOG_LEVEL: &str = "info";
const LOG_FILE_NAME: &str = "menupick.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sqlite,
    Remote,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub store: Storage,
    #[serde(default)]
    pub remote: Remote,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub auth: Auth,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            store: Storage::default(),
            remote: Remote::default(),
            ui: Ui::default(),
            auth: Auth::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Storage {
    pub backend: Option<Backend>,
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Remote {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ui {
    pub page_size: Option<usize>,
    pub notification_timeout: Option<String>,
    pub spin_tick: Option<String>,
    pub spin_duration: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Auth {
    pub username: Option<String>,
    pub password_sha256: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub file: Option<String>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("MENUPICK_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!(
                "cannot resolve config directory; set MENUPICK_CONFIG_PATH to the config file"
            )
        })?;

        let app_dir = config_root.join(menupick_db::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and put values under [store], [remote], [ui], [auth], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(db_path) = &self.store.db_path {
            menupick_db::validate_db_path(db_path)?;
        }

        if self.backend() == Backend::Remote && self.remote_base_url().is_none() {
            bail!(
                "store.backend = \"remote\" in {} needs remote.base_url",
                path.display()
            );
        }

        if self.ui.page_size == Some(0) {
            bail!("ui.page_size in {} must be at least 1", path.display());
        }

        let durations = [
            ("remote.timeout", &self.remote.timeout),
            ("ui.notification_timeout", &self.ui.notification_timeout),
            ("ui.spin_tick", &self.ui.spin_tick),
            ("ui.spin_duration", &self.ui.spin_duration),
        ];
        for (key, raw) in durations {
            if let Some(raw) = raw {
                let parsed = parse_duration(raw).with_context(|| format!("{key} in {}", path.display()))?;
                if parsed <= Duration::ZERO {
                    bail!("{key} in {} must be positive, got {raw}", path.display());
                }
            }
        }

        if let Some(digest) = &self.auth.password_sha256
            && !is_sha256_hex(digest)
        {
            bail!(
                "auth.password_sha256 in {} must be 64 hex characters; generate it with `menupick --hash-password <password>`",
                path.display()
            );
        }

        Ok(())
    }

    pub fn backend(&self) -> Backend {
        self.store.backend.unwrap_or_default()
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.store.db_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => menupick_db::default_db_path(),
        }
    }

    pub fn remote_base_url(&self) -> Option<&str> {
        self.remote
            .base_url
            .as_deref()
            .map(|url| url.trim().trim_end_matches('/'))
            .filter(|url| !url.is_empty())
    }

    pub fn remote_api_key(&self) -> Option<&str> {
        self.remote.api_key.as_deref()
    }

    pub fn remote_timeout(&self) -> Result<Duration> {
        parse_duration(
            self.remote
                .timeout
                .as_deref()
                .unwrap_or(DEFAULT_REMOTE_TIMEOUT),
        )
    }

    pub fn page_size(&self) -> NonZeroUsize {
        self.ui
            .page_size
            .and_then(NonZeroUsize::new)
            .unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn notification_timeout(&self) -> Result<Duration> {
        parse_duration(
            self.ui
                .notification_timeout
                .as_deref()
                .unwrap_or(DEFAULT_NOTIFICATION_TIMEOUT),
        )
    }

    pub fn spin_tick(&self) -> Result<Duration> {
        parse_duration(self.ui.spin_tick.as_deref().unwrap_or(DEFAULT_SPIN_TICK))
    }

    pub fn spin_duration(&self) -> Result<Duration> {
        parse_duration(
            self.ui
                .spin_duration
                .as_deref()
                .unwrap_or(DEFAULT_SPIN_DURATION),
        )
    }

    pub fn has_credentials(&self) -> bool {
        self.auth.password_sha256.is_some()
    }

    pub fn auth_gate(&self) -> AuthGate {
        AuthGate::new(
            self.auth.username.as_deref().unwrap_or(DEFAULT_USERNAME),
            self.auth.password_sha256.as_deref().unwrap_or(""),
        )
    }

    pub fn ui_config(&self, auth: AuthGate) -> Result<UiConfig> {
        Ok(UiConfig {
            page_size: self.page_size(),
            notification_timeout: self.notification_timeout()?,
            spin_tick: self.spin_tick()?,
            spin_duration: self.spin_duration()?,
            auth,
        })
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_file(&self) -> Result<PathBuf> {
        if let Some(file) = &self.log.file {
            return Ok(PathBuf::from(file));
        }
        let data_root = dirs::data_local_dir().ok_or_else(|| {
            anyhow!("cannot resolve data directory; set log.file to a writable path")
        })?;
        Ok(data_root.join(menupick_db::APP_NAME).join(LOG_FILE_NAME))
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# menupick config\n# Place this file at: {}\n\nversion = 1\n\n[store]\n# \"sqlite\" (local file) or \"remote\" (hosted /food endpoint)\nbackend = \"sqlite\"\n# Optional. Default is platform data dir (for example ~/.local/share/menupick/menupick.db)\n# db_path = \"/absolute/path/to/menupick.db\"\n\n[remote]\n# base_url = \"https://menu.example.com/api\"\n# api_key = \"\"\ntimeout = \"{DEFAULT_REMOTE_TIMEOUT}\"\n\n[ui]\npage_size = {}\nnotification_timeout = \"{DEFAULT_NOTIFICATION_TIMEOUT}\"\nspin_tick = \"{DEFAULT_SPIN_TICK}\"\nspin_duration = \"{DEFAULT_SPIN_DURATION}\"\n\n[auth]\nusername = \"{DEFAULT_USERNAME}\"\n# Generate with `menupick --hash-password <password>`\n# password_sha256 = \"\"\n\n[log]\nlevel = \"{DEFAULT_LOG_LEVEL}\"\n# file = \"/absolute/path/to/menupick.log\"\n",
            path.display(),
            DEFAULT_PAGE_SIZE,
        )
    }
}

fn is_sha256_hex(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.len() == 64 && trimmed.chars().all(|ch| ch.is_ascii_hexdigit())
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 5s)")
}

#[cfg(test)]
mod tests {
    use super::{Backend, Config, parse_duration};
    use anyhow::Result;
    use menupick_app::password_digest;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;

    fn write_config(content: &str) -> Result<(tempfile::TempDir, PathBuf)> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, content)?;
        Ok((temp, path))
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        match ENV_LOCK.get_or_init(|| Mutex::new(())).lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[test]
    fn missing_config_uses_defaults() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let config = Config::load(&temp.path().join("missing.toml"))?;
        assert_eq!(config.version, 1);
        assert_eq!(config.backend(), Backend::Sqlite);
        assert_eq!(config.page_size().get(), 5);
        assert_eq!(config.notification_timeout()?, Duration::from_secs(3));
        assert_eq!(config.spin_tick()?, Duration::from_millis(50));
        assert_eq!(config.spin_duration()?, Duration::from_secs(1));
        assert_eq!(config.log_level(), "info");
        assert!(!config.has_credentials());
        Ok(())
    }

    #[test]
    fn unversioned_config_is_rejected_with_actionable_message() -> Result<()> {
        let (_temp, path) = write_config("[ui]\npage_size = 3\n")?;
        let error = Config::load(&path).expect_err("unversioned config should fail");
        let message = error.to_string();
        assert!(message.contains("version = 1"));
        assert!(message.contains("[store]"));
        Ok(())
    }

    #[test]
    fn unsupported_config_version_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 2\n")?;
        let error = Config::load(&path).expect_err("v2 config should fail");
        assert!(error.to_string().contains("unsupported config version 2"));
        Ok(())
    }

    #[test]
    fn malformed_config_returns_parse_error() -> Result<()> {
        let (_temp, path) = write_config("{{not toml")?;
        let error = Config::load(&path).expect_err("malformed config should fail");
        assert!(error.to_string().contains("parse TOML config"));
        Ok(())
    }

    #[test]
    fn full_config_parses() -> Result<()> {
        let digest = password_digest("hunter2");
        let (_temp, path) = write_config(&format!(
            "version = 1\n[store]\nbackend = \"remote\"\n[remote]\nbase_url = \"https://menu.example.com/api//\"\napi_key = \"k\"\ntimeout = \"2s\"\n[ui]\npage_size = 8\nnotification_timeout = \"500ms\"\nspin_tick = \"20ms\"\nspin_duration = \"2s\"\n[auth]\nusername = \"chef\"\npassword_sha256 = \"{digest}\"\n[log]\nlevel = \"debug\"\nfile = \"/tmp/menupick-test.log\"\n"
        ))?;

        let config = Config::load(&path)?;
        assert_eq!(config.backend(), Backend::Remote);
        assert_eq!(
            config.remote_base_url(),
            Some("https://menu.example.com/api")
        );
        assert_eq!(config.remote_api_key(), Some("k"));
        assert_eq!(config.remote_timeout()?, Duration::from_secs(2));
        assert_eq!(config.page_size().get(), 8);
        assert_eq!(config.log_level(), "debug");
        assert_eq!(config.log_file()?, PathBuf::from("/tmp/menupick-test.log"));

        let gate = config.auth_gate();
        assert!(gate.login("chef", "hunter2").is_ok());
        assert!(gate.login("chef", "wrong").is_err());

        let ui = config.ui_config(gate)?;
        assert_eq!(ui.notification_timeout, Duration::from_millis(500));
        assert_eq!(ui.spin_tick, Duration::from_millis(20));
        assert_eq!(ui.spin_duration, Duration::from_secs(2));
        Ok(())
    }

    #[test]
    fn remote_backend_requires_base_url() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[store]\nbackend = \"remote\"\n")?;
        let error = Config::load(&path).expect_err("remote without url should fail");
        assert!(error.to_string().contains("remote.base_url"));
        Ok(())
    }

    #[test]
    fn unknown_backend_is_a_decode_error() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[store]\nbackend = \"postgres\"\n")?;
        let error = Config::load(&path).expect_err("unknown backend should fail");
        assert!(format!("{error:#}").contains("decode config"));
        Ok(())
    }

    #[test]
    fn zero_page_size_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[ui]\npage_size = 0\n")?;
        let error = Config::load(&path).expect_err("zero page size should fail");
        assert!(error.to_string().contains("ui.page_size"));
        Ok(())
    }

    #[test]
    fn non_positive_durations_are_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[ui]\nspin_tick = \"0ms\"\n")?;
        let error = Config::load(&path).expect_err("zero tick should fail");
        assert!(error.to_string().contains("ui.spin_tick"));
        assert!(error.to_string().contains("must be positive"));

        let (_temp, path) = write_config("version = 1\n[ui]\nspin_duration = \"soon\"\n")?;
        let error = Config::load(&path).expect_err("bad duration should fail");
        assert!(format!("{error:#}").contains("invalid duration"));
        Ok(())
    }

    #[test]
    fn malformed_password_digest_is_rejected() -> Result<()> {
        let (_temp, path) =
            write_config("version = 1\n[auth]\npassword_sha256 = \"plaintext\"\n")?;
        let error = Config::load(&path).expect_err("non-hex digest should fail");
        assert!(error.to_string().contains("--hash-password"));
        Ok(())
    }

    #[test]
    fn unset_password_rejects_every_login() {
        let config = Config::default();
        let gate = config.auth_gate();
        assert_eq!(gate.username(), "admin");
        assert!(gate.login("admin", "").is_err());
    }

    #[test]
    fn default_path_honors_env_override() -> Result<()> {
        let _guard = env_lock();
        let temp = tempfile::tempdir()?;
        let override_path = temp.path().join("custom-config.toml");
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("MENUPICK_CONFIG_PATH", &override_path);
        }
        let resolved = Config::default_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("MENUPICK_CONFIG_PATH");
        }
        assert_eq!(resolved, override_path);
        Ok(())
    }

    #[test]
    fn db_path_prefers_store_config_over_env_override() -> Result<()> {
        let _guard = env_lock();
        let (_temp, path) =
            write_config("version = 1\n[store]\ndb_path = \"/explicit/from-config.db\"\n")?;
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("MENUPICK_DB_PATH", "/from/env.db");
        }
        let config = Config::load(&path)?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("MENUPICK_DB_PATH");
        }
        assert_eq!(config.db_path()?, PathBuf::from("/explicit/from-config.db"));
        Ok(())
    }

    #[test]
    fn db_path_uses_env_override_when_store_db_path_missing() -> Result<()> {
        let _guard = env_lock();
        let (_temp, path) = write_config("version = 1\n")?;
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("MENUPICK_DB_PATH", "/from/env-only.db");
        }
        let config = Config::load(&path)?;
        let resolved = config.db_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("MENUPICK_DB_PATH");
        }
        assert_eq!(resolved, PathBuf::from("/from/env-only.db"));
        Ok(())
    }

    #[test]
    fn db_path_rejects_uri_style_store_value() -> Result<()> {
        let (_temp, path) =
            write_config("version = 1\n[store]\ndb_path = \"https://evil.example/menupick.db\"\n")?;
        let error = Config::load(&path).expect_err("URI db_path should fail validation");
        let message = error.to_string();
        assert!(
            message.contains("looks like a URI") || message.contains("filesystem path"),
            "unexpected message: {message}"
        );
        Ok(())
    }

    #[test]
    fn durations_parse_ms_seconds_and_minutes() -> Result<()> {
        assert_eq!(parse_duration("500ms")?, Duration::from_millis(500));
        assert_eq!(parse_duration("5s")?, Duration::from_secs(5));
        assert_eq!(parse_duration("2m")?, Duration::from_secs(120));
        assert!(parse_duration("oops").is_err());
        Ok(())
    }

    #[test]
    fn example_config_round_trips_through_load() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        let example = Config::example_config(&path);
        for section in ["[store]", "[remote]", "[ui]", "[auth]", "[log]"] {
            assert!(example.contains(section), "missing {section}");
        }
        std::fs::write(&path, example)?;
        let config = Config::load(&path)?;
        assert_eq!(config.backend(), Backend::Sqlite);
        assert_eq!(config.page_size().get(), 5);
        Ok(())
    }
}
