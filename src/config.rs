use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Runtime settings. Sources, lowest to highest priority: defaults, TOML file, `TELEDECK_*` env, CLI flags.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub bind: String,
    pub database_url: Option<String>,
    pub media_dir: PathBuf,
    pub thumbnail_dir: PathBuf,
    pub recycle_dir: PathBuf,
    /// Built single-page app; served at `/` when set.
    pub web_dir: Option<PathBuf>,
    pub session_cookie_name: String,
    pub secure_cookies: bool,
    pub page_size: u32,
    pub require_auth: bool,
    pub thumbnail_workers: usize,
    pub ffmpeg: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:4000".to_string(),
            database_url: None,
            media_dir: PathBuf::from("static/media"),
            thumbnail_dir: PathBuf::from("static/thumbnails"),
            recycle_dir: PathBuf::from("recyclebin/media"),
            web_dir: None,
            session_cookie_name: "session".to_string(),
            secure_cookies: false,
            page_size: 100,
            require_auth: false,
            thumbnail_workers: 8,
            ffmpeg: "ffmpeg".to_string(),
        }
    }
}

impl Config {
    /// Load from `path` (or the per-user config file when it exists), then apply env overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path().filter(|p| p.exists()),
        };
        let mut cfg = match file {
            Some(p) => {
                let raw = std::fs::read_to_string(&p).with_context(|| format!("reading config {}", p.display()))?;
                let cfg = Self::from_toml(&raw).with_context(|| format!("parsing config {}", p.display()))?;
                tracing::debug!(path = %p.display(), "loaded config file");
                cfg
            }
            None => Self::default(),
        };
        cfg.apply_env(|k| std::env::var(k).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_toml(raw: &str) -> Result<Self> { Ok(toml::from_str(raw)?) }

    /// Apply `TELEDECK_*` overrides using `get` as the variable source.
    pub fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(v) = get("TELEDECK_BIND") { self.bind = v; }
        if let Some(v) = get("TELEDECK_DATABASE_URL").or_else(|| get("DATABASE_URL")) { self.database_url = Some(v); }
        if let Some(v) = get("TELEDECK_MEDIA_DIR") { self.media_dir = v.into(); }
        if let Some(v) = get("TELEDECK_THUMBNAIL_DIR") { self.thumbnail_dir = v.into(); }
        if let Some(v) = get("TELEDECK_RECYCLE_DIR") { self.recycle_dir = v.into(); }
        if let Some(v) = get("TELEDECK_WEB_DIR") { self.web_dir = Some(v.into()); }
        if let Some(v) = get("TELEDECK_SESSION_COOKIE_NAME") { self.session_cookie_name = v; }
        if let Some(v) = get("TELEDECK_SECURE_COOKIES").and_then(|s| parse_bool(&s)) { self.secure_cookies = v; }
        if let Some(v) = get("TELEDECK_PAGE_SIZE").and_then(|s| s.parse().ok()) { self.page_size = v; }
        if let Some(v) = get("TELEDECK_REQUIRE_AUTH").and_then(|s| parse_bool(&s)) { self.require_auth = v; }
        if let Some(v) = get("TELEDECK_THUMBNAIL_WORKERS").and_then(|s| s.parse().ok()) { self.thumbnail_workers = v; }
        if let Some(v) = get("TELEDECK_FFMPEG") { self.ffmpeg = v; }
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.page_size > 0, "page_size must be at least 1");
        anyhow::ensure!(self.thumbnail_workers > 0, "thumbnail_workers must be at least 1");
        anyhow::ensure!(!self.session_cookie_name.trim().is_empty(), "session_cookie_name must not be empty");
        Ok(())
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "teledeck", "teledeck").map(|p| p.config_dir().join("teledeck.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn toml_fills_missing_fields_with_defaults() {
        let cfg = Config::from_toml("page_size = 24\nrequire_auth = true\nmedia_dir = \"/srv/media\"\n").unwrap();
        assert_eq!(cfg.page_size, 24);
        assert!(cfg.require_auth);
        assert_eq!(cfg.media_dir, PathBuf::from("/srv/media"));
        assert_eq!(cfg.session_cookie_name, "session");
        assert_eq!(cfg.bind, "0.0.0.0:4000");
    }

    #[test]
    fn env_overrides_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("TELEDECK_PAGE_SIZE", "50"),
            ("TELEDECK_SECURE_COOKIES", "yes"),
            ("TELEDECK_THUMBNAIL_WORKERS", "not a number"),
            ("DATABASE_URL", "sqlite://x.db"),
        ]);
        let mut cfg = Config::default();
        cfg.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.page_size, 50);
        assert!(cfg.secure_cookies);
        assert_eq!(cfg.thumbnail_workers, 8);
        assert_eq!(cfg.database_url.as_deref(), Some("sqlite://x.db"));
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let cfg = Config { page_size: 0, ..Config::default() };
        assert!(cfg.validate().is_err());
    }
}
