use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

const APP_DOMAIN: &str = "io";
const APP_ORG: &str = "ArchiveTui";
const APP_NAME: &str = "archive-tui";

pub struct ConfigLoader {
    paths: ConfigPaths,
}

impl ConfigLoader {
    pub fn discover() -> Result<Self> {
        let paths = ConfigPaths::discover()?;
        Ok(Self { paths })
    }

    pub fn with_paths(paths: ConfigPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    pub fn load_or_init(&self) -> Result<AppConfig> {
        self.paths.ensure_directories()?;
        if !self.paths.config_file.exists() {
            let mut default_cfg = AppConfig::default();
            self.write_default_config(&default_cfg)?;
            default_cfg.post_load(&self.paths);
            return Ok(default_cfg);
        }

        self.load()
    }

    pub fn load(&self) -> Result<AppConfig> {
        let raw = fs::read_to_string(&self.paths.config_file)
            .with_context(|| format!("reading config {}", self.paths.config_file.display()))?;
        let mut cfg: AppConfig = toml::from_str(&raw).context("parsing config toml")?;
        cfg.post_load(&self.paths);
        Ok(cfg)
    }

    fn write_default_config(&self, cfg: &AppConfig) -> Result<()> {
        let toml = toml::to_string_pretty(cfg).context("serializing default config")?;
        if let Some(parent) = self.paths.config_file.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut file = fs::File::create(&self.paths.config_file)
            .with_context(|| format!("creating config {}", self.paths.config_file.display()))?;
        file.write_all(toml.as_bytes())
            .context("writing default config")?;
        tracing::info!(path = %self.paths.config_file.display(), "wrote default config");
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub log_dir: PathBuf,
    pub state_dir: PathBuf,
    /// Site root from `ARCHIVE_TUI_SITE`, wins over the config file.
    pub site_override: Option<PathBuf>,
}

impl ConfigPaths {
    pub fn discover() -> Result<Self> {
        let override_config = env::var("ARCHIVE_TUI_CONFIG").ok().map(PathBuf::from);
        let site_override = env::var("ARCHIVE_TUI_SITE").ok().map(PathBuf::from);

        let project_dirs = ProjectDirs::from(APP_DOMAIN, APP_ORG, APP_NAME)
            .context("resolving XDG project directories")?;

        let config_dir = override_config
            .clone()
            .map(|p| {
                if p.is_dir() {
                    p
                } else {
                    p.parent().map(Path::to_path_buf).unwrap_or(p)
                }
            })
            .unwrap_or_else(|| project_dirs.config_dir().to_path_buf());

        let config_file = override_config
            .filter(|p| p.is_file() || p.extension().is_some())
            .unwrap_or_else(|| config_dir.join("config.toml"));

        let state_dir = project_dirs
            .state_dir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| project_dirs.data_dir().join("state"));
        let log_dir = state_dir.join("logs");

        Ok(Self {
            config_dir,
            config_file,
            log_dir,
            state_dir,
            site_override,
        })
    }

    #[cfg(test)]
    pub fn rooted(root: &Path, config_file: Option<PathBuf>) -> Self {
        let config_dir = root.join("config");
        Self {
            config_file: config_file.unwrap_or_else(|| config_dir.join("config.toml")),
            config_dir,
            log_dir: root.join("state").join("logs"),
            state_dir: root.join("state"),
            site_override: None,
        }
    }

    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.config_dir, &self.log_dir, &self.state_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating application directory {}", dir.display()))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub site: SiteConfig,
    pub gestures: GestureConfig,
    pub status: StatusConfig,
    pub ui: UiConfig,
}

impl AppConfig {
    fn post_load(&mut self, paths: &ConfigPaths) {
        if let Some(site) = &paths.site_override {
            self.site.root = site.clone();
        }
        self.gestures.sanitize();
        if self.status.file_name.trim().is_empty() {
            tracing::warn!("empty status file name in config, using model-status.json");
            self.status.file_name = StatusConfig::default().file_name;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Directory holding the rendered archive.
    pub root: PathBuf,
    /// Page opened on start, relative to `root`.
    pub page: PathBuf,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("dist"),
            page: PathBuf::from("index.html"),
        }
    }
}

impl SiteConfig {
    pub fn start_page(&self) -> PathBuf {
        if self.page.is_absolute() {
            self.page.clone()
        } else {
            self.root.join(&self.page)
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TouchMode {
    #[default]
    Auto,
    On,
    Off,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    pub touch: TouchMode,
    pub threshold_px: f32,
    pub at_top_px: f32,
    pub damping: f32,
    pub reload_delay_ms: u64,
    pub reset_delay_ms: u64,
    /// How many gesture pixels one terminal row stands for.
    pub pixels_per_row: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            touch: TouchMode::Auto,
            threshold_px: 80.0,
            at_top_px: 5.0,
            damping: 0.6,
            reload_delay_ms: 800,
            reset_delay_ms: 300,
            pixels_per_row: 16.0,
        }
    }
}

impl GestureConfig {
    pub fn reload_delay(&self) -> Duration {
        Duration::from_millis(self.reload_delay_ms)
    }

    pub fn reset_delay(&self) -> Duration {
        Duration::from_millis(self.reset_delay_ms)
    }

    fn sanitize(&mut self) {
        let defaults = Self::default();
        if !(self.threshold_px > 0.0) {
            tracing::warn!(self.threshold_px, "pull threshold must be positive, using default");
            self.threshold_px = defaults.threshold_px;
        }
        if !(self.pixels_per_row > 0.0) {
            tracing::warn!(self.pixels_per_row, "pixels_per_row must be positive, using default");
            self.pixels_per_row = defaults.pixels_per_row;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    pub file_name: String,
    pub prefetch: bool,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            file_name: "model-status.json".to_string(),
            prefetch: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub tick_rate_ms: u64,
    pub preview_lines: u16,
    pub headline_chars: usize,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            tick_rate_ms: 100,
            preview_lines: 3,
            headline_chars: 80,
        }
    }
}

impl UiConfig {
    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms.max(10))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn first_run_writes_default_config() -> Result<()> {
        let temp = TempDir::new()?;
        let loader = ConfigLoader::with_paths(ConfigPaths::rooted(temp.path(), None));
        let cfg = loader.load_or_init()?;
        assert!(loader.paths().config_file.exists());
        assert_eq!(cfg.status.file_name, "model-status.json");
        assert_eq!(cfg.gestures.threshold_px, 80.0);

        let reloaded = loader.load()?;
        assert_eq!(reloaded.site.page, PathBuf::from("index.html"));
        assert_eq!(reloaded.ui.tick_rate_ms, 100);
        Ok(())
    }

    #[test]
    fn partial_config_keeps_defaults_and_sanitizes() -> Result<()> {
        let temp = TempDir::new()?;
        let paths = ConfigPaths::rooted(temp.path(), None);
        paths.ensure_directories()?;
        fs::write(
            &paths.config_file,
            "[site]\nroot = \"/srv/archive\"\n\n[gestures]\ntouch = \"on\"\nthreshold_px = 0.0\n",
        )?;
        let cfg = ConfigLoader::with_paths(paths).load()?;
        assert_eq!(cfg.site.start_page(), PathBuf::from("/srv/archive/index.html"));
        assert_eq!(cfg.gestures.touch, TouchMode::On);
        assert_eq!(cfg.gestures.threshold_px, 80.0);
        assert_eq!(cfg.gestures.reload_delay(), Duration::from_millis(800));
        Ok(())
    }

    #[test]
    fn site_override_wins_over_file() -> Result<()> {
        let temp = TempDir::new()?;
        let mut paths = ConfigPaths::rooted(temp.path(), None);
        paths.site_override = Some(PathBuf::from("/tmp/site"));
        let cfg = ConfigLoader::with_paths(paths).load_or_init()?;
        assert_eq!(cfg.site.root, PathBuf::from("/tmp/site"));
        Ok(())
    }

    #[test]
    fn malformed_config_is_an_error() -> Result<()> {
        let temp = TempDir::new()?;
        let paths = ConfigPaths::rooted(temp.path(), None);
        paths.ensure_directories()?;
        fs::write(&paths.config_file, "[site\nroot = ")?;
        assert!(ConfigLoader::with_paths(paths).load().is_err());
        Ok(())
    }
}
