use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walltheme_common::{expand_tilde, ToolSet, WallthemeError, error::ConfigError, Result};
use walltheme_common::paths::is_bare_file_name;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub tools: ToolSet,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default = "default_palette_targets")]
    pub palette_targets: Vec<PaletteTarget>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    pub wallpaper_dir: String,
    pub active_file: String,
    pub theme_mapping: String,
    pub themes_dir: String,
    pub gtk4_config_dir: String,
    pub palette_cache: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub desktop: bool,
    pub command: String,
    pub app_name: String,
}

/// A generated palette file and where the consuming program reads it from.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PaletteTarget {
    pub source: String,
    pub destination: String,
}

impl PaletteTarget {
    fn new(source: &str, destination: &str) -> Self {
        Self {
            source: source.to_string(),
            destination: destination.to_string(),
        }
    }
}

/// Paths with `~` expanded, ready for the apply pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPaths {
    pub wallpaper_dir: PathBuf,
    pub active_file: PathBuf,
    pub theme_mapping: PathBuf,
    pub themes_dir: PathBuf,
    pub gtk4_config_dir: PathBuf,
    pub palette_targets: Vec<(PathBuf, PathBuf)>,
}

// Default values
fn default_palette_targets() -> Vec<PaletteTarget> {
    vec![
        PaletteTarget::new("colors-kitty.conf", "~/.config/kitty/colors.conf"),
        PaletteTarget::new("colors-hyprland.conf", "~/.config/hypr/colors.conf"),
        PaletteTarget::new("colors-waybar.css", "~/.config/waybar/colors.css"),
    ]
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            wallpaper_dir: "~/.config/hypr/bg".to_string(),
            active_file: "bg.jpg".to_string(),
            theme_mapping: "wallpaper_themes.json".to_string(),
            themes_dir: "~/.themes".to_string(),
            gtk4_config_dir: "~/.config/gtk-4.0".to_string(),
            palette_cache: "~/.cache/wal".to_string(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            desktop: true,
            command: "notify-send".to_string(),
            app_name: "walltheme".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            tools: ToolSet::default(),
            notifications: NotificationConfig::default(),
            palette_targets: default_palette_targets(),
        }
    }
}

impl Config {
    /// Loads the configuration at `path`; a missing file means defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("No configuration at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| WallthemeError::Config(ConfigError::FileRead {
                path: path.to_path_buf(),
                source: e,
            }))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| WallthemeError::Config(ConfigError::TomlParse {
                message: e.to_string(),
            }))?;

        config.validate()?;

        log::info!("Configuration loaded from {:?}", path);
        Ok(config)
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or(WallthemeError::Config(ConfigError::NoConfigDir))?
            .join("walltheme");

        Ok(config_dir.join("config.toml"))
    }

    /// Writes the default configuration unless a file already exists.
    /// Returns whether a file was written.
    pub fn write_default(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }

        let write_err = |e| WallthemeError::Config(ConfigError::FileWrite {
            path: path.to_path_buf(),
            source: e,
        });

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }

        let content = toml::to_string_pretty(&Self::default())?;
        std::fs::write(path, content).map_err(write_err)?;
        Ok(true)
    }

    pub fn resolve_paths(&self) -> Result<ResolvedPaths> {
        let wallpaper_dir = expand_tilde(&self.paths.wallpaper_dir)?;
        let palette_cache = expand_tilde(&self.paths.palette_cache)?;

        let palette_targets = self.palette_targets.iter()
            .map(|target| -> Result<(PathBuf, PathBuf)> {
                Ok((palette_cache.join(&target.source), expand_tilde(&target.destination)?))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ResolvedPaths {
            active_file: wallpaper_dir.join(&self.paths.active_file),
            theme_mapping: wallpaper_dir.join(&self.paths.theme_mapping),
            themes_dir: expand_tilde(&self.paths.themes_dir)?,
            gtk4_config_dir: expand_tilde(&self.paths.gtk4_config_dir)?,
            wallpaper_dir,
            palette_targets,
        })
    }

    fn validate(&self) -> Result<()> {
        self.paths.validate()?;
        self.notifications.validate()?;

        let tools = [
            ("tools.wallpaper_setter", &self.tools.wallpaper_setter),
            ("tools.palette_generator", &self.tools.palette_generator),
            ("tools.settings", &self.tools.settings),
            ("tools.browser_sync", &self.tools.browser_sync),
            ("tools.status_bar", &self.tools.status_bar),
            ("tools.compositor", &self.tools.compositor),
            ("tools.terminal", &self.tools.terminal),
        ];
        for (field, value) in tools {
            require_non_empty(field, value)?;
        }

        for (i, target) in self.palette_targets.iter().enumerate() {
            require_non_empty(&format!("palette_targets[{}].source", i), &target.source)?;
            require_non_empty(&format!("palette_targets[{}].destination", i), &target.destination)?;
        }

        Ok(())
    }
}

impl PathsConfig {
    fn validate(&self) -> Result<()> {
        require_non_empty("paths.wallpaper_dir", &self.wallpaper_dir)?;

        for (field, value) in [
            ("paths.active_file", &self.active_file),
            ("paths.theme_mapping", &self.theme_mapping),
        ] {
            if !is_bare_file_name(value) {
                return Err(WallthemeError::Config(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: value.clone(),
                }));
            }
        }

        if self.active_file == self.theme_mapping {
            return Err(WallthemeError::Config(ConfigError::InvalidValue {
                field: "paths.theme_mapping".to_string(),
                value: self.theme_mapping.clone(),
            }));
        }

        Ok(())
    }
}

impl NotificationConfig {
    fn validate(&self) -> Result<()> {
        if self.desktop {
            require_non_empty("notifications.command", &self.command)?;
        }
        Ok(())
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(WallthemeError::Config(ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        }));
    }
    Ok(())
}
