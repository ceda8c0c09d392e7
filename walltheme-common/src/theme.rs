use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use crate::error::{ThemeError, WallthemeError};
use crate::Result;

/// Theme id meaning "nothing configured".
pub const DEFAULT_THEME: &str = "Default";

/// Desktop theme identifiers associated with a wallpaper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeRecord {
    pub gtk_theme: String,
    pub icon_theme: String,
    pub gtk4_theme: String,
}

impl ThemeRecord {
    pub fn uniform(name: &str) -> Self {
        Self {
            gtk_theme: name.to_string(),
            icon_theme: name.to_string(),
            gtk4_theme: name.to_string(),
        }
    }

    pub fn is_default(&self) -> bool {
        self.gtk_theme == DEFAULT_THEME
    }
}

impl Default for ThemeRecord {
    fn default() -> Self {
        Self::uniform(DEFAULT_THEME)
    }
}

/// Wallpaper file name (or fragment) to theme record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThemeMapping {
    entries: BTreeMap<String, ThemeRecord>,
}

impl ThemeMapping {
    pub fn new(entries: BTreeMap<String, ThemeRecord>) -> Self {
        Self { entries }
    }

    pub fn builtin() -> Self {
        let entries = [
            ("anime-room.jpg", "oomox-anime_room"),
            ("mountain.jpg", "oomox-mountain"),
            ("sunset.jpg", "oomox-sunset"),
        ]
        .into_iter()
        .map(|(file, theme)| (file.to_string(), ThemeRecord::uniform(theme)))
        .collect();

        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Loads the mapping document, writing the built-in mapping on first run.
    ///
    /// An unreadable or invalid document falls back to the built-in mapping
    /// and is left untouched on disk. Nothing is written when the directory
    /// holding the document does not exist.
    pub fn load_or_create(path: &Path) -> Self {
        if !path.exists() {
            let mapping = Self::builtin();
            if !path.parent().is_some_and(Path::is_dir) {
                log::warn!("No directory for theme config {:?}, using default themes", path);
                return mapping;
            }
            match mapping.save(path) {
                Ok(()) => log::info!("Created default theme config at {:?}", path),
                Err(e) => log::error!("Could not write default theme config: {}", e),
            }
            return mapping;
        }

        match Self::load(path) {
            Ok(mapping) => {
                log::info!("Loaded theme mapping from {:?} ({} entries)", path, mapping.len());
                mapping
            }
            Err(e) => {
                log::error!("Error loading theme config: {}. Using default themes.", e);
                Self::builtin()
            }
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| WallthemeError::Theme(ThemeError::FileRead {
                path: path.to_path_buf(),
                source: e,
            }))?;

        serde_json::from_str(&content)
            .map_err(|e| WallthemeError::Theme(ThemeError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            }))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let write_err = |e| WallthemeError::Theme(ThemeError::FileWrite {
            path: path.to_path_buf(),
            source: e,
        });

        // 4-space indentation, like a hand-edited document
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)?;

        fs::write(path, buf).map_err(write_err)
    }

    /// Exact file name first, then the first key contained in the file name
    /// (case-insensitive, keys in sorted order), then the default record.
    pub fn lookup(&self, file_name: &str) -> ThemeRecord {
        if let Some(record) = self.entries.get(file_name) {
            return record.clone();
        }

        let lowered = file_name.to_lowercase();
        self.entries
            .iter()
            .find(|(pattern, _)| lowered.contains(&pattern.to_lowercase()))
            .map(|(_, record)| record.clone())
            .unwrap_or_default()
    }

    /// Info text shown for a selected wallpaper.
    pub fn describe(&self, file_name: &str, source: &Path) -> String {
        let record = self.lookup(file_name);
        let mut text = format!(
            "GTK Theme: {}\nIcon Theme: {}\nGTK4 Theme: {}",
            record.gtk_theme, record.icon_theme, record.gtk4_theme
        );

        if record.is_default() {
            text.push_str("\n\nNo specific theme configured for this wallpaper.");
        } else {
            text.push_str(&format!("\n\nTheme configuration loaded from:\n{}", source.display()));
        }

        text
    }
}
