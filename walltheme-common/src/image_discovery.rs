use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use crate::error::{WallthemeError, DiscoveryError};
use crate::Result;

const SUPPORTED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];

/// A selectable wallpaper file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wallpaper {
    pub path: PathBuf,
    pub file_name: String,
}

impl Wallpaper {
    pub fn from_path(path: PathBuf) -> Option<Self> {
        let file_name = path.file_name()?.to_string_lossy().to_string();
        Some(Self { path, file_name })
    }
}

pub struct ImageDiscovery;

impl ImageDiscovery {
    /// Lists the wallpapers directly inside `dir`, sorted by path.
    ///
    /// The active background file is the copy every tool is pointed at, so it
    /// is never offered as a choice.
    pub fn discover_wallpapers(dir: &Path, active_file: &str) -> Result<Vec<Wallpaper>> {
        if !dir.exists() {
            return Err(WallthemeError::Discovery(DiscoveryError::DirectoryRead {
                path: dir.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "Directory not found"),
            }));
        }

        if !dir.is_dir() {
            return Err(WallthemeError::Discovery(DiscoveryError::DirectoryRead {
                path: dir.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "Path is not a directory"),
            }));
        }

        let mut wallpapers = Vec::new();

        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let entry_path = entry.path();

            if !entry_path.is_file() || !Self::has_supported_extension(entry_path) {
                continue;
            }

            if entry.file_name() == active_file {
                continue;
            }

            if let Err(e) = std::fs::metadata(entry_path) {
                log::warn!("Skipping unreadable file {:?}: {}", entry_path, e);
                continue;
            }

            if let Some(wallpaper) = Wallpaper::from_path(entry_path.to_path_buf()) {
                wallpapers.push(wallpaper);
            }
        }

        if wallpapers.is_empty() {
            return Err(WallthemeError::Discovery(DiscoveryError::NoWallpapersFound {
                path: dir.to_path_buf(),
            }));
        }

        log::info!("Discovered {} wallpapers in {:?}", wallpapers.len(), dir);
        Ok(wallpapers)
    }

    /// Resolves a user-supplied name: an existing path is used as is,
    /// otherwise it is looked up among the discovered wallpapers by file name.
    pub fn resolve(name: &str, dir: &Path, active_file: &str) -> Result<Wallpaper> {
        let candidate = Path::new(name);
        if candidate.is_file() {
            Self::validate_image(candidate)?;
            return Wallpaper::from_path(candidate.to_path_buf()).ok_or_else(|| {
                WallthemeError::Discovery(DiscoveryError::UnknownWallpaper {
                    name: name.to_string(),
                })
            });
        }

        Self::discover_wallpapers(dir, active_file)?
            .into_iter()
            .find(|w| w.file_name == name)
            .ok_or_else(|| {
                WallthemeError::Discovery(DiscoveryError::UnknownWallpaper {
                    name: name.to_string(),
                })
            })
    }

    fn has_supported_extension(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
            .unwrap_or(false)
    }

    pub fn validate_image(path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(WallthemeError::Discovery(DiscoveryError::FileAccess {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "File not found"),
            }));
        }

        if !path.is_file() {
            return Err(WallthemeError::Discovery(DiscoveryError::FileAccess {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "Not a file"),
            }));
        }

        if !Self::has_supported_extension(path) {
            return Err(WallthemeError::Discovery(DiscoveryError::UnsupportedFormat {
                path: path.to_path_buf(),
            }));
        }

        Self::validate_image_header(path)
    }

    fn validate_image_header(path: &Path) -> Result<()> {
        use std::fs::File;
        use std::io::Read;

        let mut file = File::open(path)
            .map_err(|e| WallthemeError::Discovery(DiscoveryError::FileAccess {
                path: path.to_path_buf(),
                source: e,
            }))?;

        let mut header = [0u8; 12];
        let corrupted = || WallthemeError::Discovery(DiscoveryError::CorruptedImage {
            path: path.to_path_buf(),
        });

        match file.read(&mut header) {
            Ok(bytes_read) if bytes_read >= 4 => match &header[0..4] {
                [0xFF, 0xD8, 0xFF, _] => Ok(()), // JPEG
                [0x89, 0x50, 0x4E, 0x47] => Ok(()), // PNG
                [0x42, 0x4D, _, _] => Ok(()), // BMP
                [0x52, 0x49, 0x46, 0x46] if bytes_read >= 12 && &header[8..12] == b"WEBP" => Ok(()),
                _ => Err(corrupted()),
            },
            _ => Err(corrupted()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use std::fs;

    const JPEG: [u8; 4] = [0xFF, 0xD8, 0xFF, 0xE0];

    #[test]
    fn test_discover_wallpapers_excludes_active_file() {
        let temp_dir = tempdir().unwrap();
        let dir = temp_dir.path();

        fs::write(dir.join("sunset.jpg"), JPEG).unwrap();
        fs::write(dir.join("mountain.png"), "fake png").unwrap();
        fs::write(dir.join("bg.jpg"), JPEG).unwrap();
        fs::write(dir.join("wallpaper_themes.json"), "{}").unwrap();

        let wallpapers = ImageDiscovery::discover_wallpapers(dir, "bg.jpg").unwrap();
        let names: Vec<&str> = wallpapers.iter().map(|w| w.file_name.as_str()).collect();

        assert_eq!(names, vec!["mountain.png", "sunset.jpg"]);
    }

    #[test]
    fn test_discover_wallpapers_sorted_by_file_name() {
        let temp_dir = tempdir().unwrap();
        let dir = temp_dir.path();

        for name in ["b.jpg", "Zen.webp", "a.png", "a-1.jpg"] {
            fs::write(dir.join(name), JPEG).unwrap();
        }

        let wallpapers = ImageDiscovery::discover_wallpapers(dir, "bg.jpg").unwrap();
        let names: Vec<&str> = wallpapers.iter().map(|w| w.file_name.as_str()).collect();

        assert_eq!(names, vec!["Zen.webp", "a-1.jpg", "a.png", "b.jpg"]);
    }

    #[test]
    fn test_discover_wallpapers_is_not_recursive() {
        let temp_dir = tempdir().unwrap();
        let dir = temp_dir.path();

        let subdir = dir.join("archive");
        fs::create_dir(&subdir).unwrap();
        fs::write(dir.join("root.jpg"), JPEG).unwrap();
        fs::write(subdir.join("old.jpg"), JPEG).unwrap();

        let wallpapers = ImageDiscovery::discover_wallpapers(dir, "bg.jpg").unwrap();

        assert_eq!(wallpapers.len(), 1);
        assert_eq!(wallpapers[0].file_name, "root.jpg");
    }

    #[test]
    fn test_discover_wallpapers_case_insensitive_extensions() {
        let temp_dir = tempdir().unwrap();
        let dir = temp_dir.path();

        fs::write(dir.join("a.JPG"), JPEG).unwrap();
        fs::write(dir.join("b.WebP"), "fake").unwrap();
        fs::write(dir.join("c.gif"), "gif is not offered").unwrap();

        let wallpapers = ImageDiscovery::discover_wallpapers(dir, "bg.jpg").unwrap();

        assert_eq!(wallpapers.len(), 2);
        assert!(wallpapers.iter().all(|w| w.file_name != "c.gif"));
    }

    #[test]
    fn test_discover_wallpapers_only_active_file() {
        let temp_dir = tempdir().unwrap();
        let dir = temp_dir.path();
        fs::write(dir.join("bg.jpg"), JPEG).unwrap();

        match ImageDiscovery::discover_wallpapers(dir, "bg.jpg").unwrap_err() {
            WallthemeError::Discovery(DiscoveryError::NoWallpapersFound { path }) => {
                assert_eq!(path, dir);
            }
            other => panic!("Expected NoWallpapersFound, got {:?}", other),
        }
    }

    #[test]
    fn test_discover_wallpapers_missing_directory() {
        let missing = Path::new("/nonexistent/wallpapers");

        match ImageDiscovery::discover_wallpapers(missing, "bg.jpg").unwrap_err() {
            WallthemeError::Discovery(DiscoveryError::DirectoryRead { path, .. }) => {
                assert_eq!(path, missing);
            }
            other => panic!("Expected DirectoryRead, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_image() {
        let temp_dir = tempdir().unwrap();
        let dir = temp_dir.path();

        fs::write(dir.join("valid.jpg"), JPEG).unwrap();
        fs::write(dir.join("fake.jpg"), "not really a jpeg").unwrap();
        fs::write(dir.join("notes.txt"), "text").unwrap();

        assert!(ImageDiscovery::validate_image(&dir.join("valid.jpg")).is_ok());
        assert!(ImageDiscovery::validate_image(&dir.join("fake.jpg")).is_err());
        assert!(ImageDiscovery::validate_image(&dir.join("notes.txt")).is_err());
        assert!(ImageDiscovery::validate_image(&dir.join("missing.jpg")).is_err());
    }

    #[test]
    fn test_resolve_by_file_name_and_path() {
        let temp_dir = tempdir().unwrap();
        let dir = temp_dir.path();
        fs::write(dir.join("sunset.jpg"), JPEG).unwrap();

        let by_name = ImageDiscovery::resolve("sunset.jpg", dir, "bg.jpg").unwrap();
        assert_eq!(by_name.path, dir.join("sunset.jpg"));

        let full = dir.join("sunset.jpg");
        let by_path = ImageDiscovery::resolve(full.to_str().unwrap(), dir, "bg.jpg").unwrap();
        assert_eq!(by_path.file_name, "sunset.jpg");

        assert!(ImageDiscovery::resolve("nope.jpg", dir, "bg.jpg").is_err());
    }
}
