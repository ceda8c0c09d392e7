use std::path::{Path, PathBuf};
use crate::error::{ConfigError, WallthemeError};
use crate::Result;

/// Expands a leading `~` against the home directory.
pub fn expand_tilde(path: &str) -> Result<PathBuf> {
    expand_tilde_with(path, dirs::home_dir())
}

fn expand_tilde_with(path: &str, home: Option<PathBuf>) -> Result<PathBuf> {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => return Ok(PathBuf::from(path)),
    };

    let home = home.ok_or(WallthemeError::Config(ConfigError::NoHomeDir))?;
    if rest.is_empty() {
        Ok(home)
    } else {
        Ok(home.join(rest))
    }
}

/// True for a plain file name with no directory components.
pub fn is_bare_file_name(name: &str) -> bool {
    let path = Path::new(name);
    !name.is_empty()
        && path.file_name().map(|f| f == path.as_os_str()).unwrap_or(false)
}
