use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong between reading the config and reloading
/// the desktop.
#[derive(Error, Debug)]
pub enum WallthemeError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("wallpapers: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("theme mapping: {0}")]
    Theme(#[from] ThemeError),

    #[error("{0}")]
    Tool(#[from] ToolError),

    #[error("{0}")]
    Process(#[from] ProcessError),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read {path:?}")]
    FileRead { path: PathBuf, source: std::io::Error },

    #[error("cannot write {path:?}")]
    FileWrite { path: PathBuf, source: std::io::Error },

    #[error("bad TOML: {message}")]
    TomlParse { message: String },

    #[error("{field} = {value:?} is not allowed")]
    InvalidValue { field: String, value: String },

    #[error("no XDG config directory")]
    NoConfigDir,

    #[error("no home directory to expand '~' against")]
    NoHomeDir,
}

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("cannot list {path:?}")]
    DirectoryRead { path: PathBuf, source: std::io::Error },

    #[error("{path:?} holds no images")]
    NoWallpapersFound { path: PathBuf },

    #[error("cannot open {path:?}")]
    FileAccess { path: PathBuf, source: std::io::Error },

    #[error("{path:?} is not a jpg, png, bmp or webp image")]
    UnsupportedFormat { path: PathBuf },

    #[error("{path:?} does not look like the image its extension claims")]
    CorruptedImage { path: PathBuf },

    #[error("no wallpaper named {name}")]
    UnknownWallpaper { name: String },
}

#[derive(Error, Debug)]
pub enum ThemeError {
    #[error("cannot read {path:?}")]
    FileRead { path: PathBuf, source: std::io::Error },

    #[error("cannot write {path:?}")]
    FileWrite { path: PathBuf, source: std::io::Error },

    #[error("{path:?} is not valid JSON: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("cannot encode mapping: {message}")]
    Encode { message: String },

    #[error("no gtk-4.0/gtk.css at {path:?}")]
    Gtk4Missing { path: PathBuf },
}

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Required command '{name}' not found in PATH")]
    MissingRequired { name: String },
}

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("{command}: {source}")]
    Execution { command: String, source: std::io::Error },

    #[error("exited with status {code}")]
    NonZeroExit { code: i32, stderr: String },

    #[error("cannot signal pid {pid}: {message}")]
    Signal { pid: i32, message: String },
}

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("{message}")]
    General { message: String },
}

pub type Result<T> = std::result::Result<T, WallthemeError>;

impl From<serde_json::Error> for WallthemeError {
    fn from(err: serde_json::Error) -> Self {
        WallthemeError::Theme(ThemeError::Encode {
            message: err.to_string(),
        })
    }
}

impl From<toml::de::Error> for WallthemeError {
    fn from(err: toml::de::Error) -> Self {
        WallthemeError::Config(ConfigError::TomlParse {
            message: err.message().to_string(),
        })
    }
}

impl From<toml::ser::Error> for WallthemeError {
    fn from(err: toml::ser::Error) -> Self {
        WallthemeError::Config(ConfigError::TomlParse {
            message: err.to_string(),
        })
    }
}

pub trait ErrorReporting {
    fn log_error(&self, context: &str);
    fn user_friendly_message(&self) -> String;
}

impl ErrorReporting for WallthemeError {
    fn log_error(&self, context: &str) {
        log::error!("{}: {:?}", context, self);
    }

    fn user_friendly_message(&self) -> String {
        match self {
            WallthemeError::Config(ConfigError::FileRead { path, .. }) => {
                format!("Configuration file could not be read: {:?}", path)
            }
            WallthemeError::Config(ConfigError::TomlParse { message }) => {
                format!("Invalid configuration format: {}", message)
            }
            WallthemeError::Discovery(DiscoveryError::DirectoryRead { path, .. }) => {
                format!("Wallpaper directory {:?} does not exist", path)
            }
            WallthemeError::Discovery(DiscoveryError::NoWallpapersFound { path }) => {
                format!("No wallpapers found in directory: {:?}", path)
            }
            WallthemeError::Tool(ToolError::MissingRequired { name }) => {
                format!("Required command '{}' not found in PATH", name)
            }
            WallthemeError::Process(ProcessError::NonZeroExit { code, stderr }) => {
                let stderr = stderr.trim();
                if stderr.is_empty() {
                    format!("Command returned non-zero exit code: {}", code)
                } else {
                    format!("Command returned non-zero exit code: {} ({})", code, stderr)
                }
            }
            WallthemeError::Process(ProcessError::Execution { command, source }) => {
                format!("Could not run {}: {}", command, source)
            }
            WallthemeError::Io(err) => format!("File system error: {}", err),
            _ => self.to_string(),
        }
    }
}
