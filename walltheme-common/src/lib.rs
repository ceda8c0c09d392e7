pub mod image_discovery;
pub mod theme;
pub mod command_builder;
pub mod executor;
pub mod tools;
pub mod paths;
pub mod state;
pub mod error;

pub use image_discovery::{ImageDiscovery, Wallpaper};
pub use theme::{ThemeMapping, ThemeRecord, DEFAULT_THEME};
pub use command_builder::{CommandBuilder, ToolCommand, ToolSet};
pub use executor::{CommandOutput, CommandRunner, ProcessExecutor};
pub use tools::{preflight, ToolAvailability};
pub use paths::expand_tilde;
pub use state::{AppliedState, Level, StepRecord};
pub use error::{WallthemeError, Result, ErrorReporting};
