use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fmt;
use std::path::Path;
use std::process::Command;

const INTERFACE_SCHEMA: &str = "org.gnome.desktop.interface";

/// Names of the external programs the apply pipeline drives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSet {
    pub wallpaper_setter: String,
    pub palette_generator: String,
    pub palette_args: Vec<String>,
    pub settings: String,
    pub browser_sync: String,
    pub status_bar: String,
    pub compositor: String,
    pub terminal: String,
}

impl Default for ToolSet {
    fn default() -> Self {
        Self {
            wallpaper_setter: "swww".to_string(),
            palette_generator: "wal".to_string(),
            palette_args: vec!["--cols16".to_string()],
            settings: "gsettings".to_string(),
            browser_sync: "pywalfox".to_string(),
            status_bar: "waybar".to_string(),
            compositor: "hyprctl".to_string(),
            terminal: "kitty".to_string(),
        }
    }
}

impl ToolSet {
    /// Tools without which nothing useful can be applied.
    pub fn required(&self) -> Vec<&str> {
        vec![
            self.wallpaper_setter.as_str(),
            self.palette_generator.as_str(),
            self.settings.as_str(),
        ]
    }

    pub fn optional(&self) -> Vec<&str> {
        vec![
            self.browser_sync.as_str(),
            self.status_bar.as_str(),
            self.compositor.as_str(),
            self.terminal.as_str(),
        ]
    }
}

/// A program invocation, kept as plain data until it is executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<OsString>,
}

impl ToolCommand {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CommandBuilder {
    tools: ToolSet,
}

impl CommandBuilder {
    pub fn new(tools: ToolSet) -> Self {
        Self { tools }
    }

    pub fn tools(&self) -> &ToolSet {
        &self.tools
    }

    pub fn set_gtk_theme(&self, theme: &str) -> ToolCommand {
        self.interface_key("gtk-theme", theme)
    }

    pub fn set_icon_theme(&self, theme: &str) -> ToolCommand {
        self.interface_key("icon-theme", theme)
    }

    fn interface_key(&self, key: &str, value: &str) -> ToolCommand {
        ToolCommand::new(&self.tools.settings).args(["set", INTERFACE_SCHEMA, key, value])
    }

    pub fn set_wallpaper(&self, image_path: &Path) -> ToolCommand {
        ToolCommand::new(&self.tools.wallpaper_setter)
            .arg("img")
            .arg(image_path)
    }

    pub fn generate_palette(&self, image_path: &Path) -> ToolCommand {
        ToolCommand::new(&self.tools.palette_generator)
            .arg("-i")
            .arg(image_path)
            .args(&self.tools.palette_args)
    }

    pub fn update_browser(&self) -> ToolCommand {
        ToolCommand::new(&self.tools.browser_sync).arg("update")
    }

    pub fn stop_status_bar(&self) -> ToolCommand {
        ToolCommand::new("pkill").arg(&self.tools.status_bar)
    }

    pub fn start_status_bar(&self) -> ToolCommand {
        ToolCommand::new(&self.tools.status_bar)
    }

    pub fn reload_compositor(&self) -> ToolCommand {
        ToolCommand::new(&self.tools.compositor).arg("reload")
    }

    pub fn list_terminal_pids(&self) -> ToolCommand {
        ToolCommand::new("pgrep").arg(&self.tools.terminal)
    }
}
