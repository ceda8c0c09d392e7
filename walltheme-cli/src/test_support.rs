use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walltheme_common::error::ProcessError;
use walltheme_common::{
    CommandBuilder, CommandOutput, CommandRunner, Result, ThemeMapping, ToolAvailability,
    ToolCommand, ToolSet, Wallpaper, WallthemeError,
};
use walltheme_config::ResolvedPaths;

use crate::pipeline::ApplyPipeline;

pub const JPEG: [u8; 4] = [0xFF, 0xD8, 0xFF, 0xE0];

/// Records every invocation instead of running it.
#[derive(Default)]
pub struct FakeRunner {
    commands: RefCell<Vec<String>>,
    signals: RefCell<Vec<i32>>,
    failing: HashSet<String>,
    stdout: HashMap<String, String>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, program: &str) -> Self {
        self.failing.insert(program.to_string());
        self
    }

    pub fn with_stdout(mut self, program: &str, stdout: &str) -> Self {
        self.stdout.insert(program.to_string(), stdout.to_string());
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.borrow().clone()
    }

    pub fn signals(&self) -> Vec<i32> {
        self.signals.borrow().clone()
    }

    fn output_for(&self, command: &ToolCommand) -> CommandOutput {
        let failed = self.failing.contains(&command.program);
        CommandOutput {
            code: Some(if failed { 1 } else { 0 }),
            stdout: self.stdout.get(&command.program).cloned().unwrap_or_default(),
            stderr: if failed { "simulated failure".to_string() } else { String::new() },
        }
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, command: &ToolCommand) -> Result<CommandOutput> {
        self.commands.borrow_mut().push(command.to_string());
        let output = self.output_for(command);
        if !output.success() {
            return Err(WallthemeError::Process(ProcessError::NonZeroExit {
                code: 1,
                stderr: output.stderr,
            }));
        }
        Ok(output)
    }

    fn run_status(&self, command: &ToolCommand) -> Result<CommandOutput> {
        self.commands.borrow_mut().push(command.to_string());
        Ok(self.output_for(command))
    }

    fn spawn_detached(&self, command: &ToolCommand) -> Result<()> {
        self.commands.borrow_mut().push(format!("spawn {}", command));
        if self.failing.contains(&command.program) {
            return Err(WallthemeError::Process(ProcessError::Execution {
                command: command.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "simulated"),
            }));
        }
        Ok(())
    }

    fn signal_reload(&self, pid: i32) -> Result<()> {
        self.signals.borrow_mut().push(pid);
        Ok(())
    }
}

/// Drops empty executables named `names` into `dir`, for `PATH` lookups.
pub fn install_tools(dir: &Path, names: &[&str]) {
    use std::os::unix::fs::PermissionsExt;

    for name in names {
        let path = dir.join(name);
        fs::write(&path, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }
}

/// Every configured tool counts as installed.
pub fn all_tools() -> ToolAvailability {
    let tools = ToolSet::default();
    tools.required()
        .into_iter()
        .chain(tools.optional())
        .map(str::to_string)
        .collect()
}

/// A throwaway home directory laid out like a themed desktop.
pub struct TestDesktop {
    root: TempDir,
}

impl TestDesktop {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("walls")).unwrap();
        fs::create_dir_all(root.path().join("cache").join("wal")).unwrap();
        Self { root }
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn wallpaper_dir(&self) -> PathBuf {
        self.root().join("walls")
    }

    pub fn active_file(&self) -> PathBuf {
        self.wallpaper_dir().join("bg.jpg")
    }

    pub fn mapping_file(&self) -> PathBuf {
        self.wallpaper_dir().join("wallpaper_themes.json")
    }

    pub fn gtk4_config_dir(&self) -> PathBuf {
        self.root().join("config").join("gtk-4.0")
    }

    /// Returns the wallpaper, creating a valid JPEG stub on first use.
    pub fn wallpaper(&self, name: &str) -> Wallpaper {
        let path = self.wallpaper_dir().join(name);
        if !path.exists() {
            fs::write(&path, JPEG).unwrap();
        }
        Wallpaper::from_path(path).unwrap()
    }

    pub fn write_wallpaper(&self, name: &str, content: &[u8]) -> Wallpaper {
        let path = self.wallpaper_dir().join(name);
        fs::write(&path, content).unwrap();
        Wallpaper::from_path(path).unwrap()
    }

    pub fn install_gtk4_theme(&self, name: &str) {
        let dir = self.root().join("themes").join(name).join("gtk-4.0");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("gtk.css"), format!("/* {} */", name)).unwrap();
    }

    pub fn write_palette(&self, source: &str, content: &str) {
        fs::write(self.root().join("cache").join("wal").join(source), content).unwrap();
    }

    pub fn palette_destination(&self, source: &str) -> PathBuf {
        self.root().join("config").join("palettes").join(source)
    }

    pub fn mapping(&self) -> ThemeMapping {
        ThemeMapping::builtin()
    }

    pub fn paths(&self) -> ResolvedPaths {
        let palette_targets = ["colors-kitty.conf", "colors-hyprland.conf", "colors-waybar.css"]
            .into_iter()
            .map(|source| (self.root().join("cache").join("wal").join(source), self.palette_destination(source)))
            .collect();

        ResolvedPaths {
            wallpaper_dir: self.wallpaper_dir(),
            active_file: self.active_file(),
            theme_mapping: self.mapping_file(),
            themes_dir: self.root().join("themes"),
            gtk4_config_dir: self.gtk4_config_dir(),
            palette_targets,
        }
    }

    pub fn pipeline<'a>(&self, runner: &'a FakeRunner) -> ApplyPipeline<'a, FakeRunner> {
        self.pipeline_with(runner, all_tools())
    }

    pub fn pipeline_with<'a>(
        &self,
        runner: &'a FakeRunner,
        available: ToolAvailability,
    ) -> ApplyPipeline<'a, FakeRunner> {
        ApplyPipeline::new(runner, CommandBuilder::new(ToolSet::default()), available, self.paths())
    }
}
