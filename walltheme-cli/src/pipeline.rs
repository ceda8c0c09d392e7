use std::fmt;
use std::fs;
use std::path::Path;
use walltheme_common::executor::parse_pids;
use walltheme_common::{
    AppliedState, CommandBuilder, CommandRunner, ErrorReporting, ImageDiscovery, Level,
    StepRecord, ThemeMapping, ThemeRecord, ToolAvailability, Wallpaper, WallthemeError,
};
use walltheme_common::error::ThemeError;
use walltheme_config::ResolvedPaths;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    CopyWallpaper,
    Themes,
    SetWallpaper,
    GeneratePalette,
    CopyPalettes,
    BrowserSync,
    RestartStatusBar,
    ReloadCompositor,
    ReloadTerminal,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Step::CopyWallpaper => "copy wallpaper",
            Step::Themes => "themes",
            Step::SetWallpaper => "set wallpaper",
            Step::GeneratePalette => "generate palette",
            Step::CopyPalettes => "copy palettes",
            Step::BrowserSync => "browser sync",
            Step::RestartStatusBar => "restart status bar",
            Step::ReloadCompositor => "reload compositor",
            Step::ReloadTerminal => "reload terminal",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Done,
    Skipped(String),
    Warning(String),
    Failed(String),
}

impl Outcome {
    pub fn level(&self) -> Level {
        match self {
            Outcome::Done | Outcome::Skipped(_) => Level::Info,
            Outcome::Warning(_) => Level::Warning,
            Outcome::Failed(_) => Level::Error,
        }
    }

    fn detail(&self) -> Option<&str> {
        match self {
            Outcome::Done => None,
            Outcome::Skipped(s) | Outcome::Warning(s) | Outcome::Failed(s) => Some(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub step: Step,
    pub outcome: Outcome,
}

#[derive(Debug, Clone)]
pub struct ApplyReport {
    pub wallpaper: Wallpaper,
    pub theme: ThemeRecord,
    pub steps: Vec<StepReport>,
}

impl ApplyReport {
    pub fn level(&self) -> Level {
        self.steps.iter()
            .map(|s| s.outcome.level())
            .max()
            .unwrap_or(Level::Info)
    }

    pub fn outcome(&self, step: Step) -> Option<&Outcome> {
        self.steps.iter().find(|s| s.step == step).map(|s| &s.outcome)
    }

    fn warned(&self, step: Step) -> bool {
        matches!(self.outcome(step), Some(Outcome::Warning(_)))
    }

    pub fn summary(&self) -> String {
        let failures: Vec<String> = self.steps.iter()
            .filter_map(|s| match &s.outcome {
                Outcome::Failed(msg) => Some(format!("{}: {}", s.step, msg)),
                _ => None,
            })
            .collect();

        if !failures.is_empty() {
            return format!("Wallpaper application failed: {}", failures.join("; "));
        }

        let mut message = if self.warned(Step::Themes) {
            "Wallpaper applied successfully! (Theme had minor issues)".to_string()
        } else {
            "Wallpaper and themes applied successfully!".to_string()
        };

        if self.warned(Step::BrowserSync) {
            message.push_str(" (Pywalfox update failed)");
        }

        let others = self.steps.iter()
            .filter(|s| !matches!(s.step, Step::Themes | Step::BrowserSync))
            .filter(|s| s.outcome.level() == Level::Warning)
            .count();
        if others > 0 {
            message.push_str(&format!(" ({} other step(s) reported problems)", others));
        }

        message
    }

    pub fn to_state(&self) -> AppliedState {
        AppliedState {
            wallpaper: self.wallpaper.path.to_string_lossy().to_string(),
            theme: self.theme.clone(),
            level: self.level(),
            summary: self.summary(),
            steps: self.steps.iter()
                .map(|s| StepRecord {
                    step: s.step.to_string(),
                    level: s.outcome.level(),
                    detail: s.outcome.detail().map(str::to_string),
                })
                .collect(),
            applied_at: chrono::Utc::now(),
        }
    }
}

/// Runs the fixed sequence of desktop tools for one wallpaper.
///
/// Everything runs on the caller's thread. Only the wallpaper copy gates the
/// rest of the run; every later step records its outcome and moves on.
pub struct ApplyPipeline<'a, R: CommandRunner> {
    runner: &'a R,
    commands: CommandBuilder,
    available: ToolAvailability,
    paths: ResolvedPaths,
}

impl<'a, R: CommandRunner> ApplyPipeline<'a, R> {
    pub fn new(
        runner: &'a R,
        commands: CommandBuilder,
        available: ToolAvailability,
        paths: ResolvedPaths,
    ) -> Self {
        Self { runner, commands, available, paths }
    }

    pub fn apply(&self, wallpaper: &Wallpaper, mapping: &ThemeMapping) -> ApplyReport {
        let theme = mapping.lookup(&wallpaper.file_name);
        let mut report = ApplyReport {
            wallpaper: wallpaper.clone(),
            theme: theme.clone(),
            steps: Vec::new(),
        };

        log::info!("Applying {:?} with theme {:?}", wallpaper.path, theme);

        let copied = self.copy_wallpaper(wallpaper);
        let gate_failed = matches!(copied, Outcome::Failed(_));
        Self::record(&mut report, Step::CopyWallpaper, copied);
        if gate_failed {
            return report;
        }

        Self::record(&mut report, Step::Themes, self.apply_themes(&theme));
        Self::record(&mut report, Step::SetWallpaper, self.set_wallpaper());
        Self::record(&mut report, Step::GeneratePalette, self.generate_palette());
        Self::record(&mut report, Step::CopyPalettes, self.copy_palettes());
        Self::record(&mut report, Step::BrowserSync, self.sync_browser());
        Self::record(&mut report, Step::RestartStatusBar, self.restart_status_bar());
        Self::record(&mut report, Step::ReloadCompositor, self.reload_compositor());
        Self::record(&mut report, Step::ReloadTerminal, self.reload_terminal());

        report
    }

    fn record(report: &mut ApplyReport, step: Step, outcome: Outcome) {
        match &outcome {
            Outcome::Done => log::info!("{}: done", step),
            Outcome::Skipped(why) => log::info!("{}: skipped ({})", step, why),
            Outcome::Warning(msg) => log::warn!("{}: {}", step, msg),
            Outcome::Failed(msg) => log::error!("{}: {}", step, msg),
        }
        report.steps.push(StepReport { step, outcome });
    }

    fn copy_wallpaper(&self, wallpaper: &Wallpaper) -> Outcome {
        if let Err(e) = ImageDiscovery::validate_image(&wallpaper.path) {
            return Outcome::Failed(e.user_friendly_message());
        }

        let active = &self.paths.active_file;
        if same_file(&wallpaper.path, active) {
            return Outcome::Done;
        }

        match fs::copy(&wallpaper.path, active) {
            Ok(_) => {
                log::info!("Copied {:?} to {:?}", wallpaper.path, active);
                Outcome::Done
            }
            Err(e) => Outcome::Failed(format!("could not copy to {}: {}", active.display(), e)),
        }
    }

    fn apply_themes(&self, theme: &ThemeRecord) -> Outcome {
        if theme.is_default() {
            return Outcome::Skipped("no theme configured for this wallpaper".to_string());
        }

        for cmd in [
            self.commands.set_gtk_theme(&theme.gtk_theme),
            self.commands.set_icon_theme(&theme.icon_theme),
        ] {
            if let Err(e) = self.runner.run(&cmd) {
                return Outcome::Warning(format!("issue with GTK themes: {}", e.user_friendly_message()));
            }
        }

        match self.copy_gtk4_theme(&theme.gtk4_theme) {
            Ok(()) => Outcome::Done,
            Err(e) => Outcome::Warning(format!("could not copy GTK4 theme: {}", e.user_friendly_message())),
        }
    }

    fn copy_gtk4_theme(&self, gtk4_theme: &str) -> walltheme_common::Result<()> {
        if gtk4_theme == walltheme_common::DEFAULT_THEME {
            log::info!("No GTK4 theme to copy");
            return Ok(());
        }

        let source = self.paths.themes_dir.join(gtk4_theme).join("gtk-4.0").join("gtk.css");
        if !source.is_file() {
            return Err(WallthemeError::Theme(ThemeError::Gtk4Missing { path: source }));
        }

        fs::create_dir_all(&self.paths.gtk4_config_dir)?;
        let destination = self.paths.gtk4_config_dir.join("gtk.css");
        fs::copy(&source, &destination)?;

        log::info!("Copied GTK4 theme: {:?} -> {:?}", source, destination);
        Ok(())
    }

    fn set_wallpaper(&self) -> Outcome {
        self.run_step(&self.commands.set_wallpaper(&self.paths.active_file), Outcome::Failed)
    }

    fn generate_palette(&self) -> Outcome {
        self.run_step(&self.commands.generate_palette(&self.paths.active_file), Outcome::Failed)
    }

    fn copy_palettes(&self) -> Outcome {
        let mut problems = Vec::new();

        for (source, destination) in &self.paths.palette_targets {
            if !source.is_file() {
                log::debug!("No generated palette at {:?}", source);
                continue;
            }

            let copied = destination.parent()
                .map_or(Ok(()), fs::create_dir_all)
                .and_then(|_| fs::copy(source, destination));

            match copied {
                Ok(_) => log::info!("Copied {:?} -> {:?}", source, destination),
                Err(e) => problems.push(format!("{}: {}", destination.display(), e)),
            }
        }

        if problems.is_empty() {
            Outcome::Done
        } else {
            Outcome::Warning(problems.join("; "))
        }
    }

    fn sync_browser(&self) -> Outcome {
        if let Some(skipped) = self.require(&self.commands.tools().browser_sync) {
            return skipped;
        }
        self.run_step(&self.commands.update_browser(), Outcome::Warning)
    }

    fn restart_status_bar(&self) -> Outcome {
        if let Some(skipped) = self.require(&self.commands.tools().status_bar) {
            return skipped;
        }

        // pkill exits 1 when nothing was running, which is fine
        if let Err(e) = self.runner.run_status(&self.commands.stop_status_bar()) {
            log::warn!("Could not stop status bar: {}", e.user_friendly_message());
        }

        match self.runner.spawn_detached(&self.commands.start_status_bar()) {
            Ok(()) => Outcome::Done,
            Err(e) => Outcome::Warning(e.user_friendly_message()),
        }
    }

    fn reload_compositor(&self) -> Outcome {
        if let Some(skipped) = self.require(&self.commands.tools().compositor) {
            return skipped;
        }
        self.run_step(&self.commands.reload_compositor(), Outcome::Warning)
    }

    fn reload_terminal(&self) -> Outcome {
        let terminal = &self.commands.tools().terminal;
        if let Some(skipped) = self.require(terminal) {
            return skipped;
        }

        let pids = match self.runner.run_status(&self.commands.list_terminal_pids()) {
            Ok(output) => parse_pids(&output.stdout),
            Err(e) => return Outcome::Warning(e.user_friendly_message()),
        };

        if pids.is_empty() {
            return Outcome::Skipped(format!("no running {}", terminal));
        }

        let failed: Vec<String> = pids.iter()
            .filter_map(|pid| self.runner.signal_reload(*pid).err())
            .map(|e| e.user_friendly_message())
            .collect();

        if failed.is_empty() {
            log::info!("Reloaded {} {} instance(s)", pids.len(), terminal);
            Outcome::Done
        } else {
            Outcome::Warning(failed.join("; "))
        }
    }

    fn require(&self, tool: &str) -> Option<Outcome> {
        if self.available.is_available(tool) {
            None
        } else {
            Some(Outcome::Skipped(format!("{} not installed", tool)))
        }
    }

    fn run_step(
        &self,
        cmd: &walltheme_common::ToolCommand,
        on_error: fn(String) -> Outcome,
    ) -> Outcome {
        match self.runner.run(cmd) {
            Ok(_) => Outcome::Done,
            Err(e) => on_error(format!("{}: {}", cmd.program, e.user_friendly_message())),
        }
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Saves the run for `walltheme status`; never fatal.
pub fn record_state(report: &ApplyReport, state_file: &Path) {
    if let Err(e) = report.to_state().save(state_file) {
        log::warn!("Could not save last-applied state: {:#}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeRunner, TestDesktop};
    use walltheme_common::ToolSet;

    #[test]
    fn test_full_run_in_order() {
        let desktop = TestDesktop::new();
        desktop.install_gtk4_theme("oomox-sunset");
        desktop.write_palette("colors-kitty.conf", "kitty colors");
        let runner = FakeRunner::new().with_stdout("pgrep", "101\n202\n");

        let report = desktop.pipeline(&runner).apply(&desktop.wallpaper("sunset.jpg"), &desktop.mapping());

        assert_eq!(report.level(), Level::Info, "{:?}", report.steps);
        assert_eq!(report.summary(), "Wallpaper and themes applied successfully!");
        assert_eq!(runner.commands(), vec![
            "gsettings set org.gnome.desktop.interface gtk-theme oomox-sunset".to_string(),
            "gsettings set org.gnome.desktop.interface icon-theme oomox-sunset".to_string(),
            format!("swww img {}", desktop.active_file().display()),
            format!("wal -i {} --cols16", desktop.active_file().display()),
            "pywalfox update".to_string(),
            "pkill waybar".to_string(),
            "spawn waybar".to_string(),
            "hyprctl reload".to_string(),
            "pgrep kitty".to_string(),
        ]);
        assert_eq!(runner.signals(), vec![101, 202]);

        assert_eq!(std::fs::read(desktop.active_file()).unwrap(), std::fs::read(desktop.wallpaper("sunset.jpg").path).unwrap());
        assert!(desktop.gtk4_config_dir().join("gtk.css").is_file());
        assert_eq!(std::fs::read_to_string(desktop.palette_destination("colors-kitty.conf")).unwrap(), "kitty colors");
        assert!(!desktop.palette_destination("colors-waybar.css").exists());
    }

    #[test]
    fn test_default_theme_skips_theme_commands() {
        let desktop = TestDesktop::new();
        let runner = FakeRunner::new();

        let report = desktop.pipeline(&runner).apply(&desktop.wallpaper("forest.jpg"), &desktop.mapping());

        assert!(matches!(report.outcome(Step::Themes), Some(Outcome::Skipped(_))));
        assert!(runner.commands().iter().all(|c| !c.starts_with("gsettings")));
        assert_eq!(report.summary(), "Wallpaper and themes applied successfully!");
    }

    #[test]
    fn test_failed_copy_stops_the_run() {
        let desktop = TestDesktop::new();
        let runner = FakeRunner::new();
        let broken = desktop.write_wallpaper("broken.jpg", b"definitely not a jpeg");

        let report = desktop.pipeline(&runner).apply(&broken, &desktop.mapping());

        assert_eq!(report.level(), Level::Error);
        assert_eq!(report.steps.len(), 1);
        assert!(runner.commands().is_empty());
        assert!(report.summary().starts_with("Wallpaper application failed: copy wallpaper:"));
    }

    #[test]
    fn test_failures_do_not_stop_later_steps() {
        let desktop = TestDesktop::new();
        let runner = FakeRunner::new().failing("swww").failing("pywalfox");

        let report = desktop.pipeline(&runner).apply(&desktop.wallpaper("sunset.jpg"), &desktop.mapping());

        assert!(matches!(report.outcome(Step::SetWallpaper), Some(Outcome::Failed(_))));
        assert!(matches!(report.outcome(Step::BrowserSync), Some(Outcome::Warning(_))));
        assert_eq!(report.outcome(Step::ReloadCompositor), Some(&Outcome::Done));
        assert!(runner.commands().contains(&"hyprctl reload".to_string()));
        assert_eq!(report.level(), Level::Error);
        assert!(report.summary().contains("set wallpaper: swww"));
    }

    #[test]
    fn test_theme_warning_and_browser_warning_wording() {
        let desktop = TestDesktop::new();
        // no gtk4 theme installed, pywalfox fails
        let runner = FakeRunner::new().failing("pywalfox");

        let report = desktop.pipeline(&runner).apply(&desktop.wallpaper("sunset.jpg"), &desktop.mapping());

        assert_eq!(report.level(), Level::Warning);
        assert_eq!(
            report.summary(),
            "Wallpaper applied successfully! (Theme had minor issues) (Pywalfox update failed)"
        );
    }

    #[test]
    fn test_missing_optional_tools_are_skipped() {
        let desktop = TestDesktop::new();
        desktop.install_gtk4_theme("oomox-sunset");
        let runner = FakeRunner::new();
        let available: ToolAvailability = ToolSet::default()
            .required()
            .into_iter()
            .chain(["waybar", "hyprctl"])
            .map(str::to_string)
            .collect();

        let report = desktop.pipeline_with(&runner, available)
            .apply(&desktop.wallpaper("sunset.jpg"), &desktop.mapping());

        assert!(matches!(report.outcome(Step::BrowserSync), Some(Outcome::Skipped(_))));
        assert!(matches!(report.outcome(Step::ReloadTerminal), Some(Outcome::Skipped(_))));
        assert!(!runner.commands().iter().any(|c| c.starts_with("pywalfox") || c.starts_with("pgrep")));
        assert_eq!(report.level(), Level::Info);
    }

    #[test]
    fn test_no_running_terminal_is_not_a_problem() {
        let desktop = TestDesktop::new();
        desktop.install_gtk4_theme("oomox-sunset");
        let runner = FakeRunner::new();

        let report = desktop.pipeline(&runner).apply(&desktop.wallpaper("sunset.jpg"), &desktop.mapping());

        assert_eq!(report.outcome(Step::ReloadTerminal), Some(&Outcome::Skipped("no running kitty".to_string())));
        assert!(runner.signals().is_empty());
    }

    #[test]
    fn test_other_warnings_are_counted() {
        let desktop = TestDesktop::new();
        desktop.install_gtk4_theme("oomox-sunset");
        let runner = FakeRunner::new().failing("hyprctl");

        let report = desktop.pipeline(&runner).apply(&desktop.wallpaper("sunset.jpg"), &desktop.mapping());

        assert_eq!(
            report.summary(),
            "Wallpaper and themes applied successfully! (1 other step(s) reported problems)"
        );
    }

    #[test]
    fn test_record_state() {
        let desktop = TestDesktop::new();
        let runner = FakeRunner::new().failing("wal");
        let report = desktop.pipeline(&runner).apply(&desktop.wallpaper("forest.jpg"), &desktop.mapping());

        let state_file = desktop.root().join("state").join("state.json");
        record_state(&report, &state_file);

        let state = AppliedState::load(&state_file).unwrap().unwrap();
        assert_eq!(state.level, Level::Error);
        assert!(state.wallpaper.ends_with("forest.jpg"));
        let palette = state.steps.iter().find(|s| s.step == "generate palette").unwrap();
        assert_eq!(palette.level, Level::Error);
        assert!(palette.detail.as_deref().unwrap().starts_with("wal:"));
    }
}
