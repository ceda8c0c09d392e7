use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use walltheme_common::{CommandRunner, ErrorReporting, Level};

use crate::notify::Notifier;
use crate::pipeline::{record_state, ApplyPipeline, Outcome};
use crate::session::PickerSession;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Select(usize),
    Apply,
    Reload,
    List,
    Help,
    Quit,
    Unknown(String),
    Nothing,
}

impl Action {
    /// Numbers are 1-based, as printed in the list.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Action::Nothing;
        }

        if let Ok(n) = line.parse::<usize>() {
            return match n.checked_sub(1) {
                Some(index) => Action::Select(index),
                None => Action::Unknown(line.to_string()),
            };
        }

        match line.to_lowercase().as_str() {
            "a" | "apply" => Action::Apply,
            "r" | "reload" => Action::Reload,
            "l" | "list" => Action::List,
            "h" | "help" | "?" => Action::Help,
            "q" | "quit" | "exit" => Action::Quit,
            _ => Action::Unknown(line.to_string()),
        }
    }
}

const HELP: &str = "\
  <n>  select wallpaper n
  a    apply the selected wallpaper
  r    reload the theme mapping
  l    list wallpapers again
  q    quit";

/// Line-oriented wallpaper picker. Applying blocks the loop until every
/// step has run.
pub struct Picker<'a, R: CommandRunner, W: Write> {
    session: PickerSession,
    pipeline: ApplyPipeline<'a, R>,
    notifier: &'a dyn Notifier,
    out: W,
    wallpaper_dir: PathBuf,
    active_file: String,
    state_file: Option<PathBuf>,
}

impl<'a, R: CommandRunner, W: Write> Picker<'a, R, W> {
    pub fn new(
        session: PickerSession,
        pipeline: ApplyPipeline<'a, R>,
        notifier: &'a dyn Notifier,
        out: W,
        wallpaper_dir: PathBuf,
        active_file: String,
    ) -> Self {
        Self {
            session,
            pipeline,
            notifier,
            out,
            wallpaper_dir,
            active_file,
            state_file: None,
        }
    }

    pub fn with_state_file(mut self, state_file: PathBuf) -> Self {
        self.state_file = Some(state_file);
        self
    }

    #[cfg(test)]
    pub fn session(&self) -> &PickerSession {
        &self.session
    }

    pub fn run(&mut self, input: impl BufRead) -> io::Result<()> {
        self.print_list()?;
        self.prompt()?;

        for line in input.lines() {
            match Action::parse(&line?) {
                Action::Quit => break,
                action => self.handle(action)?,
            }
            self.prompt()?;
        }

        writeln!(self.out)?;
        Ok(())
    }

    fn handle(&mut self, action: Action) -> io::Result<()> {
        match action {
            Action::Select(index) => match self.session.select(index) {
                Ok(info) => {
                    let name = self.session.selected().map(|w| w.file_name.clone()).unwrap_or_default();
                    writeln!(self.out, "Selected {}\n{}", name, info)?;
                }
                Err(e) => writeln!(self.out, "{}", e.user_friendly_message())?,
            },
            Action::Apply => self.apply()?,
            Action::Reload => {
                let info = self.session.reload();
                self.notifier.notify(Level::Info, "Theme configuration reloaded!");
                if let Some(info) = info {
                    writeln!(self.out, "{}", info)?;
                }
            }
            Action::List => {
                if let Err(e) = self.session.rescan(&self.wallpaper_dir, &self.active_file) {
                    self.notifier.notify(
                        Level::Error,
                        &format!("Error loading wallpapers: {}", e.user_friendly_message()),
                    );
                }
                self.print_list()?;
            }
            Action::Help => writeln!(self.out, "{}", HELP)?,
            Action::Unknown(text) => writeln!(self.out, "Unknown command: {} (h for help)", text)?,
            Action::Nothing | Action::Quit => {}
        }
        Ok(())
    }

    fn apply(&mut self) -> io::Result<()> {
        let Some(selected) = self.session.selected() else {
            writeln!(self.out, "Select a wallpaper first.")?;
            return Ok(());
        };

        writeln!(self.out, "Applying {}...", selected.file_name)?;
        self.out.flush()?;

        let Some(report) = self.session.apply(&self.pipeline) else {
            return Ok(());
        };

        for step in &report.steps {
            match &step.outcome {
                Outcome::Done => {}
                Outcome::Skipped(why) => writeln!(self.out, "  - {}: skipped ({})", step.step, why)?,
                Outcome::Warning(msg) => writeln!(self.out, "  - {}: {}", step.step, msg)?,
                Outcome::Failed(msg) => writeln!(self.out, "  - {}: failed: {}", step.step, msg)?,
            }
        }

        if let Some(state_file) = &self.state_file {
            record_state(&report, state_file);
        }

        self.notifier.notify(report.level(), &report.summary());
        Ok(())
    }

    fn print_list(&mut self) -> io::Result<()> {
        writeln!(self.out, "Select Wallpaper")?;
        let selected = self.session.selected().map(|w| w.path.clone());

        for (i, wallpaper) in self.session.wallpapers().iter().enumerate() {
            let marker = if selected.as_ref() == Some(&wallpaper.path) { '*' } else { ' ' };
            let theme = self.session.mapping().lookup(&wallpaper.file_name);
            writeln!(self.out, "{}{:>3}) {}  [{}]", marker, i + 1, wallpaper.file_name, theme.gtk_theme)?;
        }
        Ok(())
    }

    fn prompt(&mut self) -> io::Result<()> {
        write!(self.out, "> ")?;
        self.out.flush()
    }
}
