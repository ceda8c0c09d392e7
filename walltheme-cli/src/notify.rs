use std::io::Write;
use std::cell::RefCell;
use walltheme_common::{CommandRunner, ErrorReporting, Level, ToolCommand};
use walltheme_config::NotificationConfig;

pub trait Notifier {
    fn notify(&self, level: Level, message: &str);
}

/// Prints to the terminal the picker runs in.
pub struct ConsoleNotifier<W: Write> {
    out: RefCell<W>,
}

impl<W: Write> ConsoleNotifier<W> {
    pub fn new(out: W) -> Self {
        Self { out: RefCell::new(out) }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

pub fn console_line(level: Level, message: &str) -> String {
    match level {
        Level::Info => format!("✓ {}", message),
        Level::Warning => format!("! Warning: {}", message),
        Level::Error => format!("✗ Error: {}", message),
    }
}

impl<W: Write> Notifier for ConsoleNotifier<W> {
    fn notify(&self, level: Level, message: &str) {
        if let Err(e) = writeln!(self.out.borrow_mut(), "{}", console_line(level, message)) {
            log::warn!("Could not print notification: {}", e);
        }
    }
}

/// Sends desktop notifications through the notification daemon's CLI.
pub struct DesktopNotifier<'a, R: CommandRunner> {
    runner: &'a R,
    command: String,
    app_name: String,
}

impl<'a, R: CommandRunner> DesktopNotifier<'a, R> {
    pub fn new(runner: &'a R, config: &NotificationConfig) -> Self {
        Self {
            runner,
            command: config.command.clone(),
            app_name: config.app_name.clone(),
        }
    }

    pub fn build(&self, level: Level, message: &str) -> ToolCommand {
        let (urgency, summary) = match level {
            Level::Info => ("low", "Wallpaper"),
            Level::Warning => ("normal", "Wallpaper warning"),
            Level::Error => ("critical", "Wallpaper error"),
        };

        ToolCommand::new(&self.command)
            .args(["-a", self.app_name.as_str(), "-u", urgency, summary, message])
    }
}

impl<R: CommandRunner> Notifier for DesktopNotifier<'_, R> {
    fn notify(&self, level: Level, message: &str) {
        if let Err(e) = self.runner.run(&self.build(level, message)) {
            log::warn!("Desktop notification failed: {}", e.user_friendly_message());
        }
    }
}

/// Console always; desktop as well when enabled.
pub struct Notifications<'a> {
    sinks: Vec<Box<dyn Notifier + 'a>>,
}

impl<'a> Notifications<'a> {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn with(mut self, sink: impl Notifier + 'a) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }
}

impl Notifier for Notifications<'_> {
    fn notify(&self, level: Level, message: &str) {
        for sink in &self.sinks {
            sink.notify(level, message);
        }
    }
}
