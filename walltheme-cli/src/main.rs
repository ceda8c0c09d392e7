use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use walltheme_common::error::DiscoveryError;
use walltheme_common::tools::{is_installed, preflight_in};
use walltheme_common::{
    preflight, AppliedState, CommandBuilder, CommandRunner, ErrorReporting, ImageDiscovery,
    Level, ProcessExecutor, ThemeMapping, ToolAvailability,
};
use walltheme_config::{Config, ResolvedPaths};

mod notify;
mod picker;
mod pipeline;
mod session;
#[cfg(test)]
mod test_support;

use notify::{ConsoleNotifier, DesktopNotifier, Notifications, Notifier};
use picker::Picker;
use pipeline::{record_state, ApplyPipeline};
use session::PickerSession;

#[derive(Parser)]
#[command(name = "walltheme")]
#[command(about = "walltheme (pick a wallpaper, retheme the desktop)")]
#[command(version)]
struct Cli {
    /// Configuration file (default: $XDG_CONFIG_HOME/walltheme/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactively pick and apply a wallpaper (default)
    Pick,

    /// Apply one wallpaper without the picker
    Apply {
        /// File name inside the wallpaper directory, or a path
        wallpaper: String,
    },

    /// List wallpapers with their configured theme
    List,

    /// Show the theme configured for a wallpaper
    Theme {
        wallpaper: String,
    },

    /// Show what was applied last
    Status,

    /// Write a default configuration file
    InitConfig,
}

fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn fail(message: &str) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::config_path().unwrap_or_else(|e| fail(&e.user_friendly_message())),
    };

    if let Some(Commands::InitConfig) = cli.command {
        return init_config(&config_path);
    }

    let config = Config::load_from_path(&config_path)
        .unwrap_or_else(|e| fail(&e.user_friendly_message()));
    let paths = config.resolve_paths()
        .unwrap_or_else(|e| fail(&e.user_friendly_message()));

    match cli.command.unwrap_or(Commands::Pick) {
        Commands::Pick => pick(&config, paths),
        Commands::Apply { wallpaper } => apply_one(&config, paths, &wallpaper),
        Commands::List => list(&config, &paths),
        Commands::Theme { wallpaper } => {
            let mapping = ThemeMapping::load_or_create(&paths.theme_mapping);
            println!("{}", mapping.describe(&wallpaper, &paths.theme_mapping));
            Ok(())
        }
        Commands::Status => status(),
        Commands::InitConfig => unreachable!("handled before the configuration is loaded"),
    }
}

/// Startup checks shared by every command that changes the desktop: the
/// wallpaper directory must exist and every required tool must be on the
/// search path (`PATH` when `search_path` is `None`).
fn startup(
    config: &Config,
    paths: &ResolvedPaths,
    search_path: Option<&OsStr>,
) -> walltheme_common::Result<ToolAvailability> {
    if !paths.wallpaper_dir.is_dir() {
        return Err(DiscoveryError::DirectoryRead {
            path: paths.wallpaper_dir.clone(),
            source: io::Error::new(io::ErrorKind::NotFound, "missing wallpaper directory"),
        }
        .into());
    }

    match search_path {
        Some(dirs) => preflight_in(&config.tools, dirs),
        None => preflight(&config.tools),
    }
}

fn checked_startup(config: &Config, paths: &ResolvedPaths) -> ToolAvailability {
    startup(config, paths, None).unwrap_or_else(|e| {
        e.log_error("Startup checks failed");
        fail(&e.user_friendly_message())
    })
}

fn notifications<'a, R: CommandRunner + 'a>(config: &Config, runner: &'a R) -> Notifications<'a> {
    let notifications = Notifications::new().with(ConsoleNotifier::new(io::stdout()));

    if config.notifications.desktop {
        if is_installed(&config.notifications.command) {
            return notifications.with(DesktopNotifier::new(runner, &config.notifications));
        }
        log::warn!(
            "Notification command '{}' not found in PATH, using the console only",
            config.notifications.command
        );
    }

    notifications
}

/// Everything the picker talks to besides the configuration.
struct PickerIo<'a, R: CommandRunner, I: BufRead, W: Write> {
    runner: &'a R,
    search_path: Option<&'a OsStr>,
    input: I,
    out: W,
    state_file: PathBuf,
}

/// Runs the startup checks, then the picker loop. Nothing is listed and no
/// command runs when a check fails.
fn launch_picker<R: CommandRunner, I: BufRead, W: Write>(
    config: &Config,
    paths: ResolvedPaths,
    ends: PickerIo<'_, R, I, W>,
) -> walltheme_common::Result<()> {
    let available = startup(config, &paths, ends.search_path)?;

    let wallpapers = ImageDiscovery::discover_wallpapers(&paths.wallpaper_dir, &config.paths.active_file)
        .unwrap_or_else(|e| {
            log::error!("Error loading wallpapers: {}", e.user_friendly_message());
            Vec::new()
        });

    let notifier = notifications(config, ends.runner);
    let session = PickerSession::new(wallpapers, paths.theme_mapping.clone());
    let wallpaper_dir = paths.wallpaper_dir.clone();
    let pipeline = ApplyPipeline::new(
        ends.runner,
        CommandBuilder::new(config.tools.clone()),
        available,
        paths,
    );

    let mut picker = Picker::new(
        session,
        pipeline,
        &notifier,
        ends.out,
        wallpaper_dir,
        config.paths.active_file.clone(),
    )
    .with_state_file(ends.state_file);

    picker.run(ends.input)?;
    Ok(())
}

fn pick(config: &Config, paths: ResolvedPaths) -> anyhow::Result<()> {
    let executor = ProcessExecutor::new();
    let ends = PickerIo {
        runner: &executor,
        search_path: None,
        input: io::stdin().lock(),
        out: io::stdout(),
        state_file: AppliedState::get_state_file(),
    };

    if let Err(e) = launch_picker(config, paths, ends) {
        e.log_error("Picker stopped");
        fail(&e.user_friendly_message());
    }
    Ok(())
}

fn apply_one(config: &Config, paths: ResolvedPaths, name: &str) -> anyhow::Result<()> {
    let available = checked_startup(config, &paths);

    let wallpaper = ImageDiscovery::resolve(name, &paths.wallpaper_dir, &config.paths.active_file)
        .unwrap_or_else(|e| fail(&e.user_friendly_message()));
    let mapping = ThemeMapping::load_or_create(&paths.theme_mapping);

    let executor = ProcessExecutor::new();
    let notifier = notifications(config, &executor);
    let pipeline = ApplyPipeline::new(
        &executor,
        CommandBuilder::new(config.tools.clone()),
        available,
        paths,
    );

    let report = pipeline.apply(&wallpaper, &mapping);
    record_state(&report, &AppliedState::get_state_file());
    notifier.notify(report.level(), &report.summary());

    if report.level() == Level::Error {
        std::process::exit(1);
    }
    Ok(())
}

fn list(config: &Config, paths: &ResolvedPaths) -> anyhow::Result<()> {
    let wallpapers = ImageDiscovery::discover_wallpapers(&paths.wallpaper_dir, &config.paths.active_file)
        .unwrap_or_else(|e| fail(&e.user_friendly_message()));
    let mapping = ThemeMapping::load_or_create(&paths.theme_mapping);

    for wallpaper in wallpapers {
        let theme = mapping.lookup(&wallpaper.file_name);
        println!(
            "{}\t{}\t{}\t{}",
            wallpaper.file_name, theme.gtk_theme, theme.icon_theme, theme.gtk4_theme
        );
    }
    Ok(())
}

fn status() -> anyhow::Result<()> {
    let state_file = AppliedState::get_state_file();
    let Some(state) = AppliedState::load(&state_file)? else {
        println!("Nothing applied yet");
        return Ok(());
    };

    let age = state.age();
    println!("Wallpaper: {}", state.wallpaper);
    println!(
        "Theme:     {} / {} / {}",
        state.theme.gtk_theme, state.theme.icon_theme, state.theme.gtk4_theme
    );
    println!(
        "Applied:   {} ({} min ago)",
        state.applied_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S"),
        age.num_minutes()
    );
    println!("Result:    {}", notify::console_line(state.level, &state.summary));

    for step in state.steps.iter().filter(|s| s.detail.is_some()) {
        println!("  {:<20} {}", step.step, step.detail.as_deref().unwrap_or_default());
    }
    Ok(())
}

fn init_config(path: &Path) -> anyhow::Result<()> {
    match Config::write_default(path) {
        Ok(true) => println!("✓ Wrote default configuration to {}", path.display()),
        Ok(false) => println!("Configuration already exists at {}", path.display()),
        Err(e) => fail(&e.user_friendly_message()),
    }
    Ok(())
}
