use std::cell::RefCell;
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Stdio};
use rustix::process::{kill_process, Pid, Signal};
use crate::command_builder::ToolCommand;
use crate::error::{ProcessError, WallthemeError};
use crate::Result;

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Seam between the apply pipeline and the operating system.
pub trait CommandRunner {
    /// Runs to completion; a non-zero exit is an error.
    fn run(&self, command: &ToolCommand) -> Result<CommandOutput>;

    /// Runs to completion and reports the exit status without judging it.
    fn run_status(&self, command: &ToolCommand) -> Result<CommandOutput>;

    /// Starts a long-lived program in its own process group and does not
    /// wait for it.
    fn spawn_detached(&self, command: &ToolCommand) -> Result<()>;

    /// Asks a running process to reload its configuration (SIGUSR1).
    fn signal_reload(&self, pid: i32) -> Result<()>;
}

/// Runs tools as child processes of the current session.
///
/// Detached children are kept until they exit so they can be reaped.
#[derive(Debug, Default)]
pub struct ProcessExecutor {
    detached: RefCell<Vec<Child>>,
}

impl ProcessExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects detached children that have exited since the last call.
    fn reap_detached(&self) {
        self.detached.borrow_mut().retain_mut(|child| match child.try_wait() {
            Ok(Some(status)) => {
                log::debug!("Detached pid {} exited with {}", child.id(), status);
                false
            }
            Ok(None) => true,
            Err(e) => {
                log::warn!("Could not poll detached pid {}: {}", child.id(), e);
                false
            }
        });
    }

    #[cfg(test)]
    fn detached_count(&self) -> usize {
        self.reap_detached();
        self.detached.borrow().len()
    }

    fn session_command(command: &ToolCommand) -> Command {
        let mut cmd = command.to_command();

        // Set environment variables from current session, with fallbacks
        if let Ok(display) = std::env::var("WAYLAND_DISPLAY") {
            cmd.env("WAYLAND_DISPLAY", display);
        } else {
            cmd.env("WAYLAND_DISPLAY", "wayland-0");
        }

        if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
            cmd.env("XDG_RUNTIME_DIR", runtime_dir);
        } else {
            let uid = unsafe { libc::getuid() };
            cmd.env("XDG_RUNTIME_DIR", format!("/run/user/{}", uid));
        }

        if let Ok(session_type) = std::env::var("XDG_SESSION_TYPE") {
            cmd.env("XDG_SESSION_TYPE", session_type);
        } else {
            cmd.env("XDG_SESSION_TYPE", "wayland");
        }

        cmd
    }

    fn execute(command: &ToolCommand) -> Result<CommandOutput> {
        let mut cmd = Self::session_command(command);
        log::info!("Executing: {}", command);

        let output = cmd.output()
            .map_err(|e| WallthemeError::Process(ProcessError::Execution {
                command: command.to_string(),
                source: e,
            }))?;

        let result = CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        if !result.stdout.is_empty() {
            log::debug!("{} stdout: {}", command.program, result.stdout.trim_end());
        }

        Ok(result)
    }
}

impl CommandRunner for ProcessExecutor {
    fn run(&self, command: &ToolCommand) -> Result<CommandOutput> {
        let output = Self::execute(command)?;

        if !output.success() {
            let code = output.code.unwrap_or(-1);
            log::error!("{} failed with exit code {}: {}", command, code, output.stderr.trim_end());

            return Err(WallthemeError::Process(ProcessError::NonZeroExit {
                code,
                stderr: output.stderr,
            }));
        }

        Ok(output)
    }

    fn run_status(&self, command: &ToolCommand) -> Result<CommandOutput> {
        let output = Self::execute(command)?;
        if !output.success() {
            log::debug!("{} exited with {:?}", command, output.code);
        }
        Ok(output)
    }

    fn spawn_detached(&self, command: &ToolCommand) -> Result<()> {
        self.reap_detached();

        // own process group: Ctrl-C or a closed terminal must not reach it
        let mut cmd = Self::session_command(command);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .process_group(0);

        log::info!("Spawning: {}", command);
        let child = cmd.spawn()
            .map_err(|e| WallthemeError::Process(ProcessError::Execution {
                command: command.to_string(),
                source: e,
            }))?;

        log::debug!("{} started with pid {}", command.program, child.id());
        self.detached.borrow_mut().push(child);
        Ok(())
    }

    fn signal_reload(&self, pid: i32) -> Result<()> {
        let target = Pid::from_raw(pid)
            .ok_or_else(|| WallthemeError::Process(ProcessError::Signal {
                pid,
                message: "invalid pid".to_string(),
            }))?;

        kill_process(target, Signal::Usr1)
            .map_err(|e| WallthemeError::Process(ProcessError::Signal {
                pid,
                message: e.to_string(),
            }))
    }
}

/// Parses `pgrep` output into process ids, ignoring blank or garbled lines.
pub fn parse_pids(stdout: &str) -> Vec<i32> {
    stdout
        .lines()
        .filter_map(|line| line.trim().parse::<i32>().ok())
        .filter(|pid| *pid > 0)
        .collect()
}
