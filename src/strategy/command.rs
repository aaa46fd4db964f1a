/// External tool invocation for the script strategy.
///
/// Wraps a subprocess call with its arguments, runs it with a bounded
/// wait, and reports the exit status and captured output. On unix the
/// child leads its own process group so a timeout or cancellation stops
/// everything it started.

use super::CancelToken;
use crate::error::{ConvertError, Result};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

enum Outcome {
    Exited(ExitStatus),
    TimedOut,
    Cancelled,
}

/// Result of executing an external command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    pub success: bool,
    pub command_string: String,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

/// Builder for external tool commands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub description: String,
}

impl ToolCommand {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            working_dir: None,
            description: String::new(),
        }
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.args.push(arg.to_string());
        self
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    pub fn working_dir(mut self, dir: &Path) -> Self {
        self.working_dir = Some(dir.to_path_buf());
        self
    }

    pub fn describe(mut self, desc: &str) -> Self {
        self.description = desc.to_string();
        self
    }

    /// Build the command string for logging/display
    pub fn to_command_string(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.clone());
        parts.join(" ")
    }

    /// Run to completion. The child's process group is killed when
    /// `timeout` elapses or `cancel` fires.
    pub fn execute(&self, timeout: Duration, cancel: &CancelToken) -> Result<CommandResult> {
        if cancel.is_cancelled() {
            return Err(ConvertError::Cancelled);
        }

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let command_string = self.to_command_string();
        log::info!("Executing: {}", command_string);

        let mut child = cmd.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConvertError::ToolNotInstalled(self.program.clone()),
            _ => ConvertError::io(&self.program, e),
        })?;
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let outcome = match wait_for(&mut child, timeout, cancel) {
            Ok(outcome) => outcome,
            Err(e) => {
                kill_group(&mut child);
                let _ = stdout.join();
                let _ = stderr.join();
                return Err(ConvertError::io(&self.program, e));
            }
        };
        let status = match outcome {
            Outcome::Exited(status) => status,
            Outcome::Cancelled => {
                kill_group(&mut child);
                let _ = stdout.join();
                let _ = stderr.join();
                log::warn!("Cancelled: {}", command_string);
                return Err(ConvertError::Cancelled);
            }
            Outcome::TimedOut => {
                kill_group(&mut child);
                let _ = stdout.join();
                let _ = stderr.join();
                log::warn!("Timed out after {}s: {}", timeout.as_secs(), command_string);
                return Err(ConvertError::Timeout {
                    command: command_string,
                    seconds: timeout.as_secs(),
                });
            }
        };

        let result = CommandResult {
            success: status.success(),
            command_string,
            stdout: stdout.join().unwrap_or_default(),
            stderr: stderr.join().unwrap_or_default(),
            exit_code: status.code(),
        };

        if !result.success {
            log::warn!(
                "Command failed (exit {}): {}\nstderr: {}",
                result.exit_code.unwrap_or(-1),
                result.command_string,
                result.stderr
            );
        }
        Ok(result)
    }
}

/// Read a child pipe to the end on its own thread.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut p) = pipe {
            let _ = p.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).to_string()
    })
}

fn wait_for(child: &mut Child, timeout: Duration, cancel: &CancelToken) -> std::io::Result<Outcome> {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Outcome::Exited(status));
        }
        if cancel.is_cancelled() {
            return Ok(Outcome::Cancelled);
        }
        if start.elapsed() >= timeout {
            return Ok(Outcome::TimedOut);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Kill the child and every process in its group, then reap the child.
#[cfg(unix)]
fn kill_group(child: &mut Child) {
    let pgid = child.id() as libc::pid_t;
    // SAFETY: killpg takes plain integers and only sends a signal.
    let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if rc != 0 {
        log::debug!("killpg({}) failed: {}", pgid, std::io::Error::last_os_error());
        let _ = child.kill();
    }
    let _ = child.wait();
}

#[cfg(not(unix))]
fn kill_group(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Locate an executable.
///
/// Checks PATH first, then `$NMR_BASE/bin`, then the common NMRPipe
/// installation directories.
pub fn find_tool(name: &str) -> Option<PathBuf> {
    if let Some(paths) = std::env::var_os("PATH") {
        for dir in std::env::split_paths(&paths) {
            let p = dir.join(name);
            if p.is_file() {
                return Some(p);
            }
        }
    }

    if let Ok(nmr_base) = std::env::var("NMR_BASE") {
        let p = Path::new(&nmr_base).join("bin").join(name);
        if p.is_file() {
            return Some(p);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let home_paths = [
            format!("{}/NMRPipe/nmrbin.linux239_64/{}", home, name),
            format!("{}/nmrpipe/bin/{}", home, name),
        ];
        for p in &home_paths {
            if Path::new(p).is_file() {
                return Some(PathBuf::from(p));
            }
        }
    }

    let system_paths = ["/usr/local/nmrpipe/bin", "/opt/nmrpipe/bin"];
    system_paths
        .iter()
        .map(|d| Path::new(d).join(name))
        .find(|p| p.is_file())
}
