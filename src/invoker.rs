use crate::error::ItemError;
use std::env;
use std::ffi::{OsStr, OsString};
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use tracing::{debug, info};

/// A fully built command line for an external tool.
#[derive(Debug, Clone, Default)]
pub struct ToolInvocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub cwd: Option<PathBuf>,
    /// Log tool output line by line while it runs. Output is captured
    /// either way.
    pub echo: bool,
}

impl ToolInvocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Push `flag value` as two arguments.
    pub fn flag(self, flag: &str, value: impl AsRef<OsStr>) -> Self {
        self.arg(flag).arg(value)
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Shell-like rendering for logs. Arguments with spaces are quoted.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .map(|part| {
                let part = part.to_string_lossy();
                if part.contains(' ') {
                    format!("\"{}\"", part)
                } else {
                    part.into_owned()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// What a finished tool run left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Turn a non-zero exit into `ItemError::ToolFailed`, keeping the
    /// captured streams for diagnosis.
    pub fn into_result(self) -> Result<ToolOutput, ItemError> {
        if self.success() {
            Ok(self)
        } else {
            Err(ItemError::ToolFailed {
                code: self.exit_code,
                stdout: self.stdout,
                stderr: self.stderr,
            })
        }
    }
}

/// Runs an external process to completion and reports what happened.
///
/// `Err` is reserved for runs that never started (tool missing, spawn
/// failure); a non-zero exit comes back as `Ok` with the exit code set.
pub trait ToolRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ItemError>;
}

/// `ToolRunner` backed by `std::process::Command`. Blocks until the child
/// exits.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl ToolRunner for ProcessRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ItemError> {
        let program = resolve_program(&invocation.program)
            .ok_or_else(|| ItemError::ToolNotFound(invocation.program.clone()))?;

        debug!("Running: {}", invocation.command_line());

        let mut command = Command::new(&program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &invocation.cwd {
            command.current_dir(cwd);
        }

        let mut child = command.spawn().map_err(|source| ItemError::Spawn {
            program: program.clone(),
            source,
        })?;

        let echo = invocation.echo;
        let stdout_reader = child
            .stdout
            .take()
            .map(|pipe| thread::spawn(move || drain(pipe, echo, "stdout")));
        let stderr_reader = child
            .stderr
            .take()
            .map(|pipe| thread::spawn(move || drain(pipe, echo, "stderr")));

        let status = child.wait()?;

        let stdout = stdout_reader
            .and_then(|h| h.join().ok())
            .unwrap_or_default();
        let stderr = stderr_reader
            .and_then(|h| h.join().ok())
            .unwrap_or_default();

        debug!("{} exited with {:?}", program.display(), status.code());
        Ok(ToolOutput {
            exit_code: status.code(),
            stdout,
            stderr,
        })
    }
}

fn drain(pipe: impl Read, echo: bool, stream: &str) -> String {
    let mut reader = BufReader::new(pipe);
    let mut captured = String::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                if echo {
                    info!(target: "tool", "[{}] {}", stream, line.trim_end());
                }
                captured.push_str(&line);
            }
        }
    }
    captured
}

/// Locate the executable. Paths with a directory part must exist as given;
/// bare names are looked up on `PATH`.
pub fn resolve_program(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 || program.is_absolute() {
        return program.is_file().then(|| program.to_path_buf());
    }

    let path_var = env::var_os("PATH")?;
    env::split_paths(&path_var).find_map(|dir| {
        let candidate = dir.join(program);
        if candidate.is_file() {
            return Some(candidate);
        }
        if cfg!(windows) && candidate.extension().is_none() {
            let exe = candidate.with_extension("exe");
            if exe.is_file() {
                return Some(exe);
            }
        }
        None
    })
}
