use std::collections::BTreeMap;
use std::fs::File;
use std::io;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

/// Full environment handed to a child process.
pub type Environment = BTreeMap<String, String>;

/// Snapshot of this process's environment; non-UTF-8 entries are skipped.
pub fn inherited_env() -> Environment {
    std::env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .collect()
}

/// What to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Program {
    /// Executed directly; `argv[0]` is the program.
    Argv(Vec<String>),
    /// Handed to `sh -c`.
    Shell(String),
}

impl Program {
    /// The command as an argument vector, for records and logs.
    pub fn argv(&self) -> Vec<String> {
        match self {
            Program::Argv(argv) => argv.clone(),
            Program::Shell(line) => vec!["sh".to_string(), "-c".to_string(), line.clone()],
        }
    }
}

/// Files receiving the child's stdout and stderr.
#[derive(Debug, Clone, Copy)]
pub struct Capture<'a> {
    pub stdout: &'a Path,
    pub stderr: &'a Path,
}

/// Run `program` to completion and return its exit code.
///
/// Blocks until the child exits; no timeout is applied. The child sees
/// exactly `env`. Without `capture` the child inherits our stdout/stderr.
/// Termination by signal `n` is reported as `-n`.
pub fn run_cmd(
    program: &Program,
    cwd: &Path,
    env: &Environment,
    capture: Option<Capture<'_>>,
) -> io::Result<i32> {
    let mut command = match program {
        Program::Argv(argv) => {
            let (exe, args) = argv
                .split_first()
                .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command"))?;
            let mut command = Command::new(exe);
            command.args(args);
            command
        }
        Program::Shell(line) => {
            let mut command = Command::new("sh");
            command.arg("-c").arg(line);
            command
        }
    };

    command.current_dir(cwd).env_clear().envs(env).stdin(Stdio::null());

    if let Some(capture) = capture {
        command
            .stdout(File::create(capture.stdout)?)
            .stderr(File::create(capture.stderr)?);
    }

    let status = command.status()?;
    Ok(exit_code(status))
}

/// Run `argv` with the inherited environment and return its trimmed
/// stdout, or `None` if it cannot be run or exits non-zero.
pub fn read_stdout(argv: &[&str]) -> Option<String> {
    let (exe, args) = argv.split_first()?;
    let output = Command::new(exe)
        .args(args)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!text.is_empty()).then_some(text)
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    -1
}
