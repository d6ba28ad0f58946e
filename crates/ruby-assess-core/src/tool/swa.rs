use std::cell::OnceCell;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

use super::classify::Classifier;
use crate::config::{ConfigError, ToolConfig};
use crate::error::AssessError;
use crate::exec::{
    Capture, Environment, Program, StatusLog, inherited_env, posix_epoch, read_stdout, run_cmd,
    unpack_archive,
};
use crate::summary::Execution;

pub const TOOL_INSTALL_OUT: &str = "tool_install.out";
pub const TOOL_INSTALL_ERR: &str = "tool_install.err";

/// Exit code recorded for an assessment command that could not be started.
pub const SPAWN_FAILURE_EXIT_CODE: i32 = 127;

const GEM_USER_DIR_CMD: [&str; 5] = ["ruby", "-r", "rubygems", "-e", "puts Gem.user_dir"];

/// Which gem variables the tool's environment receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GemEnv {
    /// `PATH`, `GEM_HOME` and `GEM_PATH`.
    Full,
    /// `PATH` and `GEM_PATH` only.
    PathOnly,
}

/// Directories a driver works in.
#[derive(Debug, Clone)]
pub struct ToolDirs {
    /// Holds `tool.conf`, the tool archive and the command template.
    pub input: PathBuf,
    /// Receives install output and the status log.
    pub output: PathBuf,
    /// The tool archive is unpacked here.
    pub tool: PathBuf,
}

/// State and behaviour shared by every driver.
#[derive(Debug)]
pub struct SwaTool {
    conf: ToolConfig,
    dirs: ToolDirs,
    classifier: Classifier,
    gem_env: GemEnv,
    gem_user_dir: OnceCell<Option<String>>,
}

impl SwaTool {
    pub fn new(conf: ToolConfig, dirs: ToolDirs) -> Result<Self, ConfigError> {
        Ok(Self {
            classifier: Classifier::from_conf(&conf)?,
            conf,
            dirs,
            gem_env: GemEnv::Full,
            gem_user_dir: OnceCell::new(),
        })
    }

    /// Resolve the configuration found in `dirs.input`.
    pub fn load(dirs: ToolDirs) -> Result<Self, ConfigError> {
        let conf = ToolConfig::load(&dirs.input)?;
        Self::new(conf, dirs)
    }

    pub fn with_gem_env(mut self, gem_env: GemEnv) -> Self {
        self.gem_env = gem_env;
        self
    }

    /// Use `dir` as the gem user directory instead of asking Ruby.
    /// `None` leaves the inherited environment untouched.
    pub fn with_gem_user_dir(mut self, dir: Option<String>) -> Self {
        self.gem_user_dir = OnceCell::from(dir);
        self
    }

    pub fn conf(&self) -> &ToolConfig {
        &self.conf
    }

    pub fn dirs(&self) -> &ToolDirs {
        &self.dirs
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn gem_env(&self) -> GemEnv {
        self.gem_env
    }

    /// `<tool dir>/<tool-dir>`: where the unpacked tool lives.
    pub fn install_dir(&self) -> PathBuf {
        self.dirs
            .tool
            .join(self.conf.get("tool-dir").unwrap_or_default())
    }

    /// Files capturing the install command's output.
    pub fn install_outputs(&self) -> (PathBuf, PathBuf) {
        (
            self.dirs.output.join(TOOL_INSTALL_OUT),
            self.dirs.output.join(TOOL_INSTALL_ERR),
        )
    }

    /// Unpack `tool-archive` into the tool directory.
    pub fn unarchive(&self, status: &StatusLog) -> Result<(), AssessError> {
        status.run_task("tool-unarchive", |_| -> Result<(), AssessError> {
            let archive = self.dirs.input.join(self.conf.require("tool-archive")?);
            unpack_archive(&archive, &self.dirs.tool)?;
            Ok(())
        })
    }

    fn gem_user_dir(&self) -> Option<&str> {
        self.gem_user_dir
            .get_or_init(|| {
                let dir = read_stdout(&GEM_USER_DIR_CMD);
                if dir.is_none() {
                    warn!("cannot determine the gem user directory; using the inherited environment");
                }
                dir
            })
            .as_deref()
    }

    /// Environment for install and assessment commands: the inherited one
    /// with the gem user directory prepended to `PATH`.
    pub fn env(&self) -> Environment {
        let mut env = inherited_env();
        let Some(gem_dir) = self.gem_user_dir() else {
            return env;
        };

        let path = env.get("PATH").cloned().unwrap_or_default();
        env.insert("PATH".to_string(), format!("{gem_dir}/bin:{path}"));
        if self.gem_env == GemEnv::Full {
            env.insert("GEM_HOME".to_string(), gem_dir.to_string());
        }
        env.insert("GEM_PATH".to_string(), gem_dir.to_string());
        env
    }

    /// Install the tool, logging the outcome as task `tool-install`.
    pub fn install(&mut self, status: &StatusLog) -> Result<Option<Execution>, AssessError> {
        self.install_with(status, |_| {})
    }

    /// Without `tool-install-cmd` only the executable path is resolved and
    /// the task is skipped. Otherwise the command runs through the shell in
    /// the install directory; `on_failure` sees a failed run before the
    /// error is returned.
    pub fn install_with<F>(
        &mut self,
        status: &StatusLog,
        on_failure: F,
    ) -> Result<Option<Execution>, AssessError>
    where
        F: FnOnce(&Execution),
    {
        let install_cmd = self.conf.get("tool-install-cmd").map(str::to_string);

        status.run_task("tool-install", |task| -> Result<Option<Execution>, AssessError> {
            let Some(install_cmd) = install_cmd else {
                let executable =
                    normalize(&self.install_dir().join(self.conf.require("executable")?));
                info!(executable = %executable.display(), "no install command");
                self.conf.set("executable", executable.display().to_string());
                task.skip(None);
                return Ok(None);
            };

            info!(command = %install_cmd, "installing tool");
            let execution = self.run_install(&install_cmd)?;
            debug!(environment = ?execution.environment, "install environment");

            if execution.exit_code != 0 {
                on_failure(&execution);
                return Err(AssessError::InstallFailed {
                    command: install_cmd,
                    exit_code: execution.exit_code,
                });
            }
            Ok(Some(execution))
        })
    }

    fn run_install(&self, install_cmd: &str) -> Result<Execution, AssessError> {
        let program = Program::Shell(install_cmd.to_string());
        let cwd = self.install_dir();
        let (stdout, stderr) = self.install_outputs();
        let environment = self.env();

        let start_ts = posix_epoch();
        let exit_code = run_cmd(
            &program,
            &cwd,
            &environment,
            Some(Capture {
                stdout: &stdout,
                stderr: &stderr,
            }),
        )
        .map_err(|source| AssessError::Spawn {
            command: install_cmd.to_string(),
            source,
        })?;

        Ok(Execution {
            argv: program.argv(),
            cwd,
            environment,
            exit_code,
            start_ts,
            stop_ts: posix_epoch(),
        })
    }

    /// Run one assessment command in `cwd`. A command that cannot be
    /// started is recorded with [`SPAWN_FAILURE_EXIT_CODE`] and the reason
    /// written to `stderr`.
    pub fn invoke(&self, argv: Vec<String>, cwd: &Path, stdout: &Path, stderr: &Path) -> Execution {
        info!(command = ?argv, "running assessment");
        let program = Program::Argv(argv);
        let environment = self.env();

        let start_ts = posix_epoch();
        let exit_code = match run_cmd(&program, cwd, &environment, Some(Capture { stdout, stderr })) {
            Ok(code) => code,
            Err(err) => {
                warn!(command = ?program.argv(), "failed to start assessment: {err}");
                if let Err(write_err) = fs::write(stderr, format!("{err}\n")) {
                    warn!(path = %stderr.display(), "{write_err}");
                }
                SPAWN_FAILURE_EXIT_CODE
            }
        };
        let stop_ts = posix_epoch();

        info!(cwd = %cwd.display(), exit_code, "assessment finished");
        debug!(environment = ?environment, "assessment environment");

        Execution {
            argv: program.argv(),
            cwd: cwd.to_path_buf(),
            environment,
            exit_code,
            start_ts,
            stop_ts,
        }
    }
}

/// Lexically normalise `path`: drop `.` and fold `..` into its parent.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn tool(dir: &Path, pairs: &[(&str, &str)]) -> SwaTool {
        let conf: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let conf = ToolConfig::resolve(None, &conf, &BTreeMap::new()).unwrap();
        let dirs = ToolDirs {
            input: dir.join("in"),
            output: dir.join("out"),
            tool: dir.join("tool"),
        };
        for d in [&dirs.input, &dirs.output, &dirs.tool] {
            fs::create_dir_all(d).unwrap();
        }
        SwaTool::new(conf, dirs).unwrap()
    }

    #[test]
    fn normalize_folds_dot_segments() {
        assert_eq!(
            normalize(Path::new("/tools/reek-6/./bin/../bin/reek")),
            PathBuf::from("/tools/reek-6/bin/reek")
        );
    }

    #[test]
    fn gem_env_variants() {
        let dir = tempfile::tempdir().unwrap();
        let full = tool(dir.path(), &[("tool-type", "reek")])
            .with_gem_user_dir(Some("/home/u/.gem/ruby/2.7.0".into()));
        let env = full.env();
        assert!(env["PATH"].starts_with("/home/u/.gem/ruby/2.7.0/bin:"));
        assert_eq!(env["GEM_HOME"], "/home/u/.gem/ruby/2.7.0");
        assert_eq!(env["GEM_PATH"], "/home/u/.gem/ruby/2.7.0");

        let narrow = tool(dir.path(), &[("tool-type", "dawnscanner")])
            .with_gem_env(GemEnv::PathOnly)
            .with_gem_user_dir(Some("/gems".into()));
        let env = narrow.env();
        assert_eq!(env["GEM_PATH"], "/gems");
        assert_eq!(env.get("GEM_HOME"), inherited_env().get("GEM_HOME"));
    }

    #[test]
    fn missing_ruby_leaves_environment_alone() {
        let dir = tempfile::tempdir().unwrap();
        let t = tool(dir.path(), &[("tool-type", "reek")]).with_gem_user_dir(None);
        assert_eq!(t.env(), inherited_env());
    }

    #[test]
    fn install_without_command_resolves_the_executable() {
        let dir = tempfile::tempdir().unwrap();
        let mut t = tool(
            dir.path(),
            &[
                ("tool-type", "rubocop"),
                ("tool-dir", "rubocop-1.0"),
                ("executable", "./bin/rubocop"),
            ],
        )
        .with_gem_user_dir(None);
        let status = StatusLog::in_dir(&t.dirs().output.clone());

        assert_eq!(t.install(&status).unwrap(), None);
        assert_eq!(
            t.conf().get("executable").map(PathBuf::from),
            Some(dir.path().join("tool/rubocop-1.0/bin/rubocop"))
        );
        let log = fs::read_to_string(status.path()).unwrap();
        assert_eq!(log, "SKIP: tool-install\n");
    }

    #[test]
    fn install_command_runs_in_the_install_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut t = tool(
            dir.path(),
            &[
                ("tool-type", "reek"),
                ("tool-dir", "reek-6"),
                ("tool-install-cmd", "pwd; echo installed >&2"),
            ],
        )
        .with_gem_user_dir(None);
        fs::create_dir_all(t.install_dir()).unwrap();
        let status = StatusLog::in_dir(&t.dirs().output.clone());

        let execution = t.install(&status).unwrap().unwrap();
        assert_eq!(execution.exit_code, 0);
        assert_eq!(execution.argv, vec!["sh", "-c", "pwd; echo installed >&2"]);

        let (out, err) = t.install_outputs();
        assert!(fs::read_to_string(out).unwrap().trim().ends_with("reek-6"));
        assert_eq!(fs::read_to_string(err).unwrap(), "installed\n");
    }

    #[test]
    fn failed_install_is_fatal_and_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut t = tool(
            dir.path(),
            &[("tool-type", "reek"), ("tool-install-cmd", "exit 4")],
        )
        .with_gem_user_dir(None);
        let status = StatusLog::in_dir(&t.dirs().output.clone());

        let mut seen = None;
        let err = t
            .install_with(&status, |execution| seen = Some(execution.exit_code))
            .unwrap_err();
        assert!(matches!(err, AssessError::InstallFailed { exit_code: 4, .. }));
        assert_eq!(seen, Some(4));
        assert!(
            fs::read_to_string(status.path())
                .unwrap()
                .starts_with("FAIL: tool-install\n")
        );
    }

    #[test]
    fn unstartable_assessment_is_recorded_as_127() {
        let dir = tempfile::tempdir().unwrap();
        let t = tool(dir.path(), &[("tool-type", "reek")]).with_gem_user_dir(None);
        let out = dir.path().join("o.out");
        let err = dir.path().join("e.out");

        let execution = t.invoke(vec!["/nonexistent/reek".into()], dir.path(), &out, &err);
        assert_eq!(execution.exit_code, SPAWN_FAILURE_EXIT_CODE);
        assert!(!fs::read_to_string(err).unwrap().is_empty());
    }
}
