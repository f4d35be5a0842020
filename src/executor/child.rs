//! Child process configuration
//!
//! Everything the child needs is collected in an immutable [`ChildConfig`]
//! and only turned into real environment variables when the command is
//! built. The orchestrator's own environment is never modified.

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::io::Write;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use tempfile::NamedTempFile;

use crate::config::GISRC_VAR;
use crate::models::{FileType, TestModule};

/// Variable selecting the format of progress messages from tools
pub const MESSAGE_FORMAT_VAR: &str = "GRASS_MESSAGE_FORMAT";

/// Plain, percentage-annotated progress messages
pub const MESSAGE_FORMAT_PLAIN: &str = "plain";

/// Shell used for `.sh` modules
pub const SHELL: &str = "sh";

/// Abort on the first failing command and trace every command to stderr
const SHELL_FLAGS: &[&str] = &["-e", "-x"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildConfig {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub working_dir: PathBuf,
    /// Set on top of the inherited environment
    pub env: Vec<(String, OsString)>,
    pub timeout: Option<Duration>,
}

impl ChildConfig {
    /// Invocation of `module` by file type.
    ///
    /// Python modules go through the given interpreter and shell modules
    /// through `sh -e -x`, never through the shebang line.
    pub fn for_module(module: &TestModule, python: &Path, working_dir: &Path) -> Self {
        let file = module.abs_file_path().as_os_str().to_os_string();
        let (program, args) = match module.file_type() {
            FileType::Python => (python.to_path_buf(), vec![file]),
            FileType::Shell => {
                let mut args: Vec<OsString> = SHELL_FLAGS.iter().map(OsString::from).collect();
                args.push(file);
                (PathBuf::from(SHELL), args)
            }
            FileType::Untyped => (module.abs_file_path().to_path_buf(), Vec::new()),
        };
        Self {
            program,
            args,
            working_dir: working_dir.to_path_buf(),
            env: Vec::new(),
            timeout: None,
        }
    }

    /// Point the child at its session file and force plain messages
    pub fn with_session(mut self, rc_file: &Path) -> Self {
        self.env
            .push((GISRC_VAR.to_string(), rc_file.as_os_str().to_os_string()));
        self.env.push((
            MESSAGE_FORMAT_VAR.to_string(),
            OsString::from(MESSAGE_FORMAT_PLAIN),
        ));
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn env_value(&self, key: &str) -> Option<&OsString> {
        self.env.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Command line for log messages
    pub fn command_line(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().map(|a| a.to_string_lossy().to_string()));
        parts.join(" ")
    }

    /// Build the command. The child leads its own process group so a
    /// timeout can terminate everything it started.
    pub(crate) fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0);
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        cmd
    }
}

/// Write the session file of one execution.
///
/// The file is removed when the returned handle is dropped.
pub fn write_session_rc(db_root: &Path, location: &str, mapset: &str) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("gridtest_rc_")
        .tempfile()
        .context("Failed to create session file")?;
    write!(
        file,
        "GISDBASE: {}\nLOCATION_NAME: {location}\nMAPSET: {mapset}\n",
        db_root.display()
    )
    .context("Failed to write session file")?;
    file.flush().context("Failed to flush session file")?;
    Ok(file)
}
