//! Lookups that depend on the caller's environment

use std::env;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

use super::ConfigError;

/// Variable pointing at the session's configuration file
pub const GISRC_VAR: &str = "GISRC";

/// Database root of the active session, read from the file `GISRC` points to.
pub fn active_gisdbase() -> Result<PathBuf, ConfigError> {
    let rc_path = env::var_os(GISRC_VAR)
        .ok_or_else(|| ConfigError::NoSession(format!("{GISRC_VAR} is not set")))?;
    let rc_path = PathBuf::from(rc_path);
    let text = fs::read_to_string(&rc_path).map_err(|e| {
        ConfigError::NoSession(format!("cannot read {}: {e}", rc_path.display()))
    })?;
    text.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| key.trim() == "GISDBASE")
        .map(|(_, value)| PathBuf::from(value.trim()))
        .filter(|path| !path.as_os_str().is_empty())
        .ok_or_else(|| {
            ConfigError::NoSession(format!("no GISDBASE entry in {}", rc_path.display()))
        })
}

/// Interpreter used for Python modules.
///
/// Explicit setting first, then `PYTHON`, then `python3`/`python` on `PATH`.
/// Falls back to the bare name `python3` so the spawn error names it.
pub fn resolve_python(configured: Option<&PathBuf>) -> PathBuf {
    if let Some(path) = configured {
        return path.clone();
    }
    if let Some(path) = env::var_os("PYTHON").filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    for candidate in ["python3", "python"] {
        if let Ok(path) = which::which(candidate) {
            debug!(python = %path.display(), "resolved interpreter");
            return path;
        }
    }
    PathBuf::from("python3")
}
