//! Run configuration
//!
//! Defaults, the optional key=value configuration file, and lookups that
//! depend on the surrounding session (database root, Python interpreter).

mod run_config;
mod session;


pub use run_config::{
    ConfigError, RunConfig, DEFAULT_CONFIG_FILE_NAME, DEFAULT_FILE_REGEX, DEFAULT_SKIP_DIRS,
    DEFAULT_TESTSUITE_DIR,
};
pub use session::{active_gisdbase, resolve_python, GISRC_VAR};
