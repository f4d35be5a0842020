//! Test module execution
//!
//! Each module runs as a child process inside its sandbox, with the module
//! results directory as working directory. The executor enforces the
//! timeout, captures and decodes both output streams, writes them next to
//! the results and always leaves a summary behind, whatever happened to the
//! child.
//!
//! # Invocation
//!
//! - `.py` modules: `<python> <file>`
//! - `.sh` modules: `sh -e -x <file>`
//! - anything else: the file itself
//!
//! # Timeout Behavior
//!
//! When a module exceeds its timeout:
//! - The child's process group receives SIGKILL
//! - Output captured so far is kept
//! - The return code becomes [`TIMEOUT_RETURNCODE`](crate::models::TIMEOUT_RETURNCODE)
//!   and a diagnostic line is added to stderr

mod capture;
mod child;
mod decode;
mod redact;
mod runner;


pub use capture::{run_captured, RawOutput};
pub use child::{
    write_session_rc, ChildConfig, MESSAGE_FORMAT_PLAIN, MESSAGE_FORMAT_VAR, SHELL,
};
pub use decode::{decode_output, decode_with_locale, locale_encoding};
pub use redact::{NoopRedactor, PathRedactor, Redactor};
pub use runner::{
    timeout_message, ExecutionTarget, ModuleRun, TestExecutor, STDERR_FILE, STDOUT_FILE,
    TEST_DATA_DIR,
};
