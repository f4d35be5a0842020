//! Result of running one test file as a child process

use std::time::Duration;

/// Return code recorded for a child killed because it ran past its timeout
pub const TIMEOUT_RETURNCODE: i32 = 124;

/// Children terminated by a signal get `SIGNAL_RETURNCODE_BASE + signal`
pub const SIGNAL_RETURNCODE_BASE: i32 = 128;

#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    /// Never absent: timeouts and signals are mapped to failing codes
    pub returncode: i32,
    /// Configured timeout when the child was killed for exceeding it
    pub timed_out: Option<Duration>,
    pub wall_duration: Duration,
}

impl ExecutionResult {
    pub fn new(
        stdout: String,
        stderr: String,
        returncode: i32,
        timed_out: Option<Duration>,
        wall_duration: Duration,
    ) -> Self {
        Self {
            stdout,
            stderr,
            returncode,
            timed_out,
            wall_duration,
        }
    }

    /// Result for a module that never reached a running child
    /// (sandbox provisioning or spawn failed).
    pub fn not_started(message: impl Into<String>) -> Self {
        let mut stderr = message.into();
        if !stderr.ends_with('\n') {
            stderr.push('\n');
        }
        Self::new(String::new(), stderr, 1, None, Duration::ZERO)
    }

    pub fn passed(&self) -> bool {
        self.returncode == 0
    }

    /// Timeout in seconds as shown in reports, e.g. `1` or `2.5`
    pub fn timed_out_secs(&self) -> Option<String> {
        self.timed_out.map(format_secs)
    }

    pub fn summary(&self) -> String {
        let status = if self.timed_out.is_some() {
            "TIMEOUT"
        } else if self.passed() {
            "PASSED"
        } else {
            "FAILED"
        };
        format!(
            "{} ({}ms, return code: {})",
            status,
            self.wall_duration.as_millis(),
            self.returncode
        )
    }
}

/// Seconds without a trailing `.0` for whole values
pub fn format_secs(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs.fract() == 0.0 {
        format!("{}", secs as u64)
    } else {
        format!("{secs}")
    }
}
