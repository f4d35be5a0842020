//! Low-level child execution with timeout and output capture

use anyhow::{Context, Result};
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::io::Read;
use std::os::unix::process::ExitStatusExt;
use std::process::{Child, ExitStatus};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use wait_timeout::ChildExt;

use super::child::ChildConfig;
use crate::models::{SIGNAL_RETURNCODE_BASE, TIMEOUT_RETURNCODE};

/// Time allowed for collecting output of both pipes after the child ended
const OUTPUT_COLLECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum captured size per stream (64MB)
const MAX_OUTPUT_SIZE: usize = 64 * 1024 * 1024;

const TRUNCATION_NOTE: &[u8] = b"\n[output truncated at 64MB]\n";

/// Undecoded result of one child run
#[derive(Debug)]
pub struct RawOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub returncode: i32,
    pub timed_out: Option<Duration>,
    pub wall_duration: Duration,
}

/// Spawn the child described by `config` and wait for it.
///
/// Errors only when the child cannot be spawned or waited for. A timeout
/// kills the child's whole process group and maps to
/// [`TIMEOUT_RETURNCODE`]; output captured up to that point is kept.
pub fn run_captured(config: &ChildConfig) -> Result<RawOutput> {
    let start = Instant::now();
    debug!(command = %config.command_line(), cwd = %config.working_dir.display(), "spawning");

    let mut child = config
        .command()
        .spawn()
        .with_context(|| format!("Failed to spawn: {}", config.command_line()))?;

    // Drain both pipes while waiting, otherwise a child filling the pipe
    // buffer blocks forever on write.
    let stdout_rx = drain(child.stdout.take());
    let stderr_rx = drain(child.stderr.take());

    let status = match config.timeout {
        Some(timeout) => child
            .wait_timeout(timeout)
            .with_context(|| format!("Failed to wait for: {}", config.command_line()))?,
        None => Some(
            child
                .wait()
                .with_context(|| format!("Failed to wait for: {}", config.command_line()))?,
        ),
    };

    let (returncode, timed_out) = match status {
        Some(status) => {
            // Background processes left by the test still hold the pipes
            kill_leftovers(&child);
            (returncode_of(status), None)
        }
        None => {
            warn!(command = %config.command_line(), "timeout reached, killing process group");
            kill_process_group(&mut child);
            (TIMEOUT_RETURNCODE, config.timeout)
        }
    };
    let wall_duration = start.elapsed();

    let deadline = Instant::now() + OUTPUT_COLLECTION_TIMEOUT;
    let stdout = collect(&stdout_rx, deadline);
    let stderr = collect(&stderr_rx, deadline);

    Ok(RawOutput {
        stdout,
        stderr,
        returncode,
        timed_out,
        wall_duration,
    })
}

fn drain<R: Read + Send + 'static>(stream: Option<R>) -> mpsc::Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    match stream {
        Some(stream) => {
            thread::spawn(move || {
                let _ = tx.send(read_stream_to_end(stream));
            });
        }
        None => {
            let _ = tx.send(Vec::new());
        }
    }
    rx
}

/// Output of one drain thread, or a note when it does not finish by `deadline`
fn collect(rx: &mpsc::Receiver<Vec<u8>>, deadline: Instant) -> Vec<u8> {
    rx.recv_timeout(deadline.saturating_duration_since(Instant::now()))
        .unwrap_or_else(|_| b"[output collection timed out]\n".to_vec())
}

/// Exit code, or `128 + signal` for a child killed by a signal
fn returncode_of(status: ExitStatus) -> i32 {
    match status.code() {
        Some(code) => code,
        None => status
            .signal()
            .map(|sig| SIGNAL_RETURNCODE_BASE + sig)
            .unwrap_or(SIGNAL_RETURNCODE_BASE),
    }
}

/// Read a stream to its end, keeping at most [`MAX_OUTPUT_SIZE`] bytes.
///
/// The rest is drained and discarded so the writer never sees a broken pipe.
fn read_stream_to_end<R: Read>(mut stream: R) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];

    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                let remaining = MAX_OUTPUT_SIZE.saturating_sub(buf.len());
                let to_copy = n.min(remaining);
                buf.extend_from_slice(&chunk[..to_copy]);
                if to_copy < n {
                    let mut discard = [0u8; 8192];
                    while stream.read(&mut discard).unwrap_or(0) > 0 {}
                    buf.extend_from_slice(TRUNCATION_NOTE);
                    break;
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }
    buf
}

/// Terminate the child and everything in its process group, then reap it
fn kill_process_group(child: &mut Child) {
    match i32::try_from(child.id()) {
        Ok(pid) => {
            if let Err(err) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
                debug!(pid, error = %err, "killpg failed, killing child only");
                let _ = child.kill();
            }
        }
        Err(_) => {
            let _ = child.kill();
        }
    }
    let _ = child.wait();
}

/// Kill what is left of the process group of a child that already exited.
///
/// The group id stays reserved while any member is alive, so this cannot
/// hit an unrelated group.
fn kill_leftovers(child: &Child) {
    let Ok(pid) = i32::try_from(child.id()) else {
        return;
    };
    match killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        Ok(()) => debug!(pid, "killed processes left behind by the test"),
        Err(nix::errno::Errno::ESRCH) => {}
        Err(err) => debug!(pid, error = %err, "cannot kill leftover processes"),
    }
}
