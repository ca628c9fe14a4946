//! Module Runtime: launches a module as an
//! isolated subprocess and watches for it disappearing without reaching a
//! terminal state.
//!
//! A separate monitor process tailing the progress log would be one way
//! to watch for a wedged module, but a single static binary has no
//! separate process to spawn for that, so this runtime folds the
//! responsibility into an in-process watchdog
//! thread that polls the progress file's mtime while the main thread
//! blocks on `Child::wait`.

use std::process::{Child, Command, ExitStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use camino::Utf8Path;

use crate::state::StageStatus;

/// How a module's subprocess ended.
#[derive(Debug, Clone)]
pub struct StageOutcome {
    pub status: StageStatus,
    pub exit_code: Option<i32>,
    pub status_reason: Option<String>,
}

impl StageOutcome {
    fn from_exit_status(status: ExitStatus) -> Self {
        if status.success() {
            Self {
                status: StageStatus::Done,
                exit_code: status.code(),
                status_reason: None,
            }
        } else {
            Self {
                status: StageStatus::Failed,
                exit_code: status.code(),
                status_reason: Some(format!("module exited with status {status}")),
            }
        }
    }

    fn crashed(reason: impl Into<String>) -> Self {
        Self {
            status: StageStatus::Crashed,
            exit_code: None,
            status_reason: Some(reason.into()),
        }
    }
}

/// Spawn `cmd`, watching `progress_file` for activity. If the file goes
/// untouched for longer than `stall_timeout` the subprocess is killed and
/// the stage is reported `crashed`.
pub fn run_with_watchdog(
    mut cmd: Command,
    progress_file: &Utf8Path,
    stall_timeout: Duration,
) -> std::io::Result<StageOutcome> {
    let mut child = cmd.spawn()?;
    let stop = Arc::new(AtomicBool::new(false));
    let crashed = Arc::new(AtomicBool::new(false));

    let watchdog = {
        let stop = Arc::clone(&stop);
        let crashed = Arc::clone(&crashed);
        let progress_file = progress_file.to_owned();
        thread::spawn(move || watch(&progress_file, stall_timeout, &stop, &crashed))
    };

    let wait_result = child.wait();
    stop.store(true, Ordering::SeqCst);
    let _ = watchdog.join();

    if crashed.load(Ordering::SeqCst) {
        let _ = kill_if_running(&mut child);
        return Ok(StageOutcome::crashed(format!(
            "module produced no progress for over {}s and was killed",
            stall_timeout.as_secs()
        )));
    }

    match wait_result {
        Ok(status) => Ok(StageOutcome::from_exit_status(status)),
        Err(e) => Ok(StageOutcome::crashed(format!("failed to wait on module process: {e}"))),
    }
}

fn kill_if_running(child: &mut Child) -> std::io::Result<()> {
    match child.try_wait()? {
        Some(_) => Ok(()),
        None => child.kill(),
    }
}

fn watch(progress_file: &Utf8Path, stall_timeout: Duration, stop: &AtomicBool, crashed: &AtomicBool) {
    let poll_interval = Duration::from_millis(200).min(stall_timeout);
    let mut last_seen = Instant::now();
    let mut last_len = file_len(progress_file);

    while !stop.load(Ordering::SeqCst) {
        thread::sleep(poll_interval);
        let len = file_len(progress_file);
        if len != last_len {
            last_len = len;
            last_seen = Instant::now();
        }
        if last_seen.elapsed() >= stall_timeout {
            crashed.store(true, Ordering::SeqCst);
            return;
        }
    }
}

fn file_len(path: &Utf8Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}
