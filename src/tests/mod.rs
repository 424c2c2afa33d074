mod pipeline_tests;

use std::sync::{Mutex, MutexGuard};

use crate::config::ShellConfig;
use crate::executor::ExecutionOutcome;
use crate::shell::Shell;
use crate::types::ShellResult;

/// Serializes tests that change the process working directory.
static CWD_LOCK: Mutex<()> = Mutex::new(());

pub(crate) fn cwd_guard() -> MutexGuard<'static, ()> {
    CWD_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub(crate) fn shell() -> Shell {
    Shell::new(ShellConfig::default())
}

/// Runs one line, discarding built-in output.
pub(crate) fn run(shell: &mut Shell, line: &str) -> ShellResult<ExecutionOutcome> {
    shell.handle_line(line, &mut Vec::new())
}

/// Runs one line and returns what built-ins printed.
pub(crate) fn run_captured(shell: &mut Shell, line: &str) -> (ShellResult<ExecutionOutcome>, String) {
    let mut out = Vec::new();
    let result = shell.handle_line(line, &mut out);
    (result, String::from_utf8(out).unwrap())
}
