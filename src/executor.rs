use std::ffi::CString;
use std::fs::OpenOptions;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::signal::{signal, SigHandler, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{dup2, execvp, fork, pipe2, write, ForkResult, Pid};
use tracing::{debug, info, warn};

use crate::ast::{OutputTarget, Pipeline};
use crate::jobs::JobTable;
use crate::types::{ShellError, ShellResult};

/// Permissions for files created by `>` (before umask).
pub const REDIRECT_MODE: u32 = 0o644;

/// Exit status of a child whose program could not be executed.
pub const EXEC_FAILURE_STATUS: i32 = 127;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    NoOp,
    Builtin,
    Foreground { status: i32 },
    Background { pid: Pid },
    Exit,
}

/// Spawns external pipelines and keeps track of children it has not waited
/// for yet.
#[derive(Debug, Default)]
pub struct Executor {
    detached: Vec<Pid>,
}

impl Executor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs every stage of `pipeline` as its own process.
    ///
    /// Foreground pipelines are waited for in full; the outcome carries the
    /// terminal stage's status. Background pipelines are registered in `jobs`
    /// under the terminal stage's pid and reaped later by [`Executor::reap`].
    pub fn execute(
        &mut self,
        pipeline: &Pipeline,
        jobs: &mut JobTable,
    ) -> ShellResult<ExecutionOutcome> {
        if pipeline.is_empty() {
            return Ok(ExecutionOutcome::NoOp);
        }

        let mut children = Vec::with_capacity(pipeline.stages.len());
        let spawned = spawn_stages(pipeline, &mut children);

        if pipeline.background {
            self.detached.extend(children.iter().copied());
            spawned?;
            // spawn_stages only succeeds once the terminal stage is running
            let Some(&pid) = children.last() else {
                return Ok(ExecutionOutcome::NoOp);
            };
            jobs.register(pid, pipeline.command_text());
            info!(%pid, "started background job");
            return Ok(ExecutionOutcome::Background { pid });
        }

        let mut status = 0;
        for &pid in &children {
            status = wait_for(pid)?;
        }
        spawned?;
        debug!(status, "foreground pipeline finished");
        Ok(ExecutionOutcome::Foreground { status })
    }

    /// Collects every detached child that has exited and removes its job.
    /// Never blocks; returns the reaped pids.
    pub fn reap(&mut self, jobs: &mut JobTable) -> Vec<Pid> {
        let mut reaped = Vec::new();
        self.detached.retain(|&pid| {
            match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::StillAlive) | Err(Errno::EINTR) => return true,
                Ok(status) => debug!(?status, "reaped child"),
                Err(errno) => warn!(%pid, %errno, "lost track of child"),
            }
            reaped.push(pid);
            false
        });
        for &pid in &reaped {
            jobs.remove(pid);
        }
        reaped
    }

    #[cfg(test)]
    pub fn detached(&self) -> &[Pid] {
        &self.detached
    }
}

/// Forks one child per stage, left to right. Pids are pushed to `children`
/// as soon as they exist, so the caller can still wait on them if a later
/// stage fails.
fn spawn_stages(pipeline: &Pipeline, children: &mut Vec<Pid>) -> ShellResult<()> {
    // C strings are built up front; the child only calls async-signal-safe code
    let argvs = pipeline
        .stages
        .iter()
        .map(|stage| to_argv(&stage.tokens))
        .collect::<ShellResult<Vec<_>>>()?;

    let mut stdin: Option<OwnedFd> = None;
    for (stage, argv) in pipeline.stages.iter().zip(&argvs) {
        let (next_stdin, stdout) = match &stage.output {
            OutputTarget::NextStageInput => {
                let (read, write) = open_pipe()?;
                (Some(read), Some(write))
            }
            OutputTarget::File(path) => (None, Some(open_redirect(path)?)),
            OutputTarget::Inherited => (None, None),
        };

        let pid = fork_exec(argv, stdin.as_ref(), stdout.as_ref())?;
        debug!(%pid, program = ?argv[0], "spawned stage");
        children.push(pid);

        // parent copies close here: the old read end and this stage's output
        stdin = next_stdin;
    }
    Ok(())
}

fn to_argv(tokens: &[String]) -> ShellResult<Vec<CString>> {
    if tokens.is_empty() {
        return Err(ShellError::syntax("empty pipeline stage"));
    }
    tokens
        .iter()
        .map(|token| {
            CString::new(token.as_bytes())
                .map_err(|_| ShellError::syntax(format!("NUL byte in argument {token:?}")))
        })
        .collect()
}

/// Both ends are close-on-exec; children only keep the copies dup'd onto 0/1.
fn open_pipe() -> ShellResult<(OwnedFd, OwnedFd)> {
    let (read, write) = pipe2(OFlag::O_CLOEXEC).map_err(|e| ShellError::sys("pipe", e))?;
    // SAFETY: pipe2 just returned these descriptors and nothing else owns them
    Ok(unsafe { (OwnedFd::from_raw_fd(read), OwnedFd::from_raw_fd(write)) })
}

fn open_redirect(path: &Path) -> ShellResult<OwnedFd> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .mode(REDIRECT_MODE)
        .open(path)
        .map_err(|e| ShellError::io(format!("open {}", path.display()), e))?;
    Ok(file.into())
}

fn fork_exec(argv: &[CString], stdin: Option<&OwnedFd>, stdout: Option<&OwnedFd>) -> ShellResult<Pid> {
    // SAFETY: the child branch only dup2s, resets a signal, and execs or _exits
    match unsafe { fork() }.map_err(|e| ShellError::sys("fork", e))? {
        ForkResult::Parent { child } => Ok(child),
        ForkResult::Child => {
            if let Some(fd) = stdin {
                redirect_or_exit(fd, libc::STDIN_FILENO);
            }
            if let Some(fd) = stdout {
                redirect_or_exit(fd, libc::STDOUT_FILENO);
            }
            // Rust ignores SIGPIPE, and ignored signals survive exec
            // SAFETY: restoring the default disposition installs no handler
            let _ = unsafe { signal(Signal::SIGPIPE, SigHandler::SigDfl) };

            let errno = match execvp(&argv[0], argv) {
                Ok(never) => match never {},
                Err(errno) => errno,
            };
            report_exec_failure(&argv[0], errno);
            // SAFETY: _exit skips the parent's atexit handlers and buffered IO
            unsafe { libc::_exit(EXEC_FAILURE_STATUS) }
        }
    }
}

fn redirect_or_exit(fd: &OwnedFd, target: i32) {
    if dup2(fd.as_raw_fd(), target).is_err() {
        let _ = write(libc::STDERR_FILENO, b"pipesh: dup2 failed\n");
        // SAFETY: see fork_exec
        unsafe { libc::_exit(EXEC_FAILURE_STATUS) }
    }
}

fn report_exec_failure(program: &CString, errno: Errno) {
    let parts: [&[u8]; 5] = [
        b"pipesh: ",
        program.as_bytes(),
        b": ",
        errno.desc().as_bytes(),
        b"\n",
    ];
    for part in parts {
        let _ = write(libc::STDERR_FILENO, part);
    }
}

/// Blocks until `pid` exits. Signal deaths map to 128 + signal number.
fn wait_for(pid: Pid) -> ShellResult<i32> {
    loop {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, code)) => return Ok(code),
            Ok(WaitStatus::Signaled(_, sig, _)) => return Ok(128 + sig as i32),
            Ok(_) | Err(Errno::EINTR) => continue,
            Err(e) => return Err(ShellError::sys("waitpid", e)),
        }
    }
}

