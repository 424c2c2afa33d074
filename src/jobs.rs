use std::fmt;

use nix::unistd::Pid;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub pid: Pid,
    pub command: String,
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.pid, self.command)
    }
}

/// Background jobs in the order they were started.
#[derive(Debug, Default)]
pub struct JobTable {
    jobs: Vec<Job>,
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, pid: Pid, command: impl Into<String>) {
        let job = Job {
            pid,
            command: command.into(),
        };
        debug!(%job, "registered background job");
        self.jobs.push(job);
    }

    /// Drops the job with `pid`, keeping the others in order.
    pub fn remove(&mut self, pid: Pid) -> Option<Job> {
        let index = self.jobs.iter().position(|job| job.pid == pid)?;
        let job = self.jobs.remove(index);
        debug!(%job, "removed background job");
        Some(job)
    }

    #[cfg(test)]
    pub fn contains(&self, pid: Pid) -> bool {
        self.jobs.iter().any(|job| job.pid == pid)
    }

    pub fn list(&self) -> &[Job] {
        &self.jobs
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
