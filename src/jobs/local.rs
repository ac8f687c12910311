//! Local subprocesses as a job queue

use crate::error::Result;
use crate::jobs::{JobHandle, JobQueue, QueueSnapshot};
use std::collections::{HashMap, HashSet};
use std::process::{Child, Command, ExitStatus, Stdio};

/// Runs each submitted command as `sh -c <command>` on this machine
///
/// The job handle is the child's process id. A job is active until the
/// child reports an exit status; success and failure are both terminal.
/// Exit statuses are kept and can be read back with
/// [`exit_status`](LocalQueue::exit_status).
#[derive(Debug, Default)]
pub struct LocalQueue {
    running: HashMap<JobHandle, Child>,
    finished: HashMap<JobHandle, ExitStatus>,
}

impl LocalQueue {
    /// Queue with no jobs
    pub fn new() -> Self {
        Self::default()
    }

    /// Exit status of a finished job, `None` while running or if unknown
    pub fn exit_status(&self, handle: &JobHandle) -> Option<ExitStatus> {
        self.finished.get(handle).copied()
    }

    /// Number of jobs not yet observed to exit
    pub fn running(&self) -> usize {
        self.running.len()
    }

    fn reap(&mut self) -> Result<()> {
        let mut exited = Vec::new();
        for (handle, child) in self.running.iter_mut() {
            if let Some(status) = child.try_wait()? {
                exited.push((handle.clone(), status));
            }
        }
        for (handle, status) in exited {
            log::debug!("Job {} exited with {}", handle, status);
            self.running.remove(&handle);
            self.finished.insert(handle, status);
        }
        Ok(())
    }
}

impl JobQueue for LocalQueue {
    fn submit(&mut self, command: &str) -> Result<JobHandle> {
        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .spawn()?;
        let handle = JobHandle::new(child.id().to_string());
        log::info!("Started job {}: {}", handle, command);

        self.finished.remove(&handle);
        self.running.insert(handle.clone(), child);
        Ok(handle)
    }

    fn active_jobs(&mut self) -> Result<QueueSnapshot> {
        self.reap()?;
        let active: HashSet<JobHandle> = self.running.keys().cloned().collect();
        Ok(QueueSnapshot::Active(active))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::jobs::await_all;
    use std::time::Duration;

    #[test]
    fn test_barrier_over_local_processes() {
        let mut queue = LocalQueue::new();
        let ok = queue.submit("exit 0").unwrap();
        let failed = queue.submit("exit 3").unwrap();

        let report = await_all(&mut queue, &[ok.clone(), failed.clone()], Duration::from_millis(10))
            .unwrap();

        assert!(report.polls >= 1);
        assert_eq!(queue.running(), 0);
        assert_eq!(queue.exit_status(&ok).and_then(|s| s.code()), Some(0));
        assert_eq!(queue.exit_status(&failed).and_then(|s| s.code()), Some(3));
    }

    #[test]
    fn test_running_job_is_active() {
        let mut queue = LocalQueue::new();
        let slow = queue.submit("sleep 0.3").unwrap();

        match queue.active_jobs().unwrap() {
            QueueSnapshot::Active(active) => assert!(active.contains(&slow)),
            QueueSnapshot::Unavailable => panic!("local queue is always available"),
        }
        assert!(queue.exit_status(&slow).is_none());

        await_all(&mut queue, &[slow.clone()], Duration::from_millis(50)).unwrap();
        assert!(queue.exit_status(&slow).is_some());
    }

    #[test]
    fn test_unknown_handle() {
        let queue = LocalQueue::new();
        assert!(queue.exit_status(&JobHandle::new("999999")).is_none());
    }
}
