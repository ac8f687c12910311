//! External job dispatch and the completion barrier
//!
//! Work on part files runs outside this process, either as batch jobs on an
//! LSF cluster ([`LsfQueue`]) or as local shell subprocesses
//! ([`LocalQueue`]). Both sit behind [`JobQueue`], which [`await_all`] polls
//! until none of the caller's jobs are still active.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use vdjstream::jobs::{await_all, JobQueue, LocalQueue};
//!
//! # fn main() -> vdjstream::Result<()> {
//! let mut queue = LocalQueue::new();
//! let handles = vec![
//!     queue.submit("gzip -k work/reads.0")?,
//!     queue.submit("gzip -k work/reads.1")?,
//! ];
//! let report = await_all(&mut queue, &handles, Duration::from_secs(1))?;
//! println!("done after {} polls", report.polls);
//!
//! for handle in &handles {
//!     println!("{}: {:?}", handle, queue.exit_status(handle));
//! }
//! # Ok(())
//! # }
//! ```

pub mod barrier;
pub mod local;
pub mod lsf;

pub use barrier::{await_all, BarrierReport};
pub use local::LocalQueue;
pub use lsf::{parse_job_listing, parse_submission_ack, LsfQueue};

use crate::error::Result;
use std::collections::HashSet;
use std::fmt;

/// Identifier the queue assigned to a submitted job
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobHandle(String);

impl JobHandle {
    /// Wrap a queue-assigned identifier
    pub fn new(id: impl Into<String>) -> Self {
        JobHandle(id.into())
    }

    /// The identifier as the queue printed it
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobHandle {
    fn from(id: &str) -> Self {
        JobHandle::new(id)
    }
}

impl From<String> for JobHandle {
    fn from(id: String) -> Self {
        JobHandle(id)
    }
}

/// Result of asking a queue which jobs are still running
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueSnapshot {
    /// Handles of every job that has not reached a terminal state
    Active(HashSet<JobHandle>),
    /// The listing could not be interpreted this time; ask again later
    Unavailable,
}

/// A place to run shell commands and observe when they finish
pub trait JobQueue {
    /// Hand `command` to the queue and return its job identifier
    fn submit(&mut self, command: &str) -> Result<JobHandle>;

    /// Every job the queue currently considers non-terminal
    ///
    /// The set may include jobs this caller never submitted.
    fn active_jobs(&mut self) -> Result<QueueSnapshot>;
}

impl<Q: JobQueue + ?Sized> JobQueue for &mut Q {
    fn submit(&mut self, command: &str) -> Result<JobHandle> {
        (**self).submit(command)
    }

    fn active_jobs(&mut self) -> Result<QueueSnapshot> {
        (**self).active_jobs()
    }
}

impl<Q: JobQueue + ?Sized> JobQueue for Box<Q> {
    fn submit(&mut self, command: &str) -> Result<JobHandle> {
        (**self).submit(command)
    }

    fn active_jobs(&mut self) -> Result<QueueSnapshot> {
        (**self).active_jobs()
    }
}
