//! LSF batch queue (`bsub` / `bjobs`)

use crate::config::LsfConfig;
use crate::error::{Result, VdjError};
use crate::jobs::{JobHandle, JobQueue, QueueSnapshot};
use std::collections::HashSet;
use std::process::{Command, Output, Stdio};

/// Jobs submitted with `bsub` and tracked through `bjobs`
///
/// Both programs run through `sh -c`, so the command handed to
/// [`JobQueue::submit`] may use shell syntax.
#[derive(Debug, Clone, Default)]
pub struct LsfQueue {
    config: LsfConfig,
}

impl LsfQueue {
    /// Queue using `config` for program names and submit options
    pub fn new(config: LsfConfig) -> Self {
        LsfQueue { config }
    }

    /// Active configuration
    pub fn config(&self) -> &LsfConfig {
        &self.config
    }

    /// Full shell line used to submit `command`
    ///
    /// ```
    /// use vdjstream::config::LsfConfig;
    /// use vdjstream::jobs::LsfQueue;
    ///
    /// let queue = LsfQueue::new(LsfConfig {
    ///     queue: "short".to_string(),
    ///     output: "/dev/null".into(),
    ///     ..LsfConfig::default()
    /// });
    /// assert_eq!(
    ///     queue.submission_command("cluster part.0"),
    ///     "bsub -qshort -o/dev/null cluster part.0"
    /// );
    /// ```
    pub fn submission_command(&self, command: &str) -> String {
        format!(
            "{} -q{} -o{} {}",
            self.config.submit_program,
            self.config.queue,
            self.config.output.display(),
            command
        )
    }
}

fn run_shell(line: &str) -> Result<Output> {
    Ok(Command::new("sh")
        .arg("-c")
        .arg(line)
        .stdin(Stdio::null())
        .output()?)
}

/// Extract the job id from a submission acknowledgment
///
/// The id is the text between the first `<` and the next `>`, as in
/// `Job <4711> is submitted to queue <short>.`
pub fn parse_submission_ack(ack: &str) -> Result<JobHandle> {
    let id = ack
        .split_once('<')
        .and_then(|(_, rest)| rest.split_once('>'))
        .map(|(id, _)| id.trim())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            VdjError::Queue(format!(
                "no job id in submission reply: {:?}",
                ack.trim()
            ))
        })?;
    Ok(JobHandle::new(id))
}

/// Interpret a job listing whose first row is a header starting with `header`
///
/// Data rows contribute their first column. Empty output means no active
/// jobs; output whose first row is not the header is
/// [`QueueSnapshot::Unavailable`].
pub fn parse_job_listing(listing: &str, header: &str) -> QueueSnapshot {
    if listing.trim().is_empty() {
        return QueueSnapshot::Active(HashSet::new());
    }

    let mut rows = listing.lines();
    let first = rows.next().unwrap_or_default();
    if first.split_whitespace().next() != Some(header) {
        return QueueSnapshot::Unavailable;
    }

    let active = rows
        .filter_map(|row| row.split_whitespace().next())
        .filter(|id| *id != header)
        .map(JobHandle::new)
        .collect();
    QueueSnapshot::Active(active)
}

impl JobQueue for LsfQueue {
    fn submit(&mut self, command: &str) -> Result<JobHandle> {
        let line = self.submission_command(command);
        log::debug!("Submitting: {}", line);

        let output = run_shell(&line)?;
        if !output.status.success() {
            return Err(VdjError::Queue(format!(
                "{} exited with {}: {}",
                self.config.submit_program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let handle = parse_submission_ack(&String::from_utf8_lossy(&output.stdout))?;
        log::info!("Submitted job {}", handle);
        Ok(handle)
    }

    fn active_jobs(&mut self) -> Result<QueueSnapshot> {
        let output = run_shell(&self.config.list_program)?;
        if !output.status.success() {
            log::warn!(
                "{} exited with {}",
                self.config.list_program,
                output.status
            );
            return Ok(QueueSnapshot::Unavailable);
        }
        Ok(parse_job_listing(
            &String::from_utf8_lossy(&output.stdout),
            &self.config.listing_header,
        ))
    }
}
