//! Runtime configuration for dispatching work on part files
//!
//! Both structs double as `clap` argument groups, so the binary can flatten
//! them into any subcommand that submits jobs.

use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

/// Default seconds between queue listings while waiting on jobs
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Default number of records per packet
pub const DEFAULT_PACKET_SIZE: usize = 10_000;

/// How jobs are submitted to and tracked on an LSF cluster
#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct LsfConfig {
    /// LSF queue to submit to
    #[arg(short = 'q', long, value_name = "QUEUE", default_value = "normal")]
    pub queue: String,

    /// File LSF writes job output to
    #[arg(long = "lsf-output", value_name = "FILE", default_value = "/dev/null")]
    pub output: PathBuf,

    /// Submission program; receives -q<QUEUE> -o<FILE> <command>
    #[arg(long, value_name = "CMD", default_value = "bsub")]
    pub submit_program: String,

    /// Listing program; prints a header row, then one row per job
    #[arg(long, value_name = "CMD", default_value = "bjobs")]
    pub list_program: String,

    /// First column name of the listing's header row
    #[arg(long, value_name = "STR", default_value = "JOBID")]
    pub listing_header: String,
}

impl Default for LsfConfig {
    fn default() -> Self {
        LsfConfig {
            queue: "normal".to_string(),
            output: PathBuf::from("/dev/null"),
            submit_program: "bsub".to_string(),
            list_program: "bjobs".to_string(),
            listing_header: "JOBID".to_string(),
        }
    }
}

/// How a stream is cut up and how often the barrier polls
#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct DispatchConfig {
    /// Records per part
    #[arg(short = 'n', long, value_name = "INT", default_value_t = DEFAULT_PACKET_SIZE)]
    pub packet_size: usize,

    /// Seconds between job listings
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
    pub poll_interval: u64,
}

impl DispatchConfig {
    /// Poll interval as a [`Duration`]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        DispatchConfig {
            packet_size: DEFAULT_PACKET_SIZE,
            poll_interval: DEFAULT_POLL_INTERVAL_SECS,
        }
    }
}
