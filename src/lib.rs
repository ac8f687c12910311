//! vdjstream: streaming immune-repertoire records and batch dispatch
//!
//! # Overview
//!
//! vdjstream reads and writes VDJXML, a line-oriented format holding one
//! annotated immune-receptor chain per record, and provides the plumbing to
//! push large repertoires through external tools in parallel: tag filters,
//! splitting into part files, and a barrier that waits on batch jobs.
//!
//! ## Key Features
//!
//! - **Streaming**: one record in memory at a time, gzip detected on read
//! - **Tag filters**: AND/OR selection over explicit tags and annotations
//! - **Partitioning**: fixed-size packets or one part per (V, J) pair
//! - **Dispatch**: LSF (`bsub`/`bjobs`) or local subprocesses behind one trait
//!
//! ## Quick Start
//!
//! ```no_run
//! use vdjstream::operations::filter_and;
//! use vdjstream::{VdjxmlReader, VdjxmlWriter};
//!
//! # fn main() -> vdjstream::Result<()> {
//! let reader = VdjxmlReader::from_path("repertoire.vdjxml.gz")?;
//! let mut writer = VdjxmlWriter::create("sample1.vdjxml")?;
//!
//! writer.write_all(filter_and(["sample1", "positive"], reader))?;
//! writer.finish()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`io`]: VDJXML reader/writer, compression, sources and sinks
//! - [`operations`]: filters, annotation steps, clone tallies
//! - [`partition`]: packet and V/J splitting, manifests, recombination
//! - [`jobs`]: job queues and the completion barrier
//! - [`config`]: dispatch and LSF settings

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod error;
pub mod io;
pub mod jobs;
pub mod operations;
pub mod partition;
pub mod types;

// Re-export commonly used types
pub use error::{Result, VdjError};
pub use io::{VdjxmlReader, VdjxmlWriter};
pub use jobs::{await_all, JobHandle, JobQueue, LocalQueue, LsfQueue};
pub use partition::{split_into_parts, split_into_vj_parts};
pub use types::ImmuneChain;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
