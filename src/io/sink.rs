//! Output destinations for streaming writes
//!
//! `DataSink` is the write counterpart to [`DataSource`](crate::io::DataSource).
//!
//! # Example
//!
//! ```no_run
//! use vdjstream::io::DataSink;
//!
//! // Write to local file
//! let sink = DataSink::from_path("filtered.vdjxml.gz");
//!
//! // Write to stdout
//! let sink = DataSink::stdout();
//! ```

use std::path::{Path, PathBuf};

/// Output destination for streaming writes
#[derive(Debug, Clone)]
pub enum DataSink {
    /// Write to a local file path
    ///
    /// A `.gz` extension selects gzip compression.
    Local(PathBuf),

    /// Write to standard output
    ///
    /// Useful for streaming pipelines:
    /// ```bash
    /// vdjstream filter-and sample1 -i reads.vdjxml | vdjstream size-select --min 300
    /// ```
    Stdout,
}

impl DataSink {
    /// Create a sink from a file path
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        Self::Local(path.as_ref().to_path_buf())
    }

    /// Create a sink for standard output
    pub fn stdout() -> Self {
        Self::Stdout
    }

    /// File path of a local sink
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Local(path) => Some(path),
            Self::Stdout => None,
        }
    }

    /// Check if this sink represents a compressed output
    pub fn is_compressed(&self) -> bool {
        matches!(
            self.path().and_then(|p| p.extension()).and_then(|s| s.to_str()),
            Some("gz")
        )
    }
}
