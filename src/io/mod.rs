//! I/O module: streaming VDJXML codec and its byte plumbing
//!
//! Readers and writers keep memory constant regardless of file size: the
//! reader holds one line and the record under construction, the writer
//! holds nothing beyond its output buffer.

pub mod compression;
pub mod sink;
pub mod vdjxml;

pub use compression::{CompressedReader, CompressedWriter, DataSource};
pub use sink::DataSink;
pub use vdjxml::{parse_str, VdjxmlReader, VdjxmlWriter};
