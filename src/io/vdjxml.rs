//! VDJXML streaming reader and writer
//!
//! # Format
//!
//! VDJXML is a line-oriented markup format in which every element occupies
//! exactly one line and carries no attributes:
//!
//! ```text
//! <ImmuneChain>
//! 	<descr>read1</descr>
//! 	<seq>ACGT</seq>
//! 	<v>IGHV1-2*02</v>
//! 	<d></d>
//! 	<j>IGHJ4*02</j>
//! 	<ighc></ighc>
//! 	<cdr3>0</cdr3>
//! 	<junction></junction>
//! 	<func></func>
//! 	<tag>sample1</tag>
//! </ImmuneChain>
//! ```
//!
//! Values are written verbatim with no escaping. A value's end is found by
//! its closing tag at the end of the line, so a value containing a line
//! break produces a file that no longer parses.
//!
//! Unknown element names are skipped so newer writers can add fields
//! without breaking older readers.
//!
//! # Example
//!
//! ```no_run
//! use vdjstream::{VdjxmlReader, VdjxmlWriter};
//!
//! # fn main() -> vdjstream::Result<()> {
//! let reader = VdjxmlReader::from_path("reads.vdjxml")?;
//! let mut writer = VdjxmlWriter::create("long_reads.vdjxml.gz")?;
//!
//! for chain in reader {
//!     let chain = chain?;
//!     if chain.len() >= 300 {
//!         writer.write_record(&chain)?;
//!     }
//! }
//! writer.finish()?;
//! # Ok(())
//! # }
//! ```

use crate::error::{Result, VdjError};
use crate::io::compression::{CompressedReader, CompressedWriter, DataSource};
use crate::io::DataSink;
use crate::types::ImmuneChain;
use std::fmt;
use std::io::{BufRead, Write};
use std::path::Path;

/// Container element name
pub const CONTAINER: &str = "ImmuneChain";

const OPEN_CONTAINER: &str = "<ImmuneChain>";
const CLOSE_CONTAINER: &str = "</ImmuneChain>";

/// Record fields addressable by a VDJXML element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Description,
    Sequence,
    VSegment,
    DSegment,
    JSegment,
    Isotype,
    Cdr3Length,
    Junction,
    Functionality,
    Tag,
}

impl Field {
    /// Map an element name to a field; descriptive names are accepted as aliases
    fn from_element(name: &str) -> Option<Self> {
        match name {
            "descr" | "description" => Some(Self::Description),
            "seq" | "sequence" => Some(Self::Sequence),
            "v" | "v-segment" => Some(Self::VSegment),
            "d" | "d-segment" => Some(Self::DSegment),
            "j" | "j-segment" => Some(Self::JSegment),
            "ighc" | "isotype" => Some(Self::Isotype),
            "cdr3" | "cdr3-length" => Some(Self::Cdr3Length),
            "junction" => Some(Self::Junction),
            "func" | "functionality" => Some(Self::Functionality),
            "tag" => Some(Self::Tag),
            _ => None,
        }
    }
}

/// Parser state between lines
#[derive(Debug)]
enum ParseState {
    /// Outside any container
    Idle,
    /// Inside `<ImmuneChain>`, accumulating fields
    InRecord(ImmuneChain),
}

/// Streaming VDJXML parser
///
/// Yields one [`ImmuneChain`] per container and never holds more than the
/// record under construction. Reading from a path owns the file handle and
/// releases it when the reader is dropped, including when iteration stops
/// early. [`from_reader`](VdjxmlReader::from_reader) never closes the
/// caller's handle; pass `&mut reader` to keep ownership.
///
/// # Errors
///
/// The stream yields [`VdjError::Format`] and then ends when it meets:
/// - a recognized element line outside a container
/// - a nested `<ImmuneChain>` or a stray `</ImmuneChain>`
/// - a recognized element without its closing tag
/// - a non-numeric `cdr3` value
/// - end of input inside a container
pub struct VdjxmlReader<R: BufRead> {
    reader: R,
    line: String,
    line_number: usize,
    state: ParseState,
    finished: bool,
}

impl<R: BufRead> VdjxmlReader<R> {
    /// Create a reader over an already-open buffered handle
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader,
            line: String::with_capacity(256),
            line_number: 0,
            state: ParseState::Idle,
            finished: false,
        }
    }

    /// Number of lines consumed so far
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    fn format_error(&self, msg: impl Into<String>) -> VdjError {
        VdjError::Format {
            line: self.line_number,
            msg: msg.into(),
        }
    }

    /// Read lines until a container closes or input ends
    fn read_record(&mut self) -> Result<Option<ImmuneChain>> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                return match self.state {
                    ParseState::Idle => Ok(None),
                    ParseState::InRecord(_) => {
                        Err(self.format_error("end of input inside <ImmuneChain>"))
                    }
                };
            }
            self.line_number += 1;

            if let Some(chain) = self.consume_line()? {
                return Ok(Some(chain));
            }
        }
    }

    /// Apply the current line to the state machine
    fn consume_line(&mut self) -> Result<Option<ImmuneChain>> {
        let line = self.line.trim();

        if line == OPEN_CONTAINER {
            return match self.state {
                ParseState::Idle => {
                    self.state = ParseState::InRecord(ImmuneChain::default());
                    Ok(None)
                }
                ParseState::InRecord(_) => Err(self.format_error("nested <ImmuneChain>")),
            };
        }

        if line == CLOSE_CONTAINER {
            return match std::mem::replace(&mut self.state, ParseState::Idle) {
                ParseState::InRecord(chain) => Ok(Some(chain)),
                ParseState::Idle => Err(self.format_error("</ImmuneChain> without open container")),
            };
        }

        let Some((element, value)) = split_element(line) else {
            return Ok(None);
        };
        let Some(field) = Field::from_element(element) else {
            return Ok(None);
        };

        let value = value.ok_or_else(|| {
            self.format_error(format!("element <{}> is missing its closing tag", element))
        })?;

        let cdr3 = if field == Field::Cdr3Length {
            Some(value.parse::<usize>().map_err(|_| {
                self.format_error(format!("cdr3 value is not an integer: {:?}", value))
            })?)
        } else {
            None
        };

        let chain = match &mut self.state {
            ParseState::InRecord(chain) => chain,
            ParseState::Idle => {
                return Err(self.format_error(format!(
                    "<{}> element outside <ImmuneChain>",
                    element
                )))
            }
        };

        match field {
            Field::Description => chain.description = value.to_string(),
            Field::Sequence => chain.set_sequence(value),
            Field::VSegment => chain.v_segment = value.to_string(),
            Field::DSegment => chain.d_segment = value.to_string(),
            Field::JSegment => chain.j_segment = value.to_string(),
            Field::Isotype => chain.isotype = value.to_string(),
            // Assignment ignored: cdr3 length is derived from the junction.
            Field::Cdr3Length => chain.set_cdr3_length(cdr3.unwrap_or_default()),
            Field::Junction => chain.junction = value.to_string(),
            Field::Functionality => chain.functionality = value.to_string(),
            Field::Tag => chain.add_tag(value),
        }

        Ok(None)
    }
}

/// Split a trimmed `<name>value</name>` line
///
/// Returns `None` when the line has no opening tag. The value is `None`
/// when the line does not end with the matching closing tag.
fn split_element(line: &str) -> Option<(&str, Option<&str>)> {
    let open_end = line.find('>')?;
    let element = line.get(1..open_end).filter(|_| line.starts_with('<'))?;
    let rest = &line[open_end + 1..];

    let value = rest
        .strip_suffix('>')
        .and_then(|r| r.strip_suffix(element))
        .and_then(|r| r.strip_suffix("</"));

    Some((element, value))
}

impl VdjxmlReader<CompressedReader> {
    /// Create a reader from a data source (gzip detected automatically)
    pub fn new(source: DataSource) -> Result<Self> {
        Ok(Self::from_reader(CompressedReader::new(source)?))
    }

    /// Create a reader that owns the file at `path`
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(DataSource::from_path(path))
    }
}

impl<R: BufRead> Iterator for VdjxmlReader<R> {
    type Item = Result<ImmuneChain>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.read_record() {
            Ok(Some(chain)) => Some(Ok(chain)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// Canonical VDJXML encoding of one record, including the trailing newline
impl fmt::Display for ImmuneChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", OPEN_CONTAINER)?;
        writeln!(f, "\t<descr>{}</descr>", self.description)?;
        writeln!(f, "\t<seq>{}</seq>", self.sequence())?;
        writeln!(f, "\t<v>{}</v>", self.v_segment)?;
        writeln!(f, "\t<d>{}</d>", self.d_segment)?;
        writeln!(f, "\t<j>{}</j>", self.j_segment)?;
        writeln!(f, "\t<ighc>{}</ighc>", self.isotype)?;
        writeln!(f, "\t<cdr3>{}</cdr3>", self.cdr3_length())?;
        writeln!(f, "\t<junction>{}</junction>", self.junction)?;
        writeln!(f, "\t<func>{}</func>", self.functionality)?;
        for tag in self.tags() {
            writeln!(f, "\t<tag>{}</tag>", tag)?;
        }
        writeln!(f, "{}", CLOSE_CONTAINER)
    }
}

/// Streaming VDJXML writer
///
/// Writers built from a path or sink own the output and compress `.gz`
/// paths; call [`finish`](VdjxmlWriter::finish) to flush and close.
/// [`from_writer`](VdjxmlWriter::from_writer) wraps a caller-owned handle,
/// handed back by [`into_inner`](VdjxmlWriter::into_inner).
pub struct VdjxmlWriter<W: Write> {
    writer: W,
    records_written: usize,
}

impl<W: Write> VdjxmlWriter<W> {
    /// Wrap an already-open writer
    pub fn from_writer(writer: W) -> Self {
        Self {
            writer,
            records_written: 0,
        }
    }

    /// Write a single record
    pub fn write_record(&mut self, chain: &ImmuneChain) -> Result<()> {
        write!(self.writer, "{}", chain)?;
        self.records_written += 1;
        Ok(())
    }

    /// Write every record from a fallible stream, stopping at the first error
    pub fn write_all<I>(&mut self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = Result<ImmuneChain>>,
    {
        for record in records {
            self.write_record(&record?)?;
        }
        Ok(())
    }

    /// Get the number of records written so far
    pub fn records_written(&self) -> usize {
        self.records_written
    }

    /// Flush buffered data
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flush and hand the underlying writer back to the caller
    pub fn into_inner(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl VdjxmlWriter<CompressedWriter> {
    /// Create a writer for a data sink
    pub fn new(sink: DataSink) -> Result<Self> {
        Ok(Self::from_writer(CompressedWriter::new(sink)?))
    }

    /// Create (truncate) the file at `path`
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(DataSink::from_path(path))
    }

    /// Create a writer to stdout
    pub fn stdout() -> Result<Self> {
        Self::new(DataSink::stdout())
    }

    /// Flush all data and finalize compression
    pub fn finish(self) -> Result<()> {
        self.writer.finish()?;
        Ok(())
    }
}

/// Parse every record in `text`
///
/// Convenience for small inputs and tests; streaming callers should use
/// [`VdjxmlReader`] directly.
pub fn parse_str(text: &str) -> Result<Vec<ImmuneChain>> {
    VdjxmlReader::from_reader(text.as_bytes()).collect()
}
