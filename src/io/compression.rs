//! Data sources and transparent gzip handling
//!
//! Readers detect gzip input from its magic bytes, so `parts.0` and
//! `parts.0.gz` open the same way. Writers pick gzip from the `.gz`
//! extension of the sink path.

use crate::error::Result;
use crate::io::DataSink;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Gzip magic bytes (RFC 1952)
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Where records are read from
#[derive(Debug, Clone)]
pub enum DataSource {
    /// Local file path
    Local(PathBuf),

    /// Standard input
    Stdin,
}

impl DataSource {
    /// Create a local file data source
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        DataSource::Local(path.as_ref().to_path_buf())
    }

    /// Create a data source reading standard input
    pub fn stdin() -> Self {
        DataSource::Stdin
    }

    /// Open the data source and return a buffered reader
    pub fn open(&self) -> Result<Box<dyn BufRead + Send>> {
        match self {
            DataSource::Local(path) => {
                let file = File::open(path)?;
                Ok(Box::new(BufReader::new(file)))
            }
            DataSource::Stdin => Ok(Box::new(BufReader::new(io::stdin()))),
        }
    }
}

/// Buffered reader that transparently decompresses gzip input
///
/// # Example
///
/// ```no_run
/// use vdjstream::io::{CompressedReader, DataSource};
///
/// # fn main() -> vdjstream::Result<()> {
/// let reader = CompressedReader::new(DataSource::from_path("reads.vdjxml.gz"))?;
/// # Ok(())
/// # }
/// ```
pub struct CompressedReader {
    inner: Box<dyn BufRead + Send>,
}

impl CompressedReader {
    /// Open a data source, sniffing the first two bytes for gzip
    pub fn new(source: DataSource) -> Result<Self> {
        let mut reader = source.open()?;

        let is_gzipped = {
            let peeked = reader.fill_buf()?;
            peeked.len() >= 2 && peeked[..2] == GZIP_MAGIC
        };

        if is_gzipped {
            Ok(Self {
                inner: Box::new(BufReader::new(MultiGzDecoder::new(reader))),
            })
        } else {
            Ok(Self { inner: reader })
        }
    }

    /// Get the inner buffered reader
    pub fn into_inner(self) -> Box<dyn BufRead + Send> {
        self.inner
    }
}

impl Read for CompressedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl BufRead for CompressedReader {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.inner.consume(amt)
    }
}

/// Writer that compresses according to its sink
///
/// Call [`finish`](CompressedWriter::finish) to surface errors from the
/// final flush; `Drop` only flushes on a best-effort basis.
pub enum CompressedWriter {
    /// Uncompressed writer with buffering
    Plain(Option<BufWriter<Box<dyn Write>>>),

    /// Gzip compressed writer
    Gzip(Option<GzEncoder<BufWriter<Box<dyn Write>>>>),
}

impl CompressedWriter {
    /// Create a new writer from a data sink
    ///
    /// - `.gz` → gzip compression
    /// - other → uncompressed
    pub fn new(sink: DataSink) -> io::Result<Self> {
        match sink {
            DataSink::Local(path) => {
                let file = File::create(&path)?;
                match path.extension().and_then(|s| s.to_str()) {
                    Some("gz") => Self::new_gzip(Box::new(file)),
                    _ => Self::new_plain(Box::new(file)),
                }
            }
            DataSink::Stdout => Self::new_plain(Box::new(io::stdout())),
        }
    }

    /// Create a plain (uncompressed) writer
    pub fn new_plain(writer: Box<dyn Write>) -> io::Result<Self> {
        Ok(Self::Plain(Some(BufWriter::new(writer))))
    }

    /// Create a gzip writer at the default compression level
    pub fn new_gzip(writer: Box<dyn Write>) -> io::Result<Self> {
        let encoder = GzEncoder::new(BufWriter::new(writer), Compression::default());
        Ok(Self::Gzip(Some(encoder)))
    }

    /// Flush buffered data without finalizing a gzip stream
    pub fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Plain(Some(w)) => w.flush(),
            Self::Gzip(Some(w)) => w.flush(),
            _ => Ok(()),
        }
    }

    /// Flush everything and write the gzip trailer if compressing
    pub fn finish(mut self) -> io::Result<()> {
        match &mut self {
            Self::Plain(w) => match w.take() {
                Some(mut writer) => writer.flush(),
                None => Ok(()),
            },
            Self::Gzip(w) => match w.take() {
                Some(encoder) => {
                    let mut inner = encoder.finish()?;
                    inner.flush()
                }
                None => Ok(()),
            },
        }
    }
}

impl Write for CompressedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Plain(Some(w)) => w.write(buf),
            Self::Gzip(Some(w)) => w.write(buf),
            _ => Err(io::Error::new(
                io::ErrorKind::Other,
                "Cannot write to finished writer",
            )),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        CompressedWriter::flush(self)
    }
}

impl Drop for CompressedWriter {
    fn drop(&mut self) {
        // Best-effort; gzip streams dropped here are flushed but left without a trailer
        let _ = self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn read_all(path: &Path) -> String {
        let mut reader = CompressedReader::new(DataSource::from_path(path)).unwrap();
        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn test_plain_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain.vdjxml");

        let mut writer = CompressedWriter::new(DataSink::from_path(&path)).unwrap();
        writer.write_all(b"<ImmuneChain>\n</ImmuneChain>\n").unwrap();
        writer.finish().unwrap();

        assert_eq!(read_all(&path), "<ImmuneChain>\n</ImmuneChain>\n");
    }

    #[test]
    fn test_gzip_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("packed.vdjxml.gz");

        let mut writer = CompressedWriter::new(DataSink::from_path(&path)).unwrap();
        assert!(matches!(writer, CompressedWriter::Gzip(_)));
        writer.write_all(b"hello gzip\n").unwrap();
        writer.finish().unwrap();

        let raw = std::fs::read(&path).unwrap();
        assert_eq!(&raw[..2], &GZIP_MAGIC);
        assert_eq!(read_all(&path), "hello gzip\n");
    }

    #[test]
    fn test_gzip_detected_without_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("no_extension");

        let file = File::create(&path).unwrap();
        let mut writer = CompressedWriter::new_gzip(Box::new(file)).unwrap();
        writer.write_all(b"sniffed\n").unwrap();
        writer.finish().unwrap();

        assert_eq!(read_all(&path), "sniffed\n");
    }

    #[test]
    fn test_missing_file() {
        let result = CompressedReader::new(DataSource::from_path("/nonexistent/file.vdjxml"));
        assert!(result.is_err());
    }
}
