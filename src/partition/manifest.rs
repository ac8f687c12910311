//! Part manifests and recombination of parts
//!
//! A manifest is a plain TSV listing of the parts a split produced, one per
//! line: `path` for size packets, `path<TAB>key` for V/J parts. It lets a
//! later step (or a later process) find the parts again after the jobs that
//! consumed them have finished.
//!
//! ```text
//! work/reads.0	IGHV1-2_02_IGHJ4_02
//! work/reads.1	IGHV1-2_02_IGHJ6_03
//! ```

use crate::error::{Result, VdjError};
use crate::io::{CompressedReader, VdjxmlReader};
use crate::types::ImmuneChain;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// One part file, with its category key when it came from a V/J split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Location of the part file
    pub path: PathBuf,
    /// Category key, `None` for size packets
    pub key: Option<String>,
}

impl Part {
    /// Part without a category key
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Part {
            path: path.into(),
            key: None,
        }
    }

    /// Part belonging to a V/J category
    pub fn with_key<P: Into<PathBuf>, K: Into<String>>(path: P, key: K) -> Self {
        Part {
            path: path.into(),
            key: Some(key.into()),
        }
    }
}

/// Ordered list of parts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartManifest {
    parts: Vec<Part>,
}

impl PartManifest {
    /// Empty manifest
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a part
    pub fn push(&mut self, part: Part) {
        self.parts.push(part);
    }

    /// Number of parts
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// True when the manifest lists no parts
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// All parts, in order
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Part paths, in order
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.parts.iter().map(|p| p.path.as_path())
    }

    /// Category keys, in order
    pub fn keys(&self) -> impl Iterator<Item = Option<&str>> {
        self.parts.iter().map(|p| p.key.as_deref())
    }

    /// Write the manifest as TSV
    ///
    /// # Errors
    ///
    /// [`VdjError::Precondition`] if a path is not valid UTF-8 or contains a
    /// tab or newline, since it could not be read back.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        for part in &self.parts {
            let path = part.path.to_str().ok_or_else(|| {
                VdjError::Precondition(format!(
                    "part path is not valid UTF-8: {}",
                    part.path.display()
                ))
            })?;
            if path.contains(['\t', '\n']) {
                return Err(VdjError::Precondition(format!(
                    "part path contains a tab or newline: {:?}",
                    path
                )));
            }
            match &part.key {
                Some(key) => writeln!(writer, "{}\t{}", path, key)?,
                None => writeln!(writer, "{}", path)?,
            }
        }
        writer.flush()?;
        Ok(())
    }

    /// Parse a TSV manifest; blank lines are skipped
    pub fn read_from<R: BufRead>(reader: R) -> Result<Self> {
        let mut manifest = PartManifest::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            let mut fields = line.split('\t');
            let path = fields.next().unwrap_or_default();
            let key = fields.next();
            if fields.next().is_some() {
                return Err(VdjError::Format {
                    line: i + 1,
                    msg: "manifest line has more than two fields".to_string(),
                });
            }
            manifest.push(Part {
                path: PathBuf::from(path),
                key: key.map(str::to_string),
            });
        }
        Ok(manifest)
    }

    /// Write the manifest to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())?;
        self.write_to(BufWriter::new(file))
    }

    /// Read a manifest file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref()).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                VdjError::NotFound(format!("manifest {}", path.as_ref().display()))
            } else {
                VdjError::Io(e)
            }
        })?;
        Self::read_from(BufReader::new(file))
    }

    /// Stream the records of every part, in manifest order
    pub fn records(&self) -> PartsReader {
        read_parts(self.paths().map(Path::to_path_buf).collect::<Vec<_>>())
    }
}

impl FromIterator<Part> for PartManifest {
    fn from_iter<T: IntoIterator<Item = Part>>(iter: T) -> Self {
        PartManifest {
            parts: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<PathBuf>> for PartManifest {
    fn from(paths: Vec<PathBuf>) -> Self {
        paths.into_iter().map(Part::new).collect()
    }
}

/// Concatenated record stream over several part files
///
/// Parts are opened one at a time, when the previous one is exhausted.
/// After the first error the iterator yields `None`.
pub struct PartsReader {
    pending: std::vec::IntoIter<PathBuf>,
    current: Option<VdjxmlReader<CompressedReader>>,
    failed: bool,
}

/// Read part files back as one stream, preserving part order and the record
/// order inside each part
pub fn read_parts<I, P>(paths: I) -> PartsReader
where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
{
    PartsReader {
        pending: paths.into_iter().map(Into::into).collect::<Vec<_>>().into_iter(),
        current: None,
        failed: false,
    }
}

impl Iterator for PartsReader {
    type Item = Result<ImmuneChain>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            if let Some(reader) = self.current.as_mut() {
                match reader.next() {
                    Some(Ok(chain)) => return Some(Ok(chain)),
                    Some(Err(e)) => {
                        self.failed = true;
                        return Some(Err(e));
                    }
                    None => self.current = None,
                }
            }

            let path = self.pending.next()?;
            log::debug!("Reading part {}", path.display());
            match VdjxmlReader::from_path(&path) {
                Ok(reader) => self.current = Some(reader),
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
