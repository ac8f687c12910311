//! Fixed-size packetization

use crate::error::{Result, VdjError};
use crate::io::{CompressedWriter, VdjxmlWriter};
use crate::partition::part_path;
use crate::types::ImmuneChain;
use std::path::{Path, PathBuf};

/// Split a record stream into files of `packet_size` records each
///
/// Parts are named `<base>.0`, `<base>.1`, ... and every part holds exactly
/// `packet_size` records except possibly the last, which is never empty.
/// An empty stream creates no files. At most one part is open at a time.
///
/// Returns the part paths in creation order.
///
/// # Errors
///
/// - [`VdjError::Precondition`] if `packet_size` is zero
/// - the first stream or I/O error; parts written so far stay on disk
///
/// # Example
///
/// ```no_run
/// use vdjstream::partition::split_into_parts;
/// use vdjstream::VdjxmlReader;
///
/// # fn main() -> vdjstream::Result<()> {
/// let reader = VdjxmlReader::from_path("reads.vdjxml")?;
/// let parts = split_into_parts(10_000, reader, "work/reads")?;
/// println!("{} parts", parts.len());
/// # Ok(())
/// # }
/// ```
pub fn split_into_parts<I, P>(packet_size: usize, records: I, base: P) -> Result<Vec<PathBuf>>
where
    I: IntoIterator<Item = Result<ImmuneChain>>,
    P: AsRef<Path>,
{
    if packet_size == 0 {
        return Err(VdjError::Precondition(
            "packet size must be at least 1".to_string(),
        ));
    }

    let base = base.as_ref();
    let mut parts = Vec::new();
    let mut current: Option<VdjxmlWriter<CompressedWriter>> = None;

    for record in records {
        let chain = record?;

        let mut writer = match current.take() {
            Some(writer) => writer,
            None => {
                let path = part_path(base, parts.len());
                log::debug!("Opening part {}", path.display());
                let writer = VdjxmlWriter::create(&path)?;
                parts.push(path);
                writer
            }
        };

        writer.write_record(&chain)?;

        if writer.records_written() == packet_size {
            writer.finish()?;
        } else {
            current = Some(writer);
        }
    }

    if let Some(last) = current.take() {
        last.finish()?;
    }

    log::info!(
        "Split stream into {} part(s) of up to {} records",
        parts.len(),
        packet_size
    );
    Ok(parts)
}
