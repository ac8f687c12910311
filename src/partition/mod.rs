//! Splitting record streams into part files, and reading them back
//!
//! Two strategies are provided:
//!
//! - [`split_into_parts`]: fixed-size packets, for spreading work evenly
//!   across batch jobs
//! - [`split_into_vj_parts`]: one part per (V, J) segment pair, so that
//!   clustering can run independently per category
//!
//! Both name their outputs `<base>.<index>` with a 0-based index. Since the
//! index is the final extension, part files are always written uncompressed.

pub mod categories;
pub mod manifest;
pub mod packets;

pub use categories::{category_key, sanitize_segment, split_into_vj_parts, VjParts};
pub use manifest::{read_parts, Part, PartManifest, PartsReader};
pub use packets::split_into_parts;

use crate::error::{Result, VdjError};
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// `<base>.<index>`
///
/// ```
/// use std::path::Path;
/// use vdjstream::partition::part_path;
///
/// assert_eq!(part_path(Path::new("work/reads"), 3), Path::new("work/reads.3"));
/// ```
pub fn part_path(base: &Path, index: usize) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(format!(".{}", index));
    PathBuf::from(name)
}

/// Parse a category list: one segment name per line
///
/// Surrounding whitespace is trimmed; blank lines and lines starting with
/// `#` are skipped.
pub fn parse_categories<R: BufRead>(reader: R) -> Result<Vec<String>> {
    let mut categories = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let segment = line.trim();
        if segment.is_empty() || segment.starts_with('#') {
            continue;
        }
        categories.push(segment.to_string());
    }
    Ok(categories)
}

/// Read a category list file, see [`parse_categories`]
pub fn read_categories<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            VdjError::NotFound(format!("category file {}", path.display()))
        } else {
            VdjError::Io(e)
        }
    })?;
    parse_categories(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_part_path_keeps_existing_extension() {
        assert_eq!(
            part_path(Path::new("/tmp/in.vdjxml"), 0),
            Path::new("/tmp/in.vdjxml.0")
        );
    }

    #[test]
    fn test_parse_categories() {
        let text = "# V segments\nIGHV1-2*02\n\n  IGHV3-23*01  \n#IGHV9\n";
        let cats = parse_categories(Cursor::new(text)).unwrap();
        assert_eq!(cats, vec!["IGHV1-2*02", "IGHV3-23*01"]);
    }

    #[test]
    fn test_read_categories_missing() {
        let result = read_categories("/nonexistent/v_segments.txt");
        assert!(matches!(result, Err(VdjError::NotFound(_))));
    }
}
