//! Per-(V, J) category partitioning

use crate::error::{Result, VdjError};
use crate::io::{CompressedWriter, VdjxmlWriter};
use crate::partition::manifest::{Part, PartManifest};
use crate::partition::part_path;
use crate::types::ImmuneChain;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Files and category keys produced by [`split_into_vj_parts`]
///
/// `parts[i]` holds the records whose category key is `keys[i]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VjParts {
    /// Part file paths, V-major order
    pub parts: Vec<PathBuf>,
    /// Sanitized category key of each part
    pub keys: Vec<String>,
}

impl From<VjParts> for PartManifest {
    fn from(vj: VjParts) -> Self {
        vj.parts
            .into_iter()
            .zip(vj.keys)
            .map(|(path, key)| Part::with_key(path, key))
            .collect()
    }
}

/// Replace characters outside `[A-Za-z0-9._-]` with `_`
///
/// ```
/// use vdjstream::partition::sanitize_segment;
///
/// assert_eq!(sanitize_segment("IGHV1-2*02"), "IGHV1-2_02");
/// assert_eq!(sanitize_segment("IGHV1/OR15-1*01"), "IGHV1_OR15-1_01");
/// ```
pub fn sanitize_segment(segment: &str) -> String {
    segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Identifier of a (V, J) category, safe for file names and job names
pub fn category_key(v_segment: &str, j_segment: &str) -> String {
    format!("{}_{}", sanitize_segment(v_segment), sanitize_segment(j_segment))
}

fn index_categories<'a, S: AsRef<str>>(
    categories: &'a [S],
    kind: &str,
) -> Result<HashMap<&'a str, usize>> {
    let mut index = HashMap::with_capacity(categories.len());
    for (i, segment) in categories.iter().enumerate() {
        if index.insert(segment.as_ref(), i).is_some() {
            return Err(VdjError::Precondition(format!(
                "duplicate {} category '{}'",
                kind,
                segment.as_ref()
            )));
        }
    }
    Ok(index)
}

/// Split a record stream into one file per (V, J) category pair
///
/// Every pair of the cross product gets a part named `<base>.<i>`, created
/// up front even if no record lands in it. Parts are numbered V-major:
/// pair `(v_categories[a], j_categories[b])` is part `a * j_categories.len() + b`.
/// Records are routed on their raw segment names, so two segments that
/// sanitize to the same key still go to distinct parts.
///
/// # Errors
///
/// - [`VdjError::Precondition`] if a category is listed twice
/// - [`VdjError::UnknownCategory`] for a record whose (V, J) pair is not in
///   the cross product; segment assignment must be complete upstream
/// - the first stream or I/O error
///
/// All part files are flushed and closed on every exit path.
pub fn split_into_vj_parts<I, P, S>(
    records: I,
    base: P,
    v_categories: &[S],
    j_categories: &[S],
) -> Result<VjParts>
where
    I: IntoIterator<Item = Result<ImmuneChain>>,
    P: AsRef<Path>,
    S: AsRef<str>,
{
    let base = base.as_ref();
    let v_index = index_categories(v_categories, "V")?;
    let j_index = index_categories(j_categories, "J")?;

    let mut result = VjParts::default();
    let mut writers: Vec<VdjxmlWriter<CompressedWriter>> =
        Vec::with_capacity(v_categories.len() * j_categories.len());

    for v in v_categories {
        for j in j_categories {
            let path = part_path(base, writers.len());
            writers.push(VdjxmlWriter::create(&path)?);
            result.keys.push(category_key(v.as_ref(), j.as_ref()));
            result.parts.push(path);
        }
    }
    log::info!(
        "Created {} V/J parts ({} V x {} J)",
        writers.len(),
        v_categories.len(),
        j_categories.len()
    );

    for record in records {
        let chain = record?;
        let slot = match (
            v_index.get(chain.v_segment.as_str()),
            j_index.get(chain.j_segment.as_str()),
        ) {
            (Some(&vi), Some(&ji)) => vi * j_categories.len() + ji,
            _ => {
                return Err(VdjError::UnknownCategory {
                    v: chain.v_segment,
                    j: chain.j_segment,
                })
            }
        };
        writers[slot].write_record(&chain)?;
    }

    for writer in writers {
        writer.finish()?;
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::VdjxmlReader;
    use tempfile::TempDir;

    fn chain(descr: &str, v: &str, j: &str) -> Result<ImmuneChain> {
        let mut chain = ImmuneChain::new(descr, "ACGT");
        chain.v_segment = v.to_string();
        chain.j_segment = j.to_string();
        Ok(chain)
    }

    fn descriptions(path: &Path) -> Vec<String> {
        VdjxmlReader::from_path(path)
            .unwrap()
            .map(|r| r.unwrap().description)
            .collect()
    }

    #[test]
    fn test_cross_product_precreated() {
        let dir = TempDir::new().unwrap();
        let v = ["IGHV1-2*02", "IGHV3-23*01"];
        let j = ["IGHJ4*02", "IGHJ6*03"];

        let records = vec![chain("a", "IGHV3-23*01", "IGHJ4*02")];
        let vj = split_into_vj_parts(records, dir.path().join("vj"), &v, &j).unwrap();

        assert_eq!(vj.parts.len(), 4);
        assert!(vj.parts.iter().all(|p| p.exists()));
        assert_eq!(
            vj.keys,
            vec![
                "IGHV1-2_02_IGHJ4_02",
                "IGHV1-2_02_IGHJ6_03",
                "IGHV3-23_01_IGHJ4_02",
                "IGHV3-23_01_IGHJ6_03",
            ]
        );
        assert_eq!(descriptions(&vj.parts[2]), vec!["a"]);
        assert!(descriptions(&vj.parts[0]).is_empty());
    }

    #[test]
    fn test_empty_stream_still_creates_parts() {
        let dir = TempDir::new().unwrap();
        let v = ["V1", "V2"];
        let j = ["J1", "J2"];
        let vj = split_into_vj_parts(Vec::new(), dir.path().join("vj"), &v, &j).unwrap();
        assert_eq!(vj.parts.len(), 4);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 4);
    }

    #[test]
    fn test_routing_preserves_order_within_part() {
        let dir = TempDir::new().unwrap();
        let v = ["V1", "V2"];
        let j = ["J1"];
        let records = vec![
            chain("a", "V1", "J1"),
            chain("b", "V2", "J1"),
            chain("c", "V1", "J1"),
        ];
        let vj = split_into_vj_parts(records, dir.path().join("vj"), &v, &j).unwrap();
        assert_eq!(descriptions(&vj.parts[0]), vec!["a", "c"]);
        assert_eq!(descriptions(&vj.parts[1]), vec!["b"]);
    }

    #[test]
    fn test_unknown_category_is_fatal() {
        let dir = TempDir::new().unwrap();
        let v = ["V1"];
        let j = ["J1"];
        let records = vec![chain("a", "V1", "J1"), chain("b", "V9", "J1")];

        let result = split_into_vj_parts(records, dir.path().join("vj"), &v, &j);
        assert!(matches!(
            result,
            Err(VdjError::UnknownCategory { ref v, ref j }) if v == "V9" && j == "J1"
        ));
    }

    #[test]
    fn test_unassigned_segments_are_unknown() {
        let dir = TempDir::new().unwrap();
        let records = vec![chain("a", "", "")];
        let result = split_into_vj_parts(records, dir.path().join("vj"), &["V1"], &["J1"]);
        assert!(matches!(result, Err(VdjError::UnknownCategory { .. })));
    }

    #[test]
    fn test_duplicate_category_rejected() {
        let dir = TempDir::new().unwrap();
        let result = split_into_vj_parts(Vec::new(), dir.path().join("vj"), &["V1", "V1"], &["J1"]);
        assert!(matches!(result, Err(VdjError::Precondition(_))));
    }

    #[test]
    fn test_colliding_keys_route_separately() {
        let dir = TempDir::new().unwrap();
        let v = ["V1*01", "V1/01"];
        let j = ["J1"];
        let records = vec![chain("star", "V1*01", "J1"), chain("slash", "V1/01", "J1")];

        let vj = split_into_vj_parts(records, dir.path().join("vj"), &v, &j).unwrap();
        assert_eq!(vj.keys[0], vj.keys[1]);
        assert_eq!(descriptions(&vj.parts[0]), vec!["star"]);
        assert_eq!(descriptions(&vj.parts[1]), vec!["slash"]);
    }

    #[test]
    fn test_into_manifest() {
        let vj = VjParts {
            parts: vec![PathBuf::from("vj.0"), PathBuf::from("vj.1")],
            keys: vec!["a_b".to_string(), "c_d".to_string()],
        };
        let manifest: PartManifest = vj.into();
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.keys().collect::<Vec<_>>(), vec![Some("a_b"), Some("c_d")]);
    }
}
