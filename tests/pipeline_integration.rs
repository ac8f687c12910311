//! Integration tests for file-based VDJXML pipelines
//!
//! Each test writes a small repertoire to disk, pushes it through one or
//! more stages, and reads the result back from the filesystem.

use std::fs;
use std::path::Path;
use tempfile::TempDir;
use vdjstream::io::DataSource;
use vdjstream::operations::{clone_counts, filter_and, filter_or, size_select};
use vdjstream::partition::{
    read_categories, read_parts, split_into_parts, split_into_vj_parts, PartManifest,
};
use vdjstream::{ImmuneChain, Result, VdjError, VdjxmlReader, VdjxmlWriter};

const V_SEGMENTS: [&str; 3] = ["IGHV1-2*02", "IGHV3-23*01", "IGHV4-34*01"];
const J_SEGMENTS: [&str; 2] = ["IGHJ4*02", "IGHJ6*03"];

fn repertoire(n: usize) -> Vec<ImmuneChain> {
    (0..n)
        .map(|i| {
            let mut chain = ImmuneChain::new(format!("read{}", i), "CAGGTGCAGCTGGTGCAGTCTGGG");
            chain.v_segment = V_SEGMENTS[i % V_SEGMENTS.len()].to_string();
            chain.j_segment = J_SEGMENTS[i % J_SEGMENTS.len()].to_string();
            chain.junction = "TGTGCGAGAGATTACTGG".to_string();
            chain.add_tag(if i % 2 == 0 { "sample1" } else { "sample2" });
            chain.add_tag(format!("clone|{}", i % 4));
            chain
        })
        .collect()
}

fn write_file(path: &Path, chains: &[ImmuneChain]) {
    let mut writer = VdjxmlWriter::create(path).unwrap();
    for chain in chains {
        writer.write_record(chain).unwrap();
    }
    writer.finish().unwrap();
}

fn read_file(path: &Path) -> Vec<ImmuneChain> {
    VdjxmlReader::from_path(path)
        .unwrap()
        .collect::<Result<Vec<_>>>()
        .unwrap()
}

#[test]
fn test_file_roundtrip_plain_and_gzip() {
    let dir = TempDir::new().unwrap();
    let chains = repertoire(10);

    for name in ["rep.vdjxml", "rep.vdjxml.gz"] {
        let path = dir.path().join(name);
        write_file(&path, &chains);
        assert_eq!(read_file(&path), chains, "round trip through {}", name);
    }

    let gz = fs::read(dir.path().join("rep.vdjxml.gz")).unwrap();
    assert_eq!(&gz[..2], &[0x1f, 0x8b]);
}

#[test]
fn test_on_disk_layout() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("one.vdjxml");

    let mut chain = ImmuneChain::new("r1", "acgt");
    chain.v_segment = "IGHV1-2*02".to_string();
    chain.junction = "TGT".to_string();
    chain.add_tags(["sample1", "positive"]);
    write_file(&path, &[chain]);

    let text = fs::read_to_string(&path).unwrap();
    assert_eq!(
        text,
        "<ImmuneChain>\n\
         \t<descr>r1</descr>\n\
         \t<seq>ACGT</seq>\n\
         \t<v>IGHV1-2*02</v>\n\
         \t<d></d>\n\
         \t<j></j>\n\
         \t<ighc></ighc>\n\
         \t<cdr3>3</cdr3>\n\
         \t<junction>TGT</junction>\n\
         \t<func></func>\n\
         \t<tag>positive</tag>\n\
         \t<tag>sample1</tag>\n\
         </ImmuneChain>\n"
    );
}

#[test]
fn test_filter_pipeline() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.vdjxml");
    let output = dir.path().join("out.vdjxml");
    write_file(&input, &repertoire(12));

    let reader = VdjxmlReader::from_path(&input).unwrap();
    let mut writer = VdjxmlWriter::create(&output).unwrap();
    writer
        .write_all(filter_and(["sample1", "IGHV1-2*02"], reader))
        .unwrap();
    writer.finish().unwrap();

    let kept = read_file(&output);
    // sample1 is every even index, IGHV1-2*02 every third
    let names: Vec<_> = kept.iter().map(|c| c.description.as_str()).collect();
    assert_eq!(names, vec!["read0", "read6"]);

    let reader = VdjxmlReader::from_path(&input).unwrap();
    let either = filter_or(["sample1", "sample2"], reader).count();
    assert_eq!(either, 12);

    let reader = VdjxmlReader::from_path(&input).unwrap();
    assert_eq!(size_select(Some(25), None, reader).count(), 0);
}

#[test]
fn test_split_then_recombine() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.vdjxml.gz");
    let chains = repertoire(7);
    write_file(&input, &chains);

    let base = dir.path().join("work").join("out");
    fs::create_dir(dir.path().join("work")).unwrap();
    let parts = split_into_parts(3, VdjxmlReader::from_path(&input).unwrap(), &base).unwrap();

    assert_eq!(parts.len(), 3);
    let sizes: Vec<_> = parts.iter().map(|p| read_file(p).len()).collect();
    assert_eq!(sizes, vec![3, 3, 1]);

    let manifest_path = dir.path().join("parts.tsv");
    PartManifest::from(parts).save(&manifest_path).unwrap();

    let recombined: Vec<ImmuneChain> = PartManifest::load(&manifest_path)
        .unwrap()
        .records()
        .collect::<Result<_>>()
        .unwrap();
    assert_eq!(recombined, chains);
}

#[test]
fn test_split_vj_with_category_files() {
    let dir = TempDir::new().unwrap();
    let v_file = dir.path().join("v.txt");
    let j_file = dir.path().join("j.txt");
    fs::write(&v_file, format!("# V\n{}\n", V_SEGMENTS.join("\n"))).unwrap();
    fs::write(&j_file, J_SEGMENTS.join("\n")).unwrap();

    let v = read_categories(&v_file).unwrap();
    let j = read_categories(&j_file).unwrap();
    assert_eq!(v.len(), 3);

    let chains = repertoire(12);
    let input = dir.path().join("in.vdjxml");
    write_file(&input, &chains);

    let vj = split_into_vj_parts(
        VdjxmlReader::from_path(&input).unwrap(),
        dir.path().join("vj"),
        &v,
        &j,
    )
    .unwrap();

    assert_eq!(vj.parts.len(), 6);
    let mut total = 0;
    for (path, key) in vj.parts.iter().zip(&vj.keys) {
        let part = read_file(path);
        total += part.len();
        for chain in &part {
            let expected = vdjstream::partition::category_key(&chain.v_segment, &chain.j_segment);
            assert_eq!(&expected, key);
        }
    }
    assert_eq!(total, chains.len());

    // every record comes back exactly once
    let mut names: Vec<String> = read_parts(vj.parts.clone())
        .map(|r| r.unwrap().description)
        .collect();
    names.sort();
    let mut expected: Vec<String> = chains.iter().map(|c| c.description.clone()).collect();
    expected.sort();
    assert_eq!(names, expected);
}

#[test]
fn test_split_vj_rejects_unlisted_segment() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.vdjxml");
    write_file(&input, &repertoire(3));

    let result = split_into_vj_parts(
        VdjxmlReader::from_path(&input).unwrap(),
        dir.path().join("vj"),
        &V_SEGMENTS[..2],
        &J_SEGMENTS,
    );
    assert!(matches!(result, Err(VdjError::UnknownCategory { .. })));
}

#[test]
fn test_clone_counts_from_file() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.vdjxml");
    write_file(&input, &repertoire(10));

    let counts = clone_counts(VdjxmlReader::from_path(&input).unwrap()).unwrap();
    assert_eq!(counts["clone|0"], 3);
    assert_eq!(counts["clone|1"], 3);
    assert_eq!(counts["clone|2"], 2);
    assert_eq!(counts["clone|3"], 2);
}

#[test]
fn test_truncated_file_reports_format_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.vdjxml");
    fs::write(&path, "<ImmuneChain>\n\t<descr>r1</descr>\n\t<seq>ACGT</seq>\n").unwrap();

    let results: Vec<_> = VdjxmlReader::new(DataSource::from_path(&path))
        .unwrap()
        .collect();
    assert_eq!(results.len(), 1);
    assert!(matches!(results[0], Err(VdjError::Format { .. })));
}

#[test]
fn test_missing_input_file() {
    let result = VdjxmlReader::from_path("/nonexistent/in.vdjxml");
    assert!(result.is_err());
}
