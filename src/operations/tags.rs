//! Tag lookup and tag-based stream filtering
//!
//! Filters operate on [`ImmuneChain::all_tags`], so a V segment name or a
//! read description works as a filter tag just like an explicit tag. Errors
//! in the input stream are passed through untouched so the consumer sees
//! them at the position they occurred.
//!
//! # Examples
//!
//! ```
//! use vdjstream::operations::{filter_and, filter_or};
//! use vdjstream::ImmuneChain;
//!
//! let mut a = ImmuneChain::new("a", "ACGT");
//! a.add_tags(["sample1", "positive"]);
//! let mut b = ImmuneChain::new("b", "ACGT");
//! b.add_tag("sample2");
//!
//! let records = || vec![Ok(a.clone()), Ok(b.clone())];
//! let both: Vec<_> = filter_and(["sample1", "positive"], records()).collect();
//! assert_eq!(both.len(), 1);
//!
//! let either: Vec<_> = filter_or(["sample1", "sample2"], records()).collect();
//! assert_eq!(either.len(), 2);
//! ```

use crate::error::{Result, VdjError};
use crate::types::ImmuneChain;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Prefix of clone tags written by clustering
pub const CLONE_PREFIX: &str = "clone";

/// Prefix of barcode tags written by barcode identification
pub const BARCODE_PREFIX: &str = "barcode";

/// First explicit tag starting with `prefix`
///
/// Tags are kept in a set, so "first" is the smallest matching tag in
/// lexicographic order.
///
/// # Errors
///
/// [`VdjError::NotFound`] when no explicit tag starts with `prefix`.
pub fn tag_with_prefix<'a>(chain: &'a ImmuneChain, prefix: &str) -> Result<&'a str> {
    chain
        .tags()
        .iter()
        .find(|tag| tag.starts_with(prefix))
        .map(String::as_str)
        .ok_or_else(|| VdjError::NotFound(format!("tag that starts with '{}'", prefix)))
}

/// Clone tag (`clone|...`) of a clustered chain
pub fn clone_tag(chain: &ImmuneChain) -> Result<&str> {
    tag_with_prefix(chain, CLONE_PREFIX)
}

/// Barcode tag of a chain, or the empty string when it has none
pub fn barcode_tag(chain: &ImmuneChain) -> &str {
    tag_with_prefix(chain, BARCODE_PREFIX).unwrap_or("")
}

/// True when `all_tags` contains every query tag (an empty query matches everything)
pub fn matches_all(chain: &ImmuneChain, query: &BTreeSet<String>) -> bool {
    let all = chain.all_tags();
    query.iter().all(|tag| all.contains(tag.as_str()))
}

/// True when `all_tags` shares at least one tag with the query (an empty query matches nothing)
pub fn matches_any(chain: &ImmuneChain, query: &BTreeSet<String>) -> bool {
    let all = chain.all_tags();
    query.iter().any(|tag| all.contains(tag.as_str()))
}

fn collect_query<T, S>(tags: T) -> BTreeSet<String>
where
    T: IntoIterator<Item = S>,
    S: Into<String>,
{
    tags.into_iter().map(Into::into).collect()
}

/// Keep records whose `all_tags` is a superset of `tags`
pub fn filter_and<T, S, I>(tags: T, records: I) -> impl Iterator<Item = Result<ImmuneChain>>
where
    T: IntoIterator<Item = S>,
    S: Into<String>,
    I: IntoIterator<Item = Result<ImmuneChain>>,
{
    let query = collect_query(tags);
    records.into_iter().filter(move |record| match record {
        Ok(chain) => matches_all(chain, &query),
        Err(_) => true,
    })
}

/// Keep records whose `all_tags` intersects `tags`
pub fn filter_or<T, S, I>(tags: T, records: I) -> impl Iterator<Item = Result<ImmuneChain>>
where
    T: IntoIterator<Item = S>,
    S: Into<String>,
    I: IntoIterator<Item = Result<ImmuneChain>>,
{
    let query = collect_query(tags);
    records.into_iter().filter(move |record| match record {
        Ok(chain) => matches_any(chain, &query),
        Err(_) => true,
    })
}

/// Keep records with `min <= len <= max`
///
/// `min` defaults to 0 and `max` to unbounded.
pub fn size_select<I>(
    min: Option<usize>,
    max: Option<usize>,
    records: I,
) -> impl Iterator<Item = Result<ImmuneChain>>
where
    I: IntoIterator<Item = Result<ImmuneChain>>,
{
    let min = min.unwrap_or(0);
    let max = max.unwrap_or(usize::MAX);
    records.into_iter().filter(move |record| match record {
        Ok(chain) => (min..=max).contains(&chain.len()),
        Err(_) => true,
    })
}

/// True when both the V and J segment of `chain` are known categories
pub fn is_full_vj(chain: &ImmuneChain, v_segments: &HashSet<String>, j_segments: &HashSet<String>) -> bool {
    v_segments.contains(&chain.v_segment) && j_segments.contains(&chain.j_segment)
}

/// Map each clone tag to the 0-based positions of its records
///
/// # Errors
///
/// Fails on the first stream error or the first record without a clone tag.
pub fn clone_indices<I>(records: I) -> Result<BTreeMap<String, Vec<usize>>>
where
    I: IntoIterator<Item = Result<ImmuneChain>>,
{
    let mut clones: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (i, record) in records.into_iter().enumerate() {
        let chain = record?;
        clones.entry(clone_tag(&chain)?.to_string()).or_default().push(i);
    }
    Ok(clones)
}

/// Map each clone tag to the number of records carrying it
///
/// # Errors
///
/// Fails on the first stream error or the first record without a clone tag.
pub fn clone_counts<I>(records: I) -> Result<BTreeMap<String, usize>>
where
    I: IntoIterator<Item = Result<ImmuneChain>>,
{
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for record in records {
        let chain = record?;
        *counts.entry(clone_tag(&chain)?.to_string()).or_insert(0) += 1;
    }
    Ok(counts)
}
