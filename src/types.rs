//! Common types used throughout vdjstream

use crate::error::{Result, VdjError};
use std::collections::BTreeSet;

/// An immune receptor chain: one sequence with its V(D)J annotation and tags
///
/// Structural fields (`v_segment`, `d_segment`, `j_segment`, `isotype`,
/// `description`) double as implicit tags for filtering, see [`all_tags`].
/// An empty string means "unassigned" for every annotation field.
///
/// `sequence` and `tags` are private so their invariants hold: the sequence
/// is always uppercase and the tag set never contains the empty string.
///
/// [`all_tags`]: ImmuneChain::all_tags
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImmuneChain {
    sequence: String,
    /// Free-text identifier
    pub description: String,
    /// Germline V segment
    pub v_segment: String,
    /// Germline D segment
    pub d_segment: String,
    /// Germline J segment
    pub j_segment: String,
    /// Constant region identifier
    pub isotype: String,
    /// Recombination junction sequence
    pub junction: String,
    /// Functional / non-functional classification
    pub functionality: String,
    tags: BTreeSet<String>,
}

impl ImmuneChain {
    /// Create a new chain from a description and a sequence (5'->3')
    ///
    /// # Examples
    ///
    /// ```
    /// use vdjstream::ImmuneChain;
    ///
    /// let chain = ImmuneChain::new("read1", "acgt");
    /// assert_eq!(chain.sequence(), "ACGT");
    /// assert_eq!(chain.len(), 4);
    /// ```
    pub fn new(description: impl Into<String>, sequence: impl AsRef<str>) -> Self {
        Self {
            sequence: sequence.as_ref().to_ascii_uppercase(),
            description: description.into(),
            ..Self::default()
        }
    }

    /// Nucleotide sequence, always uppercase
    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    /// Replace the sequence (normalized to uppercase)
    pub fn set_sequence(&mut self, sequence: impl AsRef<str>) {
        self.sequence = sequence.as_ref().to_ascii_uppercase();
    }

    /// Length of the sequence
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    /// Check if the chain has an empty sequence
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// CDR3 length in nucleotides, always the length of `junction`
    pub fn cdr3_length(&self) -> usize {
        self.junction.len()
    }

    /// Assignment to the derived CDR3 length is silently ignored.
    ///
    /// Existing VDJXML files carry a `cdr3` element; decoding routes it here
    /// so the stored junction stays the single source of truth.
    pub fn set_cdr3_length(&mut self, _value: usize) {}

    /// Explicit tags (sample, experiment, clone, barcode markers)
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Explicit tags plus every non-empty structural identifier
    ///
    /// # Examples
    ///
    /// ```
    /// use vdjstream::ImmuneChain;
    ///
    /// let mut chain = ImmuneChain::new("read1", "ACGT");
    /// chain.v_segment = "IGHV1-2*02".to_string();
    /// chain.add_tag("sample1");
    ///
    /// let all = chain.all_tags();
    /// assert!(all.contains("read1"));
    /// assert!(all.contains("IGHV1-2*02"));
    /// assert!(all.contains("sample1"));
    /// assert!(!all.contains(""));
    /// ```
    pub fn all_tags(&self) -> BTreeSet<&str> {
        let mut all: BTreeSet<&str> = self.tags.iter().map(String::as_str).collect();
        all.extend([
            self.v_segment.as_str(),
            self.d_segment.as_str(),
            self.j_segment.as_str(),
            self.isotype.as_str(),
            self.description.as_str(),
        ]);
        all.remove("");
        all
    }

    /// Membership test against explicit tags only
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Add one tag; the empty string is discarded
    pub fn add_tag(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if !tag.is_empty() {
            self.tags.insert(tag);
        }
    }

    /// Add several tags at once
    pub fn add_tags<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for tag in tags {
            self.add_tag(tag);
        }
    }

    /// Remove several tags, failing on the first one that is absent
    ///
    /// Tags listed before the missing one have already been removed when
    /// the error is returned.
    pub fn remove_tags<I, S>(&mut self, tags: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for tag in tags {
            let tag = tag.as_ref();
            if !self.tags.remove(tag) {
                return Err(VdjError::MissingTag(tag.to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sequence_uppercased() {
        let mut chain = ImmuneChain::new("r", "acgt");
        assert_eq!(chain.sequence(), "ACGT");
        assert_eq!(chain.len(), 4);

        chain.set_sequence("ggNn");
        assert_eq!(chain.sequence(), "GGNN");
    }

    #[test]
    fn test_cdr3_length_ignores_assignment() {
        let mut chain = ImmuneChain::new("r", "ACGT");
        chain.junction = "TGTGCGAGAGA".to_string();
        assert_eq!(chain.cdr3_length(), 11);

        chain.set_cdr3_length(3);
        assert_eq!(chain.cdr3_length(), 11);

        chain.junction.clear();
        assert_eq!(chain.cdr3_length(), 0);
    }

    #[test]
    fn test_empty_tag_discarded() {
        let mut chain = ImmuneChain::default();
        chain.add_tags(["", "a", ""]);
        assert_eq!(chain.tags().len(), 1);
        assert!(chain.has_tag("a"));
    }

    #[test]
    fn test_has_tag_ignores_structural_fields() {
        let mut chain = ImmuneChain::new("read7", "ACGT");
        chain.v_segment = "IGHV3-23*01".to_string();
        assert!(!chain.has_tag("IGHV3-23*01"));
        assert!(!chain.has_tag("read7"));
        assert!(chain.all_tags().contains("IGHV3-23*01"));
    }

    #[test]
    fn test_remove_tags_missing() {
        let mut chain = ImmuneChain::default();
        chain.add_tags(["a", "b"]);
        chain.remove_tags(["a"]).unwrap();
        assert!(!chain.has_tag("a"));

        let result = chain.remove_tags(["b", "zzz"]);
        assert!(matches!(result, Err(VdjError::MissingTag(ref t)) if t == "zzz"));
        assert!(!chain.has_tag("b"));
    }

    #[test]
    fn test_duplicate_tags_collapse() {
        let mut chain = ImmuneChain::default();
        chain.add_tags(["x", "x", "y"]);
        assert_eq!(chain.tags().len(), 2);
    }

    proptest! {
        #[test]
        fn test_cdr3_tracks_junction(junction in "[ACGT]{0,90}", assigned in 0usize..500) {
            let mut chain = ImmuneChain::default();
            chain.junction = junction.clone();
            chain.set_cdr3_length(assigned);
            prop_assert_eq!(chain.cdr3_length(), junction.len());
        }

        #[test]
        fn test_all_tags_never_contains_empty(
            v in "(IGHV[0-9])?",
            d in "(IGHD[0-9])?",
            j in "(IGHJ[0-9])?",
            isotype in "(IGHM|IGHG)?",
            descr in "(read[0-9]{1,3})?",
            tags in proptest::collection::vec("([a-z]{1,6})?", 0..5),
        ) {
            let mut chain = ImmuneChain::new(descr, "ACGT");
            chain.v_segment = v;
            chain.d_segment = d;
            chain.j_segment = j;
            chain.isotype = isotype;
            chain.add_tags(tags);
            prop_assert!(!chain.all_tags().contains(""));
            prop_assert!(!chain.tags().contains(""));
        }

        #[test]
        fn test_sequence_always_uppercase(seq in "[acgtnACGTN]{0,200}") {
            let chain = ImmuneChain::new("r", &seq);
            prop_assert_eq!(chain.sequence(), seq.to_ascii_uppercase());
            prop_assert_eq!(chain.len(), seq.len());
        }
    }
}
