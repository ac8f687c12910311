//! Record-stream operations
//!
//! # Organization
//!
//! - `tags`: tag lookup, AND/OR tag filters, size selection, clone tallies
//! - `annotate`: barcode and isotype identification, strand orientation,
//!   alignment and clustering through external collaborators
//! - `sequence`: nucleotide primitives (reverse complement)
//!
//! Streaming operations take any `IntoIterator<Item = Result<ImmuneChain>>`
//! and return a lazy iterator of the same item type, so they chain directly
//! onto a [`VdjxmlReader`](crate::VdjxmlReader) and into a
//! [`VdjxmlWriter`](crate::VdjxmlWriter).

pub mod annotate;
pub mod sequence;
pub mod tags;

pub use annotate::{
    align_vdj, barcode_id, clone_label, cluster_chains, isotype_id, positive_strand, Aligner,
    BarcodeSet, Clusterer, Clustering, IsotypeSet, Linkage, Strand, POSITIVE_TAG, REVCOMP_TAG,
};
pub use sequence::reverse_complement;
pub use tags::{
    barcode_tag, clone_counts, clone_indices, clone_tag, filter_and, filter_or, is_full_vj,
    matches_all, matches_any, size_select, tag_with_prefix,
};
