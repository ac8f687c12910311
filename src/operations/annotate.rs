//! Record annotation steps and their external collaborators
//!
//! Alignment and clustering algorithms live outside this crate. They plug
//! in through the [`Aligner`] and [`Clusterer`] traits; the functions here
//! only prepare their inputs and persist their results onto records.

use crate::error::{Result, VdjError};
use crate::operations::sequence::reverse_complement;
use crate::operations::tags::{tag_with_prefix, BARCODE_PREFIX, CLONE_PREFIX};
use crate::types::ImmuneChain;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Tag marking a chain whose sequence is in positive-strand orientation
pub const POSITIVE_TAG: &str = "positive";

/// Tag marking a chain whose sequence was reverse complemented
pub const REVCOMP_TAG: &str = "revcomp";

/// Window at the 3' end searched for constant-region sequences
pub const ISOTYPE_WINDOW: usize = 50;

/// Strand orientation reported by an aligner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strand {
    /// Sequence already reads 5'->3' on the coding strand
    Forward,
    /// Sequence must be reverse complemented
    Reverse,
}

/// Germline alignment collaborator
pub trait Aligner {
    /// Orientation of a raw sequence relative to the germline references
    fn strand(&self, sequence: &str) -> Strand;

    /// Assign V/D/J segments, junction and functionality in place
    fn align(&self, chain: &mut ImmuneChain) -> Result<()>;
}

/// Hierarchical clustering linkage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Linkage {
    /// Nearest-neighbour linkage
    #[default]
    Single,
    /// Farthest-neighbour linkage
    Complete,
    /// Mean pairwise distance
    Average,
}

impl FromStr for Linkage {
    type Err = VdjError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "single" => Ok(Self::Single),
            "complete" => Ok(Self::Complete),
            "average" => Ok(Self::Average),
            _ => Err(VdjError::Precondition(format!("unknown linkage '{}'", s))),
        }
    }
}

impl fmt::Display for Linkage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => write!(f, "single"),
            Self::Complete => write!(f, "complete"),
            Self::Average => write!(f, "average"),
        }
    }
}

/// Result of clustering a list of junctions
///
/// `labels[seq_index[junction]]` is the cluster label of a junction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Clustering {
    /// Cluster label per distinct sequence
    pub labels: Vec<usize>,
    /// Distinct sequence value to its position in `labels`
    pub seq_index: HashMap<String, usize>,
}

impl Clustering {
    /// Cluster label of `junction`, if it was clustered
    pub fn label(&self, junction: &str) -> Option<usize> {
        self.seq_index
            .get(junction)
            .and_then(|&idx| self.labels.get(idx).copied())
    }
}

/// Junction clustering collaborator
pub trait Clusterer {
    /// Cluster `junctions` at distance `cutoff` with the given linkage
    fn cluster(&self, junctions: &[String], cutoff: f64, linkage: Linkage) -> Result<Clustering>;
}

/// Barcode sequences and their names
///
/// All barcodes share one length and every name starts with `barcode`, so
/// identified chains can later be found with a prefix lookup.
#[derive(Debug, Clone)]
pub struct BarcodeSet {
    by_sequence: HashMap<String, String>,
    barcode_len: usize,
}

impl BarcodeSet {
    /// Build a barcode set from `(name, sequence)` pairs
    ///
    /// # Errors
    ///
    /// [`VdjError::Precondition`] for an empty set, unequal barcode lengths,
    /// or a name that does not start with `barcode`.
    pub fn new<I, N, S>(barcodes: I) -> Result<Self>
    where
        I: IntoIterator<Item = (N, S)>,
        N: Into<String>,
        S: AsRef<str>,
    {
        let mut by_sequence = HashMap::new();
        let mut barcode_len = None;

        for (name, seq) in barcodes {
            let name: String = name.into();
            let seq = seq.as_ref().to_ascii_uppercase();

            if !name.starts_with(BARCODE_PREFIX) {
                return Err(VdjError::Precondition(format!(
                    "barcode name '{}' must start with '{}'",
                    name, BARCODE_PREFIX
                )));
            }
            match barcode_len {
                None => barcode_len = Some(seq.len()),
                Some(len) if len != seq.len() => {
                    return Err(VdjError::Precondition(
                        "all barcode lengths must be equal".to_string(),
                    ))
                }
                Some(_) => {}
            }
            by_sequence.insert(seq, name);
        }

        let barcode_len = barcode_len
            .filter(|&len| len > 0)
            .ok_or_else(|| VdjError::Precondition("barcode set is empty".to_string()))?;

        Ok(Self {
            by_sequence,
            barcode_len,
        })
    }

    /// Shared barcode length
    pub fn barcode_len(&self) -> usize {
        self.barcode_len
    }

    /// Strip a leading barcode and tag the chain with its name
    ///
    /// Returns `true` when a barcode was found; otherwise the chain is left
    /// unchanged.
    pub fn identify(&self, chain: &mut ImmuneChain) -> bool {
        let Some(prefix) = chain.sequence().get(..self.barcode_len) else {
            return false;
        };
        let Some(name) = self.by_sequence.get(prefix) else {
            return false;
        };

        let name = name.clone();
        let trimmed = chain.sequence()[self.barcode_len..].to_string();
        chain.set_sequence(trimmed);
        chain.add_tag(name);
        true
    }
}

/// Constant-region sequences used to call isotypes
#[derive(Debug, Clone, Default)]
pub struct IsotypeSet {
    // (reverse-complemented sequence, name), in insertion order
    regions: Vec<(String, String)>,
}

impl IsotypeSet {
    /// Build an isotype set from `(name, constant-region sequence)` pairs
    ///
    /// Sequences are stored reverse complemented to match chains that read
    /// into the constant region from the 3' end.
    pub fn new<I, N, S>(isotypes: I) -> Self
    where
        I: IntoIterator<Item = (N, S)>,
        N: Into<String>,
        S: AsRef<str>,
    {
        let regions = isotypes
            .into_iter()
            .map(|(name, seq)| {
                (
                    reverse_complement(&seq.as_ref().to_ascii_uppercase()),
                    name.into(),
                )
            })
            .collect();
        Self { regions }
    }

    /// Set `isotype` from the constant region found in the last 50 nt
    ///
    /// When several regions match, the last one in the set wins.
    ///
    /// # Errors
    ///
    /// [`VdjError::NotFound`] when the chain was never oriented by
    /// [`positive_strand`].
    pub fn identify(&self, chain: &mut ImmuneChain) -> Result<()> {
        tag_with_prefix(chain, POSITIVE_TAG)?;

        let seq = chain.sequence();
        let start = seq.len().saturating_sub(ISOTYPE_WINDOW);
        let window = seq.get(start..).unwrap_or(seq);

        let found = self
            .regions
            .iter()
            .filter(|(region, _)| window.contains(region.as_str()))
            .last()
            .map(|(_, name)| name.clone());

        if let Some(name) = found {
            chain.isotype = name;
        }
        Ok(())
    }
}

/// Identify and strip barcodes on every record of a stream
pub fn barcode_id<'a, I>(
    barcodes: &'a BarcodeSet,
    records: I,
) -> impl Iterator<Item = Result<ImmuneChain>> + 'a
where
    I: IntoIterator<Item = Result<ImmuneChain>>,
    I: 'a,
{
    records.into_iter().map(move |record| {
        let mut chain = record?;
        barcodes.identify(&mut chain);
        Ok(chain)
    })
}

/// Call isotypes on every record of a stream
pub fn isotype_id<'a, I>(
    isotypes: &'a IsotypeSet,
    records: I,
) -> impl Iterator<Item = Result<ImmuneChain>> + 'a
where
    I: IntoIterator<Item = Result<ImmuneChain>>,
    I: 'a,
{
    records.into_iter().map(move |record| {
        let mut chain = record?;
        isotypes.identify(&mut chain)?;
        Ok(chain)
    })
}

/// Orient every record onto the positive strand
///
/// Every record is tagged `positive`; reversed records are additionally
/// tagged `revcomp` and their sequence is reverse complemented.
pub fn positive_strand<'a, A, I>(
    aligner: &'a A,
    records: I,
) -> impl Iterator<Item = Result<ImmuneChain>> + 'a
where
    A: Aligner + ?Sized,
    I: IntoIterator<Item = Result<ImmuneChain>>,
    I: 'a,
{
    records.into_iter().map(move |record| {
        let mut chain = record?;
        let strand = aligner.strand(chain.sequence());
        chain.add_tag(POSITIVE_TAG);
        if strand == Strand::Reverse {
            chain.add_tag(REVCOMP_TAG);
            let rc = reverse_complement(chain.sequence());
            chain.set_sequence(rc);
        }
        Ok(chain)
    })
}

/// Align every record in place
pub fn align_vdj<'a, A, I>(
    aligner: &'a A,
    records: I,
) -> impl Iterator<Item = Result<ImmuneChain>> + 'a
where
    A: Aligner + ?Sized,
    I: IntoIterator<Item = Result<ImmuneChain>>,
    I: 'a,
{
    records.into_iter().map(move |record| {
        let mut chain = record?;
        aligner.align(&mut chain)?;
        Ok(chain)
    })
}

/// Clone tag for a cluster label within an optional context
///
/// ```
/// use vdjstream::operations::clone_label;
///
/// assert_eq!(clone_label("", 3), "clone|3");
/// assert_eq!(clone_label("donor1", 3), "clone|donor1|3");
/// ```
pub fn clone_label(context: &str, label: usize) -> String {
    if context.is_empty() {
        format!("{}|{}", CLONE_PREFIX, label)
    } else {
        format!("{}|{}|{}", CLONE_PREFIX, context, label)
    }
}

/// Cluster junctions and tag every record with its clone
///
/// Clustering needs the full junction list, so the whole stream is held
/// in memory and returned in input order.
///
/// # Errors
///
/// - [`VdjError::Precondition`] if any record lacks a V segment, a J
///   segment or a junction; nothing is clustered in that case
/// - [`VdjError::Precondition`] if the clusterer leaves a junction unlabeled
/// - any error from the input stream or the clusterer
pub fn cluster_chains<C, I>(
    clusterer: &C,
    cutoff: f64,
    context: &str,
    linkage: Linkage,
    records: I,
) -> Result<Vec<ImmuneChain>>
where
    C: Clusterer + ?Sized,
    I: IntoIterator<Item = Result<ImmuneChain>>,
{
    let mut chains = Vec::new();
    let mut junctions = Vec::new();

    for record in records {
        let chain = record?;
        if chain.v_segment.is_empty() || chain.j_segment.is_empty() || chain.junction.is_empty() {
            return Err(VdjError::Precondition(format!(
                "chain '{}' has no junction or V-J alignment",
                chain.description
            )));
        }
        junctions.push(chain.junction.clone());
        chains.push(chain);
    }

    log::info!(
        "Clustering {} junctions (cutoff {}, {} linkage)",
        junctions.len(),
        cutoff,
        linkage
    );
    let clustering = clusterer.cluster(&junctions, cutoff, linkage)?;

    for chain in &mut chains {
        let label = clustering.label(&chain.junction).ok_or_else(|| {
            VdjError::Precondition(format!(
                "clusterer returned no label for junction of '{}'",
                chain.description
            ))
        })?;
        chain.add_tag(clone_label(context, label));
    }

    Ok(chains)
}
