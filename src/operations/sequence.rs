//! Nucleotide sequence primitives
//!
//! Record sequences are stored uppercase, so only uppercase codes are mapped;
//! anything else passes through unchanged.
//!
//! # Examples
//!
//! ```
//! use vdjstream::operations::reverse_complement;
//!
//! assert_eq!(reverse_complement("ATGC"), "GCAT");
//! assert_eq!(reverse_complement("AACN"), "NGTT");
//! ```

/// Lookup table for DNA/RNA complement
///
/// - Standard bases: A↔T, G↔C, U→A
/// - IUPAC ambiguity codes: R↔Y, K↔M, B↔V, D↔H; W, S, N self-complement
/// - Everything else is preserved
const COMPLEMENT_TABLE: [u8; 256] = {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = i as u8;
        i += 1;
    }

    table[b'A' as usize] = b'T';
    table[b'T' as usize] = b'A';
    table[b'G' as usize] = b'C';
    table[b'C' as usize] = b'G';
    table[b'U' as usize] = b'A';

    table[b'R' as usize] = b'Y';
    table[b'Y' as usize] = b'R';
    table[b'K' as usize] = b'M';
    table[b'M' as usize] = b'K';
    table[b'B' as usize] = b'V';
    table[b'V' as usize] = b'B';
    table[b'D' as usize] = b'H';
    table[b'H' as usize] = b'D';

    table
};

/// Reverse complement a nucleotide sequence
pub fn reverse_complement(seq: &str) -> String {
    // Non-ASCII bytes would break UTF-8 if reordered; reverse by char instead.
    if !seq.is_ascii() {
        return seq
            .chars()
            .rev()
            .map(|c| {
                if c.is_ascii() {
                    COMPLEMENT_TABLE[c as usize] as char
                } else {
                    c
                }
            })
            .collect();
    }

    seq.bytes()
        .rev()
        .map(|base| COMPLEMENT_TABLE[base as usize] as char)
        .collect()
}
