use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Serialize;

use crate::alphabet::BASES;
use crate::dataset::Dataset;
use crate::error::{SimError, SimResult};

/// A fixed-length pattern over `BASES`.
pub type Motif = Vec<u8>;

/// Motif sizes above this produce a motif space large enough to be worth a warning.
const LARGE_MOTIF_SIZE: usize = 12;

/// Enumerates every motif of length `k` over `BASES`, depth first, so that the motifs come out in
/// lexicographic order (`AA..A` first, `TT..T` last).
///
/// There are exactly `4^k` motifs, and both the time and memory used here grow with that number.
/// This is the dominant cost of the whole analysis. `k = 0` yields a single empty motif.
pub fn enumerate_motifs(k: usize) -> Vec<Motif> {
    let capacity = u32::try_from(k)
        .ok()
        .and_then(|k| BASES.len().checked_pow(k))
        .unwrap_or(0);

    let mut motifs = Vec::with_capacity(capacity);
    let mut prefix = Vec::with_capacity(k);
    extend_motif(&mut prefix, k, &mut motifs);
    motifs
}

fn extend_motif(prefix: &mut Vec<u8>, k: usize, motifs: &mut Vec<Motif>) {
    if prefix.len() == k {
        motifs.push(prefix.clone());
        return;
    }

    for base in BASES {
        prefix.push(base);
        extend_motif(prefix, k, motifs);
        prefix.pop();
    }
}

/// Occurrence count for every enumerated motif, kept in enumeration order.
#[derive(Debug, Clone, PartialEq)]
pub struct MotifCounts {
    counts: IndexMap<Motif, usize>,
}

impl MotifCounts {
    /// Zero counts for every motif in `motifs`. Duplicate motifs are collapsed onto their first
    /// position.
    pub fn zeroed(motifs: Vec<Motif>) -> Self {
        MotifCounts {
            counts: motifs.into_iter().map(|m| (m, 0)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Motif, usize)> {
        self.counts.iter().map(|(m, c)| (m, *c))
    }

    /// Sum of all counts.
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

#[cfg(test)]
impl MotifCounts {
    fn get(&self, motif: &[u8]) -> Option<usize> {
        self.counts.get(motif).copied()
    }
}

/// Counts, for every motif, its overlapping occurrences summed over all sequences of `dataset`.
///
/// Each sequence is scanned once: every window of length `k` is looked up in the motif table, so
/// a match at position `i` is followed by a check at `i + 1`. `AAAA` therefore holds `AA` three
/// times. Windows containing anything other than a motif (for example an `N`) are ignored.
/// Sequences are processed in parallel; the result does not depend on the thread count.
///
/// Every parallel fold keeps its own table of `4^k` counters, so sequences are handed out in
/// batches of at least `len / threads` to keep the number of tables near the thread count. Peak
/// memory is still about `threads * 4^k * 8` bytes on top of the motif table itself.
///
/// # Errors
///
/// Returns `InvalidConfiguration` if the motifs are empty strings or do not all share a length.
pub fn count_motifs(dataset: &Dataset, motifs: Vec<Motif>) -> SimResult<MotifCounts> {
    let mut counts = MotifCounts::zeroed(motifs);
    let Some(k) = counts.counts.keys().next().map(|m| m.len()) else {
        return Ok(counts);
    };

    if k == 0 {
        return Err(SimError::invalid("the motif size must be positive"));
    }
    if counts.counts.keys().any(|m| m.len() != k) {
        return Err(SimError::invalid("all motifs must have the same length"));
    }

    let n = counts.len();
    let table = &counts.counts;
    let batch = (dataset.len() / rayon::current_num_threads()).max(1);

    let totals = dataset
        .sequences()
        .par_iter()
        .with_min_len(batch)
        .fold(
            || vec![0usize; n],
            |mut acc, seq| {
                for window in seq.windows(k) {
                    if let Some(i) = table.get_index_of(window) {
                        acc[i] += 1;
                    }
                }
                acc
            },
        )
        .reduce(
            || vec![0usize; n],
            |mut a, b| {
                a.iter_mut().zip(b).for_each(|(x, y)| *x += y);
                a
            },
        );

    for (count, total) in counts.counts.values_mut().zip(totals) {
        *count = total;
    }

    Ok(counts)
}

/// The winning motif of an analysis.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct MotifHit {
    pub motif: String,
    pub occurrences: usize,
}

/// Returns the motif with the greatest count. On ties the motif that comes first in enumeration
/// order wins. Returns `None` if no motif has a positive count.
pub fn most_frequent(counts: &MotifCounts) -> Option<MotifHit> {
    let mut best: Option<(&Motif, usize)> = None;

    for (motif, count) in counts.iter() {
        if count > best.map_or(0, |(_, c)| c) {
            best = Some((motif, count));
        }
    }

    best.map(|(motif, occurrences)| MotifHit {
        motif: String::from_utf8_lossy(motif).into_owned(),
        occurrences,
    })
}

/// Enumerates all motifs of size `k`, counts them over `dataset` and reduces to the most frequent.
///
/// # Errors
///
/// Returns `InvalidConfiguration` if `k` is zero.
pub fn find_most_frequent(dataset: &Dataset, k: usize) -> SimResult<Option<MotifHit>> {
    if k == 0 {
        return Err(SimError::invalid("the motif size must be positive"));
    }
    if k > LARGE_MOTIF_SIZE {
        warn!(
            "Motif size {k} gives 4^{k} motifs to count, this may take a long time and needs \
             4^{k} counters per worker thread"
        );
    }

    let motifs = enumerate_motifs(k);
    info!(
        "Counting {} motifs of size {} over {} sequences",
        motifs.len(),
        k,
        dataset.len()
    );

    let counts = count_motifs(dataset, motifs)?;
    debug!("Counted {} motif occurrences in total", counts.total());

    Ok(most_frequent(&counts))
}
