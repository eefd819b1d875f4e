use crate::genomics::{Gene, Genome};
use crate::Innovation;

use std::collections::HashMap;

use ahash::RandomState;
use serde::{Deserialize, Serialize};

/// How one innovation is shared between the two parents of a
/// crossover, or between the two sides of a distance check.
///
/// `Dominant*` tags single-parent genes carried from the fitter
/// parent; the others tag genes present in both parents, by
/// their active states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeneComparison {
    /// Present and active in both parents.
    BothActive,
    /// Present and inactive in both parents.
    BothInactive,
    /// Present in both parents with opposite states.
    Inversed,
    /// Present only in the dominant parent, active.
    DominantActive,
    /// Present only in the dominant parent, inactive.
    DominantInactive,
}

/// An innovation-keyed pairing of two genomes' genes.
/// Each entry holds the gene from either side, where present.
/// This is the O(n) alignment that both the distance metric and
/// crossover are built on.
pub(crate) struct AlignmentTable<'a> {
    entries: HashMap<Innovation, (Option<&'a Gene>, Option<&'a Gene>), RandomState>,
}

/// Gene counts classified by the alignment of two genomes.
///
/// Excess genes are the trailing run of single-side entries at
/// the top of the innovation range, all owned by the same side;
/// the remaining single-side entries are disjoint. Shared
/// entries count as equal and accumulate their absolute weight
/// difference.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct AlignmentTally {
    pub equal: usize,
    pub weight_diff_sum: f32,
    pub disjoint: usize,
    pub excess: usize,
}

impl<'a> AlignmentTable<'a> {
    pub(crate) fn new(first: &'a Genome, second: &'a Genome) -> AlignmentTable<'a> {
        let mut entries: HashMap<_, (Option<&Gene>, Option<&Gene>), RandomState> =
            HashMap::default();
        for gene in first.genes() {
            entries.entry(gene.innovation()).or_insert((None, None)).0 = Some(gene);
        }
        for gene in second.genes() {
            entries.entry(gene.innovation()).or_insert((None, None)).1 = Some(gene);
        }
        AlignmentTable { entries }
    }

    /// Returns the entries sorted by ascending innovation.
    pub(crate) fn ascending(&self) -> Vec<(Innovation, (Option<&'a Gene>, Option<&'a Gene>))> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|(innovation, slots)| (*innovation, *slots))
            .collect();
        entries.sort_unstable_by_key(|(innovation, _)| *innovation);
        entries
    }

    /// Classifies every entry into the equal/disjoint/excess
    /// tally used by the distance metric.
    ///
    /// The owner of the excess run is the side holding the
    /// highest-innovation entry; the run ends at the first entry
    /// that is shared or belongs to the other side. When the
    /// highest entry is shared there is no run and every
    /// single-side entry is disjoint.
    pub(crate) fn tally(&self) -> AlignmentTally {
        let mut descending = self.ascending();
        descending.reverse();

        let mut tally = AlignmentTally::default();
        let mut excess_owner = match descending.first() {
            Some((_, (Some(_), None))) => Some(0),
            Some((_, (None, Some(_)))) => Some(1),
            _ => None,
        };

        for (_, slots) in descending {
            match slots {
                (Some(a), Some(b)) => {
                    excess_owner = None;
                    tally.equal += 1;
                    tally.weight_diff_sum += (a.weight() - b.weight()).abs();
                }
                (Some(_), None) => match excess_owner {
                    Some(0) => tally.excess += 1,
                    _ => {
                        excess_owner = None;
                        tally.disjoint += 1;
                    }
                },
                (None, Some(_)) => match excess_owner {
                    Some(1) => tally.excess += 1,
                    _ => {
                        excess_owner = None;
                        tally.disjoint += 1;
                    }
                },
                (None, None) => unreachable!("alignment entry with no gene"),
            }
        }
        tally
    }
}

/// The genomic distance between two genomes:
///
/// `c_avg * avg_weight_diff + c_disjoint * disjoint / n + c_excess * excess / n`
///
/// where `n` is the larger of the two gene counts. The average
/// weight term degrades to 0 when there are no shared genes, and
/// two geneless genomes are at distance 0.
pub(crate) fn distance(
    first: &Genome,
    second: &Genome,
    disjoint_coefficient: f32,
    excess_coefficient: f32,
    weight_coefficient: f32,
) -> f32 {
    let n = first.gene_count().max(second.gene_count());
    if n == 0 {
        return 0.0;
    }

    let tally = AlignmentTable::new(first, second).tally();
    let average_weight_diff = if tally.equal == 0 {
        0.0
    } else {
        tally.weight_diff_sum / tally.equal as f32
    };

    weight_coefficient * average_weight_diff
        + disjoint_coefficient * tally.disjoint as f32 / n as f32
        + excess_coefficient * tally.excess as f32 / n as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::num::NonZeroUsize;

    fn empty_genome() -> Genome {
        // Two inputs (ids 0, 1) and two outputs (ids 2, 3), no genes.
        Genome::bare(
            NonZeroUsize::new(2).unwrap(),
            NonZeroUsize::new(2).unwrap(),
        )
    }

    fn with_genes(specs: &[(Innovation, usize, usize, f32)]) -> Genome {
        let mut genome = empty_genome();
        for &(innovation, input, output, weight) in specs {
            genome.insert_gene(Gene::new(innovation, input, output, weight));
        }
        genome
    }

    #[test]
    fn shared_and_single_entries_tally() {
        // First:  0 1 2 3
        // Second: 0 1     4 5
        let first = with_genes(&[(0, 0, 2, 1.0), (1, 1, 2, 0.5), (2, 0, 3, 1.0), (3, 1, 3, 1.0)]);
        let second = with_genes(&[(0, 0, 2, -1.0), (1, 1, 2, 0.5), (4, 3, 2, 1.0), (5, 2, 3, 1.0)]);

        let tally = AlignmentTable::new(&first, &second).tally();

        assert_eq!(tally.equal, 2);
        assert_eq!(tally.weight_diff_sum, 2.0);
        // 4 and 5 are the trailing run owned by `second`.
        assert_eq!(tally.excess, 2);
        // 2 and 3 from `first` sit below the run.
        assert_eq!(tally.disjoint, 2);
    }

    #[test]
    fn tally_is_symmetric() {
        let first = with_genes(&[(0, 0, 2, 1.0), (2, 0, 3, 1.0)]);
        let second = with_genes(&[(0, 0, 2, 0.0), (1, 1, 2, 1.0)]);

        let forward = AlignmentTable::new(&first, &second).tally();
        let backward = AlignmentTable::new(&second, &first).tally();

        assert_eq!(forward, backward);
    }

    #[test]
    fn matching_top_innovations_leave_only_disjoint() {
        // Both sides end at innovation 5; the descending scan
        // starts on a shared entry, so no excess run exists.
        let first = with_genes(&[(1, 1, 2, 1.0), (3, 0, 3, 1.0), (5, 0, 2, 1.0)]);
        let second = with_genes(&[(2, 3, 2, 1.0), (4, 2, 3, 1.0), (5, 0, 2, 1.0)]);

        let tally = AlignmentTable::new(&first, &second).tally();

        assert_eq!(tally.equal, 1);
        assert_eq!(tally.excess, 0);
        assert_eq!(tally.disjoint, 4);
    }

    #[test]
    fn distance_of_identical_genomes_is_zero() {
        let genome = with_genes(&[(0, 0, 2, 0.3), (1, 1, 2, -0.7)]);
        assert_eq!(distance(&genome, &genome, 1.0, 1.0, 1.0), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let first = with_genes(&[(0, 0, 2, 1.0), (2, 0, 3, 1.0)]);
        let second = with_genes(&[(0, 0, 2, 0.0), (1, 1, 2, 1.0)]);

        assert_eq!(
            distance(&first, &second, 1.0, 0.5, 0.3),
            distance(&second, &first, 1.0, 0.5, 0.3),
        );
    }

    #[test]
    fn no_shared_genes_degrades_weight_term_to_zero() {
        let first = with_genes(&[(0, 0, 2, 10.0)]);
        let second = with_genes(&[(1, 1, 2, -10.0)]);

        // equal == 0 must not divide by zero.
        let delta = distance(&first, &second, 1.0, 1.0, 1.0);
        assert!(delta.is_finite());
        // One disjoint (0, below the run owner change) plus one excess (1).
        assert_eq!(delta, 1.0 / 1.0 + 1.0 / 1.0);
    }

    #[test]
    fn empty_genomes_are_at_distance_zero() {
        let first = empty_genome();
        let second = empty_genome();
        assert_eq!(distance(&first, &second, 1.0, 1.0, 1.0), 0.0);
    }
}
