use crate::genomics::GeneComparison;

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

/// The ways a single gene can be perturbed during the weight
/// mutation pass. Each mutating gene picks one of the enabled
/// kinds uniformly at random.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeightMutation {
    /// Negate the weight.
    FlipSign,
    /// Flip the gene's active state.
    ToggleState,
    /// Reset the weight to a random value in `[-1.0, 1.0]`.
    Randomize,
    /// Scale the weight by `1 + U(0, 1)`.
    ScaleUp,
    /// Scale the weight by `U(0, 1)`.
    ScaleDown,
}

/// Configuration data for genome generation and inter-genome
/// operations: the mutation parameter block and the distance
/// coefficients. One value is shared by every genome of a run
/// and passed explicitly alongside the registry.
///
/// # Note
/// All quantities expressing probabilities should be in the
/// range [0.0, 1.0]. Using values that are not in this bound
/// may result in odd behaviours and/or incorrect programs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeneticConfig {
    /// Number of input perceptrons in a genome, bias included.
    pub input_count: NonZeroUsize,
    /// Number of output perceptrons in a genome.
    pub output_count: NonZeroUsize,
    /// Chance, per topology operator, of a structural mutation
    /// taking place during a mutation pass.
    pub topology_mutation_chance: f32,
    /// Chance, per gene, of a weight mutation during the weight
    /// pass.
    pub gene_mutation_chance: f32,
    /// Enabled weight-mutation kinds. A mutating gene picks one
    /// of these uniformly; if the list is empty the weight pass
    /// does nothing.
    pub weight_mutations: Vec<WeightMutation>,
    /// Fallback chance of the crossover state perturbation, for
    /// comparisons without an explicit entry.
    pub cross_state_chance_default: f32,
    /// Per-comparison overrides of the state perturbation chance.
    pub cross_state_chances: Vec<(GeneComparison, f32)>,
    /// Weight of disjoint genes in genomic distance.
    pub disjoint_coefficient: f32,
    /// Weight of excess genes in genomic distance.
    pub excess_coefficient: f32,
    /// Weight of the average weight difference of shared genes
    /// in genomic distance.
    pub weight_coefficient: f32,
}

impl GeneticConfig {
    /// Returns a "zero-valued" default configuration. All values
    /// are 0 or empty, except the perceptron counts, which are 1.
    ///
    /// # Note
    /// This value is not suitable for use in most experiments.
    /// It is meant as a way to fill in unused values during
    /// configuration instantiation.
    ///
    /// # Examples
    /// ```
    /// use neat_arena::genomics::GeneticConfig;
    ///
    /// let config = GeneticConfig {
    ///     gene_mutation_chance: 0.25,
    ///     ..GeneticConfig::zero()
    /// };
    /// ```
    pub const fn zero() -> GeneticConfig {
        GeneticConfig {
            // SAFETY: 1 is a valid NonZeroUsize. Replace this with
            // NonZeroUsize::new(1).unwrap() once const Option::unwrap
            // becomes stable.
            input_count: unsafe { NonZeroUsize::new_unchecked(1) },
            output_count: unsafe { NonZeroUsize::new_unchecked(1) },
            topology_mutation_chance: 0.0,
            gene_mutation_chance: 0.0,
            weight_mutations: vec![],
            cross_state_chance_default: 0.0,
            cross_state_chances: vec![],
            disjoint_coefficient: 0.0,
            excess_coefficient: 0.0,
            weight_coefficient: 0.0,
        }
    }

    /// Returns the state perturbation chance for a comparison:
    /// its override when present, the default otherwise.
    pub(crate) fn cross_state_chance(&self, comparison: GeneComparison) -> f32 {
        self.cross_state_chances
            .iter()
            .find(|(tagged, _)| *tagged == comparison)
            .map(|(_, chance)| *chance)
            .unwrap_or(self.cross_state_chance_default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chance_lookup_falls_back_to_default() {
        let config = GeneticConfig {
            cross_state_chance_default: 0.5,
            cross_state_chances: vec![(GeneComparison::Inversed, 1.0)],
            ..GeneticConfig::zero()
        };

        assert_eq!(config.cross_state_chance(GeneComparison::Inversed), 1.0);
        assert_eq!(config.cross_state_chance(GeneComparison::BothActive), 0.5);
    }
}
