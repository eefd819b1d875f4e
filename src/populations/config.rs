use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

/// How crossover parents are drawn from a species.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionMode {
    /// Both parents drawn uniformly, with replacement.
    Random,
    /// The first parent drawn uniformly; the second with a
    /// logarithmic bias toward the fittest members.
    LogarithmicRankedPick,
}

/// Configuration data for speciation and reproduction.
///
/// # Note
/// All quantities expressing fractions or probabilities should
/// be in the range [0.0, 1.0]. Using values that are not in this
/// bound may result in odd behaviours and/or incorrect programs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Total number of genomes, kept exact across generations.
    pub size: NonZeroUsize,
    /// Genomic distance at or below which two genomes are
    /// considered same-species. May be adjusted between
    /// generations for dynamic speciation.
    pub delta_threshold: f32,
    /// Fraction of each species' quota filled with copies of its
    /// best member.
    pub elite_fraction: f32,
    /// Exponent applied to raw fitness during fitness sharing.
    pub beta: f32,
    /// Fraction of each species culled from the bottom of the
    /// fitness ordering before reproduction.
    pub remove_worst: f32,
    /// Parent selection strategy.
    pub selection_mode: SelectionMode,
}

impl PopulationConfig {
    /// Returns a "zero-valued" default configuration: all values
    /// 0, random selection, and a population size of 1.
    ///
    /// # Note
    /// This value is not suitable for use in most experiments.
    /// It is meant as a way to fill in unused values during
    /// configuration instantiation.
    ///
    /// # Examples
    /// ```
    /// use neat_arena::populations::PopulationConfig;
    /// use std::num::NonZeroUsize;
    ///
    /// let config = PopulationConfig {
    ///     size: NonZeroUsize::new(100).unwrap(),
    ///     delta_threshold: 3.0,
    ///     ..PopulationConfig::zero()
    /// };
    /// ```
    pub const fn zero() -> PopulationConfig {
        PopulationConfig {
            // SAFETY: 1 is a valid NonZeroUsize. Replace this with
            // NonZeroUsize::new(1).unwrap() once const Option::unwrap
            // becomes stable.
            size: unsafe { NonZeroUsize::new_unchecked(1) },
            delta_threshold: 0.0,
            elite_fraction: 0.0,
            beta: 0.0,
            remove_worst: 0.0,
            selection_mode: SelectionMode::Random,
        }
    }
}
