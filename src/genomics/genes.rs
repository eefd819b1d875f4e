use crate::Innovation;

use std::fmt;

use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};

/// Genes are the principal components of genomes.
/// Each gene describes one directed connection between
/// two nodes, and becomes a weighted network connection
/// in the genome's phenotype.
///
/// A gene's identity is its `(input, output)` endpoint pair;
/// the innovation number is the run-wide identity assigned to
/// that pair by the [`History`](crate::genomics::History).
/// Two genes compare equal iff they connect the same endpoints.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Gene {
    innovation: Innovation,
    input: usize,
    output: usize,
    weight: f32,
    active: bool,
}

impl Gene {
    /// Returns a new _active_ gene with the specified parameters.
    ///
    /// # Examples
    /// ```
    /// use neat_arena::genomics::Gene;
    ///
    /// let gene = Gene::new(42, 3, 9, 2.0);
    ///
    /// assert!(gene.active());
    /// ```
    pub fn new(innovation: Innovation, input: usize, output: usize, weight: f32) -> Gene {
        Gene {
            innovation,
            input,
            output,
            weight,
            active: true,
        }
    }

    /// Returns a random weight, uniform over `[-1.0, 1.0]`.
    pub(crate) fn random_weight() -> f32 {
        thread_rng().gen_range(-1.0..=1.0)
    }

    /// Resets the gene's weight to a random value in `[-1.0, 1.0]`.
    pub fn randomize_weight(&mut self) {
        self.weight = Self::random_weight();
    }

    /// Returns the gene's innovation number.
    pub fn innovation(&self) -> Innovation {
        self.innovation
    }

    /// Returns the id of the node the connection leaves from.
    pub fn input(&self) -> usize {
        self.input
    }

    /// Returns the id of the node the connection arrives at.
    pub fn output(&self) -> usize {
        self.output
    }

    /// Returns the gene's weight.
    pub fn weight(&self) -> f32 {
        self.weight
    }

    /// Sets the gene's weight.
    ///
    /// # Examples
    /// ```
    /// use neat_arena::genomics::Gene;
    ///
    /// let mut gene = Gene::new(42, 3, 9, 2.0);
    /// gene.set_weight(-5.0);
    ///
    /// assert_eq!(gene.weight(), -5.0);
    /// ```
    pub fn set_weight(&mut self, weight: f32) {
        self.weight = weight;
    }

    /// Returns whether the gene is expressed during evaluation.
    /// Inactive genes are retained for lineage but skipped by
    /// the built network.
    pub fn active(&self) -> bool {
        self.active
    }

    /// Sets the gene's active state.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Returns the gene's input and output node ids.
    pub(crate) fn endpoints(&self) -> (usize, usize) {
        (self.input, self.output)
    }
}

/// Gene equality is connection identity: two genes are equal
/// iff they share the same endpoint pair, regardless of weight
/// or state.
impl PartialEq for Gene {
    fn eq(&self, other: &Self) -> bool {
        self.input == other.input && self.output == other.output
    }
}

impl Eq for Gene {}

impl fmt::Display for Gene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:?}[{:?}->{:?}, {:.3}]{}",
            if self.active { "" } else { "(" },
            self.innovation,
            self.input,
            self.output,
            self.weight,
            if self.active { "" } else { ")" },
        )
    }
}
