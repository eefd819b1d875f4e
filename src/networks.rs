//! A Network is the evaluation phenotype built from a genome,
//! with inactive genes left out. Genes become weighted incoming
//! connections of their target neuron; neurons are laid out
//! densely by node id.
//!
//! Activation is a single snapshot-then-update pass: every
//! neuron reads the values all neurons held when `fire` began.
//! Hidden neurons therefore propagate freshly-set inputs, never
//! the hidden activations computed in the same pass; a hidden
//! activation only reaches downstream neurons on the next call.
//! Hosts that want deeper propagation call `fire` repeatedly
//! with the same inputs.

use crate::genomics::Genome;

use std::fmt;

/// A sparse feed-forward evaluator derived from a genome.
///
/// # Examples
/// ```
/// use neat_arena::genomics::{GeneticConfig, Genome, History};
/// use neat_arena::networks::Network;
/// use std::num::NonZeroUsize;
///
/// let config = GeneticConfig {
///     input_count: NonZeroUsize::new(3).unwrap(),
///     output_count: NonZeroUsize::new(2).unwrap(),
///     ..GeneticConfig::zero()
/// };
/// let mut history = History::new(config.input_count, config.output_count);
/// let genome = Genome::primitive(&mut history, &config);
///
/// let mut network = Network::new(&genome);
/// let outputs = network.fire(&[0.5, -1.0, 0.0]);
///
/// assert_eq!(outputs.len(), 2);
/// ```
#[derive(Clone, Debug)]
pub struct Network {
    input_count: usize,
    output_count: usize,
    values: Box<[f32]>,
    snapshot: Box<[f32]>,
    incoming: Box<[Box<[(usize, f32)]>]>,
}

impl Network {
    /// Builds the evaluator for a genome. The neuron array spans
    /// every node id referenced by a gene, and always covers the
    /// output block even when the wiring is sparse. Incoming
    /// lists hold active genes only, sorted by source id, and
    /// are frozen for the network's lifetime.
    pub fn new(genome: &Genome) -> Network {
        let input_count = genome.input_count().get();
        let output_count = genome.output_count().get();

        let gene_span = genome
            .genes()
            .map(|g| g.input().max(g.output()) + 1)
            .max()
            .unwrap_or(0);
        let size = gene_span.max(input_count + output_count);

        let mut incoming = vec![Vec::new(); size];
        for gene in genome.genes().filter(|g| g.active()) {
            incoming[gene.output()].push((gene.input(), gene.weight()));
        }
        for list in &mut incoming {
            list.sort_unstable_by_key(|(input, _)| *input);
        }

        Network {
            input_count,
            output_count,
            values: vec![0.0; size].into(),
            snapshot: vec![0.0; size].into(),
            incoming: incoming.into_iter().map(Vec::into_boxed_slice).collect(),
        }
    }

    /// Runs one activation pass and returns the output values.
    ///
    /// Inputs are written to the input neurons, the bias neuron
    /// is forced to 1.0, and all neuron values are snapshotted.
    /// Each neuron with incoming connections then becomes
    /// `tanh(Σ weight · snapshot[source])`. Neuron values persist
    /// between calls.
    ///
    /// # Panics
    /// Panics if `inputs` is not exactly `input_count` long.
    ///
    /// # Examples
    /// ```
    /// use neat_arena::genomics::{GeneticConfig, Genome, History};
    /// use neat_arena::networks::Network;
    ///
    /// let config = GeneticConfig::zero();
    /// let mut history = History::new(config.input_count, config.output_count);
    /// let genome = Genome::primitive(&mut history, &config);
    /// let weight = genome.genes().next().unwrap().weight();
    ///
    /// // A single bias input feeding a single output.
    /// let mut network = Network::new(&genome);
    ///
    /// assert_eq!(network.fire(&[0.0])[0], weight.tanh());
    /// ```
    pub fn fire(&mut self, inputs: &[f32]) -> &[f32] {
        assert_eq!(
            inputs.len(),
            self.input_count,
            "expected {} network inputs, got {}",
            self.input_count,
            inputs.len()
        );

        self.values[..self.input_count - 1].copy_from_slice(&inputs[..self.input_count - 1]);
        self.values[self.input_count - 1] = 1.0;
        self.snapshot.copy_from_slice(&self.values);

        for (value, incoming) in self.values.iter_mut().zip(self.incoming.iter()) {
            if incoming.is_empty() {
                continue;
            }
            let sum: f32 = incoming
                .iter()
                .map(|(source, weight)| weight * self.snapshot[*source])
                .sum();
            *value = sum.tanh();
        }

        self.outputs()
    }

    /// Returns the output neuron values from the last pass.
    pub fn outputs(&self) -> &[f32] {
        &self.values[self.input_count..self.input_count + self.output_count]
    }

    /// Returns the number of inputs the network expects,
    /// bias included.
    pub fn input_count(&self) -> usize {
        self.input_count
    }

    /// Returns the number of outputs the network produces.
    pub fn output_count(&self) -> usize {
        self.output_count
    }

    /// Returns all neuron values, by node id.
    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (self as &dyn fmt::Debug).fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::{Gene, GeneticConfig, History};

    use std::num::NonZeroUsize;

    fn primitive(inputs: usize, outputs: usize) -> (Genome, History) {
        let config = GeneticConfig {
            input_count: NonZeroUsize::new(inputs).unwrap(),
            output_count: NonZeroUsize::new(outputs).unwrap(),
            ..GeneticConfig::zero()
        };
        let mut history = History::new(config.input_count, config.output_count);
        let genome = Genome::primitive(&mut history, &config);
        (genome, history)
    }

    fn bare(inputs: usize, outputs: usize) -> Genome {
        Genome::bare(
            NonZeroUsize::new(inputs).unwrap(),
            NonZeroUsize::new(outputs).unwrap(),
        )
    }

    #[test]
    fn zero_weights_give_zero_outputs() {
        let (mut genome, mut history) = primitive(3, 2);
        for _ in 0..3 {
            genome.mutate_add_node(&mut history);
        }
        // tanh(0) == 0, so an all-zero weighting is inert no
        // matter the topology.
        for gene in genome.genes_mut() {
            gene.set_weight(0.0);
        }

        let mut network = Network::new(&genome);
        for _ in 0..4 {
            assert_eq!(network.fire(&[1.0, -2.0, 0.5]), &[0.0, 0.0]);
        }
    }

    #[test]
    fn bias_is_forced_to_one() {
        // One input perceptron means the bias is the only input.
        let mut genome = bare(1, 1);
        genome.insert_gene(Gene::new(0, 0, 1, 0.8));
        let mut network = Network::new(&genome);

        // The supplied input value lands on the bias slot and is
        // overwritten, so any value produces the same output.
        for input in [-5.0, 0.0, 42.0] {
            assert_eq!(network.fire(&[input])[0], 0.8f32.tanh());
        }
    }

    #[test]
    fn inactive_genes_are_skipped() {
        let mut genome = bare(2, 1);
        let mut silenced = Gene::new(0, 0, 2, 5.0);
        silenced.set_active(false);
        genome.insert_gene(silenced);
        genome.insert_gene(Gene::new(1, 1, 2, 0.3));

        let mut network = Network::new(&genome);
        // Only the bias gene is active.
        assert_eq!(network.fire(&[3.0, 0.0])[0], 0.3f32.tanh());
    }

    #[test]
    fn single_pass_reads_the_snapshot() {
        // A split 0 -> 3 -> 2 chain: the hidden value computed in
        // a pass must not reach the output in that same pass.
        let mut genome = bare(2, 1);
        let mut split = Gene::new(0, 0, 2, 0.6);
        split.set_active(false);
        genome.insert_gene(split);
        genome.add_hidden_node();
        genome.insert_gene(Gene::new(1, 0, 3, 1.0));
        genome.insert_gene(Gene::new(2, 3, 2, 0.6));

        let mut network = Network::new(&genome);

        // First pass: the hidden neuron still holds 0.
        assert_eq!(network.fire(&[0.7, 0.0])[0], 0.0);
        // Second pass: the hidden activation from the first pass
        // now reaches the output.
        let expected = (0.6 * 0.7f32.tanh()).tanh();
        assert_eq!(network.fire(&[0.7, 0.0])[0], expected);
    }

    #[test]
    fn sparse_wiring_still_covers_outputs() {
        // A single gene into the first output; the second output
        // must still exist and stay silent.
        let mut genome = bare(3, 2);
        genome.insert_gene(Gene::new(0, 0, 3, 1.0));

        let mut network = Network::new(&genome);
        let outputs = network.fire(&[1.0, 1.0, 1.0]);
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0], 1.0f32.tanh());
        assert_eq!(outputs[1], 0.0);
    }

    #[test]
    fn incoming_lists_are_sorted_by_source() {
        let (mut genome, mut history) = primitive(3, 1);
        for _ in 0..4 {
            genome.mutate_add_node(&mut history);
        }

        let network = Network::new(&genome);
        for incoming in network.incoming.iter() {
            assert!(incoming.windows(2).all(|pair| pair[0].0 <= pair[1].0));
        }
    }
}
