//! Genomes are the focus of evolution in NEAT.
//! They are a collection of genes and nodes that can be instantiated
//! as a phenotype (a sparse feed-forward network). Genomes are
//! progressively complexified by structural mutation, recombined by
//! innovation-aligned crossover, and clustered into species by
//! genomic distance.

mod alignment;
mod config;
mod errors;
mod genes;
mod history;
mod nodes;
mod packet;

pub use alignment::GeneComparison;
pub use config::{GeneticConfig, WeightMutation};
pub use errors::PacketError;
pub use genes::Gene;
pub use history::History;
pub use nodes::{Node, NodeKind};
pub use packet::GenomePacket;

use crate::Innovation;

use std::fmt;
use std::num::NonZeroUsize;

use rand::prelude::{IteratorRandom, Rng, SliceRandom};
use serde::{Deserialize, Serialize};

/// A variable-topology network specification: an ordered node
/// list plus a gene list kept strictly ascending by innovation
/// number.
///
/// Node ids are contiguous. Inputs occupy `[0, input_count)`
/// with the bias as the last input, outputs occupy
/// `[input_count, input_count + output_count)`, and hidden nodes
/// created by node mutations follow.
///
/// A genome lives for one generation: its fitness is assigned
/// when the generation is scored, after which it is either
/// copied forward as an elite or recombined into offspring.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    input_count: NonZeroUsize,
    output_count: NonZeroUsize,
    nodes: Vec<Node>,
    genes: Vec<Gene>,
    fitness: f32,
    id: u64,
}

impl Genome {
    /// Creates the primitive fully-connected genome: every input
    /// (bias included) wired to every output with a random weight
    /// in `[-1.0, 1.0]`.
    ///
    /// # Examples
    /// ```
    /// use neat_arena::genomics::{GeneticConfig, Genome, History};
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(3).unwrap(),
    ///     output_count: NonZeroUsize::new(2).unwrap(),
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut history = History::new(config.input_count, config.output_count);
    ///
    /// let genome = Genome::primitive(&mut history, &config);
    ///
    /// assert_eq!(genome.node_count(), 3 + 2);
    /// assert_eq!(genome.gene_count(), 3 * 2);
    /// assert!(genome.genes().all(|g| g.active() && g.weight().abs() <= 1.0));
    /// ```
    pub fn primitive(history: &mut History, config: &GeneticConfig) -> Genome {
        let mut genome = Genome::bare(config.input_count, config.output_count);
        let inputs = config.input_count.get();
        let outputs = config.output_count.get();

        for input in 0..inputs {
            for output in inputs..inputs + outputs {
                let innovation = history.acquire(input, output);
                genome.insert_gene(Gene::new(innovation, input, output, Gene::random_weight()));
            }
        }
        genome
    }

    /// Creates a genome holding only the input and output node
    /// scaffolding, without genes.
    pub(crate) fn bare(input_count: NonZeroUsize, output_count: NonZeroUsize) -> Genome {
        let inputs = input_count.get();
        let outputs = output_count.get();

        let mut nodes = Vec::with_capacity(inputs + outputs);
        for id in 0..inputs - 1 {
            nodes.push(Node::new(id, NodeKind::Input));
        }
        nodes.push(Node::new(inputs - 1, NodeKind::InputBias));
        for id in inputs..inputs + outputs {
            nodes.push(Node::new(id, NodeKind::Output));
        }

        Genome {
            input_count,
            output_count,
            nodes,
            genes: Vec::new(),
            fitness: 0.0,
            id: rand::thread_rng().gen(),
        }
    }

    /// Appends a new hidden node and returns its id.
    pub(crate) fn add_hidden_node(&mut self) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node::new(id, NodeKind::Hidden));
        id
    }

    /// Inserts a gene at the slot that keeps the gene list
    /// strictly ascending by innovation.
    ///
    /// # Panics
    /// Panics if a gene with the same innovation is already
    /// present. The registry assigns one innovation per endpoint
    /// pair, so a duplicate means the genome was corrupted.
    pub(crate) fn insert_gene(&mut self, gene: Gene) {
        match self
            .genes
            .binary_search_by_key(&gene.innovation(), |g| g.innovation())
        {
            Ok(_) => panic!(
                "duplicate innovation {} inserted into genome {:#x}",
                gene.innovation(),
                self.id
            ),
            Err(slot) => self.genes.insert(slot, gene),
        }
    }

    /// Returns whether any gene, active or not, connects
    /// `input` to `output`. Inactive genes keep their claim on
    /// the pair.
    pub fn has_connection(&self, input: usize, output: usize) -> bool {
        self.genes.iter().any(|g| g.endpoints() == (input, output))
    }

    /// Runs one full mutation pass: each topology operator is
    /// attempted with the configured chance, and the weight pass
    /// always runs last.
    pub fn mutate(&mut self, history: &mut History, config: &GeneticConfig) {
        let mut rng = rand::thread_rng();

        if rng.gen::<f32>() < config.topology_mutation_chance
            && self.mutate_add_connection(history).is_none()
        {
            // A saturated topology falls through to a node split.
            self.mutate_add_node(history);
        }
        if rng.gen::<f32>() < config.topology_mutation_chance {
            self.mutate_add_node(history);
        }

        self.mutate_weights(config);
    }

    /// Attempts to connect a random node pair that is not yet
    /// connected. Up to `node_count()²` pairs are tried; for each
    /// candidate `(a, b)` with `b` a non-input, the reverse edge
    /// `(b, a)` is tried when the forward edge is taken and `a`
    /// is itself a non-input. New genes carry weight 1.0.
    ///
    /// Returns the new gene, or `None` if every attempt found
    /// its pair already claimed.
    pub fn mutate_add_connection(&mut self, history: &mut History) -> Option<&Gene> {
        let mut rng = rand::thread_rng();
        let non_inputs: Vec<usize> = self
            .nodes
            .iter()
            .filter(|n| !matches!(n.kind(), NodeKind::Input | NodeKind::InputBias))
            .map(Node::id)
            .collect();

        let attempts = self.nodes.len() * self.nodes.len();
        for _ in 0..attempts {
            let a = self.nodes.choose(&mut rng)?.id();
            let b = *non_inputs.choose(&mut rng)?;

            let a_is_input = matches!(
                self.nodes[a].kind(),
                NodeKind::Input | NodeKind::InputBias
            );
            let endpoints = if !self.has_connection(a, b) {
                Some((a, b))
            } else if !a_is_input && !self.has_connection(b, a) {
                Some((b, a))
            } else {
                None
            };

            if let Some((input, output)) = endpoints {
                let innovation = history.acquire(input, output);
                self.insert_gene(Gene::new(innovation, input, output, 1.0));
                return self.genes.iter().find(|g| g.innovation() == innovation);
            }
        }
        None
    }

    /// Splits a random active gene: the gene is deactivated, a
    /// hidden node is appended, and two new active genes bridge
    /// the gap. The front gene carries weight 1.0, the back gene
    /// the split gene's old weight.
    ///
    /// Returns `(front gene, new node, back gene)`, or `None` if
    /// the genome has no active gene to split.
    ///
    /// # Examples
    /// ```
    /// use neat_arena::genomics::{GeneticConfig, Genome, History};
    ///
    /// let config = GeneticConfig::zero();
    /// let mut history = History::new(config.input_count, config.output_count);
    /// let mut genome = Genome::primitive(&mut history, &config);
    ///
    /// let old_weight = genome.genes().next().unwrap().weight();
    /// let (front, node, back) = genome.mutate_add_node(&mut history).unwrap();
    ///
    /// assert_eq!(front.weight(), 1.0);
    /// assert_eq!(front.output(), node.id());
    /// assert_eq!(back.input(), node.id());
    /// assert_eq!(back.weight(), old_weight);
    ///
    /// // The split gene is retained but inactive.
    /// assert_eq!(genome.genes().filter(|g| g.active()).count(), 2);
    /// assert_eq!(genome.gene_count(), 3);
    /// ```
    pub fn mutate_add_node(&mut self, history: &mut History) -> Option<(&Gene, &Node, &Gene)> {
        let mut rng = rand::thread_rng();
        let split_slot = (0..self.genes.len())
            .filter(|&slot| self.genes[slot].active())
            .choose(&mut rng)?;

        let (input, output) = self.genes[split_slot].endpoints();
        let old_weight = self.genes[split_slot].weight();
        self.genes[split_slot].set_active(false);

        let node_id = self.add_hidden_node();
        let front = history.acquire(input, node_id);
        self.insert_gene(Gene::new(front, input, node_id, 1.0));
        let back = history.acquire(node_id, output);
        self.insert_gene(Gene::new(back, node_id, output, old_weight));

        Some((
            self.gene(front).unwrap(),
            &self.nodes[node_id],
            self.gene(back).unwrap(),
        ))
    }

    /// Runs the weight pass: each gene independently mutates
    /// with the configured chance, picking one of the enabled
    /// mutation kinds uniformly at random.
    pub fn mutate_weights(&mut self, config: &GeneticConfig) {
        if config.weight_mutations.is_empty() {
            return;
        }

        let mut rng = rand::thread_rng();
        for gene in &mut self.genes {
            if rng.gen::<f32>() >= config.gene_mutation_chance {
                continue;
            }
            match config.weight_mutations.choose(&mut rng).copied().unwrap() {
                WeightMutation::FlipSign => gene.set_weight(-gene.weight()),
                WeightMutation::ToggleState => gene.set_active(!gene.active()),
                WeightMutation::Randomize => gene.randomize_weight(),
                WeightMutation::ScaleUp => {
                    gene.set_weight(gene.weight() * (1.0 + rng.gen::<f32>()))
                }
                WeightMutation::ScaleDown => gene.set_weight(gene.weight() * rng.gen::<f32>()),
            }
        }
    }

    /// Combines two parent genomes into a child genome by
    /// aligning genes on innovation numbers.
    ///
    /// Genes present in both parents are taken from either one
    /// uniformly at random; genes present in one parent are
    /// carried only from the fitter parent, with `first` winning
    /// ties. Each carried gene is deep-copied and may have its
    /// state perturbed with the configured per-comparison chance.
    ///
    /// The child's node list comes from the parent with more
    /// nodes, its perceptron counts from `first`, its fitness is
    /// reset and a fresh id is allocated.
    ///
    /// # Examples
    /// ```
    /// use neat_arena::genomics::{GeneticConfig, Genome, History};
    ///
    /// let config = GeneticConfig::zero();
    /// let mut history = History::new(config.input_count, config.output_count);
    ///
    /// let parent = Genome::primitive(&mut history, &config);
    /// let child = Genome::crossover(&parent, &parent.clone(), &config);
    ///
    /// // Identical parents at equal fitness reproduce the gene set.
    /// assert_eq!(child.gene_count(), parent.gene_count());
    /// ```
    pub fn crossover(first: &Genome, second: &Genome, config: &GeneticConfig) -> Genome {
        let mut rng = rand::thread_rng();
        let table = alignment::AlignmentTable::new(first, second);

        let mut genes = Vec::new();
        for (_, slots) in table.ascending() {
            let (picked, comparison) = match slots {
                (Some(a), Some(b)) => {
                    let comparison = match (a.active(), b.active()) {
                        (true, true) => GeneComparison::BothActive,
                        (false, false) => GeneComparison::BothInactive,
                        _ => GeneComparison::Inversed,
                    };
                    (if rng.gen::<bool>() { a } else { b }, comparison)
                }
                (Some(a), None) => {
                    if second.fitness > first.fitness {
                        continue;
                    }
                    (a, dominant_comparison(a))
                }
                (None, Some(b)) => {
                    if second.fitness <= first.fitness {
                        continue;
                    }
                    (b, dominant_comparison(b))
                }
                (None, None) => unreachable!("alignment entry with no gene"),
            };

            let mut gene = picked.clone();
            if rng.gen::<f32>() < config.cross_state_chance(comparison) {
                match comparison {
                    GeneComparison::BothInactive => gene.set_active(false),
                    GeneComparison::Inversed => gene.set_active(true),
                    _ => gene.set_active(!gene.active()),
                }
            }
            genes.push(gene);
        }

        let node_donor = if second.nodes.len() > first.nodes.len() {
            second
        } else {
            first
        };

        Genome {
            input_count: first.input_count,
            output_count: first.output_count,
            nodes: node_donor
                .nodes
                .iter()
                .map(|n| Node::new(n.id(), n.kind()))
                .collect(),
            genes,
            fitness: 0.0,
            id: rng.gen(),
        }
    }

    /// Returns the genomic distance between two genomes under
    /// the configured coefficients. Two genomes at distance at
    /// most the delta threshold are same-species.
    ///
    /// # Examples
    /// ```
    /// use neat_arena::genomics::{GeneticConfig, Genome, History};
    ///
    /// let config = GeneticConfig {
    ///     disjoint_coefficient: 1.0,
    ///     excess_coefficient: 1.0,
    ///     weight_coefficient: 0.4,
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut history = History::new(config.input_count, config.output_count);
    ///
    /// let genome = Genome::primitive(&mut history, &config);
    ///
    /// assert_eq!(Genome::distance(&genome, &genome, &config), 0.0);
    /// ```
    pub fn distance(first: &Genome, second: &Genome, config: &GeneticConfig) -> f32 {
        alignment::distance(
            first,
            second,
            config.disjoint_coefficient,
            config.excess_coefficient,
            config.weight_coefficient,
        )
    }

    /// Returns the gene with the given innovation, if present.
    pub fn gene(&self, innovation: Innovation) -> Option<&Gene> {
        self.genes
            .binary_search_by_key(&innovation, |g| g.innovation())
            .ok()
            .map(|slot| &self.genes[slot])
    }

    /// Returns an iterator over the genes, in ascending
    /// innovation order.
    pub fn genes(&self) -> impl Iterator<Item = &Gene> {
        self.genes.iter()
    }

    /// Returns an iterator over the nodes, in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Mutable gene access for in-crate callers. Weights and
    /// states are free to change; innovations are not reachable,
    /// so the ordering invariant holds.
    pub(crate) fn genes_mut(&mut self) -> impl Iterator<Item = &mut Gene> {
        self.genes.iter_mut()
    }

    /// Returns the number of genes, active or not.
    pub fn gene_count(&self) -> usize {
        self.genes.len()
    }

    /// Returns the number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of input perceptrons, bias included.
    pub fn input_count(&self) -> NonZeroUsize {
        self.input_count
    }

    /// Returns the number of output perceptrons.
    pub fn output_count(&self) -> NonZeroUsize {
        self.output_count
    }

    /// Returns the genome's current fitness.
    pub fn fitness(&self) -> f32 {
        self.fitness
    }

    /// Sets the genome's fitness. Negative values are allowed
    /// here; fitness sharing clamps them during reproduction.
    pub fn set_fitness(&mut self, fitness: f32) {
        self.fitness = fitness;
    }

    /// Returns the genome's opaque id.
    pub fn id(&self) -> u64 {
        self.id
    }
}

fn dominant_comparison(gene: &Gene) -> GeneComparison {
    if gene.active() {
        GeneComparison::DominantActive
    } else {
        GeneComparison::DominantInactive
    }
}

impl fmt::Display for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Genome")
            .field("Id", &format_args!("{:#x}", self.id))
            .field("Genes", &self.genes)
            .field("Nodes", &self.nodes)
            .field("Fitness", &self.fitness)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(inputs: usize, outputs: usize) -> GeneticConfig {
        GeneticConfig {
            input_count: NonZeroUsize::new(inputs).unwrap(),
            output_count: NonZeroUsize::new(outputs).unwrap(),
            ..GeneticConfig::zero()
        }
    }

    fn primitive(inputs: usize, outputs: usize) -> (Genome, History) {
        let config = config(inputs, outputs);
        let mut history = History::new(config.input_count, config.output_count);
        let genome = Genome::primitive(&mut history, &config);
        (genome, history)
    }

    fn innovations(genome: &Genome) -> Vec<Innovation> {
        genome.genes().map(Gene::innovation).collect()
    }

    fn is_strictly_ascending(innovations: &[Innovation]) -> bool {
        innovations.windows(2).all(|pair| pair[0] < pair[1])
    }

    #[test]
    fn primitive_wiring_is_input_major() {
        let (genome, _) = primitive(3, 2);

        assert_eq!(genome.node_count(), 5);
        assert_eq!(genome.gene_count(), 6);
        assert_eq!(genome.nodes[2].kind(), NodeKind::InputBias);
        assert_eq!(genome.nodes[3].kind(), NodeKind::Output);

        let endpoints: Vec<_> = genome.genes().map(|g| g.endpoints()).collect();
        assert_eq!(
            endpoints,
            [(0, 3), (0, 4), (1, 3), (1, 4), (2, 3), (2, 4)],
        );
        assert_eq!(innovations(&genome), [0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn genes_stay_ascending_through_mutation() {
        let (mut genome, mut history) = primitive(3, 2);
        let config = GeneticConfig {
            topology_mutation_chance: 1.0,
            gene_mutation_chance: 1.0,
            weight_mutations: vec![
                WeightMutation::FlipSign,
                WeightMutation::ToggleState,
                WeightMutation::Randomize,
                WeightMutation::ScaleUp,
                WeightMutation::ScaleDown,
            ],
            ..config(3, 2)
        };

        for _ in 0..50 {
            genome.mutate(&mut history, &config);
            assert!(is_strictly_ascending(&innovations(&genome)));
        }
    }

    #[test]
    fn no_duplicate_endpoint_pairs_after_mutation() {
        let (mut genome, mut history) = primitive(2, 2);
        let config = GeneticConfig {
            topology_mutation_chance: 1.0,
            ..config(2, 2)
        };

        for _ in 0..50 {
            genome.mutate(&mut history, &config);
        }

        let mut pairs: Vec<_> = genome.genes().map(|g| g.endpoints()).collect();
        let total = pairs.len();
        pairs.sort_unstable();
        pairs.dedup();
        assert_eq!(pairs.len(), total);
    }

    #[test]
    fn add_connection_skips_claimed_pairs() {
        let (mut genome, mut history) = primitive(2, 1);

        // 2 nodes of input, 1 output: the only missing edges are
        // output->output (self loop counts too).
        while genome.mutate_add_connection(&mut history).is_some() {}

        // Every non-input target is now fully claimed.
        for input in 0..genome.node_count() {
            assert!(genome.has_connection(input, 2));
        }
        assert!(genome.mutate_add_connection(&mut history).is_none());
    }

    #[test]
    fn inactive_genes_keep_their_claim() {
        let (mut genome, mut history) = primitive(1, 1);
        // Deactivate the single gene; its pair must stay taken.
        let (input, output) = genome.genes[0].endpoints();
        genome.genes[0].set_active(false);

        assert!(genome.has_connection(input, output));
        if let Some(gene) = genome.mutate_add_connection(&mut history) {
            assert_ne!(gene.endpoints(), (input, output));
        }
    }

    #[test]
    fn node_split_shares_innovations_across_genomes() {
        let config = config(2, 1);
        let mut history = History::new(config.input_count, config.output_count);
        let mut first = Genome::primitive(&mut history, &config);
        let mut second = first.clone();

        // Pin the same split in both genomes by leaving only one
        // active gene.
        first.genes[1].set_active(false);
        second.genes[1].set_active(false);

        let (front_a, node_a, back_a) = {
            let (f, n, b) = first.mutate_add_node(&mut history).unwrap();
            (f.innovation(), n.id(), b.innovation())
        };
        let (front_b, node_b, back_b) = {
            let (f, n, b) = second.mutate_add_node(&mut history).unwrap();
            (f.innovation(), n.id(), b.innovation())
        };

        assert_eq!(node_a, node_b);
        assert_eq!(front_a, front_b);
        assert_eq!(back_a, back_b);
    }

    #[test]
    fn crossover_of_identical_parents_preserves_genes() {
        let (parent, _) = primitive(3, 2);
        let copy = parent.clone();

        let child = Genome::crossover(&parent, &copy, &config(3, 2));

        let parent_genes: Vec<_> = parent
            .genes()
            .map(|g| (g.innovation(), g.endpoints(), g.weight(), g.active()))
            .collect();
        let child_genes: Vec<_> = child
            .genes()
            .map(|g| (g.innovation(), g.endpoints(), g.weight(), g.active()))
            .collect();

        assert_eq!(parent_genes, child_genes);
        assert_eq!(child.fitness(), 0.0);
        assert_ne!(child.id(), parent.id());
    }

    #[test]
    fn crossover_drops_weak_parent_singles() {
        let config = config(2, 1);
        let mut history = History::new(config.input_count, config.output_count);
        let mut strong = Genome::primitive(&mut history, &config);
        let mut weak = strong.clone();

        // Only the weak parent grows extra structure.
        weak.mutate_add_node(&mut history);
        strong.set_fitness(10.0);
        weak.set_fitness(1.0);

        let child = Genome::crossover(&strong, &weak, &config);

        assert_eq!(child.gene_count(), strong.gene_count());
        let known: Vec<_> = innovations(&strong);
        assert!(child.genes().all(|g| known.contains(&g.innovation())));
    }

    #[test]
    fn crossover_child_size_is_bounded() {
        let config = config(2, 2);
        let mut history = History::new(config.input_count, config.output_count);
        let mut first = Genome::primitive(&mut history, &config);
        let mut second = first.clone();

        for _ in 0..5 {
            first.mutate_add_node(&mut history);
            second.mutate_add_connection(&mut history);
        }
        first.set_fitness(3.0);
        second.set_fitness(7.0);

        let child = Genome::crossover(&first, &second, &config);

        assert!(child.gene_count() <= first.gene_count().max(second.gene_count()));
        let pool: Vec<_> = innovations(&first)
            .into_iter()
            .chain(innovations(&second))
            .collect();
        assert!(child.genes().all(|g| pool.contains(&g.innovation())));
        assert!(is_strictly_ascending(&innovations(&child)));
    }

    #[test]
    fn crossover_state_perturbation_reactivates_inversed() {
        let mut config = config(1, 1);
        config.cross_state_chances = vec![(GeneComparison::Inversed, 1.0)];

        let mut history = History::new(config.input_count, config.output_count);
        let first = Genome::primitive(&mut history, &config);
        let mut second = first.clone();
        second.genes[0].set_active(false);

        for _ in 0..10 {
            let child = Genome::crossover(&first, &second, &config);
            assert!(child.genes().next().unwrap().active());
        }
    }
}
