//! An implementation of NeuroEvolution of Augmenting Topologies
//! (NEAT) built around fixed-duration evaluation generations.
//!
//! Populations of sparse, variable-topology feed-forward networks
//! are bred by innovation-aligned crossover, structural and weight
//! mutation, and distance-based speciation with fitness sharing.
//! Evaluation is driven by a [`runner`]: external agents are
//! activated with a built network, accumulate fitness during a
//! wall-clock window, and are scored when the window closes; the
//! population then reproduces and the next window begins.
//!
//! The layers can also be used on their own:
//! - [`genomics`] holds the genome model, the shared innovation
//!   registry, mutation, crossover, and the persisted packet form.
//! - [`networks`] builds the single-pass evaluator for a genome.
//! - [`populations`] speciates genomes and assembles generations.
//! - [`runner`] schedules timed evaluation over host-owned agents.
//!
//! # Example usage: evolution without a runner
//!
//! Hosts that can score a genome synchronously can skip the timed
//! runner and drive the population directly:
//!
//! ```
//! use neat_arena::genomics::{GeneticConfig, Genome, WeightMutation};
//! use neat_arena::networks::Network;
//! use neat_arena::populations::{Population, PopulationConfig};
//! use std::num::NonZeroUsize;
//!
//! let genetic_config = GeneticConfig {
//!     input_count: NonZeroUsize::new(3).unwrap(),
//!     output_count: NonZeroUsize::new(1).unwrap(),
//!     topology_mutation_chance: 0.1,
//!     gene_mutation_chance: 0.25,
//!     weight_mutations: vec![
//!         WeightMutation::Randomize,
//!         WeightMutation::ScaleUp,
//!         WeightMutation::ScaleDown,
//!     ],
//!     cross_state_chance_default: 0.05,
//!     disjoint_coefficient: 1.0,
//!     excess_coefficient: 1.0,
//!     weight_coefficient: 0.4,
//!     ..GeneticConfig::zero()
//! };
//! let population_config = PopulationConfig {
//!     size: NonZeroUsize::new(20).unwrap(),
//!     delta_threshold: 3.0,
//!     elite_fraction: 0.1,
//!     beta: 1.0,
//!     remove_worst: 0.2,
//!     ..PopulationConfig::zero()
//! };
//!
//! // Reward networks that push their output high on a fixed probe.
//! fn evaluate(genome: &Genome) -> f32 {
//!     let mut network = Network::new(genome);
//!     1.0 + network.fire(&[0.5, -0.5, 0.0])[0]
//! }
//!
//! let mut population = Population::new(population_config, genetic_config);
//! population.seed_primitive();
//!
//! for _ in 0..5 {
//!     population.evaluate_fitness(evaluate);
//!     population.generate_new_generation();
//! }
//!
//! population.evaluate_fitness(evaluate);
//! let champion = population.champion().unwrap();
//! assert!(champion.fitness() >= 0.0);
//! ```
//!
//! For window-driven evaluation with live agents, see the
//! [`runner`] module's example.

pub mod genomics;
pub mod networks;
pub mod populations;
pub mod runner;

/// A run-wide identity for a directed connection. Assigned once
/// per `(input, output)` pair by the innovation registry, the
/// first time the connection appears anywhere in the run.
pub type Innovation = usize;
