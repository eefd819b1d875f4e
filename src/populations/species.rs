use crate::genomics::{GeneticConfig, Genome};

use rand::prelude::SliceRandom;
use serde::{Deserialize, Serialize};

/// A cluster of reproductively compatible genomes: every member
/// joined by passing the genomic-distance test against a member
/// already inside.
///
/// A species carries a stable human-readable id (a random hex
/// colour) for telemetry and agent bookkeeping.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Species {
    id: String,
    pub(super) genomes: Vec<Genome>,
}

impl Species {
    /// Creates a species seeded with its first member.
    pub fn new(id: String, first: Genome) -> Species {
        Species {
            id,
            genomes: vec![first],
        }
    }

    /// Returns the species' id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns an iterator over the members.
    pub fn genomes(&self) -> impl Iterator<Item = &Genome> {
        self.genomes.iter()
    }

    /// Returns the number of members.
    pub fn len(&self) -> usize {
        self.genomes.len()
    }

    /// Returns `true` if the species has no members.
    pub fn is_empty(&self) -> bool {
        self.genomes.is_empty()
    }

    /// Returns the distance from `genome` to a randomly drawn
    /// member, or `None` if the species is empty.
    pub(super) fn sample_distance(&self, genome: &Genome, config: &GeneticConfig) -> Option<f32> {
        self.genomes
            .choose(&mut rand::thread_rng())
            .map(|member| Genome::distance(genome, member, config))
    }

    pub(super) fn push(&mut self, genome: Genome) {
        self.genomes.push(genome);
    }

    /// The species' share of the reproductive pool: each member
    /// contributes its non-negative fitness raised to `beta`,
    /// divided by the number of *other* members it is
    /// same-species with. Sharing keeps a large cluster of
    /// near-identical genomes from flooding the next generation.
    pub(super) fn distribution(&self, beta: f32, config: &GeneticConfig, delta: f32) -> f32 {
        self.genomes
            .iter()
            .enumerate()
            .map(|(slot, genome)| {
                let peers = self
                    .genomes
                    .iter()
                    .enumerate()
                    .filter(|(other_slot, other)| {
                        *other_slot != slot && Genome::distance(genome, other, config) <= delta
                    })
                    .count();
                genome.fitness().max(0.0).powf(beta) / peers.max(1) as f32
            })
            .sum()
    }

    /// Sorts members by ascending fitness.
    pub(super) fn sort_by_fitness(&mut self) {
        self.genomes.sort_unstable_by(|a, b| {
            a.fitness()
                .partial_cmp(&b.fitness())
                .unwrap_or_else(|| panic!("invalid genome fitnesses detected (NaN)"))
        });
    }

    /// Drops the worst members, assuming an ascending sort:
    /// the top `ceil(len * (1 - fraction))` members survive. A
    /// two-member species always loses its worst when any
    /// removal is requested.
    pub(super) fn remove_worst(&mut self, fraction: f32) {
        if self.genomes.len() == 2 && fraction > 0.0 {
            self.genomes.remove(0);
            return;
        }
        let keep = (self.genomes.len() as f32 * (1.0 - fraction)).ceil() as usize;
        let cut = self.genomes.len().saturating_sub(keep);
        self.genomes.drain(..cut);
    }

    /// Returns the best-performing member.
    pub fn best(&self) -> Option<&Genome> {
        self.genomes.iter().max_by(|a, b| {
            a.fitness()
                .partial_cmp(&b.fitness())
                .unwrap_or_else(|| panic!("invalid genome fitnesses detected (NaN)"))
        })
    }
}
