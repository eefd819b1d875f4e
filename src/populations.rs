//! A Population is a collection of genomes grouped into species
//! by genomic distance, evolved generation by generation through
//! fitness sharing, elitism, and innovation-aligned crossover.

mod config;
pub mod logging;
mod species;

pub use config::{PopulationConfig, SelectionMode};
pub use species::Species;

use crate::genomics::{GeneticConfig, Genome, History};

use rand::prelude::{Rng, SliceRandom};

/// The species manager of an evolutionary run.
///
/// Owns the ordered species list, the shared innovation
/// registry, and both configuration blocks. All reproduction
/// happens through [`generate_new_generation`], which keeps the
/// total genome count exactly at the configured size.
///
/// [`generate_new_generation`]: Population::generate_new_generation
pub struct Population {
    species: Vec<Species>,
    history: History,
    genetic_config: GeneticConfig,
    population_config: PopulationConfig,
    generation: usize,
}

impl Population {
    /// Creates an empty population with a registry primed for
    /// the configured perceptron counts. Seed it with
    /// [`seed_with`] or [`seed_primitive`] before evolving.
    ///
    /// The configurations are copied and kept for the
    /// population's lifetime.
    ///
    /// [`seed_with`]: Population::seed_with
    /// [`seed_primitive`]: Population::seed_primitive
    pub fn new(population_config: PopulationConfig, genetic_config: GeneticConfig) -> Population {
        Population {
            species: vec![],
            history: History::new(genetic_config.input_count, genetic_config.output_count),
            genetic_config,
            population_config,
            generation: 0,
        }
    }

    /// Fills the population to its configured size, drawing each
    /// seed genome from the factory and assigning it to the
    /// closest matching species, or to a new species when none
    /// is within the delta threshold.
    pub fn seed_with<F>(&mut self, mut factory: F)
    where
        F: FnMut(&mut History, &GeneticConfig) -> Genome,
    {
        for _ in 0..self.population_config.size.get() {
            let genome = factory(&mut self.history, &self.genetic_config);
            self.speciate_seed(genome);
        }
        log::debug!(
            "seeded {} genomes across {} species",
            self.genome_count(),
            self.species.len()
        );
    }

    /// Seeds the population with primitive genomes, each mutated
    /// once.
    pub fn seed_primitive(&mut self) {
        self.seed_with(|history, config| {
            let mut genome = Genome::primitive(history, config);
            genome.mutate(history, config);
            genome
        });
    }

    /// Assigns every genome a fitness through the evaluator.
    /// A convenience for hosts driving evolution directly,
    /// without a timed runner.
    pub fn evaluate_fitness<E>(&mut self, mut evaluator: E)
    where
        E: FnMut(&Genome) -> f32,
    {
        for genome in self.species.iter_mut().flat_map(|s| &mut s.genomes) {
            let fitness = evaluator(genome);
            genome.set_fitness(fitness);
        }
    }

    /// Reshapes the population into the next generation:
    ///
    /// 1. Reproductive quotas are allotted from each species'
    ///    shared-fitness distribution, floored, then corrected
    ///    until they sum to the configured size.
    /// 2. Each species is sorted by fitness and culled from the
    ///    bottom; species left without a quota or without
    ///    members drop out.
    /// 3. Each surviving species produces its quota: the leading
    ///    slots carry copies of its best member, the rest are
    ///    mutated crossover children.
    /// 4. Offspring are re-speciated into a fresh species list,
    ///    falling back to the closest species, or founding a new
    ///    one when none exists.
    ///
    /// Offspring enter the new generation with fitness 0.
    pub fn generate_new_generation(&mut self) {
        let size = self.population_config.size.get();
        let delta = self.population_config.delta_threshold;

        let distributions: Vec<f32> = self
            .species
            .iter()
            .map(|s| s.distribution(self.population_config.beta, &self.genetic_config, delta))
            .collect();
        let quotas = allot_quotas(&distributions, size);

        let mut parents = std::mem::take(&mut self.species);
        for species in &mut parents {
            species.sort_by_fitness();
            species.remove_worst(self.population_config.remove_worst);
        }
        let survivors: Vec<(Species, usize)> = parents
            .into_iter()
            .zip(quotas)
            .filter(|(species, quota)| *quota > 0 && !species.is_empty())
            .collect();

        let mut offspring = Vec::with_capacity(size);
        for (species, quota) in &survivors {
            for slot in 0..*quota {
                let mut child = if slot as f32 <= *quota as f32 * self.population_config.elite_fraction
                {
                    // Members are sorted ascending; the last one
                    // is the species' best.
                    species.genomes[species.len() - 1].clone()
                } else {
                    let (first, second) =
                        pick_parents(&species.genomes, self.population_config.selection_mode);
                    let mut child = Genome::crossover(first, second, &self.genetic_config);
                    child.mutate(&mut self.history, &self.genetic_config);
                    child
                };
                child.set_fitness(0.0);
                offspring.push(child);
            }
        }

        for genome in offspring {
            self.respeciate(genome);
        }
        self.generation += 1;

        log::info!(
            "generation {}: {} genomes across {} species",
            self.generation,
            self.genome_count(),
            self.species.len()
        );
    }

    /// Offspring placement: add-if-match against each forming
    /// species in order; when all reject, the closest species
    /// adopts; a new species is founded only when none exists.
    fn respeciate(&mut self, genome: Genome) {
        let delta = self.population_config.delta_threshold;
        let mut matched = None;
        let mut closest: Option<(usize, f32)> = None;

        for (slot, species) in self.species.iter().enumerate() {
            match species.sample_distance(&genome, &self.genetic_config) {
                None => {
                    matched = Some(slot);
                    break;
                }
                Some(distance) if distance <= delta => {
                    matched = Some(slot);
                    break;
                }
                Some(distance) => {
                    if closest.map_or(true, |(_, best)| distance < best) {
                        closest = Some((slot, distance));
                    }
                }
            }
        }

        match matched.or_else(|| closest.map(|(slot, _)| slot)) {
            Some(slot) => self.species[slot].push(genome),
            None => {
                let id = random_species_id();
                log::debug!("founding species {}", id);
                self.species.push(Species::new(id, genome));
            }
        }
    }

    /// Seed placement: the closest species within the delta
    /// threshold adopts, otherwise a new species is founded.
    fn speciate_seed(&mut self, genome: Genome) {
        let delta = self.population_config.delta_threshold;
        let mut closest: Option<(usize, f32)> = None;

        for (slot, species) in self.species.iter().enumerate() {
            if let Some(distance) = species.sample_distance(&genome, &self.genetic_config) {
                if distance <= delta && closest.map_or(true, |(_, best)| distance < best) {
                    closest = Some((slot, distance));
                }
            }
        }

        match closest {
            Some((slot, _)) => self.species[slot].push(genome),
            None => {
                self.species
                    .push(Species::new(random_species_id(), genome));
            }
        }
    }

    /// Returns the best-performing genome of the whole
    /// population.
    pub fn champion(&self) -> Option<&Genome> {
        self.species
            .iter()
            .flat_map(Species::genomes)
            .max_by(|a, b| {
                a.fitness()
                    .partial_cmp(&b.fitness())
                    .unwrap_or_else(|| panic!("invalid genome fitnesses detected (NaN)"))
            })
    }

    /// Returns an iterator over the species, in list order.
    pub fn species(&self) -> impl Iterator<Item = &Species> {
        self.species.iter()
    }

    /// Returns each species' id and member count.
    pub fn species_info(&self) -> Vec<(String, usize)> {
        self.species
            .iter()
            .map(|s| (s.id().to_string(), s.len()))
            .collect()
    }

    /// Returns the total number of genomes.
    pub fn genome_count(&self) -> usize {
        self.species.iter().map(Species::len).sum()
    }

    /// Returns the shared innovation registry.
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Registry access for in-crate seeding.
    pub(crate) fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    /// Returns the genome at a (species, member) origin.
    pub(crate) fn genome_at(&self, species: usize, member: usize) -> Option<&Genome> {
        self.species.get(species).and_then(|s| s.genomes.get(member))
    }

    /// Returns the current generation number.
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Returns the current speciation threshold.
    pub fn delta_threshold(&self) -> f32 {
        self.population_config.delta_threshold
    }

    /// Adjusts the speciation threshold for the coming
    /// generations.
    pub fn set_delta_threshold(&mut self, delta: f32) {
        self.population_config.delta_threshold = delta;
    }

    /// Resets every genome's fitness for a fresh evaluation
    /// window.
    pub(crate) fn reset_fitnesses(&mut self) {
        for genome in self.species.iter_mut().flat_map(|s| &mut s.genomes) {
            genome.set_fitness(0.0);
        }
    }

    /// Stores an evaluated fitness back on a genome addressed by
    /// its (species, member) origin.
    pub(crate) fn assign_fitness(&mut self, species: usize, member: usize, fitness: f32) {
        match self
            .species
            .get_mut(species)
            .and_then(|s| s.genomes.get_mut(member))
        {
            Some(genome) => genome.set_fitness(fitness),
            None => log::warn!(
                "fitness {} for unknown origin ({}, {}) dropped",
                fitness,
                species,
                member
            ),
        }
    }
}

/// Floors each species' proportional share of the cap, then
/// corrects the rounding drift: an undershoot grows random
/// species from the upper half of the list, an overshoot shrinks
/// random species that still have a quota. A non-positive
/// distribution total starts everyone at zero and lets the
/// correction fill the cap.
fn allot_quotas(distributions: &[f32], cap: usize) -> Vec<usize> {
    if distributions.is_empty() {
        return vec![];
    }

    let total: f32 = distributions.iter().sum();
    let mut quotas: Vec<usize> = if total > 0.0 {
        distributions
            .iter()
            .map(|share| (share / total * cap as f32).floor() as usize)
            .collect()
    } else {
        vec![0; distributions.len()]
    };

    let mut rng = rand::thread_rng();
    loop {
        let sum: usize = quotas.iter().sum();
        if sum == cap {
            break;
        }
        if sum < cap {
            let slot = rng.gen_range(quotas.len() / 2..quotas.len());
            quotas[slot] += 1;
        } else {
            let positive: Vec<usize> = (0..quotas.len()).filter(|&i| quotas[i] > 0).collect();
            let slot = *positive.choose(&mut rng).unwrap();
            quotas[slot] -= 1;
        }
    }
    quotas
}

fn pick_parents(members: &[Genome], mode: SelectionMode) -> (&Genome, &Genome) {
    let mut rng = rand::thread_rng();
    let first = members.choose(&mut rng).unwrap();
    let second = match mode {
        SelectionMode::Random => members.choose(&mut rng).unwrap(),
        SelectionMode::LogarithmicRankedPick => &members[ranked_slot(members.len(), &mut rng)],
    };
    (first, second)
}

/// A slot into an ascending fitness sort, biased toward the
/// fittest end: `|len-1 - rand(1,100)^log_100(len-1)|` lands
/// near zero most of the time, and is counted back from the top
/// of the list.
fn ranked_slot(len: usize, rng: &mut impl Rng) -> usize {
    if len <= 1 {
        return 0;
    }
    let top = (len - 1) as f32;
    let exponent = top.ln() / 100f32.ln();
    let draw = rng.gen_range(1..=100u32) as f32;
    let offset = (top - draw.powf(exponent)).abs().round() as usize;
    (len - 1).saturating_sub(offset)
}

fn random_species_id() -> String {
    format!("#{:06x}", rand::thread_rng().gen_range(0..0x100_0000))
}
