//! Generational snapshot logging for populations. Hosts choose
//! how much genetic material each snapshot clones, from nothing
//! but statistics up to the full population.

use crate::genomics::Genome;
use crate::populations::{Population, Species};

use std::fmt;

/// Defines different possible reporting levels for logging.
#[derive(Clone, Copy, Debug)]
pub enum ReportingLevel {
    /// Clones the entire population.
    AllGenomes,
    /// Clones each species' best member.
    SpeciesChampions,
    /// Clones only the population champion.
    PopulationChampion,
    /// Clones no genomes.
    NoGenomes,
}

/// A reporting-level dependant store of genomes from a
/// population snapshot.
#[derive(Clone, Debug)]
pub enum GenerationMemberRecord {
    /// Species ids with their full membership.
    Species(Vec<(String, Vec<Genome>)>),
    /// Species ids with their best member only.
    SpeciesChampions(Vec<(String, Genome)>),
    /// Only the population champion.
    PopulationChampion(Genome),
    /// Empty.
    None,
}

/// A struct for reporting basic statistical data.
#[derive(Clone, Debug, PartialEq)]
pub struct Stats {
    pub maximum: f32,
    pub minimum: f32,
    pub mean: f32,
    pub median: f32,
}

impl Stats {
    /// Returns statistics about numbers in a sequence. An empty
    /// sequence yields all zeros.
    ///
    /// # Examples
    /// ```
    /// use neat_arena::populations::logging::Stats;
    ///
    /// let stats = Stats::from([-2.0, -1.0, 0.5, 1.0, 1.5].iter().copied());
    /// assert_eq!(stats.maximum, 1.5);
    /// assert_eq!(stats.minimum, -2.0);
    /// assert_eq!(stats.mean, 0.0);
    /// assert_eq!(stats.median, 0.5);
    /// ```
    pub fn from(data: impl Iterator<Item = f32>) -> Stats {
        let mut data: Vec<f32> = data.collect();
        if data.is_empty() {
            return Stats {
                maximum: 0.0,
                minimum: 0.0,
                mean: 0.0,
                median: 0.0,
            };
        }

        data.sort_unstable_by(|a, b| {
            a.partial_cmp(b)
                .unwrap_or_else(|| panic!("uncomparable value in statistics"))
        });
        let mid = data.len() / 2;
        let median = if data.len() % 2 == 0 {
            (data[mid - 1] + data[mid]) / 2.0
        } else {
            data[mid]
        };

        Stats {
            maximum: data[data.len() - 1],
            minimum: data[0],
            mean: data.iter().sum::<f32>() / data.len() as f32,
            median,
        }
    }
}

/// A snapshot of a population.
#[derive(Clone, Debug)]
pub struct Log {
    pub generation_number: usize,
    pub species_count: usize,
    pub generation_sample: GenerationMemberRecord,
    pub fitness: Stats,
}

impl fmt::Display for Log {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Log {{\n\
            \tgeneration_number: {:?}\n\
            \tspecies_count: {:?}\n\
            \tfitness: {:?}\n\
            }}",
            &self.generation_number, &self.species_count, &self.fitness,
        )
    }
}

/// A log of the evolution of a population over time.
///
/// # Examples
/// ```
/// use neat_arena::genomics::GeneticConfig;
/// use neat_arena::populations::logging::{EvolutionLogger, ReportingLevel};
/// use neat_arena::populations::{Population, PopulationConfig};
///
/// let mut logger = EvolutionLogger::new(ReportingLevel::NoGenomes);
/// let mut population = Population::new(PopulationConfig::zero(), GeneticConfig::zero());
/// population.seed_primitive();
///
/// // Do something with the population... then log a snapshot.
/// logger.log(&population);
///
/// for log in logger.iter() {
///     println!("{}", log);
/// }
/// ```
#[derive(Clone, Debug)]
pub struct EvolutionLogger {
    reporting_level: ReportingLevel,
    logs: Vec<Log>,
}

impl EvolutionLogger {
    /// Returns a logger with the appropiate reporting level.
    pub fn new(reporting_level: ReportingLevel) -> EvolutionLogger {
        EvolutionLogger {
            reporting_level,
            logs: vec![],
        }
    }

    /// Store a snapshot of a population.
    pub fn log(&mut self, population: &Population) {
        self.logs.push(Log {
            generation_number: population.generation(),
            species_count: population.species().count(),
            generation_sample: match self.reporting_level {
                ReportingLevel::AllGenomes => GenerationMemberRecord::Species(
                    population
                        .species()
                        .map(|s| (s.id().to_string(), s.genomes().cloned().collect()))
                        .collect(),
                ),
                ReportingLevel::SpeciesChampions => GenerationMemberRecord::SpeciesChampions(
                    population
                        .species()
                        .filter_map(|s| {
                            s.best().map(|best| (s.id().to_string(), best.clone()))
                        })
                        .collect(),
                ),
                ReportingLevel::PopulationChampion => match population.champion() {
                    Some(champion) => {
                        GenerationMemberRecord::PopulationChampion(champion.clone())
                    }
                    None => GenerationMemberRecord::None,
                },
                ReportingLevel::NoGenomes => GenerationMemberRecord::None,
            },
            fitness: Stats::from(
                population
                    .species()
                    .flat_map(Species::genomes)
                    .map(Genome::fitness),
            ),
        })
    }

    /// Iterate over all logged snapshots.
    pub fn iter(&self) -> impl Iterator<Item = &Log> {
        self.logs.iter()
    }
}
