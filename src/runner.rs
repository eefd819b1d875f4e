//! The generation runner: drives fixed-duration evaluation
//! windows over a population, one external agent per genome.
//!
//! Each generation the runner spawns agents through the host's
//! [`Environment`], hands every agent its built network and a
//! pair of capabilities (a [`GenerationClock`] bound to the
//! window's stopwatch and a [`FinishHandle`] for scoring early),
//! then arms a one-shot timeout. Agents that have not reported
//! by the deadline are scored in a sweep. When every agent is
//! scored the population reproduces and the next window begins.
//!
//! All population and fitness mutation is serialized on one
//! control thread; agent callbacks arrive over a channel and may
//! be sent from any thread, including from inside `activate`.
//! A failing agent never wedges a generation: panics from agent
//! code are caught, logged, and scored as 0.

use crate::genomics::{GeneticConfig, Genome, GenomePacket, History, PacketError};
use crate::networks::Network;
use crate::populations::{Population, PopulationConfig};

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use ahash::RandomState;
use rand::prelude::SliceRandom;
use serde::{Deserialize, Serialize};

/// Opaque identity of one activated agent within a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AgentToken(u64);

/// The voluntary-finish callback handed to each agent. Calling
/// [`finished`] at any time, from any thread, asks the runner to
/// score the agent before the window closes. Calls after the
/// agent was already scored are ignored.
///
/// [`finished`]: FinishHandle::finished
#[derive(Clone)]
pub struct FinishHandle {
    sender: Sender<Message>,
    token: AgentToken,
}

impl FinishHandle {
    /// Reports the agent as done with its evaluation.
    pub fn finished(&self) {
        let _ = self.sender.send(Message::AgentFinished(self.token));
    }
}

/// Read-only access to the wall-clock time elapsed in the
/// current evaluation window. Reads as zero outside a window;
/// the runner clears it when the generation ends.
#[derive(Clone)]
pub struct GenerationClock {
    started: Arc<Mutex<Option<Instant>>>,
}

impl GenerationClock {
    fn new() -> GenerationClock {
        GenerationClock {
            started: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns the time elapsed since the window's stopwatch
    /// started.
    pub fn elapsed(&self) -> Duration {
        self.started
            .lock()
            .unwrap()
            .map(|started| started.elapsed())
            .unwrap_or(Duration::ZERO)
    }

    fn start(&self) {
        *self.started.lock().unwrap() = Some(Instant::now());
    }

    fn clear(&self) {
        *self.started.lock().unwrap() = None;
    }
}

/// Everything an agent receives at activation.
pub struct ActivationContext {
    /// Id of the species the agent's genome belongs to.
    pub species_id: String,
    /// The built evaluator for the agent's genome.
    pub network: Network,
    /// Stopwatch of the current window.
    pub clock: GenerationClock,
    /// Callback for scoring early.
    pub finish: FinishHandle,
}

/// Contract for one evaluated individual.
///
/// `activate` is called exactly once, on the runner's control
/// thread, with the assigned network. The agent drives its actor
/// from there; at the window deadline (or after a voluntary
/// finish) the runner calls `calculate_fitness` and the returned
/// value becomes the genome's fitness, then `on_finished` runs
/// and the agent is dropped.
pub trait Agent: Send {
    fn activate(&mut self, context: ActivationContext);
    fn calculate_fitness(&mut self) -> f32;
    fn on_finished(&mut self) {}
}

/// Contract for the simulation host.
pub trait Environment: Send {
    /// Called before the agents of a generation are spawned.
    fn before_generation(&mut self) {}
    /// Produces the agent for one spawn slot.
    fn create_agent(&mut self, species_id: &str, spawn_index: usize) -> Box<dyn Agent>;
    /// Called once every agent is activated and the stopwatch is
    /// running.
    fn after_generation(&mut self) {}
    /// Called when a generation has been scored.
    fn on_generation_complete(&mut self) {}
}

/// Produces the genomes a run starts from. Two stock factories
/// exist: [`FreshSeeds`] breeds primitives, [`PacketSeeds`]
/// replays a persisted packet.
pub trait SeedFactory: Send {
    /// Prepares the shared registry before any seed is drawn.
    fn prime(&mut self, history: &mut History, config: &GeneticConfig) -> Result<(), RunnerError> {
        let _ = (history, config);
        Ok(())
    }

    /// Produces one seed genome.
    fn seed(&mut self, history: &mut History, config: &GeneticConfig) -> Genome;
}

/// Seeds a run with primitive genomes, each mutated once.
pub struct FreshSeeds;

impl SeedFactory for FreshSeeds {
    fn seed(&mut self, history: &mut History, config: &GeneticConfig) -> Genome {
        let mut genome = Genome::primitive(history, config);
        genome.mutate(history, config);
        genome
    }
}

/// Seeds a run with copies of a persisted network. The packet's
/// innovation list is replayed into the registry first, so the
/// copies keep a consistent numbering.
pub struct PacketSeeds {
    packet: GenomePacket,
    template: Option<Genome>,
}

impl PacketSeeds {
    pub fn new(packet: GenomePacket) -> PacketSeeds {
        PacketSeeds {
            packet,
            template: None,
        }
    }
}

impl SeedFactory for PacketSeeds {
    fn prime(&mut self, history: &mut History, config: &GeneticConfig) -> Result<(), RunnerError> {
        let expected = (config.input_count.get(), config.output_count.get());
        let found = (self.packet.input_count, self.packet.output_count);
        if expected != found {
            return Err(RunnerError::SeedShapeMismatch { expected, found });
        }

        let (template, decoded) = self.packet.decode()?;
        *history = decoded;
        self.template = Some(template);
        Ok(())
    }

    fn seed(&mut self, history: &mut History, config: &GeneticConfig) -> Genome {
        match &self.template {
            Some(template) => template.clone(),
            // Unprimed use only happens outside the runner; fall
            // back to a primitive rather than fail.
            None => Genome::primitive(history, config),
        }
    }
}

/// Configuration of a runner: the two shared parameter blocks
/// plus the length of one evaluation window.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunnerConfig {
    pub genetic: GeneticConfig,
    pub population: PopulationConfig,
    /// Wall-clock duration of one generation's evaluation.
    pub generation_test_time: Duration,
}

/// An error raised while constructing or resetting a runner.
#[derive(Debug)]
pub enum RunnerError {
    /// The evaluation window must be a positive duration.
    ZeroTestTime,
    /// The mutation parameter block enables no weight mutation.
    EmptyWeightMutations,
    /// A seed packet failed to decode.
    Seed(PacketError),
    /// A seed packet disagrees with the configured perceptron
    /// counts, as `(inputs, outputs)`.
    SeedShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },
    /// The runner's control thread is no longer alive.
    Stopped,
}

impl fmt::Display for RunnerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroTestTime => write!(f, "generation test time must be positive"),
            Self::EmptyWeightMutations => {
                write!(f, "mutation parameters enable no weight mutation kind")
            }
            Self::Seed(error) => write!(f, "seed packet rejected: {}", error),
            Self::SeedShapeMismatch { expected, found } => write!(
                f,
                "seed packet is shaped {:?} but the run is configured for {:?}",
                found, expected
            ),
            Self::Stopped => write!(f, "runner control thread has stopped"),
        }
    }
}

impl Error for RunnerError {}

impl From<PacketError> for RunnerError {
    fn from(error: PacketError) -> RunnerError {
        RunnerError::Seed(error)
    }
}

enum Message {
    Start(usize),
    Reset(Sender<Result<(), RunnerError>>),
    AgentFinished(AgentToken),
    Timeout(u64),
    Shutdown,
}

/// Runner state mirrored for the host's query surface. Updated
/// by the control thread at generation boundaries.
#[derive(Default)]
struct Published {
    running: bool,
    generation: usize,
    remaining: usize,
    best: Option<Genome>,
    species: Vec<(String, usize)>,
}

/// The timed generation loop over a population of agents.
///
/// # Examples
/// ```no_run
/// use neat_arena::genomics::{GeneticConfig, WeightMutation};
/// use neat_arena::populations::PopulationConfig;
/// use neat_arena::runner::{
///     ActivationContext, Agent, Environment, FreshSeeds, Runner, RunnerConfig,
/// };
/// use std::num::NonZeroUsize;
/// use std::time::Duration;
///
/// struct Pole {
///     context: Option<ActivationContext>,
/// }
///
/// impl Agent for Pole {
///     fn activate(&mut self, context: ActivationContext) {
///         self.context = Some(context);
///     }
///
///     fn calculate_fitness(&mut self) -> f32 {
///         self.context
///             .as_ref()
///             .map(|c| c.clock.elapsed().as_secs_f32())
///             .unwrap_or(0.0)
///     }
/// }
///
/// struct Cart;
///
/// impl Environment for Cart {
///     fn create_agent(&mut self, _species: &str, _spawn: usize) -> Box<dyn Agent> {
///         Box::new(Pole { context: None })
///     }
/// }
///
/// let config = RunnerConfig {
///     genetic: GeneticConfig {
///         input_count: NonZeroUsize::new(4).unwrap(),
///         output_count: NonZeroUsize::new(1).unwrap(),
///         topology_mutation_chance: 0.05,
///         gene_mutation_chance: 0.25,
///         weight_mutations: vec![WeightMutation::Randomize],
///         ..GeneticConfig::zero()
///     },
///     population: PopulationConfig {
///         size: NonZeroUsize::new(50).unwrap(),
///         delta_threshold: 3.0,
///         ..PopulationConfig::zero()
///     },
///     generation_test_time: Duration::from_secs(10),
/// };
///
/// let runner = Runner::new(Cart, config, FreshSeeds).unwrap();
/// assert!(runner.start_generations(100));
/// ```
pub struct Runner {
    sender: Sender<Message>,
    published: Arc<Mutex<Published>>,
    handle: Option<JoinHandle<()>>,
}

impl Runner {
    /// Builds a runner, seeds its population, and starts the
    /// control thread. The runner stays idle until
    /// [`start_generations`] is called.
    ///
    /// # Errors
    /// Fails on an invalid configuration or a rejected seed
    /// packet.
    ///
    /// [`start_generations`]: Runner::start_generations
    pub fn new<E, S>(environment: E, config: RunnerConfig, seeds: S) -> Result<Runner, RunnerError>
    where
        E: Environment + 'static,
        S: SeedFactory + 'static,
    {
        if config.generation_test_time.is_zero() {
            return Err(RunnerError::ZeroTestTime);
        }
        if config.genetic.weight_mutations.is_empty() {
            return Err(RunnerError::EmptyWeightMutations);
        }

        let (sender, receiver) = mpsc::channel();
        let published = Arc::new(Mutex::new(Published::default()));

        let mut control = Control {
            population: Population::new(config.population.clone(), config.genetic.clone()),
            environment: Box::new(environment),
            seeds: Box::new(seeds),
            config,
            published: Arc::clone(&published),
            sender: sender.clone(),
            clock: GenerationClock::new(),
            agents: HashMap::default(),
            next_token: 0,
            cycle: 0,
            cancel: None,
            remaining: 0,
            generation: 0,
            in_generation: false,
            best: None,
        };
        control.reset()?;

        let handle = thread::spawn(move || control.run(receiver));
        Ok(Runner {
            sender,
            published,
            handle: Some(handle),
        })
    }

    /// Begins a run of `n` generations. Returns `false`, and
    /// changes nothing, while a run is already in progress.
    pub fn start_generations(&self, n: usize) -> bool {
        let mut published = self.published.lock().unwrap();
        if published.running {
            return false;
        }
        if self.sender.send(Message::Start(n)).is_err() {
            return false;
        }
        published.running = n > 0;
        true
    }

    /// Rebuilds the population from the seed factory and rewinds
    /// the generation counter. Any window in progress is
    /// abandoned without scoring.
    pub fn reset(&self) -> Result<(), RunnerError> {
        let (ack, result) = mpsc::channel();
        self.sender
            .send(Message::Reset(ack))
            .map_err(|_| RunnerError::Stopped)?;
        result.recv().map_err(|_| RunnerError::Stopped)?
    }

    /// Returns a copy of the best network seen so far, with its
    /// fitness.
    pub fn best_network(&self) -> Option<Genome> {
        self.published.lock().unwrap().best.clone()
    }

    /// Returns the number of the generation currently (or last)
    /// evaluated. Zero before the first start.
    pub fn generation_number(&self) -> usize {
        self.published.lock().unwrap().generation
    }

    /// Returns how many generations are left in the current run.
    pub fn generations_remaining(&self) -> usize {
        self.published.lock().unwrap().remaining
    }

    /// Returns each species' id and member count.
    pub fn species_info(&self) -> Vec<(String, usize)> {
        self.published.lock().unwrap().species.clone()
    }

    /// Returns whether a run is in progress.
    pub fn is_running(&self) -> bool {
        self.published.lock().unwrap().running
    }
}

impl Drop for Runner {
    fn drop(&mut self) {
        let _ = self.sender.send(Message::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

struct Control {
    population: Population,
    environment: Box<dyn Environment>,
    seeds: Box<dyn SeedFactory>,
    config: RunnerConfig,
    published: Arc<Mutex<Published>>,
    sender: Sender<Message>,
    clock: GenerationClock,
    agents: HashMap<AgentToken, (Box<dyn Agent>, (usize, usize)), RandomState>,
    next_token: u64,
    /// Stamp for one-shot timers; a timeout from a previous
    /// window or a reset carries a stale stamp and is ignored.
    cycle: u64,
    cancel: Option<Sender<()>>,
    remaining: usize,
    generation: usize,
    in_generation: bool,
    best: Option<Genome>,
}

impl Control {
    fn run(mut self, receiver: Receiver<Message>) {
        while let Ok(message) = receiver.recv() {
            match message {
                Message::Start(n) => self.start(n),
                Message::Reset(ack) => {
                    let _ = ack.send(self.reset());
                }
                Message::AgentFinished(token) => self.agent_finished(token),
                Message::Timeout(cycle) => self.timeout(cycle),
                Message::Shutdown => break,
            }
        }
    }

    fn reset(&mut self) -> Result<(), RunnerError> {
        drop(self.cancel.take());
        self.cycle += 1;
        self.agents.clear();
        self.clock.clear();
        self.remaining = 0;
        self.generation = 0;
        self.in_generation = false;
        self.best = None;

        self.population = Population::new(
            self.config.population.clone(),
            self.config.genetic.clone(),
        );
        self.seeds
            .prime(self.population.history_mut(), &self.config.genetic)?;
        let seeds = &mut self.seeds;
        self.population
            .seed_with(|history, config| seeds.seed(history, config));

        self.publish();
        Ok(())
    }

    fn start(&mut self, n: usize) {
        self.remaining = n;
        if self.remaining > 0 {
            self.generation += 1;
            self.begin_generation();
        }
        self.publish();
    }

    /// Spawns the generation's agents in a shuffled order, then
    /// starts the stopwatch and arms the one-shot timeout.
    fn begin_generation(&mut self) {
        self.in_generation = true;
        self.population.reset_fitnesses();
        self.environment.before_generation();

        let mut origins: Vec<(usize, usize, String)> = Vec::new();
        for (species_slot, species) in self.population.species().enumerate() {
            for member_slot in 0..species.len() {
                origins.push((species_slot, member_slot, species.id().to_string()));
            }
        }
        origins.shuffle(&mut rand::thread_rng());

        log::debug!(
            "generation {}: spawning {} agents",
            self.generation,
            origins.len()
        );

        for (spawn_index, (species_slot, member_slot, species_id)) in
            origins.into_iter().enumerate()
        {
            let network = match self.population.genome_at(species_slot, member_slot) {
                Some(genome) => Network::new(genome),
                None => continue,
            };
            let token = AgentToken(self.next_token);
            self.next_token += 1;

            let mut agent = self.environment.create_agent(&species_id, spawn_index);
            let context = ActivationContext {
                species_id,
                network,
                clock: self.clock.clone(),
                finish: FinishHandle {
                    sender: self.sender.clone(),
                    token,
                },
            };

            match catch_unwind(AssertUnwindSafe(|| agent.activate(context))) {
                Ok(()) => {
                    self.agents
                        .insert(token, (agent, (species_slot, member_slot)));
                }
                Err(_) => {
                    // The genome keeps its reset fitness of 0.
                    log::warn!("agent panicked during activation and was dropped");
                }
            }
        }

        self.clock.start();
        self.environment.after_generation();

        self.cycle += 1;
        let (cancel, cancelled) = mpsc::channel::<()>();
        self.cancel = Some(cancel);
        let deadline = self.sender.clone();
        let stamp = self.cycle;
        let window = self.config.generation_test_time;
        thread::spawn(move || {
            if let Err(RecvTimeoutError::Timeout) = cancelled.recv_timeout(window) {
                let _ = deadline.send(Message::Timeout(stamp));
            }
        });

        if self.agents.is_empty() {
            // Nothing to wait for; close the window through the
            // queue so deep runs cannot recurse.
            let _ = self.sender.send(Message::Timeout(self.cycle));
        }
    }

    fn agent_finished(&mut self, token: AgentToken) {
        if !self.score_agent(token) {
            return;
        }
        if self.agents.is_empty() && self.in_generation {
            self.finish_generation();
        }
    }

    /// The deadline sweep: every still-registered agent is
    /// scored synchronously.
    fn timeout(&mut self, stamp: u64) {
        if stamp != self.cycle || !self.in_generation {
            return;
        }
        let unfinished: Vec<AgentToken> = self.agents.keys().copied().collect();
        if !unfinished.is_empty() {
            log::debug!("window closed with {} agents unfinished", unfinished.len());
        }
        for token in unfinished {
            self.score_agent(token);
        }
        self.finish_generation();
    }

    /// Removes the agent, collects its fitness, and stores it on
    /// the origin genome. Panics in agent code are caught and
    /// scored as 0.
    fn score_agent(&mut self, token: AgentToken) -> bool {
        let (mut agent, origin) = match self.agents.remove(&token) {
            Some(entry) => entry,
            None => return false,
        };

        let fitness = match catch_unwind(AssertUnwindSafe(|| agent.calculate_fitness())) {
            Ok(fitness) => fitness,
            Err(_) => {
                log::warn!("agent panicked during fitness calculation; scored 0");
                0.0
            }
        };
        if catch_unwind(AssertUnwindSafe(|| agent.on_finished())).is_err() {
            log::warn!("agent panicked during its finish callback");
        }

        self.population.assign_fitness(origin.0, origin.1, fitness);
        true
    }

    fn finish_generation(&mut self) {
        // Dropping the sender cancels the pending timeout
        // without firing the sweep.
        drop(self.cancel.take());
        self.clock.clear();
        self.in_generation = false;

        if let Some(champion) = self.population.champion() {
            let improved = self
                .best
                .as_ref()
                .map_or(true, |best| champion.fitness() > best.fitness());
            if improved {
                self.best = Some(champion.clone());
            }
        }
        log::info!(
            "generation {} scored; best fitness {}",
            self.generation,
            self.best.as_ref().map(Genome::fitness).unwrap_or(0.0)
        );

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining > 0 {
            self.population.generate_new_generation();
            self.generation += 1;
            self.begin_generation();
        }

        self.environment.on_generation_complete();
        self.publish();
    }

    fn publish(&mut self) {
        let mut published = self.published.lock().unwrap();
        published.running = self.in_generation || self.remaining > 0;
        published.generation = self.generation;
        published.remaining = self.remaining;
        published.best = self.best.clone();
        published.species = self.population.species_info();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::WeightMutation;

    use std::num::NonZeroUsize;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn test_config(size: usize, window: Duration) -> RunnerConfig {
        RunnerConfig {
            genetic: GeneticConfig {
                input_count: NonZeroUsize::new(3).unwrap(),
                output_count: NonZeroUsize::new(2).unwrap(),
                topology_mutation_chance: 0.1,
                gene_mutation_chance: 0.3,
                weight_mutations: vec![WeightMutation::Randomize, WeightMutation::FlipSign],
                disjoint_coefficient: 1.0,
                excess_coefficient: 1.0,
                weight_coefficient: 0.4,
                ..GeneticConfig::zero()
            },
            population: PopulationConfig {
                size: NonZeroUsize::new(size).unwrap(),
                delta_threshold: 50.0,
                elite_fraction: 0.1,
                beta: 1.0,
                ..PopulationConfig::zero()
            },
            generation_test_time: window,
        }
    }

    fn wait_until_idle(runner: &Runner) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while runner.is_running() {
            assert!(Instant::now() < deadline, "runner did not settle in time");
            thread::sleep(Duration::from_millis(5));
        }
    }

    /// Scores its spawn index and reports immediately.
    struct InstantAgent {
        score: f32,
        finished: Arc<AtomicUsize>,
    }

    impl Agent for InstantAgent {
        fn activate(&mut self, context: ActivationContext) {
            context.finish.finished();
        }

        fn calculate_fitness(&mut self) -> f32 {
            self.score
        }

        fn on_finished(&mut self) {
            self.finished.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Holds its context and waits for the deadline sweep.
    struct IdleAgent {
        score: f32,
        context: Option<ActivationContext>,
    }

    impl Agent for IdleAgent {
        fn activate(&mut self, context: ActivationContext) {
            self.context = Some(context);
        }

        fn calculate_fitness(&mut self) -> f32 {
            self.score
        }
    }

    struct InstantEnv {
        finished: Arc<AtomicUsize>,
        completed: Arc<AtomicUsize>,
    }

    impl Environment for InstantEnv {
        fn create_agent(&mut self, _species_id: &str, spawn_index: usize) -> Box<dyn Agent> {
            Box::new(InstantAgent {
                score: spawn_index as f32,
                finished: Arc::clone(&self.finished),
            })
        }

        fn on_generation_complete(&mut self) {
            self.completed.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct IdleEnv;

    impl Environment for IdleEnv {
        fn create_agent(&mut self, _species_id: &str, _spawn_index: usize) -> Box<dyn Agent> {
            Box::new(IdleAgent {
                score: 2.5,
                context: None,
            })
        }
    }

    #[test]
    fn voluntary_finishes_cascade_through_generations() {
        let finished = Arc::new(AtomicUsize::new(0));
        let completed = Arc::new(AtomicUsize::new(0));
        let environment = InstantEnv {
            finished: Arc::clone(&finished),
            completed: Arc::clone(&completed),
        };

        let runner = Runner::new(
            environment,
            test_config(6, Duration::from_secs(30)),
            FreshSeeds,
        )
        .unwrap();

        assert!(runner.start_generations(3));
        wait_until_idle(&runner);

        assert_eq!(runner.generation_number(), 3);
        assert_eq!(runner.generations_remaining(), 0);
        assert_eq!(finished.load(Ordering::SeqCst), 18);
        assert_eq!(completed.load(Ordering::SeqCst), 3);

        // Spawn indexes run 0..6, so the best score is 5.
        assert_eq!(runner.best_network().unwrap().fitness(), 5.0);

        let total: usize = runner.species_info().iter().map(|(_, n)| n).sum();
        assert_eq!(total, 6);
    }

    #[test]
    fn deadline_sweep_scores_idle_agents() {
        let runner = Runner::new(
            IdleEnv,
            test_config(4, Duration::from_millis(50)),
            FreshSeeds,
        )
        .unwrap();

        assert!(runner.start_generations(1));
        wait_until_idle(&runner);

        assert_eq!(runner.generation_number(), 1);
        assert_eq!(runner.best_network().unwrap().fitness(), 2.5);
    }

    #[test]
    fn start_is_rejected_while_running() {
        let runner = Runner::new(
            IdleEnv,
            test_config(2, Duration::from_millis(200)),
            FreshSeeds,
        )
        .unwrap();

        assert!(runner.start_generations(1));
        assert!(!runner.start_generations(1));
        wait_until_idle(&runner);

        // Idle again: a new run is accepted.
        assert!(runner.start_generations(1));
        wait_until_idle(&runner);
    }

    #[test]
    fn reset_rewinds_the_run() {
        let runner = Runner::new(
            IdleEnv,
            test_config(5, Duration::from_millis(50)),
            FreshSeeds,
        )
        .unwrap();

        assert!(runner.start_generations(1));
        wait_until_idle(&runner);
        assert_eq!(runner.generation_number(), 1);

        runner.reset().unwrap();

        assert_eq!(runner.generation_number(), 0);
        assert!(runner.best_network().is_none());
        let total: usize = runner.species_info().iter().map(|(_, n)| n).sum();
        assert_eq!(total, 5);
    }

    #[test]
    fn panicking_agents_score_zero() {
        struct Bomb {
            armed: bool,
        }

        impl Agent for Bomb {
            fn activate(&mut self, context: ActivationContext) {
                context.finish.finished();
            }

            fn calculate_fitness(&mut self) -> f32 {
                if self.armed {
                    panic!("scoring failure");
                }
                1.0
            }
        }

        struct BombEnv;

        impl Environment for BombEnv {
            fn create_agent(&mut self, _species_id: &str, spawn_index: usize) -> Box<dyn Agent> {
                Box::new(Bomb {
                    armed: spawn_index == 0,
                })
            }
        }

        let runner = Runner::new(
            BombEnv,
            test_config(3, Duration::from_secs(30)),
            FreshSeeds,
        )
        .unwrap();

        assert!(runner.start_generations(1));
        wait_until_idle(&runner);

        // The generation still completed, with the healthy score
        // on top.
        assert_eq!(runner.generation_number(), 1);
        assert_eq!(runner.best_network().unwrap().fitness(), 1.0);
    }

    #[test]
    fn packet_seeds_replay_the_saved_network() {
        let config = test_config(4, Duration::from_millis(50));
        let mut history = History::new(
            config.genetic.input_count,
            config.genetic.output_count,
        );
        let mut saved = Genome::primitive(&mut history, &config.genetic);
        saved.mutate_add_node(&mut history);
        let packet = GenomePacket::encode(&saved, &history);

        let runner = Runner::new(IdleEnv, config, PacketSeeds::new(packet)).unwrap();

        // Identical copies land in a single species.
        let info = runner.species_info();
        assert_eq!(info.len(), 1);
        assert_eq!(info[0].1, 4);
    }

    #[test]
    fn mismatched_packet_is_rejected() {
        let config = test_config(4, Duration::from_millis(50));

        let one = NonZeroUsize::new(1).unwrap();
        let mut foreign_history = History::new(one, one);
        let foreign = Genome::primitive(
            &mut foreign_history,
            &GeneticConfig::zero(),
        );
        let packet = GenomePacket::encode(&foreign, &foreign_history);

        match Runner::new(IdleEnv, config, PacketSeeds::new(packet)) {
            Err(RunnerError::SeedShapeMismatch { .. }) => {}
            other => panic!("expected a shape mismatch, got {:?}", other.is_ok()),
        }
    }

    #[test]
    fn zero_window_is_rejected() {
        match Runner::new(IdleEnv, test_config(2, Duration::ZERO), FreshSeeds) {
            Err(RunnerError::ZeroTestTime) => {}
            other => panic!("expected a config error, got {:?}", other.is_ok()),
        }
    }

    #[test]
    fn empty_weight_mutations_are_rejected() {
        let mut config = test_config(2, Duration::from_millis(50));
        config.genetic.weight_mutations.clear();

        match Runner::new(IdleEnv, config, FreshSeeds) {
            Err(RunnerError::EmptyWeightMutations) => {}
            other => panic!("expected a config error, got {:?}", other.is_ok()),
        }
    }

    #[test]
    fn clock_reads_zero_outside_a_window() {
        let clock = GenerationClock::new();
        assert_eq!(clock.elapsed(), Duration::ZERO);

        clock.start();
        thread::sleep(Duration::from_millis(5));
        assert!(clock.elapsed() >= Duration::from_millis(5));

        clock.clear();
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }
}
