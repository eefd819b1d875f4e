use crate::genomics::errors::PacketError;
use crate::genomics::{Gene, Genome, History};

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

/// One decoded connection record: the four-token unit both
/// packet strings are made of.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct GeneRecord {
    pub input: usize,
    pub output: usize,
    pub weight: f32,
    pub active: bool,
}

/// The logical persisted form of one network.
///
/// The genome string holds `input_output_weight_active` records
/// joined by `_`; the history string holds the registry's full
/// innovation list in the same shape, so that innovation numbers
/// can be reassigned consistently on load. The on-disk encoding
/// of the packet itself is left to the host.
///
/// # Examples
/// ```
/// use neat_arena::genomics::{GeneticConfig, Genome, GenomePacket, History};
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
/// let packet = GenomePacket::encode(&genome, &history);
/// let (restored, _) = packet.decode().unwrap();
///
/// assert_eq!(restored.gene_count(), genome.gene_count());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenomePacket {
    pub fitness: f64,
    pub node_count: usize,
    pub input_count: usize,
    pub output_count: usize,
    pub gene_count: usize,
    pub history_count: usize,
    pub genome: String,
    pub history: String,
}

impl GenomePacket {
    /// Captures a genome and the registry it was bred under.
    pub fn encode(genome: &Genome, history: &History) -> GenomePacket {
        GenomePacket {
            fitness: genome.fitness() as f64,
            node_count: genome.node_count(),
            input_count: genome.input_count().get(),
            output_count: genome.output_count().get(),
            gene_count: genome.gene_count(),
            history_count: history.len(),
            genome: encode_records(genome.genes().map(|gene| GeneRecord {
                input: gene.input(),
                output: gene.output(),
                weight: gene.weight(),
                active: gene.active(),
            })),
            history: history.encode(),
        }
    }

    /// Rebuilds the genome and a fresh registry from the packet.
    ///
    /// The registry is reconstructed first; genome records then
    /// acquire their innovation numbers from it, which reproduces
    /// the numbering the genome was saved with.
    ///
    /// # Errors
    /// Fails on malformed record strings, non-positive perceptron
    /// counts, and counts that disagree with the decoded strings.
    pub fn decode(&self) -> Result<(Genome, History), PacketError> {
        let input_count = NonZeroUsize::new(self.input_count)
            .ok_or(PacketError::NonPositiveCount("input_count"))?;
        let output_count = NonZeroUsize::new(self.output_count)
            .ok_or(PacketError::NonPositiveCount("output_count"))?;

        let io_count = input_count.get() + output_count.get();
        if self.node_count < io_count {
            return Err(PacketError::CountMismatch {
                field: "nodes",
                declared: self.node_count,
                decoded: io_count,
            });
        }

        let mut history = History::decode(&self.history)?;
        if history.len() != self.history_count {
            return Err(PacketError::CountMismatch {
                field: "history records",
                declared: self.history_count,
                decoded: history.len(),
            });
        }

        let records = parse_records(&self.genome)?;
        if records.len() != self.gene_count {
            return Err(PacketError::CountMismatch {
                field: "genes",
                declared: self.gene_count,
                decoded: records.len(),
            });
        }

        let mut genome = Genome::bare(input_count, output_count);
        while genome.node_count() < self.node_count {
            genome.add_hidden_node();
        }
        for record in records {
            let innovation = history.acquire(record.input, record.output);
            let mut gene = Gene::new(innovation, record.input, record.output, record.weight);
            gene.set_active(record.active);
            genome.insert_gene(gene);
        }
        genome.set_fitness(self.fitness as f32);

        Ok((genome, history))
    }
}

/// Joins records into the `_`-separated packet text form.
pub(crate) fn encode_records(records: impl Iterator<Item = GeneRecord>) -> String {
    records
        .map(|record| {
            format!(
                "{}_{}_{}_{}",
                record.input,
                record.output,
                record.weight,
                u8::from(record.active),
            )
        })
        .collect::<Vec<_>>()
        .join("_")
}

/// Splits a `_`-separated record string back into records,
/// consuming four tokens per record.
pub(crate) fn parse_records(text: &str) -> Result<Vec<GeneRecord>, PacketError> {
    if text.is_empty() {
        return Ok(vec![]);
    }

    let tokens: Vec<&str> = text.split('_').collect();
    if tokens.len() % 4 != 0 {
        return Err(PacketError::UnevenTokenCount(tokens.len()));
    }

    tokens
        .chunks_exact(4)
        .map(|chunk| {
            let input = parse_number::<usize>(chunk[0])?;
            let output = parse_number::<usize>(chunk[1])?;
            let weight = parse_number::<f32>(chunk[2])?;
            let active = match chunk[3] {
                "0" => false,
                "1" => true,
                other => return Err(PacketError::InvalidStateFlag(other.to_string())),
            };
            Ok(GeneRecord {
                input,
                output,
                weight,
                active,
            })
        })
        .collect()
}

fn parse_number<T: std::str::FromStr>(token: &str) -> Result<T, PacketError> {
    token
        .parse()
        .map_err(|_| PacketError::InvalidNumber(token.to_string()))
}
