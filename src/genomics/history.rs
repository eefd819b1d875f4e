use crate::genomics::errors::PacketError;
use crate::genomics::packet::{encode_records, parse_records, GeneRecord};
use crate::Innovation;

use std::collections::hash_map::{Entry, HashMap};
use std::num::NonZeroUsize;

use ahash::RandomState;

/// A `History` is the innovation registry shared by every
/// genome of an evolutionary run. It assigns one innovation
/// number per directed `(input, output)` connection, the first
/// time that connection appears anywhere in the run, so that
/// arbitrary genomes can later be aligned gene-by-gene.
///
/// The registry is primed with the full input to output block:
/// connecting every input (bias included) to every output claims
/// innovations `0..inputs * outputs`, input-major.
///
/// One `History` per run. It is passed explicitly to every
/// operation that may discover new connections; nothing in this
/// crate reaches for it through ambient state.
#[derive(Clone, Debug, PartialEq)]
pub struct History {
    next: Innovation,
    pairs: HashMap<(usize, usize), Innovation, RandomState>,
    endpoints: Vec<(usize, usize)>,
}

impl History {
    /// Creates a registry primed for genomes with the given
    /// perceptron counts.
    ///
    /// # Examples
    /// ```
    /// use neat_arena::genomics::History;
    /// use std::num::NonZeroUsize;
    ///
    /// let inputs = NonZeroUsize::new(3).unwrap();
    /// let outputs = NonZeroUsize::new(2).unwrap();
    /// let history = History::new(inputs, outputs);
    ///
    /// // The initial wiring block is pre-assigned.
    /// assert_eq!(history.len(), 6);
    /// assert_eq!(history.endpoints(0), Some((0, 3)));
    /// assert_eq!(history.endpoints(5), Some((2, 4)));
    /// ```
    pub fn new(input_count: NonZeroUsize, output_count: NonZeroUsize) -> History {
        let inputs = input_count.get();
        let outputs = output_count.get();

        let mut history = History {
            next: 0,
            pairs: HashMap::default(),
            endpoints: Vec::with_capacity(inputs * outputs),
        };
        for i in 0..inputs {
            for o in 0..outputs {
                history.acquire(i, inputs + o);
            }
        }
        history
    }

    /// Returns the innovation number of the `(input, output)`
    /// connection, allocating the next free number if the pair
    /// has never been seen before.
    ///
    /// The call is idempotent and allocation is monotonic in
    /// call order.
    ///
    /// # Examples
    /// ```
    /// use neat_arena::genomics::History;
    /// use std::num::NonZeroUsize;
    ///
    /// let one = NonZeroUsize::new(1).unwrap();
    /// let mut history = History::new(one, one);
    ///
    /// let innovation = history.acquire(1, 2);
    /// assert_eq!(innovation, history.acquire(1, 2));
    /// assert_eq!(history.acquire(2, 1), innovation + 1);
    /// ```
    pub fn acquire(&mut self, input: usize, output: usize) -> Innovation {
        match self.pairs.entry((input, output)) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                let innovation = self.next;
                entry.insert(innovation);
                self.endpoints.push((input, output));
                self.next += 1;
                innovation
            }
        }
    }

    /// Returns the innovation number already assigned to the
    /// pair, if any, without allocating.
    pub fn get(&self, input: usize, output: usize) -> Option<Innovation> {
        self.pairs.get(&(input, output)).copied()
    }

    /// Returns the number of innovations assigned so far.
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Returns `true` if no innovation has been assigned.
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Returns the endpoints of an assigned innovation.
    pub fn endpoints(&self, innovation: Innovation) -> Option<(usize, usize)> {
        self.endpoints.get(innovation).copied()
    }

    /// Returns an iterator over all records, in innovation order,
    /// in the format `(innovation, (input, output))`.
    pub fn records(&self) -> impl Iterator<Item = (Innovation, (usize, usize))> + '_ {
        self.endpoints.iter().copied().enumerate()
    }

    /// Serializes the full innovation list to its packet text
    /// form. Records use the common four-token gene shape, with
    /// placeholder weight and state.
    pub fn encode(&self) -> String {
        encode_records(
            self.endpoints
                .iter()
                .map(|&(input, output)| GeneRecord {
                    input,
                    output,
                    weight: 1.0,
                    active: true,
                }),
        )
    }

    /// Rebuilds a registry from its packet text form. Innovation
    /// numbers are reassigned by position, which reproduces the
    /// original numbering.
    ///
    /// # Errors
    /// Fails if the text is not a well-formed record string.
    pub fn decode(text: &str) -> Result<History, PacketError> {
        let mut history = History {
            next: 0,
            pairs: HashMap::default(),
            endpoints: Vec::new(),
        };
        for record in parse_records(text)? {
            history.acquire(record.input, record.output);
        }
        Ok(history)
    }
}
