use std::fmt;

use serde::{Deserialize, Serialize};

/// A NodeKind indicates the function of the node's
/// network equivalent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Sensor nodes fed by the environment.
    Input,
    /// The bias sensor. Always reads as 1.0.
    InputBias,
    /// Internal nodes created by node mutations.
    Hidden,
    /// Actuator nodes read back by the environment.
    Output,
}

/// Nodes are the neuron slots of a genome between which
/// genes are created. Ids are zero-based and contiguous:
/// inputs occupy `[0, input_count)` with the bias last,
/// outputs `[input_count, input_count + output_count)`, and
/// hidden nodes follow in order of creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    id: usize,
    kind: NodeKind,
    #[serde(skip)]
    value: f32,
}

impl Node {
    /// Generate a new node with the passed parameters.
    /// The transient value starts at 0.
    ///
    /// # Examples
    /// ```
    /// use neat_arena::genomics::{Node, NodeKind};
    ///
    /// let node = Node::new(5, NodeKind::Hidden);
    ///
    /// assert_eq!(node.value(), 0.0);
    /// ```
    pub fn new(id: usize, kind: NodeKind) -> Node {
        Node {
            id,
            kind,
            value: 0.0,
        }
    }

    /// Returns the node's id.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Returns the node's kind.
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Returns the node's transient value. Bias nodes
    /// always read as 1.0.
    pub fn value(&self) -> f32 {
        match self.kind {
            NodeKind::InputBias => 1.0,
            _ => self.value,
        }
    }

    /// Sets the node's transient value. Writes to bias
    /// nodes are ignored.
    ///
    /// # Examples
    /// ```
    /// use neat_arena::genomics::{Node, NodeKind};
    ///
    /// let mut bias = Node::new(2, NodeKind::InputBias);
    /// bias.set_value(-3.0);
    ///
    /// assert_eq!(bias.value(), 1.0);
    /// ```
    pub fn set_value(&mut self, value: f32) {
        if self.kind != NodeKind::InputBias {
            self.value = value;
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}[{:?}, {:.3}]", self.id, self.kind, self.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bias_reads_one_and_ignores_writes() {
        let mut bias = Node::new(0, NodeKind::InputBias);
        assert_eq!(bias.value(), 1.0);

        bias.set_value(0.25);
        assert_eq!(bias.value(), 1.0);
    }

    #[test]
    fn regular_nodes_hold_values() {
        let mut node = Node::new(3, NodeKind::Output);
        node.set_value(0.25);
        assert_eq!(node.value(), 0.25);
    }
}
