//! Replays recorded interactions from a cassette.

use std::collections::{HashMap, VecDeque};

use super::format::{Cassette, Interaction};

/// Key for indexing interactions by port and method.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
struct PortMethodKey {
    port: String,
    method: String,
}

impl PortMethodKey {
    fn new(port: &str, method: &str) -> Self {
        Self { port: port.to_string(), method: method.to_string() }
    }
}

/// Serves interactions from a loaded cassette, in order, per port/method pair.
#[derive(Debug)]
pub struct CassetteReplayer {
    queues: HashMap<PortMethodKey, VecDeque<Interaction>>,
}

impl CassetteReplayer {
    /// Create a new replayer from a loaded cassette.
    #[must_use]
    pub fn new(cassette: &Cassette) -> Self {
        let mut queues: HashMap<PortMethodKey, VecDeque<Interaction>> = HashMap::new();
        for interaction in &cassette.interactions {
            queues
                .entry(PortMethodKey::new(&interaction.port, &interaction.method))
                .or_default()
                .push_back(interaction.clone());
        }
        Self { queues }
    }

    /// Takes the next interaction for the given port and method.
    ///
    /// Returns `None` once every recorded interaction for the pair has been
    /// served, or if none was recorded at all.
    pub fn next_interaction(&mut self, port: &str, method: &str) -> Option<Interaction> {
        self.queues.get_mut(&PortMethodKey::new(port, method))?.pop_front()
    }

    /// The interaction [`next_interaction`](Self::next_interaction) would return.
    #[must_use]
    pub fn peek(&self, port: &str, method: &str) -> Option<&Interaction> {
        self.queues.get(&PortMethodKey::new(port, method))?.front()
    }

    /// Interactions left for the given port and method.
    #[must_use]
    pub fn remaining(&self, port: &str, method: &str) -> usize {
        self.queues.get(&PortMethodKey::new(port, method)).map_or(0, VecDeque::len)
    }
}
