//! Agent handles and the registry that interns them.

use crate::error::ProtocolError;
use parking_lot::RwLock;
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

/// Wire field name of the structured agent representation.
pub const AGENT_IDX_FIELD: &str = "agentIdx";

/// A participant in the game, identified by its index.
///
/// Two handles with the same index are the same value and order by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Agent {
    idx: u32,
}

impl Agent {
    /// Index assigned by the arbiter.
    pub fn index(self) -> u32 {
        self.idx
    }
}

impl TryFrom<i64> for Agent {
    type Error = ProtocolError;

    fn try_from(index: i64) -> Result<Self, Self::Error> {
        u32::try_from(index)
            .map(|idx| Agent { idx })
            .map_err(|_| ProtocolError::InvalidAgentIndex(index))
    }
}

impl From<u32> for Agent {
    fn from(idx: u32) -> Self {
        Agent { idx }
    }
}

impl fmt::Display for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Agent[{:02}]", self.idx)
    }
}

impl Serialize for Agent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.idx)
    }
}

impl<'de> Deserialize<'de> for Agent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(AgentVisitor)
    }
}

/// Accepts a bare index, a numeric map key, or `{"agentIdx": N}`.
struct AgentVisitor;

impl<'de> Visitor<'de> for AgentVisitor {
    type Value = Agent;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an agent index or an object with an agentIdx field")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Agent, E> {
        Agent::try_from(v).map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Agent, E> {
        u32::try_from(v)
            .map(Agent::from)
            .map_err(|_| E::custom(format!("agent index out of range: {}", v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Agent, E> {
        let index: i64 = v
            .trim()
            .parse()
            .map_err(|_| E::custom(format!("invalid agent key: {:?}", v)))?;
        self.visit_i64(index)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Agent, A::Error> {
        let mut agent = None;
        while let Some(key) = map.next_key::<String>()? {
            if key == AGENT_IDX_FIELD {
                agent = Some(map.next_value::<Agent>()?);
            } else {
                map.next_value::<de::IgnoredAny>()?;
            }
        }
        agent.ok_or_else(|| de::Error::missing_field(AGENT_IDX_FIELD))
    }
}

/// Interns agent indices into shared handles.
///
/// Grows monotonically; there is no removal besides [`AgentRegistry::clear`],
/// which exists to tear down state between games in tests.
#[derive(Debug, Default)]
pub struct AgentRegistry {
    agents: RwLock<BTreeMap<u32, Agent>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry for callers that do not thread their own.
    pub fn global() -> &'static AgentRegistry {
        static GLOBAL: OnceLock<AgentRegistry> = OnceLock::new();
        GLOBAL.get_or_init(AgentRegistry::new)
    }

    /// Return the handle for `index`, creating it on first use.
    ///
    /// # Errors
    /// Returns `InvalidAgentIndex` for negative or out-of-range indices.
    pub fn get_or_create(&self, index: i64) -> Result<Agent, ProtocolError> {
        let agent = Agent::try_from(index)?;

        if let Some(existing) = self.agents.read().get(&agent.idx) {
            return Ok(*existing);
        }

        // A lost race only drops a duplicate of the same value.
        let mut agents = self.agents.write();
        Ok(*agents.entry(agent.idx).or_insert(agent))
    }

    /// Record an already-decoded handle.
    pub fn intern(&self, agent: Agent) -> Agent {
        *self.agents.write().entry(agent.idx).or_insert(agent)
    }

    pub fn get(&self, index: u32) -> Option<Agent> {
        self.agents.read().get(&index).copied()
    }

    /// All known agents in index order.
    pub fn agents(&self) -> Vec<Agent> {
        self.agents.read().values().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.agents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.read().is_empty()
    }

    pub fn clear(&self) {
        self.agents.write().clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_get_or_create_is_idempotent() {
        let registry = AgentRegistry::new();
        let first = registry.get_or_create(3).unwrap();
        let second = registry.get_or_create(3).unwrap();
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_agents_order_by_index() {
        let registry = AgentRegistry::new();
        let three = registry.get_or_create(3).unwrap();
        let four = registry.get_or_create(4).unwrap();
        assert_ne!(three, four);
        assert!(three < four);
        assert_eq!(registry.agents(), vec![three, four]);
    }

    #[test]
    fn test_negative_index_rejected() {
        let registry = AgentRegistry::new();
        let result = registry.get_or_create(-1);
        assert_eq!(result, Err(ProtocolError::InvalidAgentIndex(-1)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_out_of_range_index_rejected() {
        let registry = AgentRegistry::new();
        let too_big = i64::from(u32::MAX) + 1;
        assert!(matches!(
            registry.get_or_create(too_big),
            Err(ProtocolError::InvalidAgentIndex(_))
        ));
    }

    #[test]
    fn test_display_is_zero_padded() {
        assert_eq!(Agent::from(3).to_string(), "Agent[03]");
        assert_eq!(Agent::from(12).to_string(), "Agent[12]");
    }

    #[test]
    fn test_serializes_as_bare_index() {
        let json = serde_json::to_string(&Agent::from(7)).unwrap();
        assert_eq!(json, "7");
    }

    #[test]
    fn test_deserializes_both_representations() {
        let bare: Agent = serde_json::from_str("5").unwrap();
        let object: Agent = serde_json::from_str(r#"{"agentIdx": 5}"#).unwrap();
        assert_eq!(bare, object);
        assert_eq!(bare.index(), 5);
    }

    #[test]
    fn test_deserialize_rejects_negative() {
        let result: Result<Agent, _> = serde_json::from_str("-2");
        assert!(result.is_err());
        let result: Result<Agent, _> = serde_json::from_str(r#"{"idx": 2}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_concurrent_inserts_converge() {
        let registry = Arc::new(AgentRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    (1..=15)
                        .map(|i| registry.get_or_create(i).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let results: Vec<Vec<Agent>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(registry.len(), 15);
        for result in &results[1..] {
            assert_eq!(result, &results[0]);
        }
    }
}
