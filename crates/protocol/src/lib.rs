//! Wolf protocol core
//!
//! Agent interning, the utterance grammar, and the wire codec spoken between
//! a werewolf-game agent and the arbiter.

pub mod agent;
pub mod codec;
pub mod content;
pub mod error;
pub mod types;
pub mod wire;

pub use agent::{Agent, AgentRegistry};
pub use codec::{decode, encode, AgentEncoding, WireCodec};
pub use content::{parse_agent_token, Content, UtteranceRef};
pub use error::ProtocolError;
pub use types::{Operator, Request, Role, Species, Status, TalkType, Team, Topic};
pub use wire::{GameInfo, GameSetting, Judge, Packet, Reply, Talk, Vote};
