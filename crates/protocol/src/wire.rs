//! Wire types exchanged with the arbiter.

use crate::agent::Agent;
use crate::content::Content;
use crate::error::ProtocolError;
use crate::types::{Request, Role, Species, Status, TalkType, Topic};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Treat an explicit `null` like an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One recorded talk or whisper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Talk {
    pub idx: u32,
    pub day: u32,
    #[serde(default)]
    pub turn: u32,
    pub agent: Agent,
    #[serde(rename = "content", alias = "text")]
    pub text: String,
}

impl Talk {
    pub fn new(idx: u32, day: u32, agent: Agent, text: impl Into<String>) -> Self {
        Self {
            idx,
            day,
            turn: 0,
            agent,
            text: text.into(),
        }
    }

    /// Ordering key: day first, then index within the day.
    pub fn key(&self) -> (u32, u32) {
        (self.day, self.idx)
    }

    /// Parse the spoken text.
    ///
    /// # Errors
    /// Returns `MalformedUtterance` when the text is not a grammar statement.
    pub fn content(&self) -> Result<Content, ProtocolError> {
        Content::parse(&self.text)
    }

    pub fn is_skip(&self) -> bool {
        matches!(self.content(), Ok(c) if c.topic() == Topic::Skip)
    }

    pub fn is_over(&self) -> bool {
        matches!(self.content(), Ok(c) if c.topic() == Topic::Over)
    }
}

/// A divination or inquest result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Judge {
    pub day: u32,
    pub agent: Agent,
    pub target: Agent,
    pub result: Species,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub day: u32,
    pub agent: Agent,
    pub target: Agent,
}

/// Per-day game state as seen by one participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInfo {
    pub agent: Agent,
    #[serde(default, deserialize_with = "null_as_default")]
    pub attack_vote_list: Vec<Vote>,
    #[serde(default)]
    pub attacked_agent: Option<Agent>,
    pub day: u32,
    #[serde(default)]
    pub divine_result: Option<Judge>,
    #[serde(default)]
    pub executed_agent: Option<Agent>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub existing_role_list: Vec<Role>,
    #[serde(default)]
    pub guarded_agent: Option<Agent>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub last_dead_agent_list: Vec<Agent>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub latest_attack_vote_list: Vec<Vote>,
    #[serde(default)]
    pub latest_executed_agent: Option<Agent>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub latest_vote_list: Vec<Vote>,
    #[serde(default)]
    pub medium_result: Option<Judge>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub remain_talk_map: BTreeMap<Agent, u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub remain_whisper_map: BTreeMap<Agent, u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub role_map: BTreeMap<Agent, Role>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status_map: BTreeMap<Agent, Status>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub talk_list: Vec<Talk>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub vote_list: Vec<Vote>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub whisper_list: Vec<Talk>,
}

impl GameInfo {
    /// Empty snapshot for `agent` on `day`.
    pub fn new(day: u32, agent: Agent) -> Self {
        Self {
            agent,
            attack_vote_list: Vec::new(),
            attacked_agent: None,
            day,
            divine_result: None,
            executed_agent: None,
            existing_role_list: Vec::new(),
            guarded_agent: None,
            last_dead_agent_list: Vec::new(),
            latest_attack_vote_list: Vec::new(),
            latest_executed_agent: None,
            latest_vote_list: Vec::new(),
            medium_result: None,
            remain_talk_map: BTreeMap::new(),
            remain_whisper_map: BTreeMap::new(),
            role_map: BTreeMap::new(),
            status_map: BTreeMap::new(),
            talk_list: Vec::new(),
            vote_list: Vec::new(),
            whisper_list: Vec::new(),
        }
    }

    /// Role of the receiving agent, when the arbiter disclosed it.
    pub fn role(&self) -> Option<Role> {
        self.role_map.get(&self.agent).copied()
    }

    /// Agents marked alive. Empty, never absent, when everyone is dead.
    pub fn alive_agents(&self) -> Vec<Agent> {
        self.status_map
            .iter()
            .filter(|(_, status)| **status == Status::Alive)
            .map(|(agent, _)| *agent)
            .collect()
    }

    pub fn agents(&self) -> Vec<Agent> {
        self.status_map.keys().copied().collect()
    }

    pub fn is_alive(&self, agent: Agent) -> bool {
        self.status_map.get(&agent) == Some(&Status::Alive)
    }

    pub fn history(&self, talk_type: TalkType) -> &[Talk] {
        match talk_type {
            TalkType::Talk => &self.talk_list,
            TalkType::Whisper => &self.whisper_list,
        }
    }

    pub fn history_mut(&mut self, talk_type: TalkType) -> &mut Vec<Talk> {
        match talk_type {
            TalkType::Talk => &mut self.talk_list,
            TalkType::Whisper => &mut self.whisper_list,
        }
    }
}

/// Rules of the current game, sent once with INITIALIZE.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameSetting {
    pub player_num: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub role_num_map: BTreeMap<Role, u32>,
    pub max_talk: u32,
    pub max_talk_turn: u32,
    pub max_whisper: u32,
    pub max_whisper_turn: u32,
    pub max_skip: u32,
    pub max_revote: u32,
    pub max_attack_revote: u32,
    pub enable_no_attack: bool,
    pub enable_no_execution: bool,
    pub enable_role_request: bool,
    pub talk_on_first_day: bool,
    pub validate_utterance: bool,
    pub vote_visible: bool,
    pub whisper_before_revote: bool,
    pub time_limit: i64,
    pub random_seed: i64,
}

impl Default for GameSetting {
    fn default() -> Self {
        Self {
            player_num: 5,
            role_num_map: BTreeMap::new(),
            max_talk: 10,
            max_talk_turn: 20,
            max_whisper: 10,
            max_whisper_turn: 20,
            max_skip: 2,
            max_revote: 1,
            max_attack_revote: 1,
            enable_no_attack: false,
            enable_no_execution: false,
            enable_role_request: true,
            talk_on_first_day: false,
            validate_utterance: true,
            vote_visible: true,
            whisper_before_revote: false,
            time_limit: -1,
            random_seed: 0,
        }
    }
}

/// One line from the arbiter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Packet {
    pub request: Request,
    #[serde(default)]
    pub game_info: Option<GameInfo>,
    #[serde(default)]
    pub game_setting: Option<GameSetting>,
    #[serde(default)]
    pub talk_history: Option<Vec<Talk>>,
    #[serde(default)]
    pub whisper_history: Option<Vec<Talk>>,
}

impl Packet {
    pub fn new(request: Request) -> Self {
        Self {
            request,
            game_info: None,
            game_setting: None,
            talk_history: None,
            whisper_history: None,
        }
    }

    pub fn with_game_info(mut self, game_info: GameInfo) -> Self {
        self.game_info = Some(game_info);
        self
    }

    pub fn with_game_setting(mut self, game_setting: GameSetting) -> Self {
        self.game_setting = Some(game_setting);
        self
    }

    pub fn with_talk_history(mut self, talks: Vec<Talk>) -> Self {
        self.talk_history = Some(talks);
        self
    }

    pub fn with_whisper_history(mut self, whispers: Vec<Talk>) -> Self {
        self.whisper_history = Some(whispers);
        self
    }

    pub fn history(&self, talk_type: TalkType) -> Option<&[Talk]> {
        match talk_type {
            TalkType::Talk => self.talk_history.as_deref(),
            TalkType::Whisper => self.whisper_history.as_deref(),
        }
    }
}

/// Value a player returns for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// No value; written as an empty line.
    None,
    Text(String),
    /// An absent agent is written as an empty line as well.
    Agent(Option<Agent>),
}
