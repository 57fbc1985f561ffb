//! Player callback interface driven by the session client.

use thiserror::Error;
use wolf_protocol::{Agent, GameInfo, GameSetting, Request, Role};

/// A role-restricted action was requested from a player that cannot perform it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{action} is unsupported for role {}", describe_role(.role))]
pub struct UnsupportedForRole {
    pub action: Request,
    pub role: Option<Role>,
}

impl UnsupportedForRole {
    pub fn new(action: Request, role: Option<Role>) -> Self {
        Self { action, role }
    }
}

fn describe_role(role: &Option<Role>) -> String {
    role.map_or_else(|| "undisclosed".to_string(), |role| role.to_string())
}

/// Callbacks a game agent implements.
///
/// Every callback runs on a blocking worker with exclusive access to the
/// player. Values are returned as typed data; the session client owns
/// encoding them onto the wire.
pub trait Player: Send + 'static {
    fn name(&self) -> String;

    /// Receive the latest reconciled snapshot.
    fn update(&mut self, game_info: &GameInfo);

    /// Start of a game. Per-game state from a previous game must be dropped here.
    fn initialize(&mut self, game_info: &GameInfo, game_setting: &GameSetting);

    fn day_start(&mut self) {}

    /// Next talk utterance. `None` is sent as `Skip`.
    fn talk(&mut self) -> Option<String>;

    /// Next whisper utterance. `None` is sent as `Skip`.
    fn whisper(&mut self) -> Result<Option<String>, UnsupportedForRole> {
        Err(UnsupportedForRole::new(Request::Whisper, None))
    }

    fn vote(&mut self) -> Agent;

    fn attack(&mut self) -> Result<Option<Agent>, UnsupportedForRole> {
        Err(UnsupportedForRole::new(Request::Attack, None))
    }

    fn divine(&mut self) -> Result<Agent, UnsupportedForRole> {
        Err(UnsupportedForRole::new(Request::Divine, None))
    }

    fn guard(&mut self) -> Result<Option<Agent>, UnsupportedForRole> {
        Err(UnsupportedForRole::new(Request::Guard, None))
    }

    fn finish(&mut self) {}
}
