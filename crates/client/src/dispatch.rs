//! Role-keyed strategy dispatch behind the flat player interface.

use crate::player::{Player, UnsupportedForRole};
use tracing::info;
use wolf_protocol::{Agent, GameInfo, GameSetting, Request, Role};

/// Behavior shared by every role.
pub trait Strategy: Send {
    fn update(&mut self, game_info: &GameInfo);
    fn initialize(&mut self, game_info: &GameInfo, game_setting: &GameSetting);
    fn day_start(&mut self) {}
    fn talk(&mut self) -> Option<String>;
    fn vote(&mut self) -> Agent;
    fn finish(&mut self) {}
}

pub trait SeerStrategy: Strategy {
    fn divine(&mut self) -> Agent;
}

pub trait BodyguardStrategy: Strategy {
    fn guard(&mut self) -> Option<Agent>;
}

pub trait WerewolfStrategy: Strategy {
    fn whisper(&mut self) -> Option<String>;
    fn attack(&mut self) -> Option<Agent>;
}

/// One strategy per playable role.
pub enum RoleStrategy {
    Villager(Box<dyn Strategy>),
    Seer(Box<dyn SeerStrategy>),
    Medium(Box<dyn Strategy>),
    Bodyguard(Box<dyn BodyguardStrategy>),
    Possessed(Box<dyn Strategy>),
    Werewolf(Box<dyn WerewolfStrategy>),
}

macro_rules! on_strategy {
    ($value:expr, $strategy:ident => $body:expr) => {
        match $value {
            RoleStrategy::Villager($strategy) => $body,
            RoleStrategy::Seer($strategy) => $body,
            RoleStrategy::Medium($strategy) => $body,
            RoleStrategy::Bodyguard($strategy) => $body,
            RoleStrategy::Possessed($strategy) => $body,
            RoleStrategy::Werewolf($strategy) => $body,
        }
    };
}

impl RoleStrategy {
    pub fn role(&self) -> Role {
        match self {
            RoleStrategy::Villager(_) => Role::Villager,
            RoleStrategy::Seer(_) => Role::Seer,
            RoleStrategy::Medium(_) => Role::Medium,
            RoleStrategy::Bodyguard(_) => Role::Bodyguard,
            RoleStrategy::Possessed(_) => Role::Possessed,
            RoleStrategy::Werewolf(_) => Role::Werewolf,
        }
    }
}

impl std::fmt::Debug for RoleStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RoleStrategy({})", self.role())
    }
}

/// Player that picks its strategy from the role disclosed at INITIALIZE.
///
/// The factory must return a strategy for every role. Until a role is
/// disclosed the player acts as a villager.
pub struct RoleDispatch<F> {
    name: String,
    factory: F,
    role: Option<Role>,
    strategy: RoleStrategy,
}

impl<F> RoleDispatch<F>
where
    F: Fn(Role) -> RoleStrategy + Send + 'static,
{
    pub fn new(name: impl Into<String>, factory: F) -> Self {
        let strategy = factory(Role::Villager);
        Self {
            name: name.into(),
            factory,
            role: None,
            strategy,
        }
    }

    /// Role disclosed by the arbiter, if any.
    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn strategy(&self) -> &RoleStrategy {
        &self.strategy
    }
}

impl<F> Player for RoleDispatch<F>
where
    F: Fn(Role) -> RoleStrategy + Send + 'static,
{
    fn name(&self) -> String {
        self.name.clone()
    }

    fn update(&mut self, game_info: &GameInfo) {
        on_strategy!(&mut self.strategy, s => s.update(game_info))
    }

    fn initialize(&mut self, game_info: &GameInfo, game_setting: &GameSetting) {
        self.role = game_info.role();
        self.strategy = (self.factory)(self.role.unwrap_or(Role::Villager));
        info!(
            "Agent {} plays {} with {:?}",
            game_info.agent,
            self.role.map_or_else(|| "an undisclosed role".to_string(), |r| r.to_string()),
            self.strategy
        );
        on_strategy!(&mut self.strategy, s => s.initialize(game_info, game_setting))
    }

    fn day_start(&mut self) {
        on_strategy!(&mut self.strategy, s => s.day_start())
    }

    fn talk(&mut self) -> Option<String> {
        on_strategy!(&mut self.strategy, s => s.talk())
    }

    fn whisper(&mut self) -> Result<Option<String>, UnsupportedForRole> {
        let role = self.role;
        match &mut self.strategy {
            RoleStrategy::Werewolf(s) => Ok(s.whisper()),
            _ => Err(UnsupportedForRole::new(Request::Whisper, role)),
        }
    }

    fn vote(&mut self) -> Agent {
        on_strategy!(&mut self.strategy, s => s.vote())
    }

    fn attack(&mut self) -> Result<Option<Agent>, UnsupportedForRole> {
        let role = self.role;
        match &mut self.strategy {
            RoleStrategy::Werewolf(s) => Ok(s.attack()),
            _ => Err(UnsupportedForRole::new(Request::Attack, role)),
        }
    }

    fn divine(&mut self) -> Result<Agent, UnsupportedForRole> {
        let role = self.role;
        match &mut self.strategy {
            RoleStrategy::Seer(s) => Ok(s.divine()),
            _ => Err(UnsupportedForRole::new(Request::Divine, role)),
        }
    }

    fn guard(&mut self) -> Result<Option<Agent>, UnsupportedForRole> {
        let role = self.role;
        match &mut self.strategy {
            RoleStrategy::Bodyguard(s) => Ok(s.guard()),
            _ => Err(UnsupportedForRole::new(Request::Guard, role)),
        }
    }

    fn finish(&mut self) {
        on_strategy!(&mut self.strategy, s => s.finish())
    }
}
