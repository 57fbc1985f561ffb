//! Wolf session client
//!
//! Connects a [`Player`] to the arbiter: reconciles incremental game state,
//! runs each callback under a response budget and writes replies back.

pub mod config;
pub mod connector;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod player;
pub mod session;
pub mod state;

pub use config::{load_client_config, ClientConfig};
pub use connector::{Connector, TcpConnector};
pub use dispatch::{
    BodyguardStrategy, RoleDispatch, RoleStrategy, SeerStrategy, Strategy, WerewolfStrategy,
};
pub use error::ClientError;
pub use executor::CallbackExecutor;
pub use player::{Player, UnsupportedForRole};
pub use session::{ConnectionState, SessionClient};
pub use state::{ChannelLog, SessionState};
