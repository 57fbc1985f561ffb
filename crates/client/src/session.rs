//! Session client: the read, reconcile, dispatch and reply loop.

use crate::config::ClientConfig;
use crate::connector::Connector;
use crate::error::ClientError;
use crate::executor::CallbackExecutor;
use crate::metrics::{increment_packets_processed, increment_schema_fallbacks};
use crate::player::{Player, UnsupportedForRole};
use crate::state::SessionState;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, warn};
use wolf_protocol::{AgentRegistry, Content, GameInfo, Packet, Reply, Request, WireCodec};

/// Connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Running,
    Finished,
}

/// Drives one player over one arbiter connection.
///
/// Requests are handled strictly one at a time. The session state is
/// private to this client and is never shared across connections.
pub struct SessionClient<P: Player> {
    config: ClientConfig,
    codec: WireCodec,
    executor: CallbackExecutor,
    registry: Arc<AgentRegistry>,
    player: Arc<Mutex<P>>,
    state: SessionState,
    connection: ConnectionState,
    game_over: bool,
}

impl<P: Player> SessionClient<P> {
    pub fn new(config: ClientConfig, player: P, registry: Arc<AgentRegistry>) -> Self {
        let codec = WireCodec::new(config.agent_encoding);
        let executor = CallbackExecutor::new(config.response_timeout(), config.strict_mode);
        Self {
            config,
            codec,
            executor,
            registry,
            player: Arc::new(Mutex::new(player)),
            state: SessionState::new(),
            connection: ConnectionState::Disconnected,
            game_over: false,
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection
    }

    pub fn session(&self) -> &SessionState {
        &self.state
    }

    pub fn player(&self) -> Arc<Mutex<P>> {
        Arc::clone(&self.player)
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    /// Connect to the configured arbiter and serve until the stream closes.
    ///
    /// # Errors
    /// `ConnectionLost` when the connection fails or closes before FINISH,
    /// plus any fatal error from [`SessionClient::run`].
    pub async fn connect<C: Connector>(&mut self, connector: &C) -> Result<(), ClientError> {
        self.connection = ConnectionState::Connecting;
        info!(
            "Connecting to arbiter at {}:{}",
            self.config.host, self.config.port
        );

        let (reader, writer) = match connector.connect(&self.config.host, self.config.port).await {
            Ok(halves) => halves,
            Err(e) => {
                self.connection = ConnectionState::Disconnected;
                return Err(e);
            }
        };
        self.run(reader, writer).await
    }

    /// Serve an already open connection.
    ///
    /// Ends `Finished` when the stream closes after FINISH, and
    /// `Disconnected` on any error.
    ///
    /// # Errors
    /// `ConnectionLost` on I/O failure or an early close; `Protocol` for an
    /// undecodable line that cannot be recovered (or any schema error in
    /// strict mode); `ResponseTimeout` in strict mode; `PlayerPanicked`.
    pub async fn run<R, W>(&mut self, reader: R, writer: W) -> Result<(), ClientError>
    where
        R: AsyncBufRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
    {
        self.connection = ConnectionState::Running;
        let result = self.serve(reader, writer).await;
        self.connection = match &result {
            Ok(()) => ConnectionState::Finished,
            Err(e) => {
                error!("Session ended with error: {}", e);
                ConnectionState::Disconnected
            }
        };
        result
    }

    async fn serve<R, W>(&mut self, reader: R, mut writer: W) -> Result<(), ClientError>
    where
        R: AsyncBufRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
    {
        let mut lines = reader.lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => return Err(ClientError::ConnectionLost(e.to_string())),
            };
            if line.trim().is_empty() {
                continue;
            }

            let packet = self.decode(&line)?;
            if let Some(reply) = self.handle_packet(packet).await? {
                let mut out = self.codec.encode_reply(&reply)?;
                debug!("Replying: {:?}", out);
                out.push('\n');
                writer
                    .write_all(out.as_bytes())
                    .await
                    .map_err(|e| ClientError::ConnectionLost(e.to_string()))?;
                writer
                    .flush()
                    .await
                    .map_err(|e| ClientError::ConnectionLost(e.to_string()))?;
            }
        }

        if self.game_over {
            info!("Arbiter closed the connection after FINISH");
            Ok(())
        } else {
            Err(ClientError::ConnectionLost(
                "stream closed before FINISH".to_string(),
            ))
        }
    }

    fn decode(&self, line: &str) -> Result<Packet, ClientError> {
        let err = match self.codec.decode_packet(line) {
            Ok(packet) => return Ok(packet),
            Err(err) => err,
        };
        if self.config.strict_mode {
            error!("Undecodable packet in strict mode: {} ({})", err, line);
            return Err(err.into());
        }
        match self.codec.recover_request(line) {
            Some(request) => {
                warn!(
                    "Substituting request-only {} packet, reusing last snapshot: {}",
                    request, err
                );
                increment_schema_fallbacks();
                Ok(Packet::new(request))
            }
            None => {
                error!("Unrecoverable packet: {} ({})", err, line);
                Err(err.into())
            }
        }
    }

    /// Reconcile one packet and run its callback.
    ///
    /// Returns the reply to send, or `None` for notification requests.
    ///
    /// # Errors
    /// `UnexpectedRequest` for INITIALIZE without a snapshot, and any
    /// executor error.
    pub async fn handle_packet(&mut self, packet: Packet) -> Result<Option<Reply>, ClientError> {
        let request = packet.request;
        increment_packets_processed(request);
        debug!("Handling {} request", request);

        if let Some(game_info) = &packet.game_info {
            for agent in game_info.agents() {
                self.registry.intern(agent);
            }
        }
        if request == Request::Initialize {
            // A new game restarts day and index numbering.
            self.state.reset();
        }
        self.state.reconcile(&packet);
        let snapshot = self.state.game_info().cloned();

        let reply = match request {
            Request::Initialize => {
                let game_info = snapshot.ok_or_else(|| {
                    ClientError::UnexpectedRequest("INITIALIZE without gameInfo".to_string())
                })?;
                let game_setting = self.state.game_setting().cloned().unwrap_or_default();
                info!(
                    "Game initialized for agent {} on day {}",
                    game_info.agent, game_info.day
                );
                self.game_over = false;
                self.executor
                    .notify(&self.player, request, move |p| {
                        p.initialize(&game_info, &game_setting)
                    })
                    .await?;
                None
            }
            Request::DailyInitialize => {
                if let Some(info) = &snapshot {
                    info!("Day {} started", info.day);
                }
                self.executor
                    .notify(&self.player, request, updated(snapshot, |p: &mut P| p.day_start()))
                    .await?;
                None
            }
            Request::DailyFinish => {
                self.executor
                    .notify(&self.player, request, updated(snapshot, |_: &mut P| ()))
                    .await?;
                None
            }
            Request::Name => {
                let name = match &self.config.name {
                    Some(name) => name.clone(),
                    None => self.executor.run(&self.player, request, |p| p.name()).await?,
                };
                Some(Reply::Text(name))
            }
            Request::Role => {
                let role = self
                    .config
                    .role
                    .map_or_else(|| "none".to_string(), |role| role.to_string());
                Some(Reply::Text(role))
            }
            Request::Talk => {
                let text = self
                    .executor
                    .run(&self.player, request, updated(snapshot, |p: &mut P| p.talk()))
                    .await?;
                Some(Reply::Text(text.unwrap_or_else(skip)))
            }
            Request::Whisper => {
                let text = self
                    .executor
                    .run(&self.player, request, updated(snapshot, |p: &mut P| p.whisper()))
                    .await?;
                Some(Reply::Text(
                    substitute(text, None).unwrap_or_else(skip),
                ))
            }
            Request::Vote => {
                let target = self
                    .executor
                    .run(&self.player, request, updated(snapshot, |p: &mut P| p.vote()))
                    .await?;
                Some(Reply::Agent(Some(target)))
            }
            Request::Attack => {
                let target = self
                    .executor
                    .run(&self.player, request, updated(snapshot, |p: &mut P| p.attack()))
                    .await?;
                Some(Reply::Agent(substitute(target, None)))
            }
            Request::Divine => {
                let target = self
                    .executor
                    .run(&self.player, request, updated(snapshot, |p: &mut P| p.divine()))
                    .await?;
                Some(Reply::Agent(substitute(target.map(Some), None)))
            }
            Request::Guard => {
                let target = self
                    .executor
                    .run(&self.player, request, updated(snapshot, |p: &mut P| p.guard()))
                    .await?;
                Some(Reply::Agent(substitute(target, None)))
            }
            Request::Finish => {
                self.executor
                    .notify(&self.player, request, updated(snapshot, |p: &mut P| p.finish()))
                    .await?;
                self.state.reset();
                self.game_over = true;
                info!("Game finished");
                None
            }
        };
        Ok(reply)
    }
}

/// Wrap a callback so the player sees the latest snapshot first.
fn updated<P, T, F>(
    snapshot: Option<GameInfo>,
    callback: F,
) -> impl FnOnce(&mut P) -> T + Send + 'static
where
    P: Player,
    T: 'static,
    F: FnOnce(&mut P) -> T + Send + 'static,
{
    move |player: &mut P| {
        if let Some(game_info) = &snapshot {
            player.update(game_info);
        }
        callback(player)
    }
}

/// Replace an unsupported action with a conservative value.
fn substitute<T>(result: Result<T, UnsupportedForRole>, fallback: T) -> T {
    result.unwrap_or_else(|e| {
        error!("Player cannot answer: {}, sending conservative reply", e);
        fallback
    })
}

fn skip() -> String {
    Content::skip().text()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use wolf_protocol::{Agent, GameSetting, Role, Status, Talk};

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
        last_day: Option<u32>,
        talks_seen: usize,
    }

    impl Player for Recorder {
        fn name(&self) -> String {
            "recorder".to_string()
        }

        fn update(&mut self, game_info: &GameInfo) {
            self.calls.push("update".to_string());
            self.last_day = Some(game_info.day);
            self.talks_seen = game_info.talk_list.len();
        }

        fn initialize(&mut self, _game_info: &GameInfo, _game_setting: &GameSetting) {
            self.calls.push("initialize".to_string());
        }

        fn day_start(&mut self) {
            self.calls.push("day_start".to_string());
        }

        fn talk(&mut self) -> Option<String> {
            self.calls.push("talk".to_string());
            None
        }

        fn vote(&mut self) -> Agent {
            self.calls.push("vote".to_string());
            Agent::from(3)
        }

        fn finish(&mut self) {
            self.calls.push("finish".to_string());
        }
    }

    fn client(config: ClientConfig) -> SessionClient<Recorder> {
        SessionClient::new(config, Recorder::default(), Arc::new(AgentRegistry::new()))
    }

    fn game_info(day: u32) -> GameInfo {
        let mut info = GameInfo::new(day, Agent::from(1));
        for idx in 1..=5 {
            info.status_map.insert(Agent::from(idx), Status::Alive);
        }
        info.role_map.insert(Agent::from(1), Role::Villager);
        info
    }

    fn calls(client: &SessionClient<Recorder>) -> Vec<String> {
        client.player().lock().calls.clone()
    }

    #[tokio::test]
    async fn test_initialize_interns_agents_and_has_no_reply() {
        let mut client = client(ClientConfig::default());
        let packet = Packet::new(Request::Initialize)
            .with_game_info(game_info(0))
            .with_game_setting(GameSetting::default());

        let reply = client.handle_packet(packet).await.unwrap();

        assert_eq!(reply, None);
        assert_eq!(calls(&client), vec!["initialize"]);
        assert_eq!(client.registry().len(), 5);
    }

    #[tokio::test]
    async fn test_initialize_without_snapshot_rejected() {
        let mut client = client(ClientConfig::default());
        let result = client.handle_packet(Packet::new(Request::Initialize)).await;
        assert!(matches!(result, Err(ClientError::UnexpectedRequest(_))));
    }

    #[tokio::test]
    async fn test_daily_initialize_updates_then_starts_day() {
        let mut client = client(ClientConfig::default());
        let packet = Packet::new(Request::DailyInitialize).with_game_info(game_info(1));
        assert_eq!(client.handle_packet(packet).await.unwrap(), None);
        assert_eq!(calls(&client), vec!["update", "day_start"]);
    }

    #[tokio::test]
    async fn test_null_talk_becomes_skip() {
        let mut client = client(ClientConfig::default());
        client
            .handle_packet(Packet::new(Request::DailyInitialize).with_game_info(game_info(1)))
            .await
            .unwrap();

        let reply = client
            .handle_packet(Packet::new(Request::Talk).with_talk_history(vec![Talk::new(
                0,
                1,
                Agent::from(2),
                "Over",
            )]))
            .await
            .unwrap();

        assert_eq!(reply, Some(Reply::Text("Skip".to_string())));
        let player = client.player();
        let player = player.lock();
        assert_eq!(player.last_day, Some(1));
        assert_eq!(player.talks_seen, 1);
    }

    #[tokio::test]
    async fn test_unsupported_actions_get_conservative_replies() {
        let mut client = client(ClientConfig::default());
        assert_eq!(
            client.handle_packet(Packet::new(Request::Divine)).await.unwrap(),
            Some(Reply::Agent(None))
        );
        assert_eq!(
            client.handle_packet(Packet::new(Request::Attack)).await.unwrap(),
            Some(Reply::Agent(None))
        );
        assert_eq!(
            client.handle_packet(Packet::new(Request::Whisper)).await.unwrap(),
            Some(Reply::Text("Skip".to_string()))
        );
    }

    #[tokio::test]
    async fn test_name_and_role_replies() {
        let mut client = client(ClientConfig::default());
        assert_eq!(
            client.handle_packet(Packet::new(Request::Name)).await.unwrap(),
            Some(Reply::Text("recorder".to_string()))
        );
        assert_eq!(
            client.handle_packet(Packet::new(Request::Role)).await.unwrap(),
            Some(Reply::Text("none".to_string()))
        );

        let mut client = self::client(ClientConfig {
            name: Some("override".to_string()),
            role: Some(Role::Werewolf),
            ..ClientConfig::default()
        });
        assert_eq!(
            client.handle_packet(Packet::new(Request::Name)).await.unwrap(),
            Some(Reply::Text("override".to_string()))
        );
        assert_eq!(
            client.handle_packet(Packet::new(Request::Role)).await.unwrap(),
            Some(Reply::Text("WEREWOLF".to_string()))
        );
    }

    #[tokio::test]
    async fn test_finish_resets_state() {
        let mut client = client(ClientConfig::default());
        client
            .handle_packet(Packet::new(Request::DailyInitialize).with_game_info(game_info(2)))
            .await
            .unwrap();
        client
            .handle_packet(Packet::new(Request::Finish).with_game_info(game_info(2)))
            .await
            .unwrap();

        assert!(client.session().game_info().is_none());
        assert_eq!(calls(&client).last().unwrap(), "finish");
    }

    #[test]
    fn test_lenient_decode_substitutes_request_only_packet() {
        let client = client(ClientConfig::default());
        let packet = client
            .decode(r#"{"request":"VOTE","gameInfo":{"day":"one"}}"#)
            .unwrap();
        assert_eq!(packet, Packet::new(Request::Vote));
        assert!(client.decode(r#"{"request":"DANCE"}"#).is_err());
    }

    #[test]
    fn test_strict_decode_rejects_bad_packet() {
        let client = client(ClientConfig {
            strict_mode: true,
            ..ClientConfig::default()
        });
        let result = client.decode(r#"{"request":"VOTE","gameInfo":{"day":"one"}}"#);
        assert!(matches!(result, Err(ClientError::Protocol(_))));
    }
}
