//! Session state and history reconciliation.

use std::collections::BTreeMap;
use tracing::debug;
use wolf_protocol::{GameInfo, GameSetting, Packet, Talk, TalkType};

/// Records of one channel, grouped by day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelLog {
    days: BTreeMap<u32, Vec<Talk>>,
}

impl ChannelLog {
    /// Key of the newest record held, if any.
    pub fn last_key(&self) -> Option<(u32, u32)> {
        self.days
            .values()
            .next_back()
            .and_then(|records| records.last())
            .map(Talk::key)
    }

    /// Append every record strictly newer than the current last one.
    ///
    /// Returns how many records were accepted.
    pub fn append_newer(&mut self, records: &[Talk]) -> usize {
        let mut accepted = 0;
        for record in records {
            if self.last_key().map_or(true, |last| record.key() > last) {
                self.days.entry(record.day).or_default().push(record.clone());
                accepted += 1;
            }
        }
        accepted
    }

    pub fn on(&self, day: u32) -> &[Talk] {
        self.days.get(&day).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.days.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.days.values().all(Vec::is_empty)
    }

    pub fn clear(&mut self) {
        self.days.clear();
    }
}

/// Append to `list` every record strictly newer than its last entry.
fn append_newer_to(list: &mut Vec<Talk>, records: &[Talk]) -> usize {
    let mut accepted = 0;
    for record in records {
        if list.last().map_or(true, |last| record.key() > last.key()) {
            list.push(record.clone());
            accepted += 1;
        }
    }
    accepted
}

/// Add to a snapshot list the delivered records it is missing, keeping key order.
fn carry_forward(list: &mut Vec<Talk>, delivered: &[Talk]) -> usize {
    let mut carried = 0;
    for record in delivered {
        if !list.iter().any(|held| held.key() == record.key()) {
            list.push(record.clone());
            carried += 1;
        }
    }
    if carried > 0 {
        list.sort_by_key(Talk::key);
    }
    carried
}

/// Memory of one connection: last snapshot, settings and per-day history.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    game_info: Option<GameInfo>,
    game_setting: Option<GameSetting>,
    talks: ChannelLog,
    whispers: ChannelLog,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a packet into the state.
    ///
    /// A carried snapshot replaces the previous one, but records already
    /// delivered for its day that it omits are carried into it; otherwise the
    /// previous snapshot is kept. History deltas are appended only where
    /// strictly newer, so re-delivery is harmless.
    pub fn reconcile(&mut self, packet: &Packet) {
        if let Some(game_info) = &packet.game_info {
            let mut snapshot = game_info.clone();
            for talk_type in [TalkType::Talk, TalkType::Whisper] {
                let log = self.log_mut(talk_type);
                log.append_newer(snapshot.history(talk_type));
                let day = snapshot.day;
                let carried = carry_forward(snapshot.history_mut(talk_type), log.on(day));
                if carried > 0 {
                    debug!(
                        "Carried {} delivered {} records into day {} snapshot",
                        carried, talk_type, snapshot.day
                    );
                }
            }
            self.game_info = Some(snapshot);
        }
        if let Some(game_setting) = &packet.game_setting {
            self.game_setting = Some(game_setting.clone());
        }

        for talk_type in [TalkType::Talk, TalkType::Whisper] {
            let Some(delta) = packet.history(talk_type) else {
                continue;
            };
            let logged = self.log_mut(talk_type).append_newer(delta);
            let merged = match self.game_info.as_mut() {
                Some(game_info) => append_newer_to(game_info.history_mut(talk_type), delta),
                None => 0,
            };
            debug!(
                "Reconciled {} {} records: {} logged, {} merged into snapshot",
                delta.len(),
                talk_type,
                logged,
                merged
            );
        }
    }

    /// Forget everything from the finished game.
    pub fn reset(&mut self) {
        self.game_info = None;
        self.game_setting = None;
        self.talks.clear();
        self.whispers.clear();
    }

    pub fn game_info(&self) -> Option<&GameInfo> {
        self.game_info.as_ref()
    }

    pub fn game_setting(&self) -> Option<&GameSetting> {
        self.game_setting.as_ref()
    }

    pub fn talks_on(&self, day: u32) -> &[Talk] {
        self.talks.on(day)
    }

    pub fn whispers_on(&self, day: u32) -> &[Talk] {
        self.whispers.on(day)
    }

    pub fn log(&self, talk_type: TalkType) -> &ChannelLog {
        match talk_type {
            TalkType::Talk => &self.talks,
            TalkType::Whisper => &self.whispers,
        }
    }

    fn log_mut(&mut self, talk_type: TalkType) -> &mut ChannelLog {
        match talk_type {
            TalkType::Talk => &mut self.talks,
            TalkType::Whisper => &mut self.whispers,
        }
    }
}
