use crate::clock::{Clock, SystemClock};
use crate::error::{LedgerError, Result};
use crate::store::SnapshotStore;
use crate::types::{
    ActionKind, CURRENT_SCHEMA_VERSION, HistoryEntry, Player, Snapshot, snapshot_id_for,
};
use crate::undo::{self, UndoOutcome};
use std::collections::HashSet;
use tracing::{info, warn};

/// Everything a ledger needs from the outside world.
#[derive(Debug)]
pub struct LedgerContext {
    pub store: SnapshotStore,
    pub clock: Box<dyn Clock>,
}

impl LedgerContext {
    pub fn new(store: SnapshotStore, clock: impl Clock + 'static) -> Self {
        Self {
            store,
            clock: Box::new(clock),
        }
    }

    pub fn system(store: SnapshotStore) -> Self {
        Self::new(store, SystemClock::new())
    }
}

/// The active session: players, their logs and the session clock.
///
/// Every mutation is followed by a full write of the session snapshot. If
/// that write fails the error is returned, but the in-memory change stands
/// and is picked up by the next successful write.
#[derive(Debug)]
pub struct SessionLedger {
    players: Vec<Player>,
    clock_origin: i64,
    snapshot_id: Option<String>,
    schema_version: u32,
    store: SnapshotStore,
    clock: Box<dyn Clock>,
}

impl SessionLedger {
    pub fn new(context: LedgerContext) -> Self {
        let clock_origin = ticks(&*context.clock);
        Self {
            players: Vec::new(),
            clock_origin,
            snapshot_id: None,
            schema_version: CURRENT_SCHEMA_VERSION,
            store: context.store,
            clock: context.clock,
        }
    }

    /// Starts a fresh session, replacing whatever was active.
    ///
    /// Names become players with ordinals `1..=N` in the given order. The
    /// snapshot id is taken from the local date and time.
    pub fn create_session<S: AsRef<str>>(&mut self, names: &[S]) -> Result<()> {
        if names.is_empty() {
            return Err(LedgerError::InvalidSession(
                "a session needs at least one player".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for name in names {
            let name = name.as_ref();
            if name.trim().is_empty() {
                return Err(LedgerError::InvalidSession(
                    "player names must not be blank".to_string(),
                ));
            }
            if !seen.insert(name) {
                return Err(LedgerError::InvalidSession(format!(
                    "duplicate player name: {}",
                    name
                )));
            }
        }

        self.players = names
            .iter()
            .enumerate()
            .map(|(i, name)| Player::new(i as u32 + 1, name.as_ref()))
            .collect();
        self.clock_origin = ticks(&*self.clock);
        self.schema_version = CURRENT_SCHEMA_VERSION;
        let id = snapshot_id_for(chrono::Local::now().naive_local());
        info!(snapshot = %id, players = self.players.len(), "session created");
        self.snapshot_id = Some(id);

        self.persist()
    }

    /// Adopts a stored session. On failure the current session is kept.
    pub fn load(&mut self, id: &str) -> Result<()> {
        let snapshot = self.store.load(id)?;
        let clock_origin = i64::try_from(snapshot.current_tick)
            .ok()
            .and_then(|elapsed| ticks(&*self.clock).checked_sub(elapsed))
            .ok_or_else(|| LedgerError::corrupt(id, "current_tick out of range"))?;

        self.players = snapshot.players;
        self.schema_version = snapshot.save_version;
        self.clock_origin = clock_origin;
        self.snapshot_id = Some(id.to_string());
        info!(
            snapshot = id,
            players = self.players.len(),
            elapsed_ms = snapshot.current_tick,
            "session loaded"
        );
        Ok(())
    }

    /// Adds `magnitude` to a player's total for `kind` and records the new
    /// total in their log.
    ///
    /// `None`, or an ordinal that is not in the session, is a no-op and
    /// returns `Ok(None)`. A total or timestamp that would overflow fails
    /// with `OutOfRange` and leaves the session unchanged.
    pub fn apply_action(
        &mut self,
        player: Option<u32>,
        kind: ActionKind,
        magnitude: u32,
    ) -> Result<Option<HistoryEntry>> {
        let Some(ordinal) = player else {
            return Ok(None);
        };
        let Some(index) = self.players.iter().position(|p| p.ordinal == ordinal) else {
            warn!(ordinal, action = %kind, "action for unknown player ignored");
            return Ok(None);
        };

        let time = self.next_timestamp().ok_or_else(|| {
            LedgerError::OutOfRange("no timestamp left after the latest entry".to_string())
        })?;
        let player = &mut self.players[index];
        let total = player
            .total(kind)
            .checked_add(i64::from(magnitude))
            .ok_or_else(|| {
                LedgerError::OutOfRange(format!("{} total of {}", kind, player.name))
            })?;
        *player.total_mut(kind) = total;
        let entry = HistoryEntry {
            action: kind,
            value: total,
            time,
        };
        player.history.push(entry);
        info!(
            player = %player.name,
            action = %kind,
            magnitude,
            total = entry.value,
            time,
            "action applied"
        );

        self.persist()?;
        Ok(Some(entry))
    }

    /// Reverts the most recent action across all players.
    pub fn undo_last(&mut self) -> Result<UndoOutcome> {
        undo::undo_last(self)
    }

    /// Milliseconds of play in this session, carried across save and load.
    pub fn elapsed_time(&self) -> u64 {
        ticks(&*self.clock).saturating_sub(self.clock_origin).max(0) as u64
    }

    pub fn snapshot_id(&self) -> Option<&str> {
        self.snapshot_id.as_deref()
    }

    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, ordinal: u32) -> Option<&Player> {
        self.players.iter().find(|p| p.ordinal == ordinal)
    }

    pub fn player_by_name(&self, name: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.name == name)
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            current_tick: self.elapsed_time(),
            players: self.players.clone(),
            save_version: self.schema_version,
        }
    }

    pub(crate) fn players_mut(&mut self) -> &mut [Player] {
        &mut self.players
    }

    pub(crate) fn persist(&self) -> Result<()> {
        self.store.write(self).inspect_err(|e| {
            warn!(
                snapshot = self.snapshot_id().unwrap_or_default(),
                error = %e,
                "snapshot write failed, keeping in-memory state"
            );
        })
    }

    /// Entry times are strictly increasing across the session so the most
    /// recent action is never ambiguous, even within one clock tick.
    fn next_timestamp(&self) -> Option<u64> {
        let now = self.elapsed_time();
        let latest = self
            .players
            .iter()
            .filter_map(|p| p.last_entry().map(|e| e.time))
            .max();
        match latest {
            Some(latest) if now <= latest => latest.checked_add(1),
            _ => Some(now),
        }
    }
}

fn ticks(clock: &dyn Clock) -> i64 {
    i64::try_from(clock.ticks()).unwrap_or(i64::MAX)
}
