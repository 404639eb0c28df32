#![doc = include_str!("../README.md")]

pub mod clock;
pub mod error;
pub mod ledger;
pub mod migrate;
pub mod paths;
pub mod stats;
pub mod store;
pub mod types;
pub mod undo;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{LedgerError, Result};
pub use ledger::{LedgerContext, SessionLedger};
pub use migrate::Migration;
pub use paths::SaveResolver;
pub use stats::{Game, GlobalStats, PlayerStats, SessionTimeline, StatsSummary};
pub use store::SnapshotStore;
pub use types::{
    ActionKind, CURRENT_SCHEMA_VERSION, HistoryEntry, Player, Snapshot, SnapshotSummary,
};
pub use undo::{UndoOutcome, UndoneAction};

/// High-level entry point for working with stored sessions.
///
/// Wraps a [`SnapshotStore`] and hands out ledgers bound to it.
///
/// # Example
///
/// ```rust,no_run
/// use unotrack::{ActionKind, UnoTrack, UndoOutcome};
///
/// let uno = UnoTrack::new();
/// let mut ledger = uno.ledger();
/// ledger.create_session(&["Ann", "Bo"])?;
/// ledger.apply_action(Some(1), ActionKind::Draw, 4)?;
///
/// if let UndoOutcome::Undone(undone) = ledger.undo_last()? {
///     println!("undid {} for {}", undone.kind, undone.player);
/// }
///
/// for save in uno.list()? {
///     println!("{}: {}", save.title, save.participants.join(", "));
/// }
/// # Ok::<(), unotrack::LedgerError>(())
/// ```
#[derive(Debug, Clone)]
pub struct UnoTrack {
    store: SnapshotStore,
}

impl Default for UnoTrack {
    fn default() -> Self {
        Self::new()
    }
}

impl UnoTrack {
    /// Uses the per-OS application folder, or `UNOTRACK_HOME` when set.
    pub fn new() -> Self {
        Self {
            store: SnapshotStore::new(),
        }
    }

    /// Uses a custom resolver, e.g. a temporary directory in tests.
    pub fn with_resolver(resolver: SaveResolver) -> Self {
        Self {
            store: SnapshotStore::with_resolver(resolver),
        }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn resolver(&self) -> &SaveResolver {
        self.store.resolver()
    }

    /// A ledger with no active session, driven by the system clock.
    pub fn ledger(&self) -> SessionLedger {
        SessionLedger::new(LedgerContext::system(self.store.clone()))
    }

    pub fn ledger_with_clock(&self, clock: impl Clock + 'static) -> SessionLedger {
        SessionLedger::new(LedgerContext::new(self.store.clone(), clock))
    }

    /// Stored sessions, newest first.
    pub fn list(&self) -> Result<Vec<SnapshotSummary>> {
        self.store.list()
    }

    /// Reads a stored session, upgraded to the current schema.
    pub fn load(&self, id: &str) -> Result<Snapshot> {
        self.store.load(id)
    }

    /// Statistics across every readable stored session.
    pub fn global_stats(&self) -> Result<GlobalStats> {
        let snapshots = self.store.load_all()?;
        Ok(GlobalStats::from_snapshots(
            snapshots.iter().map(|(_, snapshot)| snapshot),
        ))
    }

    /// Timeline of one stored session.
    pub fn timeline(&self, id: &str) -> Result<SessionTimeline> {
        let snapshot = self.store.load(id)?;
        Ok(SessionTimeline::from_players(&snapshot.players))
    }
}
