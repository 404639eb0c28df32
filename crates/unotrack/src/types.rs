use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Newest on-disk schema version this crate reads and writes.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

pub(crate) const SNAPSHOT_PREFIX: &str = "savegame_";
pub(crate) const SNAPSHOT_TIME_FORMAT: &str = "%Y_%m_%d-%H_%M_%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    #[serde(alias = "draw")]
    Draw,
    #[serde(alias = "win")]
    Win,
    /// Pre-v2 action, only produced by old sessions.
    #[serde(alias = "flash")]
    Flash,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Draw => "Draw",
            ActionKind::Win => "Win",
            ActionKind::Flash => "Flash",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draw" => Ok(ActionKind::Draw),
            "win" => Ok(ActionKind::Win),
            "flash" => Ok(ActionKind::Flash),
            _ => Err(format!("Invalid action kind: {}", s)),
        }
    }
}

/// One scoring action. `value` is the player's absolute total for `action`
/// right after the action, not the amount added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub action: ActionKind,
    pub value: i64,
    /// Milliseconds since session start.
    pub time: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    #[serde(rename = "num", default)]
    pub ordinal: u32,
    pub name: String,
    pub cards: i64,
    pub flashes: i64,
    pub wins: i64,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

impl Player {
    pub fn new(ordinal: u32, name: impl Into<String>) -> Self {
        Self {
            ordinal,
            name: name.into(),
            cards: 0,
            flashes: 0,
            wins: 0,
            history: Vec::new(),
        }
    }

    pub fn total(&self, kind: ActionKind) -> i64 {
        match kind {
            ActionKind::Draw => self.cards,
            ActionKind::Win => self.wins,
            ActionKind::Flash => self.flashes,
        }
    }

    pub(crate) fn total_mut(&mut self, kind: ActionKind) -> &mut i64 {
        match kind {
            ActionKind::Draw => &mut self.cards,
            ActionKind::Win => &mut self.wins,
            ActionKind::Flash => &mut self.flashes,
        }
    }

    pub fn last_entry(&self) -> Option<&HistoryEntry> {
        self.history.last()
    }

    /// Value of the most recent entry of `kind`, 0 when there is none.
    pub fn latest_value(&self, kind: ActionKind) -> i64 {
        self.history
            .iter()
            .rev()
            .find(|e| e.action == kind)
            .map(|e| e.value)
            .unwrap_or(0)
    }
}

/// The full session document as stored in `savegame_*.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub current_tick: u64,
    pub players: Vec<Player>,
    pub save_version: u32,
}

/// What a snapshot listing shows for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotSummary {
    pub id: String,
    pub title: String,
    pub participants: Vec<String>,
    pub elapsed_ms: u64,
    /// Version marker as found on disk; `None` for unmarked legacy files.
    pub stored_version: Option<u64>,
}

pub fn snapshot_id_for(time: NaiveDateTime) -> String {
    format!("{}{}", SNAPSHOT_PREFIX, time.format(SNAPSHOT_TIME_FORMAT))
}

/// Human readable title for a snapshot id, e.g. `2024-01-05 20:15:00`.
/// Ids that do not carry a timestamp are returned unchanged.
pub fn derive_title(id: &str) -> String {
    id.strip_prefix(SNAPSHOT_PREFIX)
        .and_then(|stamp| NaiveDateTime::parse_from_str(stamp, SNAPSHOT_TIME_FORMAT).ok())
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| id.to_string())
}
