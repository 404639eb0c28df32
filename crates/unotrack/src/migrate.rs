//! Upgrades raw snapshot documents to the current schema.
//!
//! Versions are applied one step at a time and each step only runs when the
//! document is at exactly the version it expects:
//!
//! | from     | to | change                                                      |
//! |----------|----|-------------------------------------------------------------|
//! | unmarked | 1  | `score` becomes `cards`, `flashes` added, history tuples     |
//! |          |    | `[value, time]` become `{action: "Draw", value, time}`       |
//! | 1        | 2  | legacy `flash` actions become `Win`, the flash total moves   |
//! |          |    | into `wins`                                                 |
//!
//! Migration works on a copy of the player list; the document and its
//! `save_version` marker are only touched once every step has succeeded.
//! Nothing is written back to disk here.

use crate::error::{LedgerError, Result};
use crate::types::CURRENT_SCHEMA_VERSION;
use serde_json::{Map, Value, json};
use tracing::debug;

/// Outcome of a successful [`migrate`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Migration {
    /// Version marker found in the document, `None` for legacy files.
    pub from: Option<u64>,
    pub to: u32,
}

impl Migration {
    pub fn is_noop(&self) -> bool {
        self.from == Some(u64::from(self.to))
    }
}

/// Reads the `save_version` marker. An absent or `null` marker means legacy.
pub fn detect_version(doc: &Value, id: &str) -> Result<Option<u64>> {
    match doc.get("save_version") {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .map(Some)
            .ok_or_else(|| LedgerError::corrupt(id, format!("invalid save_version: {}", v))),
    }
}

pub fn migrate(doc: &mut Value, id: &str) -> Result<Migration> {
    let from = detect_version(doc, id)?;
    if let Some(found) = from
        && found > u64::from(CURRENT_SCHEMA_VERSION)
    {
        return Err(LedgerError::UnsupportedSchema {
            id: id.to_string(),
            found,
            supported: CURRENT_SCHEMA_VERSION,
        });
    }

    let migration = Migration {
        from,
        to: CURRENT_SCHEMA_VERSION,
    };
    if migration.is_noop() {
        return Ok(migration);
    }

    let mut players = match doc.get("players") {
        Some(Value::Array(players)) => players.clone(),
        _ => return Err(LedgerError::corrupt(id, "players is not an array")),
    };

    let mut version = from.unwrap_or(0);
    if version == 0 {
        for player in players.iter_mut() {
            legacy_to_v1(player_object(player, id)?, id)?;
        }
        version = 1;
        debug!(snapshot = id, "migrated legacy snapshot to v1");
    }
    if version == 1 {
        for player in players.iter_mut() {
            v1_to_v2(player_object(player, id)?, id)?;
        }
        version = 2;
        debug!(snapshot = id, "migrated snapshot to v2");
    }

    let root = doc
        .as_object_mut()
        .ok_or_else(|| LedgerError::corrupt(id, "document is not a JSON object"))?;
    root.insert("players".to_string(), Value::Array(players));
    root.insert("save_version".to_string(), json!(version));
    Ok(migration)
}

fn player_object<'a>(player: &'a mut Value, id: &str) -> Result<&'a mut Map<String, Value>> {
    player
        .as_object_mut()
        .ok_or_else(|| LedgerError::corrupt(id, "player entry is not an object"))
}

fn legacy_to_v1(player: &mut Map<String, Value>, id: &str) -> Result<()> {
    // Files re-saved by old builds can carry v1 fields without a marker,
    // so each rewrite only applies to the legacy shape.
    if let Some(score) = player.remove("score") {
        player.insert("cards".to_string(), score);
    } else if !player.contains_key("cards") {
        return Err(LedgerError::corrupt(id, "player has neither score nor cards"));
    }
    player
        .entry("flashes".to_string())
        .or_insert_with(|| json!(0));

    if let Some(history) = player.get_mut("history") {
        let entries = history
            .as_array_mut()
            .ok_or_else(|| LedgerError::corrupt(id, "history is not an array"))?;
        for entry in entries.iter_mut() {
            if let Value::Array(pair) = entry {
                let [value, time] = pair.as_slice() else {
                    return Err(LedgerError::corrupt(
                        id,
                        format!("legacy history entry has {} fields", pair.len()),
                    ));
                };
                let rewritten = json!({ "action": "Draw", "value": value, "time": time });
                *entry = rewritten;
            }
        }
    }
    Ok(())
}

fn v1_to_v2(player: &mut Map<String, Value>, id: &str) -> Result<()> {
    if let Some(history) = player.get_mut("history") {
        let entries = history
            .as_array_mut()
            .ok_or_else(|| LedgerError::corrupt(id, "history is not an array"))?;
        for entry in entries.iter_mut() {
            let action = entry
                .get("action")
                .and_then(Value::as_str)
                .ok_or_else(|| LedgerError::corrupt(id, "history entry has no action"))?;
            let renamed = match action.to_lowercase().as_str() {
                "draw" => "Draw",
                // Historical artifact: v1 "flash" is carried over as a win.
                "flash" | "win" => "Win",
                other => {
                    return Err(LedgerError::corrupt(
                        id,
                        format!("unknown history action: {}", other),
                    ));
                }
            };
            let value = entry.get("value").cloned().unwrap_or(Value::Null);
            let time = entry.get("time").cloned().unwrap_or(Value::Null);
            *entry = json!({ "action": renamed, "value": value, "time": time });
        }
    }

    let flashes = player.insert("flashes".to_string(), json!(0));
    player.insert("wins".to_string(), flashes.unwrap_or_else(|| json!(0)));
    Ok(())
}
