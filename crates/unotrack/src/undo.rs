//! Single-step undo across all players of a session.
//!
//! Logs store absolute totals, so undoing an action means restoring the
//! value of the previous entry of the same kind (or 0 when there is none)
//! and dropping the newest entry.

use crate::error::Result;
use crate::ledger::SessionLedger;
use crate::types::{ActionKind, HistoryEntry, Player};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoOutcome {
    Undone(UndoneAction),
    /// Every log was empty; nothing changed.
    NothingToUndo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoneAction {
    pub player: String,
    pub ordinal: u32,
    pub kind: ActionKind,
    /// Amount the reverted action had added.
    pub magnitude: i64,
    pub entry: HistoryEntry,
}

pub fn undo_last(ledger: &mut SessionLedger) -> Result<UndoOutcome> {
    let Some(index) = latest_player(ledger.players()) else {
        info!("nothing to undo");
        return Ok(UndoOutcome::NothingToUndo);
    };

    let undone = revert_last(&mut ledger.players_mut()[index]);
    info!(
        player = %undone.player,
        action = %undone.kind,
        magnitude = undone.magnitude,
        "action undone"
    );

    ledger.persist()?;
    Ok(UndoOutcome::Undone(undone))
}

/// Index of the player whose newest entry is the newest overall. Ties go to
/// the lower ordinal.
pub(crate) fn latest_player(players: &[Player]) -> Option<usize> {
    let mut latest: Option<(usize, u64)> = None;
    for (i, player) in players.iter().enumerate() {
        if let Some(entry) = player.last_entry()
            && latest.is_none_or(|(_, time)| entry.time > time)
        {
            latest = Some((i, entry.time));
        }
    }
    latest.map(|(i, _)| i)
}

fn revert_last(player: &mut Player) -> UndoneAction {
    let last = player.history.len() - 1;
    let kind = player.history[last].action;

    let mut previous = 0;
    let mut current = 0;
    let mut count = 0;
    let mut latest_index = last;
    for (i, entry) in player.history.iter().enumerate() {
        if entry.action == kind {
            previous = current;
            current = entry.value;
            count += 1;
            latest_index = i;
        }
    }
    debug_assert_eq!(latest_index, last);

    let reverted = if count > 1 { previous.max(0) } else { 0 };
    *player.total_mut(kind) = reverted;
    let entry = player.history.remove(latest_index);

    UndoneAction {
        player: player.name.clone(),
        ordinal: player.ordinal,
        kind,
        magnitude: entry.value.saturating_sub(reverted).max(0),
        entry,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::ledger::LedgerContext;
    use crate::paths::SaveResolver;
    use crate::store::SnapshotStore;
    use tempfile::TempDir;

    fn setup_ledger(names: &[&str]) -> (TempDir, ManualClock, SessionLedger) {
        let temp = TempDir::new().unwrap();
        let store = SnapshotStore::with_resolver(SaveResolver::new().with_app_dir(temp.path()));
        let clock = ManualClock::new(0);
        let mut ledger = SessionLedger::new(LedgerContext::new(store, clock.clone()));
        ledger.create_session(names).unwrap();
        (temp, clock, ledger)
    }

    fn entry(action: ActionKind, value: i64, time: u64) -> HistoryEntry {
        HistoryEntry {
            action,
            value,
            time,
        }
    }

    fn assert_latest_is_last_of_its_log(players: &[Player]) {
        if let Some(i) = latest_player(players) {
            let newest = players
                .iter()
                .flat_map(|p| p.history.iter())
                .map(|e| e.time)
                .max()
                .unwrap();
            assert_eq!(players[i].last_entry().unwrap().time, newest);
        }
    }

    #[test]
    fn test_scenario_undo_other_players_win() {
        let (_temp, clock, mut ledger) = setup_ledger(&["Ann", "Bo"]);
        clock.advance(100);
        ledger.apply_action(Some(1), ActionKind::Draw, 3).unwrap();
        clock.advance(100);
        ledger.apply_action(Some(2), ActionKind::Win, 1).unwrap();

        let outcome = ledger.undo_last().unwrap();
        let UndoOutcome::Undone(undone) = outcome else {
            panic!("expected an undo");
        };
        assert_eq!(undone.player, "Bo");
        assert_eq!(undone.kind, ActionKind::Win);
        assert_eq!(undone.magnitude, 1);

        let bo = ledger.player(2).unwrap();
        assert_eq!(bo.wins, 0);
        assert!(bo.history.is_empty());
        assert_eq!(ledger.player(1).unwrap().cards, 3);
    }

    #[test]
    fn test_scenario_undo_restores_previous_total() {
        let (_temp, clock, mut ledger) = setup_ledger(&["Ann"]);
        clock.advance(10);
        ledger.apply_action(Some(1), ActionKind::Draw, 2).unwrap();
        let after_first = ledger.player(1).unwrap().cards;
        clock.advance(10);
        ledger.apply_action(Some(1), ActionKind::Draw, 2).unwrap();

        ledger.undo_last().unwrap();
        assert_eq!(ledger.player(1).unwrap().cards, after_first);
        assert_eq!(ledger.player(1).unwrap().history.len(), 1);
    }

    #[test]
    fn test_undo_is_left_inverse_of_apply() {
        let (_temp, clock, mut ledger) = setup_ledger(&["Ann", "Bo"]);
        for (ordinal, kind, n) in [
            (1, ActionKind::Draw, 4),
            (2, ActionKind::Win, 1),
            (1, ActionKind::Win, 1),
            (2, ActionKind::Draw, 2),
        ] {
            clock.advance(50);
            ledger.apply_action(Some(ordinal), kind, n).unwrap();
        }

        let before = ledger.players().to_vec();
        clock.advance(50);
        ledger.apply_action(Some(1), ActionKind::Draw, 7).unwrap();
        let outcome = ledger.undo_last().unwrap();

        assert!(matches!(
            outcome,
            UndoOutcome::Undone(UndoneAction { magnitude: 7, .. })
        ));
        assert_eq!(ledger.players(), before.as_slice());
    }

    #[test]
    fn test_undo_with_nothing_logged() {
        let (_temp, _clock, mut ledger) = setup_ledger(&["Ann", "Bo"]);
        let before = ledger.players().to_vec();
        assert_eq!(ledger.undo_last().unwrap(), UndoOutcome::NothingToUndo);
        assert_eq!(ledger.players(), before.as_slice());
    }

    #[test]
    fn test_repeated_undo_peels_in_reverse_order() {
        let (_temp, clock, mut ledger) = setup_ledger(&["Ann", "Bo"]);
        let actions = [
            (1, ActionKind::Draw, 2),
            (2, ActionKind::Draw, 3),
            (1, ActionKind::Win, 1),
            (2, ActionKind::Draw, 1),
            (1, ActionKind::Draw, 5),
        ];
        for (ordinal, kind, n) in actions {
            clock.advance(10);
            ledger.apply_action(Some(ordinal), kind, n).unwrap();
        }

        let mut undone = Vec::new();
        loop {
            assert_latest_is_last_of_its_log(ledger.players());
            match ledger.undo_last().unwrap() {
                UndoOutcome::Undone(u) => undone.push((u.ordinal, u.kind, u.magnitude)),
                UndoOutcome::NothingToUndo => break,
            }
            for p in ledger.players() {
                for kind in [ActionKind::Draw, ActionKind::Win] {
                    assert_eq!(p.total(kind), p.latest_value(kind));
                }
            }
        }

        let expected: Vec<(u32, ActionKind, i64)> = actions
            .iter()
            .rev()
            .map(|&(o, k, n)| (o, k, i64::from(n)))
            .collect();
        assert_eq!(undone, expected);
        assert!(ledger.players().iter().all(|p| p.cards == 0 && p.wins == 0));
    }

    #[test]
    fn test_undo_persists() {
        let (_temp, clock, mut ledger) = setup_ledger(&["Ann"]);
        clock.advance(10);
        ledger.apply_action(Some(1), ActionKind::Draw, 2).unwrap();
        ledger.undo_last().unwrap();

        let id = ledger.snapshot_id().unwrap().to_string();
        let stored = ledger.store().load(&id).unwrap();
        assert!(stored.players[0].history.is_empty());
        assert_eq!(stored.players[0].cards, 0);
    }

    #[test]
    fn test_revert_clamps_negative_totals() {
        let mut p = Player::new(1, "Ann");
        p.history = vec![
            entry(ActionKind::Draw, -4, 10),
            entry(ActionKind::Draw, 2, 20),
        ];
        p.cards = 2;
        let undone = revert_last(&mut p);
        assert_eq!(p.cards, 0);
        assert_eq!(undone.magnitude, 2);
    }

    #[test]
    fn test_revert_only_touches_kind_of_last_entry() {
        let mut p = Player::new(1, "Ann");
        p.history = vec![
            entry(ActionKind::Draw, 3, 10),
            entry(ActionKind::Win, 1, 20),
            entry(ActionKind::Draw, 5, 30),
        ];
        p.cards = 5;
        p.wins = 1;
        revert_last(&mut p);
        assert_eq!(p.cards, 3);
        assert_eq!(p.wins, 1);
        assert_eq!(p.history.len(), 2);
    }

    #[test]
    fn test_latest_player_ties_prefer_lower_ordinal() {
        let mut a = Player::new(1, "Ann");
        a.history.push(entry(ActionKind::Draw, 1, 50));
        let mut b = Player::new(2, "Bo");
        b.history.push(entry(ActionKind::Draw, 1, 50));
        let c = Player::new(3, "Cy");
        assert_eq!(latest_player(&[a, b, c]), Some(0));
        assert_eq!(latest_player(&[]), None);
    }

    #[test]
    fn test_latest_player_accepts_time_zero() {
        let mut a = Player::new(1, "Ann");
        a.history.push(entry(ActionKind::Draw, 1, 0));
        assert_eq!(latest_player(&[Player::new(2, "Bo"), a]), Some(1));
    }
}
