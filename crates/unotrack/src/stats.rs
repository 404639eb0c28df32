//! Read-only statistics over sessions: per-session timelines, game
//! segmentation and totals across every stored snapshot.

use crate::types::{ActionKind, Player, Snapshot};
use serde::Serialize;
use std::collections::HashMap;

const MS_PER_HOUR: f64 = 1000.0 * 60.0 * 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimelinePoint {
    pub time: u64,
    pub cards: i64,
    pub kind: ActionKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerTimeline {
    pub ordinal: u32,
    pub name: String,
    pub points: Vec<TimelinePoint>,
}

/// Cards drawn over time for each player of one session. Wins are markers
/// placed at the player's current card count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionTimeline {
    pub players: Vec<PlayerTimeline>,
    pub last_time: u64,
    pub highest_cards: i64,
}

impl SessionTimeline {
    pub fn from_players(players: &[Player]) -> Self {
        let mut last_time: u64 = 0;
        let mut highest_cards: i64 = 0;

        let players = players
            .iter()
            .map(|player| {
                let mut cards: i64 = 0;
                let mut points = vec![TimelinePoint {
                    time: 0,
                    cards: 0,
                    kind: ActionKind::Draw,
                }];
                for entry in &player.history {
                    last_time = last_time.max(entry.time);
                    if entry.action == ActionKind::Draw {
                        cards = entry.value;
                        highest_cards = highest_cards.max(cards);
                    }
                    points.push(TimelinePoint {
                        time: entry.time,
                        cards,
                        kind: entry.action,
                    });
                }
                PlayerTimeline {
                    ordinal: player.ordinal,
                    name: player.name.clone(),
                    points,
                }
            })
            .collect();

        Self {
            players,
            last_time,
            highest_cards,
        }
    }
}

/// The stretch of play that ends with a win.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Game {
    pub winner: String,
    pub duration_ms: u64,
    pub cards: i64,
}

/// Splits a session into games. Entries of all players are merged by time
/// and every win closes the running game. Cards drawn after the last win
/// belong to an unfinished game and are not reported.
pub fn segment_games(players: &[Player]) -> Vec<Game> {
    let mut merged: Vec<(u64, usize, ActionKind, i64)> = players
        .iter()
        .enumerate()
        .flat_map(|(i, p)| p.history.iter().map(move |e| (e.time, i, e.action, e.value)))
        .collect();
    merged.sort_by_key(|&(time, i, _, _)| (time, i));

    let Some(&(first_time, ..)) = merged.first() else {
        return Vec::new();
    };

    let mut games = Vec::new();
    let mut last_draw = vec![0i64; players.len()];
    let mut game_start = first_time;
    let mut cards: i64 = 0;
    for (time, i, action, value) in merged {
        match action {
            ActionKind::Draw => {
                cards = cards.saturating_add(value.saturating_sub(last_draw[i]).max(0));
                last_draw[i] = value;
            }
            ActionKind::Win => {
                games.push(Game {
                    winner: players[i].name.clone(),
                    duration_ms: time.saturating_sub(game_start),
                    cards,
                });
                cards = 0;
                game_start = time;
            }
            ActionKind::Flash => {}
        }
    }
    games
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerStats {
    pub name: String,
    pub wins: i64,
    pub cards: i64,
    pub playtime_ms: u64,
    /// Wins recorded by anyone in the sessions this player took part in.
    pub games: i64,
}

impl PlayerStats {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            wins: 0,
            cards: 0,
            playtime_ms: 0,
            games: 0,
        }
    }

    pub fn hours(&self) -> f64 {
        self.playtime_ms as f64 / MS_PER_HOUR
    }

    pub fn wins_per_hour(&self) -> f64 {
        ratio(self.wins as f64, self.hours())
    }

    pub fn cards_per_hour(&self) -> f64 {
        ratio(self.cards as f64, self.hours())
    }

    pub fn wins_per_game(&self) -> f64 {
        ratio(self.wins as f64, self.games as f64)
    }

    pub fn cards_per_game(&self) -> f64 {
        ratio(self.cards as f64, self.games as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSummary {
    pub snapshots: usize,
    pub games: usize,
    pub players: usize,
    pub cards_per_game: f64,
    pub total_play_hours: f64,
    pub person_hours: f64,
}

/// Totals across many sessions, keyed by player name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalStats {
    pub players: Vec<PlayerStats>,
    pub games: Vec<Game>,
    pub total_play_ms: u64,
    pub snapshot_count: usize,
}

impl GlobalStats {
    pub fn from_snapshots<'a, I>(snapshots: I) -> Self
    where
        I: IntoIterator<Item = &'a Snapshot>,
    {
        let mut players: Vec<PlayerStats> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut games = Vec::new();
        let mut total_play_ms: u64 = 0;
        let mut snapshot_count = 0;

        for snapshot in snapshots {
            snapshot_count += 1;
            total_play_ms = total_play_ms.saturating_add(snapshot.current_tick);
            let session_wins = snapshot
                .players
                .iter()
                .fold(0i64, |sum, p| sum.saturating_add(p.wins));

            for p in &snapshot.players {
                let slot = *index.entry(p.name.clone()).or_insert_with(|| {
                    players.push(PlayerStats::new(&p.name));
                    players.len() - 1
                });
                let stats = &mut players[slot];
                stats.wins = stats.wins.saturating_add(p.wins);
                stats.cards = stats.cards.saturating_add(p.cards);
                stats.playtime_ms = stats.playtime_ms.saturating_add(snapshot.current_tick);
                stats.games = stats.games.saturating_add(session_wins);
            }
            games.extend(segment_games(&snapshot.players));
        }

        players.retain(|p| p.games > 0);

        Self {
            players,
            games,
            total_play_ms,
            snapshot_count,
        }
    }

    pub fn by_cards(&self) -> Vec<&PlayerStats> {
        self.ranked(|p| p.cards as f64)
    }

    pub fn by_wins(&self) -> Vec<&PlayerStats> {
        self.ranked(|p| p.wins as f64)
    }

    pub fn by_cards_per_hour(&self) -> Vec<&PlayerStats> {
        self.ranked(PlayerStats::cards_per_hour)
    }

    pub fn by_wins_per_hour(&self) -> Vec<&PlayerStats> {
        self.ranked(PlayerStats::wins_per_hour)
    }

    pub fn by_wins_per_game(&self) -> Vec<&PlayerStats> {
        self.ranked(PlayerStats::wins_per_game)
    }

    fn ranked<F>(&self, key: F) -> Vec<&PlayerStats>
    where
        F: Fn(&PlayerStats) -> f64,
    {
        let mut ranked: Vec<&PlayerStats> = self.players.iter().collect();
        ranked.sort_by(|a, b| key(b).total_cmp(&key(a)));
        ranked
    }

    pub fn summary(&self) -> StatsSummary {
        let cards = self
            .players
            .iter()
            .fold(0i64, |sum, p| sum.saturating_add(p.cards));
        let person_ms = self
            .players
            .iter()
            .fold(0u64, |sum, p| sum.saturating_add(p.playtime_ms));
        StatsSummary {
            snapshots: self.snapshot_count,
            games: self.games.len(),
            players: self.players.len(),
            cards_per_game: ratio(cards as f64, self.games.len() as f64),
            total_play_hours: self.total_play_ms as f64 / MS_PER_HOUR,
            person_hours: person_ms as f64 / MS_PER_HOUR,
        }
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HistoryEntry;

    fn player(ordinal: u32, name: &str, log: &[(ActionKind, i64, u64)]) -> Player {
        let mut p = Player::new(ordinal, name);
        for &(action, value, time) in log {
            p.history.push(HistoryEntry {
                action,
                value,
                time,
            });
            *p.total_mut(action) = value;
        }
        p
    }

    fn snapshot(current_tick: u64, players: Vec<Player>) -> Snapshot {
        Snapshot {
            current_tick,
            players,
            save_version: 2,
        }
    }

    #[test]
    fn test_timeline_wins_sit_at_card_level() {
        let players = vec![player(
            1,
            "Ann",
            &[
                (ActionKind::Draw, 2, 100),
                (ActionKind::Win, 1, 200),
                (ActionKind::Draw, 6, 300),
            ],
        )];
        let timeline = SessionTimeline::from_players(&players);
        let points = &timeline.players[0].points;
        assert_eq!(points.len(), 4);
        assert_eq!(points[0].time, 0);
        assert_eq!(points[2].kind, ActionKind::Win);
        assert_eq!(points[2].cards, 2);
        assert_eq!(points[3].cards, 6);
        assert_eq!(timeline.last_time, 300);
        assert_eq!(timeline.highest_cards, 6);
    }

    #[test]
    fn test_timeline_empty_session() {
        let timeline = SessionTimeline::from_players(&[Player::new(1, "Ann")]);
        assert_eq!(timeline.players[0].points.len(), 1);
        assert_eq!(timeline.last_time, 0);
    }

    #[test]
    fn test_segment_games_uses_draw_deltas() {
        let players = vec![
            player(
                1,
                "Ann",
                &[
                    (ActionKind::Draw, 2, 100),
                    (ActionKind::Draw, 5, 300),
                    (ActionKind::Win, 1, 900),
                ],
            ),
            player(
                2,
                "Bo",
                &[
                    (ActionKind::Draw, 4, 200),
                    (ActionKind::Win, 1, 500),
                    (ActionKind::Draw, 6, 1200),
                ],
            ),
        ];
        let games = segment_games(&players);
        assert_eq!(
            games,
            vec![
                Game {
                    winner: "Bo".to_string(),
                    duration_ms: 400,
                    cards: 9,
                },
                Game {
                    winner: "Ann".to_string(),
                    duration_ms: 400,
                    cards: 0,
                },
            ]
        );
    }

    #[test]
    fn test_segment_games_without_history() {
        assert!(segment_games(&[Player::new(1, "Ann")]).is_empty());
    }

    #[test]
    fn test_global_stats_aggregates_by_name() {
        let s1 = snapshot(
            3_600_000,
            vec![
                player(1, "Ann", &[(ActionKind::Draw, 4, 10), (ActionKind::Win, 1, 20)]),
                player(2, "Bo", &[(ActionKind::Draw, 2, 15)]),
            ],
        );
        let s2 = snapshot(
            1_800_000,
            vec![
                player(1, "Bo", &[(ActionKind::Win, 1, 10)]),
                player(2, "Ann", &[(ActionKind::Draw, 6, 5)]),
            ],
        );
        let lurker = snapshot(600_000, vec![player(1, "Cy", &[])]);

        let stats = GlobalStats::from_snapshots([&s1, &s2, &lurker]);
        assert_eq!(stats.snapshot_count, 3);
        assert_eq!(stats.total_play_ms, 6_000_000);

        let names: Vec<&str> = stats.players.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Ann", "Bo"]);

        let ann = &stats.players[0];
        assert_eq!(ann.cards, 10);
        assert_eq!(ann.wins, 1);
        assert_eq!(ann.playtime_ms, 5_400_000);
        assert_eq!(ann.games, 2);
        assert!((ann.hours() - 1.5).abs() < 1e-9);
        assert!((ann.wins_per_game() - 0.5).abs() < 1e-9);

        let by_cards: Vec<&str> = stats.by_cards().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(by_cards, vec!["Ann", "Bo"]);

        let summary = stats.summary();
        assert_eq!(summary.snapshots, 3);
        assert_eq!(summary.games, 2);
        assert_eq!(summary.players, 2);
        assert!((summary.cards_per_game - 6.0).abs() < 1e-9);
        assert!((summary.person_hours - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_global_stats_empty() {
        let stats = GlobalStats::from_snapshots(std::iter::empty::<&Snapshot>());
        let summary = stats.summary();
        assert_eq!(summary.games, 0);
        assert_eq!(summary.cards_per_game, 0.0);
        assert!(stats.by_wins().is_empty());
    }

    #[test]
    fn test_global_stats_saturates_extreme_totals() {
        let huge = |name: &str| {
            snapshot(
                u64::MAX,
                vec![player(
                    1,
                    name,
                    &[
                        (ActionKind::Draw, i64::MIN, 10),
                        (ActionKind::Draw, i64::MAX, 20),
                        (ActionKind::Win, i64::MAX, 30),
                    ],
                )],
            )
        };
        let (s1, s2) = (huge("Ann"), huge("Ann"));
        let stats = GlobalStats::from_snapshots([&s1, &s2]);

        assert_eq!(stats.total_play_ms, u64::MAX);
        assert_eq!(stats.players[0].cards, i64::MAX);
        assert_eq!(stats.players[0].wins, i64::MAX);
        assert_eq!(stats.games.len(), 2);
        assert_eq!(stats.games[0].cards, i64::MAX);
    }

    #[test]
    fn test_rates_with_zero_playtime() {
        let p = PlayerStats::new("Ann");
        assert_eq!(p.cards_per_hour(), 0.0);
        assert_eq!(p.wins_per_game(), 0.0);
    }
}
