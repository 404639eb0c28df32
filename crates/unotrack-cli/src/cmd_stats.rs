use crate::format;
use anyhow::{Context, Result};
use unotrack::{GlobalStats, PlayerStats, UnoTrack};

pub fn run(uno: &UnoTrack, json: bool, pretty: bool) -> Result<()> {
    let stats = uno
        .global_stats()
        .context("failed to read stored sessions")?;

    if json {
        let output = serde_json::json!({
            "summary": stats.summary(),
            "players": stats.players,
            "games": stats.games,
        });
        println!("{}", format::to_json(&output, pretty)?);
    } else {
        print!("{}", render(&stats));
    }
    Ok(())
}

fn render(stats: &GlobalStats) -> String {
    let summary = stats.summary();
    let mut out = String::new();

    out.push_str("General:\n");
    for (label, value) in [
        ("Saves", summary.snapshots.to_string()),
        ("Games", summary.games.to_string()),
        ("Players", summary.players.to_string()),
        ("Cards per game", format!("{:.2}", summary.cards_per_game)),
        (
            "Total play time",
            format!("{:.2} hours", summary.total_play_hours),
        ),
        ("Person-hours", format!("{:.0} hours", summary.person_hours)),
    ] {
        out.push_str(&format!("  {:<20}{}\n", label, value));
    }

    if stats.players.is_empty() {
        out.push_str("\n(no finished games recorded)\n");
        return out;
    }

    out.push_str(&table("Players by cards", &stats.by_cards(), |p| {
        (p.cards as f64, p.wins as f64)
    }));
    out.push_str(&table("Players by wins", &stats.by_wins(), |p| {
        (p.cards as f64, p.wins as f64)
    }));
    out.push_str(&table("Players by cards/h", &stats.by_cards_per_hour(), |p| {
        (p.cards_per_hour(), p.wins_per_hour())
    }));
    out.push_str(&table("Players by wins/h", &stats.by_wins_per_hour(), |p| {
        (p.cards_per_hour(), p.wins_per_hour())
    }));
    out.push_str(&table("Players by wins/game", &stats.by_wins_per_game(), |p| {
        (p.cards_per_game(), p.wins_per_game())
    }));
    out
}

fn table<F>(title: &str, ranked: &[&PlayerStats], columns: F) -> String
where
    F: Fn(&PlayerStats) -> (f64, f64),
{
    let mut out = format!("\n{}:\n", title);
    out.push_str(&format!(
        "  {:>3}  {:<16}{:>10}{:>10}\n",
        "#", "Name", "Cards", "Wins"
    ));
    for (rank, p) in ranked.iter().enumerate() {
        let (cards, wins) = columns(*p);
        out.push_str(&format!(
            "  {:>3}  {:<16}{:>10}{:>10}\n",
            rank + 1,
            p.name,
            trim_number(cards),
            trim_number(wins)
        ));
    }
    out
}

fn trim_number(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{:.0}", n)
    } else {
        format!("{:.2}", n)
    }
}
