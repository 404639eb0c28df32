use crate::format;
use anyhow::{Context, Result};
use serde::Serialize;
use unotrack::types::derive_title;
use unotrack::{SessionTimeline, Snapshot, UnoTrack};

#[derive(Serialize)]
struct ShowOutput<'a> {
    id: &'a str,
    title: String,
    #[serde(flatten)]
    snapshot: &'a Snapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeline: Option<SessionTimeline>,
}

pub fn run(uno: &UnoTrack, id: &str, json: bool, timeline: bool, pretty: bool) -> Result<()> {
    let snapshot = uno
        .load(id)
        .with_context(|| format!("failed to load session {}", id))?;
    let timeline = timeline.then(|| SessionTimeline::from_players(&snapshot.players));

    if json {
        let output = ShowOutput {
            id,
            title: derive_title(id),
            snapshot: &snapshot,
            timeline,
        };
        println!("{}", format::to_json(&output, pretty)?);
        return Ok(());
    }

    println!("{}", render(id, &snapshot));
    if let Some(timeline) = timeline {
        println!();
        println!("Timeline (cards at each action):");
        for p in &timeline.players {
            let points: Vec<String> = p
                .points
                .iter()
                .skip(1)
                .map(|pt| format!("{}@{}", pt.cards, format::elapsed(pt.time)))
                .collect();
            println!("  {:<12} {}", p.name, points.join("  "));
        }
    }
    Ok(())
}

fn render(id: &str, snapshot: &Snapshot) -> String {
    let mut out = format!(
        "Session {} ({})\nPlayed {}\n",
        derive_title(id),
        id,
        format::elapsed(snapshot.current_tick)
    );
    for p in &snapshot.players {
        out.push_str(&format!(
            "\n#{} {}: {} cards, {} wins",
            p.ordinal, p.name, p.cards, p.wins
        ));
        if p.flashes > 0 {
            out.push_str(&format!(", {} flashes", p.flashes));
        }
        out.push('\n');
        for e in &p.history {
            out.push_str(&format!(
                "    {}  {:<5} -> {}\n",
                format::elapsed(e.time),
                e.action,
                e.value
            ));
        }
    }
    out
}
