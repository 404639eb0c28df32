use crate::format;
use anyhow::{Context, Result};
use unotrack::UnoTrack;

pub fn run(uno: &UnoTrack, json: bool, pretty: bool) -> Result<()> {
    let saves = uno.list().context("failed to list stored sessions")?;

    if json {
        let output = serde_json::json!({
            "saves_dir": uno.resolver().saves_dir().ok(),
            "sessions": saves,
        });
        println!("{}", format::to_json(&output, pretty)?);
    } else {
        println!("Stored sessions:");
        println!();
        if saves.is_empty() {
            println!("  (none)");
        } else {
            for s in &saves {
                println!(
                    "  {}  {:>8}  {}",
                    s.title,
                    format::elapsed(s.elapsed_ms),
                    s.participants.join(", ")
                );
                println!("      {}", s.id);
            }
        }
    }
    Ok(())
}
