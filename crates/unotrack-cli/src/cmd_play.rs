use crate::format;
use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};
use tracing::debug;
use unotrack::{ActionKind, LedgerError, SessionLedger, UndoOutcome, UnoTrack};

const HELP: &str = "\
Commands:
  draw <player> [count]   player draws cards (default 1)
  win <player>            player wins a game
  undo                    revert the most recent action
  status                  show totals and play time
  time                    show play time
  help                    show this help
  quit                    leave (the session is already saved)
Players can be given by name or number.";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Draw { player: String, count: u32 },
    Win { player: String },
    Undo,
    Status,
    Time,
    Help,
    Quit,
}

pub fn run(uno: &UnoTrack, load: Option<String>, players: Vec<String>) -> Result<()> {
    let mut ledger = uno.ledger();
    match load {
        Some(id) => ledger
            .load(&id)
            .with_context(|| format!("failed to load session {}", id))?,
        None => ledger
            .create_session(players.as_slice())
            .context("failed to start session")?,
    }
    debug!(id = ?ledger.snapshot_id(), players = ledger.players().len(), "session ready");

    let stdin = io::stdin();
    let stdout = io::stdout();
    play(&mut ledger, stdin.lock(), stdout.lock())
}

/// Reads commands line by line until `quit` or end of input.
fn play<R: BufRead, W: Write>(ledger: &mut SessionLedger, input: R, mut out: W) -> Result<()> {
    let names: Vec<&str> = ledger.players().iter().map(|p| p.name.as_str()).collect();
    writeln!(
        out,
        "Session {} with {}",
        ledger.snapshot_id().unwrap_or("(unsaved)"),
        names.join(", ")
    )?;
    writeln!(out, "Type 'help' for commands.")?;

    for line in input.lines() {
        let line = line.context("failed to read input")?;
        match parse_command(&line) {
            Ok(None) => continue,
            Ok(Some(Command::Quit)) => break,
            Ok(Some(command)) => execute(ledger, command, &mut out)?,
            Err(message) => writeln!(out, "{}", message)?,
        }
    }

    if let Some(id) = ledger.snapshot_id() {
        writeln!(out, "Saved as {}", id)?;
    }
    Ok(())
}

fn parse_command(line: &str) -> std::result::Result<Option<Command>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let command = match (verb.to_lowercase().as_str(), args.as_slice()) {
        ("draw" | "d", [player]) => Command::Draw {
            player: player.to_string(),
            count: 1,
        },
        ("draw" | "d", [player, count]) => {
            let count = count
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| format!("not a card count: {}", count))?;
            Command::Draw {
                player: player.to_string(),
                count,
            }
        }
        ("win" | "w", [player]) => Command::Win {
            player: player.to_string(),
        },
        ("undo" | "u", []) => Command::Undo,
        ("status" | "s", []) => Command::Status,
        ("time" | "t", []) => Command::Time,
        ("help" | "h" | "?", []) => Command::Help,
        ("quit" | "q" | "exit", []) => Command::Quit,
        _ => return Err(format!("unknown command: {} (try 'help')", line.trim())),
    };
    Ok(Some(command))
}

fn resolve_player(ledger: &SessionLedger, token: &str) -> Option<u32> {
    if let Ok(ordinal) = token.parse::<u32>()
        && ledger.player(ordinal).is_some()
    {
        return Some(ordinal);
    }
    ledger
        .player_by_name(token)
        .or_else(|| {
            ledger
                .players()
                .iter()
                .find(|p| p.name.eq_ignore_ascii_case(token))
        })
        .map(|p| p.ordinal)
}

fn execute<W: Write>(ledger: &mut SessionLedger, command: Command, out: &mut W) -> Result<()> {
    match command {
        Command::Draw { player, count } => {
            record(ledger, &player, ActionKind::Draw, count, out)?;
        }
        Command::Win { player } => {
            record(ledger, &player, ActionKind::Win, 1, out)?;
        }
        Command::Undo => match ledger.undo_last() {
            Ok(UndoOutcome::Undone(undone)) => writeln!(
                out,
                "Undid {} {} for {}",
                undone.kind, undone.magnitude, undone.player
            )?,
            Ok(UndoOutcome::NothingToUndo) => writeln!(out, "Nothing to undo")?,
            Err(e) => writeln!(out, "warning: undo applied but not saved: {}", e)?,
        },
        Command::Status => write!(out, "{}", status(ledger))?,
        Command::Time => writeln!(out, "{}", format::elapsed(ledger.elapsed_time()))?,
        Command::Help => writeln!(out, "{}", HELP)?,
        Command::Quit => {}
    }
    Ok(())
}

fn record<W: Write>(
    ledger: &mut SessionLedger,
    token: &str,
    kind: ActionKind,
    count: u32,
    out: &mut W,
) -> Result<()> {
    let Some(ordinal) = resolve_player(ledger, token) else {
        writeln!(out, "unknown player: {}", token)?;
        return Ok(());
    };

    match ledger.apply_action(Some(ordinal), kind, count) {
        Ok(Some(entry)) => {
            let name = ledger
                .player(ordinal)
                .map(|p| p.name.as_str())
                .unwrap_or(token);
            match kind {
                ActionKind::Draw => {
                    writeln!(out, "{} draws {} ({} cards)", name, count, entry.value)?
                }
                _ => writeln!(out, "{} wins ({} wins)", name, entry.value)?,
            }
        }
        Ok(None) => writeln!(out, "unknown player: {}", token)?,
        Err(e @ LedgerError::OutOfRange(_)) => writeln!(out, "cannot record: {}", e)?,
        Err(e) => writeln!(out, "warning: action recorded but not saved: {}", e)?,
    }
    Ok(())
}

fn status(ledger: &SessionLedger) -> String {
    let mut out = format!("Play time {}\n", format::elapsed(ledger.elapsed_time()));
    for p in ledger.players() {
        out.push_str(&format!(
            "  #{} {:<12}{:>4} cards{:>4} wins\n",
            p.ordinal, p.name, p.cards, p.wins
        ));
    }
    out
}
