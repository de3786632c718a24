//! Timer-driven autonomous play that streams the narrative log.

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use log::info;
use rabbithole_engine::{Lifecycle, LogEntry};
use serde::Serialize;
use tokio::time::MissedTickBehavior;

use crate::assets::TesterEngine;
use crate::util::{plain_entry, styled_entry};

#[derive(Debug, Clone)]
pub struct LiveOptions {
    pub seed: u64,
    pub tick: Duration,
    pub max_turns: u32,
    pub talents: Vec<String>,
    /// Save slot to continue from instead of starting fresh.
    pub resume: Option<String>,
    /// Save slot written when play stops.
    pub save: Option<String>,
    pub styled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiveSummary {
    pub turns_played: u32,
    pub final_turn: u32,
    pub lifecycle: Lifecycle,
    pub reason: Option<String>,
    pub interrupted: bool,
}

fn write_entries(out: &mut dyn Write, entries: &[LogEntry], styled: bool) -> Result<()> {
    for entry in entries {
        let line = if styled {
            styled_entry(entry)
        } else {
            plain_entry(entry)
        };
        writeln!(out, "{line}")?;
    }
    out.flush()?;
    Ok(())
}

/// Play one turn per tick until the run leaves `Active`, `max_turns` pass or Ctrl-C arrives.
///
/// # Errors
///
/// Returns an error if the resume slot is missing or unreadable, or output cannot be written.
pub async fn run_live(
    engine: &TesterEngine,
    opts: &LiveOptions,
    out: &mut dyn Write,
) -> Result<LiveSummary> {
    let mut session = match &opts.resume {
        Some(slot) => engine
            .resume_session(slot, opts.seed)?
            .with_context(|| format!("save slot `{slot}` is empty"))?,
        None => engine.create_session(opts.seed, &opts.talents),
    };
    let backlog: Vec<LogEntry> = session.state().log.iter().cloned().collect();
    write_entries(out, &backlog, opts.styled)?;

    let mut ticker = tokio::time::interval(opts.tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut turns_played = 0;
    let mut interrupted = false;
    while session.lifecycle() == Lifecycle::Active && turns_played < opts.max_turns {
        tokio::select! {
            _ = ticker.tick() => {
                let report = session.run_turn();
                turns_played += 1;
                write_entries(out, &report.entries, opts.styled)?;
            }
            _ = &mut ctrl_c => {
                info!("live run interrupted on turn {}", session.state().turn);
                interrupted = true;
                break;
            }
        }
    }

    if let Some(slot) = &opts.save {
        engine.save_game(slot, session.state())?;
        info!("saved turn {} to slot `{slot}`", session.state().turn);
    }

    let state = session.state();
    Ok(LiveSummary {
        turns_played,
        final_turn: state.turn,
        lifecycle: state.lifecycle(),
        reason: state.death_reason.clone(),
        interrupted,
    })
}
