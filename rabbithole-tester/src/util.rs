use colored::Colorize;
use rabbithole_engine::{LogEntry, LogKind};

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

/// One log entry as a single plain line.
#[must_use]
pub fn plain_entry(entry: &LogEntry) -> String {
    match &entry.title {
        Some(title) => format!("[turn {}] {title}: {}", entry.turn, entry.text),
        None => format!("[turn {}] {}", entry.turn, entry.text),
    }
}

/// One log entry coloured by kind, for terminals.
#[must_use]
pub fn styled_entry(entry: &LogEntry) -> String {
    let line = plain_entry(entry);
    match entry.kind {
        LogKind::Event => line.bright_white().bold().to_string(),
        LogKind::Choice => line.cyan().to_string(),
        LogKind::Feedback => line.normal().to_string(),
        LogKind::System => line.dimmed().to_string(),
        LogKind::Ending => line.bright_red().bold().to_string(),
    }
}
