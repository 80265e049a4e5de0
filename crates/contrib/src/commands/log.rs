//! Lifecycle log command

use anyhow::{Context, Result};
use console::style;
use contrib_lifecycle::{EventEnvelope, LifecycleEvent};

use super::{GlobalOptions, Session};
use crate::cli::LogArgs;
use crate::output;

/// Maximum contribution id display width in log output
const LOG_ID_WIDTH: usize = 24;

/// Maximum error message display width before truncation
const LOG_ERROR_MESSAGE_WIDTH: usize = 120;

/// Show recorded lifecycle events, oldest first
pub fn run(args: LogArgs, global: &GlobalOptions) -> Result<()> {
    let session = Session::open(global)?;
    let id = args
        .name
        .as_deref()
        .map(|name| session.resolve(name, args.kind))
        .transpose()?;

    let events = session
        .journal()
        .history(id.as_ref(), Some(args.lines))
        .context("Failed to read lifecycle journal")?;

    if events.is_empty() {
        if !args.json {
            output::info("No events found");
        }
        return Ok(());
    }

    for envelope in &events {
        if args.json {
            let json = serde_json::to_string(envelope).context("Failed to serialize event")?;
            println!("{}", json);
        } else {
            print_log_line(envelope);
        }
    }
    Ok(())
}

/// Print a single log line with color coding
fn print_log_line(envelope: &EventEnvelope) {
    let timestamp = envelope.timestamp.format("%Y-%m-%d %H:%M:%S");
    let name = envelope.event.name();
    let label = format!("{} {}", event_icon(name), name);

    let colored = if name.ends_with("_completed") || name == "undo_applied" {
        style(label).green()
    } else if name.ends_with("_failed") || envelope.event.error_message().is_some() {
        style(label).red()
    } else if name.ends_with("_cancelled") {
        style(label).yellow()
    } else {
        style(label).blue()
    };

    println!(
        "{} {:<width$} {} {}",
        style(timestamp).dim(),
        envelope.contribution.to_string(),
        colored,
        style(format_event(&envelope.event)).dim(),
        width = LOG_ID_WIDTH,
    );
}

fn event_icon(name: &str) -> &'static str {
    match name {
        s if s.ends_with("_completed") || s == "undo_applied" => "\u{2713}",
        s if s.ends_with("_failed") => "\u{2717}",
        s if s.ends_with("_cancelled") => "!",
        _ => "\u{25cb}",
    }
}

/// One-line summary of an event
pub(super) fn format_event(event: &LifecycleEvent) -> String {
    match event {
        LifecycleEvent::InstallStarted { version, .. } => format!("Install started (v{})", version),
        LifecycleEvent::InstallCompleted {
            version,
            duration_secs,
        } => format!("Installed v{} ({}s)", version, duration_secs),
        LifecycleEvent::InstallFailed {
            version,
            error_message,
            ..
        } => format!("Install of v{} failed: {}", version, truncate(error_message)),
        LifecycleEvent::InstallCancelled { version } => {
            format!("Install of v{} cancelled", version)
        }
        LifecycleEvent::UpdateStarted {
            from_version,
            to_version,
            deferred,
        } => format!(
            "Update started (v{} \u{2192} v{}{})",
            from_version,
            to_version,
            if *deferred { ", on restart" } else { "" }
        ),
        LifecycleEvent::UpdateCompleted {
            from_version,
            to_version,
            deferred: true,
            ..
        } => format!("Update v{} \u{2192} v{} waits for restart", from_version, to_version),
        LifecycleEvent::UpdateCompleted {
            from_version,
            to_version,
            duration_secs,
            ..
        } => format!(
            "Updated v{} \u{2192} v{} ({}s)",
            from_version, to_version, duration_secs
        ),
        LifecycleEvent::UpdateFailed {
            from_version,
            to_version,
            error_message,
            ..
        } => format!(
            "Update v{} \u{2192} v{} failed: {}",
            from_version,
            to_version,
            truncate(error_message)
        ),
        LifecycleEvent::UpdateCancelled {
            from_version,
            to_version,
        } => format!("Update v{} \u{2192} v{} cancelled", from_version, to_version),
        LifecycleEvent::RemoveStarted { version, .. } => format!("Remove started (v{})", version),
        LifecycleEvent::RemoveCompleted {
            version,
            deferred: true,
            ..
        } => format!("Removal of v{} waits for restart", version),
        LifecycleEvent::RemoveCompleted {
            version,
            duration_secs,
            ..
        } => format!("Removed v{} ({}s)", version, duration_secs),
        LifecycleEvent::RemoveFailed {
            version,
            error_message,
            ..
        } => format!("Remove of v{} failed: {}", version, truncate(error_message)),
        LifecycleEvent::RemoveCancelled { version } => format!("Remove of v{} cancelled", version),
        LifecycleEvent::UndoApplied { version, cleared } => {
            format!("Withdrew {} (v{} stays)", cleared, version)
        }
        LifecycleEvent::PendingResolved {
            version,
            change,
            error_message,
        } => {
            let what = change.map_or("restart flag".to_string(), |change| change.to_string());
            match error_message {
                Some(message) => format!("Could not apply {}: {}", what, truncate(message)),
                None => format!("Applied {} (v{})", what, version),
            }
        }
    }
}

fn truncate(message: &str) -> String {
    if message.chars().count() <= LOG_ERROR_MESSAGE_WIDTH {
        return message.to_string();
    }
    let cut: String = message.chars().take(LOG_ERROR_MESSAGE_WIDTH - 3).collect();
    format!("{}...", cut)
}
