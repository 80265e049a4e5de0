//! Contribution status command

use anyhow::{Context, Result};
use contrib_lifecycle::{
    display_version, update_notice, Affordances, ContributionState, OperationState, PrimaryAction,
    StatusNotice,
};

use super::log::format_event;
use super::{GlobalOptions, Session};
use crate::cli::TargetArgs;
use crate::output;

/// Events shown under "Recent activity"
const RECENT_EVENTS: usize = 5;

/// Show state, notices and available actions of one contribution
pub fn run(args: TargetArgs, global: &GlobalOptions) -> Result<()> {
    let session = Session::open(global)?;
    let id = session.resolve(&args.name, args.kind)?;
    let listing = session.listing();
    let record = listing
        .get(&id)
        .with_context(|| format!("{} disappeared from the listing", id))?;

    output::header(&id.to_string());
    output::kv("Type", record.kind().as_str());
    output::kv("State", &ContributionState::of(&record).to_string());
    if record.is_installed() {
        output::kv("Installed", &display_version(&record.version));
    }
    if let Some(latest) = listing.latest_version(&id) {
        output::kv("Latest", &display_version(&latest));
    }
    if let Some(authors) = &record.authors {
        output::kv("Authors", authors);
    }
    if let Some(sentence) = &record.sentence {
        output::kv("About", sentence);
    }
    if let Some(url) = &record.url {
        output::kv("Homepage", url);
    }

    if let Some(message) = StatusNotice::for_record(&record).message() {
        output::warning(message);
    }
    if let Some(notice) = update_notice(listing, &id) {
        output::info(&notice);
    }

    let affordances = Affordances::compute(
        &record,
        OperationState::Idle,
        listing,
        session.config().host.revision,
    );
    output::kv("Actions", &describe_actions(&affordances));

    let events = session
        .journal()
        .history(Some(&id), Some(RECENT_EVENTS))
        .context("Failed to read lifecycle journal")?;
    if !events.is_empty() {
        output::header("Recent activity");
        for envelope in &events {
            println!(
                "  {} {}",
                envelope.timestamp.format("%Y-%m-%d %H:%M:%S"),
                format_event(&envelope.event)
            );
        }
    }

    Ok(())
}

fn describe_actions(affordances: &Affordances) -> String {
    let mut actions = Vec::new();
    if affordances.primary_enabled {
        actions.push(affordances.primary.to_string());
    }
    if affordances.undo_available && affordances.primary != PrimaryAction::Undo {
        actions.push(PrimaryAction::Undo.to_string());
    }
    if affordances.update_enabled {
        actions.push("update".to_string());
    }

    if actions.is_empty() {
        "none".to_string()
    } else {
        actions.join(", ")
    }
}
