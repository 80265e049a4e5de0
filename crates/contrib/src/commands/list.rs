//! Contribution list command

use anyhow::{Context, Result};
use contrib_core::types::ContributionRecord;
use contrib_lifecycle::{display_version, ContributionState, Listing, StatusNotice};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use super::{GlobalOptions, Session};
use crate::cli::ListArgs;
use crate::output;

/// Row for one contribution
#[derive(Tabled, Serialize)]
struct ContributionRow {
    name: String,
    #[tabled(rename = "type")]
    kind: String,
    #[tabled(rename = "installed")]
    installed_version: String,
    #[tabled(rename = "latest")]
    latest_version: String,
    status: String,
}

impl ContributionRow {
    fn new(record: &ContributionRecord, listing: &Listing) -> Self {
        let installed_version = if record.is_installed() {
            display_version(&record.version)
        } else {
            "-".to_string()
        };
        let latest_version = listing
            .latest_version(&record.id)
            .map(|version| display_version(&version))
            .unwrap_or_else(|| "-".to_string());

        let mut status = match StatusNotice::for_record(record).message() {
            Some(message) => message.to_string(),
            None => ContributionState::of(record).to_string(),
        };
        if listing.has_update(&record.id) {
            status.push_str(", update available");
        }

        Self {
            name: record.name().to_string(),
            kind: record.kind().to_string(),
            installed_version,
            latest_version,
            status,
        }
    }
}

/// List contributions
///
/// Supports:
/// - All known contributions: `contrib list`
/// - One type: `contrib list --kind modes`
/// - Installed only: `contrib list --installed`
/// - Updates only: `contrib list --updates`
/// - JSON output: `contrib list --json`
pub fn run(args: ListArgs, global: &GlobalOptions) -> Result<()> {
    let session = Session::open(global)?;
    let listing = session.listing();

    let rows: Vec<ContributionRow> = listing
        .snapshot()
        .iter()
        .filter(|record| args.kind.is_none_or(|kind| record.kind() == kind))
        .filter(|record| !args.installed || record.is_installed())
        .filter(|record| !args.updates || listing.has_update(&record.id))
        .map(|record| ContributionRow::new(record, listing))
        .collect();

    if args.json {
        let json = serde_json::to_string_pretty(&rows).context("Failed to serialize list")?;
        println!("{}", json);
        return Ok(());
    }

    if listing.has_list_download_failed() {
        output::warning("The contribution list could not be downloaded; installs and updates are disabled");
    }

    if rows.is_empty() {
        output::info("No contributions found");
        return Ok(());
    }

    let mut table = Table::new(&rows);
    table.with(Style::sharp());
    println!("{}", table);

    let installed = rows.iter().filter(|row| row.installed_version != "-").count();
    output::info(&format!("{} contributions, {} installed", rows.len(), installed));
    Ok(())
}
