//! Resolve-pending command
//!
//! Meant to run when the host starts, before anything else touches the
//! contributions folder.

use anyhow::{bail, Result};
use contrib_core::types::{ContributionRecord, PendingChange};
use contrib_lifecycle::PendingResolver;
use std::sync::Arc;

use super::{GlobalOptions, Session};
use crate::cli::ResolvePendingArgs;
use crate::output;

/// Apply removals and updates deferred to restart
pub async fn run(args: ResolvePendingArgs, global: &GlobalOptions) -> Result<()> {
    let session = Session::open(global)?;

    let pending: Vec<ContributionRecord> = session
        .listing()
        .snapshot()
        .into_iter()
        .filter(|record| !record.flags().is_empty())
        .collect();

    if pending.is_empty() {
        output::info("Nothing waits for a restart");
        return Ok(());
    }

    if args.dry_run {
        output::header("Pending changes");
        for record in &pending {
            output::kv(&record.id.to_string(), describe(record));
        }
        return Ok(());
    }

    let resolver = PendingResolver::new(Arc::clone(session.listing()), Arc::new(session.pipeline()?))
        .with_journal(session.journal());
    let summary = resolver.resolve().await;
    session.save()?;

    for id in &summary.removed {
        output::success(&format!("Removed {}", id));
    }
    for id in &summary.updated {
        output::success(&format!("Updated {}", id));
    }
    for id in &summary.activated {
        output::success(&format!("Activated {}", id));
    }
    for (id, message) in &summary.failures {
        output::error(&format!("{}: {}", id, message));
    }

    if !summary.failures.is_empty() {
        bail!(
            "{} pending change(s) could not be applied",
            summary.failures.len()
        );
    }
    Ok(())
}

fn describe(record: &ContributionRecord) -> &'static str {
    match record.flags().pending {
        Some(PendingChange::Deletion) => "remove",
        Some(PendingChange::Update) => "update to the latest version",
        None => "activate",
    }
}
