//! Contribution remove command

use anyhow::Result;

use super::operation::{self, Request};
use super::{GlobalOptions, Session};
use crate::cli::TargetArgs;

/// Remove an installed contribution
///
/// Supports:
/// - Libraries and examples: deleted right away
/// - Modes and tools: flagged, deleted at the next start (`contrib undo` withdraws)
pub async fn run(args: TargetArgs, global: &GlobalOptions) -> Result<()> {
    let session = Session::open(global)?;
    let id = session.resolve(&args.name, args.kind)?;
    operation::run(session, global, id, Request::Remove).await
}
