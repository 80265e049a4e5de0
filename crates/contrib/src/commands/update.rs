//! Contribution update command

use anyhow::Result;

use super::operation::{self, Request};
use super::{GlobalOptions, Session};
use crate::cli::TargetArgs;

/// Update to the latest version.
///
/// Modes and tools are loaded by the running host, so their update is
/// flagged and carried out by `resolve-pending` at the next start.
pub async fn run(args: TargetArgs, global: &GlobalOptions) -> Result<()> {
    let session = Session::open(global)?;
    let id = session.resolve(&args.name, args.kind)?;
    operation::run(session, global, id, Request::Update).await
}
