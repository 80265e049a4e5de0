//! Undo command

use anyhow::{anyhow, Result};

use super::{GlobalOptions, Session};
use crate::cli::TargetArgs;
use crate::output;

/// Withdraw a pending deletion or update before the restart
pub fn run(args: TargetArgs, global: &GlobalOptions) -> Result<()> {
    let session = Session::open(global)?;
    let id = session.resolve(&args.name, args.kind)?;
    let controller = session.controller()?;

    let accepted = controller
        .request_undo(&id)
        .map_err(|reason| anyhow!("Cannot undo {}: {}", id, reason))?;
    session.save()?;

    output::success(&format!("{} stays installed", id));
    if accepted.restart_pending {
        output::info(&format!(
            "Other {} changes still wait for a restart",
            id.kind
        ));
    }
    Ok(())
}
