//! Contribution install command

use anyhow::Result;

use super::operation::{self, Request};
use super::{GlobalOptions, Session};
use crate::cli::TargetArgs;

/// Install the available version of a contribution
pub async fn run(args: TargetArgs, global: &GlobalOptions) -> Result<()> {
    let session = Session::open(global)?;
    let id = session.resolve(&args.name, args.kind)?;
    operation::run(session, global, id, Request::Install).await
}
