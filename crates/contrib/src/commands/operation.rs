//! Runs one controller operation in the foreground
//!
//! Progress is rendered with an indicatif bar, Ctrl-C cancels the
//! operation through the controller and the listing is saved once the
//! terminal report arrives, whatever the outcome.

use anyhow::{anyhow, bail, Result};
use contrib_core::types::ContributionId;
use contrib_lifecycle::{
    Controller, FnObserver, Outcome, Progress, StatusNotice, TerminalReport,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use super::{GlobalOptions, Session};
use crate::output;

#[derive(Debug, Clone, Copy)]
pub(super) enum Request {
    Install,
    Update,
    Remove,
}

impl Request {
    fn verb(self) -> &'static str {
        match self {
            Request::Install => "install",
            Request::Update => "update",
            Request::Remove => "remove",
        }
    }
}

enum Update {
    Progress(Progress),
    Terminal(Box<TerminalReport>),
}

pub(super) async fn run(
    session: Session,
    global: &GlobalOptions,
    id: ContributionId,
    request: Request,
) -> Result<()> {
    let controller = session.controller()?;
    let mut updates = watch(&controller, &id);

    let accepted = match request {
        Request::Install => controller.request_install(&id),
        Request::Update => controller.request_update(&id),
        Request::Remove => controller.request_remove(&id),
    }
    .map_err(|reason| anyhow!("Cannot {} {}: {}", request.verb(), id, reason))?;

    let label = format!("{} {}", accepted.state, id);
    let bar = output::operation_bar(&label, global.quiet);
    let mut cancelling = false;

    let report = loop {
        tokio::select! {
            update = updates.recv() => match update {
                Some(Update::Progress(Progress::Starting)) => bar.set_position(0),
                Some(Update::Progress(Progress::Running { percent: Some(percent) })) => {
                    bar.set_position(u64::from(percent));
                }
                Some(Update::Progress(Progress::Running { percent: None })) => {
                    bar.set_message(format!("{} (working)", label));
                }
                Some(Update::Terminal(report)) => break *report,
                None => bail!("{} ended without a result", label),
            },
            _ = tokio::signal::ctrl_c(), if !cancelling => {
                cancelling = true;
                bar.set_message(format!("{} (cancelling)", label));
                controller.cancel(&id);
            }
        }
    };
    bar.finish_and_clear();

    session.save()?;
    report_outcome(&controller, &report, request)
}

/// Forward this contribution's progress and terminal report to a channel
fn watch(controller: &Controller, id: &ContributionId) -> mpsc::UnboundedReceiver<Update> {
    let (tx, rx) = mpsc::unbounded_channel();
    let progress_tx = tx.clone();

    controller.subscribe(
        id,
        Arc::new(FnObserver::new(
            move |_, progress| {
                let _ = progress_tx.send(Update::Progress(progress));
            },
            move |_, report| {
                let _ = tx.send(Update::Terminal(Box::new(report.clone())));
            },
        )),
    );
    rx
}

fn report_outcome(controller: &Controller, report: &TerminalReport, request: Request) -> Result<()> {
    let record = &report.record;
    debug!(
        contribution = %report.id,
        restart_suggested = report.restart_suggested,
        update_enabled = report.update_enabled,
        "Operation ended: {}",
        report.outcome
    );

    match &report.outcome {
        Outcome::Finished => {
            let notice = StatusNotice::for_record(record);
            match (request, notice.message()) {
                (_, Some(message)) => output::success(&format!("{}: {}", report.id, message)),
                (Request::Remove, None) => output::success(&format!("Removed {}", report.id)),
                (_, None) => output::success(&format!(
                    "Installed {} {}",
                    report.id,
                    contrib_lifecycle::display_version(&record.version)
                )),
            }
        }
        Outcome::Cancelled => output::warning(&format!("Cancelled {} of {}", request.verb(), report.id)),
        Outcome::Failed(message) => {
            return Err(anyhow!("Failed to {} {}: {}", request.verb(), report.id, message));
        }
    }

    if report.restart_suggested && controller.request_restart() {
        output::info("Restart the host application to complete pending changes");
    }
    Ok(())
}
