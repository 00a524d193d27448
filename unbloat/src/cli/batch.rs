// unbloat/src/cli/batch.rs
//! Shared runner behind `uninstall` and `reinstall`.
use std::sync::Arc;

use colored::Colorize;
use dialoguer::Confirm;
use tokio::sync::broadcast;
use unbloat_common::error::{Result, UnbloatError};
use unbloat_common::model::{BatchReport, Direction, RemovalRisk, SelectionSet};
use unbloat_core::adb::validate_package_id;
use unbloat_core::{BatchOrchestrator, CancellationToken, PrivilegedChannel, StatusTracker};

use crate::cli::status;
use crate::session::Session;

/// Selects `names` in the view `direction` starts from. Names that are
/// malformed, unknown to the device, or already in the target state are
/// returned with the reason they were rejected.
pub fn select_targets(
    tracker: &StatusTracker,
    names: &[String],
    direction: Direction,
) -> (SelectionSet, Vec<(String, String)>) {
    tracker.switch_view(direction.source_view());
    let mut rejected = Vec::new();
    for name in names {
        if let Err(e) = validate_package_id(name) {
            rejected.push((name.clone(), e.to_string()));
            continue;
        }
        if tracker.select(name) {
            continue;
        }
        let reason = match tracker.status(name) {
            Some(status) => format!("already {status}"),
            None => "not found on the device".to_string(),
        };
        rejected.push((name.clone(), reason));
    }
    (tracker.selection(), rejected)
}

fn print_plan(session: &Session, selection: &SelectionSet, direction: Direction) -> bool {
    println!(
        "{} {} package(s):",
        format!("About to {direction}").bold(),
        selection.len()
    );
    let catalog = session.synchronizer.current();
    let mut risky = false;
    for package_id in selection {
        let risk = catalog
            .as_ref()
            .and_then(|c| c.get(package_id))
            .map(|r| r.removal_risk)
            .unwrap_or(RemovalRisk::Unknown);
        let risk_label = match risk {
            RemovalRisk::Expert | RemovalRisk::Unsafe => {
                risky = true;
                risk.as_str().red().bold()
            }
            RemovalRisk::Recommended => risk.as_str().green(),
            _ => risk.as_str().normal(),
        };
        println!("  {} [{}]", package_id.cyan(), risk_label);
    }
    risky && direction == Direction::Remove
}

fn confirm(prompt: &str) -> Result<bool> {
    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| UnbloatError::Generic(format!("Could not read confirmation: {e}")))
}

pub async fn run_batch_command(
    session: &Session,
    names: &[String],
    direction: Direction,
    assume_yes: bool,
) -> Result<()> {
    session.prepare().await?;

    let (selection, rejected) = select_targets(&session.tracker, names, direction);
    for (name, reason) in &rejected {
        eprintln!("{} Skipping {}: {}", "Warning:".yellow(), name.cyan(), reason);
    }
    if selection.is_empty() {
        return Err(UnbloatError::Generic(format!(
            "Nothing to {direction}: none of the given packages can be selected"
        )));
    }

    let risky = print_plan(session, &selection, direction);
    if risky {
        println!(
            "{} {}",
            "Warning:".yellow().bold(),
            RemovalRisk::Expert.explanation()
        );
    }
    let must_confirm = direction == Direction::Remove
        && session.preferences.confirm_before_uninstall
        && !assume_yes;
    if must_confirm && !confirm("Proceed?")? {
        println!("{}", "Aborted, nothing was changed".yellow());
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("{}", "Interrupted, finishing the current package...".yellow());
                cancel.cancel();
            }
        })
    };

    let (event_tx, event_rx) = broadcast::channel(100);
    let display = tokio::spawn(status::handle_events(event_rx));

    let channel: Arc<dyn PrivilegedChannel> = session.bridge.clone();
    let orchestrator = BatchOrchestrator::new(
        channel,
        Arc::clone(&session.tracker),
        session.config.op_timeout,
    )
    .with_events(event_tx);
    let outcome = orchestrator.run_batch(&selection, direction, &cancel).await;
    drop(orchestrator);

    ctrl_c.abort();
    if let Err(e) = display.await {
        tracing::warn!("Progress display task failed: {}", e);
    }

    let report = match outcome {
        Ok(report) => report,
        Err(UnbloatError::PermissionDenied) => {
            session.bridge.request_permission().await;
            eprintln!(
                "{} Authorise this computer on the device (USB debugging prompt), then run the command again.",
                "Hint:".cyan().bold()
            );
            return Err(UnbloatError::PermissionDenied);
        }
        Err(e) => return Err(e),
    };

    summarize(&report, &rejected)
}

fn summarize(report: &BatchReport, rejected: &[(String, String)]) -> Result<()> {
    let failures: Vec<_> = report
        .results
        .iter()
        .filter(|(_, result)| !result.is_success())
        .collect();

    if failures.is_empty() && rejected.is_empty() && report.skipped.is_empty() {
        return Ok(());
    }

    if !failures.is_empty() {
        eprintln!("{}", format!("Failed to {} some packages:", report.direction).red().bold());
        for (package_id, result) in &failures {
            eprintln!(
                "  {} {}: {}",
                "✗".red(),
                package_id.cyan(),
                result.detail.as_deref().unwrap_or("no detail")
            );
        }
    }

    Err(UnbloatError::Generic(format!(
        "{} failed, {} skipped, {} rejected",
        failures.len(),
        report.skipped.len(),
        rejected.len()
    )))
}
