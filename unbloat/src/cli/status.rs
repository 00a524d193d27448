// unbloat/src/cli/status.rs
use std::time::{Duration, Instant};

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::broadcast;
use unbloat_common::model::{BatchEvent, Direction, OperationResult};

fn past_tense(direction: Direction) -> &'static str {
    match direction {
        Direction::Remove => "Uninstalled",
        Direction::Restore => "Reinstalled",
    }
}

/// One line of output for a finished package.
pub fn render_result_line(direction: Direction, package_id: &str, result: &OperationResult) -> String {
    if result.is_success() {
        match &result.detail {
            Some(detail) => format!("{} {} ({})", "✓".green(), package_id.cyan(), detail.dimmed()),
            None => format!("{} {} {}", "✓".green(), past_tense(direction), package_id.cyan()),
        }
    } else {
        format!(
            "{} {} {}: {}",
            "✗".red().bold(),
            "Failed".red(),
            package_id.cyan(),
            result.detail.as_deref().unwrap_or("no detail").red()
        )
    }
}

fn whole_seconds(elapsed: Duration) -> Duration {
    Duration::from_secs(elapsed.as_secs())
}

pub async fn handle_events(mut event_rx: broadcast::Receiver<BatchEvent>) {
    let mut bar: Option<ProgressBar> = None;
    let mut direction = Direction::Remove;
    let started = Instant::now();

    loop {
        match event_rx.recv().await {
            Ok(event) => match event {
                BatchEvent::BatchStarted {
                    direction: batch_direction,
                    total,
                } => {
                    direction = batch_direction;
                    let pb = ProgressBar::new(total as u64);
                    pb.set_style(
                        ProgressStyle::with_template("{bar:30.cyan/blue} {pos}/{len} {msg}")
                            .unwrap_or_else(|_| ProgressStyle::default_bar()),
                    );
                    bar = Some(pb);
                }
                BatchEvent::PackageStarted { package_id } => {
                    if let Some(pb) = &bar {
                        pb.set_message(format!("{direction} {package_id}"));
                    }
                }
                BatchEvent::PackageFinished { package_id, result } => {
                    let line = render_result_line(direction, &package_id, &result);
                    match &bar {
                        Some(pb) => {
                            pb.println(line);
                            pb.inc(1);
                        }
                        None => println!("{line}"),
                    }
                }
                BatchEvent::PackageSkipped { package_id } => {
                    let line = format!("{} Skipped {}", "-".dimmed(), package_id.cyan());
                    match &bar {
                        Some(pb) => {
                            pb.println(line);
                            pb.inc(1);
                        }
                        None => println!("{line}"),
                    }
                }
                BatchEvent::BatchFinished {
                    succeeded,
                    failed,
                    skipped,
                } => {
                    if let Some(pb) = bar.take() {
                        pb.finish_and_clear();
                    }
                    let mut summary = format!("{succeeded} succeeded").green().to_string();
                    if failed > 0 {
                        summary.push_str(&format!(", {}", format!("{failed} failed").red()));
                    }
                    if skipped > 0 {
                        summary.push_str(&format!(", {}", format!("{skipped} skipped").yellow()));
                    }
                    println!(
                        "{} {} in {}",
                        "Batch finished:".bold(),
                        summary,
                        humantime::format_duration(whole_seconds(started.elapsed()))
                    );
                    break;
                }
            },
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!("Progress display lagged behind by {} events", n);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }

    if let Some(pb) = bar {
        pb.finish_and_clear();
    }
}
