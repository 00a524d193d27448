//! Contains the logic for the `update` command.
use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use unbloat_common::error::Result;

use crate::session::Session;

#[derive(clap::Args, Debug)]
pub struct Update {
    /// Download the catalog even if the cached revision is current
    #[arg(long)]
    pub force: bool,
}

impl Update {
    pub async fn run(&self, session: &Session) -> Result<()> {
        tracing::debug!("Running manual catalog update (force={})", self.force);

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.blue} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message("Updating bloatware catalog");
        spinner.enable_steady_tick(Duration::from_millis(100));

        let outcome = session.synchronizer.sync(self.force).await;
        spinner.finish_and_clear();

        let report = match outcome {
            Ok(report) => report,
            Err(e) => {
                tracing::error!("Catalog update failed: {}", e);
                return Err(e);
            }
        };

        if report.refreshed {
            println!(
                "{} Catalog updated to revision {} ({} packages)",
                "✓".green(),
                report.catalog.revision().cyan(),
                report.catalog.len()
            );
            if let Some(notice) = &report.notice {
                println!("{} {}", "Warning:".yellow(), notice);
            }
        } else if let Some(notice) = &report.notice {
            println!(
                "{} Could not refresh the catalog, keeping revision {}: {}",
                "Warning:".yellow(),
                report.catalog.revision().cyan(),
                notice
            );
        } else {
            println!(
                "{} Catalog is up to date at revision {} ({} packages)",
                "✓".green(),
                report.catalog.revision().cyan(),
                report.catalog.len()
            );
        }
        Ok(())
    }
}
