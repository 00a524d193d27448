use clap::Args;
use colored::Colorize;
use prettytable::{format, Cell, Row, Table};
use serde_json::json;
use unbloat_common::error::Result;
use unbloat_common::model::{AppView, PackageEntry, RemovalRisk, RiskFilter};

use crate::session::Session;

const DESCRIPTION_WIDTH: usize = 60;

#[derive(Args, Debug)]
pub struct List {
    /// Show packages that are uninstalled for the user instead of installed ones
    #[arg(long)]
    pub uninstalled: bool,

    /// Only show packages of this removal risk (recommended, advanced, expert, unsafe, system, unknown)
    #[arg(long)]
    pub risk: Option<RemovalRisk>,

    /// Print the listing as JSON
    #[arg(long)]
    pub json: bool,

    /// Include user-installed apps, not only system packages
    #[arg(short, long)]
    pub all: bool,
}

impl List {
    pub async fn run(&self, session: &Session) -> Result<()> {
        session.prepare().await?;

        let tracker = &session.tracker;
        tracker.switch_view(if self.uninstalled {
            AppView::Uninstalled
        } else {
            AppView::Installed
        });
        if let Some(risk) = self.risk {
            tracker.set_filter(RiskFilter::Only(risk));
        }

        let entries = tracker.visible_packages();

        if self.json {
            let rows: Vec<_> = entries.iter().map(entry_json).collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
            return Ok(());
        }

        if entries.is_empty() {
            println!("{}", "No packages match".yellow());
            return Ok(());
        }

        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
        table.add_row(Row::new(vec![
            Cell::new("Package").style_spec("b"),
            Cell::new("Risk").style_spec("b"),
            Cell::new("List").style_spec("b"),
            Cell::new("Description").style_spec("b"),
        ]));
        for entry in &entries {
            let (risk, origin, description) = match &entry.classification {
                Some(record) => (
                    record.removal_risk,
                    record.install_origin.as_str(),
                    record.description.as_str(),
                ),
                None => (RemovalRisk::Unknown, "-", ""),
            };
            table.add_row(Row::new(vec![
                Cell::new(&entry.package_id).style_spec("Fb"),
                Cell::new(risk.as_str()).style_spec(risk_style(risk)),
                Cell::new(origin),
                Cell::new(&textwrap::fill(description, DESCRIPTION_WIDTH)),
            ]));
        }
        table.printstd();

        let noun = if entries.len() == 1 { "package" } else { "packages" };
        let state = if self.uninstalled { "uninstalled" } else { "installed" };
        println!("{}", format!("{} {noun} {state}", entries.len()).bold());
        Ok(())
    }
}

fn risk_style(risk: RemovalRisk) -> &'static str {
    match risk {
        RemovalRisk::Recommended => "Fg",
        RemovalRisk::Advanced => "Fc",
        RemovalRisk::Expert => "Fy",
        RemovalRisk::Unsafe => "Fr",
        RemovalRisk::System => "Fm",
        RemovalRisk::Unknown => "",
    }
}

fn entry_json(entry: &PackageEntry) -> serde_json::Value {
    json!({
        "package": entry.package_id,
        "status": entry.status.to_string(),
        "classification": entry.classification,
    })
}
