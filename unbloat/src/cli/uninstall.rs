use clap::Args;
use unbloat_common::error::Result;
use unbloat_common::model::Direction;

use crate::cli::batch::run_batch_command;
use crate::session::Session;

#[derive(Args, Debug)]
pub struct Uninstall {
    /// The package ids to uninstall for the configured user
    #[arg(required = true)]
    pub names: Vec<String>,

    /// Do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Include user-installed apps, not only system packages
    #[arg(short, long)]
    pub all: bool,
}

impl Uninstall {
    pub async fn run(&self, session: &Session) -> Result<()> {
        tracing::debug!("Uninstalling {} package(s)", self.names.len());
        run_batch_command(session, &self.names, Direction::Remove, self.yes).await
    }
}
