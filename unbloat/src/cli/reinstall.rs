use clap::Args;
use unbloat_common::error::Result;
use unbloat_common::model::Direction;

use crate::cli::batch::run_batch_command;
use crate::session::Session;

#[derive(Args, Debug)]
pub struct Reinstall {
    /// The package ids to restore for the configured user
    #[arg(required = true)]
    pub names: Vec<String>,

    /// Include user-installed apps, not only system packages
    #[arg(short, long)]
    pub all: bool,
}

impl Reinstall {
    pub async fn run(&self, session: &Session) -> Result<()> {
        run_batch_command(session, &self.names, Direction::Restore, true).await
    }
}
