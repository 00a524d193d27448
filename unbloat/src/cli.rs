// unbloat/src/cli.rs
//! Defines the command-line argument structure using clap.
use clap::{ArgAction, Parser, Subcommand};
use unbloat_common::error::Result;

pub mod batch;
pub mod list;
pub mod reinstall;
pub mod settings;
pub mod status;
pub mod uninstall;
pub mod update;

use crate::cli::list::List;
use crate::cli::reinstall::Reinstall;
use crate::cli::settings::Settings;
use crate::cli::uninstall::Uninstall;
use crate::cli::update::Update;
use crate::session::Session;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, name = "unbloat", bin_name = "unbloat")]
#[command(propagate_version = true)]
pub struct CliArgs {
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Refresh the bloatware catalog
    Update(Update),
    /// List device packages with their catalog classification
    List(List),
    /// Uninstall packages for the configured user
    Uninstall(Uninstall),
    /// Restore previously uninstalled packages
    Reinstall(Reinstall),
    /// Show or change stored preferences
    Settings(Settings),
}

impl Command {
    /// Whether the device inventory should leave out user-installed apps.
    pub fn system_only(&self) -> bool {
        match self {
            Self::List(command) => !command.all,
            Self::Uninstall(command) => !command.all,
            Self::Reinstall(command) => !command.all,
            Self::Update(_) | Self::Settings(_) => true,
        }
    }

    pub async fn run(&self, session: &Session) -> Result<()> {
        match self {
            Self::Update(command) => command.run(session).await,
            Self::List(command) => command.run(session).await,
            Self::Uninstall(command) => command.run(session).await,
            Self::Reinstall(command) => command.run(session).await,
            Self::Settings(command) => command.run(session),
        }
    }
}

#[cfg(test)]
mod tests {
    use unbloat_common::model::RemovalRisk;

    use super::*;

    #[test]
    fn test_verbose_is_global_and_counted() {
        let args = CliArgs::try_parse_from(["unbloat", "list", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
        assert!(matches!(args.command, Command::List(_)));
    }

    #[test]
    fn test_uninstall_takes_names_and_yes() {
        let args =
            CliArgs::try_parse_from(["unbloat", "uninstall", "--yes", "com.a", "com.b"]).unwrap();
        match args.command {
            Command::Uninstall(cmd) => {
                assert!(cmd.yes);
                assert_eq!(cmd.names, vec!["com.a".to_string(), "com.b".to_string()]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_all_includes_user_apps() {
        let args = CliArgs::try_parse_from(["unbloat", "list"]).unwrap();
        assert!(args.command.system_only());

        for argv in [
            &["unbloat", "list", "--all"][..],
            &["unbloat", "uninstall", "--all", "com.user.app"],
            &["unbloat", "reinstall", "--all", "com.user.app"],
        ] {
            let args = CliArgs::try_parse_from(argv).unwrap();
            assert!(!args.command.system_only(), "{argv:?}");
        }
    }

    #[test]
    fn test_uninstall_requires_a_name() {
        assert!(CliArgs::try_parse_from(["unbloat", "uninstall"]).is_err());
    }

    #[test]
    fn test_list_risk_filter_parses_labels() {
        let args = CliArgs::try_parse_from(["unbloat", "list", "--risk", "expert"]).unwrap();
        match args.command {
            Command::List(cmd) => assert_eq!(cmd.risk, Some(RemovalRisk::Expert)),
            other => panic!("unexpected command {other:?}"),
        }
        assert!(CliArgs::try_parse_from(["unbloat", "list", "--risk", "bogus"]).is_err());
    }

    #[test]
    fn test_settings_flags() {
        let args =
            CliArgs::try_parse_from(["unbloat", "settings", "--auto-update", "false"]).unwrap();
        match args.command {
            Command::Settings(cmd) => {
                assert_eq!(cmd.auto_update, Some(false));
                assert_eq!(cmd.confirm, None);
                assert!(!cmd.reset_catalog);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
