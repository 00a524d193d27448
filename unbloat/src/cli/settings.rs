//! Contains the logic for the `settings` command.
use clap::Args;
use colored::Colorize;
use unbloat_common::error::Result;
use unbloat_common::preferences::Preferences;
use unbloat_core::CatalogStore;

use crate::session::Session;

#[derive(Args, Debug)]
pub struct Settings {
    /// Refresh the catalog automatically before listing or changing packages
    #[arg(long, value_name = "BOOL")]
    pub auto_update: Option<bool>,

    /// Ask before uninstalling
    #[arg(long, value_name = "BOOL")]
    pub confirm: Option<bool>,

    /// Delete the cached catalog so the next run downloads it again
    #[arg(long)]
    pub reset_catalog: bool,
}

impl Settings {
    /// Returns the preferences with the requested changes applied, if any.
    fn apply(&self, current: Preferences) -> Option<Preferences> {
        if self.auto_update.is_none() && self.confirm.is_none() {
            return None;
        }
        let mut updated = current;
        if let Some(value) = self.auto_update {
            updated.auto_update_catalog = value;
        }
        if let Some(value) = self.confirm {
            updated.confirm_before_uninstall = value;
        }
        Some(updated)
    }

    pub fn run(&self, session: &Session) -> Result<()> {
        let prefs = match self.apply(session.preferences) {
            Some(updated) => {
                session.store.store_preferences(&updated)?;
                tracing::debug!("Saved preferences: {:?}", updated);
                updated
            }
            None => session.preferences,
        };

        if self.reset_catalog {
            session.store.clear_catalog()?;
            println!("{} Cached catalog removed", "✓".green());
        }

        println!("{:<22} {}", "auto-update catalog".bold(), prefs.auto_update_catalog);
        println!("{:<22} {}", "confirm uninstall".bold(), prefs.confirm_before_uninstall);
        println!("{:<22} {}", "catalog revision".bold(), stored_revision(&session.store));
        println!("{:<22} {}", "state directory".bold(), session.store.dir().display());
        Ok(())
    }
}

/// Revision of the cached catalog, as shown to the user.
fn stored_revision(store: &CatalogStore) -> String {
    match store.load_revision() {
        Ok(Some(revision)) => revision,
        Ok(None) => "none (run `unbloat update`)".to_string(),
        Err(e) => {
            tracing::warn!("Could not read stored catalog revision: {}", e);
            "unreadable".to_string()
        }
    }
}
