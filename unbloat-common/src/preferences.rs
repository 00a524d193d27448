use serde::{Deserialize, Serialize};

/// User preference flags, read at startup and saved explicitly on change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub auto_update_catalog: bool,
    pub confirm_before_uninstall: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            auto_update_catalog: true,
            confirm_before_uninstall: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_take_defaults() {
        let prefs: Preferences = serde_json::from_str(r#"{"auto_update_catalog": false}"#).unwrap();
        assert!(!prefs.auto_update_catalog);
        assert!(prefs.confirm_before_uninstall);
    }
}
