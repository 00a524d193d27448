// unbloat-core/src/adb.rs
//! Privileged channel and package inventory backed by `adb`.
//!
//! Uninstalling with `pm uninstall --user <n>` only removes the package for
//! that user; the APK stays on the system partition, which is what makes
//! `install-existing` able to restore it.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::process::Output;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, warn};
use unbloat_aio::run_command_async;
use unbloat_common::config::Config;
use unbloat_common::error::{Result, UnbloatError};
use unbloat_common::model::PackageStatus;

use crate::batch::PrivilegedChannel;
use crate::inventory::PackageInventory;

#[derive(Debug, Clone)]
pub struct AdbBridge {
    adb_path: PathBuf,
    serial: Option<String>,
    user: u32,
    timeout: Duration,
    /// Only list packages from the system partition.
    system_only: bool,
}

impl AdbBridge {
    pub fn new(config: &Config) -> Self {
        Self {
            adb_path: config.adb_path.clone(),
            serial: config.device_serial.clone(),
            user: config.android_user,
            timeout: config.op_timeout,
            system_only: true,
        }
    }

    /// Include user-installed apps in the inventory when `false`.
    pub fn with_system_only(mut self, system_only: bool) -> Self {
        self.system_only = system_only;
        self
    }

    async fn adb(&self, args: &[&str]) -> Result<Output> {
        let mut full_args: Vec<&str> = Vec::with_capacity(args.len() + 2);
        if let Some(serial) = &self.serial {
            full_args.extend(["-s", serial.as_str()]);
        }
        full_args.extend_from_slice(args);
        run_command_async(&self.adb_path, full_args, self.timeout).await
    }

    async fn shell_stdout(&self, args: &[&str]) -> Result<String> {
        let mut shell_args = vec!["shell"];
        shell_args.extend_from_slice(args);
        let output = self.adb(&shell_args).await?;
        if !output.status.success() {
            return Err(UnbloatError::CommandExecError(format!(
                "adb shell {} exited with {}: {}",
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Runs a package-manager command and checks its stdout for `marker`.
    async fn package_command(&self, args: &[&str], package_id: &str, marker: &str) -> bool {
        if let Err(e) = validate_package_id(package_id) {
            error!("{}", e);
            return false;
        }
        let user = self.user.to_string();
        let mut full_args = args.to_vec();
        full_args.extend(["--user", user.as_str(), package_id]);

        match self.shell_stdout(&full_args).await {
            Ok(stdout) if stdout.contains(marker) => true,
            Ok(stdout) => {
                warn!(
                    "'{}' on '{}' did not report success: {}",
                    args.join(" "),
                    package_id,
                    stdout.trim()
                );
                false
            }
            Err(e) => {
                error!("'{}' on '{}' failed: {}", args.join(" "), package_id, e);
                false
            }
        }
    }
}

#[async_trait]
impl PrivilegedChannel for AdbBridge {
    async fn has_permission(&self) -> bool {
        match self.adb(&["get-state"]).await {
            Ok(output) => {
                let state = String::from_utf8_lossy(&output.stdout).trim().to_string();
                debug!("adb device state: {:?}", state);
                output.status.success() && state == "device"
            }
            Err(e) => {
                warn!("Could not query adb device state: {}", e);
                false
            }
        }
    }

    async fn request_permission(&self) {
        match self.adb(&["start-server"]).await {
            Ok(output) if output.status.success() => {
                debug!("adb server started; waiting for the device to be authorised")
            }
            Ok(output) => warn!(
                "adb start-server exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
            Err(e) => warn!("Could not start adb server: {}", e),
        }
    }

    async fn uninstall(&self, package_id: &str) -> bool {
        self.package_command(&["pm", "uninstall"], package_id, "Success")
            .await
    }

    async fn reinstall(&self, package_id: &str) -> bool {
        self.package_command(
            &["cmd", "package", "install-existing"],
            package_id,
            "installed for user",
        )
        .await
    }
}

#[async_trait]
impl PackageInventory for AdbBridge {
    async fn read_statuses(&self) -> Result<HashMap<String, PackageStatus>> {
        let installed_args = list_packages_args(self.system_only, false, self.user);
        let all_args = list_packages_args(self.system_only, true, self.user);
        let installed = self
            .shell_stdout(&installed_args.iter().map(String::as_str).collect::<Vec<_>>())
            .await?;
        let all = self
            .shell_stdout(&all_args.iter().map(String::as_str).collect::<Vec<_>>())
            .await?;
        let statuses = statuses_from_lists(
            &parse_package_list(&installed),
            &parse_package_list(&all),
        );
        debug!(
            "Device reports {} packages (system only: {})",
            statuses.len(),
            self.system_only
        );
        Ok(statuses)
    }
}

/// Package identifiers end up in a remote shell command line; only the
/// characters Android allows in package names are accepted.
pub fn validate_package_id(package_id: &str) -> Result<()> {
    let well_formed = !package_id.is_empty()
        && !package_id.starts_with('.')
        && package_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_');
    if well_formed {
        Ok(())
    } else {
        Err(UnbloatError::InvalidPackageId(package_id.to_string()))
    }
}

/// Arguments for `adb shell pm list packages`. `-s` restricts the listing to
/// system packages, `-u` adds packages uninstalled for the user.
pub fn list_packages_args(system_only: bool, include_uninstalled: bool, user: u32) -> Vec<String> {
    let mut args: Vec<String> = ["pm", "list", "packages"].map(String::from).to_vec();
    if system_only {
        args.push("-s".to_string());
    }
    if include_uninstalled {
        args.push("-u".to_string());
    }
    args.extend(["--user".to_string(), user.to_string()]);
    args
}

/// Parses `pm list packages` output (`package:<id>` per line).
pub fn parse_package_list(stdout: &str) -> BTreeSet<String> {
    stdout
        .lines()
        .filter_map(|line| line.trim().strip_prefix("package:"))
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Everything in `all` but not in `installed` has been uninstalled for the
/// user.
pub fn statuses_from_lists(
    installed: &BTreeSet<String>,
    all: &BTreeSet<String>,
) -> HashMap<String, PackageStatus> {
    all.union(installed)
        .map(|id| {
            let status = if installed.contains(id) {
                PackageStatus::Installed
            } else {
                PackageStatus::Uninstalled
            };
            (id.clone(), status)
        })
        .collect()
}
