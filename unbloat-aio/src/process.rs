// unbloat-aio/src/process.rs
use std::ffi::OsStr;
use std::process::{Output, Stdio};
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, error};
use unbloat_common::error::{Result, UnbloatError};

/// Runs an external command, capturing its output, bounded by `timeout`.
///
/// A non-zero exit status is not an error here; callers inspect the output.
/// On timeout the child is killed.
pub async fn run_command_async<S, I, A>(program: S, args: I, timeout: Duration) -> Result<Output>
where
    S: AsRef<OsStr>,
    I: IntoIterator<Item = A>,
    A: AsRef<OsStr>,
{
    let program = program.as_ref();
    let args: Vec<_> = args.into_iter().map(|a| a.as_ref().to_owned()).collect();
    debug!("Async Running command: {:?} {:?}", program, args);

    let mut cmd = Command::new(program);
    cmd.args(&args);
    cmd.kill_on_drop(true);
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.stdin(Stdio::null());

    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => {
            if !output.status.success() {
                debug!("Async Command failed with status: {}", output.status);
                let stdout = String::from_utf8_lossy(&output.stdout);
                let stderr = String::from_utf8_lossy(&output.stderr);
                if !stdout.trim().is_empty() {
                    debug!("Stdout:\n{}", stdout.trim());
                }
                if !stderr.trim().is_empty() {
                    debug!("Stderr:\n{}", stderr.trim());
                }
            } else {
                debug!("Async Command finished successfully.");
            }
            Ok(output)
        }
        Ok(Err(e)) => {
            error!("Async Failed to execute command {:?}: {}", program, e);
            Err(UnbloatError::Io(Arc::new(e)))
        }
        Err(_) => {
            error!("Async Command {:?} timed out after {:?}", program, timeout);
            Err(UnbloatError::CommandExecError(format!(
                "{} timed out after {:?}",
                program.to_string_lossy(),
                timeout
            )))
        }
    }
}
