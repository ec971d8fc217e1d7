use crate::error::{PccVmError, Result};
use crate::vsphere::types::{ManagedObjectReference, TaskState};
use crate::vsphere::Vim;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing::debug;

/// Interval between `Task.info` reads.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Block until `task` leaves the queued/running states.
///
/// A task ending in `error` becomes [`PccVmError::Task`] carrying the
/// server's localized message.
pub fn wait_for_completion<V: Vim + ?Sized>(
    vim: &V,
    task: &ManagedObjectReference,
    label: &str,
    poll_interval: Duration,
) -> Result<()> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg} ({elapsed})")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(label.to_string());
    if !poll_interval.is_zero() {
        spinner.enable_steady_tick(Duration::from_millis(120));
    }

    let result = loop {
        let info = vim.task_info(task)?;
        debug!(%task, state = ?info.state, "polled task");
        match info.state {
            TaskState::Success => break Ok(()),
            TaskState::Error => {
                break Err(PccVmError::Task(format!(
                    "{}: {}",
                    label,
                    info.error_message()
                )))
            }
            TaskState::Queued | TaskState::Running => std::thread::sleep(poll_interval),
        }
    };

    spinner.finish_and_clear();
    result
}
