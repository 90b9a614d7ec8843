// Graceful cluster-wide target shutdown
//
// One control job tells the management plane to drain every target; the
// shutdown then gets observed from the outside by probing the target service
// status over SSH until no target answers as running. The poll loop is a
// bounded state machine, an unresponsive cluster surfaces as a timeout error
// rather than an endless wait.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::api::ApiClient;
use crate::output::{MeshError, TerminalOutput};
use crate::remote::RemoteExecutor;

const POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_POLLS: u32 = 120;

/// Drain progress. `Draining` counts polls taken so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DrainState {
    Issued,
    Draining { polls: u32 },
    Done,
}

impl DrainState {
    /// Advance on one active-target reading. The first zero reading
    /// terminates the drain; anything else keeps draining.
    fn observe(self, active: usize) -> DrainState {
        match self {
            DrainState::Done => DrainState::Done,
            DrainState::Issued => {
                if active == 0 {
                    DrainState::Done
                } else {
                    DrainState::Draining { polls: 1 }
                }
            }
            DrainState::Draining { polls } => {
                if active == 0 {
                    DrainState::Done
                } else {
                    DrainState::Draining { polls: polls + 1 }
                }
            }
        }
    }

    fn polls(&self) -> u32 {
        match self {
            DrainState::Draining { polls } => *polls,
            _ => 0,
        }
    }
}

/// Issue a cluster-wide target shutdown and wait until every target service
/// has stopped
pub async fn drain_targets(
    api: &ApiClient,
    executor: Arc<dyn RemoteExecutor>,
    out: &TerminalOutput,
) -> Result<(), MeshError> {
    api.shutdown_all_targets().await?;
    let targets = api.get_target_list().await?;

    out.print_phase("Shutting down the target services in the cluster.");
    out.print_phase("Please wait...");

    wait_for_drain(executor, &targets, POLL_INTERVAL, MAX_POLLS).await?;
    out.print_ok("All target services shut down.");
    Ok(())
}

/// Poll the active-target count until it reaches zero or the poll budget
/// runs out
async fn wait_for_drain(
    executor: Arc<dyn RemoteExecutor>,
    targets: &[String],
    interval: Duration,
    max_polls: u32,
) -> Result<(), MeshError> {
    let mut state = DrainState::Issued;

    loop {
        let active = count_active_targets(executor.as_ref(), targets).await;
        state = state.observe(active);
        debug!(active, polls = state.polls(), "drain poll");

        match state {
            DrainState::Done => return Ok(()),
            _ if state.polls() >= max_polls => {
                return Err(MeshError::Timeout {
                    operation: "graceful target shutdown".to_string(),
                    duration_secs: u64::from(max_polls) * interval.as_secs(),
                });
            }
            _ => tokio::time::sleep(interval).await,
        }
    }
}

/// Count targets whose service still reports as running. Probes run one at
/// a time; a target that cannot be reached counts as stopped.
async fn count_active_targets(executor: &dyn RemoteExecutor, targets: &[String]) -> usize {
    let mut active = 0;
    for target in targets {
        let result = executor.execute(target, "service meshtarget status").await;
        if result.is_success() {
            active += 1;
        }
    }
    active
}
