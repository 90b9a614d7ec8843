// Remote execution: per-host SSH commands, parallel fan-out, aggregation

pub mod fanout;
pub mod report;
pub mod ssh;

use async_trait::async_trait;

use crate::config::ExitCodeConvention;

pub use fanout::fan_out;
pub use report::{command_report, service_report, Report};
pub use ssh::SshExecutor;

/// An immutable (host, command) pair prepared before dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub host: String,
    pub command: String,
}

impl CommandSpec {
    pub fn new(host: impl Into<String>, command: impl Into<String>) -> Self {
        CommandSpec {
            host: host.into(),
            command: command.into(),
        }
    }

    /// Build one spec per host from a command template
    pub fn for_hosts<F>(hosts: &[String], command_for: F) -> Vec<CommandSpec>
    where
        F: Fn(&str) -> String,
    {
        hosts
            .iter()
            .map(|host| CommandSpec::new(host.clone(), command_for(host)))
            .collect()
    }
}

/// Outcome of one remote command on one host.
///
/// An exit status only exists when a session was established; failing to
/// establish one is a distinct variant, never coerced to an exit code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteResult {
    Completed {
        exit_code: i32,
        stdout: String,
        stderr: String,
    },
    ConnectionFailed {
        reason: String,
    },
}

impl RemoteResult {
    pub fn completed(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        RemoteResult::Completed {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn connection_failed(reason: impl Into<String>) -> Self {
        RemoteResult::ConnectionFailed {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RemoteResult::Completed { exit_code: 0, .. })
    }
}

/// One host's slot in an aggregate result set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostResult {
    pub host: String,
    pub result: RemoteResult,
}

/// Classification of a remote result, five mutually exclusive categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    ServiceNotRunning,
    CommandNotFound,
    Failed,
    ConnectionError,
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        !matches!(self, Outcome::Success)
    }
}

/// Classify a remote result against the service exit-code convention
pub fn classify(result: &RemoteResult, convention: &ExitCodeConvention) -> Outcome {
    match result {
        RemoteResult::ConnectionFailed { .. } => Outcome::ConnectionError,
        RemoteResult::Completed { exit_code, .. } => {
            if *exit_code == 0 {
                Outcome::Success
            } else if *exit_code == convention.service_not_running {
                Outcome::ServiceNotRunning
            } else if *exit_code == convention.command_not_found {
                Outcome::CommandNotFound
            } else {
                Outcome::Failed
            }
        }
    }
}

/// Executes a single command on a single host.
///
/// Implementations report every failure through `RemoteResult`; a host that
/// cannot be reached yields `ConnectionFailed` rather than an error, so one
/// bad host never aborts a batch.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    async fn execute(&self, host: &str, command: &str) -> RemoteResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_is_exhaustive_and_exclusive() {
        let convention = ExitCodeConvention::default();

        let cases = [
            (RemoteResult::completed(0, "active", ""), Outcome::Success),
            (RemoteResult::completed(3, "", ""), Outcome::ServiceNotRunning),
            (RemoteResult::completed(127, "", "not found"), Outcome::CommandNotFound),
            (RemoteResult::completed(1, "", "boom"), Outcome::Failed),
            (RemoteResult::connection_failed("timeout"), Outcome::ConnectionError),
        ];

        for (result, expected) in cases {
            assert_eq!(classify(&result, &convention), expected);
        }
    }

    #[test]
    fn test_classification_follows_convention_not_constants() {
        let convention = ExitCodeConvention {
            service_not_running: 5,
            command_not_found: 99,
        };

        let result = RemoteResult::completed(3, "", "");
        assert_eq!(classify(&result, &convention), Outcome::Failed);

        let result = RemoteResult::completed(5, "", "");
        assert_eq!(classify(&result, &convention), Outcome::ServiceNotRunning);
    }

    #[test]
    fn test_command_spec_for_hosts() {
        let hosts = vec!["a".to_string(), "b".to_string()];
        let specs = CommandSpec::for_hosts(&hosts, |h| format!("echo {}", h));
        assert_eq!(specs[0], CommandSpec::new("a", "echo a"));
        assert_eq!(specs[1], CommandSpec::new("b", "echo b"));
    }
}
