// Arbitrary remote commands across a scope

use std::sync::Arc;

use tracing::debug;

use super::resolver::{self, Scope};
use crate::api::ApiClient;
use crate::config::Settings;
use crate::output::{MeshError, TerminalOutput};
use crate::remote::{command_report, fan_out, CommandSpec, RemoteExecutor};

/// Run one shell command on every host in the scope and print the raw
/// per-host output
pub async fn run(
    executor: Arc<dyn RemoteExecutor>,
    api: Option<&ApiClient>,
    settings: &Settings,
    out: &TerminalOutput,
    scope: Scope,
    explicit: &[String],
    command: &str,
    prefix: bool,
    parallel: bool,
) -> Result<(), MeshError> {
    let command = command.trim();
    if command.is_empty() {
        return Err(MeshError::InvalidInput {
            message: "no command given".to_string(),
            suggestion: Some("Pass the command to run, e.g. 'meshctl runcmd hosts -c uptime'".to_string()),
        });
    }

    let hosts = resolver::resolve(scope, explicit, api, settings).await?;
    debug!(command, hosts = hosts.len(), "running remote command");

    let specs = CommandSpec::for_hosts(&hosts, |_| command.to_string());
    let results = fan_out(executor, specs, parallel, settings.forks).await;

    let report = command_report(&results, prefix, &settings.exit_codes);
    if report.any_failed() {
        out.flag_error();
    }
    out.print_report(&report.text);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Credentials, ExitCodeConvention, Paths};
    use crate::remote::{RemoteExecutor, RemoteResult};
    use async_trait::async_trait;
    use std::time::Duration;

    struct FixedExecutor(RemoteResult);

    #[async_trait]
    impl RemoteExecutor for FixedExecutor {
        async fn execute(&self, _host: &str, _command: &str) -> RemoteResult {
            self.0.clone()
        }
    }

    fn settings(dir: &std::path::Path) -> Settings {
        Settings {
            paths: Paths::new(dir.to_path_buf()),
            ssh: Credentials::new("root", "pw"),
            api: Credentials::new("admin", "pw"),
            managers: vec!["mgr1".to_string()],
            forks: 8,
            connect_timeout: Duration::from_secs(5),
            exit_codes: ExitCodeConvention::default(),
        }
    }

    #[tokio::test]
    async fn test_empty_command_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(FixedExecutor(RemoteResult::completed(0, "", "")));
        let out = TerminalOutput::new(false);

        let err = run(
            executor,
            None,
            &settings(dir.path()),
            &out,
            Scope::Hosts,
            &["h1".to_string()],
            "   ",
            false,
            true,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, MeshError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn test_nonzero_exit_sets_the_error_flag() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(FixedExecutor(RemoteResult::completed(2, "", "boom")));
        let out = TerminalOutput::new(false);

        run(
            executor,
            None,
            &settings(dir.path()),
            &out,
            Scope::Hosts,
            &["h1".to_string()],
            "false",
            false,
            true,
        )
        .await
        .unwrap();

        assert!(out.had_error());
    }
}
