// Service lifecycle operations: check/start/stop/restart across the fleet

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::resolver::{self, Scope};
use super::shutdown;
use crate::api::ApiClient;
use crate::config::Settings;
use crate::output::{MeshError, TerminalOutput};
use crate::remote::{fan_out, service_report, CommandSpec, RemoteExecutor};

/// Managers need a moment to accept registrations before dependent services
/// come up
const MANAGER_SETTLE: Duration = Duration::from_secs(3);

/// The node role a lifecycle operation addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceRole {
    Target,
    Client,
    Manager,
}

impl ServiceRole {
    pub fn service_name(&self) -> &'static str {
        match self {
            ServiceRole::Target => "meshtarget",
            ServiceRole::Client => "meshclient",
            ServiceRole::Manager => "meshmgr",
        }
    }

    fn scope(&self) -> Scope {
        match self {
            ServiceRole::Target => Scope::Targets,
            ServiceRole::Client => Scope::Clients,
            ServiceRole::Manager => Scope::Managers,
        }
    }

    fn plural(&self) -> &'static str {
        match self {
            ServiceRole::Target => "targets",
            ServiceRole::Client => "clients",
            ServiceRole::Manager => "managers",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceAction {
    Check,
    Start,
    Stop,
    Restart,
}

impl ServiceAction {
    /// The verb passed to the remote init script
    pub fn verb(&self) -> &'static str {
        match self {
            ServiceAction::Check => "status",
            ServiceAction::Start => "start",
            ServiceAction::Stop => "stop",
            ServiceAction::Restart => "restart",
        }
    }

    /// The capitalized label used in report status lines
    pub fn label(&self) -> &'static str {
        match self {
            ServiceAction::Check => "Check",
            ServiceAction::Start => "Start",
            ServiceAction::Stop => "Stop",
            ServiceAction::Restart => "Restart",
        }
    }

    fn phase_verb(&self) -> &'static str {
        match self {
            ServiceAction::Check => "Checking",
            ServiceAction::Start => "Starting",
            ServiceAction::Stop => "Stopping",
            ServiceAction::Restart => "Restarting",
        }
    }
}

/// The remote command for one role/action pair
pub fn service_command(role: ServiceRole, action: ServiceAction) -> String {
    format!("service {} {}", role.service_name(), action.verb())
}

/// Per-invocation rendering and dispatch flags
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub details: bool,
    pub prefix: bool,
    pub parallel: bool,
    pub graceful: bool,
}

/// Run a lifecycle action against a scope, orchestrating role ordering when
/// the scope is the whole cluster
pub async fn run(
    executor: Arc<dyn RemoteExecutor>,
    api: Option<&ApiClient>,
    settings: &Settings,
    out: &TerminalOutput,
    scope: Scope,
    explicit: &[String],
    action: ServiceAction,
    opts: RunOptions,
) -> Result<(), MeshError> {
    if scope == Scope::Cluster && explicit.is_empty() {
        return run_cluster(executor, api, settings, out, action, opts).await;
    }

    let role = role_for(scope)?;
    run_role(executor, api, settings, out, role, explicit, action, opts).await
}

/// Run one action against one role's hosts and print the aggregate report
async fn run_role(
    executor: Arc<dyn RemoteExecutor>,
    api: Option<&ApiClient>,
    settings: &Settings,
    out: &TerminalOutput,
    role: ServiceRole,
    explicit: &[String],
    action: ServiceAction,
    opts: RunOptions,
) -> Result<(), MeshError> {
    // A cluster-wide graceful target stop goes through the management plane
    // so in-flight IO drains before the services exit
    if role == ServiceRole::Target
        && action == ServiceAction::Stop
        && explicit.is_empty()
        && opts.graceful
    {
        let api = api.ok_or_else(|| MeshError::Resolution {
            scope: "targets".to_string(),
            message: "graceful shutdown requires the management API".to_string(),
            suggestion: Some("Define a manager with 'meshctl define manager'".to_string()),
        })?;
        return shutdown::drain_targets(api, executor, out).await;
    }

    let hosts = resolver::resolve(role.scope(), explicit, api, settings).await?;
    debug!(role = role.service_name(), action = action.verb(), hosts = hosts.len(), "running lifecycle action");

    let command = service_command(role, action);
    let specs = CommandSpec::for_hosts(&hosts, |_| command.clone());
    let results = fan_out(executor, specs, opts.parallel, settings.forks).await;

    let report = service_report(
        &results,
        action.label(),
        opts.details,
        opts.prefix,
        &settings.exit_codes,
    );
    if report.any_failed() {
        out.flag_error();
    }
    out.print_report(&report.text);
    Ok(())
}

/// Whole-cluster orchestration with role ordering.
///
/// Managers come up first and go down last; targets drain gracefully on the
/// way down so clients lose their volumes before the backing stores vanish.
async fn run_cluster(
    executor: Arc<dyn RemoteExecutor>,
    api: Option<&ApiClient>,
    settings: &Settings,
    out: &TerminalOutput,
    action: ServiceAction,
    opts: RunOptions,
) -> Result<(), MeshError> {
    let phase = |role: ServiceRole, action: ServiceAction| {
        out.print_phase(&format!("{} the {} ...", action.phase_verb(), role.plural()));
    };

    match action {
        ServiceAction::Check => {
            for role in [ServiceRole::Manager, ServiceRole::Target, ServiceRole::Client] {
                phase(role, action);
                run_role(executor.clone(), api, settings, out, role, &[], action, opts).await?;
            }
        }
        ServiceAction::Start => {
            phase(ServiceRole::Manager, action);
            run_role(executor.clone(), api, settings, out, ServiceRole::Manager, &[], action, opts).await?;
            tokio::time::sleep(MANAGER_SETTLE).await;
            for role in [ServiceRole::Target, ServiceRole::Client] {
                phase(role, action);
                run_role(executor.clone(), api, settings, out, role, &[], action, opts).await?;
            }
        }
        ServiceAction::Stop => {
            let graceful = RunOptions { graceful: true, ..opts };
            for role in [ServiceRole::Client, ServiceRole::Target, ServiceRole::Manager] {
                phase(role, action);
                let opts = if role == ServiceRole::Target { graceful } else { opts };
                run_role(executor.clone(), api, settings, out, role, &[], action, opts).await?;
            }
        }
        ServiceAction::Restart => {
            let graceful = RunOptions { graceful: true, ..opts };

            phase(ServiceRole::Client, ServiceAction::Stop);
            run_role(executor.clone(), api, settings, out, ServiceRole::Client, &[], ServiceAction::Stop, opts).await?;
            phase(ServiceRole::Target, ServiceAction::Stop);
            run_role(executor.clone(), api, settings, out, ServiceRole::Target, &[], ServiceAction::Stop, graceful).await?;
            phase(ServiceRole::Manager, ServiceAction::Restart);
            run_role(executor.clone(), api, settings, out, ServiceRole::Manager, &[], ServiceAction::Restart, opts).await?;
            tokio::time::sleep(MANAGER_SETTLE).await;
            phase(ServiceRole::Target, ServiceAction::Start);
            run_role(executor.clone(), api, settings, out, ServiceRole::Target, &[], ServiceAction::Start, opts).await?;
            phase(ServiceRole::Client, ServiceAction::Start);
            run_role(executor.clone(), api, settings, out, ServiceRole::Client, &[], ServiceAction::Start, opts).await?;
        }
    }

    Ok(())
}

fn role_for(scope: Scope) -> Result<ServiceRole, MeshError> {
    match scope {
        Scope::Targets => Ok(ServiceRole::Target),
        Scope::Clients => Ok(ServiceRole::Client),
        Scope::Managers => Ok(ServiceRole::Manager),
        Scope::Cluster => Ok(ServiceRole::Target),
        Scope::Hosts => Err(MeshError::InvalidInput {
            message: "service operations address targets, clients, managers or the cluster".to_string(),
            suggestion: Some("Use 'meshctl runcmd' for arbitrary commands on saved hosts".to_string()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Credentials, ExitCodeConvention, Paths};
    use crate::remote::RemoteResult;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingExecutor {
        commands: Mutex<Vec<(String, String)>>,
        result: RemoteResult,
    }

    impl RecordingExecutor {
        fn new(result: RemoteResult) -> Self {
            RecordingExecutor {
                commands: Mutex::new(Vec::new()),
                result,
            }
        }
    }

    #[async_trait]
    impl crate::remote::RemoteExecutor for RecordingExecutor {
        async fn execute(&self, host: &str, command: &str) -> RemoteResult {
            self.commands
                .lock()
                .unwrap()
                .push((host.to_string(), command.to_string()));
            self.result.clone()
        }
    }

    fn settings(dir: &std::path::Path) -> Settings {
        Settings {
            paths: Paths::new(dir.to_path_buf()),
            ssh: Credentials::new("root", "pw"),
            api: Credentials::new("admin", "pw"),
            managers: vec!["mgr1.lab.example.com".to_string()],
            forks: 8,
            connect_timeout: Duration::from_secs(5),
            exit_codes: ExitCodeConvention::default(),
        }
    }

    #[test]
    fn test_service_command_strings() {
        assert_eq!(
            service_command(ServiceRole::Target, ServiceAction::Check),
            "service meshtarget status"
        );
        assert_eq!(
            service_command(ServiceRole::Client, ServiceAction::Start),
            "service meshclient start"
        );
        assert_eq!(
            service_command(ServiceRole::Manager, ServiceAction::Restart),
            "service meshmgr restart"
        );
    }

    #[test]
    fn test_hosts_scope_is_rejected() {
        assert!(role_for(Scope::Hosts).is_err());
        assert!(matches!(role_for(Scope::Targets), Ok(ServiceRole::Target)));
    }

    #[tokio::test]
    async fn test_explicit_hosts_run_the_scoped_service_command() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(RecordingExecutor::new(RemoteResult::completed(0, "", "")));
        let out = TerminalOutput::new(false);
        let explicit = vec!["node1".to_string(), "node2".to_string()];

        run(
            executor.clone(),
            None,
            &settings(dir.path()),
            &out,
            Scope::Targets,
            &explicit,
            ServiceAction::Stop,
            RunOptions { details: false, prefix: false, parallel: true, graceful: true },
        )
        .await
        .unwrap();

        // An explicit server list bypasses the graceful drain path
        let commands = executor.commands.lock().unwrap();
        assert_eq!(commands.len(), 2);
        for (_, command) in commands.iter() {
            assert_eq!(command, "service meshtarget stop");
        }
        assert!(!out.had_error());
    }

    #[tokio::test]
    async fn test_failures_set_the_error_flag() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(RecordingExecutor::new(RemoteResult::completed(1, "", "dead")));
        let out = TerminalOutput::new(false);
        let explicit = vec!["node1".to_string()];

        run(
            executor,
            None,
            &settings(dir.path()),
            &out,
            Scope::Clients,
            &explicit,
            ServiceAction::Check,
            RunOptions { details: false, prefix: false, parallel: true, graceful: false },
        )
        .await
        .unwrap();

        assert!(out.had_error());
    }

    #[tokio::test]
    async fn test_managers_resolve_without_api() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(RecordingExecutor::new(RemoteResult::completed(0, "", "")));
        let out = TerminalOutput::new(false);

        run(
            executor.clone(),
            None,
            &settings(dir.path()),
            &out,
            Scope::Managers,
            &[],
            ServiceAction::Check,
            RunOptions { details: false, prefix: false, parallel: true, graceful: false },
        )
        .await
        .unwrap();

        let commands = executor.commands.lock().unwrap();
        assert_eq!(commands[0], ("mgr1".to_string(), "service meshmgr status".to_string()));
    }
}
