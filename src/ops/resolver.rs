// Host resolution: turn a scope keyword into a concrete host list

use clap::ValueEnum;
use tracing::debug;

use crate::api::ApiClient;
use crate::config::{files, Settings};
use crate::output::MeshError;

/// Which part of the fleet an operation addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scope {
    /// Storage-serving nodes, from the management API
    Targets,
    /// Consuming nodes, from the management API
    Clients,
    /// Management servers, from the local manager file
    Managers,
    /// Targets, clients and managers combined
    Cluster,
    /// The locally maintained host list
    Hosts,
}

impl Scope {
    pub fn needs_api(&self) -> bool {
        matches!(self, Scope::Targets | Scope::Clients | Scope::Cluster)
    }
}

/// Resolve a scope into the hosts to operate on.
///
/// An explicit host list overrides the scope entirely and is used verbatim
/// after duplicate removal; no validation against the fleet is attempted, so
/// an operator can address a node the management plane has lost track of.
pub async fn resolve(
    scope: Scope,
    explicit: &[String],
    api: Option<&ApiClient>,
    settings: &Settings,
) -> Result<Vec<String>, MeshError> {
    if !explicit.is_empty() {
        let hosts = dedup(explicit.to_vec());
        debug!(?scope, count = hosts.len(), "explicit host list overrides scope");
        return Ok(hosts);
    }

    let hosts = match scope {
        Scope::Targets => api_for(scope, api)?.get_target_list().await?,
        Scope::Clients => api_for(scope, api)?.get_client_list().await?,
        Scope::Managers => settings.manager_short_names(),
        Scope::Cluster => {
            let api = api_for(scope, api)?;
            let mut all = api.get_target_list().await?;
            all.extend(api.get_client_list().await?);
            all.extend(settings.manager_short_names());
            all
        }
        Scope::Hosts => files::load_hosts(&settings.paths.hosts_file)?,
    };

    let hosts = dedup(hosts);
    if hosts.is_empty() {
        return Err(MeshError::Resolution {
            scope: format!("{:?}", scope).to_lowercase(),
            message: "no hosts resolved".to_string(),
            suggestion: Some("Check that the cluster has registered nodes, or pass hosts explicitly".to_string()),
        });
    }

    debug!(?scope, count = hosts.len(), "resolved hosts");
    Ok(hosts)
}

fn api_for<'a>(scope: Scope, api: Option<&'a ApiClient>) -> Result<&'a ApiClient, MeshError> {
    api.ok_or_else(|| MeshError::Resolution {
        scope: format!("{:?}", scope).to_lowercase(),
        message: "scope requires the management API".to_string(),
        suggestion: Some("Define a manager with 'meshctl define manager'".to_string()),
    })
}

/// Remove duplicates while keeping first-seen order
fn dedup(hosts: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    hosts
        .into_iter()
        .filter(|h| seen.insert(h.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Credentials, ExitCodeConvention, Paths};
    use std::time::Duration;

    fn settings(dir: &std::path::Path) -> Settings {
        Settings {
            paths: Paths::new(dir.to_path_buf()),
            ssh: Credentials::new("root", "pw"),
            api: Credentials::new("admin", "pw"),
            managers: vec!["mgr1.lab.example.com".to_string(), "mgr2.lab.example.com".to_string()],
            forks: 32,
            connect_timeout: Duration::from_secs(5),
            exit_codes: ExitCodeConvention::default(),
        }
    }

    #[tokio::test]
    async fn test_explicit_hosts_override_scope() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = vec![
            "nodeX".to_string(),
            "nodeY".to_string(),
            "nodeX".to_string(),
        ];

        // Targets scope would need the API, but an explicit list short-circuits
        let hosts = resolve(Scope::Targets, &explicit, None, &settings(dir.path()))
            .await
            .unwrap();

        assert_eq!(hosts, vec!["nodeX", "nodeY"]);
    }

    #[tokio::test]
    async fn test_managers_come_from_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let hosts = resolve(Scope::Managers, &[], None, &settings(dir.path()))
            .await
            .unwrap();
        assert_eq!(hosts, vec!["mgr1", "mgr2"]);
    }

    #[tokio::test]
    async fn test_api_scope_without_api_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve(Scope::Clients, &[], None, &settings(dir.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, MeshError::Resolution { .. }));
    }

    #[tokio::test]
    async fn test_hosts_scope_reads_host_file() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        files::add_hosts(&settings.paths.hosts_file, &["h1".to_string(), "h2".to_string()]).unwrap();

        let hosts = resolve(Scope::Hosts, &[], None, &settings).await.unwrap();
        assert_eq!(hosts, vec!["h1", "h2"]);
    }

    #[test]
    fn test_needs_api() {
        assert!(Scope::Targets.needs_api());
        assert!(Scope::Cluster.needs_api());
        assert!(!Scope::Managers.needs_api());
        assert!(!Scope::Hosts.needs_api());
    }
}
