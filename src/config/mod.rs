// Configuration context for meshctl
//
// All credentials and tunables are loaded once at process start into a
// `Settings` value that is passed by reference into the API client, the SSH
// executor and the resolver. Nothing here mutates after load.

pub mod credentials;
pub mod files;

use std::path::PathBuf;
use std::time::Duration;

pub use credentials::Credentials;

use crate::output::MeshError;

/// Exit statuses the remote service scripts use for specific conditions.
/// These follow the init-script convention of the managed services and are
/// deliberately not hard-coded at classification sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCodeConvention {
    pub service_not_running: i32,
    pub command_not_found: i32,
}

impl Default for ExitCodeConvention {
    fn default() -> Self {
        ExitCodeConvention {
            service_not_running: 3,
            command_not_found: 127,
        }
    }
}

/// Locations of the dotfiles meshctl keeps in the user's home directory
#[derive(Debug, Clone)]
pub struct Paths {
    pub hosts_file: PathBuf,
    pub manager_file: PathBuf,
    pub ssh_secrets_file: PathBuf,
    pub api_secrets_file: PathBuf,
}

impl Paths {
    pub fn new(home: PathBuf) -> Self {
        Paths {
            hosts_file: home.join(".meshctl_hosts"),
            manager_file: home.join(".meshctl_manager"),
            ssh_secrets_file: home.join(".meshctl_secrets"),
            api_secrets_file: home.join(".meshctl_api_secrets"),
        }
    }

    pub fn from_env() -> Result<Self, MeshError> {
        let home = home_dir().ok_or_else(|| MeshError::Io {
            message: "cannot determine home directory (HOME is not set)".to_string(),
            path: None,
        })?;
        Ok(Paths::new(home))
    }
}

/// Simple home directory lookup
fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

/// Process-wide settings, read-only after construction
#[derive(Debug, Clone)]
pub struct Settings {
    pub paths: Paths,
    pub ssh: Credentials,
    pub api: Credentials,
    /// Full names of the management servers; the first entry is the API server
    pub managers: Vec<String>,
    /// Concurrency limit for parallel fan-out
    pub forks: usize,
    /// SSH connection timeout
    pub connect_timeout: Duration,
    pub exit_codes: ExitCodeConvention,
}

impl Settings {
    /// Load settings from the dotfiles, prompting for anything missing.
    /// Commands that never touch SSH or the API still get a complete
    /// context; prompts only fire for files that do not exist yet.
    pub fn load(paths: Paths, forks: usize, connect_timeout_secs: u64) -> Result<Self, MeshError> {
        let ssh = credentials::load_or_prompt(&paths.ssh_secrets_file, "SSH")?;
        let api = credentials::load_or_prompt(&paths.api_secrets_file, "API")?;
        let managers = files::load_managers(&paths.manager_file)?;

        Ok(Settings {
            paths,
            ssh,
            api,
            managers,
            forks: forks.max(1),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            exit_codes: ExitCodeConvention::default(),
        })
    }

    /// The management server the API client talks to
    pub fn api_server(&self) -> &str {
        &self.managers[0]
    }

    /// Manager short names, the form used for fleet operations
    pub fn manager_short_names(&self) -> Vec<String> {
        self.managers
            .iter()
            .map(|m| files::short_name(m).to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_settings(dir: &std::path::Path) -> Settings {
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

    #[test]
    fn test_api_server_is_first_manager() {
        let dir = tempfile::tempdir().unwrap();
        let settings = test_settings(dir.path());
        assert_eq!(settings.api_server(), "mgr1.lab.example.com");
    }

    #[test]
    fn test_manager_short_names() {
        let dir = tempfile::tempdir().unwrap();
        let settings = test_settings(dir.path());
        assert_eq!(settings.manager_short_names(), vec!["mgr1", "mgr2"]);
    }

    #[test]
    fn test_exit_code_convention_defaults() {
        let convention = ExitCodeConvention::default();
        assert_eq!(convention.service_not_running, 3);
        assert_eq!(convention.command_not_found, 127);
    }
}
