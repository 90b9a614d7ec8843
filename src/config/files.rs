// Newline-delimited local state files: saved hosts and management servers

use std::path::Path;

use crate::output::MeshError;

/// Read a newline-delimited host file, trimming blank lines
fn read_lines(path: &Path) -> Result<Vec<String>, MeshError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| MeshError::io(format!("failed to read {}: {}", path.display(), e), Some(path.to_path_buf())))?;
    Ok(content
        .lines()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect())
}

/// Load the saved host list, erroring with a hint when none is defined
pub fn load_hosts(path: &Path) -> Result<Vec<String>, MeshError> {
    if !path.is_file() {
        return Err(MeshError::Resolution {
            scope: "hosts".to_string(),
            message: "no hosts defined".to_string(),
            suggestion: Some("Use 'meshctl hosts add' to add hosts to your environment".to_string()),
        });
    }
    read_lines(path)
}

/// Append hosts to the saved host list
pub fn add_hosts(path: &Path, hosts: &[String]) -> Result<(), MeshError> {
    let mut existing = if path.is_file() { read_lines(path)? } else { Vec::new() };
    for host in hosts {
        let host = host.trim();
        if !host.is_empty() && !existing.iter().any(|h| h == host) {
            existing.push(host.to_string());
        }
    }
    write_lines(path, &existing)
}

/// Remove hosts from the saved host list
pub fn delete_hosts(path: &Path, hosts: &[String]) -> Result<(), MeshError> {
    let existing = load_hosts(path)?;
    let remaining: Vec<String> = existing
        .into_iter()
        .filter(|h| !hosts.iter().any(|d| d.trim() == h))
        .collect();
    write_lines(path, &remaining)
}

fn write_lines(path: &Path, lines: &[String]) -> Result<(), MeshError> {
    let mut content = lines.join("\n");
    content.push('\n');
    std::fs::write(path, content)
        .map_err(|e| MeshError::io(format!("failed to write {}: {}", path.display(), e), Some(path.to_path_buf())))
}

/// Load the management server list (full names, first entry is the API server)
pub fn load_managers(path: &Path) -> Result<Vec<String>, MeshError> {
    if !path.is_file() {
        return Err(MeshError::Resolution {
            scope: "managers".to_string(),
            message: "no management server defined yet".to_string(),
            suggestion: Some("Run 'meshctl define manager -s <server>' first".to_string()),
        });
    }
    let managers = read_lines(path)?;
    if managers.is_empty() {
        return Err(MeshError::Resolution {
            scope: "managers".to_string(),
            message: "management server file is empty".to_string(),
            suggestion: Some("Run 'meshctl define manager -s <server>' first".to_string()),
        });
    }
    Ok(managers)
}

/// Persist the management server list
pub fn save_managers(path: &Path, managers: &[String]) -> Result<(), MeshError> {
    write_lines(path, managers)
}

/// Short host name: everything before the first dot
pub fn short_name(host: &str) -> &str {
    host.split('.').next().unwrap_or(host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hosts_add_list_delete() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hosts");

        add_hosts(&path, &["node1".to_string(), "node2".to_string()]).unwrap();
        add_hosts(&path, &["node2".to_string(), "node3".to_string()]).unwrap();
        assert_eq!(load_hosts(&path).unwrap(), vec!["node1", "node2", "node3"]);

        delete_hosts(&path, &["node2".to_string()]).unwrap();
        assert_eq!(load_hosts(&path).unwrap(), vec!["node1", "node3"]);
    }

    #[test]
    fn test_load_hosts_missing_file_has_hint() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_hosts(&dir.path().join("absent")).unwrap_err();
        let text = console::strip_ansi_codes(&err.to_string()).to_string();
        assert!(text.contains("hosts add"));
    }

    #[test]
    fn test_managers_round_trip_and_short_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manager");

        save_managers(&path, &["mgr1.lab.example.com".to_string()]).unwrap();
        let managers = load_managers(&path).unwrap();
        assert_eq!(managers, vec!["mgr1.lab.example.com"]);
        assert_eq!(short_name(&managers[0]), "mgr1");
    }

    #[test]
    fn test_load_managers_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_managers(&dir.path().join("absent")).is_err());
    }
}
