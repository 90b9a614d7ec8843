// Credential storage for SSH and API users
//
// Each secrets file holds a single line: `<username> <base64(password)>`.
// Missing files trigger an interactive prompt; the result is persisted so
// follow-up commands run unattended.

use std::io::Write;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::output::MeshError;

/// A username/password pair, read-only after load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Read credentials from a secrets file, `Ok(None)` when the file does not exist
pub fn load(path: &Path) -> Result<Option<Credentials>, MeshError> {
    if !path.is_file() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| MeshError::io(format!("failed to read secrets file: {}", e), Some(path.to_path_buf())))?;

    let mut parts = content.split_whitespace();
    let (username, encoded) = match (parts.next(), parts.next()) {
        (Some(u), Some(p)) => (u.to_string(), p),
        _ => {
            return Err(MeshError::Credentials {
                message: format!("malformed secrets file {}", path.display()),
                suggestion: Some("Delete the file and run 'meshctl define' to recreate it".to_string()),
            })
        }
    };

    let password_bytes = BASE64.decode(encoded).map_err(|e| MeshError::Credentials {
        message: format!("cannot decode stored password: {}", e),
        suggestion: Some("Delete the file and run 'meshctl define' to recreate it".to_string()),
    })?;

    let password = String::from_utf8(password_bytes).map_err(|_| MeshError::Credentials {
        message: "stored password is not valid UTF-8".to_string(),
        suggestion: Some("Delete the file and run 'meshctl define' to recreate it".to_string()),
    })?;

    Ok(Some(Credentials { username, password }))
}

/// Persist credentials, overwriting any previous entry
pub fn save(path: &Path, credentials: &Credentials) -> Result<(), MeshError> {
    let line = format!(
        "{} {}",
        credentials.username,
        BASE64.encode(credentials.password.as_bytes())
    );
    std::fs::write(path, line)
        .map_err(|e| MeshError::io(format!("failed to write secrets file: {}", e), Some(path.to_path_buf())))
}

/// Load credentials, prompting interactively (and persisting) when missing
pub fn load_or_prompt(path: &Path, label: &str) -> Result<Credentials, MeshError> {
    if let Some(credentials) = load(path)? {
        return Ok(credentials);
    }

    eprintln!("{} credentials not set yet!", label);
    eprint!("Provide the {} user name: ", label);
    std::io::stderr().flush().ok();

    let mut username = String::new();
    std::io::stdin()
        .read_line(&mut username)
        .map_err(|e| MeshError::Credentials {
            message: format!("failed to read {} user name: {}", label, e),
            suggestion: None,
        })?;
    let username = username.trim().to_string();
    if username.is_empty() {
        return Err(MeshError::Credentials {
            message: format!("{} user name must not be empty", label),
            suggestion: None,
        });
    }

    let password = rpassword::prompt_password(format!("Please provide the {} password: ", label))
        .map_err(|e| MeshError::Credentials {
            message: format!("failed to read {} password: {}", label, e),
            suggestion: None,
        })?;

    let credentials = Credentials { username, password };
    save(path, &credentials)?;
    Ok(credentials)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets");

        let credentials = Credentials::new("admin", "s3cr3t!");
        save(&path, &credentials).unwrap();

        let loaded = load(&path).unwrap().unwrap();
        assert_eq!(loaded, credentials);

        // Password must not be stored in the clear
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("s3cr3t!"));
    }

    #[test]
    fn test_load_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("absent")).unwrap().is_none());
    }

    #[test]
    fn test_load_malformed_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets");
        std::fs::write(&path, "only-a-username").unwrap();

        assert!(load(&path).is_err());
    }
}
