// Human-readable error messages for meshctl

use std::fmt;
use std::io::IsTerminal;
use std::path::PathBuf;

use colored::*;

/// Initialize color output based on TTY detection and NO_COLOR environment variable
fn should_use_colors() -> bool {
    // Check NO_COLOR environment variable first (https://no-color.org/)
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    std::io::stderr().is_terminal()
}

/// All error types in meshctl
#[derive(Debug)]
pub enum MeshError {
    /// Management API errors (login, request, or response decoding)
    Api {
        endpoint: String,
        message: String,
        suggestion: Option<String>,
    },

    /// The host set for a fleet operation could not be determined
    Resolution {
        scope: String,
        message: String,
        suggestion: Option<String>,
    },

    /// I/O errors on local state files
    Io {
        message: String,
        path: Option<PathBuf>,
    },

    /// Credential handling errors (missing, malformed, prompt failure)
    Credentials {
        message: String,
        suggestion: Option<String>,
    },

    /// Invalid user input (sizes, RAID parameters, host lists)
    InvalidInput {
        message: String,
        suggestion: Option<String>,
    },

    /// An operation exceeded its deadline
    Timeout {
        operation: String,
        duration_secs: u64,
    },
}

impl std::error::Error for MeshError {}

impl fmt::Display for MeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let use_colors = should_use_colors();
        if !use_colors {
            colored::control::set_override(false);
        }

        match self {
            MeshError::Api {
                endpoint,
                message,
                suggestion,
            } => {
                writeln!(f, "{}: {}", "API ERROR".red().bold(), message)?;
                writeln!(f, "  {} {}", "Endpoint:".dimmed(), endpoint)?;

                if let Some(suggestion) = suggestion {
                    writeln!(f)?;
                    writeln!(f, "{}: {}", "Hint".yellow().bold(), suggestion)?;
                }

                Ok(())
            }

            MeshError::Resolution {
                scope,
                message,
                suggestion,
            } => {
                writeln!(f, "{}: {}", "RESOLUTION ERROR".red().bold(), message)?;
                writeln!(f, "  {} {}", "Scope:".dimmed(), scope)?;

                if let Some(suggestion) = suggestion {
                    writeln!(f)?;
                    writeln!(f, "{}: {}", "Hint".yellow().bold(), suggestion)?;
                }

                Ok(())
            }

            MeshError::Io { message, path } => {
                writeln!(f, "{}: {}", "I/O ERROR".red().bold(), message)?;
                if let Some(path) = path {
                    writeln!(f, "  {} {}", "Path:".dimmed(), path.display())?;
                }
                Ok(())
            }

            MeshError::Credentials {
                message,
                suggestion,
            } => {
                writeln!(f, "{}: {}", "CREDENTIALS ERROR".red().bold(), message)?;

                if let Some(suggestion) = suggestion {
                    writeln!(f)?;
                    writeln!(f, "{}: {}", "Hint".yellow().bold(), suggestion)?;
                }

                Ok(())
            }

            MeshError::InvalidInput {
                message,
                suggestion,
            } => {
                writeln!(f, "{}: {}", "INVALID INPUT".red().bold(), message)?;

                if let Some(suggestion) = suggestion {
                    writeln!(f)?;
                    writeln!(f, "{}: {}", "Hint".yellow().bold(), suggestion)?;
                }

                Ok(())
            }

            MeshError::Timeout {
                operation,
                duration_secs,
            } => {
                writeln!(
                    f,
                    "{}: {} timed out after {}s",
                    "TIMEOUT".red().bold(),
                    operation,
                    duration_secs
                )?;
                Ok(())
            }
        }
    }
}

impl MeshError {
    /// Shorthand for API errors without a suggestion
    pub fn api(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        MeshError::Api {
            endpoint: endpoint.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn io(message: impl Into<String>, path: Option<PathBuf>) -> Self {
        MeshError::Io {
            message: message.into(),
            path,
        }
    }
}
