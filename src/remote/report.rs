// Aggregate reporting for fan-out results
//
// Both renderings are pure functions over the result list: same inputs,
// byte-identical output. Callers use `Report::failures` for the any-error
// exit-code flag; a fully failed batch still renders a complete report.

use colored::*;

use super::{classify, HostResult, Outcome, RemoteResult};
use crate::config::ExitCodeConvention;

/// A rendered multi-host report plus the number of failed hosts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub text: String,
    pub failures: usize,
}

impl Report {
    pub fn any_failed(&self) -> bool {
        self.failures > 0
    }
}

/// Render service-lifecycle results: one status line per host
/// ("<host> <Action> OK/Failed"), optionally followed by the captured
/// output, optionally host-prefixed per line.
pub fn service_report(
    results: &[HostResult],
    action: &str,
    details: bool,
    prefix: bool,
    convention: &ExitCodeConvention,
) -> Report {
    let mut output = Vec::new();
    let mut failures = 0;

    for entry in results {
        let outcome = classify(&entry.result, convention);

        if outcome == Outcome::Success {
            let status_line = format!("{} {} {}", entry.host, action, "OK".green());
            if details {
                output.push(status_line.bold().to_string());
                let body = success_output(&entry.result);
                if !body.is_empty() {
                    output.push(render_body(&entry.host, body, prefix));
                }
            } else {
                output.push(status_line);
            }
        } else {
            failures += 1;
            let status_line = format!("{} {} {}", entry.host, action, "Failed".red());
            if details {
                output.push(status_line.bold().to_string());
                output.push(render_body(&entry.host, &failure_text(&entry.result, convention), prefix));
            } else {
                output.push(status_line);
            }
        }
    }

    Report {
        text: output.join("\n"),
        failures,
    }
}

/// Render free-form command results: raw output per host (or `OK` when the
/// command printed nothing), `Return Code N, <output>` on nonzero exit.
pub fn command_report(
    results: &[HostResult],
    prefix: bool,
    convention: &ExitCodeConvention,
) -> Report {
    let mut output = Vec::new();
    let mut failures = 0;

    for entry in results {
        let outcome = classify(&entry.result, convention);

        let line = match &entry.result {
            RemoteResult::ConnectionFailed { reason } => {
                failures += 1;
                format!("{}", format!("Connection failed: {}", reason).red())
            }
            RemoteResult::Completed {
                exit_code,
                stdout,
                stderr,
            } => {
                if outcome == Outcome::Success {
                    let body = trim_trailing_newline(stdout);
                    if body.is_empty() {
                        "OK".green().to_string()
                    } else {
                        body.to_string()
                    }
                } else {
                    failures += 1;
                    let combined = combine_output(stdout, stderr);
                    format!("{}", format!("Return Code {}, {}", exit_code, combined).red())
                }
            }
        };

        output.push(render_body(&entry.host, &line, prefix));
    }

    Report {
        text: output.join("\n"),
        failures,
    }
}

/// The most specific failure description available for a result
pub fn failure_text(result: &RemoteResult, convention: &ExitCodeConvention) -> String {
    match classify(result, convention) {
        Outcome::ConnectionError => match result {
            RemoteResult::ConnectionFailed { reason } => format!("Connection failed: {}", reason),
            _ => unreachable!("connection error classification implies ConnectionFailed"),
        },
        Outcome::ServiceNotRunning => "Service not running.".to_string(),
        Outcome::CommandNotFound => "Command not found or not installed!".to_string(),
        Outcome::Failed => match result {
            RemoteResult::Completed { stdout, stderr, .. } => combine_output(stdout, stderr),
            _ => unreachable!("generic failure classification implies Completed"),
        },
        Outcome::Success => String::new(),
    }
}

fn success_output(result: &RemoteResult) -> &str {
    match result {
        RemoteResult::Completed { stdout, .. } => trim_trailing_newline(stdout),
        RemoteResult::ConnectionFailed { .. } => "",
    }
}

fn combine_output(stdout: &str, stderr: &str) -> String {
    let stdout = trim_trailing_newline(stdout);
    let stderr = trim_trailing_newline(stderr);
    if stdout.is_empty() {
        stderr.to_string()
    } else if stderr.is_empty() {
        stdout.to_string()
    } else {
        format!("{}\n{}", stdout, stderr)
    }
}

fn trim_trailing_newline(text: &str) -> &str {
    text.strip_suffix('\n').unwrap_or(text)
}

/// Prefix every line with the originating host so concatenated multi-host
/// output stays attributable when piped into grep
fn render_body(host: &str, text: &str, prefix: bool) -> String {
    if !prefix {
        return text.to_string();
    }
    text.lines()
        .map(|line| format!("{} {}", host, line))
        .collect::<Vec<_>>()
        .join("\n")
}
