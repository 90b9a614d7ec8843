// Terminal output for meshctl

use std::io::IsTerminal;
use std::sync::atomic::{AtomicBool, Ordering};

use colored::*;

use super::table::Listing;

/// How a resource listing should be rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Column-aligned table
    #[default]
    Table,
    /// Tab-separated values
    Tsv,
    /// JSON array of objects
    Json,
}

/// Terminal output manager
///
/// Also owns the process-wide any-error flag: per-host failures never abort
/// a command, but they must surface as a nonzero exit code at the end.
pub struct TerminalOutput {
    verbose: bool,
    any_error: AtomicBool,
}

impl TerminalOutput {
    pub fn new(verbose: bool) -> Self {
        let is_tty = std::io::stdout().is_terminal();

        // Respect NO_COLOR (https://no-color.org/) and disable colors when piped
        if std::env::var("NO_COLOR").is_ok() || !is_tty {
            colored::control::set_override(false);
        }

        TerminalOutput {
            verbose,
            any_error: AtomicBool::new(false),
        }
    }

    /// Record that at least one failure occurred during this invocation
    pub fn flag_error(&self) {
        self.any_error.store(true, Ordering::Relaxed);
    }

    /// Whether any failure occurred; maps to the process exit code
    pub fn had_error(&self) -> bool {
        self.any_error.load(Ordering::Relaxed)
    }

    /// Print a phase header for multi-step cluster operations
    pub fn print_phase(&self, text: &str) {
        println!("{}", text);
    }

    /// Print an aggregate report block
    pub fn print_report(&self, text: &str) {
        if !text.is_empty() {
            println!("{}", text);
        }
    }

    pub fn print_listing(&self, listing: &Listing, format: OutputFormat) {
        if listing.is_empty() && format == OutputFormat::Table {
            println!("{}", "No entries found.".yellow());
            return;
        }
        match format {
            OutputFormat::Table => print!("{}", listing.to_table()),
            OutputFormat::Tsv => println!("{}", listing.to_tsv()),
            OutputFormat::Json => println!("{}", listing.to_json()),
        }
    }

    pub fn print_ok(&self, message: &str) {
        println!("{} {}", message, "OK".green());
    }

    pub fn print_failed(&self, message: &str) {
        self.flag_error();
        println!("{} {}", message, "Failed".red());
    }

    pub fn print_warning(&self, message: &str) {
        println!("{}", message.yellow());
    }

    pub fn print_error(&self, err: &crate::output::MeshError) {
        self.flag_error();
        eprint!("{}", err);
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }
}
