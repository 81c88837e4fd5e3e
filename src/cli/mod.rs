//! CLI command definitions and argument parsing.
//!
//! Uses clap derive macros for ergonomic argument definitions.

pub mod args;

/// Print a dimmed status line to stderr.
///
/// Stdout stays reserved for rendered results so JSON output can be piped.
pub fn print_status(message: &str) {
    use colored::Colorize;
    use std::io::Write;
    let stderr = std::io::stderr();
    let mut handle = stderr.lock();
    let _ = writeln!(handle, "  {} {}", "commet".bold(), format!("· {message}").dimmed());
    let _ = handle.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn print_status_does_not_panic() {
        print_status("Fetching octo/demo");
    }
}
