//! Terminal output of a deployment run.
//!
//! - [`StepReporter`]: the numbered step log printed to stdout.
//! - [`table`]: listings for the status report.

pub mod table;

use std::{fmt, time::Duration};

use indicatif::{ProgressBar, ProgressStyle};

/// Prints the labelled progress of the pipeline: one `[n/N]` header per step
/// followed by a status line.
#[derive(Clone, Debug)]
pub struct StepReporter {
    total: usize,
}

impl StepReporter {
    pub const fn new(total: usize) -> Self { Self { total } }

    pub fn begin(&self, index: usize, name: &str) {
        println!("\n[{index}/{}] {name}", self.total);
    }

    pub fn success(&self, message: impl fmt::Display) { println!("  ✅ {message}"); }

    pub fn skipped(&self, message: impl fmt::Display) { println!("  ⏭️  {message}"); }

    pub fn warning(&self, message: impl fmt::Display) { println!("  ⚠️  {message}"); }

    /// Marks the step as failed. The error itself is printed once by `main`.
    pub fn failure(&self, name: &str) { eprintln!("{}", failure_line(name)); }

    pub fn detail(&self, message: impl fmt::Display) {
        for line in message.to_string().lines() {
            println!("     {line}");
        }
    }

    /// A spinner for waits without a known duration. Hidden automatically when
    /// stdout is not a terminal.
    pub fn spinner(&self, message: impl Into<String>) -> ProgressBar {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("  {spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(message.into());
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner
    }
}

fn failure_line(name: &str) -> String { format!("  ❌ {name} failed") }

#[cfg(test)]
mod tests {
    use super::failure_line;

    #[test]
    fn test_failure_line_names_only_the_step() {
        assert_eq!(failure_line("Applying manifests"), "  ❌ Applying manifests failed");
    }
}
