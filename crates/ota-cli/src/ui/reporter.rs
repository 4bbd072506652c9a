//! Terminal presentation sink.
//!
//! Renders one line per progress event on stderr and the outcome on stdout.
//! The engine can announce "ready to reboot" twice (a final Finalizing
//! update and the authoritative completion); the reboot prompt is shown
//! once per session regardless.

use crossterm::style::Stylize;
use ota_core::Reporter;
use ota_schema::{Outcome, ProgressEvent};
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct TerminalReporter {
    quiet: bool,
    reboot_prompted: AtomicBool,
}

impl TerminalReporter {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            reboot_prompted: AtomicBool::new(false),
        }
    }

    /// Returns true the first time only.
    fn claim_reboot_prompt(&self) -> bool {
        !self.reboot_prompted.swap(true, Ordering::SeqCst)
    }
}

/// Plain text for a progress event, e.g. `installing  42%`.
pub fn format_progress(event: &ProgressEvent) -> String {
    let label = event.phase.to_string();
    let mut line = match event.percent {
        Some(percent) => format!("{label:<12}{percent:>3}%"),
        None => format!("{label:<12}   ..."),
    };
    if let Some(message) = &event.message {
        line.push_str("  ");
        line.push_str(message);
    }
    line
}

/// Plain text for the terminal outcome.
pub fn format_outcome(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Success {
            reboot_required: true,
        } => "update applied, reboot to finish".to_string(),
        Outcome::Success {
            reboot_required: false,
        } => "update applied".to_string(),
        Outcome::Failure { code, message } => format!("update failed ({code}): {message}"),
    }
}

impl Reporter for TerminalReporter {
    fn progress(&self, event: &ProgressEvent) {
        if event.is_ready_to_reboot() {
            if self.claim_reboot_prompt() {
                eprintln!("{}", "ready to reboot".green().bold());
            }
            return;
        }
        if !self.quiet {
            eprintln!("{}", format_progress(event).dim());
        }
    }

    fn outcome(&self, outcome: &Outcome) {
        match outcome {
            Outcome::Success {
                reboot_required: true,
            } => {
                // The reboot prompt may already have been shown by progress.
                if self.claim_reboot_prompt() {
                    println!("{}", format_outcome(outcome).green().bold());
                } else {
                    println!("{}", "update applied".green().bold());
                }
            }
            Outcome::Success { .. } => println!("{}", format_outcome(outcome).green().bold()),
            Outcome::Failure { .. } => println!("{}", format_outcome(outcome).red().bold()),
        }
    }

    fn info(&self, msg: &str) {
        if !self.quiet {
            eprintln!("{msg}");
        }
    }

    fn warning(&self, msg: &str) {
        eprintln!("{} {msg}", "warning:".yellow().bold());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ota_schema::{FailureCode, Phase};

    #[test]
    fn test_format_progress() {
        let event = ProgressEvent::new(Phase::Downloading, 42);
        assert_eq!(format_progress(&event), "installing   42%");

        let event = ProgressEvent::indeterminate(Phase::Finalizing).with_message("finalizing");
        assert_eq!(format_progress(&event), "finalizing     ...  finalizing");
    }

    #[test]
    fn test_format_outcome() {
        let failure = Outcome::failure(FailureCode::PayloadNotFound, "no payload.bin");
        assert!(format_outcome(&failure).starts_with("update failed"));
        assert!(format_outcome(&failure).ends_with("no payload.bin"));
    }

    #[test]
    fn test_reboot_prompt_is_claimed_once() {
        let reporter = TerminalReporter::new(true);
        assert!(reporter.claim_reboot_prompt());
        assert!(!reporter.claim_reboot_prompt());
    }
}
