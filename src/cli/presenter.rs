//! CLI presenter for output formatting

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use crate::application::StatusReport;

/// Presenter for CLI output formatting
pub struct Presenter {
    spinner: Option<ProgressBar>,
}

impl Presenter {
    /// Create a new presenter
    pub fn new() -> Self {
        Self { spinner: None }
    }

    /// Start a spinner with message
    pub fn start_spinner(&mut self, message: &str) {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} {msg}")
        {
            spinner.set_style(style);
        }
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        self.spinner = Some(spinner);
    }

    /// Update spinner message
    pub fn update_spinner(&self, message: &str) {
        if let Some(ref spinner) = self.spinner {
            spinner.set_message(message.to_string());
        }
    }

    /// Mark spinner as success and finish
    pub fn spinner_success(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_with_message(format!("{} {}", "✓".green(), message));
        }
    }

    /// Stop spinner without status
    pub fn stop_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    /// Print info message to stderr
    pub fn info(&self, message: &str) {
        eprintln!("{} {}", "ℹ".cyan(), message);
    }

    /// Print success message to stderr
    pub fn success(&self, message: &str) {
        eprintln!("{} {}", "✓".green(), message);
    }

    /// Print warning message to stderr
    pub fn warn(&self, message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Print error message to stderr
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Output text to stdout (saved locations, config values)
    pub fn output(&self, text: &str) {
        println!("{}", text);
    }

    /// Format recording progress bar
    pub fn format_progress(&self, elapsed_ms: u64, total_ms: u64) -> String {
        let elapsed_secs = elapsed_ms / 1000;
        let total_secs = total_ms / 1000;
        let percent = if total_ms > 0 {
            (elapsed_ms as f64 / total_ms as f64 * 100.0).min(100.0)
        } else {
            0.0
        };

        let bar_width = 20;
        let filled = ((percent / 100.0) * bar_width as f64) as usize;
        let empty = bar_width - filled;

        format!(
            "[{}{}] {:>3}s / {}s",
            "█".repeat(filled).cyan(),
            "░".repeat(empty),
            elapsed_secs,
            total_secs
        )
    }

    /// Update recording progress
    pub fn update_recording_progress(&self, elapsed_ms: u64, total_ms: u64) {
        let progress = self.format_progress(elapsed_ms, total_ms);
        self.update_spinner(&format!("Recording... {}", progress));
    }

    /// Print daemon status
    pub fn daemon_status(&self, state: &str) {
        eprintln!("{} Daemon: {}", "●".cyan(), state);
    }

    /// One-line summary of a status report, for daemon logs
    pub fn format_status_line(&self, report: &StatusReport) -> String {
        let mut line = report.state.to_string();
        if let Some(session) = report.session {
            line.push_str(&format!(" ({})", session));
        }
        if report.pending_transfers > 0 {
            line.push_str(&format!(", {} pending", report.pending_transfers));
        }
        if let Some(ref error) = report.last_error {
            line.push_str(&format!(", error: {}", error));
        }
        line
    }

    /// Print a full status report to stdout
    pub fn status_report(&self, report: &StatusReport) {
        let not_set = "-".to_string();
        self.key_value("state", report.state.as_str());
        self.key_value("recording", &report.is_recording.to_string());
        self.key_value(
            "session",
            &report.session.map(|s| s.to_string()).unwrap_or_else(|| not_set.clone()),
        );
        self.key_value(
            "started_at",
            &report
                .started_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| not_set.clone()),
        );
        self.key_value("saved", &report.saved_count.to_string());
        self.key_value(
            "last_saved",
            &report
                .last_saved
                .as_ref()
                .map(|h| h.to_string())
                .unwrap_or_else(|| not_set.clone()),
        );
        self.key_value("pending_transfers", &report.pending_transfers.to_string());
        match report.last_error {
            Some(ref error) => self.key_value("last_error", &error.red().to_string()),
            None => self.key_value("last_error", &not_set),
        }
    }

    /// Print a key-value pair (for config list)
    pub fn key_value(&self, key: &str, value: &str) {
        println!("{}: {}", key.cyan(), value);
    }
}

impl Default for Presenter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::{SessionId, SessionState};

    #[test]
    fn format_progress_at_start() {
        let presenter = Presenter::new();
        let progress = presenter.format_progress(0, 10000);
        assert!(progress.contains("0s / 10s"));
    }

    #[test]
    fn format_progress_at_half() {
        let presenter = Presenter::new();
        let progress = presenter.format_progress(5000, 10000);
        assert!(progress.contains("5s / 10s"));
    }

    #[test]
    fn format_progress_past_end_is_capped() {
        let presenter = Presenter::new();
        let progress = presenter.format_progress(15000, 10000);
        assert!(progress.contains("15s / 10s"));
        assert!(!progress.contains('░'));
    }

    #[test]
    fn status_line_for_idle() {
        let presenter = Presenter::new();
        assert_eq!(presenter.format_status_line(&StatusReport::default()), "idle");
    }

    #[test]
    fn status_line_includes_session_and_error() {
        let presenter = Presenter::new();
        let report = StatusReport {
            is_recording: true,
            state: SessionState::Active,
            session: Some(SessionId::new(3)),
            last_error: Some("boom".to_string()),
            pending_transfers: 2,
            ..Default::default()
        };
        assert_eq!(
            presenter.format_status_line(&report),
            "active (session-3), 2 pending, error: boom"
        );
    }
}
