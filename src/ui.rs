//! Terminal output: spinner while a job runs, coloured result afterwards.
//!
//! Uses `indicatif` for the spinner and `console` for styling.
//! [`JobProgress`] follows the snapshots published by the controller.

use std::time::Duration;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::state_machine::{AuditRecord, JobSnapshot, JobState};

pub struct JobProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
    dim: Style,
}

impl JobProgress {
    pub fn start(subject: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(format!("{}: {subject}", JobState::Running));
        pb.enable_steady_tick(Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            dim: Style::new().dim(),
        }
    }

    /// Refreshes the spinner line; announces the switch to the fallback producer once.
    pub fn update(&self, snapshot: &JobSnapshot, fallback_announced: &mut bool) {
        if snapshot.fallback_active && !*fallback_announced {
            *fallback_announced = true;
            self.pb.println(format!(
                "  {} Primary synthesis failed, trying reduced detail",
                self.yellow.apply_to("↻")
            ));
        }
        self.pb.set_message(format!("{}", snapshot.state));
    }

    /// Stops the spinner and prints the terminal outcome.
    pub fn complete(&self, snapshot: &JobSnapshot) {
        self.pb.finish_and_clear();
        let message = snapshot.message.as_deref().unwrap_or_default();
        match snapshot.state {
            JobState::Succeeded => println!("  {} {message}", self.green.apply_to("✓")),
            _ => println!("  {} {message}", self.red.apply_to("✗")),
        }

        let Some(bundle) = &snapshot.bundle else {
            return;
        };
        for artifact in &bundle.artifacts {
            println!("    {} {}", artifact.label, self.dim.apply_to(&artifact.uri));
        }
        for (i, stage) in bundle.timeline.stages.iter().enumerate() {
            println!(
                "    {}. {} [{}] {}",
                i + 1,
                stage.title,
                stage.period_label,
                self.dim.apply_to(&stage.narrative)
            );
        }
    }

    pub fn print_audit(&self, record: &AuditRecord) {
        let style = if record.outcome == "Succeeded" {
            &self.green
        } else {
            &self.red
        };
        println!();
        println!("{}", style.apply_to("─── Audit Record ───"));
        println!(
            "{}",
            serde_json::to_string_pretty(record).unwrap_or_default()
        );
    }
}
