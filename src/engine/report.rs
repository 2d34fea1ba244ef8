//! What a run changed, for display

use colored::Colorize;
use declarative::{Intent, Outcome, Phase};

use crate::ui;

/// Everything one phase did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseReport {
    pub phase: Phase,
    /// Reconciled resources and the transition each produced
    pub resources: Vec<(String, Outcome)>,
    /// Packages handed to `apt-get install`
    pub installed: Vec<String>,
    /// Packages handed to `apt-get purge`
    pub purged: Vec<String>,
    /// Optional packages the repository does not offer
    pub skipped_optional: Vec<String>,
    /// Decisions worth showing (bound version, chosen compiler)
    pub notes: Vec<String>,
}

impl PhaseReport {
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            resources: Vec::new(),
            installed: Vec::new(),
            purged: Vec::new(),
            skipped_optional: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Record a reconciled resource
    pub fn record(&mut self, resource: &str, outcome: Outcome) {
        self.resources.push((resource.to_string(), outcome));
    }

    /// Outcome recorded for a resource, if any
    #[cfg(test)]
    pub fn outcome(&self, resource: &str) -> Option<Outcome> {
        self.resources
            .iter()
            .find(|(name, _)| name == resource)
            .map(|(_, outcome)| *outcome)
    }

    /// Whether anything on the host changed
    pub fn changed(&self) -> bool {
        self.resources.iter().any(|(_, o)| o.is_change())
            || !self.installed.is_empty()
            || !self.purged.is_empty()
    }
}

/// The result of one successful invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub target: String,
    pub intent: Intent,
    pub phases: Vec<PhaseReport>,
}

impl RunReport {
    /// Report of a phase, if the plan ran it
    pub fn phase(&self, phase: Phase) -> Option<&PhaseReport> {
        self.phases.iter().find(|p| p.phase == phase)
    }

    /// Print the report
    pub fn print(&self) {
        ui::header(&format!("{} {}", self.intent, self.target));

        for report in &self.phases {
            ui::section(&capitalize(&report.phase.to_string()));

            for (resource, outcome) in &report.resources {
                let label = match outcome {
                    Outcome::Unchanged => outcome.to_string().dimmed(),
                    Outcome::Created => outcome.to_string().green(),
                    Outcome::Removed => outcome.to_string().yellow(),
                };
                println!("  {resource}: {label}");
            }
            for note in &report.notes {
                ui::kv("note", note);
            }
            if !report.purged.is_empty() {
                ui::kv("purged", &report.purged.join(" "));
            }
            if !report.installed.is_empty() {
                ui::kv("installed", &report.installed.join(" "));
            }
            if !report.skipped_optional.is_empty() {
                ui::kv("not available", &report.skipped_optional.join(" "));
            }
            if !report.changed() {
                ui::dim("nothing to do");
            }
        }

        println!();
        ui::success(&format!("{} {} complete", self.intent, self.target));
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_report_changed() {
        let mut report = PhaseReport::new(Phase::Install);
        report.record("signing key", Outcome::Unchanged);
        assert!(!report.changed());
        assert_eq!(report.outcome("signing key"), Some(Outcome::Unchanged));
        assert_eq!(report.outcome("repository entry"), None);

        report.installed.push("clang-18".to_string());
        assert!(report.changed());
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("purge"), "Purge");
        assert_eq!(capitalize(""), "");
    }
}
