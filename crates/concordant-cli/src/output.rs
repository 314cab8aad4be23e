//! Output formatting for run summaries

use chrono::{DateTime, Utc};
use concordant::{ResultSummary, SummaryReport};
use console::{style, Term};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Output format for run summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON report
    Json,
}

/// JSON document printed by `run --format json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// When the run finished
    pub generated_at: DateTime<Utc>,
    /// Where the annotated document was written
    pub output: PathBuf,
    /// Top-level specification
    pub summary: SummaryReport,
    /// Specifications reached through `run` commands
    pub nested: Vec<SummaryReport>,
}

impl RunReport {
    /// Build a report from finished summaries
    #[must_use]
    pub fn new(output: PathBuf, summary: &ResultSummary, nested: &[ResultSummary]) -> Self {
        Self {
            generated_at: Utc::now(),
            output,
            summary: summary.report(),
            nested: nested.iter().map(ResultSummary::report).collect(),
        }
    }

    /// Pretty JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Writes run results to the terminal
#[derive(Debug)]
pub struct SummaryPrinter {
    term: Term,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for SummaryPrinter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl SummaryPrinter {
    /// Create a new printer writing to stdout
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stdout(),
            use_color,
            quiet,
        }
    }

    /// Print a finished specification. Failing summaries print even in
    /// quiet mode.
    pub fn summary(&self, summary: &ResultSummary) {
        if self.quiet && summary.is_success() {
            return;
        }
        let _ = self.term.write_line(&self.render(summary));
    }

    /// Text form of a summary, optionally styled
    #[must_use]
    pub fn render(&self, summary: &ResultSummary) -> String {
        let text = summary.render_text();
        if !self.use_color {
            return text.trim_end().to_string();
        }
        let status = if summary.is_success() {
            style("PASSED").green().bold()
        } else {
            style("FAILED").red().bold()
        };
        format!("{status} {}", text.trim_end())
    }

    /// Print the location of written output
    pub fn written(&self, path: &std::path::Path) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("→").cyan().bold().to_string()
        } else {
            "OUT".to_string()
        };
        let _ = self.term.write_line(&format!("{prefix} {}", path.display()));
    }
}
