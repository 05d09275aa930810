use serde::Serialize;
use std::fmt;

/// Pipeline stage that produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Graph,
    Resolution,
    Scoring,
    Weighting,
    Aggregation,
}

impl Stage {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Graph => "graph",
            Self::Resolution => "resolution",
            Self::Scoring => "scoring",
            Self::Weighting => "weighting",
            Self::Aggregation => "aggregation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
}

impl Severity {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Info => "Info",
            Self::Warning => "Warning",
        }
    }
}

/// A note raised while evaluating, e.g. a column that had to be coerced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub stage: Stage,
    pub severity: Severity,
    pub subject: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} '{}': {}",
            self.severity.label(),
            self.stage.label(),
            self.subject,
            self.message
        )
    }
}

/// Ordered diagnostics collected during one run, passed explicitly through each stage.
///
/// Every recorded entry is also emitted as a `tracing` event.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, stage: Stage, subject: impl Into<String>, message: impl Into<String>) {
        self.record(stage, Severity::Info, subject.into(), message.into());
    }

    pub fn warn(&mut self, stage: Stage, subject: impl Into<String>, message: impl Into<String>) {
        self.record(stage, Severity::Warning, subject.into(), message.into());
    }

    fn record(&mut self, stage: Stage, severity: Severity, subject: String, message: String) {
        match severity {
            Severity::Info => {
                tracing::info!(stage = stage.label(), subject = %subject, "{message}")
            }
            Severity::Warning => {
                tracing::warn!(stage = stage.label(), subject = %subject, "{message}")
            }
        }
        self.entries.push(Diagnostic {
            stage,
            severity,
            subject,
            message,
        });
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries
            .iter()
            .filter(|entry| entry.severity == Severity::Warning)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
