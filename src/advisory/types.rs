//! Session and call types for the advisory pipeline.

use serde::Serialize;

/// Where one analysis run currently stands.
///
/// The machine only ever moves forward: idle → pending-taken → pending-due
/// → pending-overdue → pending-final → done, with `Failed` reachable from
/// the final step only. Cohort steps never fail the machine — they record
/// a sentinel text and advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    PendingTaken,
    PendingDue,
    PendingOverdue,
    PendingFinal,
    Done,
    Failed,
}

impl Phase {
    /// True while a reasoning call is in flight for this phase.
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            Self::PendingTaken | Self::PendingDue | Self::PendingOverdue | Self::PendingFinal
        )
    }

    /// True once the run has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::PendingTaken => write!(f, "pending-taken"),
            Self::PendingDue => write!(f, "pending-due"),
            Self::PendingOverdue => write!(f, "pending-overdue"),
            Self::PendingFinal => write!(f, "pending-final"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Model tier for one advisory call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    /// Cheap/fast model for per-cohort advice.
    Fast,
    /// Higher-reasoning model for the final synthesis.
    Deep,
}

/// Per-call configuration for the reasoning service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AskOptions {
    pub allow_external_research: bool,
    pub tier: ModelTier,
}

impl AskOptions {
    /// Cohort phases research with the fast tier.
    pub fn cohort() -> Self {
        Self {
            allow_external_research: true,
            tier: ModelTier::Fast,
        }
    }

    /// The final synthesis reasons over already-researched cohort text, so
    /// research stays off.
    pub fn final_synthesis() -> Self {
        Self {
            allow_external_research: false,
            tier: ModelTier::Deep,
        }
    }
}

/// Result of one completed analysis run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOutcome {
    pub taken_text: Option<String>,
    pub due_text: Option<String>,
    pub overdue_text: Option<String>,
    pub final_text: String,
    /// Final answer followed by the cohort texts, blank-line separated.
    pub aggregated: String,
}

/// Read-only view of the session for a presentation layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub question: String,
    pub phase: Phase,
    pub taken_text: Option<String>,
    pub due_text: Option<String>,
    pub overdue_text: Option<String>,
    pub final_text: Option<String>,
    pub aggregated: Option<String>,
}
