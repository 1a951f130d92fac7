//! Advisory orchestrator — sequences cohort and final reasoning calls for
//! one analysis run.
//!
//! One submission = one session. Cohort calls go out strictly one after
//! another (taken → due → overdue, empty cohorts skipped) because each
//! phase's text feeds the final prompt. A cohort failure records a sentinel
//! apology and advances; only the final synthesis step can fail the run.
//! A newer submission supersedes an in-flight one: the old run's pending
//! calls are not aborted, they resolve into a stale epoch and their writes
//! are discarded.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tracing::{debug, info, warn};

use super::extract::{extract_content, StructuredResponse};
use super::prompt;
use super::types::{AnalysisOutcome, AskOptions, Phase, SessionSnapshot};
use super::AdvisoryError;
use crate::models::MedicineWithDescription;
use crate::schedule::Cohorts;

/// Recorded as a cohort's text when its advisory call fails.
pub const COHORT_FAILURE_TEXT: &str = "Error generating analysis. Please try again.";
/// Surfaced to the user when the final synthesis call fails.
pub const FINAL_FAILURE_TEXT: &str = "Error generating recommendation. Please try again.";

/// Seam to the external reasoning service.
pub trait Reasoning {
    fn ask(
        &self,
        prompt: &str,
        opts: &AskOptions,
    ) -> impl Future<Output = Result<StructuredResponse, AdvisoryError>>;
}

#[derive(Debug)]
struct SessionState {
    epoch: u64,
    question: String,
    phase: Phase,
    taken_text: Option<String>,
    due_text: Option<String>,
    overdue_text: Option<String>,
    final_text: Option<String>,
    aggregated: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            epoch: 0,
            question: String::new(),
            phase: Phase::Idle,
            taken_text: None,
            due_text: None,
            overdue_text: None,
            final_text: None,
            aggregated: None,
        }
    }
}

/// Short-lived pipeline driver holding the observable session state.
pub struct AdvisoryOrchestrator<'a, R: Reasoning> {
    reasoning: &'a R,
    state: Mutex<SessionState>,
    epoch: AtomicU64,
}

impl<'a, R: Reasoning> AdvisoryOrchestrator<'a, R> {
    pub fn new(reasoning: &'a R) -> Self {
        Self {
            reasoning,
            state: Mutex::new(SessionState::default()),
            epoch: AtomicU64::new(0),
        }
    }

    /// The pending phase a UI should render, or None when idle/terminal
    /// (the null sentinel).
    pub fn current_phase(&self) -> Option<Phase> {
        let state = self.state.lock().ok()?;
        state.phase.is_pending().then_some(state.phase)
    }

    /// Full machine state, including terminal states.
    pub fn phase(&self) -> Phase {
        self.state
            .lock()
            .map(|s| s.phase)
            .unwrap_or(Phase::Failed)
    }

    /// Read-only session view for the presentation layer.
    pub fn snapshot(&self) -> Result<SessionSnapshot, AdvisoryError> {
        let state = self.state.lock().map_err(|_| AdvisoryError::LockPoisoned)?;
        Ok(SessionSnapshot {
            question: state.question.clone(),
            phase: state.phase,
            taken_text: state.taken_text.clone(),
            due_text: state.due_text.clone(),
            overdue_text: state.overdue_text.clone(),
            final_text: state.final_text.clone(),
            aggregated: state.aggregated.clone(),
        })
    }

    /// Run one analysis: cohort advisories in taken → due → overdue order,
    /// then the final synthesis over the user's question.
    pub async fn analyze(
        &self,
        question: &str,
        cohorts: &Cohorts,
        roster: &[MedicineWithDescription],
    ) -> Result<AnalysisOutcome, AdvisoryError> {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.reset_session(epoch, question)?;

        let question = question.trim();
        if question.is_empty() && cohorts.is_empty() {
            debug!("Nothing to analyze and no question — short-circuiting");
            self.commit(epoch, |s| {
                s.phase = Phase::Done;
                s.final_text = Some(String::new());
                s.aggregated = Some(String::new());
            })?;
            return Ok(AnalysisOutcome::default());
        }

        let context = prompt::system_context(roster);

        let mut taken_text = None;
        if !cohorts.taken.is_empty() {
            let names: Vec<&str> = cohorts.taken.iter().map(|m| m.name.as_str()).collect();
            let query = prompt::taken_query(&context, &cohorts.taken);
            let text = self
                .cohort_call(epoch, Phase::PendingTaken, &query, &names)
                .await?;
            self.commit(epoch, |s| s.taken_text = Some(text.clone()))?;
            taken_text = Some(text);
        }

        let mut due_text = None;
        if !cohorts.due.is_empty() {
            let names: Vec<&str> = cohorts.due.iter().map(|m| m.name.as_str()).collect();
            let query = prompt::due_query(&context, &cohorts.due);
            let text = self
                .cohort_call(epoch, Phase::PendingDue, &query, &names)
                .await?;
            self.commit(epoch, |s| s.due_text = Some(text.clone()))?;
            due_text = Some(text);
        }

        let mut overdue_text = None;
        if !cohorts.overdue.is_empty() {
            let names: Vec<&str> = cohorts.overdue.iter().map(|m| m.name.as_str()).collect();
            let query = prompt::overdue_query(&context, &cohorts.overdue);
            let text = self
                .cohort_call(epoch, Phase::PendingOverdue, &query, &names)
                .await?;
            self.commit(epoch, |s| s.overdue_text = Some(text.clone()))?;
            overdue_text = Some(text);
        }

        self.commit(epoch, |s| s.phase = Phase::PendingFinal)?;
        let final_prompt = prompt::final_query(
            &context,
            question,
            taken_text.as_deref(),
            due_text.as_deref(),
            overdue_text.as_deref(),
        );
        match self
            .reasoning
            .ask(&final_prompt, &AskOptions::final_synthesis())
            .await
        {
            Ok(resp) => {
                let final_text = extract_content(&resp);
                let aggregated = aggregate(
                    &final_text,
                    taken_text.as_deref(),
                    due_text.as_deref(),
                    overdue_text.as_deref(),
                );
                self.commit(epoch, |s| {
                    s.phase = Phase::Done;
                    s.final_text = Some(final_text.clone());
                    s.aggregated = Some(aggregated.clone());
                })?;
                info!(epoch, "Analysis complete");
                Ok(AnalysisOutcome {
                    taken_text,
                    due_text,
                    overdue_text,
                    final_text,
                    aggregated,
                })
            }
            Err(e) => {
                warn!(epoch, phase = %Phase::PendingFinal, error = %e, "Final synthesis failed");
                self.commit(epoch, |s| {
                    s.phase = Phase::Failed;
                    s.final_text = Some(FINAL_FAILURE_TEXT.to_string());
                    s.aggregated = None;
                })?;
                Err(e)
            }
        }
    }

    /// One cohort advisory call. Failure records the apology sentinel and
    /// lets the pipeline advance; only a superseded session propagates up.
    async fn cohort_call(
        &self,
        epoch: u64,
        phase: Phase,
        query: &str,
        medicines: &[&str],
    ) -> Result<String, AdvisoryError> {
        self.commit(epoch, |s| s.phase = phase)?;
        match self.reasoning.ask(query, &AskOptions::cohort()).await {
            Ok(resp) => Ok(extract_content(&resp)),
            Err(AdvisoryError::Superseded) => Err(AdvisoryError::Superseded),
            Err(e) => {
                warn!(epoch, %phase, ?medicines, error = %e, "Cohort advisory call failed");
                Ok(COHORT_FAILURE_TEXT.to_string())
            }
        }
    }

    fn reset_session(&self, epoch: u64, question: &str) -> Result<(), AdvisoryError> {
        let mut state = self.state.lock().map_err(|_| AdvisoryError::LockPoisoned)?;
        // A later submission may already own the session.
        if state.epoch > epoch {
            return Err(AdvisoryError::Superseded);
        }
        *state = SessionState {
            epoch,
            question: question.trim().to_string(),
            ..Default::default()
        };
        Ok(())
    }

    /// Apply a state mutation only if this run still owns the session.
    fn commit<F: FnOnce(&mut SessionState)>(
        &self,
        epoch: u64,
        mutate: F,
    ) -> Result<(), AdvisoryError> {
        let mut state = self.state.lock().map_err(|_| AdvisoryError::LockPoisoned)?;
        if state.epoch != epoch {
            debug!(
                stale = epoch,
                current = state.epoch,
                "Discarding write from superseded session"
            );
            return Err(AdvisoryError::Superseded);
        }
        mutate(&mut state);
        Ok(())
    }
}

/// Final answer first, then the cohort texts in taken/due/overdue order,
/// blank-line separated for transparency.
fn aggregate(
    final_text: &str,
    taken_text: Option<&str>,
    due_text: Option<&str>,
    overdue_text: Option<&str>,
) -> String {
    [Some(final_text), taken_text, due_text, overdue_text]
        .into_iter()
        .flatten()
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
