//! Dosewise — medication adherence advisories, spoken aloud.
//!
//! The pipeline: [`schedule`] classifies the medicine roster into taken,
//! due, and overdue cohorts; [`advisory`] composes prompts and drives the
//! reasoning calls through a per-session state machine; [`speech`] turns
//! the resulting text into audio and plays it.

pub mod advisory;
pub mod config;
pub mod db;
pub mod models;
pub mod schedule;
pub mod speech;

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use advisory::orchestrator::{AdvisoryOrchestrator, Reasoning};
use advisory::types::AnalysisOutcome;

#[derive(thiserror::Error, Debug)]
pub enum DosewiseError {
    #[error(transparent)]
    Database(#[from] db::DatabaseError),
    #[error(transparent)]
    Advisory(#[from] advisory::AdvisoryError),
    #[error(transparent)]
    Speech(#[from] speech::SpeechError),
}

/// One full advisory run against the stored roster: load medicines,
/// classify them at `now`, and drive the orchestrator to an answer.
pub async fn run_analysis<R: Reasoning>(
    conn: &Connection,
    reasoning: &R,
    question: &str,
    now: DateTime<Utc>,
) -> Result<AnalysisOutcome, DosewiseError> {
    let roster = db::repository::fetch_all_with_descriptions(conn)?;
    let cohorts = schedule::classify(&roster, now);

    let orchestrator = AdvisoryOrchestrator::new(reasoning);
    let outcome = orchestrator.analyze(question, &cohorts, &roster).await?;
    Ok(outcome)
}
