//! Schedule classifier — pure cohort computation from timing data.
//!
//! Splits the cabinet into three cohorts against a fixed evaluation
//! timestamp: *taken* (last dose still covers its window), *due* (next dose
//! falls within the current day) and *overdue* (past the window). Taken and
//! due are deliberately separate concepts: a dose taken this morning can be
//! covered right now and still have its next dose land today, so the same
//! medicine may appear in both cohorts.

use chrono::{DateTime, Duration, Utc};

use crate::models::{Medicine, MedicineWithDescription, OverdueMedicine};

/// The three disjointly-computed medicine groupings for one evaluation pass.
#[derive(Debug, Clone, Default)]
pub struct Cohorts {
    /// Candidates whose next dose falls on or before the end of the
    /// current day.
    pub due: Vec<Medicine>,
    /// Candidates whose last dose still covers the dosing window.
    pub taken: Vec<Medicine>,
    /// Candidates past their dosing window, with overdue arithmetic.
    pub overdue: Vec<OverdueMedicine>,
}

impl Cohorts {
    pub fn is_empty(&self) -> bool {
        self.due.is_empty() && self.taken.is_empty() && self.overdue.is_empty()
    }
}

/// Classify medicines into cohorts at `now`.
///
/// Deterministic function of its inputs: no I/O, no clock reads. Medicines
/// failing the candidate precondition (`usage_required` with both
/// `frequency_hours` and `last_taken` present) are excluded from every
/// cohort. Malformed timing data skips the offending medicine, never the
/// batch.
pub fn classify(meds: &[MedicineWithDescription], now: DateTime<Utc>) -> Cohorts {
    let mut cohorts = Cohorts::default();

    for entry in meds {
        let med = &entry.medicine;
        if !med.is_schedule_candidate() {
            continue;
        }
        // Candidate check guarantees both are present.
        let (Some(frequency_hours), Some(last_taken)) = (med.frequency_hours, med.last_taken)
        else {
            continue;
        };

        let hours_since = (now - last_taken).num_seconds() as f64 / 3600.0;
        if frequency_hours <= 0.0 || hours_since < 0.0 {
            tracing::warn!(
                medicine = %med.name,
                med_id = %med.id,
                frequency_hours,
                hours_since,
                "Skipping medicine with malformed timing data"
            );
            continue;
        }

        // Non-strict boundary favors the user: exactly at the window edge
        // still counts as taken.
        if hours_since > frequency_hours {
            cohorts.overdue.push(OverdueMedicine {
                med_id: med.id,
                name: med.name.clone(),
                frequency_hours,
                last_taken,
                evaluated_at: now,
                hours_since,
                overdue_by: hours_since - frequency_hours,
            });
        } else {
            cohorts.taken.push(med.clone());
        }

        let next_due = last_taken + Duration::seconds((frequency_hours * 3600.0) as i64);
        if next_due.date_naive() <= now.date_naive() {
            cohorts.due.push(med.clone());
        }
    }

    cohorts
}
