use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One prescribed (or over-the-counter) drug entry in the user's cabinet.
///
/// Scheduling invariant: a medicine participates in due/taken/overdue
/// classification only when `usage_required` is true AND both
/// `frequency_hours` and `last_taken` are present. As-needed medicines
/// (`frequency_hours: None`) and never-logged medicines are excluded from
/// automatic inference — they require manual entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medicine {
    pub id: Uuid,
    pub name: String,
    pub dosage_quantity: f64,
    pub dosage_unit: String,
    /// Dosing interval in hours. None for as-needed medicines.
    pub frequency_hours: Option<f64>,
    /// Free-text timing hint ("with breakfast", "before bed").
    pub timing: Option<String>,
    pub last_taken: Option<DateTime<Utc>>,
    pub route: String,
    pub special_description: Option<String>,
    /// true = scheduled use, false = optional/as-needed.
    pub usage_required: bool,
    /// Length of the course in days, when limited.
    pub usage_period_days: Option<i64>,
    pub side_effects: Option<String>,
    pub interactions: Option<String>,
    /// Remaining stock (pills, doses).
    pub quantity: i64,
}

impl Medicine {
    /// Whether this medicine is eligible for automatic schedule
    /// classification.
    pub fn is_schedule_candidate(&self) -> bool {
        self.usage_required && self.frequency_hours.is_some() && self.last_taken.is_some()
    }

    /// "500 mg" style dosage label used in prompts and summaries.
    pub fn dosage_label(&self) -> String {
        format!("{} {}", self.dosage_quantity, self.dosage_unit)
    }
}

/// Physical-appearance metadata, keyed 1:1 by medicine id.
///
/// Read-only context for advisory prompts; has no lifecycle of its own in
/// the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicineDescription {
    pub med_id: Uuid,
    pub dosage_form: Option<String>,
    pub shape: Option<String>,
    pub colors: Option<String>,
    pub size: Option<String>,
    pub numbers: Option<String>,
    pub letters: Option<String>,
    pub symbols: Option<String>,
    pub texture: Option<String>,
    pub odor: Option<String>,
}

impl MedicineDescription {
    /// Short "white round tablet marked L484" style summary, or None when
    /// nothing is recorded.
    pub fn summary(&self) -> Option<String> {
        let parts: Vec<&str> = [
            self.colors.as_deref(),
            self.shape.as_deref(),
            self.dosage_form.as_deref(),
            self.numbers.as_deref(),
            self.letters.as_deref(),
            self.symbols.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|s| !s.trim().is_empty())
        .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

/// Join view: a medicine plus its (optional) physical description.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicineWithDescription {
    #[serde(flatten)]
    pub medicine: Medicine,
    pub description: Option<MedicineDescription>,
}

/// Derived, ephemeral view of a medicine past its dosing window.
///
/// Recomputed on every classification pass against a fixed evaluation
/// timestamp; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverdueMedicine {
    pub med_id: Uuid,
    pub name: String,
    pub frequency_hours: f64,
    pub last_taken: DateTime<Utc>,
    pub evaluated_at: DateTime<Utc>,
    /// Fractional hours since the last dose at `evaluated_at`.
    pub hours_since: f64,
    /// hours_since - frequency_hours; always > 0 for an overdue entry.
    pub overdue_by: f64,
}
