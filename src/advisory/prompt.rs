//! Prompt composer — pure string construction, no network access.
//!
//! Builds the fixed system context, the per-cohort advisory queries and
//! the final synthesis query. The downstream service is instructed to
//! answer in plain text only, so nothing here emits structural markup.

use crate::models::{Medicine, MedicineWithDescription, OverdueMedicine};

const SYSTEM_ROLE: &str = "You are Dosewise, a medication manager for people who struggle to keep \
track of their daily medicine intake (e.g., senior citizens). Your job is to provide advice and \
answer questions regarding the user's current medicine schedule. You are also responsible for \
researching any drug interactions (e.g., among medications, between medications and food or \
drink) and answering any general health questions the user has. THIS WILL REQUIRE YOU TO USE THE \
SEARCH FEATURE TO OBTAIN THE MOST RECENT AND ACCURATE MEDICAL DATA/ADVICE. Be clear and concise \
with your responses (i.e., no unnecessary flourishes or redundant information) and answer using \
plaintext only (i.e., no markdown or any special characters used for formatting). After every \
query, kindly inform the user that you are not a licensed professional and, for any questions \
you cannot sufficiently answer, offer suggestions for which the user can acquire more reputable \
advice (e.g., for health organizations: websites, articles, academic journals, etc.).";

fn roster_line(entry: &MedicineWithDescription) -> String {
    let med = &entry.medicine;
    let mut line = format!("- {} ({}", med.name, med.dosage_label());
    if let Some(freq) = med.frequency_hours {
        line.push_str(&format!(", every {freq} h"));
    } else {
        line.push_str(", as needed");
    }
    line.push_str(&format!(", {}", med.route));
    line.push(')');
    if med.usage_required {
        line.push_str(", scheduled use");
    } else {
        line.push_str(", optional use");
    }
    if let Some(timing) = &med.timing {
        line.push_str(&format!(", timing: {timing}"));
    }
    match &med.last_taken {
        Some(at) => line.push_str(&format!(", last taken {}", at.format("%Y-%m-%d %H:%M UTC"))),
        None => line.push_str(", never logged"),
    }
    if let Some(summary) = entry.description.as_ref().and_then(|d| d.summary()) {
        line.push_str(&format!(", appearance: {summary}"));
    }
    if let Some(notes) = &med.special_description {
        line.push_str(&format!(", notes: {notes}"));
    }
    if let Some(side_effects) = &med.side_effects {
        line.push_str(&format!(", side effects: {side_effects}"));
    }
    if let Some(interactions) = &med.interactions {
        line.push_str(&format!(", interactions: {interactions}"));
    }
    line
}

/// Build the fixed context block: assistant role plus the full medicine
/// roster.
pub fn system_context(meds: &[MedicineWithDescription]) -> String {
    let mut ctx = String::from(SYSTEM_ROLE);
    ctx.push_str("\n\nThe user's current medicine schedule:\n");
    if meds.is_empty() {
        ctx.push_str("(no medicines recorded)\n");
    } else {
        for entry in meds {
            ctx.push_str(&roster_line(entry));
            ctx.push('\n');
        }
    }
    ctx
}

/// Human-readable summary of a taken/due cohort, recomputed per run.
pub fn cohort_summary(meds: &[Medicine]) -> String {
    meds.iter()
        .map(|med| {
            let freq = med
                .frequency_hours
                .map(|f| format!("every {f} h"))
                .unwrap_or_else(|| "as needed".to_string());
            let last = med
                .last_taken
                .map(|at| format!("last taken {}", at.format("%Y-%m-%d %H:%M UTC")))
                .unwrap_or_else(|| "never logged".to_string());
            format!("{} ({}, {}, {})", med.name, med.dosage_label(), freq, last)
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Summary of the overdue cohort including the overdue margin.
pub fn overdue_summary(meds: &[OverdueMedicine]) -> String {
    meds.iter()
        .map(|od| {
            format!(
                "{} (every {} h, last taken {:.1} h ago, overdue by {:.1} h)",
                od.name, od.frequency_hours, od.hours_since, od.overdue_by
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Query for the already-taken cohort.
pub fn taken_query(context: &str, taken: &[Medicine]) -> String {
    format!(
        "{context}\n\nProvide a list of medications the user has already taken (i.e., {}) and \
         kindly advise the user not to take them again today.",
        cohort_summary(taken)
    )
}

/// Query for the due-today cohort.
pub fn due_query(context: &str, due: &[Medicine]) -> String {
    format!(
        "{context}\n\nProvide a list of medications the user has not yet taken (i.e., {}) and \
         kindly advise the user to take them today.",
        cohort_summary(due)
    )
}

/// Query for the overdue cohort.
pub fn overdue_query(context: &str, overdue: &[OverdueMedicine]) -> String {
    format!(
        "{context}\n\nProvide a list of medications the user is overdue on (i.e., {}) and kindly \
         advise the user to take them today while insisting upon the urgency of taking their \
         medication on time.",
        overdue_summary(overdue)
    )
}

/// Final synthesis query: context, aggregated cohort answers and the
/// user's own question.
pub fn final_query(
    context: &str,
    question: &str,
    taken_text: Option<&str>,
    due_text: Option<&str>,
    overdue_text: Option<&str>,
) -> String {
    format!(
        "{context}\n\nBased on the information provided, and the content of these (optional) \
         arguments:\n- Medications taken: {}\n- Medications due: {}\n- Medications overdue: \
         {}\n\nPlease answer the user's query to the best of your ability.\n\nUser query: \
         {question}",
        taken_text.unwrap_or("(none)"),
        due_text.unwrap_or("(none)"),
        overdue_text.unwrap_or("(none)"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MedicineDescription;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn med(name: &str, frequency_hours: Option<f64>) -> Medicine {
        Medicine {
            id: Uuid::new_v4(),
            name: name.into(),
            dosage_quantity: 325.0,
            dosage_unit: "mg".into(),
            frequency_hours,
            timing: None,
            last_taken: Some(Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap()),
            route: "oral".into(),
            special_description: None,
            usage_required: true,
            usage_period_days: None,
            side_effects: Some("stomach upset".into()),
            interactions: None,
            quantity: 10,
        }
    }

    fn entry(name: &str, frequency_hours: Option<f64>) -> MedicineWithDescription {
        MedicineWithDescription {
            medicine: med(name, frequency_hours),
            description: None,
        }
    }

    #[test]
    fn system_context_states_role_and_rules() {
        let ctx = system_context(&[]);
        assert!(ctx.contains("Dosewise"));
        assert!(ctx.contains("not a licensed professional"));
        assert!(ctx.contains("plaintext only"));
        assert!(ctx.contains("SEARCH FEATURE"));
        assert!(ctx.contains("(no medicines recorded)"));
    }

    #[test]
    fn system_context_lists_every_medicine() {
        let ctx = system_context(&[entry("Aspirin", Some(8.0)), entry("Centrum", None)]);
        assert!(ctx.contains("Aspirin (325 mg, every 8 h, oral)"));
        assert!(ctx.contains("Centrum (325 mg, as needed, oral)"));
        assert!(ctx.contains("side effects: stomach upset"));
        assert!(ctx.contains("last taken 2026-03-01 08:00 UTC"));
    }

    #[test]
    fn roster_line_includes_appearance() {
        let mut e = entry("Aspirin", Some(8.0));
        e.description = Some(MedicineDescription {
            med_id: e.medicine.id,
            colors: Some("white".into()),
            shape: Some("round".into()),
            ..Default::default()
        });
        assert!(roster_line(&e).contains("appearance: white round"));
    }

    #[test]
    fn taken_query_advises_against_repeat_dosing() {
        let q = taken_query("CTX", &[med("Aspirin", Some(8.0))]);
        assert!(q.starts_with("CTX"));
        assert!(q.contains("already taken"));
        assert!(q.contains("Aspirin"));
        assert!(q.contains("not to take them again today"));
    }

    #[test]
    fn due_query_advises_taking_today() {
        let q = due_query("CTX", &[med("Metformin", Some(12.0))]);
        assert!(q.contains("not yet taken"));
        assert!(q.contains("Metformin"));
        assert!(q.contains("take them today"));
    }

    #[test]
    fn overdue_query_emphasizes_urgency() {
        let overdue = vec![OverdueMedicine {
            med_id: Uuid::new_v4(),
            name: "Aspirin".into(),
            frequency_hours: 8.0,
            last_taken: Utc::now(),
            evaluated_at: Utc::now(),
            hours_since: 9.0,
            overdue_by: 1.0,
        }];
        let q = overdue_query("CTX", &overdue);
        assert!(q.contains("overdue"));
        assert!(q.contains("Aspirin"));
        assert!(q.contains("urgency"));
        assert!(q.contains("overdue by 1.0 h"));
    }

    #[test]
    fn final_query_embeds_question_and_cohort_texts() {
        let q = final_query(
            "CTX",
            "Can I drink coffee?",
            Some("taken answer"),
            None,
            Some("overdue answer"),
        );
        assert!(q.contains("User query: Can I drink coffee?"));
        assert!(q.contains("Medications taken: taken answer"));
        assert!(q.contains("Medications due: (none)"));
        assert!(q.contains("Medications overdue: overdue answer"));
    }

    #[test]
    fn summaries_join_with_semicolons() {
        let s = cohort_summary(&[med("A", Some(8.0)), med("B", None)]);
        assert!(s.contains("A (325 mg, every 8 h"));
        assert!(s.contains("; B (325 mg, as needed"));
    }
}
