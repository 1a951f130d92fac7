//! Medication repository — CRUD over the medicine cabinet.
//!
//! The pipeline only reads snapshots from here; the presentation layer is
//! the writer. `list_overdue` is derived through the schedule classifier so
//! the repository can never disagree with it.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use super::DatabaseError;
use crate::models::{Medicine, MedicineDescription, MedicineWithDescription, OverdueMedicine};
use crate::schedule;

fn medicine_from_row(row: &Row<'_>) -> Result<Medicine, rusqlite::Error> {
    Ok(Medicine {
        id: row
            .get::<_, String>(0)?
            .parse()
            .unwrap_or_else(|_| Uuid::nil()),
        name: row.get(1)?,
        dosage_quantity: row.get(2)?,
        dosage_unit: row.get(3)?,
        frequency_hours: row.get(4)?,
        timing: row.get(5)?,
        last_taken: row
            .get::<_, Option<String>>(6)?
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc)),
        route: row.get(7)?,
        special_description: row.get(8)?,
        usage_required: row.get::<_, i32>(9)? != 0,
        usage_period_days: row.get(10)?,
        side_effects: row.get(11)?,
        interactions: row.get(12)?,
        quantity: row.get(13)?,
    })
}

const MEDICINE_COLUMNS: &str = "id, name, dosage_quantity, dosage_unit, frequency_hours,
        timing, last_taken, route, special_description, usage_required,
        usage_period_days, side_effects, interactions, quantity";

/// Insert a new medicine record.
pub fn insert_medicine(conn: &Connection, med: &Medicine) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO medicines (
            id, name, dosage_quantity, dosage_unit, frequency_hours,
            timing, last_taken, route, special_description, usage_required,
            usage_period_days, side_effects, interactions, quantity
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            med.id.to_string(),
            med.name,
            med.dosage_quantity,
            med.dosage_unit,
            med.frequency_hours,
            med.timing,
            med.last_taken.map(|dt| dt.to_rfc3339()),
            med.route,
            med.special_description,
            med.usage_required as i32,
            med.usage_period_days,
            med.side_effects,
            med.interactions,
            med.quantity,
        ],
    )?;
    Ok(())
}

/// Update an existing medicine record in full.
pub fn update_medicine(conn: &Connection, med: &Medicine) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE medicines SET
            name = ?2, dosage_quantity = ?3, dosage_unit = ?4,
            frequency_hours = ?5, timing = ?6, last_taken = ?7, route = ?8,
            special_description = ?9, usage_required = ?10,
            usage_period_days = ?11, side_effects = ?12, interactions = ?13,
            quantity = ?14
         WHERE id = ?1",
        params![
            med.id.to_string(),
            med.name,
            med.dosage_quantity,
            med.dosage_unit,
            med.frequency_hours,
            med.timing,
            med.last_taken.map(|dt| dt.to_rfc3339()),
            med.route,
            med.special_description,
            med.usage_required as i32,
            med.usage_period_days,
            med.side_effects,
            med.interactions,
            med.quantity,
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "medicine".into(),
            id: med.id.to_string(),
        });
    }
    Ok(())
}

/// Delete a medicine (cascades to its description).
pub fn delete_medicine(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "DELETE FROM medicines WHERE id = ?1",
        params![id.to_string()],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "medicine".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Fetch a single medicine by id.
pub fn fetch_medicine(conn: &Connection, id: &Uuid) -> Result<Medicine, DatabaseError> {
    let sql = format!("SELECT {MEDICINE_COLUMNS} FROM medicines WHERE id = ?1");
    conn.query_row(&sql, params![id.to_string()], medicine_from_row)
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => DatabaseError::NotFound {
                entity_type: "medicine".into(),
                id: id.to_string(),
            },
            other => DatabaseError::from(other),
        })
}

/// Fetch all medicines, name order.
pub fn fetch_all_medicines(conn: &Connection) -> Result<Vec<Medicine>, DatabaseError> {
    let sql = format!("SELECT {MEDICINE_COLUMNS} FROM medicines ORDER BY name ASC");
    let mut stmt = conn.prepare(&sql)?;
    let meds = stmt
        .query_map([], medicine_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(meds)
}

/// Insert or replace the physical description for a medicine.
pub fn upsert_description(
    conn: &Connection,
    desc: &MedicineDescription,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO medicine_descriptions (
            med_id, dosage_form, shape, colors, size, numbers, letters,
            symbols, texture, odor
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT(med_id) DO UPDATE SET
            dosage_form = excluded.dosage_form, shape = excluded.shape,
            colors = excluded.colors, size = excluded.size,
            numbers = excluded.numbers, letters = excluded.letters,
            symbols = excluded.symbols, texture = excluded.texture,
            odor = excluded.odor",
        params![
            desc.med_id.to_string(),
            desc.dosage_form,
            desc.shape,
            desc.colors,
            desc.size,
            desc.numbers,
            desc.letters,
            desc.symbols,
            desc.texture,
            desc.odor,
        ],
    )?;
    Ok(())
}

/// Fetch the description for a medicine, if one exists.
pub fn fetch_description(
    conn: &Connection,
    med_id: &Uuid,
) -> Result<Option<MedicineDescription>, DatabaseError> {
    let result = conn.query_row(
        "SELECT med_id, dosage_form, shape, colors, size, numbers, letters,
                symbols, texture, odor
         FROM medicine_descriptions WHERE med_id = ?1",
        params![med_id.to_string()],
        |row| {
            Ok(MedicineDescription {
                med_id: row
                    .get::<_, String>(0)?
                    .parse()
                    .unwrap_or_else(|_| Uuid::nil()),
                dosage_form: row.get(1)?,
                shape: row.get(2)?,
                colors: row.get(3)?,
                size: row.get(4)?,
                numbers: row.get(5)?,
                letters: row.get(6)?,
                symbols: row.get(7)?,
                texture: row.get(8)?,
                odor: row.get(9)?,
            })
        },
    );
    match result {
        Ok(desc) => Ok(Some(desc)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(DatabaseError::from(e)),
    }
}

/// Fetch all medicines joined with their descriptions — the snapshot the
/// pipeline reads.
pub fn fetch_all_with_descriptions(
    conn: &Connection,
) -> Result<Vec<MedicineWithDescription>, DatabaseError> {
    let meds = fetch_all_medicines(conn)?;
    meds.into_iter()
        .map(|medicine| {
            let description = fetch_description(conn, &medicine.id)?;
            Ok(MedicineWithDescription {
                medicine,
                description,
            })
        })
        .collect()
}

/// Record that a dose was taken at `at`: stamps `last_taken` and decrements
/// the remaining stock (never below zero).
pub fn record_dose_taken(
    conn: &Connection,
    id: &Uuid,
    at: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE medicines
         SET last_taken = ?2, quantity = MAX(quantity - 1, 0)
         WHERE id = ?1",
        params![id.to_string(), at.to_rfc3339()],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "medicine".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Overdue medicines at `at`, derived through the schedule classifier.
pub fn list_overdue(
    conn: &Connection,
    at: DateTime<Utc>,
) -> Result<Vec<OverdueMedicine>, DatabaseError> {
    let meds = fetch_all_with_descriptions(conn)?;
    Ok(schedule::classify(&meds, at).overdue)
}
