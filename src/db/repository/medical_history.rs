use chrono::Utc;
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::user::{parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::{HistoryFields, MedicalHistory};

const HISTORY_COLUMNS: &str = "history_id, patient_id, recorded_by, updated_by, medications,
     allergies, eye_injuries, eye_surgeries, social_history, family_history, diabetes,
     hypertension, nearsightedness, farsightedness, eye_glasses_or_lenses, created_at,
     updated_at, deleted_at";

/// Questionnaire submission. One row per patient: the first submit inserts
/// (stamping `recorded_by`), every later submit updates the same row in
/// place (stamping `updated_by`). Runs in a transaction so concurrent
/// submits cannot slip a duplicate past the existence check.
///
/// Returns the row and whether it was newly created.
pub fn upsert_history(
    conn: &mut Connection,
    patient_id: &Uuid,
    actor: &Uuid,
    fields: &HistoryFields,
) -> Result<(MedicalHistory, bool), DatabaseError> {
    let tx = conn.transaction()?;
    let now = Utc::now().to_rfc3339();

    let existing: Option<String> = tx
        .query_row(
            "SELECT history_id FROM medical_history WHERE patient_id = ?1",
            params![patient_id.to_string()],
            |row| row.get(0),
        )
        .map(Some)
        .or_else(ignore_no_rows)?;

    let (history_id, created) = match existing {
        Some(id) => {
            tx.execute(
                "UPDATE medical_history SET
                    medications = ?1, allergies = ?2, eye_injuries = ?3, eye_surgeries = ?4,
                    social_history = ?5, family_history = ?6, diabetes = ?7, hypertension = ?8,
                    nearsightedness = ?9, farsightedness = ?10, eye_glasses_or_lenses = ?11,
                    updated_by = ?12, updated_at = ?13
                 WHERE history_id = ?14",
                params![
                    fields.medications,
                    fields.allergies,
                    fields.eye_injuries,
                    fields.eye_surgeries,
                    fields.social_history,
                    fields.family_history,
                    fields.diabetes as i32,
                    fields.hypertension as i32,
                    fields.nearsightedness as i32,
                    fields.farsightedness as i32,
                    fields.eye_glasses_or_lenses as i32,
                    actor.to_string(),
                    now,
                    id,
                ],
            )?;
            (parse_uuid(&id)?, false)
        }
        None => {
            let id = Uuid::new_v4();
            tx.execute(
                "INSERT INTO medical_history
                    (history_id, patient_id, recorded_by, medications, allergies, eye_injuries,
                     eye_surgeries, social_history, family_history, diabetes, hypertension,
                     nearsightedness, farsightedness, eye_glasses_or_lenses, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                params![
                    id.to_string(),
                    patient_id.to_string(),
                    actor.to_string(),
                    fields.medications,
                    fields.allergies,
                    fields.eye_injuries,
                    fields.eye_surgeries,
                    fields.social_history,
                    fields.family_history,
                    fields.diabetes as i32,
                    fields.hypertension as i32,
                    fields.nearsightedness as i32,
                    fields.farsightedness as i32,
                    fields.eye_glasses_or_lenses as i32,
                    now,
                    now,
                ],
            )?;
            (id, true)
        }
    };

    tx.commit()?;

    let history = find_history_by_id(conn, &history_id)?.ok_or(DatabaseError::NotFound {
        entity_type: "MedicalHistory".into(),
        id: history_id.to_string(),
    })?;
    Ok((history, created))
}

/// Overwrite the questionnaire fields of an existing record.
/// Returns `None` when the record does not exist.
pub fn update_history(
    conn: &Connection,
    history_id: &Uuid,
    actor: &Uuid,
    fields: &HistoryFields,
) -> Result<Option<MedicalHistory>, DatabaseError> {
    let updated = conn.execute(
        "UPDATE medical_history SET
            medications = ?1, allergies = ?2, eye_injuries = ?3, eye_surgeries = ?4,
            social_history = ?5, family_history = ?6, diabetes = ?7, hypertension = ?8,
            nearsightedness = ?9, farsightedness = ?10, eye_glasses_or_lenses = ?11,
            updated_by = ?12, updated_at = ?13
         WHERE history_id = ?14",
        params![
            fields.medications,
            fields.allergies,
            fields.eye_injuries,
            fields.eye_surgeries,
            fields.social_history,
            fields.family_history,
            fields.diabetes as i32,
            fields.hypertension as i32,
            fields.nearsightedness as i32,
            fields.farsightedness as i32,
            fields.eye_glasses_or_lenses as i32,
            actor.to_string(),
            Utc::now().to_rfc3339(),
            history_id.to_string(),
        ],
    )?;

    if updated == 0 {
        return Ok(None);
    }
    find_history_by_id(conn, history_id)
}

pub fn histories_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<MedicalHistory>, DatabaseError> {
    let sql = format!(
        "SELECT {HISTORY_COLUMNS} FROM medical_history WHERE patient_id = ?1 ORDER BY created_at"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![patient_id.to_string()], map_history_row)?;

    let mut histories = Vec::new();
    for row in rows {
        histories.push(history_from_row(row?)?);
    }
    Ok(histories)
}

pub fn find_history_by_id(
    conn: &Connection,
    history_id: &Uuid,
) -> Result<Option<MedicalHistory>, DatabaseError> {
    let sql = format!("SELECT {HISTORY_COLUMNS} FROM medical_history WHERE history_id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query_map(params![history_id.to_string()], map_history_row)?;
    rows.next().transpose()?.map(history_from_row).transpose()
}

pub(crate) fn ignore_no_rows<T>(err: rusqlite::Error) -> Result<Option<T>, rusqlite::Error> {
    match err {
        rusqlite::Error::QueryReturnedNoRows => Ok(None),
        other => Err(other),
    }
}

type HistoryRow = (
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    i32,
    i32,
    i32,
    i32,
    i32,
    String,
    String,
    Option<String>,
);

fn map_history_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<HistoryRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
        row.get(10)?,
        row.get(11)?,
        row.get(12)?,
        row.get(13)?,
        row.get(14)?,
        row.get(15)?,
        row.get(16)?,
        row.get(17)?,
    ))
}

fn history_from_row(row: HistoryRow) -> Result<MedicalHistory, DatabaseError> {
    let (
        history_id,
        patient_id,
        recorded_by,
        updated_by,
        medications,
        allergies,
        eye_injuries,
        eye_surgeries,
        social_history,
        family_history,
        diabetes,
        hypertension,
        nearsightedness,
        farsightedness,
        eye_glasses_or_lenses,
        created_at,
        updated_at,
        deleted_at,
    ) = row;
    Ok(MedicalHistory {
        history_id: parse_uuid(&history_id)?,
        patient_id: parse_uuid(&patient_id)?,
        recorded_by: recorded_by.and_then(|s| Uuid::parse_str(&s).ok()),
        updated_by: updated_by.and_then(|s| Uuid::parse_str(&s).ok()),
        medications,
        allergies,
        eye_injuries,
        eye_surgeries,
        social_history,
        family_history,
        diabetes: diabetes != 0,
        hypertension: hypertension != 0,
        nearsightedness: nearsightedness != 0,
        farsightedness: farsightedness != 0,
        eye_glasses_or_lenses: eye_glasses_or_lenses != 0,
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
        deleted_at: deleted_at.map(|s| parse_timestamp(&s)),
    })
}
