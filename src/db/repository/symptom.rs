//! Symptom catalog and history↔symptom associations.
//!
//! Invariant: `symptoms.tracker` equals the number of live association rows
//! referencing the symptom. Both sides of every attach/detach mutate inside
//! one transaction, so the counter cannot drift from the association table
//! under concurrent requests.

use rusqlite::{params, Connection};
use uuid::Uuid;

use super::medical_history::ignore_no_rows;
use super::user::parse_uuid;
use crate::db::DatabaseError;
use crate::models::{HistorySymptom, Symptom};

/// Outcome of attaching a symptom to a patient's history.
#[derive(Debug)]
pub enum LinkOutcome {
    /// Association created; tracker incremented (or seeded at 1).
    Linked {
        symptom_id: Uuid,
        association: HistorySymptom,
    },
    /// The pair was already linked; nothing changed, tracker untouched.
    AlreadyLinked { symptom_id: Uuid },
    /// The patient has no medical-history record to attach to.
    NoHistory,
}

/// Outcome of detaching a symptom from a patient's history.
#[derive(Debug, PartialEq, Eq)]
pub enum UnlinkOutcome {
    Removed,
    SymptomNotFound,
    NoHistory,
    NotLinked,
}

/// Attach `symptom_name` to the patient's history record.
///
/// Known symptom + existing link → no-op (idempotent: a double add must not
/// double-increment). Known symptom + new link → tracker + 1. Unknown
/// symptom → catalog insert with tracker = 1. Name matching is exact and
/// case-sensitive, as in the catalog.
pub fn link_symptom(
    conn: &mut Connection,
    patient_id: &Uuid,
    symptom_name: &str,
) -> Result<LinkOutcome, DatabaseError> {
    let tx = conn.transaction()?;

    let history_id: Option<String> = tx
        .query_row(
            "SELECT history_id FROM medical_history WHERE patient_id = ?1",
            params![patient_id.to_string()],
            |row| row.get(0),
        )
        .map(Some)
        .or_else(ignore_no_rows)?;
    let Some(history_id) = history_id else {
        return Ok(LinkOutcome::NoHistory);
    };

    let existing: Option<String> = tx
        .query_row(
            "SELECT symptom_id FROM symptoms WHERE symptom_name = ?1",
            params![symptom_name],
            |row| row.get(0),
        )
        .map(Some)
        .or_else(ignore_no_rows)?;

    let symptom_id = match existing {
        Some(id) => {
            let linked: i64 = tx.query_row(
                "SELECT COUNT(*) FROM medical_history_symptoms
                 WHERE history_id = ?1 AND symptom_id = ?2",
                params![history_id, id],
                |row| row.get(0),
            )?;
            if linked > 0 {
                // Leave the transaction uncommitted; nothing was written.
                return Ok(LinkOutcome::AlreadyLinked {
                    symptom_id: parse_uuid(&id)?,
                });
            }
            tx.execute(
                "UPDATE symptoms SET tracker = tracker + 1 WHERE symptom_id = ?1",
                params![id],
            )?;
            id
        }
        None => {
            let id = Uuid::new_v4().to_string();
            tx.execute(
                "INSERT INTO symptoms (symptom_id, symptom_name, tracker) VALUES (?1, ?2, 1)",
                params![id, symptom_name],
            )?;
            id
        }
    };

    let association_id = Uuid::new_v4();
    tx.execute(
        "INSERT INTO medical_history_symptoms (history_symptom_id, history_id, symptom_id)
         VALUES (?1, ?2, ?3)",
        params![association_id.to_string(), history_id, symptom_id],
    )?;

    tx.commit()?;

    Ok(LinkOutcome::Linked {
        symptom_id: parse_uuid(&symptom_id)?,
        association: HistorySymptom {
            history_symptom_id: association_id,
            history_id: parse_uuid(&history_id)?,
            symptom_id: parse_uuid(&symptom_id)?,
        },
    })
}

/// Detach `symptom_name` from the patient's history record, decrementing
/// the tracker clamped at zero.
pub fn unlink_symptom(
    conn: &mut Connection,
    patient_id: &Uuid,
    symptom_name: &str,
) -> Result<UnlinkOutcome, DatabaseError> {
    let tx = conn.transaction()?;

    let symptom_id: Option<String> = tx
        .query_row(
            "SELECT symptom_id FROM symptoms WHERE symptom_name = ?1",
            params![symptom_name],
            |row| row.get(0),
        )
        .map(Some)
        .or_else(ignore_no_rows)?;
    let Some(symptom_id) = symptom_id else {
        return Ok(UnlinkOutcome::SymptomNotFound);
    };

    let history_id: Option<String> = tx
        .query_row(
            "SELECT history_id FROM medical_history WHERE patient_id = ?1",
            params![patient_id.to_string()],
            |row| row.get(0),
        )
        .map(Some)
        .or_else(ignore_no_rows)?;
    let Some(history_id) = history_id else {
        return Ok(UnlinkOutcome::NoHistory);
    };

    let deleted = tx.execute(
        "DELETE FROM medical_history_symptoms WHERE history_id = ?1 AND symptom_id = ?2",
        params![history_id, symptom_id],
    )?;
    if deleted == 0 {
        return Ok(UnlinkOutcome::NotLinked);
    }

    tx.execute(
        "UPDATE symptoms SET tracker = MAX(tracker - 1, 0) WHERE symptom_id = ?1",
        params![symptom_id],
    )?;

    tx.commit()?;
    Ok(UnlinkOutcome::Removed)
}

/// Symptom ⋈ association ⋈ history, filtered by patient.
pub fn symptoms_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<Symptom>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT s.symptom_id, s.symptom_name, s.tracker
         FROM symptoms s
         JOIN medical_history_symptoms mhs ON s.symptom_id = mhs.symptom_id
         JOIN medical_history mh ON mh.history_id = mhs.history_id
         WHERE mh.patient_id = ?1
         ORDER BY s.symptom_name",
    )?;
    let rows = stmt.query_map(params![patient_id.to_string()], map_symptom_row)?;
    symptom_rows_to_vec(rows)
}

/// Case-insensitive substring search, most-tracked first.
pub fn search_symptoms(conn: &Connection, query: &str) -> Result<Vec<Symptom>, DatabaseError> {
    let pattern = format!("%{}%", query);
    let mut stmt = conn.prepare(
        "SELECT symptom_id, symptom_name, tracker FROM symptoms
         WHERE symptom_name LIKE ?1 ORDER BY tracker DESC, symptom_name",
    )?;
    let rows = stmt.query_map(params![pattern], map_symptom_row)?;
    symptom_rows_to_vec(rows)
}

/// The 25 most-tracked catalog entries.
pub fn top_symptoms(conn: &Connection) -> Result<Vec<Symptom>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT symptom_id, symptom_name, tracker FROM symptoms
         ORDER BY tracker DESC, symptom_name LIMIT 25",
    )?;
    let rows = stmt.query_map([], map_symptom_row)?;
    symptom_rows_to_vec(rows)
}

pub fn find_symptom_by_name(
    conn: &Connection,
    symptom_name: &str,
) -> Result<Option<Symptom>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT symptom_id, symptom_name, tracker FROM symptoms WHERE symptom_name = ?1",
    )?;
    let mut rows = stmt.query_map(params![symptom_name], map_symptom_row)?;
    rows.next().transpose()?.map(symptom_from_row).transpose()
}

type SymptomRow = (String, String, i64);

fn map_symptom_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SymptomRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn symptom_from_row(row: SymptomRow) -> Result<Symptom, DatabaseError> {
    let (symptom_id, symptom_name, tracker) = row;
    Ok(Symptom {
        symptom_id: parse_uuid(&symptom_id)?,
        symptom_name,
        tracker,
    })
}

fn symptom_rows_to_vec(
    rows: rusqlite::MappedRows<'_, impl FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<SymptomRow>>,
) -> Result<Vec<Symptom>, DatabaseError> {
    let mut symptoms = Vec::new();
    for row in rows {
        symptoms.push(symptom_from_row(row?)?);
    }
    Ok(symptoms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::db::repository::medical_history::upsert_history;
    use crate::db::repository::patient::insert_patient;
    use crate::db::repository::patient::tests::{sample_patient, seeded_user};
    use crate::models::HistoryFields;

    fn blank_questionnaire() -> HistoryFields {
        HistoryFields {
            medications: None,
            allergies: None,
            eye_injuries: None,
            eye_surgeries: None,
            social_history: None,
            family_history: None,
            diabetes: false,
            hypertension: false,
            nearsightedness: false,
            farsightedness: false,
            eye_glasses_or_lenses: false,
        }
    }

    fn patient_with_history(conn: &mut Connection) -> Uuid {
        let doctor = seeded_user(conn, &format!("{}@clinic.example", Uuid::new_v4()));
        let patient = sample_patient(Some(doctor));
        insert_patient(conn, &patient).unwrap();
        upsert_history(conn, &patient.id, &doctor, &blank_questionnaire()).unwrap();
        patient.id
    }

    #[test]
    fn first_link_seeds_tracker_at_one() {
        let mut conn = open_memory_database().unwrap();
        let patient_id = patient_with_history(&mut conn);

        let outcome = link_symptom(&mut conn, &patient_id, "Redness").unwrap();
        assert!(matches!(outcome, LinkOutcome::Linked { .. }));

        let symptom = find_symptom_by_name(&conn, "Redness").unwrap().unwrap();
        assert_eq!(symptom.tracker, 1);
    }

    #[test]
    fn double_add_is_idempotent_on_tracker() {
        let mut conn = open_memory_database().unwrap();
        let patient_id = patient_with_history(&mut conn);

        link_symptom(&mut conn, &patient_id, "Redness").unwrap();
        let second = link_symptom(&mut conn, &patient_id, "Redness").unwrap();
        assert!(matches!(second, LinkOutcome::AlreadyLinked { .. }));

        // Exactly one association row and tracker incremented exactly once
        let symptom = find_symptom_by_name(&conn, "Redness").unwrap().unwrap();
        assert_eq!(symptom.tracker, 1, "tracker must not double-increment");
        let links: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM medical_history_symptoms",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(links, 1);
    }

    #[test]
    fn tracker_counts_live_associations_across_patients() {
        let mut conn = open_memory_database().unwrap();
        let first = patient_with_history(&mut conn);
        let second = patient_with_history(&mut conn);

        link_symptom(&mut conn, &first, "Itching").unwrap();
        link_symptom(&mut conn, &second, "Itching").unwrap();
        assert_eq!(
            find_symptom_by_name(&conn, "Itching").unwrap().unwrap().tracker,
            2
        );

        assert_eq!(
            unlink_symptom(&mut conn, &first, "Itching").unwrap(),
            UnlinkOutcome::Removed
        );
        assert_eq!(
            find_symptom_by_name(&conn, "Itching").unwrap().unwrap().tracker,
            1
        );
    }

    #[test]
    fn tracker_is_clamped_at_zero() {
        let mut conn = open_memory_database().unwrap();
        let patient_id = patient_with_history(&mut conn);
        link_symptom(&mut conn, &patient_id, "Watering").unwrap();

        // Force the counter out of step, then detach: MAX(...) floors at 0
        conn.execute("UPDATE symptoms SET tracker = 0", []).unwrap();
        unlink_symptom(&mut conn, &patient_id, "Watering").unwrap();
        assert_eq!(
            find_symptom_by_name(&conn, "Watering").unwrap().unwrap().tracker,
            0
        );
    }

    #[test]
    fn unlink_distinguishes_missing_pieces() {
        let mut conn = open_memory_database().unwrap();
        let patient_id = patient_with_history(&mut conn);

        assert_eq!(
            unlink_symptom(&mut conn, &patient_id, "Ghost").unwrap(),
            UnlinkOutcome::SymptomNotFound
        );

        link_symptom(&mut conn, &patient_id, "Pain").unwrap();
        let no_history = Uuid::new_v4();
        assert_eq!(
            unlink_symptom(&mut conn, &no_history, "Pain").unwrap(),
            UnlinkOutcome::NoHistory
        );

        let other = patient_with_history(&mut conn);
        assert_eq!(
            unlink_symptom(&mut conn, &other, "Pain").unwrap(),
            UnlinkOutcome::NotLinked
        );
    }

    #[test]
    fn link_without_history_reports_no_history() {
        let mut conn = open_memory_database().unwrap();
        let outcome = link_symptom(&mut conn, &Uuid::new_v4(), "Redness").unwrap();
        assert!(matches!(outcome, LinkOutcome::NoHistory));
        assert!(find_symptom_by_name(&conn, "Redness").unwrap().is_none());
    }

    #[test]
    fn search_is_case_insensitive_and_ranked() {
        let mut conn = open_memory_database().unwrap();
        let a = patient_with_history(&mut conn);
        let b = patient_with_history(&mut conn);
        link_symptom(&mut conn, &a, "Severe itching").unwrap();
        link_symptom(&mut conn, &b, "Severe itching").unwrap();
        link_symptom(&mut conn, &a, "Mild itch").unwrap();
        link_symptom(&mut conn, &a, "Blurred vision").unwrap();

        let hits = search_symptoms(&conn, "ITCH").unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].symptom_name, "Severe itching");

        let top = top_symptoms(&conn).unwrap();
        assert_eq!(top[0].symptom_name, "Severe itching");
        assert_eq!(top.len(), 3);
    }

    #[test]
    fn symptoms_for_patient_joins_through_history() {
        let mut conn = open_memory_database().unwrap();
        let patient_id = patient_with_history(&mut conn);
        let other = patient_with_history(&mut conn);
        link_symptom(&mut conn, &patient_id, "Redness").unwrap();
        link_symptom(&mut conn, &other, "Pain").unwrap();

        let mine = symptoms_for_patient(&conn, &patient_id).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].symptom_name, "Redness");
    }
}
