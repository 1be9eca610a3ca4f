//! Read-only rollups for the dashboard screens. No caching; every request
//! recomputes from current rows.

use rusqlite::{params_from_iter, Connection};
use serde::Serialize;

use crate::db::DatabaseError;

#[derive(Debug, Clone, Serialize)]
pub struct SymptomPatientCount {
    pub symptom_name: String,
    pub patient_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyRegistrations {
    pub month: String,
    pub count: i64,
}

/// Every catalogued symptom name, for the dashboard dropdown.
pub fn symptom_names(conn: &Connection) -> Result<Vec<String>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT symptom_name FROM symptoms ORDER BY symptom_name")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

    let mut names = Vec::new();
    for row in rows {
        names.push(row?);
    }
    Ok(names)
}

/// Distinct-patient count per supplied symptom name, highest first.
///
/// LEFT JOIN from the catalog so a known-but-unlinked name yields a zero row
/// instead of vanishing; names absent from the catalog yield no row.
pub fn symptom_patient_counts(
    conn: &Connection,
    names: &[String],
) -> Result<Vec<SymptomPatientCount>, DatabaseError> {
    let placeholders = (1..=names.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT s.symptom_name, COUNT(DISTINCT mh.patient_id) AS patient_count
         FROM symptoms s
         LEFT JOIN medical_history_symptoms mhs ON mhs.symptom_id = s.symptom_id
         LEFT JOIN medical_history mh ON mh.history_id = mhs.history_id
         WHERE s.symptom_name IN ({placeholders})
         GROUP BY s.symptom_name
         ORDER BY patient_count DESC, s.symptom_name"
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(names.iter()), |row| {
        Ok(SymptomPatientCount {
            symptom_name: row.get(0)?,
            patient_count: row.get(1)?,
        })
    })?;

    let mut counts = Vec::new();
    for row in rows {
        counts.push(row?);
    }
    Ok(counts)
}

/// Registrations bucketed by calendar month, ascending. Counts every
/// registration ever made, archived patients included.
pub fn patients_per_month(conn: &Connection) -> Result<Vec<MonthlyRegistrations>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT substr(created_at, 1, 7) AS month, COUNT(*) AS count
         FROM patients
         GROUP BY month
         ORDER BY month",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(MonthlyRegistrations {
            month: row.get(0)?,
            count: row.get(1)?,
        })
    })?;

    let mut buckets = Vec::new();
    for row in rows {
        buckets.push(row?);
    }
    Ok(buckets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::db::repository::medical_history::upsert_history;
    use crate::db::repository::patient::tests::{sample_patient, seeded_user};
    use crate::db::repository::patient::{insert_patient, soft_delete_patient};
    use crate::db::repository::symptom::link_symptom;
    use crate::models::HistoryFields;
    use uuid::Uuid;

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

    fn patient_with_history(conn: &mut rusqlite::Connection) -> Uuid {
        let doctor = seeded_user(conn, &format!("{}@clinic.example", Uuid::new_v4()));
        let patient = sample_patient(Some(doctor));
        insert_patient(conn, &patient).unwrap();
        upsert_history(conn, &patient.id, &doctor, &blank_questionnaire()).unwrap();
        patient.id
    }

    #[test]
    fn counts_distinct_patients_per_symptom() {
        let mut conn = open_memory_database().unwrap();
        let a = patient_with_history(&mut conn);
        let b = patient_with_history(&mut conn);
        link_symptom(&mut conn, &a, "Itching").unwrap();
        link_symptom(&mut conn, &b, "Itching").unwrap();
        link_symptom(&mut conn, &a, "Redness").unwrap();

        let counts = symptom_patient_counts(
            &conn,
            &["Itching".to_string(), "Redness".to_string()],
        )
        .unwrap();
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].symptom_name, "Itching");
        assert_eq!(counts[0].patient_count, 2);
        assert_eq!(counts[1].patient_count, 1);
    }

    #[test]
    fn known_but_unlinked_symptom_counts_zero() {
        let mut conn = open_memory_database().unwrap();
        let a = patient_with_history(&mut conn);
        link_symptom(&mut conn, &a, "Watering").unwrap();
        conn.execute(
            "DELETE FROM medical_history_symptoms",
            [],
        )
        .unwrap();

        let counts = symptom_patient_counts(&conn, &["Watering".to_string()]).unwrap();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].patient_count, 0);
    }

    #[test]
    fn unknown_symptom_yields_no_row() {
        let conn = open_memory_database().unwrap();
        let counts = symptom_patient_counts(&conn, &["Nonexistent".to_string()]).unwrap();
        assert!(counts.is_empty());
    }

    #[test]
    fn registrations_bucket_by_month_ascending() {
        let conn = open_memory_database().unwrap();
        let doctor = seeded_user(&conn, "dr@clinic.example");
        for (id_suffix, month) in [(1, "2026-01"), (2, "2026-01"), (3, "2026-03")] {
            let mut patient = sample_patient(Some(doctor));
            patient.contact_number = format!("555-000{id_suffix}");
            insert_patient(&conn, &patient).unwrap();
            conn.execute(
                "UPDATE patients SET created_at = ?1 WHERE id = ?2",
                rusqlite::params![format!("{month}-05T10:00:00+00:00"), patient.id.to_string()],
            )
            .unwrap();
        }

        let buckets = patients_per_month(&conn).unwrap();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].month, "2026-01");
        assert_eq!(buckets[0].count, 2);
        assert_eq!(buckets[1].month, "2026-03");
    }

    #[test]
    fn archived_patients_still_count_as_registrations() {
        let conn = open_memory_database().unwrap();
        let doctor = seeded_user(&conn, "dr@clinic.example");
        let patient = sample_patient(Some(doctor));
        insert_patient(&conn, &patient).unwrap();
        soft_delete_patient(&conn, &patient.id).unwrap();

        let buckets = patients_per_month(&conn).unwrap();
        assert_eq!(buckets.iter().map(|b| b.count).sum::<i64>(), 1);
    }

    #[test]
    fn symptom_names_sorted() {
        let mut conn = open_memory_database().unwrap();
        let a = patient_with_history(&mut conn);
        link_symptom(&mut conn, &a, "Watering").unwrap();
        link_symptom(&mut conn, &a, "Blurred vision").unwrap();

        let names = symptom_names(&conn).unwrap();
        assert_eq!(names, vec!["Blurred vision", "Watering"]);
    }
}
