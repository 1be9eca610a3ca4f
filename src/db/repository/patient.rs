use std::str::FromStr;

use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::user::{parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::{Gender, Patient, PatientFields};

const PATIENT_COLUMNS: &str = "id, first_name, last_name, dob, gender, contact_number, email,
     language, longitude, latitude, next_followup, relative_name, relative_phone_number,
     id_image_url, address, created_by, created_at, updated_at, deleted_at";

pub fn insert_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patients (id, first_name, last_name, dob, gender, contact_number, email,
         language, longitude, latitude, next_followup, relative_name, relative_phone_number,
         id_image_url, address, created_by, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
        params![
            patient.id.to_string(),
            patient.first_name,
            patient.last_name,
            patient.dob.to_string(),
            patient.gender.as_str(),
            patient.contact_number,
            patient.email,
            patient.language,
            patient.longitude,
            patient.latitude,
            patient.next_followup.map(|d| d.to_string()),
            patient.relative_name,
            patient.relative_phone_number,
            patient.id_image_url,
            patient.address,
            patient.created_by.map(|id| id.to_string()),
            patient.created_at.to_rfc3339(),
            patient.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Fetch one active patient. Soft-deleted rows are invisible here by policy,
/// exactly as they are to the list queries.
pub fn get_active_patient(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<Patient>, DatabaseError> {
    let sql = format!(
        "SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1 AND deleted_at IS NULL"
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query_map(params![id.to_string()], map_patient_row)?;
    rows.next().transpose()?.map(patient_from_row).transpose()
}

pub fn list_active_patients(conn: &Connection) -> Result<Vec<Patient>, DatabaseError> {
    let sql = format!(
        "SELECT {PATIENT_COLUMNS} FROM patients WHERE deleted_at IS NULL ORDER BY created_at DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], map_patient_row)?;
    patient_rows_to_vec(rows)
}

pub fn list_patients_by_creator(
    conn: &Connection,
    creator: &Uuid,
) -> Result<Vec<Patient>, DatabaseError> {
    let sql = format!(
        "SELECT {PATIENT_COLUMNS} FROM patients
         WHERE created_by = ?1 AND deleted_at IS NULL ORDER BY created_at DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![creator.to_string()], map_patient_row)?;
    patient_rows_to_vec(rows)
}

/// Replace all mutable fields. A fresh image path replaces the stored one;
/// `None` preserves it (COALESCE). Returns the updated row, or `None` when
/// the patient is absent or archived.
pub fn update_patient(
    conn: &Connection,
    id: &Uuid,
    fields: &PatientFields,
    new_image_url: Option<&str>,
) -> Result<Option<Patient>, DatabaseError> {
    let updated = conn.execute(
        "UPDATE patients SET
            first_name = ?1,
            last_name = ?2,
            dob = ?3,
            gender = ?4,
            contact_number = ?5,
            email = ?6,
            language = ?7,
            longitude = ?8,
            latitude = ?9,
            next_followup = ?10,
            relative_name = ?11,
            relative_phone_number = ?12,
            address = ?13,
            id_image_url = COALESCE(?14, id_image_url),
            updated_at = ?15
         WHERE id = ?16 AND deleted_at IS NULL",
        params![
            fields.first_name,
            fields.last_name,
            fields.dob.to_string(),
            fields.gender.as_str(),
            fields.contact_number,
            fields.email,
            fields.language,
            fields.longitude,
            fields.latitude,
            fields.next_followup.map(|d| d.to_string()),
            fields.relative_name,
            fields.relative_phone_number,
            fields.address,
            new_image_url,
            Utc::now().to_rfc3339(),
            id.to_string(),
        ],
    )?;

    if updated == 0 {
        return Ok(None);
    }
    get_active_patient(conn, id)
}

/// Soft delete: marks the row, keeps it for auditing. Returns false when the
/// patient is absent or already archived.
pub fn soft_delete_patient(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let updated = conn.execute(
        "UPDATE patients SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
        params![Utc::now().to_rfc3339(), id.to_string()],
    )?;
    Ok(updated > 0)
}

type PatientRow = (
    String,
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    String,
    Option<f64>,
    Option<f64>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    String,
    String,
    Option<String>,
);

fn map_patient_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PatientRow> {
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
        row.get(18)?,
    ))
}

fn patient_from_row(row: PatientRow) -> Result<Patient, DatabaseError> {
    let (
        id,
        first_name,
        last_name,
        dob,
        gender,
        contact_number,
        email,
        language,
        longitude,
        latitude,
        next_followup,
        relative_name,
        relative_phone_number,
        id_image_url,
        address,
        created_by,
        created_at,
        updated_at,
        deleted_at,
    ) = row;
    Ok(Patient {
        id: parse_uuid(&id)?,
        first_name,
        last_name,
        dob: NaiveDate::parse_from_str(&dob, "%Y-%m-%d").unwrap_or_default(),
        gender: Gender::from_str(&gender)?,
        contact_number,
        email,
        language,
        longitude,
        latitude,
        next_followup: next_followup.and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
        relative_name,
        relative_phone_number,
        id_image_url,
        address,
        created_by: created_by.and_then(|s| Uuid::parse_str(&s).ok()),
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
        deleted_at: deleted_at.map(|s| parse_timestamp(&s)),
    })
}

fn patient_rows_to_vec(
    rows: rusqlite::MappedRows<'_, impl FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<PatientRow>>,
) -> Result<Vec<Patient>, DatabaseError> {
    let mut patients = Vec::new();
    for row in rows {
        patients.push(patient_from_row(row?)?);
    }
    Ok(patients)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::open_memory_database;

    pub(crate) fn sample_patient(created_by: Option<Uuid>) -> Patient {
        let now = Utc::now();
        Patient {
            id: Uuid::new_v4(),
            first_name: "Ann".into(),
            last_name: "Lee".into(),
            dob: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            gender: Gender::Female,
            contact_number: "555-1111".into(),
            email: None,
            language: "EN".into(),
            longitude: Some(77.59),
            latitude: Some(12.97),
            next_followup: None,
            relative_name: Some("Bo Lee".into()),
            relative_phone_number: Some("555-2222".into()),
            id_image_url: None,
            address: None,
            created_by,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn insert_and_get_round_trip() {
        let conn = open_memory_database().unwrap();
        let patient = sample_patient(None);
        insert_patient(&conn, &patient).unwrap();

        let fetched = get_active_patient(&conn, &patient.id).unwrap().unwrap();
        assert_eq!(fetched.first_name, "Ann");
        assert_eq!(fetched.dob, patient.dob);
        assert_eq!(fetched.gender, Gender::Female);
        assert_eq!(fetched.longitude, Some(77.59));
    }

    #[test]
    fn soft_deleted_patient_is_invisible_everywhere() {
        let conn = open_memory_database().unwrap();
        let patient = sample_patient(None);
        insert_patient(&conn, &patient).unwrap();

        assert!(soft_delete_patient(&conn, &patient.id).unwrap());
        assert!(get_active_patient(&conn, &patient.id).unwrap().is_none());
        assert!(list_active_patients(&conn).unwrap().is_empty());
        // Second delete is a no-op on an archived row
        assert!(!soft_delete_patient(&conn, &patient.id).unwrap());
    }

    #[test]
    fn update_without_image_preserves_stored_url() {
        let conn = open_memory_database().unwrap();
        let mut patient = sample_patient(None);
        patient.id_image_url = Some("/uploads/before.jpg".into());
        insert_patient(&conn, &patient).unwrap();

        let mut fields = fields_of(&patient);
        fields.first_name = "Anna".into();
        let updated = update_patient(&conn, &patient.id, &fields, None)
            .unwrap()
            .unwrap();
        assert_eq!(updated.first_name, "Anna");
        assert_eq!(updated.id_image_url.as_deref(), Some("/uploads/before.jpg"));

        let replaced = update_patient(&conn, &patient.id, &fields, Some("/uploads/after.jpg"))
            .unwrap()
            .unwrap();
        assert_eq!(replaced.id_image_url.as_deref(), Some("/uploads/after.jpg"));
    }

    pub(crate) fn seeded_user(conn: &Connection, email: &str) -> Uuid {
        let now = Utc::now();
        let user = crate::models::User {
            id: Uuid::new_v4(),
            name: "Seed".into(),
            email: email.into(),
            password_hash: "h".into(),
            role: crate::models::Role::Doctor,
            created_at: now,
            updated_at: now,
        };
        crate::db::repository::user::insert_user(conn, &user).unwrap();
        user.id
    }

    #[test]
    fn list_by_creator_scopes_rows() {
        let conn = open_memory_database().unwrap();
        let a = seeded_user(&conn, "a@clinic.example");
        let b = seeded_user(&conn, "b@clinic.example");
        insert_patient(&conn, &sample_patient(Some(a))).unwrap();
        insert_patient(&conn, &sample_patient(Some(a))).unwrap();
        insert_patient(&conn, &sample_patient(Some(b))).unwrap();

        assert_eq!(list_patients_by_creator(&conn, &a).unwrap().len(), 2);
        assert_eq!(list_patients_by_creator(&conn, &b).unwrap().len(), 1);
        assert_eq!(list_active_patients(&conn).unwrap().len(), 3);
    }

    pub(crate) fn fields_of(patient: &Patient) -> PatientFields {
        PatientFields {
            first_name: patient.first_name.clone(),
            last_name: patient.last_name.clone(),
            dob: patient.dob,
            gender: patient.gender,
            contact_number: patient.contact_number.clone(),
            email: patient.email.clone(),
            language: patient.language.clone(),
            longitude: patient.longitude,
            latitude: patient.latitude,
            next_followup: patient.next_followup,
            relative_name: patient.relative_name.clone(),
            relative_phone_number: patient.relative_phone_number.clone(),
            address: patient.address.clone(),
        }
    }
}
