use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::Gender;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub dob: NaiveDate,
    pub gender: Gender,
    pub contact_number: String,
    pub email: Option<String>,
    pub language: String,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub next_followup: Option<NaiveDate>,
    pub relative_name: Option<String>,
    pub relative_phone_number: Option<String>,
    /// `/uploads/<file>` path of the scanned ID card, if one was captured.
    pub id_image_url: Option<String>,
    pub address: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// The mutable field set shared by create and update.
#[derive(Debug, Clone)]
pub struct PatientFields {
    pub first_name: String,
    pub last_name: String,
    pub dob: NaiveDate,
    pub gender: Gender,
    pub contact_number: String,
    pub email: Option<String>,
    pub language: String,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub next_followup: Option<NaiveDate>,
    pub relative_name: Option<String>,
    pub relative_phone_number: Option<String>,
    pub address: Option<String>,
}
