use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One questionnaire record per patient (enforced by UNIQUE(patient_id)).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalHistory {
    pub history_id: Uuid,
    pub patient_id: Uuid,
    pub recorded_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub medications: Option<String>,
    pub allergies: Option<String>,
    pub eye_injuries: Option<String>,
    pub eye_surgeries: Option<String>,
    pub social_history: Option<String>,
    pub family_history: Option<String>,
    pub diabetes: bool,
    pub hypertension: bool,
    pub nearsightedness: bool,
    pub farsightedness: bool,
    pub eye_glasses_or_lenses: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Questionnaire answers as submitted by the client.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryFields {
    pub medications: Option<String>,
    pub allergies: Option<String>,
    pub eye_injuries: Option<String>,
    pub eye_surgeries: Option<String>,
    pub social_history: Option<String>,
    pub family_history: Option<String>,
    #[serde(default)]
    pub diabetes: bool,
    #[serde(default)]
    pub hypertension: bool,
    #[serde(default)]
    pub nearsightedness: bool,
    #[serde(default)]
    pub farsightedness: bool,
    #[serde(default)]
    pub eye_glasses_or_lenses: bool,
}
