//! Dashboard rollups. Read-only, recomputed per request.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db::repository::analytics;
use crate::db::repository::analytics::{MonthlyRegistrations, SymptomPatientCount};

#[derive(Serialize)]
pub struct SymptomNameRow {
    pub symptom_name: String,
}

/// `GET /analytics/symptoms-list` — catalog names for the dropdown.
pub async fn symptoms_list(
    State(ctx): State<ApiContext>,
) -> Result<Json<Vec<SymptomNameRow>>, ApiError> {
    let conn = ctx.open_db()?;
    let rows = analytics::symptom_names(&conn)?
        .into_iter()
        .map(|symptom_name| SymptomNameRow { symptom_name })
        .collect();
    Ok(Json(rows))
}

#[derive(Deserialize)]
pub struct SymptomsCountRequest {
    #[serde(default)]
    pub symptoms: Vec<String>,
}

/// `POST /analytics/symptoms-count` — distinct-patient count for 1–5
/// selected symptoms.
pub async fn symptoms_count(
    State(ctx): State<ApiContext>,
    Json(request): Json<SymptomsCountRequest>,
) -> Result<Json<Vec<SymptomPatientCount>>, ApiError> {
    if request.symptoms.is_empty() || request.symptoms.len() > 5 {
        return Err(ApiError::BadRequest(
            "Please provide 1 to 5 symptoms in an array.".into(),
        ));
    }

    let conn = ctx.open_db()?;
    let counts = analytics::symptom_patient_counts(&conn, &request.symptoms)?;
    Ok(Json(counts))
}

/// `GET /analytics/patients-per-month` — registrations per calendar month.
pub async fn patients_per_month(
    State(ctx): State<ApiContext>,
) -> Result<Json<Vec<MonthlyRegistrations>>, ApiError> {
    let conn = ctx.open_db()?;
    let buckets = analytics::patients_per_month(&conn)?;
    Ok(Json(buckets))
}
