//! Medical-history questionnaire and symptom-graph endpoints.
//!
//! All operations resolve the patient first: absent and archived patients
//! answer 404 alike, so the soft-delete policy covers the whole record
//! graph, not just the registry routes.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthedUser};
use crate::db::repository::{medical_history, patient, symptom};
use crate::db::repository::symptom::{LinkOutcome, UnlinkOutcome};
use crate::models::{HistoryFields, MedicalHistory, Symptom};

#[derive(Serialize)]
pub struct HistoriesResponse {
    pub medical_history: Vec<MedicalHistory>,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub message: String,
    pub medical_history: MedicalHistory,
}

#[derive(Serialize)]
pub struct SymptomsResponse {
    pub symptoms: Vec<Symptom>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn require_active_patient(
    conn: &rusqlite::Connection,
    patient_id: &Uuid,
) -> Result<(), ApiError> {
    patient::get_active_patient(conn, patient_id)?
        .map(|_| ())
        .ok_or_else(|| ApiError::NotFound("Patient not found".into()))
}

/// `GET /patients/medicalHistory/:patient_id`.
pub async fn get_history(
    State(ctx): State<ApiContext>,
    Extension(_actor): Extension<AuthedUser>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<HistoriesResponse>, ApiError> {
    let conn = ctx.open_db()?;
    require_active_patient(&conn, &patient_id)?;

    let histories = medical_history::histories_for_patient(&conn, &patient_id)?;
    if histories.is_empty() {
        return Err(ApiError::NotFound(
            "No medical history record found for this patient".into(),
        ));
    }

    Ok(Json(HistoriesResponse {
        medical_history: histories,
    }))
}

#[derive(Deserialize)]
pub struct CreateHistoryRequest {
    pub patient_id: Uuid,
    #[serde(flatten)]
    pub fields: HistoryFields,
}

/// `POST /patients/medicalHistory` — questionnaire submission.
///
/// Idempotent per patient: the first submit creates the record, repeats
/// update it in place instead of stacking duplicates.
pub async fn create_history(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<AuthedUser>,
    Json(request): Json<CreateHistoryRequest>,
) -> Result<(StatusCode, Json<HistoryResponse>), ApiError> {
    let mut conn = ctx.open_db()?;
    require_active_patient(&conn, &request.patient_id)?;

    let (history, created) = medical_history::upsert_history(
        &mut conn,
        &request.patient_id,
        &actor.user_id,
        &request.fields,
    )?;

    let message = if created {
        "Medical history created successfully"
    } else {
        "Medical history updated successfully"
    };

    Ok((
        StatusCode::CREATED,
        Json(HistoryResponse {
            message: message.into(),
            medical_history: history,
        }),
    ))
}

/// `PUT /patients/updateMedicalHistory/:history_id`.
pub async fn update_history(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<AuthedUser>,
    Path(history_id): Path<Uuid>,
    Json(fields): Json<HistoryFields>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let conn = ctx.open_db()?;
    let updated = medical_history::update_history(&conn, &history_id, &actor.user_id, &fields)?
        .ok_or_else(|| ApiError::NotFound("Medical history record not found".into()))?;

    Ok(Json(HistoryResponse {
        message: "Medical history updated successfully".into(),
        medical_history: updated,
    }))
}

/// `GET /patients/symptoms/:patient_id`.
pub async fn patient_symptoms(
    State(ctx): State<ApiContext>,
    Extension(_actor): Extension<AuthedUser>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<SymptomsResponse>, ApiError> {
    let conn = ctx.open_db()?;
    require_active_patient(&conn, &patient_id)?;

    let symptoms = symptom::symptoms_for_patient(&conn, &patient_id)?;
    if symptoms.is_empty() {
        return Err(ApiError::NotFound(
            "No symptoms found for this patient".into(),
        ));
    }

    Ok(Json(SymptomsResponse { symptoms }))
}

#[derive(Deserialize)]
pub struct AddSymptomRequest {
    pub patient_id: Option<Uuid>,
    pub symptom_name: Option<String>,
}

#[derive(Serialize)]
pub struct AddSymptomResponse {
    pub message: String,
    pub association: crate::models::HistorySymptom,
    pub symptom_id: Uuid,
}

/// `POST /patients/addSymptom` — attach a symptom to the patient's history.
///
/// Re-adding an attached symptom is a 200 no-op; the tracker is incremented
/// exactly once per live association.
pub async fn add_symptom(
    State(ctx): State<ApiContext>,
    Extension(_actor): Extension<AuthedUser>,
    Json(request): Json<AddSymptomRequest>,
) -> Result<Response, ApiError> {
    let (Some(patient_id), Some(symptom_name)) = (
        request.patient_id,
        request.symptom_name.as_deref().map(str::trim).filter(|s| !s.is_empty()),
    ) else {
        return Err(ApiError::BadRequest(
            "Missing patient_id or symptom_name".into(),
        ));
    };

    let mut conn = ctx.open_db()?;
    require_active_patient(&conn, &patient_id)?;

    match symptom::link_symptom(&mut conn, &patient_id, symptom_name)? {
        LinkOutcome::NoHistory => Err(ApiError::NotFound(
            "Medical history record not found for this patient".into(),
        )),
        LinkOutcome::AlreadyLinked { .. } => Ok((
            StatusCode::OK,
            Json(MessageResponse {
                message: "Symptom already linked to this medical history".into(),
            }),
        )
            .into_response()),
        LinkOutcome::Linked {
            symptom_id,
            association,
        } => Ok((
            StatusCode::CREATED,
            Json(AddSymptomResponse {
                message: "Symptom added and linked successfully".into(),
                association,
                symptom_id,
            }),
        )
            .into_response()),
    }
}

/// `DELETE /patients/removeSymptom/:patient_id/:symptom_name`.
pub async fn remove_symptom(
    State(ctx): State<ApiContext>,
    Extension(_actor): Extension<AuthedUser>,
    Path((patient_id, symptom_name)): Path<(Uuid, String)>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut conn = ctx.open_db()?;
    require_active_patient(&conn, &patient_id)?;

    match symptom::unlink_symptom(&mut conn, &patient_id, &symptom_name)? {
        UnlinkOutcome::SymptomNotFound => {
            Err(ApiError::NotFound("Symptom not found".into()))
        }
        UnlinkOutcome::NoHistory => Err(ApiError::NotFound(
            "No medical history found for the patient".into(),
        )),
        UnlinkOutcome::NotLinked => Err(ApiError::NotFound(
            "Symptom association not found for this patient's medical history".into(),
        )),
        UnlinkOutcome::Removed => Ok(Json(MessageResponse {
            message: "Symptom removed from patient's medical history successfully".into(),
        })),
    }
}

#[derive(Deserialize)]
pub struct SymptomSearchQuery {
    pub q: Option<String>,
}

/// `GET /patients/search/symptoms?q=`.
pub async fn search_symptoms(
    State(ctx): State<ApiContext>,
    Extension(_actor): Extension<AuthedUser>,
    Query(query): Query<SymptomSearchQuery>,
) -> Result<Json<SymptomsResponse>, ApiError> {
    let Some(q) = query.q.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
        return Err(ApiError::BadRequest(
            "Missing search query parameter 'q'".into(),
        ));
    };

    let conn = ctx.open_db()?;
    let symptoms = symptom::search_symptoms(&conn, q)?;
    Ok(Json(SymptomsResponse { symptoms }))
}

/// `GET /patients/search/topSymptoms` — the 25 most-tracked entries.
pub async fn top_symptoms(
    State(ctx): State<ApiContext>,
    Extension(_actor): Extension<AuthedUser>,
) -> Result<Json<SymptomsResponse>, ApiError> {
    let conn = ctx.open_db()?;
    let symptoms = symptom::top_symptoms(&conn)?;
    Ok(Json(SymptomsResponse { symptoms }))
}
