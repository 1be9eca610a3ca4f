//! Patient registry endpoints: multipart create/update, role-scoped list,
//! ownership-checked fetch, soft delete.

use std::str::FromStr;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthedUser};
use crate::authorization::{can_register_patients, patient_access, PatientAction};
use crate::db::repository::patient;
use crate::models::{Gender, Patient, PatientFields};
use crate::uploads;

#[derive(Serialize)]
pub struct PatientResponse {
    pub message: String,
    pub patient: Patient,
}

#[derive(Serialize)]
pub struct PatientsResponse {
    pub patients: Vec<Patient>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Image part captured from the multipart form.
struct UploadedImage {
    filename: Option<String>,
    bytes: Vec<u8>,
}

/// `POST /patients` — register a patient (doctor/staff only).
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<AuthedUser>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<PatientResponse>), ApiError> {
    if !can_register_patients(actor.role) {
        return Err(ApiError::Forbidden(
            "Access denied. Only doctors and staff can register patients.".into(),
        ));
    }

    let (fields, image) = parse_patient_form(multipart).await?;

    let id_image_url = match image {
        Some(img) => Some(
            uploads::store_id_image(&ctx.config.uploads_dir, img.filename.as_deref(), &img.bytes)
                .await?,
        ),
        None => None,
    };

    let now = Utc::now();
    let new_patient = Patient {
        id: Uuid::new_v4(),
        first_name: fields.first_name.clone(),
        last_name: fields.last_name.clone(),
        dob: fields.dob,
        gender: fields.gender,
        contact_number: fields.contact_number.clone(),
        email: fields.email.clone(),
        language: fields.language.clone(),
        longitude: fields.longitude,
        latitude: fields.latitude,
        next_followup: fields.next_followup,
        relative_name: fields.relative_name.clone(),
        relative_phone_number: fields.relative_phone_number.clone(),
        id_image_url,
        address: fields.address.clone(),
        created_by: Some(actor.user_id),
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };

    let conn = ctx.open_db()?;
    patient::insert_patient(&conn, &new_patient)?;

    tracing::info!(patient_id = %new_patient.id, created_by = %actor.user_id, "patient registered");

    Ok((
        StatusCode::CREATED,
        Json(PatientResponse {
            message: "Patient registered successfully".into(),
            patient: new_patient,
        }),
    ))
}

/// `GET /patients` — admins see every active patient, everyone else only
/// the ones they registered.
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<AuthedUser>,
) -> Result<Json<PatientsResponse>, ApiError> {
    let conn = ctx.open_db()?;
    let patients = if crate::authorization::is_admin(actor.role) {
        patient::list_active_patients(&conn)?
    } else {
        patient::list_patients_by_creator(&conn, &actor.user_id)?
    };
    Ok(Json(PatientsResponse { patients }))
}

/// `GET /patients/:id`.
pub async fn get_one(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<AuthedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<PatientResponse>, ApiError> {
    let conn = ctx.open_db()?;
    let found = patient::get_active_patient(&conn, &id)?
        .ok_or_else(|| ApiError::NotFound("Patient not found".into()))?;

    let decision = patient_access(
        actor.role,
        &actor.user_id,
        found.created_by.as_ref(),
        PatientAction::View,
    );
    if !decision.allowed {
        return Err(ApiError::Forbidden("Access denied.".into()));
    }

    Ok(Json(PatientResponse {
        message: "OK".into(),
        patient: found,
    }))
}

/// `PUT /patients/:id` — replace mutable fields; a fresh image replaces the
/// stored reference, otherwise it is preserved.
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<AuthedUser>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<PatientResponse>, ApiError> {
    let conn = ctx.open_db()?;
    let existing = patient::get_active_patient(&conn, &id)?
        .ok_or_else(|| ApiError::NotFound("Patient not found".into()))?;

    let decision = patient_access(
        actor.role,
        &actor.user_id,
        existing.created_by.as_ref(),
        PatientAction::Update,
    );
    if !decision.allowed {
        return Err(ApiError::Forbidden("Access denied.".into()));
    }

    let (fields, image) = parse_patient_form(multipart).await?;

    let new_image_url = match image {
        Some(img) => Some(
            uploads::store_id_image(&ctx.config.uploads_dir, img.filename.as_deref(), &img.bytes)
                .await?,
        ),
        None => None,
    };

    let updated = patient::update_patient(&conn, &id, &fields, new_image_url.as_deref())?
        .ok_or_else(|| ApiError::NotFound("Patient not found".into()))?;

    Ok(Json(PatientResponse {
        message: "Patient updated successfully".into(),
        patient: updated,
    }))
}

/// `DELETE /patients/:id` — soft delete, same ownership policy as update.
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<AuthedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let conn = ctx.open_db()?;
    let existing = patient::get_active_patient(&conn, &id)?
        .ok_or_else(|| ApiError::NotFound("Patient not found".into()))?;

    let decision = patient_access(
        actor.role,
        &actor.user_id,
        existing.created_by.as_ref(),
        PatientAction::Archive,
    );
    if !decision.allowed {
        return Err(ApiError::Forbidden("Access denied.".into()));
    }

    if !patient::soft_delete_patient(&conn, &id)? {
        return Err(ApiError::NotFound("Patient not found".into()));
    }

    tracing::info!(patient_id = %id, archived_by = %actor.user_id, "patient archived");

    Ok(Json(MessageResponse {
        message: "Patient deleted (soft delete applied).".into(),
    }))
}

/// Pull patient fields + optional `id_image` file out of a multipart form.
///
/// Empty strings from the form count as absent for optional fields, the way
/// the mobile client submits untouched inputs.
async fn parse_patient_form(
    mut multipart: Multipart,
) -> Result<(PatientFields, Option<UploadedImage>), ApiError> {
    let mut first_name = None;
    let mut last_name = None;
    let mut dob = None;
    let mut gender = None;
    let mut contact_number = None;
    let mut email = None;
    let mut language = None;
    let mut longitude = None;
    let mut latitude = None;
    let mut next_followup = None;
    let mut relative_name = None;
    let mut relative_phone_number = None;
    let mut address = None;
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart form: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "id_image" {
            let filename = field.file_name().map(|s| s.to_string());
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("Malformed upload: {e}")))?;
            if !bytes.is_empty() {
                image = Some(UploadedImage {
                    filename,
                    bytes: bytes.to_vec(),
                });
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Malformed multipart form: {e}")))?;

        match name.as_str() {
            "first_name" => first_name = non_empty(value),
            "last_name" => last_name = non_empty(value),
            "dob" => dob = non_empty(value),
            "gender" => gender = non_empty(value),
            "contact_number" => contact_number = non_empty(value),
            "email" => email = non_empty(value),
            "language" => language = non_empty(value),
            "longitude" => longitude = non_empty(value),
            "latitude" => latitude = non_empty(value),
            "next_followup" => next_followup = non_empty(value),
            "relative_name" => relative_name = non_empty(value),
            "relative_phone_number" => relative_phone_number = non_empty(value),
            "address" => address = non_empty(value),
            _ => {} // Unknown fields from older client builds are ignored
        }
    }

    let fields = PatientFields {
        first_name: first_name
            .ok_or_else(|| ApiError::BadRequest("Missing required field: first_name".into()))?,
        last_name: last_name
            .ok_or_else(|| ApiError::BadRequest("Missing required field: last_name".into()))?,
        dob: parse_date(
            &dob.ok_or_else(|| ApiError::BadRequest("Missing required field: dob".into()))?,
            "dob",
        )?,
        gender: Gender::from_str(
            &gender.ok_or_else(|| ApiError::BadRequest("Missing required field: gender".into()))?,
        )
        .map_err(|_| ApiError::BadRequest("Invalid gender".into()))?,
        contact_number: contact_number.ok_or_else(|| {
            ApiError::BadRequest("Missing required field: contact_number".into())
        })?,
        email,
        language: language.unwrap_or_else(|| "EN".into()),
        longitude: parse_coord(longitude, "longitude")?,
        latitude: parse_coord(latitude, "latitude")?,
        next_followup: next_followup
            .map(|d| parse_date(&d, "next_followup"))
            .transpose()?,
        relative_name,
        relative_phone_number,
        address,
    };

    Ok((fields, image))
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_date(value: &str, field: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("Invalid date for {field}, expected YYYY-MM-DD")))
}

fn parse_coord(value: Option<String>, field: &str) -> Result<Option<f64>, ApiError> {
    value
        .map(|v| {
            v.parse::<f64>()
                .map_err(|_| ApiError::BadRequest(format!("Invalid number for {field}")))
        })
        .transpose()
}
