//! Application router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//!
//! Route families:
//! - `/users`: login/refresh/logout public, registration + admin protected
//! - `/patients`: registry, medical history, symptom graph (all protected)
//! - `/analytics`: public dashboard rollups
//! - `/uploads`: static serving of stored ID images
//!
//! Middleware uses `Extension<ApiContext>` (injected as the outermost
//! layer). Endpoint handlers use `State<ApiContext>` (via `with_state`).

use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::services::ServeDir;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;

pub fn app_router(ctx: ApiContext) -> Router {
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let users_public = Router::new()
        .route("/login", post(endpoints::users::login))
        .route("/refresh-token", post(endpoints::users::refresh))
        .route("/logout", post(endpoints::users::logout))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::Extension(ctx.clone()));

    let users_protected = Router::new()
        .route("/register", post(endpoints::users::register))
        .route("/admin/users", get(endpoints::users::list))
        .route("/:id", delete(endpoints::users::delete))
        .with_state(ctx.clone())
        // Layers run bottom-up: audit innermost, auth outside it, so the
        // audit line can include the authenticated user.
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        .layer(axum::Extension(ctx.clone()));

    // Full paths instead of a nested "/" so `/patients` itself routes the
    // create/list pair.
    let patients = Router::new()
        .route(
            "/patients",
            post(endpoints::patients::create).get(endpoints::patients::list),
        )
        .route(
            "/patients/medicalHistory",
            post(endpoints::history::create_history),
        )
        .route(
            "/patients/medicalHistory/:patient_id",
            get(endpoints::history::get_history),
        )
        .route(
            "/patients/updateMedicalHistory/:history_id",
            put(endpoints::history::update_history),
        )
        .route(
            "/patients/symptoms/:patient_id",
            get(endpoints::history::patient_symptoms),
        )
        .route("/patients/addSymptom", post(endpoints::history::add_symptom))
        .route(
            "/patients/removeSymptom/:patient_id/:symptom_name",
            delete(endpoints::history::remove_symptom),
        )
        .route(
            "/patients/search/symptoms",
            get(endpoints::history::search_symptoms),
        )
        .route(
            "/patients/search/topSymptoms",
            get(endpoints::history::top_symptoms),
        )
        .route(
            "/patients/:id",
            get(endpoints::patients::get_one)
                .put(endpoints::patients::update)
                .delete(endpoints::patients::delete),
        )
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        .layer(axum::Extension(ctx.clone()));

    let analytics = Router::new()
        .route("/symptoms-list", get(endpoints::analytics::symptoms_list))
        .route(
            "/symptoms-count",
            post(endpoints::analytics::symptoms_count),
        )
        .route(
            "/patients-per-month",
            get(endpoints::analytics::patients_per_month),
        )
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::Extension(ctx.clone()));

    let uploads_dir = ctx.config.uploads_dir.clone();

    Router::new()
        .nest("/users", users_public)
        .nest("/users", users_protected)
        .merge(patients)
        .nest("/analytics", analytics)
        .nest_service("/uploads", ServeDir::new(uploads_dir))
}
