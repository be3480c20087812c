//! Sell-your-car listing form with media uploads.

use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
};

use crate::AppState;
use crate::api::models::ErrorResponse;
use crate::api::models::sell_car::{CarListingResponse, CarListingSummary};
use crate::errors::{Result, ValidationError};
use crate::types::CarListingSubmission;
use crate::upload::read_listing_form;
use crate::validation::validate_car_listing;

#[utoipa::path(
    post,
    path = "/api/sell-car",
    tag = "forms",
    summary = "Submit car listing",
    description = "Multipart form with `carName`, `carModel`, `carDescription` and up to 10 image or \
                   video files under `mediaFiles`. Files are stored and attached to the email sent \
                   to the business mailbox.",
    request_body(
        content_type = "multipart/form-data",
        description = "Car details and media files"
    ),
    responses(
        (status = 200, description = "Listing relayed", body = CarListingResponse),
        (status = 400, description = "Missing field, description too long, or file rule violated", body = ErrorResponse),
        (status = 500, description = "Email delivery failed", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip_all)]
pub async fn submit_car_listing(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<CarListingResponse>> {
    let multipart = multipart.map_err(|e| ValidationError::MalformedRequest { reason: e.body_text() })?;
    let limits = &state.config.limits;

    let form = read_listing_form(multipart, limits).await?;
    let valid = validate_car_listing(&form.fields, form.files.len(), limits.max_description_words)?;

    let files = state.uploads.persist(form.files).await?;

    let listing = CarListingSubmission {
        car_name: valid.car_name,
        car_model: valid.car_model,
        description: valid.description,
        word_count: valid.word_count,
        files,
    };

    tracing::info!(
        car_name = %listing.car_name,
        car_model = %listing.car_model,
        files = listing.files.len(),
        "Car listing submitted"
    );

    state.notifier.send_car_listing(&listing).await?;

    Ok(Json(CarListingResponse {
        success: true,
        message: "Car details submitted successfully! We will review and contact you soon.".to_string(),
        data: CarListingSummary {
            files_uploaded: listing.files.len(),
            word_count: listing.word_count,
            car_name: listing.car_name,
            car_model: listing.car_model,
        },
    }))
}
