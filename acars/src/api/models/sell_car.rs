use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Summary of an accepted car listing
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CarListingSummary {
    pub car_name: String,
    pub car_model: String,
    pub word_count: usize,
    pub files_uploaded: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CarListingResponse {
    pub success: bool,
    pub message: String,
    pub data: CarListingSummary,
}
