//! OpenAPI documentation for the public endpoints, served by Scalar at `/docs`.

use utoipa::OpenApi;

use crate::api::handlers;
use crate::api::models::{
    ErrorResponse, StatusResponse,
    contact::{ContactRequest, ContactResponse},
    sell_car::{CarListingResponse, CarListingSummary},
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "A Cars Backend",
        description = "Contact and sell-your-car form relay for the A Cars website."
    ),
    paths(
        handlers::health::index,
        handlers::contact::submit_contact,
        handlers::sell_car::submit_car_listing,
    ),
    components(schemas(
        ErrorResponse,
        StatusResponse,
        ContactRequest,
        ContactResponse,
        CarListingResponse,
        CarListingSummary,
    )),
    tags(
        (name = "health", description = "Service status"),
        (name = "forms", description = "Website form submissions"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_form_endpoints() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();

        assert!(paths.iter().any(|p| *p == "/api/contact"));
        assert!(paths.iter().any(|p| *p == "/api/sell-car"));
        assert!(paths.iter().any(|p| *p == "/"));
    }
}
