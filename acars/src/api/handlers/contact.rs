//! Contact form relay.

use axum::{
    Form, Json,
    extract::{FromRequest, Request, State},
    http::header::CONTENT_TYPE,
};

use crate::AppState;
use crate::api::models::ErrorResponse;
use crate::api::models::contact::{ContactRequest, ContactResponse};
use crate::errors::{Error, Result, ValidationError};
use crate::validation::validate_contact;

/// Contact payload decoded from either a JSON or an urlencoded body, chosen by content type.
/// Decoding failures become [`ValidationError::MalformedRequest`].
pub struct ContactPayload(pub ContactRequest);

impl<S> FromRequest<S> for ContactPayload
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        let request = if is_form {
            Form::<ContactRequest>::from_request(req, state)
                .await
                .map(|Form(r)| r)
                .map_err(|e| ValidationError::MalformedRequest { reason: e.body_text() })?
        } else {
            Json::<ContactRequest>::from_request(req, state)
                .await
                .map(|Json(r)| r)
                .map_err(|e| ValidationError::MalformedRequest { reason: e.body_text() })?
        };

        Ok(Self(request))
    }
}

#[utoipa::path(
    post,
    path = "/api/contact",
    tag = "forms",
    summary = "Submit contact form",
    description = "Relays the message to the business mailbox and sends a confirmation to the visitor.",
    request_body = ContactRequest,
    responses(
        (status = 200, description = "Message relayed", body = ContactResponse),
        (status = 400, description = "Missing field, invalid email or malformed body", body = ErrorResponse),
        (status = 500, description = "Email delivery failed", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip_all)]
pub async fn submit_contact(State(state): State<AppState>, ContactPayload(request): ContactPayload) -> Result<Json<ContactResponse>> {
    let submission = validate_contact(&request)?;

    tracing::info!(name = %submission.name, "Contact form submitted");

    state.notifier.send_contact(&submission).await?;

    Ok(Json(ContactResponse {
        success: true,
        message: "Message sent successfully! We will contact you soon.".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{create_failing_test_app, create_test_app, create_test_app_failing_after};
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    fn recipients(envelope: &lettre::address::Envelope) -> Vec<String> {
        envelope.to().iter().map(|a| a.to_string()).collect()
    }

    #[test_log::test(tokio::test)]
    async fn test_valid_contact_sends_two_emails() {
        let app = create_test_app();

        let response = app
            .server
            .post("/api/contact")
            .json(&json!({ "name": "Jane", "email": "jane@x.com", "number": "555", "message": "Hi" }))
            .await;

        response.assert_status(StatusCode::OK);
        response.assert_json(&json!({
            "success": true,
            "message": "Message sent successfully! We will contact you soon."
        }));

        let sent = app.sent_messages().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(recipients(&sent[0].0), vec!["acarsadvisor@gmail.com"]);
        assert_eq!(recipients(&sent[1].0), vec!["jane@x.com"]);
    }

    #[tokio::test]
    async fn test_urlencoded_contact_is_accepted() {
        let app = create_test_app();

        let response = app
            .server
            .post("/api/contact")
            .form(&[("name", "Jane"), ("email", "jane@x.com"), ("number", "555"), ("message", "Hi")])
            .await;

        response.assert_status(StatusCode::OK);
        assert_eq!(app.sent_messages().await.len(), 2);
    }

    #[tokio::test]
    async fn test_numeric_phone_number_is_accepted() {
        let app = create_test_app();

        let response = app
            .server
            .post("/api/contact")
            .json(&json!({ "name": "Jane", "email": "jane@x.com", "number": 555, "message": "Hi" }))
            .await;

        response.assert_status(StatusCode::OK);
        assert_eq!(app.sent_messages().await.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_name_is_rejected() {
        let app = create_test_app();

        let response = app
            .server
            .post("/api/contact")
            .json(&json!({ "name": "", "email": "jane@x.com", "number": "555", "message": "Hi" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({ "success": false, "message": "All fields are required" }));
        assert!(app.sent_messages().await.is_empty());
    }

    #[tokio::test]
    async fn test_any_missing_field_sends_nothing() {
        let app = create_test_app();
        let complete = json!({ "name": "Jane", "email": "jane@x.com", "number": "555", "message": "Hi" });

        for field in ["name", "email", "number", "message"] {
            let mut body = complete.clone();
            body.as_object_mut().unwrap().remove(field);

            let response = app.server.post("/api/contact").json(&body).await;
            response.assert_status(StatusCode::BAD_REQUEST);
            let json: Value = response.json();
            assert_eq!(json["message"], "All fields are required", "missing {field}");
        }

        assert!(app.sent_messages().await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_email_is_rejected() {
        let app = create_test_app();

        for email in ["jane.x.com", "jane@x", "jane@x.", "ja ne@x.com", " jane@x.com", " jane@x.com "] {
            let response = app
                .server
                .post("/api/contact")
                .json(&json!({ "name": "Jane", "email": email, "number": "555", "message": "Hi" }))
                .await;

            response.assert_status(StatusCode::BAD_REQUEST);
            response.assert_json(&json!({ "success": false, "message": "Invalid email format" }));
        }

        assert!(app.sent_messages().await.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_json_is_rejected() {
        let app = create_test_app();

        let response = app
            .server
            .post("/api/contact")
            .content_type("application/json")
            .text("{ not json")
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({ "success": false, "message": "Invalid request body" }));
    }

    #[tokio::test]
    async fn test_delivery_failure_returns_500() {
        let app = create_failing_test_app();

        let response = app
            .server
            .post("/api/contact")
            .json(&json!({ "name": "Jane", "email": "jane@x.com", "number": "555", "message": "Hi" }))
            .await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        response.assert_json(&json!({
            "success": false,
            "message": "Failed to send message. Please try again later."
        }));

        // The confirmation is never attempted after the business notification fails
        let sent = app.sent_messages().await;
        assert!(sent.iter().all(|(envelope, _)| recipients(envelope) != vec!["jane@x.com"]));
    }

    #[tokio::test]
    async fn test_confirmation_failure_returns_500() {
        let app = create_test_app_failing_after(1);

        let response = app
            .server
            .post("/api/contact")
            .json(&json!({ "name": "Jane", "email": "jane@x.com", "number": "555", "message": "Hi" }))
            .await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        response.assert_json(&json!({
            "success": false,
            "message": "Failed to send message. Please try again later."
        }));

        // The business notification went out before the confirmation failed
        let sent = app.sent_messages().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(recipients(&sent[0].0), vec!["acarsadvisor@gmail.com"]);
    }

    #[tokio::test]
    async fn test_resubmission_sends_again() {
        let app = create_test_app();
        let body = json!({ "name": "Jane", "email": "jane@x.com", "number": "555", "message": "Hi" });

        app.server.post("/api/contact").json(&body).await.assert_status(StatusCode::OK);
        app.server.post("/api/contact").json(&body).await.assert_status(StatusCode::OK);

        assert_eq!(app.sent_messages().await.len(), 4);
    }
}
