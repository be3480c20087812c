//! Field validation for both forms. Runs before any file is written or email is sent.

use lettre::Address;

use crate::api::models::contact::ContactRequest;
use crate::errors::ValidationError;
use crate::types::ContactSubmission;

/// Text fields of a sell-car submission as received, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CarListingFields {
    pub car_name: Option<String>,
    pub car_model: Option<String>,
    pub car_description: Option<String>,
}

/// Text fields of a sell-car submission after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidCarListing {
    pub car_name: String,
    pub car_model: String,
    pub description: String,
    pub word_count: usize,
}

fn required(value: Option<&str>, field: &'static str) -> Result<String, ValidationError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.to_string()),
        _ => Err(ValidationError::MissingField { field }),
    }
}

/// Shape check for an email address: one `@` with a non-empty local part, a domain containing
/// a dot with text on both sides, and no whitespace anywhere.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if local.is_empty() || domain.contains('@') {
        return false;
    }

    let has_inner_dot = domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len());

    // The simple shape is necessary but not sufficient: the address also has to be usable as
    // an envelope recipient.
    has_inner_dot && email.parse::<Address>().is_ok()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

pub fn validate_contact(request: &ContactRequest) -> Result<ContactSubmission, ValidationError> {
    let name = required(request.name.as_deref(), "name")?;
    let email = required(request.email.as_deref(), "email")?;
    let phone = required(request.number.as_deref(), "number")?;
    let message = required(request.message.as_deref(), "message")?;

    if !is_valid_email(&email) {
        return Err(ValidationError::InvalidEmailFormat);
    }

    Ok(ContactSubmission {
        name,
        email,
        phone,
        message,
    })
}

/// Validates sell-car text fields and the number of accepted files.
///
/// Order of checks: required fields, description length, then file presence.
pub fn validate_car_listing(
    fields: &CarListingFields,
    file_count: usize,
    max_words: usize,
) -> Result<ValidCarListing, ValidationError> {
    let car_name = required(fields.car_name.as_deref(), "carName")?;
    let car_model = required(fields.car_model.as_deref(), "carModel")?;
    let description = required(fields.car_description.as_deref(), "carDescription")?;

    let words = word_count(&description);
    if words > max_words {
        return Err(ValidationError::DescriptionTooLong { words, limit: max_words });
    }

    if file_count == 0 {
        return Err(ValidationError::NoFilesProvided);
    }

    Ok(ValidCarListing {
        car_name,
        car_model,
        description,
        word_count: words,
    })
}
