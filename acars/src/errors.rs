use crate::api::models::ErrorResponse;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;
use thiserror::Error as ThisError;

const MIB: u64 = 1024 * 1024;

/// A submitted field is missing, malformed, or breaks a business rule.
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("All fields are required")]
    MissingField { field: &'static str },

    #[error("Invalid email format")]
    InvalidEmailFormat,

    #[error("Description exceeds the maximum word limit of {limit} words")]
    DescriptionTooLong { words: usize, limit: usize },

    #[error("At least one photo or video is required")]
    NoFilesProvided,

    /// Body could not be decoded at all (bad JSON, broken multipart framing, ...)
    #[error("Invalid request body")]
    MalformedRequest { reason: String },
}

/// An uploaded file part violates the upload rules.
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum FileConstraintError {
    #[error("Only image and video files are allowed.")]
    InvalidFileType { file_name: String, mime_type: String },

    #[error("File size too large. Maximum {mb}MB per file.", mb = .limit / MIB)]
    FileTooLarge { limit: u64 },

    #[error("Too many files. Maximum {limit} files allowed.")]
    TooManyFiles { limit: usize },

    #[error("Unexpected file field: {field}")]
    UnexpectedField { field: String },
}

/// Which form a request belongs to. Selects the user-facing delivery failure message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Form {
    Contact,
    SellCar,
}

impl Form {
    fn delivery_failure_message(self) -> &'static str {
        match self {
            Form::Contact => "Failed to send message. Please try again later.",
            Form::SellCar => "Failed to submit car details. Please try again later.",
        }
    }
}

impl fmt::Display for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Form::Contact => f.write_str("contact"),
            Form::SellCar => f.write_str("sell-car"),
        }
    }
}

#[derive(ThisError, Debug)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    FileConstraint(#[from] FileConstraintError),

    /// The mail relay rejected or failed a send
    #[error("Failed to deliver {form} email: {reason}")]
    EmailDelivery { form: Form, reason: String },

    #[error("No route for {path}")]
    NotFound { path: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },
}

/// Discriminant of every failure the service can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MissingField,
    InvalidEmailFormat,
    DescriptionTooLong,
    NoFilesProvided,
    MalformedRequest,
    InvalidFileType,
    FileTooLarge,
    TooManyFiles,
    UnexpectedField,
    EmailDeliveryFailed,
    NotFound,
    Internal,
}

impl ErrorKind {
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::MissingField
            | ErrorKind::InvalidEmailFormat
            | ErrorKind::DescriptionTooLong
            | ErrorKind::NoFilesProvided
            | ErrorKind::MalformedRequest
            | ErrorKind::InvalidFileType
            | ErrorKind::FileTooLarge
            | ErrorKind::TooManyFiles
            | ErrorKind::UnexpectedField => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::EmailDeliveryFailed | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ValidationError::MissingField { .. } => ErrorKind::MissingField,
            ValidationError::InvalidEmailFormat => ErrorKind::InvalidEmailFormat,
            ValidationError::DescriptionTooLong { .. } => ErrorKind::DescriptionTooLong,
            ValidationError::NoFilesProvided => ErrorKind::NoFilesProvided,
            ValidationError::MalformedRequest { .. } => ErrorKind::MalformedRequest,
        }
    }
}

impl FileConstraintError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FileConstraintError::InvalidFileType { .. } => ErrorKind::InvalidFileType,
            FileConstraintError::FileTooLarge { .. } => ErrorKind::FileTooLarge,
            FileConstraintError::TooManyFiles { .. } => ErrorKind::TooManyFiles,
            FileConstraintError::UnexpectedField { .. } => ErrorKind::UnexpectedField,
        }
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(e) => e.kind(),
            Error::FileConstraint(e) => e.kind(),
            Error::EmailDelivery { .. } => ErrorKind::EmailDeliveryFailed,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Internal { .. } => ErrorKind::Internal,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.kind().status_code()
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation(e) => e.to_string(),
            Error::FileConstraint(e) => e.to_string(),
            Error::EmailDelivery { form, .. } => form.delivery_failure_message().to_string(),
            Error::NotFound { .. } => "Endpoint not found".to_string(),
            Error::Internal { .. } => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(kind = ?self.kind(), "Internal service error: {:#}", self);
        } else {
            tracing::debug!(kind = ?self.kind(), "Client error: {:?}", self);
        }

        let body = ErrorResponse {
            success: false,
            message: self.user_message(),
        };
        (status, Json(body)).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_map_to_bad_request() {
        let errors: Vec<Error> = vec![
            ValidationError::MissingField { field: "name" }.into(),
            ValidationError::InvalidEmailFormat.into(),
            ValidationError::DescriptionTooLong { words: 300, limit: 250 }.into(),
            ValidationError::NoFilesProvided.into(),
            FileConstraintError::FileTooLarge { limit: 10 * MIB }.into(),
            FileConstraintError::TooManyFiles { limit: 10 }.into(),
            FileConstraintError::InvalidFileType {
                file_name: "notes.pdf".to_string(),
                mime_type: "application/pdf".to_string(),
            }
            .into(),
        ];

        for error in errors {
            assert_eq!(error.status_code(), StatusCode::BAD_REQUEST, "{error:?}");
        }
    }

    #[test]
    fn test_server_errors_hide_details() {
        let delivery = Error::EmailDelivery {
            form: Form::Contact,
            reason: "535 authentication failed for smtp-user".to_string(),
        };
        assert_eq!(delivery.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(delivery.user_message(), "Failed to send message. Please try again later.");

        let listing = Error::EmailDelivery {
            form: Form::SellCar,
            reason: "connection reset".to_string(),
        };
        assert_eq!(listing.user_message(), "Failed to submit car details. Please try again later.");

        let internal = Error::Internal {
            operation: "write /srv/uploads/x.png".to_string(),
        };
        assert_eq!(internal.user_message(), "Internal server error");
    }

    #[test]
    fn test_limit_messages_follow_configured_limits() {
        let too_large: Error = FileConstraintError::FileTooLarge { limit: 25 * MIB }.into();
        assert_eq!(too_large.user_message(), "File size too large. Maximum 25MB per file.");

        let too_many: Error = FileConstraintError::TooManyFiles { limit: 4 }.into();
        assert_eq!(too_many.user_message(), "Too many files. Maximum 4 files allowed.");

        let too_long: Error = ValidationError::DescriptionTooLong { words: 120, limit: 100 }.into();
        assert_eq!(too_long.user_message(), "Description exceeds the maximum word limit of 100 words");
    }

    #[test]
    fn test_not_found() {
        let error = Error::NotFound {
            path: "/api/unknown".to_string(),
        };
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(error.user_message(), "Endpoint not found");
    }
}
