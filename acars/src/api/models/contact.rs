use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Text(String),
    Number(serde_json::Number),
}

/// Phone numbers arrive as strings from forms but often as numbers from JSON clients.
fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<TextOrNumber>::deserialize(deserializer)?.map(|value| match value {
        TextOrNumber::Text(text) => text,
        TextOrNumber::Number(number) => number.to_string(),
    }))
}

/// Contact form payload, accepted as JSON or `application/x-www-form-urlencoded`.
///
/// Every field is optional at the wire level so that a missing field is reported as a
/// validation failure rather than a decoding error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ContactRequest {
    #[schema(example = "Jane")]
    pub name: Option<String>,
    #[schema(example = "jane@example.com")]
    pub email: Option<String>,
    /// Phone number, as a string or a JSON number
    #[serde(default, deserialize_with = "text_or_number")]
    #[schema(example = "+91-9000000000")]
    pub number: Option<String>,
    #[schema(example = "I'd like to book a test drive.")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ContactResponse {
    pub success: bool,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_number_accepts_text_or_json_number() {
        let text: ContactRequest = serde_json::from_value(json!({ "number": "+91 555" })).unwrap();
        assert_eq!(text.number.as_deref(), Some("+91 555"));

        let numeric: ContactRequest = serde_json::from_value(json!({ "number": 9876543210u64 })).unwrap();
        assert_eq!(numeric.number.as_deref(), Some("9876543210"));

        let null: ContactRequest = serde_json::from_value(json!({ "number": null })).unwrap();
        assert_eq!(null.number, None);

        let missing: ContactRequest = serde_json::from_value(json!({ "name": "Jane" })).unwrap();
        assert_eq!(missing.number, None);
    }

    #[test]
    fn test_number_rejects_other_json_types() {
        assert!(serde_json::from_value::<ContactRequest>(json!({ "number": ["555"] })).is_err());
    }
}
