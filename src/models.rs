use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// max length of a submission, counted after trimming
pub const MAX_TEXT_CHARS: usize = 25;

// POST /api/save-text body
#[derive(Deserialize, Debug, Clone)]
pub struct SaveTextRequest {
    pub text: String,
    pub ip: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub location: Option<String>,
    pub os: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Text cannot be empty")]
    Empty,

    #[error("Text cannot exceed {max} characters")]
    TooLong { max: usize },
}

impl SaveTextRequest {
    /// Trims `text` and checks it is 1..=25 characters long.
    pub fn validate(self) -> Result<Entry, ValidationError> {
        let text = self.text.trim();
        if text.is_empty() {
            return Err(ValidationError::Empty);
        }
        if text.chars().count() > MAX_TEXT_CHARS {
            return Err(ValidationError::TooLong {
                max: MAX_TEXT_CHARS,
            });
        }

        Ok(Entry {
            text: text.to_string(),
            ip: self.ip,
            country: self.country,
            region: self.region,
            city: self.city,
            location: self.location,
            os: self.os,
        })
    }
}

// A validated submission, not yet stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub text: String,
    pub ip: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub location: Option<String>,
    pub os: Option<String>,
}

// An entry as it lives in the store. `timestamp` is always server-assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub timestamp: DateTime<Utc>,
    pub entry: Entry,
}

impl StoredEntry {
    pub fn new(entry: Entry, timestamp: DateTime<Utc>) -> Self {
        Self { timestamp, entry }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SaveTextResponse {
    pub message: String,
    pub saved: bool,
}

impl SaveTextResponse {
    pub fn saved() -> Self {
        Self {
            message: "Text saved successfully".to_string(),
            saved: true,
        }
    }

    pub fn duplicate() -> Self {
        Self {
            message: "Duplicate entry detected, not saved".to_string(),
            saved: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(text: &str) -> SaveTextRequest {
        SaveTextRequest {
            text: text.to_string(),
            ip: None,
            country: None,
            region: None,
            city: None,
            location: None,
            os: None,
        }
    }

    #[test]
    fn test_validate_trims_text() {
        let entry = request("  hello  ").validate().unwrap();
        assert_eq!(entry.text, "hello");
    }

    #[test]
    fn test_validate_rejects_blank() {
        assert_eq!(request("").validate(), Err(ValidationError::Empty));
        assert_eq!(request(" \t\n ").validate(), Err(ValidationError::Empty));
    }

    #[test]
    fn test_validate_length_bounds() {
        assert!(request("a").validate().is_ok());
        assert!(request(&"a".repeat(25)).validate().is_ok());
        assert_eq!(
            request(&"a".repeat(26)).validate(),
            Err(ValidationError::TooLong { max: 25 })
        );
    }

    #[test]
    fn test_validate_counts_after_trim() {
        // 25 chars of payload padded with whitespace is still fine
        let padded = format!("   {}   ", "b".repeat(25));
        assert!(request(&padded).validate().is_ok());
    }

    #[test]
    fn test_validate_counts_chars_not_bytes() {
        // 25 multi-byte characters
        let text = "é".repeat(25);
        assert!(request(&text).validate().is_ok());
    }

    #[test]
    fn test_optional_fields_default_to_none() {
        let req: SaveTextRequest = serde_json::from_str(r#"{"text": "hi"}"#).unwrap();
        assert_eq!(req.ip, None);
        assert_eq!(req.os, None);
    }

    #[test]
    fn test_client_timestamp_is_ignored() {
        let req: SaveTextRequest =
            serde_json::from_str(r#"{"text": "hi", "timestamp": "2020-01-01T00:00:00Z"}"#)
                .unwrap();
        let entry = req.validate().unwrap();
        assert_eq!(entry.text, "hi");
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(ValidationError::Empty.to_string(), "Text cannot be empty");
        assert_eq!(
            ValidationError::TooLong { max: 25 }.to_string(),
            "Text cannot exceed 25 characters"
        );
    }
}
