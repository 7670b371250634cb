//! QR payload printed on job travellers and read by the scanner.

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QrError {
    #[error("Invalid QR code format. Expected: {{ job: number }}")]
    InvalidFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QrPayload {
    pub job: i64,
}

/// Parse decoded QR text. The text must be a JSON object with an integer
/// `job`; other fields are ignored.
pub fn parse_qr_payload(text: &str) -> Result<QrPayload, QrError> {
    let value: Value = serde_json::from_str(text.trim()).map_err(|_| QrError::InvalidFormat)?;
    let job = value
        .as_object()
        .and_then(|object| object.get("job"))
        .and_then(Value::as_i64)
        .ok_or(QrError::InvalidFormat)?;
    Ok(QrPayload { job })
}

impl fmt::Display for QrPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{\"job\":{}}}", self.job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_payload() {
        assert_eq!(parse_qr_payload(r#"{"job": 42}"#).unwrap(), QrPayload { job: 42 });
    }

    #[test]
    fn test_extra_fields_ignored() {
        let payload = parse_qr_payload(r#"{"job": 7, "rev": "B"}"#).unwrap();
        assert_eq!(payload.job, 7);
    }

    #[test]
    fn test_rejects_bad_payloads() {
        for text in [
            "42",
            "job:42",
            "[42]",
            r#"{"id": 42}"#,
            r#"{"job": "42"}"#,
            r#"{"job": 4.5}"#,
            r#"{"job": null}"#,
            "",
        ] {
            assert_eq!(parse_qr_payload(text), Err(QrError::InvalidFormat), "{}", text);
        }
    }

    #[test]
    fn test_error_message() {
        assert_eq!(
            QrError::InvalidFormat.to_string(),
            "Invalid QR code format. Expected: { job: number }"
        );
    }

    #[test]
    fn test_display_round_trips() {
        let payload = QrPayload { job: 12 };
        assert_eq!(payload.to_string(), r#"{"job":12}"#);
        assert_eq!(parse_qr_payload(&payload.to_string()).unwrap(), payload);
    }
}
