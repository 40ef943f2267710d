//! Wire and domain types for QR sharing sessions and scanned bundles.

use std::collections::BTreeSet;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, ShareError};
use crate::time::ExpiresAt;

pub const MAX_DATA_TYPES: usize = 10;
pub const MIN_EXPIRATION_MINUTES: u32 = 1;
pub const MAX_EXPIRATION_MINUTES: u32 = 60;
pub const DEFAULT_EXPIRATION_MINUTES: u32 = 15;
pub const MAX_PURPOSE_LEN: usize = 500;

/// What a patient wants to share and for how long.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRequest {
    pub data_types: BTreeSet<String>,
    pub expiration_minutes: u32,
    pub purpose: String,
}

impl ShareRequest {
    pub fn new<I, S>(data_types: I, expiration_minutes: u32, purpose: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            data_types: data_types.into_iter().map(Into::into).collect(),
            expiration_minutes,
            purpose: purpose.into(),
        }
    }

    /// Client-side checks, run before any request is sent.
    pub fn validate(&self) -> Result<()> {
        if self.data_types.is_empty() {
            return Err(ShareError::validation(
                "Please select at least one data type to share",
            ));
        }
        if self.data_types.len() > MAX_DATA_TYPES {
            return Err(ShareError::validation(format!(
                "Maximum {MAX_DATA_TYPES} data types allowed"
            )));
        }
        if self.data_types.iter().any(|t| t.trim().is_empty()) {
            return Err(ShareError::validation("Data types cannot be blank"));
        }
        if !(MIN_EXPIRATION_MINUTES..=MAX_EXPIRATION_MINUTES).contains(&self.expiration_minutes) {
            return Err(ShareError::validation(format!(
                "Expiration must be between {MIN_EXPIRATION_MINUTES} and {MAX_EXPIRATION_MINUTES} minutes"
            )));
        }
        if self.purpose.chars().count() > MAX_PURPOSE_LEN {
            return Err(ShareError::validation(format!(
                "Purpose cannot exceed {MAX_PURPOSE_LEN} characters"
            )));
        }
        Ok(())
    }
}

/// A server-side share session backing one generated QR code.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "QrSessionWire")]
pub struct QrSession {
    pub session_id: String,
    pub qr_image: Vec<u8>,
    pub expires_at: ExpiresAt,
    pub purpose: Option<String>,
}

impl QrSession {
    /// `data:` URL suitable for an `<img src>` or a terminal image viewer.
    pub fn qr_data_url(&self) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(&self.qr_image))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QrSessionWire {
    session_id: String,
    qr_code_image: QrImageWire,
    expires_at: ExpiresAt,
    #[serde(default)]
    purpose: Option<String>,
}

/// Jackson writes `byte[]` as base64, other backends send a number array.
#[derive(Deserialize)]
#[serde(untagged)]
enum QrImageWire {
    Base64(String),
    Bytes(Vec<u8>),
}

impl TryFrom<QrSessionWire> for QrSession {
    type Error = String;

    fn try_from(wire: QrSessionWire) -> std::result::Result<Self, Self::Error> {
        let qr_image = match wire.qr_code_image {
            QrImageWire::Bytes(bytes) => bytes,
            QrImageWire::Base64(encoded) => {
                let encoded = encoded
                    .split_once("base64,")
                    .map_or(encoded.as_str(), |(_, data)| data);
                STANDARD
                    .decode(encoded.trim())
                    .map_err(|e| format!("qrCodeImage is not valid base64: {e}"))?
            }
        };
        Ok(Self {
            session_id: wire.session_id,
            qr_image,
            expires_at: wire.expires_at,
            purpose: wire.purpose,
        })
    }
}

/// Raw text decoded from a QR code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScanPayload(String);

impl ScanPayload {
    pub fn new(data: impl Into<String>) -> Self {
        Self(data.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for ScanPayload {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ScanRequest<'a> {
    pub qr_data: &'a str,
}

/// One typed health record out of a scanned bundle.
#[derive(Debug, Clone, PartialEq)]
pub struct BundleEntry {
    pub resource_type: String,
    pub resource: Value,
}

/// Ordered health records returned for a scanned QR code.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(from = "BundleWire")]
pub struct HealthBundle {
    pub entries: Vec<BundleEntry>,
}

impl HealthBundle {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Deserialize)]
struct BundleWire {
    #[serde(default)]
    entry: Vec<EntryWire>,
}

#[derive(Deserialize)]
struct EntryWire {
    #[serde(default)]
    resource: Option<Value>,
}

impl From<BundleWire> for HealthBundle {
    fn from(wire: BundleWire) -> Self {
        let entries = wire
            .entry
            .into_iter()
            .map(|e| {
                let resource = e
                    .resource
                    .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
                let resource_type = resource
                    .get("resourceType")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                BundleEntry {
                    resource_type,
                    resource,
                }
            })
            .collect();
        Self { entries }
    }
}

/// Opaque status document for a share session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionStatus(pub Value);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(types: &[&str]) -> ShareRequest {
        ShareRequest::new(types.iter().copied(), 15, "checkup")
    }

    #[test]
    fn test_share_request_serializes_camel_case() {
        let req = request(&["VITALS", "Observation"]);
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            json!({
                "dataTypes": ["Observation", "VITALS"],
                "expirationMinutes": 15,
                "purpose": "checkup"
            })
        );
    }

    #[test]
    fn test_share_request_validation() {
        assert!(request(&["Observation"]).validate().is_ok());
        assert!(matches!(
            request(&[]).validate(),
            Err(ShareError::Validation(_))
        ));
        assert!(request(&["  "]).validate().is_err());

        let too_many: Vec<String> = (0..=MAX_DATA_TYPES).map(|i| format!("T{i}")).collect();
        assert!(ShareRequest::new(too_many, 15, "").validate().is_err());

        assert!(ShareRequest::new(["A"], 0, "").validate().is_err());
        assert!(ShareRequest::new(["A"], 61, "").validate().is_err());
        assert!(ShareRequest::new(["A"], 60, "").validate().is_ok());
        assert!(
            ShareRequest::new(["A"], 15, "x".repeat(MAX_PURPOSE_LEN + 1))
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_qr_session_from_base64() {
        let session: QrSession = serde_json::from_value(json!({
            "sessionId": "abc123",
            "qrCodeImage": "iVBORw==",
            "expiresAt": "2024-05-15T14:30:00Z",
            "purpose": "checkup"
        }))
        .unwrap();
        assert_eq!(session.session_id, "abc123");
        assert_eq!(session.qr_image, vec![0x89, 0x50, 0x4e, 0x47]);
        assert_eq!(session.purpose.as_deref(), Some("checkup"));
        assert_eq!(session.qr_data_url(), "data:image/png;base64,iVBORw==");
    }

    #[test]
    fn test_qr_session_from_byte_array() {
        let session: QrSession = serde_json::from_value(json!({
            "sessionId": "abc123",
            "qrCodeImage": [137, 80, 78, 71],
            "expiresAt": "2024-05-15T14:30:00Z"
        }))
        .unwrap();
        assert_eq!(session.qr_image, vec![0x89, 0x50, 0x4e, 0x47]);
        assert!(session.purpose.is_none());
    }

    #[test]
    fn test_qr_session_rejects_bad_base64() {
        let result = serde_json::from_value::<QrSession>(json!({
            "sessionId": "abc123",
            "qrCodeImage": "***",
            "expiresAt": "2024-05-15T14:30:00Z"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_bundle_entries_keep_order_and_type() {
        let bundle: HealthBundle = serde_json::from_value(json!({
            "resourceType": "Bundle",
            "entry": [
                {"resource": {"resourceType": "Patient", "id": "p1"}},
                {"resource": {"resourceType": "Observation", "id": "o1"}},
                {}
            ]
        }))
        .unwrap();
        assert_eq!(bundle.len(), 3);
        assert_eq!(bundle.entries[0].resource_type, "Patient");
        assert_eq!(bundle.entries[1].resource_type, "Observation");
        assert_eq!(bundle.entries[2].resource_type, "");
        assert_eq!(bundle.entries[2].resource, json!({}));
    }

    #[test]
    fn test_bundle_without_entries_is_empty() {
        let bundle: HealthBundle = serde_json::from_value(json!({"resourceType": "Bundle"})).unwrap();
        assert!(bundle.is_empty());
    }

    #[test]
    fn test_scan_payload_blank() {
        assert!(ScanPayload::new("  ").is_blank());
        assert!(!ScanPayload::from("XYZ").is_blank());
    }
}
