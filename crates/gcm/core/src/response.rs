//! Gateway response classification.
//!
//! The gateway answers either in the legacy line protocol
//! (`id=...\nregistration_id=...` or `Error=...`) or with an FCM v1 JSON body.
//! Both are mapped onto [`GatewayResponse`].

use serde::Deserialize;

/// Why a registration id can no longer be delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadRegistration {
    NotRegistered,
    InvalidRegistration,
}

impl std::fmt::Display for DeadRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotRegistered => write!(f, "NotRegistered"),
            Self::InvalidRegistration => write!(f, "InvalidRegistration"),
        }
    }
}

/// Classified gateway response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayResponse {
    /// Accepted. Carries the canonical id when the gateway rotated the token.
    Delivered { canonical_id: Option<String> },
    /// The registration id is dead and its device should be deactivated.
    Dead(DeadRegistration),
    /// Any other gateway error.
    Rejected,
    /// Unrecognised shape, passed through untouched.
    Unrecognized,
}

impl GatewayResponse {
    /// Classify a raw response body.
    pub fn classify(body: &str) -> Self {
        if body.starts_with("id") {
            let canonical_id = body
                .split('\n')
                .nth(1)
                .filter(|line| line.starts_with("registration_id"))
                .and_then(|line| line.rsplit('=').next())
                .map(str::trim_end)
                .filter(|id| !id.is_empty())
                .map(str::to_string);

            return Self::Delivered { canonical_id };
        }

        if body.starts_with("Error=") {
            return match body.trim_end() {
                "Error=NotRegistered" => Self::Dead(DeadRegistration::NotRegistered),
                "Error=InvalidRegistration" => Self::Dead(DeadRegistration::InvalidRegistration),
                _ => Self::Rejected,
            };
        }

        match serde_json::from_str::<V1ErrorEnvelope>(body) {
            Ok(envelope) => envelope.error.classify(),
            Err(_) => Self::Unrecognized,
        }
    }

    /// Whether the response is an error the caller must see.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected)
    }
}

#[derive(Debug, Deserialize)]
struct V1ErrorEnvelope {
    error: V1Error,
}

#[derive(Debug, Deserialize)]
struct V1Error {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Vec<V1ErrorDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct V1ErrorDetail {
    #[serde(default)]
    error_code: Option<String>,
}

impl V1Error {
    fn classify(&self) -> GatewayResponse {
        let codes: Vec<&str> = self
            .details
            .iter()
            .filter_map(|d| d.error_code.as_deref())
            .chain(self.status.as_deref())
            .collect();

        if codes.iter().any(|c| *c == "UNREGISTERED" || *c == "NOT_FOUND") {
            return GatewayResponse::Dead(DeadRegistration::NotRegistered);
        }

        let mentions_token = self
            .message
            .as_deref()
            .map(|m| m.to_lowercase().contains("registration token"))
            .unwrap_or(false);

        if mentions_token && codes.contains(&"INVALID_ARGUMENT") {
            return GatewayResponse::Dead(DeadRegistration::InvalidRegistration);
        }

        GatewayResponse::Rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_success() {
        assert_eq!(
            GatewayResponse::classify("id=0:1234%abcd"),
            GatewayResponse::Delivered { canonical_id: None }
        );
    }

    #[test]
    fn test_legacy_canonical_id() {
        assert_eq!(
            GatewayResponse::classify("id=123\nregistration_id=456"),
            GatewayResponse::Delivered {
                canonical_id: Some("456".into())
            }
        );
    }

    #[test]
    fn test_second_line_without_registration_id() {
        assert_eq!(
            GatewayResponse::classify("id=123\nsomething=else"),
            GatewayResponse::Delivered { canonical_id: None }
        );
    }

    #[test]
    fn test_empty_canonical_id_is_ignored() {
        assert_eq!(
            GatewayResponse::classify("id=1\nregistration_id=\n"),
            GatewayResponse::Delivered { canonical_id: None }
        );
        assert_eq!(
            GatewayResponse::classify("id=1\nregistration_id=  "),
            GatewayResponse::Delivered { canonical_id: None }
        );
    }

    #[test]
    fn test_legacy_dead_registrations() {
        assert_eq!(
            GatewayResponse::classify("Error=NotRegistered"),
            GatewayResponse::Dead(DeadRegistration::NotRegistered)
        );
        assert_eq!(
            GatewayResponse::classify("Error=InvalidRegistration\n"),
            GatewayResponse::Dead(DeadRegistration::InvalidRegistration)
        );
    }

    #[test]
    fn test_legacy_other_error_is_rejected() {
        assert!(GatewayResponse::classify("Error=MismatchSenderId").is_rejected());
        assert!(GatewayResponse::classify("Error=NotRegisteredish").is_rejected());
    }

    #[test]
    fn test_v1_success_passes_through() {
        let body = r#"{"name": "projects/demo/messages/0:1500415314455276%31bd1c9631bd1c96"}"#;
        assert_eq!(GatewayResponse::classify(body), GatewayResponse::Unrecognized);
    }

    #[test]
    fn test_v1_unregistered() {
        let body = r#"{
            "error": {
                "code": 404,
                "message": "Requested entity was not found.",
                "status": "NOT_FOUND",
                "details": [{
                    "@type": "type.googleapis.com/google.firebase.fcm.v1.FcmError",
                    "errorCode": "UNREGISTERED"
                }]
            }
        }"#;
        assert_eq!(
            GatewayResponse::classify(body),
            GatewayResponse::Dead(DeadRegistration::NotRegistered)
        );
    }

    #[test]
    fn test_v1_invalid_token() {
        let body = r#"{
            "error": {
                "code": 400,
                "message": "The registration token is not a valid FCM registration token",
                "status": "INVALID_ARGUMENT",
                "details": [{"errorCode": "INVALID_ARGUMENT"}]
            }
        }"#;
        assert_eq!(
            GatewayResponse::classify(body),
            GatewayResponse::Dead(DeadRegistration::InvalidRegistration)
        );
    }

    #[test]
    fn test_v1_other_errors_are_rejected() {
        let sender = r#"{"error": {"code": 403, "status": "PERMISSION_DENIED",
            "details": [{"errorCode": "SENDER_ID_MISMATCH"}]}}"#;
        let bad_payload = r#"{"error": {"code": 400, "status": "INVALID_ARGUMENT",
            "message": "Invalid JSON payload received."}}"#;

        assert!(GatewayResponse::classify(sender).is_rejected());
        assert!(GatewayResponse::classify(bad_payload).is_rejected());
    }

    #[test]
    fn test_plain_text_is_unrecognized() {
        assert_eq!(GatewayResponse::classify("ok"), GatewayResponse::Unrecognized);
        assert_eq!(GatewayResponse::classify(""), GatewayResponse::Unrecognized);
    }
}
