//! Local sanity checks on an API key before it is used for lookups.

use serde::Serialize;

const MIN_KEY_LEN: usize = 20;
const REVOKED_MARKER: &str = "invalid";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyValidation {
    pub is_valid: bool,
    pub message: String,
}

impl KeyValidation {
    fn invalid(message: &str) -> Self {
        Self {
            is_valid: false,
            message: message.to_string(),
        }
    }
}

pub fn validate_credential(key: &str) -> KeyValidation {
    if key.is_empty() {
        return KeyValidation::invalid("");
    }
    if key.chars().count() < MIN_KEY_LEN {
        return KeyValidation::invalid("This API key appears to be malformed.");
    }
    if key.to_lowercase().contains(REVOKED_MARKER) {
        return KeyValidation::invalid("Authentication failed. This API key is invalid.");
    }
    KeyValidation {
        is_valid: true,
        message: "API Key is valid and ready!".to_string(),
    }
}
