use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use tracing::warn;

use super::AppState;
use crate::domain::Credential;
use crate::pricing::{validate_credential as check_format, KeyValidation, LookupError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRequest {
    #[serde(default)]
    pub api_key: String,
}

/// Local format checks, then a live probe when the real backend is configured.
pub async fn validate_credential(
    State(state): State<AppState>,
    Json(request): Json<ValidateRequest>,
) -> Json<KeyValidation> {
    let local = check_format(request.api_key.trim());
    if !local.is_valid {
        return Json(local);
    }

    let Some(source) = state.config.serpapi_source() else {
        return Json(local);
    };

    let credential = Credential::new(request.api_key.trim());
    let validation = match source.verify_credential(&credential).await {
        Ok(()) => local,
        Err(LookupError::Http { status, .. }) => KeyValidation {
            is_valid: false,
            message: format!("Invalid Key ({})", status),
        },
        Err(e) => {
            warn!("Key verification for {} failed: {}", credential.prefix(), e);
            KeyValidation {
                is_valid: false,
                message: "Connection Failed".to_string(),
            }
        }
    };
    Json(validation)
}
