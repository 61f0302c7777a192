use super::model::AuthenticatedUser;
use crate::core::error::AppError;
use crate::shared::constants::GROUPS_CLAIM;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use super::jwks::JwksClient;

pub struct JwtValidator {
    jwks_client: Arc<JwksClient>,
    issuer: String,
    client_id: Option<String>,
    leeway: u64,
}

/// Claims of a Cognito access token
#[derive(Debug, Clone, Deserialize)]
struct Claims {
    sub: String,
    // Validated by jsonwebtoken
    #[serde(rename = "iss")]
    _iss: String,
    #[serde(rename = "exp")]
    _exp: u64,

    token_use: String,
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(rename = "cognito:groups", default)]
    groups: Vec<String>,
}

impl JwtValidator {
    pub fn new(
        jwks_client: Arc<JwksClient>,
        issuer: String,
        client_id: Option<String>,
        leeway: Duration,
    ) -> Self {
        Self {
            jwks_client,
            issuer,
            client_id,
            leeway: leeway.as_secs(),
        }
    }

    pub async fn validate_token(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        let header = decode_header(token).map_err(|e| AppError::Auth(e.to_string()))?;

        if header.alg != Algorithm::RS256 {
            return Err(AppError::Auth(format!(
                "Unsupported algorithm: {:?}. Only RS256 is allowed",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| AppError::Auth("Missing kid in token header".to_string()))?;

        let decoding_key = self
            .jwks_client
            .get_key(&kid)
            .await
            .map_err(|e| AppError::Auth(e.to_string()))?;

        // Cognito access tokens carry client_id instead of aud
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.issuer]);
        validation.validate_aud = false;
        validation.leeway = self.leeway;
        validation.validate_nbf = true;

        let token_data = decode::<Claims>(token, &decoding_key, &validation)
            .map_err(|e| AppError::Auth(e.to_string()))?;

        user_from_claims(token_data.claims, self.client_id.as_deref())
    }
}

fn user_from_claims(
    claims: Claims,
    expected_client_id: Option<&str>,
) -> Result<AuthenticatedUser, AppError> {
    if claims.token_use != "access" {
        return Err(AppError::Auth("Token is not an access token".to_string()));
    }

    if let Some(expected) = expected_client_id {
        if claims.client_id.as_deref() != Some(expected) {
            return Err(AppError::Auth(
                "Token was issued to a different client".to_string(),
            ));
        }
    }

    tracing::debug!(
        "Authenticated {} with {}: {:?}",
        claims.sub,
        GROUPS_CLAIM,
        claims.groups
    );

    Ok(AuthenticatedUser {
        user_id: claims.sub,
        username: claims.username,
        groups: claims.groups,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims(value: serde_json::Value) -> Claims {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_access_token_claims_become_user() {
        let user = user_from_claims(
            claims(json!({
                "sub": "sub-1",
                "iss": "https://issuer",
                "exp": 1,
                "token_use": "access",
                "client_id": "app",
                "username": "alice",
                "cognito:groups": ["CPA"]
            })),
            Some("app"),
        )
        .unwrap();

        assert_eq!(user.user_id, "sub-1");
        assert_eq!(user.username.as_deref(), Some("alice"));
        assert_eq!(user.groups, vec!["CPA".to_string()]);
    }

    #[test]
    fn test_missing_groups_claim_defaults_empty() {
        let user = user_from_claims(
            claims(json!({ "sub": "s", "iss": "i", "exp": 1, "token_use": "access" })),
            None,
        )
        .unwrap();
        assert!(user.groups.is_empty());
    }

    #[test]
    fn test_id_token_rejected() {
        let result = user_from_claims(
            claims(json!({ "sub": "s", "iss": "i", "exp": 1, "token_use": "id" })),
            None,
        );
        assert!(matches!(result, Err(AppError::Auth(_))));
    }

    #[test]
    fn test_foreign_client_rejected() {
        let result = user_from_claims(
            claims(json!({
                "sub": "s", "iss": "i", "exp": 1,
                "token_use": "access", "client_id": "other"
            })),
            Some("app"),
        );
        assert!(matches!(result, Err(AppError::Auth(_))));
    }
}
