//! Cognito user-pool client
//!
//! Talks to the public `cognito-idp` JSON API. Only unauthenticated
//! operations are used (InitiateAuth, RespondToAuthChallenge, GetUser,
//! GlobalSignOut), so requests carry no SigV4 signature.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::Sha256;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

const TARGET_PREFIX: &str = "AWSCognitoIdentityProviderService";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const CHALLENGE_NEW_PASSWORD: &str = "NEW_PASSWORD_REQUIRED";

#[derive(Debug, Error)]
pub enum IdentityError {
    /// Error reported by the provider; `message` is meant to be shown verbatim
    #[error("{message}")]
    Provider { code: String, message: String },

    #[error("No signed-in user")]
    NotSignedIn,

    #[error("Unsupported sign-in challenge: {0}")]
    UnsupportedChallenge(String),

    #[error("Identity provider request failed: {0}")]
    Transport(String),

    #[error("Invalid identity provider response: {0}")]
    InvalidResponse(String),

    #[error("Identity provider configuration error: {0}")]
    Config(String),

    #[error("Session store error: {0}")]
    SessionStore(String),
}

/// Tokens issued after a successful sign-in or refresh
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthTokens {
    pub access_token: String,
    pub id_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    pub token_type: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignInOutcome {
    SignedIn(AuthTokens),
    /// First login of an administratively created user. `username` is the
    /// canonical name from `USER_ID_FOR_SRP`, when Cognito sends one.
    NewPasswordRequired {
        session: String,
        username: Option<String>,
    },
}

/// User returned by `GetUser`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CognitoUser {
    pub username: String,
    pub attributes: HashMap<String, String>,
}

impl CognitoUser {
    /// Stable user id (`sub` attribute), falling back to the username
    pub fn user_id(&self) -> &str {
        self.attributes
            .get("sub")
            .map(String::as_str)
            .unwrap_or(&self.username)
    }

    pub fn email(&self) -> Option<&str> {
        self.attributes.get("email").map(String::as_str)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthenticationResult {
    access_token: String,
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: i64,
    #[serde(default = "default_token_type")]
    token_type: String,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl From<AuthenticationResult> for AuthTokens {
    fn from(result: AuthenticationResult) -> Self {
        Self {
            access_token: result.access_token,
            id_token: result.id_token,
            refresh_token: result.refresh_token,
            expires_in: result.expires_in,
            token_type: result.token_type,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateAuthResponse {
    #[serde(default)]
    authentication_result: Option<AuthenticationResult>,
    #[serde(default)]
    challenge_name: Option<String>,
    #[serde(default)]
    challenge_parameters: HashMap<String, String>,
    #[serde(default)]
    session: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AttributeType {
    name: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetUserResponse {
    username: String,
    #[serde(default)]
    user_attributes: Vec<AttributeType>,
}

/// Cognito error response
#[derive(Debug, Deserialize)]
struct CognitoErrorResponse {
    #[serde(rename = "__type", default)]
    error_type: String,
    #[serde(alias = "Message", default)]
    message: String,
}

/// Client for Cognito user-pool auth operations
pub struct CognitoClient {
    endpoint: String,
    client_id: String,
    client_secret: Option<String>,
    http_client: reqwest::Client,
}

impl CognitoClient {
    pub fn new(
        region: &str,
        client_id: String,
        client_secret: Option<String>,
        timeout: Duration,
    ) -> Result<Self, IdentityError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IdentityError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: format!("https://cognito-idp.{}.amazonaws.com/", region),
            client_id,
            client_secret,
            http_client,
        })
    }

    /// Point the client at a different endpoint (LocalStack, tests)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// `SECRET_HASH` = Base64(HMAC-SHA256(client_secret, username + client_id))
    fn secret_hash(&self, username: &str) -> Result<Option<String>, IdentityError> {
        let Some(secret) = &self.client_secret else {
            return Ok(None);
        };
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| IdentityError::Config(format!("HMAC key error: {}", e)))?;
        mac.update(username.as_bytes());
        mac.update(self.client_id.as_bytes());
        Ok(Some(BASE64.encode(mac.finalize().into_bytes())))
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        operation: &str,
        body: Value,
    ) -> Result<T, IdentityError> {
        tracing::debug!("Calling Cognito {}", operation);

        let response = self
            .http_client
            .post(&self.endpoint)
            .header("X-Amz-Target", format!("{}.{}", TARGET_PREFIX, operation))
            .header("Content-Type", CONTENT_TYPE)
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Cognito {} request failed: {}", operation, e);
                IdentityError::Transport(e.to_string())
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(parse_error(status.as_u16(), &text));
        }

        serde_json::from_str::<T>(&text).map_err(|e| {
            tracing::error!("Failed to parse Cognito {} response: {}", operation, e);
            IdentityError::InvalidResponse(e.to_string())
        })
    }

    /// Start a USER_PASSWORD_AUTH sign-in
    pub async fn initiate_password_auth(
        &self,
        username: &str,
        password: &str,
    ) -> Result<SignInOutcome, IdentityError> {
        let mut params = json!({ "USERNAME": username, "PASSWORD": password });
        if let Some(hash) = self.secret_hash(username)? {
            params["SECRET_HASH"] = Value::String(hash);
        }

        let response: InitiateAuthResponse = self
            .call(
                "InitiateAuth",
                json!({
                    "AuthFlow": "USER_PASSWORD_AUTH",
                    "ClientId": self.client_id,
                    "AuthParameters": params,
                }),
            )
            .await?;

        if let Some(result) = response.authentication_result {
            return Ok(SignInOutcome::SignedIn(result.into()));
        }

        match response.challenge_name.as_deref() {
            Some(CHALLENGE_NEW_PASSWORD) => {
                let session = response.session.ok_or_else(|| {
                    IdentityError::InvalidResponse("Challenge without session".to_string())
                })?;
                let username = response
                    .challenge_parameters
                    .get("USER_ID_FOR_SRP")
                    .cloned();
                Ok(SignInOutcome::NewPasswordRequired { session, username })
            }
            Some(other) => Err(IdentityError::UnsupportedChallenge(other.to_string())),
            None => Err(IdentityError::InvalidResponse(
                "Neither tokens nor challenge in InitiateAuth response".to_string(),
            )),
        }
    }

    /// Answer NEW_PASSWORD_REQUIRED with `new_password`.
    ///
    /// `username` must be the canonical name when a client secret is set.
    pub async fn respond_new_password(
        &self,
        username: &str,
        session: &str,
        new_password: &str,
    ) -> Result<AuthTokens, IdentityError> {
        let mut responses = json!({ "USERNAME": username, "NEW_PASSWORD": new_password });
        if let Some(hash) = self.secret_hash(username)? {
            responses["SECRET_HASH"] = Value::String(hash);
        }

        let response: InitiateAuthResponse = self
            .call(
                "RespondToAuthChallenge",
                json!({
                    "ChallengeName": CHALLENGE_NEW_PASSWORD,
                    "ClientId": self.client_id,
                    "Session": session,
                    "ChallengeResponses": responses,
                }),
            )
            .await?;

        match (response.authentication_result, response.challenge_name) {
            (Some(result), _) => Ok(result.into()),
            (None, Some(challenge)) => Err(IdentityError::UnsupportedChallenge(challenge)),
            (None, None) => Err(IdentityError::InvalidResponse(
                "No tokens in RespondToAuthChallenge response".to_string(),
            )),
        }
    }

    /// Exchange a refresh token for fresh access and ID tokens.
    ///
    /// `username` is the canonical name (`username` claim of the access
    /// token), not a sign-in alias. Cognito does not rotate the refresh
    /// token, so the given one is kept.
    pub async fn refresh(
        &self,
        username: &str,
        refresh_token: &str,
    ) -> Result<AuthTokens, IdentityError> {
        let mut params = json!({ "REFRESH_TOKEN": refresh_token });
        if let Some(hash) = self.secret_hash(username)? {
            params["SECRET_HASH"] = Value::String(hash);
        }

        let response: InitiateAuthResponse = self
            .call(
                "InitiateAuth",
                json!({
                    "AuthFlow": "REFRESH_TOKEN_AUTH",
                    "ClientId": self.client_id,
                    "AuthParameters": params,
                }),
            )
            .await?;

        let mut tokens: AuthTokens = response
            .authentication_result
            .ok_or_else(|| IdentityError::InvalidResponse("No tokens in refresh".to_string()))?
            .into();
        if tokens.refresh_token.is_none() {
            tokens.refresh_token = Some(refresh_token.to_string());
        }
        Ok(tokens)
    }

    /// User behind a live access token; revoked tokens fail with `NotAuthorizedException`
    pub async fn get_user(&self, access_token: &str) -> Result<CognitoUser, IdentityError> {
        let response: GetUserResponse = self
            .call("GetUser", json!({ "AccessToken": access_token }))
            .await?;

        Ok(CognitoUser {
            username: response.username,
            attributes: response
                .user_attributes
                .into_iter()
                .map(|a| (a.name, a.value))
                .collect(),
        })
    }

    /// Invalidate every token issued to the user
    pub async fn global_sign_out(&self, access_token: &str) -> Result<(), IdentityError> {
        let _: Value = self
            .call("GlobalSignOut", json!({ "AccessToken": access_token }))
            .await?;
        Ok(())
    }
}

fn parse_error(status: u16, body: &str) -> IdentityError {
    match serde_json::from_str::<CognitoErrorResponse>(body) {
        Ok(err) if !err.error_type.is_empty() => {
            // "__type" may be namespaced: "com.amazonaws...#NotAuthorizedException"
            let code = err
                .error_type
                .rsplit('#')
                .next()
                .unwrap_or(&err.error_type)
                .to_string();
            let message = if err.message.is_empty() {
                code.clone()
            } else {
                err.message
            };
            IdentityError::Provider { code, message }
        }
        _ => IdentityError::Transport(format!("HTTP {}: {}", status, body)),
    }
}
