use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, info, warn};

use crate::core::config::ClientConfig;
use crate::modules::identity::{
    AuthTokens, CognitoClient, CognitoUser, IdentityError, SignInOutcome,
};
use crate::shared::constants::GROUPS_CLAIM;

/// Tokens of the current session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionTokens {
    pub access_token: String,
    pub id_token: Option<String>,
}

/// Result of submitting credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignInStep {
    Done,
    /// The provider demands a new password before issuing tokens
    NewPasswordRequired,
}

/// Identity provider seen by the session resolver
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, username: &str, password: &str) -> Result<SignInStep, IdentityError>;

    /// Complete a pending new-password challenge
    async fn confirm_new_password(&self, new_password: &str) -> Result<(), IdentityError>;

    /// Tokens of the signed-in user; `NotSignedIn` when there is no session
    async fn current_session(&self) -> Result<SessionTokens, IdentityError>;

    /// User the provider reports for `access_token`
    async fn current_user(&self, access_token: &str) -> Result<CognitoUser, IdentityError>;

    /// Invalidate the session remotely and forget it locally
    async fn sign_out(&self) -> Result<(), IdentityError>;
}

/// Claims read from a token payload. The signature is not checked here; the
/// API validates every token it receives.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(rename = "cognito:username", default)]
    pub cognito_username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(rename = "cognito:groups", default)]
    pub groups: Vec<String>,
}

impl TokenClaims {
    pub fn decode(token: &str) -> Result<Self, IdentityError> {
        let payload = token
            .split('.')
            .nth(1)
            .ok_or_else(|| IdentityError::InvalidResponse("Malformed token".to_string()))?;
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| IdentityError::InvalidResponse(format!("Malformed token: {}", e)))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| IdentityError::InvalidResponse(format!("Malformed token claims: {}", e)))
    }
}

/// Union of the `cognito:groups` claims of every token, first occurrence wins
pub fn merge_groups<'a>(claim_sets: impl IntoIterator<Item = &'a TokenClaims>) -> Vec<String> {
    let mut groups: Vec<String> = Vec::new();
    for claims in claim_sets {
        for group in &claims.groups {
            if !groups.contains(group) {
                groups.push(group.clone());
            }
        }
    }
    debug!("Resolved {}: {:?}", GROUPS_CLAIM, groups);
    groups
}

/// Canonical user name carried by an access token, or `fallback`.
///
/// Cognito computes `SECRET_HASH` over this name, not over the email alias
/// typed at sign-in.
fn canonical_username(fallback: &str, tokens: &AuthTokens) -> String {
    TokenClaims::decode(&tokens.access_token)
        .ok()
        .and_then(|claims| claims.username.or(claims.cognito_username).or(claims.sub))
        .unwrap_or_else(|| fallback.to_string())
}

/// Session persisted between CLI invocations
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredSession {
    /// Canonical user name, used for `SECRET_HASH` on refresh
    username: String,
    tokens: AuthTokens,
    expires_at: DateTime<Utc>,
}

impl StoredSession {
    fn new(username: &str, tokens: AuthTokens) -> Self {
        Self {
            username: canonical_username(username, &tokens),
            expires_at: Utc::now() + ChronoDuration::seconds(tokens.expires_in),
            tokens,
        }
    }

    // Refresh a minute early so the token does not expire in flight
    fn is_expired(&self) -> bool {
        self.expires_at - ChronoDuration::seconds(60) <= Utc::now()
    }
}

struct PendingChallenge {
    username: String,
    session: String,
}

/// Cognito-backed provider keeping its tokens in a JSON file
pub struct CognitoIdentityProvider {
    cognito: CognitoClient,
    session_file: PathBuf,
    pending: Mutex<Option<PendingChallenge>>,
}

impl CognitoIdentityProvider {
    pub fn new(cognito: CognitoClient, session_file: PathBuf) -> Self {
        Self {
            cognito,
            session_file,
            pending: Mutex::new(None),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, IdentityError> {
        let cognito = CognitoClient::new(
            &config.cognito_region,
            config.cognito_client_id.clone(),
            config.cognito_client_secret.clone(),
            config.auth_timeout,
        )?;
        Ok(Self::new(cognito, config.session_file.clone()))
    }

    async fn load(&self) -> Result<Option<StoredSession>, IdentityError> {
        match tokio::fs::read(&self.session_file).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| IdentityError::SessionStore(format!("Corrupt session file: {}", e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(IdentityError::SessionStore(e.to_string())),
        }
    }

    async fn save(&self, session: &StoredSession) -> Result<(), IdentityError> {
        if let Some(parent) = self.session_file.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| IdentityError::SessionStore(e.to_string()))?;
        }
        let bytes = serde_json::to_vec_pretty(session)
            .map_err(|e| IdentityError::SessionStore(e.to_string()))?;
        tokio::fs::write(&self.session_file, bytes)
            .await
            .map_err(|e| IdentityError::SessionStore(e.to_string()))
    }

    async fn clear(&self) -> Result<(), IdentityError> {
        match tokio::fs::remove_file(&self.session_file).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(IdentityError::SessionStore(e.to_string())),
        }
    }

    fn take_pending(&self) -> Option<PendingChallenge> {
        self.pending.lock().ok().and_then(|mut pending| pending.take())
    }

    fn set_pending(&self, challenge: Option<PendingChallenge>) {
        if let Ok(mut pending) = self.pending.lock() {
            *pending = challenge;
        }
    }
}

#[async_trait]
impl IdentityProvider for CognitoIdentityProvider {
    async fn sign_in(&self, username: &str, password: &str) -> Result<SignInStep, IdentityError> {
        self.set_pending(None);

        match self.cognito.initiate_password_auth(username, password).await? {
            SignInOutcome::SignedIn(tokens) => {
                self.save(&StoredSession::new(username, tokens)).await?;
                info!("Signed in as {}", username);
                Ok(SignInStep::Done)
            }
            SignInOutcome::NewPasswordRequired {
                session,
                username: canonical,
            } => {
                debug!("New password required for {}", username);
                self.set_pending(Some(PendingChallenge {
                    username: canonical.unwrap_or_else(|| username.to_string()),
                    session,
                }));
                Ok(SignInStep::NewPasswordRequired)
            }
        }
    }

    async fn confirm_new_password(&self, new_password: &str) -> Result<(), IdentityError> {
        let challenge = self.take_pending().ok_or_else(|| {
            IdentityError::InvalidResponse("No pending sign-in challenge".to_string())
        })?;

        let tokens = self
            .cognito
            .respond_new_password(&challenge.username, &challenge.session, new_password)
            .await?;
        self.save(&StoredSession::new(&challenge.username, tokens))
            .await?;
        info!("Signed in as {} after setting a new password", challenge.username);
        Ok(())
    }

    async fn current_session(&self) -> Result<SessionTokens, IdentityError> {
        let mut stored = self.load().await?.ok_or(IdentityError::NotSignedIn)?;

        if stored.is_expired() {
            let refresh_token = stored
                .tokens
                .refresh_token
                .clone()
                .ok_or(IdentityError::NotSignedIn)?;

            debug!("Access token expired, refreshing");
            let tokens = self.cognito.refresh(&stored.username, &refresh_token).await?;
            stored = StoredSession::new(&stored.username, tokens);
            self.save(&stored).await?;
        }

        Ok(SessionTokens {
            access_token: stored.tokens.access_token,
            id_token: stored.tokens.id_token,
        })
    }

    async fn current_user(&self, access_token: &str) -> Result<CognitoUser, IdentityError> {
        self.cognito.get_user(access_token).await
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        let remote = match self.load().await {
            Ok(Some(stored)) => self.cognito.global_sign_out(&stored.tokens.access_token).await,
            Ok(None) => Ok(()),
            Err(e) => Err(e),
        };

        self.set_pending(None);
        self.clear().await?;

        if let Err(ref e) = remote {
            warn!("Remote sign-out failed: {}", e);
        }
        remote
    }
}
