use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::client::identity::{merge_groups, IdentityProvider, SignInStep, TokenClaims};
use crate::client::ClientError;
use crate::modules::identity::IdentityError;
use crate::shared::dashboard::DashboardView;
use crate::shared::role::Role;

/// Identity of the signed-in user
#[derive(Debug, Clone, PartialEq)]
pub struct SessionUser {
    pub user_id: String,
    pub username: Option<String>,
    pub email: Option<String>,
    pub groups: Vec<String>,
}

/// Observable session state
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub loading: bool,
    pub user: Option<SessionUser>,
    pub role: Option<Role>,
}

impl SessionState {
    fn loading() -> Self {
        Self {
            loading: true,
            user: None,
            role: None,
        }
    }

    fn signed_out() -> Self {
        Self {
            loading: false,
            user: None,
            role: None,
        }
    }

    /// Dashboard for this state, recomputed on every call
    pub fn dashboard(&self) -> DashboardView {
        DashboardView::route(self.loading, self.role)
    }
}

/// Session and role of the current user.
///
/// Created once at start-up with [`SessionContext::init`] and passed to every
/// consumer; changes are broadcast through [`SessionContext::subscribe`].
pub struct SessionContext {
    provider: Arc<dyn IdentityProvider>,
    state: watch::Sender<SessionState>,
}

impl SessionContext {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        let (state, _) = watch::channel(SessionState::loading());
        Self { provider, state }
    }

    /// Create the context and resolve the current session
    pub async fn init(provider: Arc<dyn IdentityProvider>) -> Self {
        let context = Self::new(provider);
        context.resolve().await;
        context
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn dashboard(&self) -> DashboardView {
        self.state().dashboard()
    }

    /// Resolve the current user and role.
    ///
    /// A missing or invalid session is not an error: it settles to no user
    /// and no role.
    pub async fn resolve(&self) -> SessionState {
        self.state.send_modify(|state| state.loading = true);

        let resolved = match self.lookup().await {
            Ok(user) => {
                let role = Role::from_groups(&user.groups);
                debug!("Session resolved: user={}, role={}", user.user_id, role);
                SessionState {
                    loading: false,
                    user: Some(user),
                    role: Some(role),
                }
            }
            Err(IdentityError::NotSignedIn) => {
                debug!("No active session");
                SessionState::signed_out()
            }
            Err(e) => {
                warn!("Session resolution failed: {}", e);
                SessionState::signed_out()
            }
        };

        self.state.send_replace(resolved.clone());
        resolved
    }

    async fn lookup(&self) -> Result<SessionUser, IdentityError> {
        let tokens = self.provider.current_session().await?;

        // A revoked or deleted user fails here even with unexpired tokens
        let remote = self.provider.current_user(&tokens.access_token).await?;

        let access = TokenClaims::decode(&tokens.access_token)?;
        let id = match &tokens.id_token {
            Some(token) => Some(TokenClaims::decode(token)?),
            None => None,
        };

        let groups = merge_groups(std::iter::once(&access).chain(id.as_ref()));
        let email = remote
            .email()
            .map(str::to_string)
            .or_else(|| id.as_ref().and_then(|c| c.email.clone()));

        Ok(SessionUser {
            user_id: remote.user_id().to_string(),
            username: Some(remote.username.clone()),
            email,
            groups,
        })
    }

    /// Sign in and resolve the new session.
    ///
    /// A forced password change on first login is answered with the same
    /// password. Provider errors are returned unchanged.
    pub async fn login(&self, username: &str, password: &str) -> Result<SessionState, IdentityError> {
        match self.provider.sign_in(username, password).await? {
            SignInStep::Done => {}
            SignInStep::NewPasswordRequired => {
                info!("Confirming first login of {}", username);
                self.provider.confirm_new_password(password).await?;
            }
        }

        Ok(self.resolve().await)
    }

    /// Sign out. Local state is cleared even when the remote call fails; that
    /// failure is still returned.
    pub async fn logout(&self) -> Result<(), IdentityError> {
        let remote = self.provider.sign_out().await;
        self.state.send_replace(SessionState::signed_out());

        if let Err(ref e) = remote {
            warn!("Sign-out failed remotely, local session cleared: {}", e);
        }
        remote
    }

    /// Access token of the current session, refreshed when needed
    pub async fn access_token(&self) -> Result<String, ClientError> {
        match self.provider.current_session().await {
            Ok(tokens) => Ok(tokens.access_token),
            Err(IdentityError::NotSignedIn) => Err(ClientError::NotSignedIn),
            Err(e) => Err(e.into()),
        }
    }

    /// User id of the resolved session
    pub fn user_id(&self) -> Result<String, ClientError> {
        self.state
            .borrow()
            .user
            .as_ref()
            .map(|user| user.user_id.clone())
            .ok_or(ClientError::NotSignedIn)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::client::identity::tests::token;
    use crate::client::identity::SessionTokens;
    use crate::modules::identity::CognitoUser;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use tokio::sync::Notify;

    /// Provider double with scripted answers
    #[derive(Default)]
    pub(crate) struct FakeProvider {
        pub session: Mutex<Option<SessionTokens>>,
        pub next_session: Mutex<Option<SessionTokens>>,
        pub require_new_password: bool,
        pub sign_in_error: Option<(String, String)>,
        pub sign_out_fails: bool,
        pub revoked: bool,
        pub confirmed_with: Mutex<Option<String>>,
        pub gate: Option<Arc<Notify>>,
    }

    impl FakeProvider {
        pub(crate) fn signed_in(access: Value, id: Option<Value>) -> Self {
            Self {
                session: Mutex::new(Some(SessionTokens {
                    access_token: token(access),
                    id_token: id.map(token),
                })),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl IdentityProvider for FakeProvider {
        async fn sign_in(&self, _username: &str, _password: &str) -> Result<SignInStep, IdentityError> {
            if let Some((code, message)) = &self.sign_in_error {
                return Err(IdentityError::Provider {
                    code: code.clone(),
                    message: message.clone(),
                });
            }
            if self.require_new_password {
                return Ok(SignInStep::NewPasswordRequired);
            }
            let next = self.next_session.lock().unwrap().take();
            *self.session.lock().unwrap() = next;
            Ok(SignInStep::Done)
        }

        async fn confirm_new_password(&self, new_password: &str) -> Result<(), IdentityError> {
            *self.confirmed_with.lock().unwrap() = Some(new_password.to_string());
            let next = self.next_session.lock().unwrap().take();
            *self.session.lock().unwrap() = next;
            Ok(())
        }

        async fn current_session(&self) -> Result<SessionTokens, IdentityError> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.session
                .lock()
                .unwrap()
                .clone()
                .ok_or(IdentityError::NotSignedIn)
        }

        /// Mirrors GetUser: `sub` and `email` attributes from the access token
        async fn current_user(&self, access_token: &str) -> Result<CognitoUser, IdentityError> {
            if self.revoked {
                return Err(IdentityError::Provider {
                    code: "NotAuthorizedException".to_string(),
                    message: "Access Token has been revoked".to_string(),
                });
            }
            let claims = TokenClaims::decode(access_token)?;
            let mut attributes = HashMap::new();
            if let Some(sub) = &claims.sub {
                attributes.insert("sub".to_string(), sub.clone());
            }
            if let Some(email) = &claims.email {
                attributes.insert("email".to_string(), email.clone());
            }
            Ok(CognitoUser {
                username: claims.username.or(claims.sub).unwrap_or_default(),
                attributes,
            })
        }

        async fn sign_out(&self) -> Result<(), IdentityError> {
            *self.session.lock().unwrap() = None;
            if self.sign_out_fails {
                return Err(IdentityError::Transport("network down".to_string()));
            }
            Ok(())
        }
    }

    async fn role_for(groups: Value) -> Option<Role> {
        let provider = FakeProvider::signed_in(json!({ "sub": "u1", "cognito:groups": groups }), None);
        SessionContext::init(Arc::new(provider)).await.state().role
    }

    #[tokio::test]
    async fn test_role_priority() {
        assert_eq!(role_for(json!(["ADMIN", "CPA"])).await, Some(Role::Admin));
        assert_eq!(role_for(json!(["CPA"])).await, Some(Role::Cpa));
        assert_eq!(role_for(json!([])).await, Some(Role::Client));
    }

    #[tokio::test]
    async fn test_missing_groups_claim_is_client() {
        let provider = FakeProvider::signed_in(json!({ "sub": "u1" }), None);
        let state = SessionContext::init(Arc::new(provider)).await.state();
        assert_eq!(state.role, Some(Role::Client));
        assert_eq!(state.dashboard(), DashboardView::Client);
    }

    #[tokio::test]
    async fn test_groups_merge_access_and_id_tokens() {
        let provider = FakeProvider::signed_in(
            json!({ "sub": "u1", "username": "jane" }),
            Some(json!({ "sub": "u1", "email": "jane@example.com", "cognito:groups": ["CPA", "CLIENT"] })),
        );
        let state = SessionContext::init(Arc::new(provider)).await.state();

        let user = state.user.unwrap();
        assert_eq!(user.groups, vec!["CPA", "CLIENT"]);
        assert_eq!(user.email.as_deref(), Some("jane@example.com"));
        assert_eq!(user.username.as_deref(), Some("jane"));
        assert_eq!(state.role, Some(Role::Cpa));
    }

    #[tokio::test]
    async fn test_no_session_settles_without_role() {
        let context = SessionContext::init(Arc::new(FakeProvider::default())).await;
        let state = context.state();

        assert!(!state.loading);
        assert!(state.user.is_none());
        assert!(state.role.is_none());
        assert!(matches!(state.dashboard(), DashboardView::AccessDenied { .. }));
    }

    #[tokio::test]
    async fn test_revoked_session_settles_without_role() {
        let provider = FakeProvider {
            revoked: true,
            ..FakeProvider::signed_in(json!({ "sub": "u1", "cognito:groups": ["ADMIN"] }), None)
        };
        let state = SessionContext::init(Arc::new(provider)).await.state();

        assert!(!state.loading);
        assert!(state.user.is_none());
        assert!(state.role.is_none());
    }

    #[tokio::test]
    async fn test_loading_while_resolving() {
        let gate = Arc::new(Notify::new());
        let provider = FakeProvider {
            gate: Some(gate.clone()),
            ..FakeProvider::signed_in(json!({ "sub": "u1", "cognito:groups": ["ADMIN"] }), None)
        };
        let context = Arc::new(SessionContext::new(Arc::new(provider)));
        let mut updates = context.subscribe();
        assert!(context.state().loading);
        assert_eq!(context.dashboard(), DashboardView::Waiting);

        let task = tokio::spawn({
            let context = context.clone();
            async move { context.resolve().await }
        });
        gate.notify_one();
        let resolved = task.await.unwrap();

        assert!(!resolved.loading);
        updates.changed().await.unwrap();
        assert_eq!(updates.borrow().role, Some(Role::Admin));
        assert_eq!(context.dashboard(), DashboardView::Admin);
    }

    #[tokio::test]
    async fn test_login_confirms_new_password_with_same_password() {
        let provider = Arc::new(FakeProvider {
            require_new_password: true,
            next_session: Mutex::new(Some(SessionTokens {
                access_token: token(json!({ "sub": "u2", "cognito:groups": ["CLIENT"] })),
                id_token: None,
            })),
            ..Default::default()
        });
        let context = SessionContext::init(provider.clone()).await;

        let state = context.login("new@example.com", "Temp#123").await.unwrap();

        assert_eq!(provider.confirmed_with.lock().unwrap().as_deref(), Some("Temp#123"));
        assert_eq!(state.role, Some(Role::Client));
        assert_eq!(context.user_id().unwrap(), "u2");
    }

    #[tokio::test]
    async fn test_login_error_is_returned_verbatim() {
        let provider = FakeProvider {
            sign_in_error: Some((
                "NotAuthorizedException".to_string(),
                "Incorrect username or password.".to_string(),
            )),
            ..Default::default()
        };
        let context = SessionContext::init(Arc::new(provider)).await;

        let err = context.login("a@b.c", "wrong").await.unwrap_err();
        assert_eq!(err.to_string(), "Incorrect username or password.");
        assert!(context.state().role.is_none());
    }

    #[tokio::test]
    async fn test_logout_clears_state_when_remote_fails() {
        let provider = FakeProvider {
            sign_out_fails: true,
            ..FakeProvider::signed_in(json!({ "sub": "u1", "cognito:groups": ["CPA"] }), None)
        };
        let context = SessionContext::init(Arc::new(provider)).await;
        assert_eq!(context.state().role, Some(Role::Cpa));

        assert!(context.logout().await.is_err());

        let state = context.state();
        assert!(state.user.is_none());
        assert!(state.role.is_none());
        assert!(!state.loading);
    }
}
