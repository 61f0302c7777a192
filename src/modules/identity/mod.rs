//! Identity provider module
//!
//! Thin client for the Cognito user-pool API used by the session resolver.

mod cognito_client;

pub use cognito_client::{AuthTokens, CognitoClient, CognitoUser, IdentityError, SignInOutcome};
