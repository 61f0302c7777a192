//! Client side of the invoice app: session and role resolution, the
//! upload client and the invoice list used by the dashboards.

pub mod identity;
pub mod invoices;
pub mod session;
pub mod upload;

pub use identity::{CognitoIdentityProvider, IdentityProvider, SessionTokens, SignInStep};
pub use invoices::{InvoiceClient, InvoiceSummary};
pub use session::{SessionContext, SessionState, SessionUser};
pub use upload::UploadClient;

use thiserror::Error;

use crate::modules::identity::IdentityError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Failed to read {path}: {reason}")]
    File { path: String, reason: String },

    #[error("Request failed: {0}")]
    Transport(String),

    /// Error returned by the API, with its message
    #[error("{message} (HTTP {status})")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Transport(e.to_string())
    }
}
