/// Admin recovery tokens
///
/// A recovery token is a single-use credential an existing admin issues
/// so a locked-out operator can regain the admin role. Validation is a
/// fail-fast chain: lookup, status, email binding, expiry, then (for
/// strict-mode tokens) a TOTP code check. Success consumes the token
/// and grants the role.

pub mod tokens;
pub mod totp;

pub use tokens::{RecoveryToken, RecoveryTokenManager};

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a recovery token.
///
/// `Pending` is the only state a validation can succeed from; the rest
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStatus {
    Pending,
    Used,
    Expired,
    Revoked,
}

impl TokenStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenStatus::Pending => "pending",
            TokenStatus::Used => "used",
            TokenStatus::Expired => "expired",
            TokenStatus::Revoked => "revoked",
        }
    }

    pub fn from_str(s: &str) -> AppResult<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(TokenStatus::Pending),
            "used" => Ok(TokenStatus::Used),
            "expired" => Ok(TokenStatus::Expired),
            "revoked" => Ok(TokenStatus::Revoked),
            _ => Err(AppError::Internal(format!("Invalid token status: {}", s))),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TokenStatus::Pending)
    }
}

/// Why a validation attempt was denied.
///
/// Every variant maps to a fixed user-displayable message; none of
/// these are surfaced as HTTP errors or stack traces. Only `Expired`
/// has a persistent side effect (the lazy status transition).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryDenial {
    NotFound,
    AlreadyConsumed(TokenStatus),
    EmailMismatch,
    Expired,
    CodeRequired,
    InvalidCode,
}

impl RecoveryDenial {
    /// Message shown to the operator attempting recovery
    pub fn user_message(&self) -> String {
        match self {
            RecoveryDenial::NotFound => "Invalid recovery token.".to_string(),
            RecoveryDenial::AlreadyConsumed(status) => {
                format!("This recovery token has already been {}.", status.as_str())
            }
            RecoveryDenial::EmailMismatch => {
                "This recovery token was issued for a different email address.".to_string()
            }
            RecoveryDenial::Expired => "This recovery token has expired.".to_string(),
            RecoveryDenial::CodeRequired => {
                "A verification code is required for this token.".to_string()
            }
            RecoveryDenial::InvalidCode => "Incorrect verification code.".to_string(),
        }
    }
}
