/// Recovery token storage and validation
use crate::error::{AppError, AppResult};
use crate::recovery::{totp, RecoveryDenial, TokenStatus};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

/// Characters used in token IDs (uppercase alphanumeric, 8 chars)
const TOKEN_ID_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const TOKEN_ID_LEN: usize = 8;

/// A recovery token row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryToken {
    pub id: String,
    pub email: String,
    /// Base32 TOTP secret; None for legacy/emergency tokens.
    /// Never serialized back out; it is shown once at creation time.
    #[serde(skip_serializing, default)]
    pub secret: Option<String>,
    pub status: TokenStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used_by: Option<String>,
    pub used_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

impl RecoveryToken {
    /// Strict-mode tokens require a TOTP code
    pub fn is_strict(&self) -> bool {
        self.secret.is_some()
    }
}

/// Recovery token manager
#[derive(Clone)]
pub struct RecoveryTokenManager {
    db: SqlitePool,
}

impl RecoveryTokenManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Generate a new token ID
    pub fn generate_token_id() -> String {
        let mut rng = rand::thread_rng();
        (0..TOKEN_ID_LEN)
            .map(|_| TOKEN_ID_CHARSET[rng.gen_range(0..TOKEN_ID_CHARSET.len())] as char)
            .collect()
    }

    /// Issue a new recovery token.
    ///
    /// Strict tokens get a fresh TOTP secret; the returned token is the
    /// only place the secret is ever handed out.
    pub async fn create_token(
        &self,
        email: &str,
        ttl: Duration,
        strict: bool,
        created_by: &str,
        note: Option<String>,
    ) -> AppResult<RecoveryToken> {
        let id = Self::generate_token_id();
        let secret = strict.then(totp::generate_secret);
        let now = Utc::now();
        let expires_at = now + ttl;

        sqlx::query(
            r#"
            INSERT INTO admin_setup_tokens
                (id, email, secret, status, created_by, created_at, expires_at, note)
            VALUES (?, ?, ?, 'pending', ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(email)
        .bind(&secret)
        .bind(created_by)
        .bind(now.to_rfc3339())
        .bind(expires_at.to_rfc3339())
        .bind(&note)
        .execute(&self.db)
        .await?;

        tracing::info!(token_id = %id, strict, "recovery_token_issued");

        Ok(RecoveryToken {
            id,
            email: email.to_string(),
            secret,
            status: TokenStatus::Pending,
            created_by: created_by.to_string(),
            created_at: now,
            expires_at,
            used_by: None,
            used_at: None,
            note,
        })
    }

    /// Fetch a token by ID
    pub async fn get_token(&self, token_id: &str) -> AppResult<Option<RecoveryToken>> {
        let row = sqlx::query(
            r#"
            SELECT id, email, secret, status, created_by, created_at, expires_at,
                   used_by, used_at, note
            FROM admin_setup_tokens
            WHERE id = ?
            "#,
        )
        .bind(token_id)
        .fetch_optional(&self.db)
        .await?;

        row.map(map_token_row).transpose()
    }

    /// List all tokens, newest first
    pub async fn list_tokens(&self) -> AppResult<Vec<RecoveryToken>> {
        let rows = sqlx::query(
            r#"
            SELECT id, email, secret, status, created_by, created_at, expires_at,
                   used_by, used_at, note
            FROM admin_setup_tokens
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(map_token_row).collect()
    }

    /// Revoke a pending token
    pub async fn revoke_token(&self, token_id: &str, revoked_by: &str) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE admin_setup_tokens
            SET status = 'revoked'
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(token_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "No pending token found for {}",
                token_id
            )));
        }

        tracing::info!(token_id = %token_id, revoked_by = %revoked_by, "recovery_token_revoked");
        Ok(())
    }

    /// Validate a recovery attempt.
    ///
    /// Checks run in order: lookup, status, email binding, expiry, code.
    /// The first failing check wins. Expiry is discovered lazily here
    /// and written back; every other denial is read-only. On success the
    /// token is consumed with a conditional update so a concurrent
    /// attempt on the same token cannot consume it twice.
    ///
    /// Infrastructure failures surface as the outer error; denials are
    /// the inner `Err` and carry a user-displayable message.
    pub async fn validate(
        &self,
        token_id: &str,
        presented_code: &str,
        claimed_email: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Result<RecoveryToken, RecoveryDenial>> {
        let token_id = token_id.trim().to_uppercase();

        let token = match self.get_token(&token_id).await? {
            Some(token) => token,
            None => return Ok(Err(RecoveryDenial::NotFound)),
        };

        if token.status.is_terminal() {
            return Ok(Err(RecoveryDenial::AlreadyConsumed(token.status)));
        }

        if !token.email.is_empty() && !token.email.eq_ignore_ascii_case(claimed_email.trim()) {
            return Ok(Err(RecoveryDenial::EmailMismatch));
        }

        if now > token.expires_at {
            // Lazy expiry: persist the transition even though the
            // attempt fails. Guarded on 'pending' so a concurrent
            // success is never overwritten.
            sqlx::query(
                r#"
                UPDATE admin_setup_tokens
                SET status = 'expired'
                WHERE id = ? AND status = 'pending'
                "#,
            )
            .bind(&token_id)
            .execute(&self.db)
            .await?;

            tracing::info!(token_id = %token_id, "recovery_token_expired_lazily");
            return Ok(Err(RecoveryDenial::Expired));
        }

        match &token.secret {
            Some(secret) => {
                if presented_code.trim().is_empty() {
                    return Ok(Err(RecoveryDenial::CodeRequired));
                }
                if !totp::verify(secret, presented_code, now, 1) {
                    tracing::warn!(token_id = %token_id, "recovery_code_rejected");
                    return Ok(Err(RecoveryDenial::InvalidCode));
                }
            }
            None => {
                // Legacy/emergency tokens skip code verification. Kept
                // for already-issued tokens only.
                tracing::warn!(
                    token_id = %token_id,
                    "legacy_recovery_token_validated_without_code"
                );
            }
        }

        // Consume the token. The status guard closes the window where
        // two concurrent attempts both saw 'pending' above.
        let result = sqlx::query(
            r#"
            UPDATE admin_setup_tokens
            SET status = 'used', used_by = ?, used_at = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(claimed_email.trim())
        .bind(now.to_rfc3339())
        .bind(&token_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            let status = self
                .get_token(&token_id)
                .await?
                .map(|t| t.status)
                .unwrap_or(TokenStatus::Revoked);
            return Ok(Err(RecoveryDenial::AlreadyConsumed(status)));
        }

        tracing::info!(token_id = %token_id, user_id = %user_id, "recovery_token_consumed");

        let consumed = self.get_token(&token_id).await?.ok_or_else(|| {
            AppError::Internal(format!("Token {} vanished after consumption", token_id))
        })?;

        Ok(Ok(consumed))
    }
}

/// Map a token row, parsing stored RFC 3339 timestamps
fn map_token_row(row: sqlx::sqlite::SqliteRow) -> AppResult<RecoveryToken> {
    let status_str: String = row.get("status");
    let status = TokenStatus::from_str(&status_str)?;

    let created_at = parse_required_timestamp(&row, "created_at")?;
    let expires_at = parse_required_timestamp(&row, "expires_at")?;

    let used_at = row
        .try_get::<String, _>("used_at")
        .ok()
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    Ok(RecoveryToken {
        id: row.get("id"),
        email: row.get("email"),
        secret: row.get("secret"),
        status,
        created_by: row.get("created_by"),
        created_at,
        expires_at,
        used_by: row.get("used_by"),
        used_at,
        note: row.get("note"),
    })
}

fn parse_required_timestamp(
    row: &sqlx::sqlite::SqliteRow,
    column: &str,
) -> AppResult<DateTime<Utc>> {
    let raw: String = row.get(column);
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::Internal(format!("Invalid timestamp in {}: {}", column, e)))
}
