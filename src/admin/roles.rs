/// Admin role management
use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

/// Admin role levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Can view only, no actions
    Moderator,
    /// Can perform most admin actions
    Admin,
    /// Full access, can grant/revoke roles
    SuperAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Moderator => "moderator",
            Role::Admin => "admin",
            Role::SuperAdmin => "superadmin",
        }
    }

    pub fn from_str(s: &str) -> AppResult<Self> {
        match s.to_lowercase().as_str() {
            "moderator" => Ok(Role::Moderator),
            "admin" => Ok(Role::Admin),
            "superadmin" => Ok(Role::SuperAdmin),
            _ => Err(AppError::Validation(format!("Invalid role: {}", s))),
        }
    }

    /// Check if this role can perform actions requiring another role
    pub fn can_act_as(&self, required: Role) -> bool {
        self >= &required
    }
}

/// Admin role record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminRole {
    pub id: i64,
    pub account_id: String,
    pub role: Role,
    pub granted_by: Option<String>,
    pub granted_at: DateTime<Utc>,
    pub revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_by: Option<String>,
    pub notes: Option<String>,
}

/// Admin role manager
#[derive(Clone)]
pub struct AdminRoleManager {
    db: SqlitePool,
}

impl AdminRoleManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Grant a role to an account
    pub async fn grant_role(
        &self,
        account_id: &str,
        role: Role,
        granted_by: &str,
        notes: Option<String>,
    ) -> AppResult<AdminRole> {
        let now = Utc::now();

        // Check if role already exists and is active
        if let Some(existing) = self.get_role(account_id).await? {
            if !existing.revoked {
                return Err(AppError::Conflict(format!(
                    "Account already has active role: {}",
                    existing.role.as_str()
                )));
            }
        }

        let result = sqlx::query(
            r#"
            INSERT INTO admin_roles (account_id, role, granted_by, granted_at, notes)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(account_id)
        .bind(role.as_str())
        .bind(granted_by)
        .bind(now.to_rfc3339())
        .bind(&notes)
        .execute(&self.db)
        .await?;

        let id = result.last_insert_rowid();

        Ok(AdminRole {
            id,
            account_id: account_id.to_string(),
            role,
            granted_by: Some(granted_by.to_string()),
            granted_at: now,
            revoked: false,
            revoked_at: None,
            revoked_by: None,
            notes,
        })
    }

    /// Grant a role unless the account already holds it (or better).
    /// An active lower role is upgraded in place. Used by the recovery
    /// flow, where the token is already consumed by the time the grant
    /// runs, so neither re-granting nor upgrading may fail.
    pub async fn ensure_role(
        &self,
        account_id: &str,
        role: Role,
        granted_by: &str,
        notes: Option<String>,
    ) -> AppResult<()> {
        if let Some(existing) = self.get_role(account_id).await? {
            if !existing.revoked {
                if existing.role.can_act_as(role) {
                    return Ok(());
                }
                // Upgrade: retire the lower grant so the insert below
                // doesn't conflict with it
                self.revoke_role(
                    account_id,
                    granted_by,
                    Some(format!("upgraded to {}", role.as_str())),
                )
                .await?;
            }
        }
        self.grant_role(account_id, role, granted_by, notes).await?;
        Ok(())
    }

    /// Revoke an account's active role
    pub async fn revoke_role(
        &self,
        account_id: &str,
        revoked_by: &str,
        reason: Option<String>,
    ) -> AppResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE admin_roles
            SET revoked = 1,
                revoked_at = ?,
                revoked_by = ?,
                notes = COALESCE(?, notes)
            WHERE account_id = ? AND revoked = 0
            "#,
        )
        .bind(now.to_rfc3339())
        .bind(revoked_by)
        .bind(&reason)
        .bind(account_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "No active role found for {}",
                account_id
            )));
        }

        Ok(())
    }

    /// Get the active role for an account
    pub async fn get_role(&self, account_id: &str) -> AppResult<Option<AdminRole>> {
        let row = sqlx::query(
            r#"
            SELECT id, account_id, role, granted_by, granted_at, revoked,
                   revoked_at, revoked_by, notes
            FROM admin_roles
            WHERE account_id = ? AND revoked = 0
            ORDER BY granted_at DESC
            LIMIT 1
            "#,
        )
        .bind(account_id)
        .fetch_optional(&self.db)
        .await?;

        row.map(map_role_row).transpose()
    }

    /// Check if an account has at least a specific role
    pub async fn has_role(&self, account_id: &str, required_role: Role) -> AppResult<bool> {
        if let Some(admin_role) = self.get_role(account_id).await? {
            Ok(admin_role.role.can_act_as(required_role))
        } else {
            Ok(false)
        }
    }

    /// Log an admin action to the audit trail
    pub async fn log_action(
        &self,
        actor: &str,
        action: &str,
        subject: Option<&str>,
        details: Option<&str>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO admin_audit_log (actor, action, subject, details, timestamp)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(actor)
        .bind(action)
        .bind(subject)
        .bind(details)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.db)
        .await?;

        Ok(())
    }
}

fn map_role_row(row: sqlx::sqlite::SqliteRow) -> AppResult<AdminRole> {
    let role_str: String = row.get("role");
    let role = Role::from_str(&role_str)?;

    let granted_at_str: String = row.get("granted_at");
    let granted_at = DateTime::parse_from_rfc3339(&granted_at_str)
        .map_err(|e| AppError::Internal(format!("Invalid timestamp: {}", e)))?
        .with_timezone(&Utc);

    let revoked_at = row
        .try_get::<String, _>("revoked_at")
        .ok()
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    Ok(AdminRole {
        id: row.get("id"),
        account_id: row.get("account_id"),
        role,
        granted_by: row.get("granted_by"),
        granted_at,
        revoked: row.get("revoked"),
        revoked_at,
        revoked_by: row.get("revoked_by"),
        notes: row.get("notes"),
    })
}
