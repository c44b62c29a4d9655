/// Recovery token endpoints
///
/// The validate action is the operator-facing surface: it always
/// answers 200 with `{ success, message }` so the client can display
/// the message directly. Token administration (issue/revoke/list) sits
/// behind the configured admin API key.
use crate::{
    admin::Role,
    context::AppContext,
    error::{AppError, AppResult},
    recovery::RecoveryToken,
};
use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

/// Build recovery routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/v1/admin/recovery/validate", post(validate_token))
        .route(
            "/api/v1/admin/recovery/tokens",
            post(create_token).get(list_tokens),
        )
        .route("/api/v1/admin/recovery/tokens/revoke", post(revoke_token))
}

// ============================================================================
// Operator-facing validation action
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub token: String,
    // Aliases keep the legacy client payload shape working
    #[serde(default, alias = "totpCode")]
    pub totp_code: String,
    #[serde(alias = "userEmail")]
    pub user_email: String,
    #[serde(alias = "userId")]
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub success: bool,
    pub message: String,
}

/// Validate a recovery token and, on success, grant the admin role
async fn validate_token(
    State(ctx): State<AppContext>,
    Json(req): Json<ValidateRequest>,
) -> Json<ValidateResponse> {
    match run_validation(&ctx, &req).await {
        Ok(response) => Json(response),
        Err(e) => {
            // Infrastructure failure: log server-side, never surface
            // details or a raw error to the operator.
            tracing::error!(error = %e, "recovery_validation_failed");
            Json(ValidateResponse {
                success: false,
                message: "Recovery could not be completed. Please try again or contact support."
                    .to_string(),
            })
        }
    }
}

async fn run_validation(ctx: &AppContext, req: &ValidateRequest) -> AppResult<ValidateResponse> {
    let outcome = ctx
        .token_manager
        .validate(
            &req.token,
            &req.totp_code,
            &req.user_email,
            &req.user_id,
            Utc::now(),
        )
        .await?;

    match outcome {
        Ok(token) => {
            ctx.role_manager
                .ensure_role(
                    &req.user_id,
                    Role::Admin,
                    &format!("recovery:{}", token.id),
                    Some(format!("granted via recovery token for {}", req.user_email)),
                )
                .await?;

            ctx.role_manager
                .log_action(
                    &req.user_id,
                    "recovery.token_used",
                    Some(&token.id),
                    Some(&req.user_email),
                )
                .await?;

            Ok(ValidateResponse {
                success: true,
                message: "Administrator access granted.".to_string(),
            })
        }
        Err(denial) => Ok(ValidateResponse {
            success: false,
            message: denial.user_message(),
        }),
    }
}

// ============================================================================
// Token administration (admin API key required)
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateTokenRequest {
    pub email: String,
    pub created_by: String,
    pub ttl_secs: Option<i64>,
    /// Strict tokens carry a TOTP secret; defaults to true
    pub strict: Option<bool>,
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateTokenResponse {
    pub token: RecoveryToken,
    /// Shown exactly once; not retrievable afterwards
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

/// Issue a new recovery token
async fn create_token(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Json(req): Json<CreateTokenRequest>,
) -> AppResult<Json<CreateTokenResponse>> {
    require_admin_key(&ctx, &headers)?;

    if req.email.trim().is_empty() {
        return Err(AppError::Validation("Email is required".to_string()));
    }

    let ttl = Duration::seconds(
        req.ttl_secs
            .unwrap_or(ctx.config.recovery.token_ttl_secs)
            .max(1),
    );
    let strict = req.strict.unwrap_or(true);

    let token = ctx
        .token_manager
        .create_token(req.email.trim(), ttl, strict, &req.created_by, req.note.clone())
        .await?;

    ctx.role_manager
        .log_action(
            &req.created_by,
            "recovery.token_created",
            Some(&token.id),
            Some(req.email.trim()),
        )
        .await?;

    let secret = token.secret.clone();
    Ok(Json(CreateTokenResponse { token, secret }))
}

#[derive(Debug, Deserialize)]
pub struct RevokeTokenRequest {
    pub token: String,
    pub revoked_by: String,
}

/// Revoke a pending recovery token
async fn revoke_token(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Json(req): Json<RevokeTokenRequest>,
) -> AppResult<Json<serde_json::Value>> {
    require_admin_key(&ctx, &headers)?;

    let token_id = req.token.trim().to_uppercase();
    ctx.token_manager
        .revoke_token(&token_id, &req.revoked_by)
        .await?;

    ctx.role_manager
        .log_action(&req.revoked_by, "recovery.token_revoked", Some(&token_id), None)
        .await?;

    Ok(Json(serde_json::json!({ "revoked": token_id })))
}

#[derive(Debug, Serialize)]
pub struct ListTokensResponse {
    pub tokens: Vec<RecoveryToken>,
}

/// List all recovery tokens (secrets are never included)
async fn list_tokens(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> AppResult<Json<ListTokensResponse>> {
    require_admin_key(&ctx, &headers)?;

    let tokens = ctx.token_manager.list_tokens().await?;
    Ok(Json(ListTokensResponse { tokens }))
}

/// Check the bearer key on token-administration requests
fn require_admin_key(ctx: &AppContext, headers: &HeaderMap) -> AppResult<()> {
    let expected = match &ctx.config.recovery.admin_api_key {
        Some(key) => key,
        None => {
            tracing::error!("admin API request received but SCANBASE_ADMIN_API_KEY is not set");
            return Err(AppError::Config("Admin API key not configured".to_string()));
        }
    };

    let presented = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Authentication("Missing bearer key".to_string()))?;

    if presented != expected {
        return Err(AppError::Authorization("Invalid admin API key".to_string()));
    }

    Ok(())
}
