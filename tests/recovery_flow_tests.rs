/// End-to-end flows over a file-backed database: token issue, recovery
/// validation, role grant, and event-schedule resolution.
use chrono::{Duration, Utc};
use scanbase_admin::admin::{AdminRoleManager, Role};
use scanbase_admin::db;
use scanbase_admin::events::schedule::ScheduleDocument;
use scanbase_admin::events::{resolve_active_event, EventConfig, ScheduleStore};
use scanbase_admin::recovery::totp::code_at;
use scanbase_admin::recovery::{RecoveryDenial, RecoveryTokenManager, TokenStatus};
use sqlx::SqlitePool;
use tempfile::TempDir;

async fn setup() -> (TempDir, SqlitePool) {
    let dir = TempDir::new().unwrap();
    let pool = db::create_pool(&dir.path().join("test.sqlite"), db::DatabaseOptions::default())
        .await
        .unwrap();
    db::run_migrations(&pool).await.unwrap();
    (dir, pool)
}

#[tokio::test]
async fn strict_recovery_grants_admin_exactly_once() {
    let (_dir, pool) = setup().await;
    let tokens = RecoveryTokenManager::new(pool.clone());
    let roles = AdminRoleManager::new(pool.clone());

    let token = tokens
        .create_token("ops@scanbase.app", Duration::hours(1), true, "root-admin", None)
        .await
        .unwrap();
    let secret = token.secret.clone().unwrap();

    let now = Utc::now();
    let code = code_at(&secret, now).unwrap();

    // Claimed email differs only in case
    let outcome = tokens
        .validate(&token.id, &code, "OPS@SCANBASE.APP", "acct-ops", now)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(outcome.status, TokenStatus::Used);
    assert_eq!(outcome.used_by.as_deref(), Some("OPS@SCANBASE.APP"));

    roles
        .ensure_role("acct-ops", Role::Admin, &format!("recovery:{}", token.id), None)
        .await
        .unwrap();
    assert!(roles.has_role("acct-ops", Role::Admin).await.unwrap());

    // Replay with the same valid code is refused
    let replay = tokens
        .validate(&token.id, &code, "ops@scanbase.app", "acct-ops", now)
        .await
        .unwrap();
    assert_eq!(replay, Err(RecoveryDenial::AlreadyConsumed(TokenStatus::Used)));
}

#[tokio::test]
async fn recovery_upgrades_an_existing_moderator_grant() {
    let (_dir, pool) = setup().await;
    let tokens = RecoveryTokenManager::new(pool.clone());
    let roles = AdminRoleManager::new(pool.clone());

    // The recovering account already holds a lower role
    roles
        .grant_role("acct-ops", Role::Moderator, "root-admin", None)
        .await
        .unwrap();

    let token = tokens
        .create_token("ops@scanbase.app", Duration::hours(1), false, "root-admin", None)
        .await
        .unwrap();

    let now = Utc::now();
    let outcome = tokens
        .validate(&token.id, "", "ops@scanbase.app", "acct-ops", now)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(outcome.status, TokenStatus::Used);

    // The grant must not strand the consumed token behind a conflict
    roles
        .ensure_role("acct-ops", Role::Admin, &format!("recovery:{}", token.id), None)
        .await
        .unwrap();
    assert!(roles.has_role("acct-ops", Role::Admin).await.unwrap());
}

#[tokio::test]
async fn expired_token_is_marked_expired_on_read() {
    let (_dir, pool) = setup().await;
    let tokens = RecoveryTokenManager::new(pool);

    let token = tokens
        .create_token("ops@scanbase.app", Duration::minutes(5), false, "root-admin", None)
        .await
        .unwrap();

    let late = Utc::now() + Duration::minutes(10);
    let outcome = tokens
        .validate(&token.id, "", "ops@scanbase.app", "acct-ops", late)
        .await
        .unwrap();
    assert_eq!(outcome, Err(RecoveryDenial::Expired));

    let stored = tokens.get_token(&token.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TokenStatus::Expired);
}

#[tokio::test]
async fn revoked_token_reports_its_terminal_status() {
    let (_dir, pool) = setup().await;
    let tokens = RecoveryTokenManager::new(pool);

    let token = tokens
        .create_token("ops@scanbase.app", Duration::hours(1), false, "root-admin", None)
        .await
        .unwrap();
    tokens.revoke_token(&token.id, "root-admin").await.unwrap();

    let outcome = tokens
        .validate(&token.id, "", "ops@scanbase.app", "acct-ops", Utc::now())
        .await
        .unwrap();
    assert_eq!(
        outcome,
        Err(RecoveryDenial::AlreadyConsumed(TokenStatus::Revoked))
    );
    let message = outcome.unwrap_err().user_message();
    assert!(message.contains("revoked"));
}

#[tokio::test]
async fn schedule_roundtrip_resolves_active_event() {
    let (_dir, pool) = setup().await;
    let store = ScheduleStore::new(pool);

    let now = Utc::now();
    let open = EventConfig {
        is_active_global: true,
        celebration_music_start: Some((now - Duration::days(1)).to_rfc3339()),
        celebration_music_end: Some((now + Duration::days(1)).to_rfc3339()),
        title: Some("Live promo".to_string()),
        message: None,
        theme: Some("confetti".to_string()),
        extra: serde_json::Map::new(),
    };
    let closed = EventConfig {
        is_active_global: true,
        celebration_music_start: Some((now - Duration::days(30)).to_rfc3339()),
        celebration_music_end: Some((now - Duration::days(20)).to_rfc3339()),
        title: Some("Old promo".to_string()),
        message: None,
        theme: None,
        extra: serde_json::Map::new(),
    };

    store
        .save(&ScheduleDocument {
            event_schedule: vec![closed, open],
            event_manager: None,
        })
        .await
        .unwrap();

    let document = store.load().await.unwrap();
    let candidates = document.candidates();
    let active = resolve_active_event(&candidates, now).unwrap();
    assert_eq!(active.title.as_deref(), Some("Live promo"));
    assert_eq!(active.theme.as_deref(), Some("confetti"));
}

#[tokio::test]
async fn empty_schedule_resolves_to_none() {
    let (_dir, pool) = setup().await;
    let store = ScheduleStore::new(pool);

    let document = store.load().await.unwrap();
    let candidates = document.candidates();
    assert!(resolve_active_event(&candidates, Utc::now()).is_none());
}
