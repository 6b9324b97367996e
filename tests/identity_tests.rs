use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, Set};
use std::time::Duration;

use bouncer::config::Config;
use bouncer::db::SecurityEventRecord;
use bouncer::domain::SecurityEvent;
use bouncer::models::account::{NewAccount, ProfileChanges};
use bouncer::security::TokenError;
use bouncer::services::{AccountDirectory, IdentityError};
use bouncer::state::SharedState;

fn test_config() -> Config {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    // One pooled connection, otherwise every connection would get its own
    // empty in-memory database.
    config.general.max_db_connections = 1;
    config.general.min_db_connections = 1;
    config.token.secret = "0123456789abcdef".repeat(4);
    // Light hashing parameters keep the suite quick.
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config
}

async fn test_state() -> SharedState {
    SharedState::new(test_config())
        .await
        .expect("Failed to initialize state")
}

fn new_account(email: &str) -> NewAccount {
    NewAccount {
        email: email.to_string(),
        password: "correct horse battery".to_string(),
        username: None,
        full_name: None,
    }
}

async fn disable_account(state: &SharedState, email: &str) {
    let model = bouncer::entities::prelude::Accounts::find()
        .filter(bouncer::entities::accounts::Column::Email.eq(email))
        .one(&state.store.conn)
        .await
        .unwrap()
        .unwrap();

    let mut active = model.into_active_model();
    active.is_active = Set(false);
    active.update(&state.store.conn).await.unwrap();
}

async fn wait_for_events(state: &SharedState, minimum: usize) -> Vec<SecurityEventRecord> {
    for _ in 0..40 {
        let (events, _) = state
            .store
            .get_security_events(1, 50, None, None)
            .await
            .unwrap();
        if events.len() >= minimum {
            return events;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("security events were not persisted in time");
}

#[tokio::test]
async fn concurrent_registrations_settle_to_one_winner() {
    let state = test_state().await;
    let service = state.identity_service.clone();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service.register(new_account("raced@example.com")).await
        }));
    }

    let mut winners = 0;
    let mut duplicates = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => winners += 1,
            Err(IdentityError::DuplicateIdentity(_)) => duplicates += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(winners, 1);
    assert_eq!(duplicates, 9);
    assert_eq!(state.store.count_accounts().await.unwrap(), 1);
}

#[tokio::test]
async fn unknown_email_and_wrong_password_fail_identically() {
    let state = test_state().await;
    let service = &state.identity_service;

    service
        .register(new_account("kaz@example.com"))
        .await
        .unwrap();

    let wrong = service
        .authenticate("kaz@example.com", "battery staple")
        .await
        .unwrap_err();
    let absent = service
        .authenticate("nobody@example.com", "battery staple")
        .await
        .unwrap_err();

    assert!(matches!(wrong, IdentityError::InvalidCredentials));
    assert!(matches!(absent, IdentityError::InvalidCredentials));
    assert_eq!(wrong.to_string(), absent.to_string());
}

#[tokio::test]
async fn disabled_account_is_distinct_internally() {
    let state = test_state().await;
    let service = &state.identity_service;

    service
        .register(new_account("kaz@example.com"))
        .await
        .unwrap();
    disable_account(&state, "kaz@example.com").await;

    // The right password reveals the disabled state to callers inside the
    // trust boundary.
    let err = service
        .authenticate("kaz@example.com", "correct horse battery")
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::AccountDisabled));

    // The wrong password never gets that far.
    let err = service
        .authenticate("kaz@example.com", "battery staple")
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::InvalidCredentials));
}

#[tokio::test]
async fn failed_password_change_leaves_stored_hash_untouched() {
    let state = test_state().await;
    let service = &state.identity_service;

    let account = service
        .register(new_account("kaz@example.com"))
        .await
        .unwrap();
    let before = account.credential_hash.clone();

    let err = service
        .change_password(
            &account.external_id.to_string(),
            "wrong wrong wrong",
            "an entirely new password",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::InvalidCredentials));

    let after = state
        .store
        .account_repo()
        .find_by_email("kaz@example.com")
        .await
        .unwrap()
        .unwrap()
        .credential_hash;
    assert_eq!(before, after);
}

#[tokio::test]
async fn session_lifecycle() {
    let state = test_state().await;
    let service = &state.identity_service;

    service
        .register(new_account("kaz@example.com"))
        .await
        .unwrap();

    let account = service
        .authenticate("kaz@example.com", "correct horse battery")
        .await
        .unwrap();
    assert!(account.last_login_at.is_some());

    let session = service.issue_session(&account).await.unwrap();
    let verified = service.verify_session(&session.access_token).await.unwrap();
    assert_eq!(verified.email, "kaz@example.com");

    service
        .delete_account(&account.external_id.to_string())
        .await
        .unwrap();

    // The signature still checks out, but the subject is gone.
    let err = service
        .verify_session(&session.access_token)
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::InvalidCredentials));

    let err = service
        .delete_account(&account.external_id.to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::NotFound));
}

#[tokio::test]
async fn verify_session_rejects_garbage() {
    let state = test_state().await;

    let err = state
        .identity_service
        .verify_session("not a token")
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::Token(TokenError::Malformed)));
}

#[tokio::test]
async fn registration_normalizes_email_and_updates_are_idempotent() {
    let state = test_state().await;
    let service = &state.identity_service;

    let account = service
        .register(new_account("  Kaz@Example.COM "))
        .await
        .unwrap();
    assert_eq!(account.email, "kaz@example.com");

    // The account's own address in different case is not a change at all.
    let unchanged = service
        .update_profile(
            &account.external_id.to_string(),
            ProfileChanges {
                email: Some("KAZ@EXAMPLE.COM".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(unchanged.email, "kaz@example.com");
    assert_eq!(unchanged.updated_at, account.updated_at);

    let unchanged = service
        .update_profile(&account.external_id.to_string(), ProfileChanges::default())
        .await
        .unwrap();
    assert_eq!(unchanged.updated_at, account.updated_at);

    let updated = service
        .update_profile(
            &account.external_id.to_string(),
            ProfileChanges {
                username: Some("kaz_01".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.username.as_deref(), Some("kaz_01"));
    assert!(updated.updated_at > account.updated_at);
}

#[tokio::test]
async fn security_events_are_persisted() {
    let state = test_state().await;
    let service = &state.identity_service;

    service
        .register(new_account("kaz@example.com"))
        .await
        .unwrap();

    let _ = service.register(new_account("kaz@example.com")).await;
    let _ = service
        .authenticate("kaz@example.com", "battery staple")
        .await;

    disable_account(&state, "kaz@example.com").await;
    let _ = service
        .authenticate("kaz@example.com", "correct horse battery")
        .await;

    let events = wait_for_events(&state, 3).await;
    let kinds: Vec<&str> = events.iter().map(|e| e.kind.as_str()).collect();
    assert!(kinds.contains(&"DuplicateRegistration"));
    assert!(kinds.contains(&"FailedLogin"));
    assert!(kinds.contains(&"DisabledAccountLogin"));

    let failed_login = events
        .iter()
        .find(|e| e.kind == "FailedLogin")
        .unwrap();
    assert_eq!(failed_login.severity, "warn");

    let details: serde_json::Value =
        serde_json::from_str(failed_login.details.as_deref().unwrap()).unwrap();
    assert_eq!(details["payload"]["email"], "kaz@example.com");
}

#[tokio::test]
async fn events_are_observable_on_the_bus() {
    let (bus, mut rx) = tokio::sync::broadcast::channel(16);
    let state = SharedState::with_event_bus(test_config(), bus)
        .await
        .unwrap();

    state
        .identity_service
        .register(new_account("kaz@example.com"))
        .await
        .unwrap();
    let _ = state
        .identity_service
        .register(new_account("kaz@example.com"))
        .await;

    let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("no event within the timeout")
        .unwrap();

    match event {
        SecurityEvent::DuplicateRegistration { field, email } => {
            assert_eq!(field, "email");
            assert_eq!(email, "kaz@example.com");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}
