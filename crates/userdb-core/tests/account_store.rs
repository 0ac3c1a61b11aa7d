use serde_json::json;
use userdb_core::{AccountStore, HashingConfig, StoreConfig, UserDbError, UserRange};

fn test_store() -> AccountStore {
    AccountStore::in_memory(StoreConfig::default().with_hashing(HashingConfig::minimal()))
        .expect("in-memory store should build")
}

#[tokio::test]
async fn test_find_missing_user_is_not_found() {
    let store = test_store();
    let result = store.find_user("nobody@example.com").await;
    assert!(matches!(result, Err(UserDbError::NotFound(_))));
}

#[tokio::test]
async fn test_add_then_find() {
    let store = test_store();
    store
        .add_user("test@example.com", "test123", json!({ "some": "data" }))
        .await
        .expect("add should succeed");

    let user = store
        .find_user("test@example.com")
        .await
        .expect("find should succeed");
    assert_eq!(user.email, "test@example.com");
    assert_eq!(user.data, json!({ "some": "data" }));
    assert_ne!(user.password, "test123");
    assert_eq!(
        user.created_date.timestamp_millis(),
        user.created_timestamp.unixtime
    );
    assert_eq!(
        user.modified_date.timestamp_millis(),
        user.modified_timestamp.unixtime
    );
    assert_eq!(user.created_timestamp, user.modified_timestamp);
}

#[tokio::test]
async fn test_add_existing_email_overwrites() {
    let store = test_store();
    store
        .add_user("dup@example.com", "first", json!({ "n": 1 }))
        .await
        .unwrap();
    store
        .add_user("dup@example.com", "second", json!({ "n": 2 }))
        .await
        .unwrap();

    let user = store.find_user("dup@example.com").await.unwrap();
    assert_eq!(user.data, json!({ "n": 2 }));
    assert!(store.check_password("dup@example.com", "second").await.is_ok());
    assert_eq!(store.stream_users(UserRange::all()).count(), 1);
}

#[tokio::test]
async fn test_check_password() {
    let store = test_store();
    store
        .add_user("test@example.com", "supersecret", json!({}))
        .await
        .unwrap();

    let user = store
        .check_password("test@example.com", "supersecret")
        .await
        .expect("correct password should pass");
    assert_eq!(user.email, "test@example.com");

    let result = store.check_password("test@example.com", "BADPASSWORD").await;
    assert!(matches!(result, Err(UserDbError::PasswordMismatch)));
    assert!(result.unwrap_err().to_string().contains("Password mismatch"));
}

#[tokio::test]
async fn test_check_password_missing_user_is_not_found() {
    let store = test_store();
    let result = store.check_password("ghost@example.com", "whatever").await;
    assert!(matches!(result, Err(UserDbError::NotFound(_))));

    // The decoy hash is cached; a second miss behaves the same.
    let result = store.check_password("ghost@example.com", "whatever").await;
    assert!(matches!(result, Err(UserDbError::NotFound(_))));
}

#[tokio::test]
async fn test_change_email() {
    let store = test_store();
    store
        .add_user("old@example.com", "test123", json!({ "some": "data" }))
        .await
        .unwrap();
    let before = store.find_user("old@example.com").await.unwrap();

    store
        .change_email("old@example.com", "new@example.com")
        .await
        .expect("change_email should succeed");

    assert!(matches!(
        store.find_user("old@example.com").await,
        Err(UserDbError::NotFound(_))
    ));
    let after = store.find_user("new@example.com").await.unwrap();
    assert_eq!(after.data, before.data);
    assert_eq!(after.password, before.password);
    assert_eq!(after.created_timestamp, before.created_timestamp);
    assert!(after.modified_timestamp > before.modified_timestamp);
    assert!(store.check_password("new@example.com", "test123").await.is_ok());
}

#[tokio::test]
async fn test_change_email_missing_user_is_not_found() {
    let store = test_store();
    let result = store
        .change_email("ghost@example.com", "new@example.com")
        .await;
    assert!(matches!(result, Err(UserDbError::NotFound(_))));
    assert!(store.find_user("new@example.com").await.is_err());
}

#[tokio::test]
async fn test_change_password() {
    let store = test_store();
    store
        .add_user("test@example.com", "test123", json!({ "keep": "me" }))
        .await
        .unwrap();
    let before = store.find_user("test@example.com").await.unwrap();

    store
        .change_password("test@example.com", "test1234")
        .await
        .expect("change_password should succeed");

    assert!(matches!(
        store.check_password("test@example.com", "test123").await,
        Err(UserDbError::PasswordMismatch)
    ));
    let after = store
        .check_password("test@example.com", "test1234")
        .await
        .expect("new password should pass");
    assert_eq!(after.data, before.data);
    assert_eq!(after.created_timestamp, before.created_timestamp);
    assert!(after.modified_timestamp > before.modified_timestamp);
}

#[tokio::test]
async fn test_change_password_missing_user_is_not_found() {
    let store = test_store();
    let result = store.change_password("ghost@example.com", "pw").await;
    assert!(matches!(result, Err(UserDbError::NotFound(_))));
}

#[tokio::test]
async fn test_modify_user() {
    let store = test_store();
    store
        .add_user("test@example.com", "test123", json!({ "some": "data" }))
        .await
        .unwrap();
    let before = store.find_user("test@example.com").await.unwrap();

    store
        .modify_user("test@example.com", json!({ "newData": true }))
        .await
        .expect("modify should succeed");

    let after = store.find_user("test@example.com").await.unwrap();
    assert_eq!(after.data, json!({ "newData": true }));
    assert_eq!(after.password, before.password);
    assert_eq!(after.created_timestamp, before.created_timestamp);
    assert!(after.modified_timestamp > before.modified_timestamp);
}

#[tokio::test]
async fn test_modify_missing_user_is_not_found() {
    let store = test_store();
    let result = store.modify_user("ghost@example.com", json!({})).await;
    assert!(matches!(result, Err(UserDbError::NotFound(_))));
}

#[tokio::test]
async fn test_delete_user() {
    let store = test_store();
    store
        .add_user("test@example.com", "test123", json!({}))
        .await
        .unwrap();

    store
        .delete_user("test@example.com")
        .await
        .expect("delete should succeed");
    assert!(matches!(
        store.find_user("test@example.com").await,
        Err(UserDbError::NotFound(_))
    ));

    store
        .delete_user("test@example.com")
        .await
        .expect("deleting a missing user should succeed");
    assert!(store.find_user("test@example.com").await.is_err());
}

#[tokio::test]
async fn test_stream_users_in_email_order() {
    let store = test_store();
    for email in ["carol@example.com", "alice@example.com", "bob@example.com"] {
        store
            .add_user(email, "pw", json!({ "who": email }))
            .await
            .unwrap();
    }

    let emails: Vec<String> = store
        .stream_users(UserRange::all())
        .map(|user| user.unwrap().email)
        .collect();
    assert_eq!(
        emails,
        vec!["alice@example.com", "bob@example.com", "carol@example.com"]
    );

    let tail: Vec<String> = store
        .stream_users(UserRange::all().gt("alice@example.com").reverse().limit(1))
        .map(|user| user.unwrap().email)
        .collect();
    assert_eq!(tail, vec!["carol@example.com"]);
}

#[tokio::test]
async fn test_sharded_store_behaves_the_same() {
    let store = AccountStore::in_memory(
        StoreConfig::default()
            .with_hashing(HashingConfig::minimal())
            .with_write_shards(8),
    )
    .unwrap();
    assert_eq!(store.write_shards(), 8);

    for i in 0..16 {
        let email = format!("user{}@example.com", i);
        store.add_user(&email, "pw", json!({ "i": i })).await.unwrap();
        store
            .modify_user(&email, json!({ "i": i, "touched": true }))
            .await
            .unwrap();
    }
    store
        .change_email("user3@example.com", "renamed@example.com")
        .await
        .unwrap();

    assert_eq!(store.stream_users(UserRange::all()).count(), 16);
    let renamed = store.find_user("renamed@example.com").await.unwrap();
    assert_eq!(renamed.data, json!({ "i": 3, "touched": true }));
    assert_eq!(store.pending_writes(), 0);
}
