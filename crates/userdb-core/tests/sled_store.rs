use serde_json::json;
use tempfile::TempDir;
use userdb_core::{AccountStore, HashingConfig, StoreConfig, UserDbError, UserRange};

fn config() -> StoreConfig {
    StoreConfig::default().with_hashing(HashingConfig::minimal())
}

#[tokio::test]
async fn test_accounts_survive_reopen() {
    let dir = TempDir::new().expect("tempdir should be created");
    let path = dir.path().join("users.db");

    {
        let store = AccountStore::open_sled(&path, config()).expect("open should succeed");
        store
            .add_user("persist@example.com", "test123", json!({ "plan": "pro" }))
            .await
            .unwrap();
        store
            .change_email("persist@example.com", "moved@example.com")
            .await
            .unwrap();
        store.close().await.expect("close should succeed");
    }

    let store = AccountStore::open_sled(&path, config()).expect("reopen should succeed");
    assert!(matches!(
        store.find_user("persist@example.com").await,
        Err(UserDbError::NotFound(_))
    ));
    let user = store
        .check_password("moved@example.com", "test123")
        .await
        .expect("password should still verify");
    assert_eq!(user.data, json!({ "plan": "pro" }));
    assert!(user.modified_timestamp > user.created_timestamp);
    store.close().await.unwrap();
}

#[tokio::test]
async fn test_sled_stream_and_delete() {
    let dir = TempDir::new().unwrap();
    let store = AccountStore::open_sled(dir.path().join("users.db"), config()).unwrap();
    for email in ["b@example.com", "a@example.com", "c@example.com"] {
        store.add_user(email, "pw", json!({})).await.unwrap();
    }
    store.delete_user("b@example.com").await.unwrap();
    store.delete_user("b@example.com").await.unwrap();

    let emails: Vec<String> = store
        .stream_users(UserRange::all().reverse())
        .map(|user| user.unwrap().email)
        .collect();
    assert_eq!(emails, vec!["c@example.com", "a@example.com"]);
    store.close().await.unwrap();
}
